//
// ISO/IEC 14496-12:2015(E)
// 4.3 File Type Box
// 8.16.2 Segment Type Box
//
use crate::boxes::prelude::*;

/// 4.3 File Type Box, also used for 8.16.2 Segment Type Box.
#[derive(Clone, Debug, PartialEq)]
pub struct FileTypeBox {
    /// `ftyp` or `styp`.
    pub fourcc:            FourCC,
    pub major_brand:       FourCC,
    pub minor_version:     u32,
    pub compatible_brands: Vec<FourCC>,
}

impl BoxInfo for FileTypeBox {
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
    fn summary(&self) -> String {
        let brands: Vec<_> = self.compatible_brands.iter().map(|b| b.to_string()).collect();
        format!("major {} minor {} compat [{}]", self.major_brand, self.minor_version, brands.join(","))
    }
}

impl BoxCodec for FileTypeBox {
    fn decode(header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<FileTypeBox> {
        let major_brand = FourCC::from_bytes(stream)?;
        let minor_version = u32::from_bytes(stream)?;
        let mut compatible_brands = Vec::new();
        while stream.left() >= 4 {
            compatible_brands.push(FourCC::from_bytes(stream)?);
        }
        Ok(FileTypeBox {
            fourcc: header.fourcc,
            major_brand,
            minor_version,
            compatible_brands,
        })
    }

    fn payload_size(&self) -> u64 {
        8 + 4 * self.compatible_brands.len() as u64
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        self.major_brand.to_bytes(stream)?;
        self.minor_version.to_bytes(stream)?;
        for brand in &self.compatible_brands {
            brand.to_bytes(stream)?;
        }
        Ok(())
    }
}
