//
// ISO/IEC 14496-12:2015(E)
// 8.7.8 Sample Auxiliary Information Sizes Box
// 8.7.9 Sample Auxiliary Information Offsets Box
//
use crate::boxes::prelude::*;

//  aligned(8) class SampleAuxiliaryInformationSizesBox
//  extends FullBox(‘saiz’, version = 0, flags) {
//      if (flags & 1) {
//          unsigned int(32) aux_info_type;
//          unsigned int(32) aux_info_type_parameter;
//      }
//      unsigned int(8) default_sample_info_size;
//      unsigned int(32) sample_count;
//      if (default_sample_info_size == 0) {
//          unsigned int(8) sample_info_size[ sample_count ];
//      }
//  }

/// 8.7.8 Sample Auxiliary Information Sizes Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleAuxiliaryInformationSizesBox {
    pub aux_info_type:            Option<(FourCC, u32)>,
    pub default_sample_info_size: u8,
    pub sample_count:             u32,
    /// Only present if `default_sample_info_size` is 0.
    pub sample_info_sizes:        Vec<u8>,
}

impl SampleAuxiliaryInformationSizesBox {
    /// Size of the aux info of sample `index`.
    pub fn sample_info_size(&self, index: usize) -> Option<u8> {
        if self.default_sample_info_size != 0 {
            if index < self.sample_count as usize {
                return Some(self.default_sample_info_size);
            }
            return None;
        }
        self.sample_info_sizes.get(index).cloned()
    }
}

impl BoxInfo for SampleAuxiliaryInformationSizesBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("saiz")
    }
    fn summary(&self) -> String {
        format!(
            "{} samples, default size {}",
            self.sample_count, self.default_sample_info_size
        )
    }
}

impl BoxCodec for SampleAuxiliaryInformationSizesBox {
    fn decode(
        _header: &BoxHeader,
        _start: u64,
        stream: &mut SliceReader<'_>,
    ) -> Result<SampleAuxiliaryInformationSizesBox> {
        let (_, flags) = read_version_flags(stream)?;
        let aux_info_type = if flags & 0x01 != 0 {
            Some((FourCC::from_bytes(stream)?, u32::from_bytes(stream)?))
        } else {
            None
        };
        let default_sample_info_size = u8::from_bytes(stream)?;
        let sample_count = u32::from_bytes(stream)?;
        let sample_info_sizes = if default_sample_info_size == 0 {
            stream.read(sample_count as u64)?.to_vec()
        } else {
            Vec::new()
        };
        Ok(SampleAuxiliaryInformationSizesBox {
            aux_info_type,
            default_sample_info_size,
            sample_count,
            sample_info_sizes,
        })
    }

    fn payload_size(&self) -> u64 {
        let sizes = if self.default_sample_info_size == 0 {
            self.sample_info_sizes.len() as u64
        } else {
            0
        };
        4 + self.aux_info_type.map(|_| 8).unwrap_or(0) + 5 + sizes
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_version_flags(stream, 0, self.aux_info_type.is_some() as u32)?;
        if let Some((t, p)) = self.aux_info_type {
            t.to_bytes(stream)?;
            p.to_bytes(stream)?;
        }
        self.default_sample_info_size.to_bytes(stream)?;
        if self.default_sample_info_size == 0 {
            (self.sample_info_sizes.len() as u32).to_bytes(stream)?;
            stream.write(&self.sample_info_sizes)
        } else {
            self.sample_count.to_bytes(stream)
        }
    }
}

//  aligned(8) class SampleAuxiliaryInformationOffsetsBox
//  extends FullBox(‘saio’, version, flags) {
//      if (flags & 1) {
//          unsigned int(32) aux_info_type;
//          unsigned int(32) aux_info_type_parameter;
//      }
//      unsigned int(32) entry_count;
//      if ( version == 0 ) {
//          unsigned int(32) offset[ entry_count ];
//      } else {
//          unsigned int(64) offset[ entry_count ];
//      }
//  }

/// 8.7.9 Sample Auxiliary Information Offsets Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleAuxiliaryInformationOffsetsBox {
    pub version:       u8,
    pub aux_info_type: Option<(FourCC, u32)>,
    pub offsets:       Vec<u64>,
}

impl SampleAuxiliaryInformationOffsetsBox {
    fn wide(&self) -> bool {
        self.version == 1 || self.offsets.iter().any(|&o| o > u32::MAX as u64)
    }
}

impl BoxInfo for SampleAuxiliaryInformationOffsetsBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("saio")
    }
    fn summary(&self) -> String {
        format!("offsets {:?}", self.offsets)
    }
}

impl BoxCodec for SampleAuxiliaryInformationOffsetsBox {
    fn decode(
        _header: &BoxHeader,
        _start: u64,
        stream: &mut SliceReader<'_>,
    ) -> Result<SampleAuxiliaryInformationOffsetsBox> {
        let (version, flags) = read_version_flags(stream)?;
        let aux_info_type = if flags & 0x01 != 0 {
            Some((FourCC::from_bytes(stream)?, u32::from_bytes(stream)?))
        } else {
            None
        };
        let entry_count = u32::from_bytes(stream)?;
        let width = if version == 1 { 8 } else { 4 };
        if entry_count as u64 * width > stream.left() {
            return Err(Error::TruncatedInput {
                need: entry_count as u64 * width,
                left: stream.left(),
            });
        }
        let mut offsets = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let offset = if version == 1 {
                u64::from_bytes(stream)?
            } else {
                u32::from_bytes(stream)? as u64
            };
            offsets.push(offset);
        }
        Ok(SampleAuxiliaryInformationOffsetsBox {
            version,
            aux_info_type,
            offsets,
        })
    }

    fn payload_size(&self) -> u64 {
        let width = if self.wide() { 8 } else { 4 };
        8 + self.aux_info_type.map(|_| 8).unwrap_or(0) + width * self.offsets.len() as u64
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        let wide = self.wide();
        write_version_flags(stream, wide as u8, self.aux_info_type.is_some() as u32)?;
        if let Some((t, p)) = self.aux_info_type {
            t.to_bytes(stream)?;
            p.to_bytes(stream)?;
        }
        (self.offsets.len() as u32).to_bytes(stream)?;
        for &offset in &self.offsets {
            if wide {
                offset.to_bytes(stream)?;
            } else {
                (offset as u32).to_bytes(stream)?;
            }
        }
        Ok(())
    }
}
