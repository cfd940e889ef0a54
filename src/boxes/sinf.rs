//
// ISO/IEC 14496-12:2015(E)
// 8.12 Support for protected streams
//
// ISO/IEC 23001-7:2016(E)
// 8.2 Track Encryption Box
//
use crate::boxes::prelude::*;

container_box! {
    /// 8.12.1 Protection Scheme Information Box (ISO/IEC 14496-12:2015(E))
    ProtectionSchemeInfoBox, "sinf"
}

impl ProtectionSchemeInfoBox {
    declare_box_methods!(OriginalFormatBox, original_format, original_format_mut);
    declare_box_methods!(SchemeTypeBox, scheme_type, scheme_type_mut);
    declare_box_methods!(SchemeInformationBox, scheme_info, scheme_info_mut);

    /// Shortcut to schi/tenc.
    pub fn track_encryption(&self) -> Option<&TrackEncryptionBox> {
        self.scheme_info()?.track_encryption()
    }
}

/// 8.12.2 Original Format Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, PartialEq)]
pub struct OriginalFormatBox {
    pub data_format: FourCC,
}

impl BoxInfo for OriginalFormatBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("frma")
    }
    fn summary(&self) -> String {
        self.data_format.to_string()
    }
}

impl BoxCodec for OriginalFormatBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<OriginalFormatBox> {
        Ok(OriginalFormatBox {
            data_format: FourCC::from_bytes(stream)?,
        })
    }

    fn payload_size(&self) -> u64 {
        4
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        self.data_format.to_bytes(stream)
    }
}

//  aligned(8) class SchemeTypeBox extends FullBox('schm', 0, flags) {
//      unsigned int(32) scheme_type;
//      unsigned int(32) scheme_version;
//      if (flags & 0x000001) {
//          unsigned int(8) scheme_uri[]; // browser uri
//      }
//  }

/// 8.12.5 Scheme Type Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, PartialEq)]
pub struct SchemeTypeBox {
    pub scheme_type:    FourCC,
    pub scheme_version: u32,
    /// Null terminated on the wire.
    pub scheme_uri:     Option<String>,
}

impl BoxInfo for SchemeTypeBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("schm")
    }
    fn summary(&self) -> String {
        format!("{} version 0x{:08x}", self.scheme_type, self.scheme_version)
    }
}

impl BoxCodec for SchemeTypeBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<SchemeTypeBox> {
        let (_, flags) = read_version_flags(stream)?;
        let scheme_type = FourCC::from_bytes(stream)?;
        let scheme_version = u32::from_bytes(stream)?;
        let scheme_uri = if flags & 0x01 != 0 {
            let data = stream.remaining();
            let data = data.strip_suffix(&[0]).unwrap_or(data);
            let uri = std::str::from_utf8(data).map_err(|_| Error::invalid("schm: scheme_uri is not UTF-8"))?;
            Some(uri.to_string())
        } else {
            None
        };
        Ok(SchemeTypeBox {
            scheme_type,
            scheme_version,
            scheme_uri,
        })
    }

    fn payload_size(&self) -> u64 {
        12 + self.scheme_uri.as_ref().map(|u| u.len() as u64 + 1).unwrap_or(0)
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_version_flags(stream, 0, self.scheme_uri.is_some() as u32)?;
        self.scheme_type.to_bytes(stream)?;
        self.scheme_version.to_bytes(stream)?;
        if let Some(uri) = self.scheme_uri.as_ref() {
            stream.write(uri.as_bytes())?;
            0u8.to_bytes(stream)?;
        }
        Ok(())
    }
}

container_box! {
    /// 8.12.6 Scheme Information Box (ISO/IEC 14496-12:2015(E))
    SchemeInformationBox, "schi"
}

impl SchemeInformationBox {
    declare_box_methods!(TrackEncryptionBox, track_encryption, track_encryption_mut);
}

//  aligned(8) class TrackEncryptionBox extends FullBox(‘tenc’, version, flags=0) {
//      unsigned int(8) reserved = 0;
//      if (version==0) {
//          unsigned int(8) reserved = 0;
//      } else { // version is 1 or greater
//          unsigned int(4) default_crypt_byte_block;
//          unsigned int(4) default_skip_byte_block;
//      }
//      unsigned int(8) default_isProtected;
//      unsigned int(8) default_Per_Sample_IV_Size;
//      unsigned int(8)[16] default_KID;
//      if (default_isProtected ==1 && default_Per_Sample_IV_Size == 0) {
//          unsigned int(8) default_constant_IV_size;
//          unsigned int(8)[default_constant_IV_size] default_constant_IV;
//      }
//  }

/// 8.2 Track Encryption Box (ISO/IEC 23001-7:2016(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackEncryptionBox {
    pub version:                    u8,
    pub default_crypt_byte_block:   u8,
    pub default_skip_byte_block:    u8,
    pub default_is_protected:       u8,
    pub default_per_sample_iv_size: u8,
    pub default_kid:                [u8; 16],
    pub default_constant_iv:        Option<Vec<u8>>,
}

impl BoxInfo for TrackEncryptionBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("tenc")
    }
    fn summary(&self) -> String {
        format!(
            "protected {} iv_size {} kid {}",
            self.default_is_protected,
            self.default_per_sample_iv_size,
            hex::encode(&self.default_kid)
        )
    }
}

impl BoxCodec for TrackEncryptionBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<TrackEncryptionBox> {
        let (version, _) = read_version_flags(stream)?;
        stream.skip(1)?;
        let pattern = u8::from_bytes(stream)?;
        let (default_crypt_byte_block, default_skip_byte_block) = if version > 0 {
            (pattern >> 4, pattern & 0x0f)
        } else {
            (0, 0)
        };
        let default_is_protected = u8::from_bytes(stream)?;
        let default_per_sample_iv_size = u8::from_bytes(stream)?;
        let default_kid = <[u8; 16]>::from_bytes(stream)?;
        let default_constant_iv = if default_is_protected == 1 && default_per_sample_iv_size == 0 {
            let size = u8::from_bytes(stream)?;
            Some(stream.read(size as u64)?.to_vec())
        } else {
            None
        };
        Ok(TrackEncryptionBox {
            version,
            default_crypt_byte_block,
            default_skip_byte_block,
            default_is_protected,
            default_per_sample_iv_size,
            default_kid,
            default_constant_iv,
        })
    }

    fn payload_size(&self) -> u64 {
        24 + self.default_constant_iv.as_ref().map(|iv| 1 + iv.len() as u64).unwrap_or(0)
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_version_flags(stream, self.version, 0)?;
        stream.skip(1)?;
        if self.version > 0 {
            ((self.default_crypt_byte_block << 4) | (self.default_skip_byte_block & 0x0f)).to_bytes(stream)?;
        } else {
            stream.skip(1)?;
        }
        self.default_is_protected.to_bytes(stream)?;
        self.default_per_sample_iv_size.to_bytes(stream)?;
        self.default_kid.to_bytes(stream)?;
        if let Some(iv) = self.default_constant_iv.as_ref() {
            (iv.len() as u8).to_bytes(stream)?;
            stream.write(iv)?;
        }
        Ok(())
    }
}
