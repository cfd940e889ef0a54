//
// ISO/IEC 14496-12:2015(E)
// 8.1.1 Media Data Box
//
use std::fmt::{self, Debug};

use crate::boxes::prelude::*;

/// 8.1.1 Media Data Box (ISO/IEC 14496-12:2015(E))
///
/// If the box was read with a 64 bit size it is written back that way,
/// so that offsets into the file after it do not move.
#[derive(Clone, Default, PartialEq)]
pub struct MediaDataBox {
    pub data:       Vec<u8>,
    pub large_size: bool,
}

impl MediaDataBox {
    pub fn new(data: Vec<u8>) -> MediaDataBox {
        MediaDataBox {
            data,
            large_size: false,
        }
    }

    /// Offset of the first payload byte from the start of the box.
    pub fn payload_offset(&self) -> u64 {
        self.size() - self.data.len() as u64
    }
}

impl BoxInfo for MediaDataBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("mdat")
    }
    fn summary(&self) -> String {
        format!("{} bytes", self.data.len())
    }
}

impl BoxCodec for MediaDataBox {
    fn decode(header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<MediaDataBox> {
        Ok(MediaDataBox {
            data:       stream.remaining().to_vec(),
            large_size: header.extended_size,
        })
    }

    fn payload_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        stream.write(&self.data)
    }

    fn extended_size(&self) -> bool {
        self.large_size
    }
}

impl Debug for MediaDataBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut dbg = f.debug_struct("MediaDataBox");
        dbg.field("data", &format!("[u8; {}]", self.data.len()));
        dbg.field("large_size", &self.large_size);
        dbg.finish()
    }
}
