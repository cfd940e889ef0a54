//
// ISO/IEC 14496-12:2015(E)
// 8.8.4 Movie Fragment Box
// 8.8.5 Movie Fragment Header Box
//
use crate::boxes::prelude::*;
use crate::boxes::TrackFragmentBox;

container_box! {
    /// 8.8.4 Movie Fragment Box (ISO/IEC 14496-12:2015(E))
    MovieFragmentBox, "moof"
}

impl MovieFragmentBox {
    declare_box_methods!(MovieFragmentHeaderBox, header, header_mut);

    /// Sequence number from the mfhd box.
    pub fn sequence_number(&self) -> u32 {
        self.header().map(|h| h.sequence_number).unwrap_or(0)
    }

    /// Iterate over the track fragments.
    pub fn track_fragments(&self) -> impl Iterator<Item = &TrackFragmentBox> {
        iter_box!(&self.boxes, TrackFragmentBox)
    }
}

/// 8.8.5 Movie Fragment Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieFragmentHeaderBox {
    pub sequence_number: u32,
}

impl BoxInfo for MovieFragmentHeaderBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("mfhd")
    }
    fn summary(&self) -> String {
        format!("sequence {}", self.sequence_number)
    }
}

impl BoxCodec for MovieFragmentHeaderBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<MovieFragmentHeaderBox> {
        read_version_flags(stream)?;
        Ok(MovieFragmentHeaderBox {
            sequence_number: u32::from_bytes(stream)?,
        })
    }

    fn payload_size(&self) -> u64 {
        8
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_version_flags(stream, 0, 0)?;
        self.sequence_number.to_bytes(stream)
    }
}
