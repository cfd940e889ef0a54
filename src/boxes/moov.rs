//
// ISO/IEC 14496-12:2015(E)
// 8.2.1 Movie Box
// 8.8.1 Movie Extends Box
// 8.8.3 Track Extends Box
//
use crate::boxes::prelude::*;
use crate::boxes::TrackBox;

container_box! {
    /// 8.2.1 Movie Box (ISO/IEC 14496-12:2015(E))
    MovieBox, "moov"
}

impl MovieBox {
    declare_box_methods!(MovieExtendsBox, movie_extends, movie_extends_mut);

    /// Iterate over the tracks.
    pub fn tracks(&self) -> impl Iterator<Item = &TrackBox> {
        iter_box!(&self.boxes, TrackBox)
    }

    /// Get a track by id.
    pub fn track_by_id(&self, track_id: u32) -> Option<&TrackBox> {
        self.tracks().find(|t| t.track_id() == Some(track_id))
    }
}

container_box! {
    /// 8.8.1 Movie Extends Box (ISO/IEC 14496-12:2015(E))
    MovieExtendsBox, "mvex"
}

impl MovieExtendsBox {
    /// Get the TrackExtendsBox for a track.
    pub fn track_extends(&self, track_id: u32) -> Option<&TrackExtendsBox> {
        iter_box!(&self.boxes, TrackExtendsBox).find(|t| t.track_id == track_id)
    }
}

//  aligned(8) class TrackExtendsBox extends FullBox(‘trex’, 0, 0){
//      unsigned int(32) track_ID;
//      unsigned int(32) default_sample_description_index;
//      unsigned int(32) default_sample_duration;
//      unsigned int(32) default_sample_size;
//      unsigned int(32) default_sample_flags;
//  }

/// 8.8.3 Track Extends Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackExtendsBox {
    pub track_id:                         u32,
    pub default_sample_description_index: u32,
    pub default_sample_duration:          u32,
    pub default_sample_size:              u32,
    pub default_sample_flags:             SampleFlags,
}

impl BoxInfo for TrackExtendsBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("trex")
    }
    fn summary(&self) -> String {
        format!(
            "track {} duration {} size {} flags {:?}",
            self.track_id, self.default_sample_duration, self.default_sample_size, self.default_sample_flags
        )
    }
}

impl BoxCodec for TrackExtendsBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<TrackExtendsBox> {
        read_version_flags(stream)?;
        Ok(TrackExtendsBox {
            track_id:                         u32::from_bytes(stream)?,
            default_sample_description_index: u32::from_bytes(stream)?,
            default_sample_duration:          u32::from_bytes(stream)?,
            default_sample_size:              u32::from_bytes(stream)?,
            default_sample_flags:             SampleFlags::from_bytes(stream)?,
        })
    }

    fn payload_size(&self) -> u64 {
        24
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_version_flags(stream, 0, 0)?;
        self.track_id.to_bytes(stream)?;
        self.default_sample_description_index.to_bytes(stream)?;
        self.default_sample_duration.to_bytes(stream)?;
        self.default_sample_size.to_bytes(stream)?;
        self.default_sample_flags.to_bytes(stream)
    }
}
