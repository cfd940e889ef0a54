//
// ISO/IEC 14496-12:2015(E)
// 8.8.6 Track Fragment Box
// 8.8.7 Track Fragment Header Box
// 8.8.12 Track fragment decode time
//
use crate::boxes::prelude::*;
use crate::boxes::{
    SampleAuxiliaryInformationOffsetsBox, SampleAuxiliaryInformationSizesBox, SampleEncryptionBox, TrackRunBox,
};

container_box! {
    /// 8.8.6 Track Fragment Box (ISO/IEC 14496-12:2015(E))
    TrackFragmentBox, "traf"
}

impl TrackFragmentBox {
    declare_box_methods!(TrackFragmentHeaderBox, header, header_mut);
    declare_box_methods!(TrackFragmentBaseMediaDecodeTimeBox, decode_time, decode_time_mut);
    declare_box_methods!(SampleEncryptionBox, sample_encryption, sample_encryption_mut);
    declare_box_methods!(SampleAuxiliaryInformationSizesBox, aux_info_sizes, aux_info_sizes_mut);
    declare_box_methods!(SampleAuxiliaryInformationOffsetsBox, aux_info_offsets, aux_info_offsets_mut);

    /// Track id from the track fragment header.
    pub fn track_id(&self) -> Option<u32> {
        self.header().map(|h| h.track_id)
    }

    /// Iterate over the track runs.
    pub fn track_runs(&self) -> impl Iterator<Item = &TrackRunBox> {
        iter_box!(&self.boxes, TrackRunBox)
    }

    /// Base media decode time, 0 if there is no tfdt.
    pub fn base_media_decode_time(&self) -> u64 {
        self.decode_time().map(|t| t.base_media_decode_time).unwrap_or(0)
    }
}

//  aligned(8) class TrackFragmentHeaderBox extends FullBox(‘tfhd’, 0, tf_flags){
//      unsigned int(32) track_ID;
//      // all the following are optional fields
//      unsigned int(64) base_data_offset;
//      unsigned int(32) sample_description_index;
//      unsigned int(32) default_sample_duration;
//      unsigned int(32) default_sample_size;
//      unsigned int(32) default_sample_flags
//  }

const BASE_DATA_OFFSET: u32 = 0x01;
const SAMPLE_DESCRIPTION_INDEX: u32 = 0x02;
const DEFAULT_SAMPLE_DURATION: u32 = 0x08;
const DEFAULT_SAMPLE_SIZE: u32 = 0x10;
const DEFAULT_SAMPLE_FLAGS: u32 = 0x20;
const DURATION_IS_EMPTY: u32 = 0x010000;
const DEFAULT_BASE_IS_MOOF: u32 = 0x020000;
const KNOWN_FLAGS: u32 = BASE_DATA_OFFSET |
    SAMPLE_DESCRIPTION_INDEX |
    DEFAULT_SAMPLE_DURATION |
    DEFAULT_SAMPLE_SIZE |
    DEFAULT_SAMPLE_FLAGS |
    DURATION_IS_EMPTY |
    DEFAULT_BASE_IS_MOOF;

/// 8.8.7 Track Fragment Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackFragmentHeaderBox {
    pub version:                  u8,
    /// Flag bits that do not describe field presence, kept as-is.
    pub other_flags:              u32,
    pub track_id:                 u32,
    pub duration_is_empty:        bool,
    pub default_base_is_moof:     bool,
    pub base_data_offset:         Option<u64>,
    pub sample_description_index: Option<u32>,
    pub default_sample_duration:  Option<u32>,
    pub default_sample_size:      Option<u32>,
    pub default_sample_flags:     Option<SampleFlags>,
}

impl TrackFragmentHeaderBox {
    fn flags(&self) -> u32 {
        self.other_flags |
            self.base_data_offset.is_some() as u32 * BASE_DATA_OFFSET |
            self.sample_description_index.is_some() as u32 * SAMPLE_DESCRIPTION_INDEX |
            self.default_sample_duration.is_some() as u32 * DEFAULT_SAMPLE_DURATION |
            self.default_sample_size.is_some() as u32 * DEFAULT_SAMPLE_SIZE |
            self.default_sample_flags.is_some() as u32 * DEFAULT_SAMPLE_FLAGS |
            self.duration_is_empty as u32 * DURATION_IS_EMPTY |
            self.default_base_is_moof as u32 * DEFAULT_BASE_IS_MOOF
    }
}

impl BoxInfo for TrackFragmentHeaderBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("tfhd")
    }
    fn summary(&self) -> String {
        format!("track {} flags 0x{:06x}", self.track_id, self.flags())
    }
}

impl BoxCodec for TrackFragmentHeaderBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<TrackFragmentHeaderBox> {
        let (version, flags) = read_version_flags(stream)?;
        let track_id = u32::from_bytes(stream)?;

        let duration_is_empty = (flags & DURATION_IS_EMPTY) > 0;
        let default_base_is_moof = (flags & DEFAULT_BASE_IS_MOOF) > 0;

        let base_data_offset = (flags & BASE_DATA_OFFSET > 0)
            .then(|| u64::from_bytes(stream))
            .transpose()?;
        let sample_description_index = (flags & SAMPLE_DESCRIPTION_INDEX > 0)
            .then(|| u32::from_bytes(stream))
            .transpose()?;
        let default_sample_duration = (flags & DEFAULT_SAMPLE_DURATION > 0)
            .then(|| u32::from_bytes(stream))
            .transpose()?;
        let default_sample_size = (flags & DEFAULT_SAMPLE_SIZE > 0)
            .then(|| u32::from_bytes(stream))
            .transpose()?;
        let default_sample_flags = (flags & DEFAULT_SAMPLE_FLAGS > 0)
            .then(|| SampleFlags::from_bytes(stream))
            .transpose()?;

        Ok(TrackFragmentHeaderBox {
            version,
            other_flags: flags & !KNOWN_FLAGS,
            track_id,
            duration_is_empty,
            default_base_is_moof,
            base_data_offset,
            sample_description_index,
            default_sample_duration,
            default_sample_size,
            default_sample_flags,
        })
    }

    fn payload_size(&self) -> u64 {
        8 + self.base_data_offset.map(|_| 8).unwrap_or(0) +
            self.sample_description_index.map(|_| 4).unwrap_or(0) +
            self.default_sample_duration.map(|_| 4).unwrap_or(0) +
            self.default_sample_size.map(|_| 4).unwrap_or(0) +
            self.default_sample_flags.map(|_| 4).unwrap_or(0)
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_version_flags(stream, self.version, self.flags())?;
        self.track_id.to_bytes(stream)?;
        self.base_data_offset.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.sample_description_index.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.default_sample_duration.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.default_sample_size.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.default_sample_flags.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))
    }
}

/// 8.8.12 Track fragment decode time (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackFragmentBaseMediaDecodeTimeBox {
    pub version:                u8,
    pub base_media_decode_time: u64,
}

impl TrackFragmentBaseMediaDecodeTimeBox {
    fn wide(&self) -> bool {
        self.version == 1 || self.base_media_decode_time > u32::MAX as u64
    }
}

impl BoxInfo for TrackFragmentBaseMediaDecodeTimeBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("tfdt")
    }
    fn summary(&self) -> String {
        format!("base_media_decode_time {}", self.base_media_decode_time)
    }
}

impl BoxCodec for TrackFragmentBaseMediaDecodeTimeBox {
    fn decode(
        _header: &BoxHeader,
        _start: u64,
        stream: &mut SliceReader<'_>,
    ) -> Result<TrackFragmentBaseMediaDecodeTimeBox> {
        let (version, _) = read_version_flags(stream)?;
        let base_media_decode_time = if version == 1 {
            u64::from_bytes(stream)?
        } else {
            u32::from_bytes(stream)? as u64
        };
        Ok(TrackFragmentBaseMediaDecodeTimeBox {
            version,
            base_media_decode_time,
        })
    }

    fn payload_size(&self) -> u64 {
        if self.wide() {
            12
        } else {
            8
        }
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        if self.wide() {
            write_version_flags(stream, 1, 0)?;
            self.base_media_decode_time.to_bytes(stream)
        } else {
            write_version_flags(stream, 0, 0)?;
            (self.base_media_decode_time as u32).to_bytes(stream)
        }
    }
}
