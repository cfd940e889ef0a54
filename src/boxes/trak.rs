//
// ISO/IEC 14496-12:2015(E)
// 8.3.1 Track Box
// 8.3.2 Track Header Box
// 8.4 Media, Media Header, Media Information
// 8.5.1 Sample Table Box
// 8.5.2 Sample Description Box
//
use crate::boxes::prelude::*;

container_box! {
    /// 8.3.1 Track Box (ISO/IEC 14496-12:2015(E))
    TrackBox, "trak"
}

impl TrackBox {
    declare_box_methods!(TrackHeaderBox, track_header, track_header_mut);
    declare_box_methods!(MediaBox, media, media_mut);

    /// Track id from the track header.
    pub fn track_id(&self) -> Option<u32> {
        self.track_header().map(|t| t.track_id)
    }

    /// Shortcut to mdia/minf/stbl/stsd.
    pub fn sample_description(&self) -> Option<&SampleDescriptionBox> {
        self.media()?.media_info()?.sample_table()?.sample_description()
    }

    /// Shortcut to mdia/minf/stbl/stsd, mutable.
    pub fn sample_description_mut(&mut self) -> Option<&mut SampleDescriptionBox> {
        self.media_mut()?
            .media_info_mut()?
            .sample_table_mut()?
            .sample_description_mut()
    }
}

//  aligned(8) class TrackHeaderBox extends FullBox(‘tkhd’, version, flags){
//      if (version==1) {
//          unsigned int(64) creation_time;
//          unsigned int(64) modification_time;
//          unsigned int(32) track_ID;
//          const unsigned int(32) reserved = 0;
//          unsigned int(64) duration;
//      } else { // version==0
//          unsigned int(32) creation_time;
//          unsigned int(32) modification_time;
//          unsigned int(32) track_ID;
//          const unsigned int(32) reserved = 0;
//          unsigned int(32) duration;
//      }
//      const unsigned int(32)[2] reserved = 0;
//      template int(16) layer = 0;
//      template int(16) alternate_group = 0;
//      template int(16) volume = {if track_is_audio 0x0100 else 0};
//      const unsigned int(16) reserved = 0;
//      template int(32)[9] matrix;
//      unsigned int(32) width;
//      unsigned int(32) height;
//  }

/// 8.3.2 Track Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, PartialEq)]
pub struct TrackHeaderBox {
    pub version:           u8,
    pub flags:             u32,
    pub creation_time:     u64,
    pub modification_time: u64,
    pub track_id:          u32,
    pub duration:          u64,
    pub layer:             i16,
    pub alternate_group:   i16,
    pub volume:            u16,
    pub matrix:            [u8; 36],
    /// 16.16 fixed point.
    pub width:             u32,
    /// 16.16 fixed point.
    pub height:            u32,
}

// Unity matrix: { 0x00010000,0,0,0,0x00010000,0,0,0,0x40000000 }
const UNITY_MATRIX: [u8; 36] = [
    0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x40, 0, 0, 0,
];

impl Default for TrackHeaderBox {
    fn default() -> TrackHeaderBox {
        TrackHeaderBox {
            version:           0,
            flags:             3,
            creation_time:     0,
            modification_time: 0,
            track_id:          0,
            duration:          0,
            layer:             0,
            alternate_group:   0,
            volume:            0,
            matrix:            UNITY_MATRIX,
            width:             0,
            height:            0,
        }
    }
}

impl TrackHeaderBox {
    fn wide(&self) -> bool {
        self.version == 1 ||
            self.creation_time > u32::MAX as u64 ||
            self.modification_time > u32::MAX as u64 ||
            self.duration > u32::MAX as u64
    }
}

impl BoxInfo for TrackHeaderBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("tkhd")
    }
    fn summary(&self) -> String {
        format!(
            "track {} duration {} {}x{}",
            self.track_id,
            self.duration,
            self.width >> 16,
            self.height >> 16
        )
    }
}

impl BoxCodec for TrackHeaderBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<TrackHeaderBox> {
        let (version, flags) = read_version_flags(stream)?;
        let (creation_time, modification_time, track_id, duration);
        if version == 1 {
            creation_time = u64::from_bytes(stream)?;
            modification_time = u64::from_bytes(stream)?;
            track_id = u32::from_bytes(stream)?;
            stream.skip(4)?;
            duration = u64::from_bytes(stream)?;
        } else {
            creation_time = u32::from_bytes(stream)? as u64;
            modification_time = u32::from_bytes(stream)? as u64;
            track_id = u32::from_bytes(stream)?;
            stream.skip(4)?;
            duration = u32::from_bytes(stream)? as u64;
        }
        stream.skip(8)?;
        let layer = i16::from_bytes(stream)?;
        let alternate_group = i16::from_bytes(stream)?;
        let volume = u16::from_bytes(stream)?;
        stream.skip(2)?;
        let matrix = <[u8; 36]>::from_bytes(stream)?;
        let width = u32::from_bytes(stream)?;
        let height = u32::from_bytes(stream)?;
        Ok(TrackHeaderBox {
            version,
            flags,
            creation_time,
            modification_time,
            track_id,
            duration,
            layer,
            alternate_group,
            volume,
            matrix,
            width,
            height,
        })
    }

    fn payload_size(&self) -> u64 {
        if self.wide() {
            96
        } else {
            84
        }
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        if self.wide() {
            write_version_flags(stream, 1, self.flags)?;
            self.creation_time.to_bytes(stream)?;
            self.modification_time.to_bytes(stream)?;
            self.track_id.to_bytes(stream)?;
            stream.skip(4)?;
            self.duration.to_bytes(stream)?;
        } else {
            write_version_flags(stream, 0, self.flags)?;
            (self.creation_time as u32).to_bytes(stream)?;
            (self.modification_time as u32).to_bytes(stream)?;
            self.track_id.to_bytes(stream)?;
            stream.skip(4)?;
            (self.duration as u32).to_bytes(stream)?;
        }
        stream.skip(8)?;
        self.layer.to_bytes(stream)?;
        self.alternate_group.to_bytes(stream)?;
        self.volume.to_bytes(stream)?;
        stream.skip(2)?;
        self.matrix.to_bytes(stream)?;
        self.width.to_bytes(stream)?;
        self.height.to_bytes(stream)
    }
}

container_box! {
    /// 8.4.1 Media Box (ISO/IEC 14496-12:2015(E))
    MediaBox, "mdia"
}

impl MediaBox {
    declare_box_methods!(MediaHeaderBox, media_header, media_header_mut);
    declare_box_methods!(MediaInformationBox, media_info, media_info_mut);
}

/// 8.4.2 Media Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaHeaderBox {
    pub version:           u8,
    pub creation_time:     u64,
    pub modification_time: u64,
    pub timescale:         u32,
    pub duration:          u64,
    /// Packed ISO-639-2/T language code.
    pub language:          u16,
}

impl MediaHeaderBox {
    fn wide(&self) -> bool {
        self.version == 1 ||
            self.creation_time > u32::MAX as u64 ||
            self.modification_time > u32::MAX as u64 ||
            self.duration > u32::MAX as u64
    }

    /// The language as three letters.
    pub fn language_code(&self) -> String {
        let c = |shift: u16| (((self.language >> shift) & 0x1f) as u8 + 0x60) as char;
        [c(10), c(5), c(0)].iter().collect()
    }
}

impl BoxInfo for MediaHeaderBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("mdhd")
    }
    fn summary(&self) -> String {
        format!(
            "timescale {} duration {} lang {}",
            self.timescale,
            self.duration,
            self.language_code()
        )
    }
}

impl BoxCodec for MediaHeaderBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<MediaHeaderBox> {
        let (version, _) = read_version_flags(stream)?;
        let (creation_time, modification_time, timescale, duration);
        if version == 1 {
            creation_time = u64::from_bytes(stream)?;
            modification_time = u64::from_bytes(stream)?;
            timescale = u32::from_bytes(stream)?;
            duration = u64::from_bytes(stream)?;
        } else {
            creation_time = u32::from_bytes(stream)? as u64;
            modification_time = u32::from_bytes(stream)? as u64;
            timescale = u32::from_bytes(stream)?;
            duration = u32::from_bytes(stream)? as u64;
        }
        let language = u16::from_bytes(stream)?;
        stream.skip(2)?;
        Ok(MediaHeaderBox {
            version,
            creation_time,
            modification_time,
            timescale,
            duration,
            language,
        })
    }

    fn payload_size(&self) -> u64 {
        if self.wide() {
            36
        } else {
            24
        }
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        if self.wide() {
            write_version_flags(stream, 1, 0)?;
            self.creation_time.to_bytes(stream)?;
            self.modification_time.to_bytes(stream)?;
            self.timescale.to_bytes(stream)?;
            self.duration.to_bytes(stream)?;
        } else {
            write_version_flags(stream, 0, 0)?;
            (self.creation_time as u32).to_bytes(stream)?;
            (self.modification_time as u32).to_bytes(stream)?;
            self.timescale.to_bytes(stream)?;
            (self.duration as u32).to_bytes(stream)?;
        }
        self.language.to_bytes(stream)?;
        stream.skip(2)
    }
}

container_box! {
    /// 8.4.4 Media Information Box (ISO/IEC 14496-12:2015(E))
    MediaInformationBox, "minf"
}

impl MediaInformationBox {
    declare_box_methods!(SampleTableBox, sample_table, sample_table_mut);
}

container_box! {
    /// 8.5.1 Sample Table Box (ISO/IEC 14496-12:2015(E))
    SampleTableBox, "stbl"
}

impl SampleTableBox {
    declare_box_methods!(SampleDescriptionBox, sample_description, sample_description_mut);
}

/// 8.5.2 Sample Description Box (ISO/IEC 14496-12:2015(E))
///
/// The entries are boxes themselves, so this is a container with
/// a version, flags and an entry count in front of the children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleDescriptionBox {
    pub version: u8,
    pub flags:   u32,
    pub boxes:   Vec<MP4Box>,
}

impl SampleDescriptionBox {
    /// Append a sample entry.
    pub fn add_child(&mut self, child: impl Into<MP4Box>) {
        self.boxes.push(child.into());
    }

    /// The first (usually only) sample entry.
    pub fn entry(&self) -> Option<&MP4Box> {
        self.boxes.first()
    }

    /// The first sample entry, mutable.
    pub fn entry_mut(&mut self) -> Option<&mut MP4Box> {
        self.boxes.first_mut()
    }
}

impl BoxInfo for SampleDescriptionBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("stsd")
    }
    fn boxes(&self) -> Option<&[MP4Box]> {
        Some(&self.boxes[..])
    }
    fn summary(&self) -> String {
        format!("{} entries", self.boxes.len())
    }
}

impl BoxCodec for SampleDescriptionBox {
    fn decode(header: &BoxHeader, start: u64, stream: &mut SliceReader<'_>) -> Result<SampleDescriptionBox> {
        let (version, flags) = read_version_flags(stream)?;
        let entry_count = u32::from_bytes(stream)?;
        let first = start + header.header_size() + 8;
        let boxes = decode_children(first, start + header.size, stream)?;
        if boxes.len() != entry_count as usize {
            log::warn!("stsd: entry_count {} but {} entries", entry_count, boxes.len());
        }
        Ok(SampleDescriptionBox { version, flags, boxes })
    }

    fn payload_size(&self) -> u64 {
        8 + children_size(&self.boxes)
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_version_flags(stream, self.version, self.flags)?;
        (self.boxes.len() as u32).to_bytes(stream)?;
        encode_children(&self.boxes, stream)
    }
}
