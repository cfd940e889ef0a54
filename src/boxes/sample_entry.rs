//
// ISO/IEC 14496-12:2015(E)
// 8.5.2.2 Sample entries: visual and audio.
//
// The codec specific configuration (avcC, esds, ...) is kept as child
// boxes. Encrypted entries (encv, enca) have the same layout as the
// clear ones and carry a sinf child.
//
use crate::boxes::prelude::*;
use crate::boxes::ProtectionSchemeInfoBox;

//  class VisualSampleEntry(codingname) extends SampleEntry (codingname){
//      const unsigned int(8)[6] reserved = 0;
//      unsigned int(16) data_reference_index;
//      unsigned int(16) pre_defined = 0;
//      const unsigned int(16) reserved = 0;
//      unsigned int(32)[3] pre_defined = 0;
//      unsigned int(16) width;
//      unsigned int(16) height;
//      template unsigned int(32) horizresolution = 0x00480000; // 72 dpi
//      template unsigned int(32) vertresolution = 0x00480000; // 72 dpi
//      const unsigned int(32) reserved = 0;
//      template unsigned int(16) frame_count = 1;
//      string[32] compressorname;
//      template unsigned int(16) depth = 0x0018;
//      int(16) pre_defined = -1;
//  }

/// Visual sample entry (avc1, avc3, hvc1, hev1, encv).
#[derive(Clone, Debug, PartialEq)]
pub struct VisualSampleEntry {
    pub fourcc:               FourCC,
    pub data_reference_index: u16,
    pub width:                u16,
    pub height:               u16,
    pub horizresolution:      u32,
    pub vertresolution:       u32,
    pub frame_count:          u16,
    pub compressor_name:      [u8; 32],
    pub depth:                u16,
    pub boxes:                Vec<MP4Box>,
}

const VISUAL_PREFIX: u64 = 78;

impl VisualSampleEntry {
    declare_box_methods!(ProtectionSchemeInfoBox, protection_info, protection_info_mut);

    /// Append a child box (codec configuration, sinf, btrt ...).
    pub fn add_child(&mut self, child: impl Into<MP4Box>) {
        self.boxes.push(child.into());
    }
}

impl BoxInfo for VisualSampleEntry {
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
    fn boxes(&self) -> Option<&[MP4Box]> {
        Some(&self.boxes[..])
    }
    fn summary(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl BoxCodec for VisualSampleEntry {
    fn decode(header: &BoxHeader, start: u64, stream: &mut SliceReader<'_>) -> Result<VisualSampleEntry> {
        stream.skip(6)?;
        let data_reference_index = u16::from_bytes(stream)?;
        stream.skip(16)?;
        let width = u16::from_bytes(stream)?;
        let height = u16::from_bytes(stream)?;
        let horizresolution = u32::from_bytes(stream)?;
        let vertresolution = u32::from_bytes(stream)?;
        stream.skip(4)?;
        let frame_count = u16::from_bytes(stream)?;
        let compressor_name = <[u8; 32]>::from_bytes(stream)?;
        let depth = u16::from_bytes(stream)?;
        stream.skip(2)?;
        let first = start + header.header_size() + VISUAL_PREFIX;
        let boxes = decode_children(first, start + header.size, stream)?;
        Ok(VisualSampleEntry {
            fourcc: header.fourcc,
            data_reference_index,
            width,
            height,
            horizresolution,
            vertresolution,
            frame_count,
            compressor_name,
            depth,
            boxes,
        })
    }

    fn payload_size(&self) -> u64 {
        VISUAL_PREFIX + children_size(&self.boxes)
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        stream.skip(6)?;
        self.data_reference_index.to_bytes(stream)?;
        stream.skip(16)?;
        self.width.to_bytes(stream)?;
        self.height.to_bytes(stream)?;
        self.horizresolution.to_bytes(stream)?;
        self.vertresolution.to_bytes(stream)?;
        stream.skip(4)?;
        self.frame_count.to_bytes(stream)?;
        self.compressor_name.to_bytes(stream)?;
        self.depth.to_bytes(stream)?;
        (-1i16).to_bytes(stream)?;
        encode_children(&self.boxes, stream)
    }
}

//  class AudioSampleEntry(codingname) extends SampleEntry (codingname){
//      const unsigned int(8)[6] reserved = 0;
//      unsigned int(16) data_reference_index;
//      const unsigned int(32)[2] reserved = 0;
//      template unsigned int(16) channelcount = 2;
//      template unsigned int(16) samplesize = 16;
//      unsigned int(16) pre_defined = 0;
//      const unsigned int(16) reserved = 0 ;
//      template unsigned int(32) samplerate = { default samplerate of media}<<16;
//  }
//
// The first reserved words are the QuickTime sound description version
// and revision. Version 1 adds 16 bytes, version 2 adds 36 bytes before
// the child boxes.

/// Audio sample entry (mp4a, enca).
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSampleEntry {
    pub fourcc:               FourCC,
    pub data_reference_index: u16,
    /// QuickTime sound description version, 0 for plain ISO files.
    pub version:              u16,
    pub revision:             u16,
    pub vendor:               u32,
    pub channel_count:        u16,
    pub sample_size:          u16,
    pub compression_id:       u16,
    pub packet_size:          u16,
    /// 16.16 fixed point.
    pub sample_rate:          u32,
    /// Version 1 / 2 extension, kept as-is.
    pub qt_extension:         Vec<u8>,
    pub boxes:                Vec<MP4Box>,
}

const AUDIO_PREFIX: u64 = 28;

impl AudioSampleEntry {
    declare_box_methods!(ProtectionSchemeInfoBox, protection_info, protection_info_mut);

    /// Append a child box.
    pub fn add_child(&mut self, child: impl Into<MP4Box>) {
        self.boxes.push(child.into());
    }

    fn extension_size(version: u16) -> u64 {
        match version {
            1 => 16,
            2 => 36,
            _ => 0,
        }
    }
}

impl BoxInfo for AudioSampleEntry {
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
    fn boxes(&self) -> Option<&[MP4Box]> {
        Some(&self.boxes[..])
    }
    fn summary(&self) -> String {
        format!("{} ch, {} Hz", self.channel_count, self.sample_rate >> 16)
    }
}

impl BoxCodec for AudioSampleEntry {
    fn decode(header: &BoxHeader, start: u64, stream: &mut SliceReader<'_>) -> Result<AudioSampleEntry> {
        stream.skip(6)?;
        let data_reference_index = u16::from_bytes(stream)?;
        let version = u16::from_bytes(stream)?;
        let revision = u16::from_bytes(stream)?;
        let vendor = u32::from_bytes(stream)?;
        let channel_count = u16::from_bytes(stream)?;
        let sample_size = u16::from_bytes(stream)?;
        let compression_id = u16::from_bytes(stream)?;
        let packet_size = u16::from_bytes(stream)?;
        let sample_rate = u32::from_bytes(stream)?;
        let ext = AudioSampleEntry::extension_size(version);
        let qt_extension = stream.read(ext)?.to_vec();
        let first = start + header.header_size() + AUDIO_PREFIX + ext;
        let boxes = decode_children(first, start + header.size, stream)?;
        Ok(AudioSampleEntry {
            fourcc: header.fourcc,
            data_reference_index,
            version,
            revision,
            vendor,
            channel_count,
            sample_size,
            compression_id,
            packet_size,
            sample_rate,
            qt_extension,
            boxes,
        })
    }

    fn payload_size(&self) -> u64 {
        AUDIO_PREFIX + self.qt_extension.len() as u64 + children_size(&self.boxes)
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        stream.skip(6)?;
        self.data_reference_index.to_bytes(stream)?;
        self.version.to_bytes(stream)?;
        self.revision.to_bytes(stream)?;
        self.vendor.to_bytes(stream)?;
        self.channel_count.to_bytes(stream)?;
        self.sample_size.to_bytes(stream)?;
        self.compression_id.to_bytes(stream)?;
        self.packet_size.to_bytes(stream)?;
        self.sample_rate.to_bytes(stream)?;
        stream.write(&self.qt_extension)?;
        encode_children(&self.boxes, stream)
    }
}
