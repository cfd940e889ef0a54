//
// ISO/IEC 14496-30:2014(E)
// WebVTT in ISOBMFF: the sample entry and the cue boxes.
//
// A wvtt sample is a sequence of boxes: either one vtte (no cue active
// in this interval) or one or more vttc boxes, each holding the cue
// id, settings and text as leaf boxes.
//
use crate::boxes::prelude::*;
use crate::mp4box::{read_boxes, write_boxes};

// A leaf box whose whole payload is one UTF-8 string, without a length
// or terminator. The size of the box is the only framing.
macro_rules! text_box {
    ($(#[$outer:meta])* $name:ident, $fourcc:expr, $field:ident) => {
        $(#[$outer])*
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            pub $field: String,
        }

        impl $name {
            pub fn new(s: impl Into<String>) -> $name {
                $name { $field: s.into() }
            }
        }

        impl BoxInfo for $name {
            fn fourcc(&self) -> FourCC {
                FourCC::new($fourcc)
            }
            fn summary(&self) -> String {
                format!("{:?}", self.$field)
            }
        }

        impl BoxCodec for $name {
            fn decode(header: &BoxHeader, start: u64, stream: &mut SliceReader<'_>) -> Result<$name> {
                let data = stream.remaining();
                let $field = std::str::from_utf8(data)
                    .map_err(|_| Error::invalid(format!("{} at {}: text is not UTF-8", header.fourcc, start)))?
                    .to_string();
                Ok($name { $field })
            }

            fn payload_size(&self) -> u64 {
                self.$field.len() as u64
            }

            fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
                stream.write(self.$field.as_bytes())
            }
        }
    };
}

/// WebVTT sample entry.
///
/// Six reserved bytes and the data reference index, then the vttC,
/// vlab and btrt boxes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WvttSampleEntry {
    pub data_reference_index: u16,
    pub boxes:                Vec<MP4Box>,
}

impl WvttSampleEntry {
    declare_box_methods!(WebVTTConfigurationBox, config, config_mut);
    declare_box_methods!(WebVTTSourceLabelBox, source_label, source_label_mut);
    declare_box_methods!(BitRateBox, bit_rate, bit_rate_mut);

    /// Append a child box.
    pub fn add_child(&mut self, child: impl Into<MP4Box>) {
        self.boxes.push(child.into());
    }
}

impl BoxInfo for WvttSampleEntry {
    fn fourcc(&self) -> FourCC {
        FourCC::new("wvtt")
    }
    fn boxes(&self) -> Option<&[MP4Box]> {
        Some(&self.boxes[..])
    }
}

impl BoxCodec for WvttSampleEntry {
    fn decode(header: &BoxHeader, start: u64, stream: &mut SliceReader<'_>) -> Result<WvttSampleEntry> {
        stream.skip(6)?;
        let data_reference_index = u16::from_bytes(stream)?;
        let boxes = decode_children(start + header.header_size() + 8, start + header.size, stream)?;
        Ok(WvttSampleEntry {
            data_reference_index,
            boxes,
        })
    }

    fn payload_size(&self) -> u64 {
        8 + children_size(&self.boxes)
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        stream.skip(6)?;
        self.data_reference_index.to_bytes(stream)?;
        encode_children(&self.boxes, stream)
    }
}

text_box! {
    /// WebVTT configuration: the text before the first cue.
    WebVTTConfigurationBox, "vttC", config
}

text_box! {
    /// WebVTT source label.
    WebVTTSourceLabelBox, "vlab", source_label
}

/// 8.5.2.2 BitRateBox (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BitRateBox {
    pub buffer_size_db: u32,
    pub max_bitrate:    u32,
    pub avg_bitrate:    u32,
}

impl BoxInfo for BitRateBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("btrt")
    }
    fn summary(&self) -> String {
        format!("max {} avg {}", self.max_bitrate, self.avg_bitrate)
    }
}

impl BoxCodec for BitRateBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<BitRateBox> {
        Ok(BitRateBox {
            buffer_size_db: u32::from_bytes(stream)?,
            max_bitrate:    u32::from_bytes(stream)?,
            avg_bitrate:    u32::from_bytes(stream)?,
        })
    }

    fn payload_size(&self) -> u64 {
        12
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        self.buffer_size_db.to_bytes(stream)?;
        self.max_bitrate.to_bytes(stream)?;
        self.avg_bitrate.to_bytes(stream)
    }
}

/// Empty cue: no cue is active during this sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VTTEmptyCueBox;

impl BoxInfo for VTTEmptyCueBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("vtte")
    }
}

impl BoxCodec for VTTEmptyCueBox {
    fn decode(_header: &BoxHeader, _start: u64, _stream: &mut SliceReader<'_>) -> Result<VTTEmptyCueBox> {
        Ok(VTTEmptyCueBox)
    }

    fn payload_size(&self) -> u64 {
        0
    }

    fn encode_payload<W: WriteBytes>(&self, _stream: &mut W) -> Result<()> {
        Ok(())
    }
}

container_box! {
    /// A cue. Holds the optional vsid, iden, ctim, sttg boxes and a payl.
    VTTCueBox, "vttc"
}

impl VTTCueBox {
    declare_box_methods!(CueSourceIDBox, source_id, source_id_mut);
    declare_box_methods!(CueIDBox, cue_id, cue_id_mut);
    declare_box_methods!(CueTimeBox, cue_time, cue_time_mut);
    declare_box_methods!(CueSettingsBox, settings, settings_mut);
    declare_box_methods!(CuePayloadBox, payload, payload_mut);
}

/// Cue source id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CueSourceIDBox {
    pub source_id: u32,
}

impl BoxInfo for CueSourceIDBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("vsid")
    }
    fn summary(&self) -> String {
        self.source_id.to_string()
    }
}

impl BoxCodec for CueSourceIDBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<CueSourceIDBox> {
        Ok(CueSourceIDBox {
            source_id: u32::from_bytes(stream)?,
        })
    }

    fn payload_size(&self) -> u64 {
        4
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        self.source_id.to_bytes(stream)
    }
}

text_box! {
    /// Current time of the cue, for cues with inner timestamps.
    CueTimeBox, "ctim", cue_current_time
}

text_box! {
    /// Cue identifier.
    CueIDBox, "iden", cue_id
}

text_box! {
    /// Cue settings.
    CueSettingsBox, "sttg", settings
}

text_box! {
    /// Cue text.
    CuePayloadBox, "payl", cue_text
}

text_box! {
    /// Text between cues (comments).
    VTTAdditionalTextBox, "vtta", cue_additional_text
}

/// Decode the cue boxes in one wvtt sample.
pub fn decode_cues(sample: &[u8]) -> Result<Vec<MP4Box>> {
    read_boxes(&mut SliceReader::new(sample), 0)
}

/// Encode cue boxes into a wvtt sample.
pub fn encode_cues(boxes: &[MP4Box]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(children_size(boxes) as usize);
    write_boxes(&mut buf, boxes)?;
    Ok(buf)
}
