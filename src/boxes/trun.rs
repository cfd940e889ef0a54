//
// ISO/IEC 14496-12:2015(E)
// 8.8.8 Track Fragment Run Box
//
use crate::boxes::prelude::*;

//  aligned(8) class TrackRunBox
//  extends FullBox(‘trun’, version, tr_flags) {
//      unsigned int(32) sample_count;
//      // the following are optional fields
//      signed int(32) data_offset;
//      unsigned int(32) first_sample_flags;
//      // all fields in the following array are optional
//      {
//          unsigned int(32) sample_duration;
//          unsigned int(32) sample_size;
//          unsigned int(32) sample_flags
//          if (version == 0)
//              { unsigned int(32) sample_composition_time_offset; }
//          else
//              { signed int(32) sample_composition_time_offset; }
//      }[ sample_count ]
//  }

const DATA_OFFSET: u32 = 0x01;
const FIRST_SAMPLE_FLAGS: u32 = 0x04;
const SAMPLE_DURATION: u32 = 0x0100;
const SAMPLE_SIZE: u32 = 0x0200;
const SAMPLE_FLAGS: u32 = 0x0400;
const SAMPLE_CTO: u32 = 0x0800;
const KNOWN_FLAGS: u32 =
    DATA_OFFSET | FIRST_SAMPLE_FLAGS | SAMPLE_DURATION | SAMPLE_SIZE | SAMPLE_FLAGS | SAMPLE_CTO;

/// 8.8.8 Track Fragment Run Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackRunBox {
    pub version:            u8,
    /// Flag bits that do not describe field presence, kept as-is.
    pub other_flags:        u32,
    pub data_offset:        Option<i32>,
    pub first_sample_flags: Option<SampleFlags>,
    pub entries:            Vec<TrackRunEntry>,
}

/// One sample in a track run. `None` means "use the default".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackRunEntry {
    pub sample_duration:                Option<u32>,
    pub sample_size:                    Option<u32>,
    pub sample_flags:                   Option<SampleFlags>,
    /// Version 0 stores an unsigned value; it is kept bit-for-bit.
    pub sample_composition_time_offset: Option<i32>,
}

impl TrackRunBox {
    /// Build a run. Version 1 is used if any composition offset is negative.
    pub fn new(data_offset: Option<i32>, first_sample_flags: Option<SampleFlags>, entries: Vec<TrackRunEntry>) -> TrackRunBox {
        let negative = entries
            .iter()
            .any(|e| e.sample_composition_time_offset.map(|c| c < 0).unwrap_or(false));
        TrackRunBox {
            version: negative as u8,
            other_flags: 0,
            data_offset,
            first_sample_flags,
            entries,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Flags as they go on the wire.
    pub fn flags(&self) -> u32 {
        let any = |f: fn(&TrackRunEntry) -> bool| self.entries.iter().any(f);
        self.other_flags |
            self.data_offset.is_some() as u32 * DATA_OFFSET |
            self.first_sample_flags.is_some() as u32 * FIRST_SAMPLE_FLAGS |
            any(|e| e.sample_duration.is_some()) as u32 * SAMPLE_DURATION |
            any(|e| e.sample_size.is_some()) as u32 * SAMPLE_SIZE |
            any(|e| e.sample_flags.is_some()) as u32 * SAMPLE_FLAGS |
            any(|e| e.sample_composition_time_offset.is_some()) as u32 * SAMPLE_CTO
    }

    fn entry_size(flags: u32) -> u64 {
        [SAMPLE_DURATION, SAMPLE_SIZE, SAMPLE_FLAGS, SAMPLE_CTO]
            .iter()
            .filter(|&&f| flags & f != 0)
            .count() as u64 *
            4
    }
}

impl BoxInfo for TrackRunBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("trun")
    }
    fn summary(&self) -> String {
        format!(
            "{} samples, data_offset {:?}, flags 0x{:06x}",
            self.entries.len(),
            self.data_offset,
            self.flags()
        )
    }
}

impl BoxCodec for TrackRunBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<TrackRunBox> {
        let (version, flags) = read_version_flags(stream)?;

        let sample_count = u32::from_bytes(stream)?;
        let data_offset = (flags & DATA_OFFSET > 0).then(|| i32::from_bytes(stream)).transpose()?;
        let first_sample_flags = (flags & FIRST_SAMPLE_FLAGS > 0)
            .then(|| SampleFlags::from_bytes(stream))
            .transpose()?;

        // Check the count against what is actually there before allocating.
        let entry_size = TrackRunBox::entry_size(flags);
        if entry_size * sample_count as u64 > stream.left() {
            return Err(Error::TruncatedInput {
                need: entry_size * sample_count as u64,
                left: stream.left(),
            });
        }

        let mut entries = Vec::with_capacity(sample_count as usize);
        while entries.len() < sample_count as usize {
            let sample_duration = (flags & SAMPLE_DURATION > 0).then(|| u32::from_bytes(stream)).transpose()?;
            let sample_size = (flags & SAMPLE_SIZE > 0).then(|| u32::from_bytes(stream)).transpose()?;
            let sample_flags = (flags & SAMPLE_FLAGS > 0)
                .then(|| SampleFlags::from_bytes(stream))
                .transpose()?;
            let sample_composition_time_offset = (flags & SAMPLE_CTO > 0).then(|| i32::from_bytes(stream)).transpose()?;
            entries.push(TrackRunEntry {
                sample_duration,
                sample_size,
                sample_flags,
                sample_composition_time_offset,
            });
        }

        Ok(TrackRunBox {
            version,
            other_flags: flags & !KNOWN_FLAGS,
            data_offset,
            first_sample_flags,
            entries,
        })
    }

    fn payload_size(&self) -> u64 {
        let flags = self.flags();
        8 + self.data_offset.map(|_| 4).unwrap_or(0) +
            self.first_sample_flags.map(|_| 4).unwrap_or(0) +
            TrackRunBox::entry_size(flags) * self.entries.len() as u64
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        let flags = self.flags();
        write_version_flags(stream, self.version, flags)?;
        self.sample_count().to_bytes(stream)?;
        self.data_offset.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.first_sample_flags.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        for e in &self.entries {
            if flags & SAMPLE_DURATION > 0 {
                e.sample_duration.unwrap_or(0).to_bytes(stream)?;
            }
            if flags & SAMPLE_SIZE > 0 {
                e.sample_size.unwrap_or(0).to_bytes(stream)?;
            }
            if flags & SAMPLE_FLAGS > 0 {
                e.sample_flags.unwrap_or_default().to_bytes(stream)?;
            }
            if flags & SAMPLE_CTO > 0 {
                e.sample_composition_time_offset.unwrap_or(0).to_bytes(stream)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4box::decode_box;

    #[test]
    fn flags_follow_fields() {
        let entries = vec![
            TrackRunEntry {
                sample_size: Some(100),
                sample_composition_time_offset: Some(-10),
                ..TrackRunEntry::default()
            },
            TrackRunEntry {
                sample_size: Some(50),
                sample_composition_time_offset: Some(20),
                ..TrackRunEntry::default()
            },
        ];
        let trun = TrackRunBox::new(Some(120), None, entries);
        assert_eq!(trun.version, 1);
        assert_eq!(trun.flags(), DATA_OFFSET | SAMPLE_SIZE | SAMPLE_CTO);
        assert_eq!(trun.size(), 8 + 8 + 4 + 2 * 8);

        let bytes = MP4Box::from(trun.clone()).to_bytes().unwrap();
        assert_eq!(bytes.len() as u64, trun.size());
        match decode_box(0, &mut SliceReader::new(&bytes)).unwrap() {
            MP4Box::TrackRunBox(t) => assert_eq!(t, trun),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn sample_count_beyond_payload() {
        // version 0, flags: sample size present, 1000 samples, no data.
        let bytes = [0, 0, 0, 16, b't', b'r', b'u', b'n', 0, 0, 0x02, 0x00, 0, 0, 0x03, 0xe8];
        assert!(decode_box(0, &mut SliceReader::new(&bytes)).is_err());
    }
}
