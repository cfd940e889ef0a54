//
// ISO/IEC 23001-7:2016(E)
// 7.2 Sample Encryption Box
//
use crate::boxes::prelude::*;

//  aligned(8) class SampleEncryptionBox extends FullBox(‘senc’, version=0, flags) {
//      unsigned int(32) sample_count;
//      {
//          unsigned int(Per_Sample_IV_Size*8) InitializationVector;
//          if (flags & 0x000002) {
//              unsigned int(16) subsample_count;
//              {
//                  unsigned int(16) BytesOfClearData;
//                  unsigned int(32) BytesOfProtectedData;
//              } [ subsample_count ]
//          }
//      }[ sample_count ]
//  }
//
// Per_Sample_IV_Size comes from the tenc box in the init segment, it is
// not in the senc box itself. When decoding it is inferred from the size
// of the box; the result can be re-parsed with the real size later.

const USE_SUBSAMPLES: u32 = 0x02;

/// Clear / protected split of a part of a sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubsampleEntry {
    pub bytes_of_clear_data:     u16,
    pub bytes_of_protected_data: u32,
}

/// Encryption parameters of one sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SencEntry {
    /// 0, 8 or 16 bytes.
    pub iv:         Vec<u8>,
    /// Empty means the whole sample is protected.
    pub subsamples: Vec<SubsampleEntry>,
}

impl SencEntry {
    /// Total number of bytes described by the subsamples.
    pub fn subsample_bytes(&self) -> u64 {
        self.subsamples
            .iter()
            .map(|s| s.bytes_of_clear_data as u64 + s.bytes_of_protected_data as u64)
            .sum()
    }
}

/// 7.2 Sample Encryption Box (ISO/IEC 23001-7:2016(E))
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleEncryptionBox {
    pub version:     u8,
    /// Flag bits other than "subsamples present".
    pub other_flags: u32,
    /// Per-sample IV size used to parse `entries`.
    pub iv_size:     u8,
    pub entries:     Vec<SencEntry>,
}

impl SampleEncryptionBox {
    /// Build a box from a list of entries.
    pub fn new(entries: Vec<SencEntry>) -> SampleEncryptionBox {
        let iv_size = entries.first().map(|e| e.iv.len() as u8).unwrap_or(0);
        SampleEncryptionBox {
            version: 0,
            other_flags: 0,
            iv_size,
            entries,
        }
    }

    fn has_subsamples(&self) -> bool {
        self.entries.iter().any(|e| !e.subsamples.is_empty())
    }

    fn flags(&self) -> u32 {
        self.other_flags | self.has_subsamples() as u32 * USE_SUBSAMPLES
    }

    /// Parse the entries again with a known per-sample IV size.
    pub fn with_iv_size(&self, iv_size: u8) -> Result<SampleEncryptionBox> {
        if iv_size == self.iv_size {
            return Ok(self.clone());
        }
        let mut buf = Vec::new();
        self.encode_payload(&mut buf)?;
        let subsamples = self.has_subsamples();
        let data = &buf[8..];
        let entries = parse_entries(data, self.entries.len() as u32, subsamples, iv_size)
            .ok_or_else(|| Error::invalid(format!("senc: entries do not parse with IV size {}", iv_size)))?;
        Ok(SampleEncryptionBox {
            version: self.version,
            other_flags: self.other_flags,
            iv_size,
            entries,
        })
    }
}

// Parse all entries; only succeeds if the data is consumed exactly.
fn parse_entries(data: &[u8], count: u32, subsamples: bool, iv_size: u8) -> Option<Vec<SencEntry>> {
    let mut stream = SliceReader::new(data);
    let mut entries = Vec::with_capacity(std::cmp::min(count as usize, data.len()));
    for _ in 0..count {
        let iv = stream.read(iv_size as u64).ok()?.to_vec();
        let mut entry = SencEntry {
            iv,
            subsamples: Vec::new(),
        };
        if subsamples {
            let n = u16::from_bytes(&mut stream).ok()?;
            for _ in 0..n {
                entry.subsamples.push(SubsampleEntry {
                    bytes_of_clear_data:     u16::from_bytes(&mut stream).ok()?,
                    bytes_of_protected_data: u32::from_bytes(&mut stream).ok()?,
                });
            }
        }
        entries.push(entry);
    }
    if stream.left() != 0 {
        return None;
    }
    Some(entries)
}

// Work out the per-sample IV size from the payload size.
fn infer_iv_size(data: &[u8], count: u32, subsamples: bool) -> Result<(u8, Vec<SencEntry>)> {
    if !subsamples {
        if count == 0 {
            if !data.is_empty() {
                return Err(Error::invalid("senc: data but no samples"));
            }
            return Ok((0, Vec::new()));
        }
        let size = data.len() / count as usize;
        if data.len() % count as usize == 0 && (size == 0 || size == 8 || size == 16) {
            if let Some(entries) = parse_entries(data, count, false, size as u8) {
                return Ok((size as u8, entries));
            }
        }
    } else {
        for &size in &[8u8, 16, 0] {
            if let Some(entries) = parse_entries(data, count, true, size) {
                return Ok((size, entries));
            }
        }
    }
    Err(Error::invalid(format!(
        "senc: cannot determine IV size for {} samples in {} bytes",
        count,
        data.len()
    )))
}

impl BoxInfo for SampleEncryptionBox {
    fn fourcc(&self) -> FourCC {
        FourCC::new("senc")
    }
    fn summary(&self) -> String {
        format!(
            "{} samples, iv_size {}, subsamples {}",
            self.entries.len(),
            self.iv_size,
            self.has_subsamples()
        )
    }
}

impl BoxCodec for SampleEncryptionBox {
    fn decode(_header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<SampleEncryptionBox> {
        let (version, flags) = read_version_flags(stream)?;
        let sample_count = u32::from_bytes(stream)?;
        let data = stream.remaining();
        let (iv_size, entries) = infer_iv_size(data, sample_count, flags & USE_SUBSAMPLES != 0)?;
        log::debug!("senc: {} samples, inferred IV size {}", sample_count, iv_size);
        Ok(SampleEncryptionBox {
            version,
            other_flags: flags & !USE_SUBSAMPLES,
            iv_size,
            entries,
        })
    }

    fn payload_size(&self) -> u64 {
        let subsamples = self.has_subsamples();
        let entries: u64 = self
            .entries
            .iter()
            .map(|e| {
                let subs = if subsamples { 2 + 6 * e.subsamples.len() as u64 } else { 0 };
                e.iv.len() as u64 + subs
            })
            .sum();
        8 + entries
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        let flags = self.flags();
        write_version_flags(stream, self.version, flags)?;
        (self.entries.len() as u32).to_bytes(stream)?;
        for e in &self.entries {
            stream.write(&e.iv)?;
            if flags & USE_SUBSAMPLES != 0 {
                (e.subsamples.len() as u16).to_bytes(stream)?;
                for s in &e.subsamples {
                    s.bytes_of_clear_data.to_bytes(stream)?;
                    s.bytes_of_protected_data.to_bytes(stream)?;
                }
            }
        }
        Ok(())
    }
}
