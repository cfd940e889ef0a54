//! Small value types used in boxes.
//!
use std::fmt::{self, Debug, Display};
use std::io;

use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::serialize::{FromBytes, ReadBytes, ToBytes, WriteBytes};

/// FourCC is the 4-byte name of any box. Usually this is four bytes
/// of ASCII characters, but it could be anything.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Build a FourCC from a 4 character string literal.
    pub const fn new(s: &str) -> FourCC {
        let b = s.as_bytes();
        FourCC([b[0], b[1], b[2], b[3]])
    }

    /// The raw bytes.
    pub fn to_be_bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(b: &[u8; 4]) -> FourCC {
        FourCC(*b)
    }
}

impl PartialEq<&[u8; 4]> for FourCC {
    fn eq(&self, other: &&[u8; 4]) -> bool {
        &self.0 == *other
    }
}

impl PartialEq<&str> for FourCC {
    fn eq(&self, other: &&str) -> bool {
        &self.0[..] == other.as_bytes()
    }
}

impl FromBytes for FourCC {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> Result<FourCC> {
        Ok(FourCC(<[u8; 4]>::from_bytes(stream)?))
    }
    fn min_size() -> usize {
        4
    }
}

impl ToBytes for FourCC {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        stream.write(&self.0[..])
    }
}

impl Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.iter().all(|&c| c >= 32 && c <= 126) {
            // all printable, so this is valid utf-8.
            write!(f, "{}", String::from_utf8_lossy(&self.0[..]))
        } else {
            write!(f, "0x{:08x}", u32::from_be_bytes(self.0))
        }
    }
}

impl Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl std::str::FromStr for FourCC {
    type Err = io::Error;
    fn from_str(s: &str) -> std::result::Result<FourCC, io::Error> {
        let b = s.as_bytes();
        if b.len() != 4 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "fourcc must be 4 bytes"));
        }
        Ok(FourCC([b[0], b[1], b[2], b[3]]))
    }
}

/// 8.8.3.1 Sample flags (ISO/IEC 14496-12:2015(E)).
///
/// ```text
/// bit(4)  reserved=0;
/// unsigned int(2) is_leading;
/// unsigned int(2) sample_depends_on;
/// unsigned int(2) sample_is_depended_on;
/// unsigned int(2) sample_has_redundancy;
/// bit(3)  sample_padding_value;
/// bit(1)  sample_is_non_sync_sample;
/// unsigned int(16) sample_degradation_priority;
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SampleFlags(pub u32);

impl SampleFlags {
    /// Flags for a sync sample that does not depend on others.
    pub fn sync() -> SampleFlags {
        let mut f = SampleFlags(0);
        f.set_sample_depends_on(2);
        f
    }

    /// Flags for a non-sync sample that depends on others.
    pub fn non_sync() -> SampleFlags {
        let mut f = SampleFlags(0);
        f.set_sample_depends_on(1);
        f.set_is_non_sync_sample(true);
        f
    }

    pub fn is_leading(&self) -> u8 {
        ((self.0 >> 26) & 0x03) as u8
    }

    pub fn sample_depends_on(&self) -> u8 {
        ((self.0 >> 24) & 0x03) as u8
    }

    pub fn set_sample_depends_on(&mut self, value: u8) {
        self.0 = (self.0 & !(0x03 << 24)) | ((value as u32 & 0x03) << 24);
    }

    pub fn sample_is_depended_on(&self) -> u8 {
        ((self.0 >> 22) & 0x03) as u8
    }

    pub fn sample_has_redundancy(&self) -> u8 {
        ((self.0 >> 20) & 0x03) as u8
    }

    pub fn sample_padding_value(&self) -> u8 {
        ((self.0 >> 17) & 0x07) as u8
    }

    pub fn is_non_sync_sample(&self) -> bool {
        (self.0 & 0x0001_0000) != 0
    }

    pub fn set_is_non_sync_sample(&mut self, on: bool) {
        if on {
            self.0 |= 0x0001_0000;
        } else {
            self.0 &= !0x0001_0000;
        }
    }

    pub fn sample_degradation_priority(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    /// A sync sample is one that is not marked non-sync.
    pub fn is_sync(&self) -> bool {
        !self.is_non_sync_sample()
    }
}

impl FromBytes for SampleFlags {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> Result<SampleFlags> {
        Ok(SampleFlags(u32::from_bytes(stream)?))
    }
    fn min_size() -> usize {
        4
    }
}

impl ToBytes for SampleFlags {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        self.0.to_bytes(stream)
    }
}

impl Debug for SampleFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut v = vec!["["];
        match self.sample_depends_on() {
            1 => v.push("depends_on"),
            2 => v.push("independent"),
            _ => {},
        }
        if self.is_non_sync_sample() {
            v.push("non_sync");
        }
        v.push("]");
        write!(f, "SampleFlags(0x{:08x} {})", self.0, v.join(" "))
    }
}

impl Serialize for SampleFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}
