//! Basic serializer / deserializer.
//!
//! The ReadBytes/WriteBytes cursor traits and the FromBytes/ToBytes
//! traits are defined here, with the implementations for the primitive
//! big-endian integer types and fixed-size byte arrays.
//!
use auto_impl::auto_impl;
use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Byte reader in a stream.
#[auto_impl(&mut)]
pub trait ReadBytes {
    /// Read an exact number of bytes, return a reference to the buffer.
    fn read(&mut self, amount: u64) -> Result<&[u8]>;
    /// Skip some bytes in the input.
    fn skip(&mut self, amount: u64) -> Result<()>;
    /// How much data is left?
    fn left(&self) -> u64;
    /// Current position, relative to the start of this reader.
    fn pos(&self) -> u64;
}

/// Byte writer in a stream.
#[auto_impl(&mut)]
pub trait WriteBytes {
    /// Write an exact number of bytes.
    fn write(&mut self, data: &[u8]) -> Result<()>;
    /// Zero-fill some bytes in the output.
    fn skip(&mut self, amount: u64) -> Result<()>;
}

/// Sequential reader over an in-memory buffer.
///
/// Every box is decoded from a `SliceReader` that is bounded to exactly
/// the payload of that box, see [`limit`](SliceReader::limit).
#[derive(Clone, Copy, Debug)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> SliceReader<'a> {
        SliceReader { data, pos: 0 }
    }

    #[inline]
    fn check(&self, amount: u64) -> Result<usize> {
        let left = (self.data.len() - self.pos) as u64;
        if amount > left {
            return Err(Error::TruncatedInput { need: amount, left });
        }
        Ok(amount as usize)
    }

    /// Like `read`, but the returned slice lives as long as the buffer.
    pub fn read_slice(&mut self, amount: u64) -> Result<&'a [u8]> {
        let amount = self.check(amount)?;
        let data = self.data;
        let res = &data[self.pos..self.pos + amount];
        self.pos += amount;
        Ok(res)
    }

    /// Split off a reader for the next `amount` bytes, and skip over them.
    pub fn limit(&mut self, amount: u64) -> Result<SliceReader<'a>> {
        Ok(SliceReader::new(self.read_slice(amount)?))
    }

    /// Everything that has not been read yet.
    pub fn remaining(&mut self) -> &'a [u8] {
        let data = self.data;
        let res = &data[self.pos..];
        self.pos = data.len();
        res
    }
}

impl ReadBytes for SliceReader<'_> {
    #[inline]
    fn read(&mut self, amount: u64) -> Result<&[u8]> {
        self.read_slice(amount)
    }

    #[inline]
    fn skip(&mut self, amount: u64) -> Result<()> {
        let amount = self.check(amount)?;
        self.pos += amount;
        Ok(())
    }

    #[inline]
    fn left(&self) -> u64 {
        (self.data.len() - self.pos) as u64
    }

    #[inline]
    fn pos(&self) -> u64 {
        self.pos as u64
    }
}

impl WriteBytes for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }
    fn skip(&mut self, amount: u64) -> Result<()> {
        let len = self.len() + amount as usize;
        self.resize(len, 0);
        Ok(())
    }
}

/// Trait to deserialize a type.
pub trait FromBytes {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> Result<Self>
    where
        Self: Sized;
    fn min_size() -> usize;
}

/// Trait to serialize a type.
pub trait ToBytes {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> Result<()>;
}

// Convenience macro to implement FromBytes/ToBytes for integer types.
macro_rules! def_from_to_bytes {
    ($type:ident, $read:ident, $write:ident) => {
        impl FromBytes for $type {
            fn from_bytes<R: ReadBytes>(stream: &mut R) -> Result<$type> {
                let data = stream.read(std::mem::size_of::<$type>() as u64)?;
                Ok(BigEndian::$read(data))
            }
            fn min_size() -> usize {
                std::mem::size_of::<$type>()
            }
        }
        impl ToBytes for $type {
            fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
                let mut buf = [0u8; std::mem::size_of::<$type>()];
                BigEndian::$write(&mut buf, *self);
                stream.write(&buf[..])
            }
        }
    };
}

def_from_to_bytes!(u16, read_u16, write_u16);
def_from_to_bytes!(i16, read_i16, write_i16);
def_from_to_bytes!(u32, read_u32, write_u32);
def_from_to_bytes!(i32, read_i32, write_i32);
def_from_to_bytes!(u64, read_u64, write_u64);

impl FromBytes for u8 {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> Result<u8> {
        Ok(stream.read(1)?[0])
    }
    fn min_size() -> usize {
        1
    }
}

impl ToBytes for u8 {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        stream.write(&[*self])
    }
}

impl<const N: usize> FromBytes for [u8; N] {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> Result<[u8; N]> {
        let data = stream.read(N as u64)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(data);
        Ok(buf)
    }
    fn min_size() -> usize {
        N
    }
}

impl<const N: usize> ToBytes for [u8; N] {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        stream.write(&self[..])
    }
}

/// Read a 24 bit big-endian value.
pub(crate) fn read_u24<R: ReadBytes>(stream: &mut R) -> Result<u32> {
    let data = stream.read(3)?;
    Ok(BigEndian::read_u24(data))
}

/// Write a 24 bit big-endian value.
pub(crate) fn write_u24<W: WriteBytes>(stream: &mut W, value: u32) -> Result<()> {
    let mut buf = [0u8; 3];
    BigEndian::write_u24(&mut buf, value & 0x00ff_ffff);
    stream.write(&buf[..])
}
