//! Box header, box traits, the dispatcher and the `MP4` struct.
//!
//! Every box is decoded from a fully buffered payload. The dispatcher
//! reads a header, looks up the decoder for the four-character code in
//! the registry that `def_boxes!` builds, and hands it a reader that is
//! bounded to exactly the declared payload. Containers call back into
//! the dispatcher through [`decode_children`].
//!
use std::fmt::{self, Debug};

use crate::boxes::{MovieBox, REGISTRY};
use crate::error::{Error, Result};
use crate::serialize::{read_u24, write_u24, FromBytes, ReadBytes, SliceReader, ToBytes, WriteBytes};
use crate::types::FourCC;

pub use crate::boxes::MP4Box;

/// Gets implemented for every box.
pub trait BoxInfo {
    /// The "fourcc" name of this box.
    fn fourcc(&self) -> FourCC;
    /// Sub-boxes if this is a container.
    fn boxes(&self) -> Option<&[MP4Box]> {
        None
    }
    /// Short human readable description of the payload.
    fn summary(&self) -> String {
        String::new()
    }
}

/// Decode and encode a box.
///
/// Implementations only deal with the payload. The header is written
/// by `encode`, and its size is derived from `payload_size`, so the
/// size of a box is always recomputed from its current contents.
pub trait BoxCodec: BoxInfo {
    /// Decode the payload. `stream` is bounded to exactly the payload,
    /// `start` is the offset of the first byte of the box header.
    fn decode(header: &BoxHeader, start: u64, stream: &mut SliceReader<'_>) -> Result<Self>
    where
        Self: Sized;

    /// Size of the payload in bytes, not counting the header.
    fn payload_size(&self) -> u64;

    /// Write the payload.
    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()>;

    /// Write a 64 bit header even if the size fits in 32 bits.
    fn extended_size(&self) -> bool {
        false
    }

    /// Total size, header included.
    fn size(&self) -> u64 {
        let payload = self.payload_size();
        header_size(payload, self.extended_size()) + payload
    }

    /// Write header and payload.
    fn encode<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_header(stream, self.fourcc(), self.size(), self.extended_size())?;
        self.encode_payload(stream)
    }
}

/// The box header: size, type and whether a 64 bit size was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    /// Size of the box including the header.
    pub size:          u64,
    pub fourcc:        FourCC,
    pub extended_size: bool,
}

impl BoxHeader {
    /// Number of bytes the header took.
    pub fn header_size(&self) -> u64 {
        if self.extended_size {
            16
        } else {
            8
        }
    }

    /// Number of bytes in the payload.
    pub fn payload_size(&self) -> u64 {
        self.size - self.header_size()
    }
}

/// Size of the smallest header that can describe a payload of this size.
pub(crate) fn header_size(payload_size: u64, extended: bool) -> u64 {
    if extended || payload_size + 8 > u32::MAX as u64 {
        16
    } else {
        8
    }
}

/// Read a box header. Returns the header and the number of bytes read.
///
/// A size of 0 means "until the end of the stream", which is the end of
/// the file or of the containing box. A size of 1 means a 64 bit size
/// follows the type.
pub fn read_header<R: ReadBytes>(stream: &mut R) -> Result<(BoxHeader, u64)> {
    let size32 = u32::from_bytes(stream)?;
    let fourcc = FourCC::from_bytes(stream)?;
    let (size, extended_size) = match size32 {
        0 => (8 + stream.left(), false),
        1 => {
            let size = u64::from_bytes(stream)?;
            if size < 16 {
                return Err(Error::invalid(format!("{}: box size {} smaller than header", fourcc, size)));
            }
            (size, true)
        },
        x if x < 8 => {
            return Err(Error::invalid(format!("{}: box size {} smaller than header", fourcc, x)));
        },
        x => (x as u64, false),
    };
    let header = BoxHeader {
        size,
        fourcc,
        extended_size,
    };
    let left = stream.left();
    if header.payload_size() > left {
        return Err(Error::TruncatedInput {
            need: header.payload_size(),
            left,
        });
    }
    Ok((header, header.header_size()))
}

/// Write a box header. The type code is written as its raw bytes.
pub fn write_header<W: WriteBytes>(stream: &mut W, fourcc: FourCC, size: u64, extended: bool) -> Result<()> {
    if extended || size > u32::MAX as u64 {
        1u32.to_bytes(stream)?;
        fourcc.to_bytes(stream)?;
        size.to_bytes(stream)
    } else {
        (size as u32).to_bytes(stream)?;
        fourcc.to_bytes(stream)
    }
}

/// Read the version and flags of a full box.
pub(crate) fn read_version_flags<R: ReadBytes>(stream: &mut R) -> Result<(u8, u32)> {
    let version = u8::from_bytes(stream)?;
    let flags = read_u24(stream)?;
    Ok((version, flags))
}

/// Write the version and flags of a full box.
pub(crate) fn write_version_flags<W: WriteBytes>(stream: &mut W, version: u8, flags: u32) -> Result<()> {
    version.to_bytes(stream)?;
    write_u24(stream, flags)
}

pub(crate) type DecodeFn = fn(&BoxHeader, u64, &mut SliceReader<'_>) -> Result<MP4Box>;

pub(crate) fn decode_as<B>(header: &BoxHeader, start: u64, stream: &mut SliceReader<'_>) -> Result<MP4Box>
where
    B: BoxCodec + Into<MP4Box>,
{
    Ok(B::decode(header, start, stream)?.into())
}

/// Decode one box that starts at file offset `start`.
///
/// Returns `Error::EndOfStream` if the stream is empty, so that callers
/// can tell "no more boxes" apart from a broken one. Unknown types are
/// decoded as a [`GenericBox`].
pub fn decode_box(start: u64, stream: &mut SliceReader<'_>) -> Result<MP4Box> {
    if stream.left() == 0 {
        return Err(Error::EndOfStream);
    }
    let (header, _) = read_header(stream)?;
    let mut payload = stream.limit(header.payload_size())?;
    log::trace!("decode_box: {:?} at offset {}", header, start);

    let b = match REGISTRY.get(&header.fourcc) {
        Some(decode) => decode(&header, start, &mut payload)?,
        None => MP4Box::GenericBox(GenericBox::decode(&header, start, &mut payload)?),
    };
    if payload.left() > 0 {
        log::warn!(
            "{} at offset {}: skipping {} bytes of trailing data",
            header.fourcc,
            start,
            payload.left()
        );
    }
    Ok(b)
}

/// Decode the children of a container.
///
/// `first_child_offset` and `end_offset` are file offsets; the stream
/// must hold exactly the bytes in between. Children that run past
/// `end_offset`, or a stream that ends before it, make the container
/// malformed.
pub fn decode_children(first_child_offset: u64, end_offset: u64, stream: &mut SliceReader<'_>) -> Result<Vec<MP4Box>> {
    let mut boxes = Vec::new();
    let mut pos = first_child_offset;
    while pos != end_offset {
        if pos > end_offset {
            return Err(Error::malformed(pos, format!("child boxes overrun parent ending at {}", end_offset)));
        }

        // Peek at the header first, a child that claims more bytes
        // than the parent has left overruns the parent.
        let mut peek = *stream;
        match read_header(&mut peek) {
            Ok(_) => {},
            Err(Error::TruncatedInput { .. }) => {
                return Err(Error::malformed(
                    pos,
                    format!("child box overruns parent ending at {}", end_offset),
                ));
            },
            Err(e) => return Err(e),
        }

        let before = stream.pos();
        let child = match decode_box(pos, stream) {
            Ok(child) => child,
            Err(Error::EndOfStream) => {
                return Err(Error::malformed(pos, format!("end of stream before {}", end_offset)));
            },
            Err(e) => return Err(e),
        };
        pos += stream.pos() - before;
        boxes.push(child);
    }
    Ok(boxes)
}

/// Write the children of a container, in order, without padding.
pub fn encode_children<W: WriteBytes>(children: &[MP4Box], stream: &mut W) -> Result<()> {
    for child in children {
        child.encode(stream)?;
    }
    Ok(())
}

/// Sum of the sizes of a list of boxes.
pub fn children_size(children: &[MP4Box]) -> u64 {
    children.iter().map(|c| c.size()).sum()
}

/// Size of a plain container holding these children, header included.
pub fn container_size(children: &[MP4Box]) -> u64 {
    let payload = children_size(children);
    header_size(payload, false) + payload
}

/// Read a collection of boxes from a stream, until it is exhausted.
///
/// `start` is the file offset of the first byte in the stream.
pub fn read_boxes(stream: &mut SliceReader<'_>, start: u64) -> Result<Vec<MP4Box>> {
    let mut boxes = Vec::new();
    let mut pos = start;
    loop {
        let before = stream.pos();
        match decode_box(pos, stream) {
            Ok(b) => {
                pos += stream.pos() - before;
                boxes.push(b);
            },
            Err(Error::EndOfStream) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(boxes)
}

/// Write a collection of boxes to a stream.
pub fn write_boxes<W: WriteBytes>(stream: &mut W, boxes: &[MP4Box]) -> Result<()> {
    encode_children(boxes, stream)
}

/// Any unknown boxes we encounter are put into a GenericBox.
///
/// The payload is kept verbatim, so it is written back byte for byte.
#[derive(Clone, PartialEq)]
pub struct GenericBox {
    pub fourcc: FourCC,
    pub data:   Vec<u8>,
}

impl BoxInfo for GenericBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
    fn summary(&self) -> String {
        format!("{} bytes", self.data.len())
    }
}

impl BoxCodec for GenericBox {
    fn decode(header: &BoxHeader, _start: u64, stream: &mut SliceReader<'_>) -> Result<GenericBox> {
        Ok(GenericBox {
            fourcc: header.fourcc,
            data:   stream.remaining().to_vec(),
        })
    }

    fn payload_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        stream.write(&self.data)
    }
}

impl Debug for GenericBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut dbg = f.debug_struct("GenericBox");
        dbg.field("fourcc", &self.fourcc);
        let data = format!("[u8; {}]", self.data.len());
        dbg.field("data", &data);
        dbg.finish()
    }
}

/// Main entry point for ISOBMFF box structure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MP4 {
    /// The boxes at the top level.
    pub boxes: Vec<MP4Box>,
}

impl MP4 {
    /// Decode a complete file that is in memory.
    ///
    /// Any error in any box fails the whole file.
    pub fn read(data: &[u8]) -> Result<MP4> {
        let mut stream = SliceReader::new(data);
        let boxes = read_boxes(&mut stream, 0)?;
        Ok(MP4 { boxes })
    }

    /// Write the box structure.
    pub fn write<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
        write_boxes(stream, &self.boxes)
    }

    /// Write the box structure to a buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size() as usize);
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Size of the file when written.
    pub fn size(&self) -> u64 {
        children_size(&self.boxes)
    }

    /// Get a reference to the MovieBox.
    pub fn movie(&self) -> Option<&MovieBox> {
        first_box!(&self.boxes, MovieBox)
    }

    /// Get a mutable reference to the MovieBox.
    pub fn movie_mut(&mut self) -> Option<&mut MovieBox> {
        first_box_mut!(&mut self.boxes, MovieBox)
    }

    /// A file is fragmented if the movie has a MovieExtendsBox.
    pub fn is_fragmented(&self) -> bool {
        self.movie().map(|m| m.movie_extends().is_some()).unwrap_or(false)
    }
}
