//! File access.
//!
use std::fs;
use std::io;
use std::ops::Deref;

use memmap::{Mmap, MmapOptions};

use crate::error::Result;
use crate::mp4box::MP4;

/// A memory mapped MP4 file.
///
/// Derefs to `&[u8]`, so it can be handed to `MP4::read` directly.
pub struct Mp4File {
    map:            Option<Mmap>,
    input_filename: String,
}

impl Mp4File {
    /// Open and map an mp4 file.
    pub fn open(path: impl AsRef<str>) -> io::Result<Mp4File> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        let size = file.metadata()?.len();

        // mmap of a zero length file fails on some systems.
        let map = if size > 0 {
            Some(unsafe { MmapOptions::new().len(size as usize).map(&file)? })
        } else {
            None
        };
        log::debug!("Mp4File::open: {}: {} bytes", path, size);

        Ok(Mp4File {
            map,
            input_filename: path.to_string(),
        })
    }

    /// Name of the file as it was opened.
    pub fn input_filename(&self) -> &str {
        &self.input_filename
    }

    /// Decode all boxes in the file.
    pub fn read_mp4(&self) -> Result<MP4> {
        MP4::read(self)
    }
}

impl Deref for Mp4File {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self.map.as_ref() {
            Some(map) => &map[..],
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn open_and_read() {
        let path = std::env::temp_dir().join(format!("mp4cenc-io-{}.mp4", std::process::id()));
        let bytes = [0, 0, 0, 12, b'f', b'r', b'e', b'e', 1, 2, 3, 4];
        fs::File::create(&path).unwrap().write_all(&bytes).unwrap();

        let file = Mp4File::open(path.to_str().unwrap()).unwrap();
        assert_eq!(&file[..], &bytes[..]);
        let mp4 = file.read_mp4().unwrap();
        assert_eq!(mp4.boxes.len(), 1);
        assert_eq!(mp4.size(), 12);

        drop(file);
        fs::remove_file(&path).unwrap();
    }
}
