//! Read, write and decrypt fragmented MP4 (ISOBMFF) files.
//!
//! - `mp4box` and `boxes`: the box tree, decoded from and encoded to bytes.
//! - `track` and `fragment`: tracks, fragments and their resolved samples.
//! - `cenc`: Common Encryption (`cenc` scheme) decryption.
//! - `subtitle`: WebVTT extraction from `wvtt` tracks.
//!
#[macro_use]
mod macros;

pub mod boxes;
pub mod cenc;
pub mod debug;
pub mod error;
pub mod fragment;
pub mod io;
pub mod mp4box;
pub mod serialize;
pub mod subtitle;
pub mod track;
pub mod types;

pub use crate::error::{Error, Result};
pub use crate::mp4box::{MP4Box, MP4};
