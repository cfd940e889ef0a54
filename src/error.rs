//! Error type for decoding, sample resolution and decryption.
//!
use std::io;

use crate::types::FourCC;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while handling an MP4 file.
///
/// All of these are deterministic structural faults; retrying the same
/// operation on the same input gives the same error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fewer bytes are available than a declared size promises.
    #[error("truncated input: need {need} bytes, {left} left")]
    TruncatedInput { need: u64, left: u64 },

    /// Child boxes overrun or underrun the bounds of their parent.
    #[error("malformed container at offset {offset}: {reason}")]
    MalformedContainer { offset: u64, reason: String },

    /// Protection scheme or original format rejected by the caller.
    #[error("unsupported protection scheme {scheme} for format {format}")]
    UnsupportedScheme { scheme: FourCC, format: FourCC },

    /// A sample field was not resolved by the run, the fragment header
    /// or the track defaults.
    #[error("sample {sample}: no value for {field} in trun, tfhd or trex")]
    MissingDefaults { field: &'static str, sample: u32 },

    /// Initialization vectors are 8 or 16 bytes.
    #[error("invalid IV length {0}")]
    InvalidIvLength(usize),

    /// AES-128 keys are 16 bytes.
    #[error("invalid key length {0}")]
    InvalidKeyLength(usize),

    /// Clear + protected byte counts of a sample do not add up.
    #[error("subsample layout covers {layout} bytes, sample has {sample}")]
    InvalidSubsampleLayout { layout: u64, sample: u64 },

    /// No more boxes in the stream. Not a failure in itself, the
    /// container decoder decides what it means.
    #[error("end of stream")]
    EndOfStream,

    /// Field content that cannot be right.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A box that must be present is not.
    #[error("missing {0} box")]
    MissingBox(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Error {
        Error::InvalidData(msg.into())
    }

    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Error {
        Error::MalformedContainer {
            offset,
            reason: reason.into(),
        }
    }
}
