//! Track information from the initialization segment.
//!
use serde::Serialize;

use crate::boxes::*;
use crate::mp4box::{BoxInfo, MP4};
use crate::types::FourCC;

/// A track, with the defaults that its fragments inherit.
#[derive(Clone, Debug)]
pub struct Track<'a> {
    pub track_id:  u32,
    /// Media timescale from mdhd.
    pub timescale: u32,
    pub trak:      &'a TrackBox,
    /// Track level sample defaults, from mvex/trex.
    pub trex:      Option<&'a TrackExtendsBox>,
}

/// Protection of a sample entry: the frma and schm boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProtectionScheme {
    pub original_format: FourCC,
    pub scheme_type:     FourCC,
    pub scheme_version:  u32,
}

impl<'a> Track<'a> {
    /// The first sample entry from stsd.
    pub fn sample_entry(&self) -> Option<&'a MP4Box> {
        self.trak.sample_description()?.entry()
    }

    /// The sinf box of the sample entry, if it is an encrypted entry.
    pub fn protection_info(&self) -> Option<&'a ProtectionSchemeInfoBox> {
        protection_info(self.sample_entry()?)
    }

    /// Original format and scheme, if the track is protected.
    pub fn protection(&self) -> Option<ProtectionScheme> {
        protection_scheme(self.protection_info()?)
    }

    /// Default encryption parameters, from sinf/schi/tenc.
    pub fn track_encryption(&self) -> Option<&'a TrackEncryptionBox> {
        self.protection_info()?.track_encryption()
    }

    pub fn is_protected(&self) -> bool {
        self.protection_info().is_some()
    }

    /// Codec, i.e. the fourcc of the sample entry, or the original
    /// format for protected entries.
    pub fn codec(&self) -> Option<FourCC> {
        match self.protection() {
            Some(p) => Some(p.original_format),
            None => self.sample_entry().map(|e| e.fourcc()),
        }
    }
}

/// The sinf box of a sample entry.
pub fn protection_info(entry: &MP4Box) -> Option<&ProtectionSchemeInfoBox> {
    match entry {
        MP4Box::VisualSampleEntry(v) => v.protection_info(),
        MP4Box::AudioSampleEntry(a) => a.protection_info(),
        _ => None,
    }
}

/// frma + schm from a sinf box. Both must be present.
pub fn protection_scheme(sinf: &ProtectionSchemeInfoBox) -> Option<ProtectionScheme> {
    let frma = sinf.original_format()?;
    let schm = sinf.scheme_type()?;
    Some(ProtectionScheme {
        original_format: frma.data_format,
        scheme_type:     schm.scheme_type,
        scheme_version:  schm.scheme_version,
    })
}

impl MP4 {
    /// All tracks in the movie.
    pub fn tracks(&self) -> Vec<Track<'_>> {
        let movie = match self.movie() {
            Some(movie) => movie,
            None => return Vec::new(),
        };
        let mvex = movie.movie_extends();
        let mut tracks = Vec::new();
        for trak in movie.tracks() {
            let track_id = match trak.track_id() {
                Some(id) => id,
                None => {
                    log::warn!("trak without tkhd, skipping");
                    continue;
                },
            };
            let timescale = trak
                .media()
                .and_then(|m| m.media_header())
                .map(|h| h.timescale)
                .unwrap_or(0);
            tracks.push(Track {
                track_id,
                timescale,
                trak,
                trex: mvex.and_then(|m| m.track_extends(track_id)),
            });
        }
        tracks
    }

    /// Find a track by id.
    pub fn track(&self, track_id: u32) -> Option<Track<'_>> {
        self.tracks().into_iter().find(|t| t.track_id == track_id)
    }
}
