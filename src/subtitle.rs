//! Subtitle handling.
//!
//! Turns the samples of a fragmented `wvtt` track back into a WebVTT
//! text document.
//!
use std::fmt::Write as _;
use std::io::Write;

use crate::boxes::*;
use crate::error::{Error, Result};
use crate::fragment::Sample;
use crate::mp4box::{BoxInfo, MP4};

fn ptime(ticks: i64, timescale: u32) -> String {
    let ticks = ticks.max(0) as u64;
    let timescale = timescale.max(1) as u64;
    let millis = (ticks % timescale) * 1000 / timescale;

    let mut tm = ticks / timescale;
    let secs = tm % 60;
    tm /= 60;
    let mins = tm % 60;
    tm /= 60;

    format!("{:02}:{:02}:{:02}.{:03}", tm, mins, secs, millis)
}

// Render one vttc box.
fn cue(cue: &VTTCueBox, timescale: u32, sample: &Sample) -> String {
    let start = sample.composition_time();
    let end = start.saturating_add(sample.duration as i64);
    let mut out = String::new();

    if let Some(id) = cue.cue_id() {
        if !id.cue_id.is_empty() {
            let _ = write!(out, "{}\n", id.cue_id);
        }
    }
    let _ = write!(out, "{} --> {}", ptime(start, timescale), ptime(end, timescale));
    if let Some(settings) = cue.settings() {
        if !settings.settings.is_empty() {
            let _ = write!(out, " {}", settings.settings);
        }
    }
    out.push('\n');

    if let Some(payload) = cue.payload() {
        for line in payload.cue_text.split('\n') {
            if line.is_empty() {
                continue;
            }
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

/// Extract a `wvtt` track as a WebVTT document.
///
/// The header is the `vttC` configuration text of the sample entry.
/// Samples holding only a `vtte` box are gaps and produce no output.
pub fn subtitle_extract(mp4: &MP4, track_id: u32, mut output: impl Write) -> Result<()> {
    let track = mp4
        .track(track_id)
        .ok_or_else(|| Error::invalid(format!("track {}: no such track", track_id)))?;
    let entry = match track.sample_entry() {
        Some(MP4Box::WvttSampleEntry(entry)) => entry,
        Some(other) => {
            return Err(Error::invalid(format!(
                "track {}: {} is not a wvtt track",
                track_id,
                other.fourcc()
            )))
        },
        None => return Err(Error::MissingBox("stsd")),
    };

    let header = entry.config().map(|c| c.config.trim_end()).unwrap_or("");
    if header.starts_with("WEBVTT") {
        write!(output, "{}\n\n", header)?;
    } else {
        write!(output, "WEBVTT\n\n")?;
        if !header.is_empty() {
            write!(output, "{}\n\n", header)?;
        }
    }
    if let Some(lang) = track.trak.media().and_then(|m| m.media_header()).map(|m| m.language_code()) {
        if lang != "und" {
            write!(output, "NOTE language: {}\n\n", lang)?;
        }
    }

    let mut count = 0;
    for frag in mp4.fragments() {
        for sample in frag.full_samples(track_id)? {
            for b in decode_cues(&sample.data)? {
                match b {
                    MP4Box::VTTCueBox(c) => {
                        output.write_all(cue(&c, track.timescale, &sample.sample).as_bytes())?;
                        count += 1;
                    },
                    MP4Box::VTTAdditionalTextBox(text) => {
                        write!(output, "{}\n\n", text.cue_additional_text.trim_end())?;
                    },
                    MP4Box::VTTEmptyCueBox(_) => {},
                    other => log::debug!("track {}: ignoring {} in wvtt sample", track_id, other.fourcc()),
                }
            }
        }
    }
    log::debug!("track {}: extracted {} cues", track_id, count);

    Ok(())
}
