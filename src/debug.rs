//! Debug helpers.
//!
use std::io::{self, Write};

use crate::error::Result;
use crate::mp4box::{children_size, BoxInfo, MP4Box, MP4};

fn dump_boxes(boxes: &[MP4Box], offset: u64, depth: usize, out: &mut dyn Write) -> io::Result<()> {
    let mut offset = offset;
    for b in boxes {
        let size = b.size();
        let summary = b.summary();
        write!(out, "{:>10} {:width$}{} {}", offset, "", b.fourcc(), size, width = depth * 2)?;
        if !summary.is_empty() {
            write!(out, "  {}", summary)?;
        }
        writeln!(out)?;
        if let Some(children) = b.boxes() {
            // The children start after header + fixed payload prefix.
            let first = offset + size - children_size(children);
            dump_boxes(children, first, depth + 1, out)?;
        }
        offset += size;
    }
    Ok(())
}

/// Print the box tree: file offset, fourcc, size and summary, one box
/// per line, indented by depth.
pub fn dump_box_tree(mp4: &MP4, out: &mut dyn Write) -> io::Result<()> {
    dump_boxes(&mp4.boxes, 0, 0, out)
}

/// Print the resolved samples of all fragments, optionally for one track.
pub fn dump_fragment_samples(mp4: &MP4, track_id: Option<u32>, out: &mut dyn Write) -> Result<()> {
    writeln!(
        out,
        "{:>6} {:>6} {:>8} {:>12} {:>8} {:>8} {:>6} {:>8}  {}",
        "frag", "track", "#", "dtime", "dur", "size", "sync", "cdelta", "range"
    )?;
    for frag in mp4.fragments() {
        for tfs in frag.track_fragments()? {
            if track_id.map(|id| id != tfs.track_id).unwrap_or(false) {
                continue;
            }
            for s in &tfs.samples {
                let range = s.byte_range();
                writeln!(
                    out,
                    "{:>6} {:>6} {:>8} {:>12} {:>8} {:>8} {:>6} {:>8}  {}..{}",
                    frag.sequence_number(),
                    tfs.track_id,
                    s.index,
                    s.decode_time,
                    s.duration,
                    s.size,
                    if s.flags.is_sync() { "sync" } else { "" },
                    s.composition_offset,
                    range.start,
                    range.end
                )?;
            }
        }
    }
    Ok(())
}
