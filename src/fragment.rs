//! Fragments, sample resolution and building new fragments.
//!
//! A `Fragment` is a `moof` plus the `mdat` that follows it. The sample
//! table of every `traf` in it is resolved into a flat list of samples
//! with absolute file offsets; sample data is read from the `mdat`.
//!
use std::convert::TryFrom;
use std::ops::Range;

use serde::Serialize;

use crate::boxes::*;
use crate::error::{Error, Result};
use crate::mp4box::{BoxCodec, MP4};
use crate::serialize::{FromBytes, ReadBytes, SliceReader};
use crate::types::SampleFlags;

/// One resolved sample.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Sample {
    /// Index in the track fragment, from 0.
    pub index:              u32,
    pub decode_time:        u64,
    pub duration:           u32,
    pub size:               u32,
    pub flags:              SampleFlags,
    pub composition_offset: i32,
    /// File offset of the first byte of the sample.
    pub offset:             u64,
}

impl Sample {
    /// Byte range in the file.
    pub fn byte_range(&self) -> Range<u64> {
        self.offset..self.offset.saturating_add(self.size as u64)
    }

    /// Presentation time.
    pub fn composition_time(&self) -> i64 {
        i64::try_from(self.decode_time)
            .unwrap_or(i64::MAX)
            .saturating_add(self.composition_offset as i64)
    }
}

/// A sample with its data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FullSample {
    pub sample: Sample,
    pub data:   Vec<u8>,
}

/// The resolved samples of one `traf`.
#[derive(Clone, Debug)]
pub struct TrackFragmentSamples<'a> {
    pub traf:             &'a TrackFragmentBox,
    pub track_id:         u32,
    pub base_data_offset: u64,
    pub samples:          Vec<Sample>,
}

impl TrackFragmentSamples<'_> {
    // End of the data of this traf.
    fn data_end(&self) -> u64 {
        self.samples
            .iter()
            .map(|s| s.offset.saturating_add(s.size as u64))
            .max()
            .unwrap_or(self.base_data_offset)
    }
}

/// Resolve the sample table of one track fragment.
///
/// Every field of every sample is taken from the `trun` entry, else from
/// the `tfhd` defaults, else from the `trex` defaults. A field that none
/// of them provide is a `MissingDefaults` error. The composition offset
/// has no defaults and is 0 if absent.
pub fn extract_samples(
    traf: &TrackFragmentBox,
    base_data_offset: u64,
    trex: Option<&TrackExtendsBox>,
) -> Result<Vec<Sample>> {
    let tfhd = traf.header().ok_or(Error::MissingBox("tfhd"))?;

    let mut samples = Vec::new();
    let mut decode_time = traf.base_media_decode_time();
    let mut pos = base_data_offset;
    let mut index = 0u32;

    for trun in traf.track_runs() {
        // A run without data_offset continues after the previous one.
        if let Some(data_offset) = trun.data_offset {
            let p = i64::try_from(base_data_offset)
                .ok()
                .and_then(|base| base.checked_add(data_offset as i64))
                .filter(|&p| p >= 0)
                .ok_or_else(|| {
                    Error::invalid(format!(
                        "trun: data_offset {} out of range (base {})",
                        data_offset, base_data_offset
                    ))
                })?;
            pos = p as u64;
        }

        for (i, entry) in trun.entries.iter().enumerate() {
            let duration = entry
                .sample_duration
                .or(tfhd.default_sample_duration)
                .or(trex.map(|t| t.default_sample_duration))
                .ok_or(Error::MissingDefaults {
                    field:  "sample_duration",
                    sample: index,
                })?;
            let size = entry
                .sample_size
                .or(tfhd.default_sample_size)
                .or(trex.map(|t| t.default_sample_size))
                .ok_or(Error::MissingDefaults {
                    field:  "sample_size",
                    sample: index,
                })?;
            let first_flags = if i == 0 { trun.first_sample_flags } else { None };
            let flags = entry
                .sample_flags
                .or(first_flags)
                .or(tfhd.default_sample_flags)
                .or(trex.map(|t| t.default_sample_flags))
                .ok_or(Error::MissingDefaults {
                    field:  "sample_flags",
                    sample: index,
                })?;
            let composition_offset = match entry.sample_composition_time_offset {
                Some(c) if trun.version == 0 => std::cmp::min(c as u32, 0x7fff_ffff) as i32,
                Some(c) => c,
                None => 0,
            };

            samples.push(Sample {
                index,
                decode_time,
                duration,
                size,
                flags,
                composition_offset,
                offset: pos,
            });

            decode_time = decode_time
                .checked_add(duration as u64)
                .ok_or_else(|| Error::invalid(format!("sample {}: decode time overflows", index)))?;
            pos = pos
                .checked_add(size as u64)
                .ok_or_else(|| Error::invalid(format!("sample {}: offset overflows", index)))?;
            index += 1;
        }
    }

    Ok(samples)
}

/// A movie fragment: the `moof` and the `mdat` after it.
#[derive(Clone, Debug)]
pub struct Fragment<'a> {
    pub moof:        &'a MovieFragmentBox,
    /// File offset of the moof box.
    pub moof_offset: u64,
    pub mdat:        Option<&'a MediaDataBox>,
    /// File offset of the mdat box.
    pub mdat_offset: u64,
    /// For the trex defaults.
    pub mvex:        Option<&'a MovieExtendsBox>,
}

impl<'a> Fragment<'a> {
    pub fn sequence_number(&self) -> u32 {
        self.moof.sequence_number()
    }

    /// Resolve the samples of every `traf`, in order.
    ///
    /// The base data offset of a traf is the explicit base_data_offset,
    /// else the start of the moof if default-base-is-moof is set or if it
    /// is the first traf, else the end of the data of the previous traf.
    pub fn track_fragments(&self) -> Result<Vec<TrackFragmentSamples<'a>>> {
        let mut res: Vec<TrackFragmentSamples<'a>> = Vec::new();
        for traf in self.moof.track_fragments() {
            let tfhd = traf.header().ok_or(Error::MissingBox("tfhd"))?;
            let base_data_offset = match tfhd.base_data_offset {
                Some(offset) => offset,
                None if tfhd.default_base_is_moof => self.moof_offset,
                None => match res.last() {
                    Some(prev) => prev.data_end(),
                    None => self.moof_offset,
                },
            };
            let trex = self.mvex.and_then(|m| m.track_extends(tfhd.track_id));
            let samples = extract_samples(traf, base_data_offset, trex)?;
            res.push(TrackFragmentSamples {
                traf,
                track_id: tfhd.track_id,
                base_data_offset,
                samples,
            });
        }
        Ok(res)
    }

    /// The samples of one track in this fragment.
    pub fn samples(&self, track_id: u32) -> Result<Vec<Sample>> {
        let mut samples = Vec::new();
        for tfs in self.track_fragments()? {
            if tfs.track_id == track_id {
                samples.extend(tfs.samples);
            }
        }
        Ok(samples)
    }

    /// The samples of one track, with their data.
    pub fn full_samples(&self, track_id: u32) -> Result<Vec<FullSample>> {
        self.samples(track_id)?
            .into_iter()
            .map(|sample| self.sample_data(sample))
            .collect()
    }

    /// Copy the data of a sample out of the mdat.
    pub fn sample_data(&self, sample: Sample) -> Result<FullSample> {
        let data = self.read_mdat(sample.offset, sample.size as u64)?.to_vec();
        Ok(FullSample { sample, data })
    }

    /// File offset of the first byte of mdat data.
    pub fn mdat_data_offset(&self) -> Option<u64> {
        self.mdat.map(|m| self.mdat_offset + m.payload_offset())
    }

    // Bytes at a file offset inside the mdat payload.
    fn read_mdat(&self, offset: u64, size: u64) -> Result<&'a [u8]> {
        let mdat = self.mdat.ok_or(Error::MissingBox("mdat"))?;
        let start = self.mdat_offset + mdat.payload_offset();
        let end = start + mdat.data.len() as u64;
        if offset < start || offset.checked_add(size).map_or(true, |e| e > end) {
            return Err(Error::TruncatedInput {
                need: size,
                left: end.saturating_sub(offset.max(start)),
            });
        }
        let from = (offset - start) as usize;
        Ok(&mdat.data[from..from + size as usize])
    }

    /// Bytes at a file offset in the moof or the mdat.
    pub fn read_at(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let moof_end = self.moof_offset + self.moof.size();
        if offset >= self.moof_offset && offset.checked_add(size).map_or(false, |e| e <= moof_end) {
            let mut buf = Vec::with_capacity(self.moof.size() as usize);
            self.moof.encode(&mut buf)?;
            let from = (offset - self.moof_offset) as usize;
            return Ok(buf[from..from + size as usize].to_vec());
        }
        Ok(self.read_mdat(offset, size)?.to_vec())
    }

    /// The encryption parameters of every sample of a track fragment.
    ///
    /// `tenc` gives the per-sample IV size and the constant IV. If the
    /// IV size is known and both saiz and saio are present, the sample
    /// auxiliary information they point at is used. Otherwise, or if
    /// that cannot be read, the senc box is used.
    pub fn sample_encryption(
        &self,
        tfs: &TrackFragmentSamples<'_>,
        tenc: Option<&TrackEncryptionBox>,
    ) -> Result<Vec<SencEntry>> {
        let traf = tfs.traf;
        let iv_size = tenc.map(|t| t.default_per_sample_iv_size);

        let mut entries = None;
        if let (Some(iv_size), Some(saiz), Some(saio)) = (iv_size, traf.aux_info_sizes(), traf.aux_info_offsets()) {
            match self.read_aux_info(tfs, saiz, saio, iv_size) {
                Ok(e) => {
                    log::debug!("track {}: encryption info from saiz/saio", tfs.track_id);
                    entries = Some(e);
                },
                Err(e) if traf.sample_encryption().is_some() => {
                    log::warn!("track {}: saiz/saio unusable ({}), using senc", tfs.track_id, e);
                },
                Err(e) => return Err(e),
            }
        }
        let mut entries = match entries {
            Some(entries) => entries,
            None => {
                let senc = traf.sample_encryption().ok_or(Error::MissingBox("senc"))?;
                match iv_size {
                    Some(size) => senc.with_iv_size(size)?.entries,
                    None => senc.entries.clone(),
                }
            },
        };

        if entries.len() != tfs.samples.len() {
            return Err(Error::invalid(format!(
                "track {}: {} samples but encryption info for {}",
                tfs.track_id,
                tfs.samples.len(),
                entries.len()
            )));
        }

        // IV size 0: every sample uses the constant IV.
        if iv_size == Some(0) {
            let iv = tenc
                .and_then(|t| t.default_constant_iv.clone())
                .ok_or(Error::MissingBox("tenc constant IV"))?;
            for e in entries.iter_mut() {
                e.iv = iv.clone();
            }
        }
        Ok(entries)
    }

    // Read sample auxiliary information for cenc from where saio points.
    fn read_aux_info(
        &self,
        tfs: &TrackFragmentSamples<'_>,
        saiz: &SampleAuxiliaryInformationSizesBox,
        saio: &SampleAuxiliaryInformationOffsetsBox,
        iv_size: u8,
    ) -> Result<Vec<SencEntry>> {
        let count = tfs.samples.len();
        if saiz.sample_count as usize != count {
            return Err(Error::invalid(format!("saiz: {} samples, expected {}", saiz.sample_count, count)));
        }

        // Either one offset for all samples, or one per trun.
        let run_lengths: Vec<usize> = if saio.offsets.len() == 1 {
            vec![count]
        } else {
            let runs: Vec<usize> = tfs.traf.track_runs().map(|t| t.entries.len()).collect();
            if runs.len() != saio.offsets.len() {
                return Err(Error::invalid(format!(
                    "saio: {} offsets for {} truns",
                    saio.offsets.len(),
                    runs.len()
                )));
            }
            runs
        };

        let mut entries = Vec::with_capacity(count);
        let mut index = 0;
        for (&offset, &len) in saio.offsets.iter().zip(run_lengths.iter()) {
            let sizes: Vec<u64> = (index..index + len)
                .map(|i| saiz.sample_info_size(i).map(|s| s as u64))
                .collect::<Option<_>>()
                .ok_or_else(|| Error::invalid("saiz: missing sample info size"))?;
            let total: u64 = sizes.iter().sum();
            let pos = tfs
                .base_data_offset
                .checked_add(offset)
                .ok_or_else(|| Error::invalid(format!("saio: offset {} out of range", offset)))?;
            let data = self.read_at(pos, total)?;
            let mut stream = SliceReader::new(&data);
            for size in sizes {
                let mut info = stream.limit(size)?;
                entries.push(parse_aux_info(&mut info, iv_size)?);
            }
            index += len;
        }
        Ok(entries)
    }
}

// One CencSampleAuxiliaryDataFormat structure.
fn parse_aux_info(stream: &mut SliceReader<'_>, iv_size: u8) -> Result<SencEntry> {
    let iv = stream.read(iv_size as u64)?.to_vec();
    let mut subsamples = Vec::new();
    if stream.left() > 0 {
        let count = u16::from_bytes(stream)?;
        for _ in 0..count {
            subsamples.push(SubsampleEntry {
                bytes_of_clear_data:     u16::from_bytes(stream)?,
                bytes_of_protected_data: u32::from_bytes(stream)?,
            });
        }
    }
    if stream.left() > 0 {
        return Err(Error::invalid("sample auxiliary info has trailing data"));
    }
    Ok(SencEntry { iv, subsamples })
}

impl MP4 {
    /// All fragments in the file, with their file offsets.
    ///
    /// Offsets are the running sum of the sizes of the top-level boxes.
    pub fn fragments(&self) -> Vec<Fragment<'_>> {
        let mvex = self.movie().and_then(|m| m.movie_extends());
        let mut fragments: Vec<Fragment<'_>> = Vec::new();
        let mut offset = 0;
        let mut pending = false;
        for b in &self.boxes {
            match b {
                MP4Box::MovieFragmentBox(moof) => {
                    fragments.push(Fragment {
                        moof,
                        moof_offset: offset,
                        mdat: None,
                        mdat_offset: 0,
                        mvex,
                    });
                    pending = true;
                },
                MP4Box::MediaDataBox(mdat) if pending => {
                    if let Some(frag) = fragments.last_mut() {
                        frag.mdat = Some(mdat);
                        frag.mdat_offset = offset;
                    }
                    pending = false;
                },
                _ => {},
            }
            offset += b.size();
        }
        fragments
    }
}

/// Samples of one track, to put in a new fragment.
#[derive(Clone, Debug, Default)]
pub struct TrackSamples {
    pub track_id:         u32,
    pub base_decode_time: u64,
    pub samples:          Vec<FullSample>,
}

/// Build a `moof` and `mdat` for a set of tracks.
///
/// Every traf uses default-base-is-moof and every trun has all
/// per-sample fields, so the fragment does not depend on any defaults.
/// The data of the tracks is stored in the mdat in the order given.
pub fn build_fragment(sequence_number: u32, tracks: &[TrackSamples]) -> Result<(MovieFragmentBox, MediaDataBox)> {
    let mut moof = MovieFragmentBox::default();
    moof.add_child(MovieFragmentHeaderBox { sequence_number });

    let mut data = Vec::new();
    let mut data_starts = Vec::new();
    for track in tracks {
        data_starts.push(data.len() as u64);
        let entries = track
            .samples
            .iter()
            .map(|s| TrackRunEntry {
                sample_duration:                Some(s.sample.duration),
                sample_size:                    Some(s.data.len() as u32),
                sample_flags:                   Some(s.sample.flags),
                sample_composition_time_offset: Some(s.sample.composition_offset),
            })
            .collect();
        for s in &track.samples {
            data.extend_from_slice(&s.data);
        }

        let mut traf = TrackFragmentBox::default();
        traf.add_child(TrackFragmentHeaderBox {
            track_id: track.track_id,
            default_base_is_moof: true,
            ..TrackFragmentHeaderBox::default()
        });
        traf.add_child(TrackFragmentBaseMediaDecodeTimeBox {
            version:                0,
            base_media_decode_time: track.base_decode_time,
        });
        traf.add_child(TrackRunBox::new(Some(0), None, entries));
        moof.add_child(traf);
    }

    let mdat = MediaDataBox::new(data);

    // Now that the size of the moof is known, fix up the data offsets.
    let first = moof.size() + mdat.payload_offset();
    for (traf, start) in iter_box_mut!(&mut moof.boxes, TrackFragmentBox).zip(data_starts) {
        if let Some(trun) = first_box_mut!(&mut traf.boxes, TrackRunBox) {
            let offset = first + start;
            if offset > i32::MAX as u64 {
                return Err(Error::invalid("fragment too large for trun data_offset"));
            }
            trun.data_offset = Some(offset as i32);
        }
    }

    Ok((moof, mdat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn traf(tfhd: TrackFragmentHeaderBox, runs: Vec<TrackRunBox>) -> TrackFragmentBox {
        let mut traf = TrackFragmentBox::default();
        traf.add_child(tfhd);
        traf.add_child(TrackFragmentBaseMediaDecodeTimeBox {
            version:                0,
            base_media_decode_time: 1000,
        });
        for run in runs {
            traf.add_child(run);
        }
        traf
    }

    fn sized(sizes: &[u32]) -> Vec<TrackRunEntry> {
        sizes
            .iter()
            .map(|&s| TrackRunEntry {
                sample_size: Some(s),
                ..TrackRunEntry::default()
            })
            .collect()
    }

    #[test]
    fn precedence_of_defaults() {
        let tfhd = TrackFragmentHeaderBox {
            track_id: 1,
            default_sample_duration: Some(10),
            ..TrackFragmentHeaderBox::default()
        };
        let mut entries = sized(&[5, 6, 7]);
        entries[1].sample_duration = Some(20);
        let run = TrackRunBox::new(Some(100), Some(SampleFlags::sync()), entries);
        let trex = TrackExtendsBox {
            track_id: 1,
            default_sample_duration: 99,
            default_sample_flags: SampleFlags::non_sync(),
            ..TrackExtendsBox::default()
        };
        let samples = extract_samples(&traf(tfhd, vec![run]), 50, Some(&trex)).unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples.iter().map(|s| s.duration).collect::<Vec<_>>(), vec![10, 20, 10]);
        assert_eq!(samples.iter().map(|s| s.decode_time).collect::<Vec<_>>(), vec![1000, 1010, 1030]);
        assert_eq!(samples.iter().map(|s| s.offset).collect::<Vec<_>>(), vec![150, 155, 161]);
        assert!(samples[0].flags.is_sync());
        assert!(!samples[1].flags.is_sync());
        assert_eq!(samples[2].index, 2);
        assert_eq!(samples[2].byte_range(), 161..168);
    }

    #[test]
    fn missing_defaults() {
        let tfhd = TrackFragmentHeaderBox {
            track_id: 1,
            default_sample_flags: Some(SampleFlags::sync()),
            ..TrackFragmentHeaderBox::default()
        };
        let run = TrackRunBox::new(None, None, sized(&[5]));
        assert_matches!(
            extract_samples(&traf(tfhd, vec![run]), 0, None),
            Err(Error::MissingDefaults {
                field:  "sample_duration",
                sample: 0,
            })
        );
    }

    #[test]
    fn run_without_offset_continues() {
        let tfhd = TrackFragmentHeaderBox {
            track_id: 1,
            default_sample_duration: Some(1),
            default_sample_flags: Some(SampleFlags::sync()),
            ..TrackFragmentHeaderBox::default()
        };
        let run1 = TrackRunBox::new(Some(8), None, sized(&[4, 4]));
        let run2 = TrackRunBox::new(None, None, sized(&[3]));
        let samples = extract_samples(&traf(tfhd, vec![run1, run2]), 0, None).unwrap();
        assert_eq!(samples.iter().map(|s| s.offset).collect::<Vec<_>>(), vec![8, 12, 16]);
        assert_eq!(samples.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn build_and_resolve() {
        let mk = |decode_time, data: Vec<u8>| FullSample {
            sample: Sample {
                decode_time,
                duration: 10,
                size: data.len() as u32,
                flags: SampleFlags::sync(),
                ..Sample::default()
            },
            data,
        };
        let tracks = vec![
            TrackSamples {
                track_id:         1,
                base_decode_time: 0,
                samples:          vec![mk(0, vec![1; 5]), mk(10, vec![2; 3])],
            },
            TrackSamples {
                track_id:         2,
                base_decode_time: 500,
                samples:          vec![mk(500, vec![3; 4])],
            },
        ];
        let (moof, mdat) = build_fragment(7, &tracks).unwrap();
        let mp4 = MP4 {
            boxes: vec![moof.into(), mdat.into()],
        };
        let bytes = mp4.to_bytes().unwrap();
        let mp4 = MP4::read(&bytes).unwrap();

        let frags = mp4.fragments();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].sequence_number(), 7);
        let t1 = frags[0].full_samples(1).unwrap();
        assert_eq!(t1.len(), 2);
        assert_eq!(t1[0].data, vec![1; 5]);
        assert_eq!(t1[1].data, vec![2; 3]);
        assert_eq!(t1[1].sample.decode_time, 10);
        let t2 = frags[0].full_samples(2).unwrap();
        assert_eq!(t2[0].data, vec![3; 4]);
        assert_eq!(t2[0].sample.decode_time, 500);
    }

    #[test]
    fn sample_outside_mdat() {
        let tfhd = TrackFragmentHeaderBox {
            track_id: 1,
            default_base_is_moof: true,
            default_sample_duration: Some(1),
            default_sample_flags: Some(SampleFlags::sync()),
            ..TrackFragmentHeaderBox::default()
        };
        let mut moof = MovieFragmentBox::default();
        moof.add_child(MovieFragmentHeaderBox { sequence_number: 1 });
        moof.add_child(traf(tfhd, vec![TrackRunBox::new(Some(1000), None, sized(&[16]))]));
        let mp4 = MP4 {
            boxes: vec![moof.into(), MediaDataBox::new(vec![0; 8]).into()],
        };
        let frags = mp4.fragments();
        assert_matches!(frags[0].full_samples(1), Err(Error::TruncatedInput { .. }));
    }

    #[test]
    fn offsets_near_the_limit() {
        let tfhd = |base| TrackFragmentHeaderBox {
            track_id: 1,
            base_data_offset: Some(base),
            default_sample_duration: Some(1),
            default_sample_flags: Some(SampleFlags::sync()),
            ..TrackFragmentHeaderBox::default()
        };

        let run = TrackRunBox::new(None, None, sized(&[16]));
        let t = traf(tfhd(u64::MAX - 4), vec![run]);
        assert_matches!(extract_samples(&t, u64::MAX - 4, None), Err(Error::InvalidData(_)));

        let run = TrackRunBox::new(Some(-1), None, sized(&[16]));
        let t = traf(tfhd(1 << 63), vec![run]);
        assert_matches!(extract_samples(&t, 1 << 63, None), Err(Error::InvalidData(_)));

        let run = TrackRunBox::new(Some(-9), None, sized(&[16]));
        let t = traf(tfhd(8), vec![run]);
        assert_matches!(extract_samples(&t, 8, None), Err(Error::InvalidData(_)));

        // Through the file model as well.
        let mut moof = MovieFragmentBox::default();
        moof.add_child(MovieFragmentHeaderBox { sequence_number: 1 });
        moof.add_child(traf(tfhd(u64::MAX - 4), vec![TrackRunBox::new(None, None, sized(&[16]))]));
        let mp4 = MP4 {
            boxes: vec![moof.into(), MediaDataBox::new(vec![0; 16]).into()],
        };
        assert_matches!(mp4.fragments()[0].samples(1), Err(Error::InvalidData(_)));
    }
}
