// Helpers to build fragmented files in memory.
#![allow(dead_code)]

use mp4cenc::boxes::*;
use mp4cenc::{first_box_mut, iter_box_mut};
use mp4cenc::cenc::encrypt_sample_data;
use mp4cenc::fragment::{build_fragment, FullSample, Sample, TrackSamples};
use mp4cenc::mp4box::{GenericBox, MP4Box, MP4};
use mp4cenc::types::{FourCC, SampleFlags};

pub const KEY: [u8; 16] = [
    0xeb, 0x67, 0x6a, 0xbb, 0xcb, 0x34, 0x5e, 0x96, 0xbb, 0xcf, 0x61, 0x66, 0x30, 0xf1, 0xa3, 0xda,
];

pub fn ftyp() -> FileTypeBox {
    FileTypeBox {
        fourcc:            FourCC::new("ftyp"),
        major_brand:       FourCC::new("iso6"),
        minor_version:     0,
        compatible_brands: vec![FourCC::new("iso6"), FourCC::new("dash")],
    }
}

pub fn avc1() -> VisualSampleEntry {
    VisualSampleEntry {
        fourcc:               FourCC::new("avc1"),
        data_reference_index: 1,
        width:                320,
        height:               240,
        horizresolution:      0x0048_0000,
        vertresolution:       0x0048_0000,
        frame_count:          1,
        compressor_name:      [0; 32],
        depth:                0x18,
        boxes:                vec![GenericBox {
            fourcc: FourCC::new("avcC"),
            data:   vec![1, 0x64, 0, 0x1f, 0xff, 0xe0],
        }
        .into()],
    }
}

pub fn tenc(iv_size: u8) -> TrackEncryptionBox {
    TrackEncryptionBox {
        version: 0,
        default_is_protected: 1,
        default_per_sample_iv_size: iv_size,
        default_kid: [7; 16],
        ..TrackEncryptionBox::default()
    }
}

/// Wrap a clear sample entry as encv with a cenc sinf.
pub fn encv(entry: VisualSampleEntry, tenc: TrackEncryptionBox) -> VisualSampleEntry {
    let mut schi = SchemeInformationBox::default();
    schi.add_child(tenc);
    let mut sinf = ProtectionSchemeInfoBox::default();
    sinf.add_child(OriginalFormatBox {
        data_format: entry.fourcc,
    });
    sinf.add_child(SchemeTypeBox {
        scheme_type:    FourCC::new("cenc"),
        scheme_version: 0x10000,
        scheme_uri:     None,
    });
    sinf.add_child(schi);
    let mut entry = entry;
    entry.fourcc = FourCC::new("encv");
    entry.add_child(sinf);
    entry
}

pub fn trak(track_id: u32, timescale: u32, entry: impl Into<MP4Box>) -> TrackBox {
    let mut stsd = SampleDescriptionBox::default();
    stsd.add_child(entry);
    let mut stbl = SampleTableBox::default();
    stbl.add_child(stsd);
    let mut minf = MediaInformationBox::default();
    minf.add_child(stbl);
    let mut mdia = MediaBox::default();
    mdia.add_child(MediaHeaderBox {
        timescale,
        language: 0x55c4, // und
        ..MediaHeaderBox::default()
    });
    mdia.add_child(minf);
    let mut trak = TrackBox::default();
    trak.add_child(TrackHeaderBox {
        track_id,
        ..TrackHeaderBox::default()
    });
    trak.add_child(mdia);
    trak
}

pub fn moov(traks: Vec<TrackBox>, pssh: bool) -> MovieBox {
    let mut mvex = MovieExtendsBox::default();
    let mut moov = MovieBox::default();
    for trak in traks {
        let track_id = trak.track_id().unwrap();
        mvex.add_child(TrackExtendsBox {
            track_id,
            default_sample_description_index: 1,
            ..TrackExtendsBox::default()
        });
        moov.add_child(trak);
    }
    moov.add_child(mvex);
    if pssh {
        moov.add_child(GenericBox {
            fourcc: FourCC::new("pssh"),
            data:   vec![0; 32],
        });
    }
    moov
}

/// Clear samples with a recognisable pattern.
pub fn clear_samples(sizes: &[usize], decode_time: u64) -> Vec<FullSample> {
    let mut t = decode_time;
    sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| {
            let sample = Sample {
                index: i as u32,
                decode_time: t,
                duration: 512,
                size: size as u32,
                flags: if i == 0 { SampleFlags::sync() } else { SampleFlags::non_sync() },
                composition_offset: if i % 2 == 0 { 1024 } else { 0 },
                offset: 0,
            };
            t += 512;
            let data = (0..size).map(|n| (n * 7 + i) as u8).collect();
            FullSample { sample, data }
        })
        .collect()
}

/// Encrypt samples, returning the encrypted samples and their senc entries.
pub fn encrypt(
    samples: &[FullSample],
    iv_size: usize,
    subsamples: impl Fn(usize) -> Vec<SubsampleEntry>,
) -> (Vec<FullSample>, Vec<SencEntry>) {
    let mut out = Vec::new();
    let mut entries = Vec::new();
    for (i, s) in samples.iter().enumerate() {
        let iv: Vec<u8> = (0..iv_size).map(|n| (n + i * 16) as u8 | 0x80).collect();
        let subs = subsamples(s.data.len());
        let mut data = s.data.clone();
        encrypt_sample_data(&KEY, &iv, &subs, &mut data).unwrap();
        out.push(FullSample {
            sample: s.sample.clone(),
            data,
        });
        entries.push(SencEntry { iv, subsamples: subs });
    }
    (out, entries)
}

/// Insert boxes at the end of the first traf and move the data offsets
/// of all truns to match the larger moof.
pub fn add_to_traf(moof: &mut MovieFragmentBox, extra: Vec<MP4Box>) {
    let grow: u64 = extra.iter().map(|b| b.size()).sum();
    let traf = first_box_mut!(&mut moof.boxes, TrackFragmentBox).unwrap();
    for b in extra {
        traf.boxes.push(b);
    }
    for traf in iter_box_mut!(&mut moof.boxes, TrackFragmentBox) {
        for trun in iter_box_mut!(&mut traf.boxes, TrackRunBox) {
            trun.data_offset = trun.data_offset.map(|o| o + grow as i32);
        }
    }
}

/// A complete file with one protected video track, one fragment with
/// a senc box.
pub fn protected_file(sizes: &[usize], subsamples: impl Fn(usize) -> Vec<SubsampleEntry>) -> (MP4, Vec<FullSample>) {
    let clear = clear_samples(sizes, 9000);
    let (encrypted, entries) = encrypt(&clear, 8, subsamples);
    let track = TrackSamples {
        track_id:         1,
        base_decode_time: 9000,
        samples:          encrypted,
    };
    let (mut moof, mdat) = build_fragment(4, &[track]).unwrap();
    add_to_traf(&mut moof, vec![SampleEncryptionBox::new(entries).into()]);

    let mp4 = MP4 {
        boxes: vec![
            ftyp().into(),
            moov(vec![trak(1, 12800, encv(avc1(), tenc(8)))], true).into(),
            moof.into(),
            mdat.into(),
        ],
    };
    (mp4, clear)
}
