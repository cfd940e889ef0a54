use assert_matches::assert_matches;

use mp4cenc::boxes::*;
use mp4cenc::fragment::{build_fragment, FullSample, Sample, TrackSamples};
use mp4cenc::mp4box::MP4;
use mp4cenc::subtitle::subtitle_extract;
use mp4cenc::types::SampleFlags;
use mp4cenc::{first_box, first_box_mut, Error};

mod common;

fn sizes_only(sizes: &[u32]) -> Vec<TrackRunEntry> {
    sizes
        .iter()
        .map(|&s| TrackRunEntry {
            sample_size: Some(s),
            ..TrackRunEntry::default()
        })
        .collect()
}

fn fragment_file(moov: MovieBox, traf: TrackFragmentBox, data: Vec<u8>) -> Vec<u8> {
    let mut moof = MovieFragmentBox::default();
    moof.add_child(MovieFragmentHeaderBox { sequence_number: 1 });
    moof.add_child(traf);
    let mp4 = MP4 {
        boxes: vec![moov.into(), moof.into(), MediaDataBox::new(data).into()],
    };
    mp4.to_bytes().unwrap()
}

#[test]
fn samples_use_track_defaults() {
    let mut moov = common::moov(vec![common::trak(1, 1000, common::avc1())], false);
    let mvex = moov.movie_extends_mut().unwrap();
    let trex = first_box_mut!(&mut mvex.boxes, TrackExtendsBox).unwrap();
    trex.default_sample_duration = 40;
    trex.default_sample_flags = SampleFlags::non_sync();
    let moov_size = mp4cenc::MP4Box::from(moov.clone()).size();

    let mut traf = TrackFragmentBox::default();
    traf.add_child(TrackFragmentHeaderBox {
        track_id: 1,
        ..TrackFragmentHeaderBox::default()
    });
    traf.add_child(TrackFragmentBaseMediaDecodeTimeBox {
        version:                0,
        base_media_decode_time: 4000,
    });
    // moof (8) + mfhd (16) + traf (8) + tfhd (16) + tfdt (16) + trun
    // (8 + 12 + 4 + 3 * 4) + mdat header (8)
    let data_offset = 8 + 16 + 8 + 16 + 16 + 36 + 8;
    traf.add_child(TrackRunBox::new(
        Some(data_offset),
        Some(SampleFlags::sync()),
        sizes_only(&[3, 4, 5]),
    ));

    let bytes = fragment_file(moov, traf, (0..12).collect());
    let mp4 = MP4::read(&bytes).unwrap();
    let frags = mp4.fragments();
    assert_eq!(frags[0].moof_offset, moov_size);
    assert_eq!(frags[0].mdat_data_offset(), Some(moov_size + data_offset as u64));

    let samples = frags[0].samples(1).unwrap();
    let times: Vec<_> = samples.iter().map(|s| (s.decode_time, s.duration, s.flags.is_sync())).collect();
    assert_eq!(times, vec![(4000, 40, true), (4040, 40, false), (4080, 40, false)]);

    let full = frags[0].full_samples(1).unwrap();
    assert_eq!(full[1].data, vec![3, 4, 5, 6]);
    assert_eq!(full[2].data, vec![7, 8, 9, 10, 11]);
    assert_eq!(full[2].sample.byte_range(), samples[2].offset..samples[2].offset + 5);

    let json = serde_json::to_string(&samples[1]).unwrap();
    assert!(json.contains("\"decode_time\":4040"));
    assert!(json.contains("\"size\":4"));
}

#[test]
fn missing_defaults() {
    // No mvex, so no trex to fall back on.
    let mut moov = MovieBox::default();
    moov.add_child(common::trak(1, 1000, common::avc1()));

    let mut traf = TrackFragmentBox::default();
    traf.add_child(TrackFragmentHeaderBox {
        track_id: 1,
        default_sample_flags: Some(SampleFlags::sync()),
        ..TrackFragmentHeaderBox::default()
    });
    traf.add_child(TrackRunBox::new(Some(0), None, sizes_only(&[1])));

    let bytes = fragment_file(moov, traf, vec![0]);
    let mp4 = MP4::read(&bytes).unwrap();
    assert!(!mp4.is_fragmented());
    assert_matches!(
        mp4.fragments()[0].samples(1),
        Err(Error::MissingDefaults {
            field:  "sample_duration",
            sample: 0,
        })
    );
}

#[test]
fn senc_iv_size_inference() {
    let entries: Vec<SencEntry> = (0..2u8)
        .map(|i| SencEntry {
            iv:         vec![i; 16],
            subsamples: Vec::new(),
        })
        .collect();
    let senc = SampleEncryptionBox::new(entries.clone());
    let bytes = mp4cenc::MP4Box::from(senc).to_bytes().unwrap();
    assert_eq!(bytes.len(), 16 + 32);

    let mp4 = MP4::read(&bytes).unwrap();
    let senc = first_box!(&mp4.boxes, SampleEncryptionBox).unwrap();
    assert_eq!(senc.iv_size, 16);
    assert_eq!(senc.entries, entries);
    assert_matches!(senc.with_iv_size(8), Err(Error::InvalidData(_)));

    // A payload that fits no IV size.
    let mut bytes = bytes;
    bytes.truncate(bytes.len() - 2);
    bytes[3] -= 2;
    assert_matches!(MP4::read(&bytes), Err(Error::InvalidData(_)));
}

fn cue_sample(decode_time: u64, duration: u32, boxes: Vec<mp4cenc::MP4Box>) -> FullSample {
    let data = encode_cues(&boxes).unwrap();
    FullSample {
        sample: Sample {
            decode_time,
            duration,
            size: data.len() as u32,
            flags: SampleFlags::sync(),
            ..Sample::default()
        },
        data,
    }
}

#[test]
fn webvtt_extraction() {
    let mut entry = WvttSampleEntry {
        data_reference_index: 1,
        boxes:                Vec::new(),
    };
    entry.add_child(WebVTTConfigurationBox::new("WEBVTT"));
    let moov = common::moov(vec![common::trak(3, 1000, entry)], false);

    let mut first = VTTCueBox::default();
    first.add_child(CuePayloadBox::new("Hello"));
    let mut second = VTTCueBox::default();
    second.add_child(CueIDBox::new("c2"));
    second.add_child(CueSettingsBox::new("align:end"));
    second.add_child(CuePayloadBox::new("Bye\nnow"));

    let track = TrackSamples {
        track_id:         3,
        base_decode_time: 0,
        samples:          vec![
            cue_sample(0, 1000, vec![first.into()]),
            cue_sample(1000, 500, vec![VTTEmptyCueBox.into()]),
            cue_sample(1500, 2000, vec![second.into()]),
        ],
    };
    let (moof, mdat) = build_fragment(1, &[track]).unwrap();
    let mp4 = MP4 {
        boxes: vec![common::ftyp().into(), moov.into(), moof.into(), mdat.into()],
    };
    let mp4 = MP4::read(&mp4.to_bytes().unwrap()).unwrap();

    let mut out = Vec::new();
    subtitle_extract(&mp4, 3, &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "WEBVTT\n\n\
         00:00:00.000 --> 00:00:01.000\nHello\n\n\
         c2\n00:00:01.500 --> 00:00:03.500 align:end\nBye\nnow\n\n"
    );

    let mut out = Vec::new();
    assert_matches!(subtitle_extract(&mp4, 9, &mut out), Err(Error::InvalidData(_)));
}
