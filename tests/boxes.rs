use assert_matches::assert_matches;

use mp4cenc::boxes::*;
use mp4cenc::mp4box::{BoxInfo, GenericBox, MP4Box, MP4};
use mp4cenc::types::FourCC;
use mp4cenc::{first_box, Error};

mod common;

fn raw_box(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    v.extend_from_slice(fourcc);
    v.extend_from_slice(payload);
    v
}

#[test]
fn file_roundtrip() {
    let (mp4, _) = common::protected_file(&[40, 17, 64], |len| {
        vec![SubsampleEntry {
            bytes_of_clear_data:     5,
            bytes_of_protected_data: len as u32 - 5,
        }]
    });
    let bytes = mp4.to_bytes().unwrap();
    assert_eq!(bytes.len() as u64, mp4.size());

    let back = MP4::read(&bytes).unwrap();
    assert_eq!(back, mp4);
    assert_eq!(back.to_bytes().unwrap(), bytes);
    assert_eq!(back.boxes.len(), 4);
    assert!(back.is_fragmented());

    let moov = back.movie().unwrap();
    let stsd = moov.track_by_id(1).unwrap().sample_description().unwrap();
    assert_eq!(stsd.entry().unwrap().fourcc(), FourCC::new("encv"));
    let tenc = back.track(1).unwrap().track_encryption().unwrap().clone();
    assert_eq!(tenc.default_per_sample_iv_size, 8);
    assert_eq!(tenc.default_kid, [7; 16]);
    assert_eq!(tenc.summary(), format!("protected 1 iv_size 8 kid {}", "07".repeat(16)));
}

#[test]
fn unknown_boxes_are_kept() {
    let mut moov_payload = raw_box(b"zzzz", &[1, 2, 3]);
    moov_payload.extend(raw_box(b"udta", &raw_box(b"\xa9nam", b"title")));
    let mut bytes = raw_box(b"abcd", &[]);
    bytes.extend(raw_box(b"moov", &moov_payload));

    let mp4 = MP4::read(&bytes).unwrap();
    assert_eq!(
        mp4.boxes[0],
        MP4Box::GenericBox(GenericBox {
            fourcc: FourCC::new("abcd"),
            data:   Vec::new(),
        })
    );
    let moov = mp4.movie().unwrap();
    assert_eq!(moov.boxes.len(), 2);
    assert_eq!(moov.boxes[0].fourcc(), FourCC::new("zzzz"));
    assert_eq!(mp4.to_bytes().unwrap(), bytes);
}

#[test]
fn child_overrunning_parent() {
    // moov of 20 bytes holding a child that claims 16.
    let mut bytes = vec![0, 0, 0, 20, b'm', b'o', b'o', b'v'];
    bytes.extend_from_slice(&[0, 0, 0, 16, b'f', b'r', b'e', b'e', 0, 0, 0, 0]);
    assert_matches!(MP4::read(&bytes), Err(Error::MalformedContainer { offset: 8, .. }));

    // moov with 4 bytes left after its last child.
    let mut bytes = vec![0, 0, 0, 20, b'm', b'o', b'o', b'v'];
    bytes.extend_from_slice(&[0, 0, 0, 8, b'f', b'r', b'e', b'e', 0, 0, 0, 0]);
    assert_matches!(MP4::read(&bytes), Err(Error::MalformedContainer { offset: 16, .. }));
}

#[test]
fn truncated_file() {
    let mut bytes = raw_box(b"free", &[0; 4]);
    bytes.extend_from_slice(&[0, 0, 0, 100, b'm', b'd', b'a', b't', 1, 2]);
    assert_matches!(MP4::read(&bytes), Err(Error::TruncatedInput { need: 92, left: 2 }));

    let mut bytes = raw_box(b"free", &[0; 4]);
    bytes.extend_from_slice(&[0, 0, 0]);
    assert_matches!(MP4::read(&bytes), Err(Error::TruncatedInput { .. }));
}

#[test]
fn header_forms() {
    // size 0 runs to the end of the file, and is written back minimal.
    let bytes = [0, 0, 0, 0, b'f', b'r', b'e', b'e', 9, 9];
    let mp4 = MP4::read(&bytes).unwrap();
    assert_eq!(mp4.size(), 10);
    assert_eq!(mp4.to_bytes().unwrap(), raw_box(b"free", &[9, 9]));

    // mdat with a 64 bit header keeps it.
    let mut bytes = vec![0, 0, 0, 1, b'm', b'd', b'a', b't', 0, 0, 0, 0, 0, 0, 0, 19];
    bytes.extend_from_slice(&[1, 2, 3]);
    let mp4 = MP4::read(&bytes).unwrap();
    let mdat = first_box!(&mp4.boxes, MediaDataBox).unwrap();
    assert!(mdat.large_size);
    assert_eq!(mdat.payload_offset(), 16);
    assert_eq!(mp4.to_bytes().unwrap(), bytes);

    assert_matches!(
        MP4::read(&[0, 0, 0, 4, b'f', b'r', b'e', b'e']),
        Err(Error::InvalidData(_))
    );
}

#[test]
fn container_size_follows_children() {
    let mut traf = TrackFragmentBox::default();
    assert_eq!(MP4Box::from(traf.clone()).size(), 8);
    traf.add_child(TrackFragmentHeaderBox {
        track_id: 3,
        ..TrackFragmentHeaderBox::default()
    });
    assert_eq!(MP4Box::from(traf.clone()).size(), 8 + 16);
    traf.add_child(TrackFragmentBaseMediaDecodeTimeBox {
        version:                1,
        base_media_decode_time: 1 << 40,
    });
    let b = MP4Box::from(traf);
    assert_eq!(b.size(), 8 + 16 + 20);
    assert_eq!(b.to_bytes().unwrap().len(), 44);
}

#[test]
fn cue_samples() {
    let empty = encode_cues(&[VTTEmptyCueBox.into()]).unwrap();
    assert_eq!(empty.len(), 8);
    assert_eq!(decode_cues(&empty).unwrap()[0].fourcc(), FourCC::new("vtte"));

    let mut cue = VTTCueBox::default();
    cue.add_child(CueIDBox::new("1"));
    cue.add_child(CuePayloadBox::new("Hi there"));
    let sample = encode_cues(&[cue.into(), VTTAdditionalTextBox::new("NOTE x").into()]).unwrap();
    let boxes = decode_cues(&sample).unwrap();
    assert_eq!(boxes.len(), 2);
    let cue = first_box!(&boxes, VTTCueBox).unwrap();
    assert_eq!(cue.cue_id().unwrap().cue_id, "1");
    assert_eq!(cue.payload().unwrap().cue_text, "Hi there");
}

#[test]
fn audio_entry_keeps_extension() {
    let mut entry = AudioSampleEntry {
        fourcc:               FourCC::new("mp4a"),
        data_reference_index: 1,
        version:              1,
        revision:             0,
        vendor:               0,
        channel_count:        2,
        sample_size:          16,
        compression_id:       0,
        packet_size:          0,
        sample_rate:          48000 << 16,
        qt_extension:         (0..16).collect(),
        boxes:                Vec::new(),
    };
    entry.add_child(GenericBox {
        fourcc: FourCC::new("esds"),
        data:   vec![0; 10],
    });
    let bytes = MP4Box::from(entry.clone()).to_bytes().unwrap();
    assert_eq!(bytes.len(), 8 + 28 + 16 + 18);
    let back = MP4::read(&bytes).unwrap();
    assert_eq!(back.boxes, vec![MP4Box::AudioSampleEntry(entry)]);
}
