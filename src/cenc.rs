//! Common Encryption (ISO/IEC 23001-7), `cenc` scheme: AES-128 CTR.
//!
//! Every sample is decrypted on its own, with a fresh counter seeded
//! from its IV. Within a sample the keystream runs on across all the
//! protected ranges, the clear ranges are skipped over.
//!
use std::collections::HashSet;

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};

use crate::boxes::*;
use crate::error::{Error, Result};
use crate::fragment::{build_fragment, Fragment, FullSample, TrackSamples};
use crate::mp4box::{BoxInfo, MP4};
use crate::track::{protection_info, protection_scheme, ProtectionScheme};
use crate::types::FourCC;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Turn an 8 or 16 byte IV into a 16 byte counter block.
pub fn normalize_iv(iv: &[u8]) -> Result<[u8; 16]> {
    let mut block = [0u8; 16];
    match iv.len() {
        8 | 16 => block[..iv.len()].copy_from_slice(iv),
        n => return Err(Error::InvalidIvLength(n)),
    }
    Ok(block)
}

// The CTR transform, in place. Encrypting and decrypting are the same.
fn apply_ctr(key: &[u8], iv: &[u8], subsamples: &[SubsampleEntry], data: &mut [u8]) -> Result<()> {
    if key.len() != 16 {
        return Err(Error::InvalidKeyLength(key.len()));
    }
    let iv = normalize_iv(iv)?;
    let mut cipher = Aes128Ctr::new_from_slices(key, &iv).map_err(|_| Error::InvalidKeyLength(key.len()))?;

    if subsamples.is_empty() {
        cipher.apply_keystream(data);
        return Ok(());
    }

    let layout: u64 = subsamples
        .iter()
        .map(|s| s.bytes_of_clear_data as u64 + s.bytes_of_protected_data as u64)
        .sum();
    if layout != data.len() as u64 {
        return Err(Error::InvalidSubsampleLayout {
            layout,
            sample: data.len() as u64,
        });
    }

    let mut pos = 0;
    for s in subsamples {
        pos += s.bytes_of_clear_data as usize;
        let end = pos + s.bytes_of_protected_data as usize;
        cipher.apply_keystream(&mut data[pos..end]);
        pos = end;
    }
    Ok(())
}

/// Decrypt the data of one sample in place.
///
/// With an empty subsample list the whole sample is protected.
pub fn decrypt_sample_data(key: &[u8], iv: &[u8], subsamples: &[SubsampleEntry], data: &mut [u8]) -> Result<()> {
    apply_ctr(key, iv, subsamples, data)
}

/// Encrypt the data of one sample in place.
pub fn encrypt_sample_data(key: &[u8], iv: &[u8], subsamples: &[SubsampleEntry], data: &mut [u8]) -> Result<()> {
    apply_ctr(key, iv, subsamples, data)
}

/// Decrypt one sample. Timing, size and flags are copied unchanged.
pub fn decrypt_sample(key: &[u8], sample: &FullSample, senc: &SencEntry) -> Result<FullSample> {
    let mut out = sample.clone();
    if let Err(e) = decrypt_sample_data(key, &senc.iv, &senc.subsamples, &mut out.data) {
        log::error!("sample {} at offset {}: {}", sample.sample.index, sample.sample.offset, e);
        return Err(e);
    }
    Ok(out)
}

/// A scheme check that accepts any original format with the `cenc` scheme.
pub fn cenc_scheme(scheme: &ProtectionScheme) -> bool {
    scheme.scheme_type == "cenc"
}

// Remove protection from the fourcc + children of a sample entry.
fn unprotect_entry(
    fourcc: &mut FourCC,
    boxes: &mut Vec<MP4Box>,
    check: &dyn Fn(&ProtectionScheme) -> bool,
) -> Result<Option<ProtectionScheme>> {
    let sinf = match first_box!(boxes, ProtectionSchemeInfoBox) {
        Some(sinf) => sinf,
        None => return Ok(None),
    };
    if sinf.original_format().is_none() {
        return Err(Error::MissingBox("frma"));
    }
    let scheme = protection_scheme(sinf).ok_or(Error::MissingBox("schm"))?;
    if !check(&scheme) {
        return Err(Error::UnsupportedScheme {
            scheme: scheme.scheme_type,
            format: scheme.original_format,
        });
    }
    *fourcc = scheme.original_format;
    boxes.retain(|b| b.fourcc() != "sinf");
    Ok(Some(scheme))
}

/// Turn an encrypted sample entry (encv, enca) back into a clear one.
///
/// The protection scheme is passed to `check`; if it returns false the
/// result is `UnsupportedScheme`. Returns `None` for clear entries.
pub fn unprotect_sample_entry(
    entry: &mut MP4Box,
    check: &dyn Fn(&ProtectionScheme) -> bool,
) -> Result<Option<ProtectionScheme>> {
    match entry {
        MP4Box::VisualSampleEntry(v) => unprotect_entry(&mut v.fourcc, &mut v.boxes, check),
        MP4Box::AudioSampleEntry(a) => unprotect_entry(&mut a.fourcc, &mut a.boxes, check),
        _ => Ok(None),
    }
}

/// A track that was protected.
#[derive(Clone, Debug)]
pub struct ProtectedTrack {
    pub track_id: u32,
    pub scheme:   ProtectionScheme,
    pub tenc:     Option<TrackEncryptionBox>,
}

/// Remove the protection from all sample entries in a movie, and
/// drop the pssh boxes.
pub fn unprotect_movie(
    movie: &mut MovieBox,
    check: &dyn Fn(&ProtectionScheme) -> bool,
) -> Result<Vec<ProtectedTrack>> {
    let mut protected = Vec::new();
    for trak in iter_box_mut!(&mut movie.boxes, TrackBox) {
        let track_id = trak.track_id().ok_or(Error::MissingBox("tkhd"))?;
        let stsd = match trak.sample_description_mut() {
            Some(stsd) => stsd,
            None => continue,
        };
        for entry in stsd.boxes.iter_mut() {
            let tenc = protection_info(entry).and_then(|sinf| sinf.track_encryption()).cloned();
            if let Some(scheme) = unprotect_sample_entry(entry, check)? {
                log::debug!("track {}: removed {} protection from {}", track_id, scheme.scheme_type, scheme.original_format);
                if !protected.iter().any(|p: &ProtectedTrack| p.track_id == track_id) {
                    protected.push(ProtectedTrack { track_id, scheme, tenc });
                }
            }
        }
    }
    movie.boxes.retain(|b| b.fourcc() != "pssh");
    Ok(protected)
}

// Decrypt all samples of a fragment and build a new one.
fn decrypt_fragment(frag: &Fragment<'_>, key: &[u8], protected: &[ProtectedTrack]) -> Result<(MovieFragmentBox, MediaDataBox)> {
    let mut tracks = Vec::new();
    for tfs in frag.track_fragments()? {
        let mut samples = tfs
            .samples
            .iter()
            .map(|s| frag.sample_data(s.clone()))
            .collect::<Result<Vec<_>>>()?;

        if let Some(p) = protected.iter().find(|p| p.track_id == tfs.track_id) {
            let entries = frag.sample_encryption(&tfs, p.tenc.as_ref())?;
            for (sample, senc) in samples.iter_mut().zip(entries.iter()) {
                *sample = decrypt_sample(key, sample, senc)?;
            }
        }

        tracks.push(TrackSamples {
            track_id: tfs.track_id,
            base_decode_time: tfs.traf.base_media_decode_time(),
            samples,
        });
    }
    build_fragment(frag.sequence_number(), &tracks)
}

/// Decrypt a fragmented file.
///
/// The init segment is unprotected, every fragment is decrypted and
/// written as a new moof + mdat. sidx and mfra boxes are dropped
/// because the offsets in them are no longer valid.
pub fn decrypt_file(mp4: &MP4, key: &[u8], check: &dyn Fn(&ProtectionScheme) -> bool) -> Result<MP4> {
    if key.len() != 16 {
        return Err(Error::InvalidKeyLength(key.len()));
    }
    let mut movie = mp4.movie().ok_or(Error::MissingBox("moov"))?.clone();
    let protected = unprotect_movie(&mut movie, check)?;
    if protected.is_empty() {
        log::warn!("no protected tracks found");
    }

    let fragments = mp4.fragments();
    let mdat_offsets: HashSet<u64> = fragments
        .iter()
        .filter(|f| f.mdat.is_some())
        .map(|f| f.mdat_offset)
        .collect();
    let mut fragments = fragments.iter();

    let mut boxes = Vec::new();
    let mut offset = 0;
    for b in &mp4.boxes {
        match b {
            MP4Box::MovieBox(_) => boxes.push(MP4Box::MovieBox(movie.clone())),
            MP4Box::MovieFragmentBox(_) => {
                let frag = fragments.next().ok_or(Error::MissingBox("moof"))?;
                let (moof, mdat) = decrypt_fragment(frag, key, &protected)?;
                boxes.push(moof.into());
                boxes.push(mdat.into());
            },
            MP4Box::MediaDataBox(_) if mdat_offsets.contains(&offset) => {},
            b if b.fourcc() == "sidx" || b.fourcc() == "mfra" => {
                log::warn!("dropping {} box", b.fourcc());
            },
            b => boxes.push(b.clone()),
        }
        offset += b.size();
    }
    Ok(MP4 { boxes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const KEY: [u8; 16] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
    ];

    #[test]
    fn iv_normalization() {
        let iv8 = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut iv16 = [0u8; 16];
        iv16[..8].copy_from_slice(&iv8);
        assert_eq!(normalize_iv(&iv8).unwrap(), iv16);
        assert_eq!(normalize_iv(&iv16).unwrap(), iv16);
        assert_matches!(normalize_iv(&[0u8; 12]), Err(Error::InvalidIvLength(12)));
        assert_matches!(normalize_iv(&[]), Err(Error::InvalidIvLength(0)));
    }

    fn unhex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    // NIST SP 800-38A, F.5.1 CTR-AES128.Encrypt.
    #[test]
    fn aes_ctr_known_answer() {
        let iv = unhex("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff");
        let mut data = unhex(
            "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51\
             30c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710",
        );
        encrypt_sample_data(&KEY, &iv, &[], &mut data).unwrap();
        assert_eq!(data[..16], unhex("874d6191b620e3261bef6864990db6ce")[..]);
        assert_eq!(
            data,
            unhex(
                "874d6191b620e3261bef6864990db6ce9806f66b7970fdff8617187bb9fffdff\
                 5ae4df3edbd5d35e5b4f09020db03eab1e031dda2fbe03d1792170a0f3009cee"
            )
        );
    }

    #[test]
    fn counter_is_128_bits_big_endian() {
        // The counter carries from the low into the high 64 bits.
        let mut iv = [0u8; 16];
        iv[8..].copy_from_slice(&[0xff; 8]);
        let mut data = vec![0u8; 32];
        decrypt_sample_data(&KEY, &iv, &[], &mut data).unwrap();
        assert_eq!(
            data,
            unhex("ef8737b783c4fa88e687ee9467073f6edc0a3bc38609c26f6f2a63a39cf7ee93")
        );
    }

    #[test]
    fn short_iv_fixed_output() {
        let iv = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let subs = [
            SubsampleEntry {
                bytes_of_clear_data:     5,
                bytes_of_protected_data: 20,
            },
            SubsampleEntry {
                bytes_of_clear_data:     3,
                bytes_of_protected_data: 12,
            },
        ];
        let mut data: Vec<u8> = (0..40u8).collect();
        encrypt_sample_data(&KEY, &iv, &subs, &mut data).unwrap();
        assert_eq!(
            data,
            unhex("000102030458ced2aea63218174385a7954f80a01f3ac18633191a1b1356e4d5c0dca53ed9e02784")
        );
        decrypt_sample_data(&KEY, &iv, &subs, &mut data).unwrap();
        assert_eq!(data, (0..40u8).collect::<Vec<_>>());
    }

    #[test]
    fn keystream_continues_across_subsamples() {
        let plain: Vec<u8> = (0..48u8).collect();

        // Encrypt 32 bytes as one protected range.
        let mut whole = plain[8..40].to_vec();
        encrypt_sample_data(&KEY, &[9; 8], &[], &mut whole).unwrap();

        // Same 32 bytes split over two protected ranges with clear bytes
        // in between must use the same keystream.
        let subs = [
            SubsampleEntry {
                bytes_of_clear_data:     8,
                bytes_of_protected_data: 20,
            },
            SubsampleEntry {
                bytes_of_clear_data:     8,
                bytes_of_protected_data: 12,
            },
        ];
        let mut data = plain.clone();
        encrypt_sample_data(&KEY, &[9; 8], &subs, &mut data).unwrap();
        assert_eq!(&data[0..8], &plain[0..8]);
        assert_eq!(&data[8..28], &whole[0..20]);
        assert_eq!(&data[28..36], &plain[28..36]);
        assert_eq!(&data[36..48], &whole[20..32]);

        decrypt_sample_data(&KEY, &[9; 8], &subs, &mut data).unwrap();
        assert_eq!(data, plain);
    }

    #[test]
    fn bad_key_and_layout() {
        let mut data = vec![0u8; 10];
        assert_matches!(
            decrypt_sample_data(&KEY[..15], &[0; 8], &[], &mut data),
            Err(Error::InvalidKeyLength(15))
        );
        assert_matches!(decrypt_sample_data(&[], &[0; 8], &[], &mut data), Err(Error::InvalidKeyLength(0)));
        let subs = [SubsampleEntry {
            bytes_of_clear_data:     2,
            bytes_of_protected_data: 4,
        }];
        assert_matches!(
            decrypt_sample_data(&KEY, &[0; 8], &subs, &mut data),
            Err(Error::InvalidSubsampleLayout { layout: 6, sample: 10 })
        );
        assert_eq!(data, vec![0u8; 10]);
    }

    #[test]
    fn unprotect_entry_checks_scheme() {
        let mut sinf = ProtectionSchemeInfoBox::default();
        sinf.add_child(OriginalFormatBox {
            data_format: FourCC::new("avc1"),
        });
        sinf.add_child(SchemeTypeBox {
            scheme_type:    FourCC::new("cbcs"),
            scheme_version: 0x10000,
            scheme_uri:     None,
        });
        let mut entry = VisualSampleEntry {
            fourcc:               FourCC::new("encv"),
            data_reference_index: 1,
            width:                64,
            height:               48,
            horizresolution:      0x0048_0000,
            vertresolution:       0x0048_0000,
            frame_count:          1,
            compressor_name:      [0; 32],
            depth:                0x18,
            boxes:                vec![sinf.into()],
        };
        let mut boxed = MP4Box::from(entry.clone());
        assert_matches!(
            unprotect_sample_entry(&mut boxed, &cenc_scheme),
            Err(Error::UnsupportedScheme { .. })
        );

        let schm = first_box_mut!(&mut entry.boxes, ProtectionSchemeInfoBox)
            .and_then(|s| s.scheme_type_mut())
            .unwrap();
        schm.scheme_type = FourCC::new("cenc");
        let mut boxed = MP4Box::from(entry);
        let scheme = unprotect_sample_entry(&mut boxed, &cenc_scheme).unwrap().unwrap();
        assert_eq!(scheme.original_format, FourCC::new("avc1"));
        assert_eq!(boxed.fourcc(), FourCC::new("avc1"));
        assert_eq!(boxed.boxes().unwrap().len(), 0);
    }
}
