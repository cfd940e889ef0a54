//! All the boxes we know about.
//!
//! A box type is added by writing the struct plus its `BoxCodec` impl
//! in one of the modules below and adding one line to the list.
//!
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::mp4box::{decode_as, BoxCodec, BoxInfo, DecodeFn, GenericBox};
use crate::serialize::WriteBytes;
use crate::types::FourCC;

pub(crate) mod prelude;

def_boxes! {
    FileTypeBox, [ b"ftyp", b"styp" ] => ftyp;

    MovieBox, [ b"moov" ] => moov;
    MovieExtendsBox, [ b"mvex" ];
    TrackExtendsBox, [ b"trex" ];

    TrackBox, [ b"trak" ] => trak;
    TrackHeaderBox, [ b"tkhd" ];
    MediaBox, [ b"mdia" ];
    MediaHeaderBox, [ b"mdhd" ];
    MediaInformationBox, [ b"minf" ];
    SampleTableBox, [ b"stbl" ];
    SampleDescriptionBox, [ b"stsd" ];

    VisualSampleEntry, [ b"avc1", b"avc3", b"hvc1", b"hev1", b"encv" ] => sample_entry;
    AudioSampleEntry, [ b"mp4a", b"enca" ];

    ProtectionSchemeInfoBox, [ b"sinf" ] => sinf;
    OriginalFormatBox, [ b"frma" ];
    SchemeTypeBox, [ b"schm" ];
    SchemeInformationBox, [ b"schi" ];
    TrackEncryptionBox, [ b"tenc" ];

    MovieFragmentBox, [ b"moof" ] => moof;
    MovieFragmentHeaderBox, [ b"mfhd" ];

    TrackFragmentBox, [ b"traf" ] => traf;
    TrackFragmentHeaderBox, [ b"tfhd" ];
    TrackFragmentBaseMediaDecodeTimeBox, [ b"tfdt" ];

    TrackRunBox, [ b"trun" ] => trun;

    SampleEncryptionBox, [ b"senc" ] => senc;

    SampleAuxiliaryInformationSizesBox, [ b"saiz" ] => aux_info;
    SampleAuxiliaryInformationOffsetsBox, [ b"saio" ];

    MediaDataBox, [ b"mdat" ] => mdat;

    WvttSampleEntry, [ b"wvtt" ] => wvtt;
    WebVTTConfigurationBox, [ b"vttC" ];
    WebVTTSourceLabelBox, [ b"vlab" ];
    BitRateBox, [ b"btrt" ];
    VTTEmptyCueBox, [ b"vtte" ];
    VTTCueBox, [ b"vttc" ];
    CueSourceIDBox, [ b"vsid" ];
    CueTimeBox, [ b"ctim" ];
    CueIDBox, [ b"iden" ];
    CueSettingsBox, [ b"sttg" ];
    CuePayloadBox, [ b"payl" ];
    VTTAdditionalTextBox, [ b"vtta" ];
}
