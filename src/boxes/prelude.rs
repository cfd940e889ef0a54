pub(crate) use crate::boxes::MP4Box;
pub(crate) use crate::error::{Error, Result};
pub(crate) use crate::mp4box::{
    children_size, decode_children, encode_children, read_version_flags, write_version_flags, BoxCodec, BoxHeader,
    BoxInfo,
};
pub(crate) use crate::serialize::{FromBytes, ReadBytes, SliceReader, ToBytes, WriteBytes};
pub(crate) use crate::types::*;
