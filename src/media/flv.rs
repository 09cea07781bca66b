//! FLV host support.
//!
//! An FLV file is a 9-byte header, a leading previous-tag-size of zero, then
//! tag records: `[u8 type][u24 big endian size][u24 timestamp][u8 ts ext]
//! [u24 stream id][payload][u32 big endian previous tag size]`. Only video,
//! audio, metadata and script-data tag types are walked; anything else ends
//! the inventory.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::media::FormatKind;

/// "FLV" in the low 3 bytes of the first big endian u32.
const SIG_FLV: u32 = 0x464C_56;

pub const TAG_AUDIO: u8 = 8;
pub const TAG_VIDEO: u8 = 9;
pub const TAG_METADATA: u8 = 18;
pub const TAG_SCRIPT_DATA: u8 = 24;

/// Header, flags and header-size field plus the first previous-tag-size.
pub const BODY_OFFSET: u64 = 13;
/// Tag bytes between the end of the size field and the tag payload
/// (remaining timestamp bytes, timestamp extension, stream id).
pub const TAG_REMAINDER: u64 = 6;

/// Structural facts about an FLV host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvInfo {
    /// Number of video tags, the only tag type that can carry hidden data.
    pub video_tags: u32,
    /// Number of metadata tags.
    pub metadata_tags: u32,
    /// File size accumulated from the previous-tag-size fields.
    pub file_size: u32,
}

pub fn detect<S: Read + Seek>(stream: &mut S) -> std::io::Result<Option<FormatKind>> {
    stream.seek(SeekFrom::Start(0))?;
    let sig = stream.read_u32::<BigEndian>()? >> 8;
    Ok((sig == SIG_FLV).then_some(FormatKind::Flv))
}

/// Walk the tag inventory. With `reject_trailing` set (insertion mode), any
/// byte after the last well-formed tag makes the host incompatible.
pub fn inspect<S: Read + Seek>(stream: &mut S, reject_trailing: bool) -> std::io::Result<FlvInfo> {
    let mut info = FlvInfo {
        video_tags: 0,
        metadata_tags: 0,
        file_size: 0,
    };

    stream.seek(SeekFrom::Start(5))?;
    let header_size = stream.read_u32::<BigEndian>()?;
    info.file_size += header_size;
    // Leading previous-tag-size, always zero.
    stream.seek(SeekFrom::Current(4))?;
    info.file_size += 4;

    loop {
        let tag_type = match stream.read_u8() {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };
        match tag_type {
            TAG_VIDEO => info.video_tags += 1,
            TAG_METADATA => info.metadata_tags += 1,
            TAG_AUDIO | TAG_SCRIPT_DATA => {}
            _ => {
                // Not a tag: leave the byte for the trailing-data probe.
                stream.seek(SeekFrom::Current(-1))?;
                break;
            }
        }
        let data_size = stream.read_u32::<BigEndian>()? >> 8;
        stream.seek(SeekFrom::Current(data_size as i64 + TAG_REMAINDER as i64))?;
        let prev_tag_size = stream.read_u32::<BigEndian>()?;
        info.file_size += prev_tag_size + 4;
    }

    if reject_trailing {
        let mut probe = [0u8; 1];
        if stream.read(&mut probe)? != 0 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                "FLV host carries data after the last tag",
            ));
        }
    }
    Ok(info)
}
