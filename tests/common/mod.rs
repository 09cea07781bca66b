//! Hosts for formats no fixture crate covers: FLV, MP3 and AVI files are
//! assembled byte by byte.

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::io::Write;

pub const TAG_VIDEO: u8 = 9;
pub const TAG_AUDIO: u8 = 8;
pub const TAG_METADATA: u8 = 18;

/// Length of a frame with header 0xFFFA9000 (MPEG 1 Layer III, 128 kbps,
/// 44.1 kHz, no padding).
pub const MP3_FRAME_LEN: usize = 417;

/// FLV with the given `(tag_type, payload_size)` tag sequence.
pub fn flv_host(tags: &[(u8, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_all(b"FLV").unwrap();
    out.write_u8(1).unwrap();
    out.write_u8(5).unwrap();
    out.write_u32::<BigEndian>(9).unwrap();
    out.write_u32::<BigEndian>(0).unwrap();
    for (n, &(tag_type, size)) in tags.iter().enumerate() {
        out.write_u8(tag_type).unwrap();
        out.write_u24::<BigEndian>(size).unwrap();
        out.write_u24::<BigEndian>(n as u32).unwrap();
        out.write_u8(0).unwrap();
        out.write_u24::<BigEndian>(0).unwrap();
        out.extend((0..size).map(|i| (i + n as u32 * 11) as u8));
        out.write_u32::<BigEndian>(11 + size).unwrap();
    }
    out
}

/// MPEG 1 Layer III stream of identical frames, optionally with an ID3v1
/// trailer tag.
pub fn mp3_host(frames: u32, id3v1: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for n in 0..frames {
        out.write_u32::<BigEndian>(0xFFFA_9000).unwrap();
        out.extend((0..MP3_FRAME_LEN - 4).map(|i| (i as u32 + n) as u8));
    }
    if id3v1 {
        out.write_all(b"TAG").unwrap();
        out.extend(std::iter::repeat(b'x').take(125));
    }
    out
}

/// RIFF AVI wrapper around `content_len` deterministic bytes.
pub fn avi_host(content_len: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_all(b"RIFF").unwrap();
    out.write_u32::<LittleEndian>(content_len + 4).unwrap();
    out.write_all(b"AVI ").unwrap();
    out.extend((0..content_len).map(|i| (i * 5 + 1) as u8));
    out
}
