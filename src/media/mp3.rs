//! MP3 host support.
//!
//! Hosts are MPEG 1/2 Layer III streams, optionally wrapped in an ID3v2
//! header and an ID3v1 trailer tag. The inspection finds the first audio
//! frame, counts frames by deriving each frame length from its header, and
//! records where the audio officially ends.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::media::FormatKind;
use crate::stream::stream_len;

/// MPEG 1 Layer III sync pattern.
const SIG_MPEG1_LAYER3: u32 = 0xFFFA_0000;
/// MPEG 2 Layer III sync pattern.
const SIG_MPEG2_LAYER3: u32 = 0xFFF2_0000;
/// Mask selecting the sync-relevant header bits.
const MASK_MPEG_LAYER3: u32 = 0xFFFE_0000;
/// "TAG" in the top 3 bytes.
const SIG_ID3V1: u32 = 0x5441_4700;
/// "ID3" in the top 3 bytes.
const SIG_ID3V2: u32 = 0x4944_3300;
/// Mask selecting the 3 signature bytes of an ID3 marker.
const MASK_ID3: u32 = 0xFFFF_FF00;

/// Total size of an ID3v1 trailer tag.
pub const ID3V1_TAG_LEN: u64 = 128;
/// Size of an ID3v2 tag header.
const ID3V2_HEADER_LEN: u64 = 10;

/// Structural facts about an MP3 host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3Info {
    /// Offset of the first MPEG frame header.
    pub first_frame: u64,
    /// Number of MPEG frames.
    pub frame_count: u64,
    /// Offset just past the last frame or past the ID3v1 tag; anything
    /// after it is not part of the audio stream.
    pub end_of_audio: u64,
}

pub fn is_frame_header(hdr: u32) -> bool {
    (hdr & MASK_MPEG_LAYER3) == SIG_MPEG1_LAYER3 || (hdr & MASK_MPEG_LAYER3) == SIG_MPEG2_LAYER3
}

pub fn is_id3v1_header(hdr: u32) -> bool {
    (hdr & MASK_ID3) == SIG_ID3V1
}

fn is_id3v2_header(hdr: u32) -> bool {
    (hdr & MASK_ID3) == SIG_ID3V2
}

fn mpeg_version(hdr: u32) -> usize {
    const VERSIONS: [usize; 4] = [0, 0, 2, 1];
    VERSIONS[((hdr & 0x0018_0000) >> 19) as usize]
}

/// Frame length in bytes, header included. `None` for reserved bitrate or
/// sample-rate fields, which no well-formed frame uses.
pub fn frame_len(hdr: u32) -> Option<u64> {
    const BITRATES: [[u64; 16]; 3] = [
        [0; 16],
        [
            0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
        ],
        [
            0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
        ],
    ];
    const SAMPLE_RATES: [[u64; 4]; 3] = [
        [0; 4],
        [44100, 48000, 32000, 0],
        [22050, 24000, 16000, 0],
    ];

    let version = mpeg_version(hdr);
    let bitrate = BITRATES[version][((hdr & 0x0000_F000) >> 12) as usize];
    let sample_rate = SAMPLE_RATES[version][((hdr & 0x0000_0C00) >> 10) as usize];
    let padding = (hdr & 0x0000_0200) >> 9;
    if bitrate == 0 || sample_rate == 0 {
        return None;
    }
    Some((144_000 * bitrate) / sample_rate + padding as u64)
}

/// Strip the synchronization guard bits from an ID3v2 tag size.
fn unsyncsafe(s: u32) -> u32 {
    (s & 0x0000_007F) | ((s & 0x0000_7F00) >> 1) | ((s & 0x007F_0000) >> 2) | ((s & 0x7F00_0000) >> 3)
}

/// Skip over an ID3v2 tag whose 4 signature bytes were just read.
fn skip_id3v2<S: Read + Seek>(stream: &mut S) -> std::io::Result<()> {
    stream.seek(SeekFrom::Current(1))?; // remaining version byte
    let _flags = stream.read_u8()?;
    let size = stream.read_u32::<BigEndian>()?;
    stream.seek(SeekFrom::Start(unsyncsafe(size) as u64 + ID3V2_HEADER_LEN))?;
    Ok(())
}

/// Locate the first MPEG frame header: either at the very start of the
/// stream or directly after an ID3v2 tag.
pub fn find_first_frame<S: Read + Seek>(stream: &mut S) -> std::io::Result<Option<u64>> {
    stream.seek(SeekFrom::Start(0))?;
    let mut hdr = stream.read_u32::<BigEndian>()?;
    if is_id3v2_header(hdr) {
        skip_id3v2(stream)?;
        hdr = stream.read_u32::<BigEndian>()?;
    }
    if is_frame_header(hdr) {
        Ok(Some(stream.stream_position()? - 4))
    } else {
        Ok(None)
    }
}

pub fn detect<S: Read + Seek>(stream: &mut S) -> std::io::Result<Option<FormatKind>> {
    stream.seek(SeekFrom::Start(0))?;
    let sig = stream.read_u32::<BigEndian>()?;
    Ok((is_id3v2_header(sig) || is_frame_header(sig)).then_some(FormatKind::Mp3))
}

pub fn inspect<S: Read + Seek>(stream: &mut S) -> std::io::Result<Mp3Info> {
    let first_frame = find_first_frame(stream)?.ok_or_else(|| {
        std::io::Error::new(ErrorKind::InvalidData, "no MPEG frame found in MP3 host")
    })?;
    stream.seek(SeekFrom::Start(first_frame))?;

    let mut frame_count = 0u64;
    loop {
        let hdr = match stream.read_u32::<BigEndian>() {
            Ok(h) => h,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                // Audio runs to the end of the stream.
                let end_of_audio = stream_len(stream)?;
                return Ok(Mp3Info {
                    first_frame,
                    frame_count,
                    end_of_audio,
                });
            }
            Err(e) => return Err(e),
        };
        if is_frame_header(hdr) {
            let len = frame_len(hdr).ok_or_else(|| {
                std::io::Error::new(ErrorKind::InvalidData, "MPEG header with reserved fields")
            })?;
            stream.seek(SeekFrom::Current(len as i64 - 4))?;
            frame_count += 1;
            continue;
        }

        let end_of_audio = if is_id3v1_header(hdr) {
            // The remaining tag bytes still belong to the audio file.
            stream.seek(SeekFrom::Current(ID3V1_TAG_LEN as i64 - 4))?;
            stream.stream_position()?
        } else {
            // 4 unrecognized bytes were read past the end.
            stream.stream_position()? - 4
        };
        return Ok(Mp3Info {
            first_frame,
            frame_count,
            end_of_audio,
        });
    }
}
