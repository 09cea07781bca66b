//! WAVE host support.
//!
//! The inspection walks the RIFF sub-chunks sequentially until the `data`
//! chunk, picking up the bits-per-sample field while passing `fmt `.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::media::FormatKind;

/// "RIFF" read as a little endian u32.
const SIG_RIFF: u32 = 0x4646_4952;
/// "WAVE" read as a little endian u32.
const SIG_WAVE: u32 = 0x4556_4157;
/// "data" read as a little endian u32.
const SIG_DATA: u32 = 0x6174_6164;
/// "fmt " read as a little endian u32.
const SIG_FMT: u32 = 0x2074_6D66;
/// PCM format tag.
const FORMAT_PCM: u16 = 0x0001;

/// Offset of the "WAVE" form type.
const OFF_WAVE: u64 = 8;
/// Offset of the format tag inside the canonical `fmt ` chunk.
const OFF_FORMAT_TAG: u64 = 20;
/// Offset of the first sub-chunk.
const FIRST_SUBCHUNK: u64 = 12;
/// Bytes between the end of a `fmt ` size field and its bits-per-sample.
const FMT_BPS_OFFSET: u64 = 14;

/// Structural facts about a WAVE host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    /// Offset of the first sample byte (everything before the `data`
    /// chunk's contents).
    pub header_size: u32,
    /// Declared size of the `data` chunk, in bytes.
    pub data_size: u32,
    /// Bits per sample from the `fmt ` chunk.
    pub bits_per_sample: u16,
}

pub fn detect<S: Read + Seek>(stream: &mut S) -> std::io::Result<Option<FormatKind>> {
    stream.seek(SeekFrom::Start(0))?;
    if stream.read_u32::<LittleEndian>()? != SIG_RIFF {
        return Ok(None);
    }
    stream.seek(SeekFrom::Start(OFF_WAVE))?;
    if stream.read_u32::<LittleEndian>()? != SIG_WAVE {
        return Ok(None);
    }
    stream.seek(SeekFrom::Start(OFF_FORMAT_TAG))?;
    let format_tag = stream.read_u16::<LittleEndian>()?;
    Ok(Some(if format_tag == FORMAT_PCM {
        FormatKind::WavPcm
    } else {
        FormatKind::WavNoPcm
    }))
}

pub fn inspect<S: Read + Seek>(stream: &mut S) -> std::io::Result<WavInfo> {
    stream.seek(SeekFrom::Start(FIRST_SUBCHUNK))?;
    let mut bits_per_sample = 0u16;
    loop {
        let chunk_id = stream.read_u32::<LittleEndian>()?;
        let chunk_size = stream.read_u32::<LittleEndian>()?;

        if chunk_id == SIG_DATA {
            let header_size = stream.stream_position()? as u32;
            return Ok(WavInfo {
                header_size,
                data_size: chunk_size,
                bits_per_sample,
            });
        }

        if chunk_id == SIG_FMT {
            stream.seek(SeekFrom::Current(FMT_BPS_OFFSET as i64))?;
            bits_per_sample = stream.read_u16::<LittleEndian>()?;
            let consumed = FMT_BPS_OFFSET + 2;
            stream.seek(SeekFrom::Current(chunk_size as i64 - consumed as i64))?;
        } else {
            stream.seek(SeekFrom::Current(chunk_size as i64))?;
        }
    }
}
