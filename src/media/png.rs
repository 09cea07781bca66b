//! PNG host support.
//!
//! Chunks are `[u32 big endian length][4 byte type][data][u32 CRC]`; the
//! walk stops at `IEND`.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::media::FormatKind;

/// Full 8-byte PNG signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
/// "IEND" as a big endian u32.
pub const SIG_IEND: u32 = 0x4945_4E44;
/// "tEXt" as a big endian u32.
pub const SIG_TEXT: u32 = 0x7445_5874;
/// Offset of the IHDR length field, directly after the signature.
pub const FIRST_CHUNK: u64 = 8;
/// Length of a chunk CRC.
pub const CRC_LEN: u64 = 4;
/// Full length of the IEND chunk (length, type, CRC).
pub const IEND_CHUNK_LEN: u64 = 12;

/// Structural facts about a PNG host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngInfo {
    /// Signature plus IHDR data length; the offset the original image data
    /// accounting starts from.
    pub header_size: u32,
    /// Everything between `header_size` and the end of the IEND chunk.
    pub data_size: u32,
}

pub fn detect<S: Read + Seek>(stream: &mut S) -> std::io::Result<Option<FormatKind>> {
    stream.seek(SeekFrom::Start(0))?;
    let mut sig = [0u8; 8];
    stream.read_exact(&mut sig)?;
    Ok((sig == PNG_SIGNATURE).then_some(FormatKind::Png))
}

pub fn inspect<S: Read + Seek>(stream: &mut S) -> std::io::Result<PngInfo> {
    stream.seek(SeekFrom::Start(FIRST_CHUNK))?;
    let ihdr_length = stream.read_u32::<BigEndian>()?;
    let header_size = FIRST_CHUNK as u32 + ihdr_length;

    stream.seek(SeekFrom::Start(FIRST_CHUNK))?;
    let mut chunk_size = stream.read_u32::<BigEndian>()?;
    let mut chunk_type = stream.read_u32::<BigEndian>()?;
    while chunk_type != SIG_IEND {
        stream.seek(SeekFrom::Current(chunk_size as i64 + CRC_LEN as i64))?;
        chunk_size = stream.read_u32::<BigEndian>()?;
        chunk_type = stream.read_u32::<BigEndian>()?;
    }
    // Only the IEND CRC is left past the current position.
    let file_size = stream.stream_position()? as u32 + CRC_LEN as u32;

    Ok(PngInfo {
        header_size,
        data_size: file_size - header_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::test_fixtures::png_host;
    use std::io::Cursor;

    #[test]
    fn detects_png() {
        let mut host = Cursor::new(png_host(32));
        assert_eq!(detect(&mut host).unwrap(), Some(FormatKind::Png));
    }

    #[test]
    fn rejects_tampered_signature() {
        let mut bytes = png_host(32);
        bytes[0] = 0x88;
        let mut host = Cursor::new(bytes);
        assert_eq!(detect(&mut host).unwrap(), None);
    }

    #[test]
    fn walks_chunks_to_iend() {
        let bytes = png_host(40);
        let total = bytes.len() as u32;
        let mut host = Cursor::new(bytes);
        let info = inspect(&mut host).unwrap();
        assert_eq!(info.header_size, 8 + 13);
        assert_eq!(info.header_size + info.data_size, total);
    }
}
