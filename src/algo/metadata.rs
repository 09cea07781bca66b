//! Metadata engine.
//!
//! BMP hosts hide the payload in the gap between header and pixel data,
//! enlarging the total-size and pixel-offset fields to cover it. PNG hosts
//! hide it in two marked `tEXt` chunks spliced in just before `IEND`. In
//! both cases large payloads are keystream-XORed in order while small ones
//! are position-scrambled instead.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::algo::{AlgoKind, EmbeddingAlgorithm, LARGE_FILE_THRESHOLD};
use crate::media::png::{CRC_LEN, FIRST_CHUNK, IEND_CHUNK_LEN, SIG_IEND, SIG_TEXT};
use crate::media::FormatMetadata;
use crate::scramble::{Keystream, Permutation};
use crate::session::Session;
use crate::signature::write_trailer;
use crate::stream::copy_bytes;

/// Marker bytes opening every `tEXt` chunk this engine writes.
const PNG_MARKER: &[u8; 4] = b"STEG";
/// Offset of the BMP pixel-data-offset field.
const BMP_PIXEL_OFFSET_FIELD: u64 = 10;

fn unsupported() -> std::io::Error {
    std::io::Error::new(
        ErrorKind::InvalidInput,
        "metadata embedding runs on BMP and PNG hosts only",
    )
}

/// In-place payload transform: keystream XOR for large payloads, a position
/// scramble for small ones.
fn transform(buf: Vec<u8>, password: &[u8], extract: bool) -> Vec<u8> {
    if buf.len() as u32 > LARGE_FILE_THRESHOLD {
        let mut buf = buf;
        Keystream::new(password).mask_in_place(&mut buf);
        buf
    } else {
        let perm = Permutation::from_password(password, buf.len() as u32);
        if extract {
            perm.unshuffle(&buf)
        } else {
            perm.shuffle(&buf)
        }
    }
}

pub struct MetadataEngine;

impl EmbeddingAlgorithm for MetadataEngine {
    fn insert(&self, session: &mut Session) -> std::io::Result<()> {
        match session.require_metadata()? {
            FormatMetadata::Bmp(i) => insert_bmp(session, i.header_size, i.data_size),
            FormatMetadata::Png(i) => insert_png(session, i.header_size, i.data_size),
            _ => Err(unsupported()),
        }
    }

    fn extract(&self, session: &mut Session) -> std::io::Result<()> {
        match session.require_metadata()? {
            FormatMetadata::Bmp(i) => extract_bmp(session, i.header_size),
            FormatMetadata::Png(_) => extract_png(session),
            _ => Err(unsupported()),
        }
    }
}

fn insert_bmp(session: &mut Session, header_size: u32, data_size: u32) -> std::io::Result<()> {
    let len = session.payload_len;
    let method = session.method;
    let name = session.payload_name.clone().unwrap_or_default();
    let io = session.insert_io()?;

    io.host.seek(SeekFrom::Start(0))?;
    io.payload.seek(SeekFrom::Start(0))?;

    // Signature and enlarged total size.
    io.result.write_all(b"BM")?;
    io.result
        .write_u32::<LittleEndian>(header_size + data_size + len)?;
    io.host.seek(SeekFrom::Start(6))?;
    copy_bytes(io.host, io.result, BMP_PIXEL_OFFSET_FIELD - 6)?;

    // Enlarged pixel data offset, shifted by the spliced payload.
    io.host.seek(SeekFrom::Current(4))?;
    io.result.write_u32::<LittleEndian>(header_size + len)?;
    copy_bytes(
        io.host,
        io.result,
        header_size as u64 - BMP_PIXEL_OFFSET_FIELD - 4,
    )?;

    let mut payload = vec![0u8; len as usize];
    io.payload.read_exact(&mut payload)?;
    io.result
        .write_all(&transform(payload, io.password, false))?;

    copy_bytes(io.host, io.result, data_size as u64)?;
    write_trailer(io.result, method, AlgoKind::Metadata, len, &name, io.password)
}

fn extract_bmp(session: &mut Session, header_size: u32) -> std::io::Result<()> {
    let len = session.payload_len;
    let io = session.extract_io()?;

    // The inspected pixel offset of a stego file already includes the
    // spliced payload, which sits right before the pixel data.
    let payload_start = (header_size as u64).checked_sub(len as u64).ok_or_else(|| {
        std::io::Error::new(
            ErrorKind::InvalidData,
            "hidden payload is larger than the BMP header gap",
        )
    })?;
    io.host.seek(SeekFrom::Start(payload_start))?;
    let mut payload = vec![0u8; len as usize];
    io.host.read_exact(&mut payload)?;
    io.result.write_all(&transform(payload, io.password, true))
}

fn insert_png(session: &mut Session, header_size: u32, data_size: u32) -> std::io::Result<()> {
    let len = session.payload_len;
    let method = session.method;
    let name = session.payload_name.clone().unwrap_or_default();
    let io = session.insert_io()?;

    io.host.seek(SeekFrom::Start(0))?;
    io.payload.seek(SeekFrom::Start(0))?;

    // Everything up to the IEND chunk travels unmodified.
    copy_bytes(
        io.host,
        io.result,
        header_size as u64 + data_size as u64 - IEND_CHUNK_LEN,
    )?;

    let mut payload = vec![0u8; len as usize];
    io.payload.read_exact(&mut payload)?;
    let payload = transform(payload, io.password, false);

    // Two tEXt chunks, each marked and carrying half the payload. CRCs are
    // left zero; readers that verify them will drop the chunks, not the
    // image.
    let halves = [&payload[..len as usize / 2], &payload[len as usize / 2..]];
    for half in halves {
        io.result
            .write_u32::<BigEndian>(half.len() as u32 + PNG_MARKER.len() as u32)?;
        io.result.write_u32::<BigEndian>(SIG_TEXT)?;
        io.result.write_all(PNG_MARKER)?;
        io.result.write_all(half)?;
        io.result.write_u32::<BigEndian>(0)?;
    }

    copy_bytes(io.host, io.result, IEND_CHUNK_LEN)?;
    write_trailer(io.result, method, AlgoKind::Metadata, len, &name, io.password)
}

fn extract_png(session: &mut Session) -> std::io::Result<()> {
    let len = session.payload_len;
    let io = session.extract_io()?;

    io.host.seek(SeekFrom::Start(FIRST_CHUNK))?;
    let mut collected = Vec::with_capacity(len as usize);
    loop {
        let chunk_size = io.host.read_u32::<BigEndian>()?;
        let chunk_type = io.host.read_u32::<BigEndian>()?;
        if chunk_type == SIG_IEND {
            break;
        }
        if chunk_type == SIG_TEXT && chunk_size as usize >= PNG_MARKER.len() {
            let mut marker = [0u8; 4];
            io.host.read_exact(&mut marker)?;
            let body = chunk_size as u64 - PNG_MARKER.len() as u64;
            if &marker == PNG_MARKER {
                let mut half = vec![0u8; body as usize];
                io.host.read_exact(&mut half)?;
                collected.extend_from_slice(&half);
            } else {
                io.host.seek(SeekFrom::Current(body as i64))?;
            }
            io.host.seek(SeekFrom::Current(CRC_LEN as i64))?;
        } else {
            io.host
                .seek(SeekFrom::Current(chunk_size as i64 + CRC_LEN as i64))?;
        }
    }

    if collected.len() != len as usize {
        return Err(std::io::Error::new(
            ErrorKind::InvalidData,
            "marked tEXt chunks do not add up to the hidden payload length",
        ));
    }
    io.result
        .write_all(&transform(collected, io.password, true))
}
