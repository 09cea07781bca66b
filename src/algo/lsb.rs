//! Least-significant-bit engine.
//!
//! BMP and WAV hosts carry payload bits in the low 2 bits of their raw data
//! bytes, four host bytes per payload byte, most significant pair first. Two
//! routes exist: *direct* substitution streams host bytes in file order and
//! keystream-masks every payload byte, *scrambled* substitution loads the
//! whole data region and lets the unit permutation pick a pseudo random
//! carrier byte for every pair. MP3 hosts use a third route that rewrites a
//! fixed set of bits in every MPEG frame header and copies the audio
//! through untouched.

use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

use bitstream_io::{BigEndian as BitEndian, BitRead, BitReader, BitWrite, BitWriter};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::algo::{AlgoKind, EmbeddingAlgorithm, LARGE_FILE_THRESHOLD};
use crate::media::{mp3, FormatMetadata, Mp3Info};
use crate::scramble::{Keystream, UnitDraw};
use crate::session::Session;
use crate::signature::write_trailer;
use crate::stream::copy_bytes;

/// Clears the two carrier bits of a host byte.
const HOST_MASK: u8 = 0xFC;
/// Selects the two carrier bits of a host byte.
const PAIR_MASK: u8 = 0x03;

/// Modifiable bits per MPEG frame header.
const HEADER_BITS: usize = 3;
/// Header masks clearing one carrier bit each.
const BIT_MASKS: [u32; HEADER_BITS] = [0xFFFF_FFFB, 0xFFFF_FFF7, 0xFFFF_FEFF];
/// Bit positions matching `BIT_MASKS`.
const BIT_SHIFTS: [u32; HEADER_BITS] = [2, 3, 8];

fn unsupported() -> std::io::Error {
    std::io::Error::new(
        ErrorKind::InvalidInput,
        "LSB runs on BMP, WAV and MP3 hosts only",
    )
}

fn invalid(msg: &str) -> std::io::Error {
    std::io::Error::new(ErrorKind::InvalidData, msg.to_string())
}

/// Split a byte into its four 2-bit groups, most significant first.
fn split_pairs(byte: u8) -> std::io::Result<[u8; 4]> {
    let mut reader = BitReader::endian(Cursor::new([byte]), BitEndian);
    let mut pairs = [0u8; 4];
    for pair in pairs.iter_mut() {
        *pair = reader.read(2)?;
    }
    Ok(pairs)
}

/// Reassemble a byte from four 2-bit groups, most significant first.
fn join_pairs(pairs: [u8; 4]) -> std::io::Result<u8> {
    let mut out = [0u8; 1];
    let mut writer = BitWriter::endian(Cursor::new(&mut out[..]), BitEndian);
    for pair in pairs {
        writer.write(2, pair)?;
    }
    Ok(out[0])
}

pub struct LsbEngine;

impl EmbeddingAlgorithm for LsbEngine {
    fn insert(&self, session: &mut Session) -> std::io::Result<()> {
        let force_direct = session.kind.map(|k| k.is_wav()).unwrap_or(false);
        match session.require_metadata()? {
            FormatMetadata::Bmp(i) => {
                insert_plane(session, i.header_size, i.data_size, force_direct)
            }
            FormatMetadata::Wav(i) => {
                insert_plane(session, i.header_size, i.data_size, force_direct)
            }
            FormatMetadata::Mp3(i) => insert_mp3(session, i),
            _ => Err(unsupported()),
        }
    }

    fn extract(&self, session: &mut Session) -> std::io::Result<()> {
        let force_direct = session.kind.map(|k| k.is_wav()).unwrap_or(false);
        match session.require_metadata()? {
            FormatMetadata::Bmp(i) => {
                extract_plane(session, i.header_size, i.data_size, force_direct)
            }
            FormatMetadata::Wav(i) => {
                extract_plane(session, i.header_size, i.data_size, force_direct)
            }
            FormatMetadata::Mp3(i) => extract_mp3(session, i),
            _ => Err(unsupported()),
        }
    }
}

/// Whether this payload/host pair takes the streaming route.
fn is_direct(payload_len: u32, data_size: u32, force_direct: bool) -> bool {
    force_direct || payload_len > LARGE_FILE_THRESHOLD || data_size > LARGE_FILE_THRESHOLD
}

fn insert_plane(
    session: &mut Session,
    header_size: u32,
    data_size: u32,
    force_direct: bool,
) -> std::io::Result<()> {
    let len = session.payload_len;
    let method = session.method;
    let name = session.payload_name.clone().unwrap_or_default();
    let direct = is_direct(len, data_size, force_direct);
    let io = session.insert_io()?;

    io.host.seek(SeekFrom::Start(0))?;
    io.payload.seek(SeekFrom::Start(0))?;
    copy_bytes(io.host, io.result, header_size as u64)?;

    if direct {
        let mut keystream = Keystream::new(io.password);
        for _ in 0..len {
            let masked = keystream.mask(io.payload.read_u8()?);
            for pair in split_pairs(masked)? {
                let host_byte = io.host.read_u8()?;
                io.result.write_u8((host_byte & HOST_MASK) | pair)?;
            }
        }
        copy_bytes(io.host, io.result, data_size as u64 - len as u64 * 4)?;
    } else {
        let mut plane = vec![0u8; data_size as usize];
        io.host.read_exact(&mut plane)?;
        let mut payload = vec![0u8; len as usize];
        io.payload.read_exact(&mut payload)?;

        let mut draw = UnitDraw::new(io.password, data_size);
        for byte in payload {
            for pair in split_pairs(byte)? {
                let slot = draw.next_unit() as usize;
                plane[slot] = (plane[slot] & HOST_MASK) | pair;
            }
        }
        io.result.write_all(&plane)?;
    }

    write_trailer(io.result, method, AlgoKind::Lsb, len, &name, io.password)
}

fn extract_plane(
    session: &mut Session,
    header_size: u32,
    data_size: u32,
    force_direct: bool,
) -> std::io::Result<()> {
    let len = session.payload_len;
    let direct = is_direct(len, data_size, force_direct);
    let io = session.extract_io()?;

    io.host.seek(SeekFrom::Start(header_size as u64))?;

    if direct {
        let mut keystream = Keystream::new(io.password);
        for _ in 0..len {
            let mut pairs = [0u8; 4];
            for pair in pairs.iter_mut() {
                *pair = io.host.read_u8()? & PAIR_MASK;
            }
            io.result.write_u8(keystream.mask(join_pairs(pairs)?))?;
        }
    } else {
        let mut plane = vec![0u8; data_size as usize];
        io.host.read_exact(&mut plane)?;

        let mut draw = UnitDraw::new(io.password, data_size);
        let mut out = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let mut pairs = [0u8; 4];
            for pair in pairs.iter_mut() {
                *pair = plane[draw.next_unit() as usize] & PAIR_MASK;
            }
            out.push(join_pairs(pairs)?);
        }
        io.result.write_all(&out)?;
    }
    Ok(())
}

fn insert_mp3(session: &mut Session, info: Mp3Info) -> std::io::Result<()> {
    let len = session.payload_len;
    let method = session.method;
    let name = session.payload_name.clone().unwrap_or_default();
    let io = session.insert_io()?;

    io.host.seek(SeekFrom::Start(0))?;
    io.payload.seek(SeekFrom::Start(0))?;
    // ID3v2 header travels unmodified.
    copy_bytes(io.host, io.result, info.first_frame)?;

    let mut keystream = Keystream::new(io.password);
    let mut current = 0u8;
    let mut bits_left = 0u8;
    let mut payload_done = false;
    let mut trailing_hdr = None;

    loop {
        let mut hdr = match io.host.read_u32::<BigEndian>() {
            Ok(h) => h,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };
        if !mp3::is_frame_header(hdr) {
            trailing_hdr = Some(hdr);
            break;
        }

        for slot in 0..HEADER_BITS {
            if bits_left == 0 && !payload_done {
                match io.payload.read_u8() {
                    Ok(b) => {
                        current = keystream.mask(b);
                        bits_left = 8;
                    }
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => payload_done = true,
                    Err(e) => return Err(e),
                }
            }
            if bits_left == 0 {
                break;
            }
            hdr = (hdr & BIT_MASKS[slot]) | (((current & 1) as u32) << BIT_SHIFTS[slot]);
            current >>= 1;
            bits_left -= 1;
        }

        io.result.write_u32::<BigEndian>(hdr)?;
        let frame_len =
            mp3::frame_len(hdr).ok_or_else(|| invalid("MPEG header with reserved fields"))?;
        copy_bytes(io.host, io.result, frame_len - 4)?;
    }

    if bits_left > 0 {
        return Err(invalid("payload exceeds the MP3 header bit capacity"));
    }
    let mut probe = [0u8; 1];
    if !payload_done && io.payload.read(&mut probe)? != 0 {
        return Err(invalid("payload exceeds the MP3 header bit capacity"));
    }

    // An ID3v1 trailer travels unmodified; anything else past the frames is
    // not part of the audio file and is dropped.
    if let Some(hdr) = trailing_hdr {
        if mp3::is_id3v1_header(hdr) {
            io.result.write_u32::<BigEndian>(hdr)?;
            copy_bytes(io.host, io.result, mp3::ID3V1_TAG_LEN - 4)?;
        }
    }

    write_trailer(io.result, method, AlgoKind::Lsb, len, &name, io.password)
}

fn extract_mp3(session: &mut Session, info: Mp3Info) -> std::io::Result<()> {
    let len = session.payload_len;
    let io = session.extract_io()?;

    io.host.seek(SeekFrom::Start(info.first_frame))?;

    let mut keystream = Keystream::new(io.password);
    let mut current = 0u8;
    let mut have = 0u8;
    let mut written = 0u32;

    'frames: while written < len {
        let hdr = io.host.read_u32::<BigEndian>()?;
        if !mp3::is_frame_header(hdr) {
            return Err(invalid("MP3 stream ended before the payload was recovered"));
        }
        for slot in 0..HEADER_BITS {
            let bit = ((hdr & !BIT_MASKS[slot]) >> BIT_SHIFTS[slot]) as u8;
            current |= bit << have;
            have += 1;
            if have == 8 {
                io.result.write_u8(keystream.mask(current))?;
                written += 1;
                current = 0;
                have = 0;
                if written == len {
                    break 'frames;
                }
            }
        }
        let frame_len =
            mp3::frame_len(hdr).ok_or_else(|| invalid("MPEG header with reserved fields"))?;
        io.host.seek(SeekFrom::Current(frame_len as i64 - 4))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_split_most_significant_first() {
        assert_eq!(split_pairs(0b11_01_00_10).unwrap(), [0b11, 0b01, 0b00, 0b10]);
    }

    #[test]
    fn pairs_roundtrip() {
        for byte in [0u8, 1, 0x5A, 0xC3, 0xFF] {
            assert_eq!(join_pairs(split_pairs(byte).unwrap()).unwrap(), byte);
        }
    }

    #[test]
    fn routing_threshold() {
        assert!(!is_direct(10, 1000, false));
        assert!(is_direct(10, 1000, true));
        assert!(is_direct(LARGE_FILE_THRESHOLD + 1, 1000, false));
        assert!(is_direct(10, LARGE_FILE_THRESHOLD + 1, false));
    }
}
