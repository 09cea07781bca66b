//! BMP host support.
//!
//! Field offsets follow the BITMAPFILEHEADER / BITMAPINFOHEADER layout: all
//! sizes little endian, pixel data located through the offset field at
//! byte 10.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::media::FormatKind;

/// "BM", little endian.
const SIG_BMP: u16 = 0x4D42;
/// Offset of the total file size field.
const OFF_FILE_SIZE: u64 = 2;
/// Offset of the pixel data offset field.
const OFF_PIXEL_DATA: u64 = 10;
/// Offset of the width field; height follows directly.
const OFF_DIMENSIONS: u64 = 18;
/// Offset of the bits-per-pixel field.
const OFF_BIT_DEPTH: u64 = 28;
/// Offset of the compression field.
const OFF_COMPRESSION: u64 = 30;

/// Structural facts about a BMP host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BmpInfo {
    /// Size of everything before the pixel data, in bytes.
    pub header_size: u32,
    /// Size of the pixel data region, in bytes.
    pub data_size: u32,
    /// Bits used to encode one pixel.
    pub bit_depth: u16,
    /// Number of pixels in the image.
    pub pixel_count: u32,
}

pub fn detect<S: Read + Seek>(stream: &mut S) -> std::io::Result<Option<FormatKind>> {
    stream.seek(SeekFrom::Start(0))?;
    if stream.read_u16::<LittleEndian>()? != SIG_BMP {
        return Ok(None);
    }
    stream.seek(SeekFrom::Start(OFF_COMPRESSION))?;
    let compression = stream.read_u32::<LittleEndian>()?;
    Ok(Some(if compression == 0 {
        FormatKind::BmpUncompressed
    } else {
        FormatKind::BmpCompressed
    }))
}

pub fn inspect<S: Read + Seek>(stream: &mut S) -> std::io::Result<BmpInfo> {
    stream.seek(SeekFrom::Start(OFF_FILE_SIZE))?;
    let file_size = stream.read_u32::<LittleEndian>()?;

    stream.seek(SeekFrom::Start(OFF_PIXEL_DATA))?;
    let pixel_offset = stream.read_u32::<LittleEndian>()?;

    stream.seek(SeekFrom::Start(OFF_BIT_DEPTH))?;
    let bit_depth = stream.read_u16::<LittleEndian>()?;

    stream.seek(SeekFrom::Start(OFF_DIMENSIONS))?;
    let width = stream.read_u32::<LittleEndian>()?;
    let height = stream.read_u32::<LittleEndian>()?;

    Ok(BmpInfo {
        header_size: pixel_offset,
        data_size: file_size.wrapping_sub(pixel_offset),
        bit_depth,
        pixel_count: width.wrapping_mul(height),
    })
}
