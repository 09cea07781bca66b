//! AVI host support.
//!
//! Only detection and the RIFF size field are needed: AVI hosts carry
//! hidden data exclusively through the junk-chunk trailer.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::media::FormatKind;

/// "RIFF" read as a little endian u32.
const SIG_RIFF: u32 = 0x4646_4952;
/// "AVI " read as a little endian u32.
const SIG_AVI: u32 = 0x2049_5641;
/// Offset of the form type signature.
const OFF_AVI: u64 = 8;

pub fn detect<S: Read + Seek>(stream: &mut S) -> std::io::Result<Option<FormatKind>> {
    stream.seek(SeekFrom::Start(0))?;
    if stream.read_u32::<LittleEndian>()? != SIG_RIFF {
        return Ok(None);
    }
    stream.seek(SeekFrom::Start(OFF_AVI))?;
    if stream.read_u32::<LittleEndian>()? != SIG_AVI {
        return Ok(None);
    }
    Ok(Some(FormatKind::AviUncompressed))
}

/// Declared RIFF content size, read from the fixed offset 4.
pub fn riff_size<S: Read + Seek>(stream: &mut S) -> std::io::Result<u32> {
    stream.seek(SeekFrom::Start(4))?;
    stream.read_u32::<LittleEndian>()
}
