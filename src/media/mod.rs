//! Host media handling: format detection and structural inspection.
//!
//! One module per container format. Detection runs the per-format signature
//! tests in a fixed order; inspection extracts exactly the structural facts
//! the embedding algorithms need and nothing else.

pub mod avi;
pub mod bmp;
pub mod flv;
pub mod mp3;
pub mod png;
pub mod wav;

use std::io::{ErrorKind, Read, Seek};

pub use bmp::BmpInfo;
pub use flv::FlvInfo;
pub use mp3::Mp3Info;
pub use png::PngInfo;
pub use wav::WavInfo;

/// Host container formats the library recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    BmpCompressed,
    BmpUncompressed,
    WavPcm,
    WavNoPcm,
    Png,
    Mp3,
    AviCompressed,
    AviUncompressed,
    Flv,
}

impl FormatKind {
    pub fn is_bmp(&self) -> bool {
        matches!(self, Self::BmpCompressed | Self::BmpUncompressed)
    }

    pub fn is_wav(&self) -> bool {
        matches!(self, Self::WavPcm | Self::WavNoPcm)
    }

    pub fn is_avi(&self) -> bool {
        matches!(self, Self::AviCompressed | Self::AviUncompressed)
    }
}

/// Structural metadata of a host, one variant per format.
///
/// Populated once per session by [`inspect`] and only read afterwards, so an
/// engine can never touch another format's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMetadata {
    Bmp(BmpInfo),
    Wav(WavInfo),
    Png(PngInfo),
    Flv(FlvInfo),
    Mp3(Mp3Info),
    /// AVI hosts need no structural facts beyond the RIFF size field, which
    /// is re-read where needed.
    Avi,
}

impl FormatMetadata {
    pub fn bmp(&self) -> Option<&BmpInfo> {
        match self {
            Self::Bmp(i) => Some(i),
            _ => None,
        }
    }

    pub fn wav(&self) -> Option<&WavInfo> {
        match self {
            Self::Wav(i) => Some(i),
            _ => None,
        }
    }

    pub fn png(&self) -> Option<&PngInfo> {
        match self {
            Self::Png(i) => Some(i),
            _ => None,
        }
    }

    pub fn flv(&self) -> Option<&FlvInfo> {
        match self {
            Self::Flv(i) => Some(i),
            _ => None,
        }
    }

    pub fn mp3(&self) -> Option<&Mp3Info> {
        match self {
            Self::Mp3(i) => Some(i),
            _ => None,
        }
    }
}

/// Run the signature tests in fixed order until one claims the host.
///
/// A host too short for some signature simply does not match that format.
pub fn detect<S: Read + Seek>(stream: &mut S) -> std::io::Result<Option<FormatKind>> {
    let probes: [fn(&mut S) -> std::io::Result<Option<FormatKind>>; 6] = [
        bmp::detect,
        png::detect,
        wav::detect,
        mp3::detect,
        avi::detect,
        flv::detect,
    ];
    for probe in probes {
        match probe(stream) {
            Ok(Some(kind)) => return Ok(Some(kind)),
            Ok(None) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// Extract the structural metadata for an already detected format.
///
/// `reject_flv_trailing` corresponds to insertion mode, where an FLV host
/// with bytes after its last tag cannot be used.
pub fn inspect<S: Read + Seek>(
    stream: &mut S,
    kind: FormatKind,
    reject_flv_trailing: bool,
) -> std::io::Result<FormatMetadata> {
    Ok(match kind {
        FormatKind::BmpCompressed | FormatKind::BmpUncompressed => {
            FormatMetadata::Bmp(bmp::inspect(stream)?)
        }
        FormatKind::WavPcm | FormatKind::WavNoPcm => FormatMetadata::Wav(wav::inspect(stream)?),
        FormatKind::Png => FormatMetadata::Png(png::inspect(stream)?),
        FormatKind::Flv => FormatMetadata::Flv(flv::inspect(stream, reject_flv_trailing)?),
        FormatKind::Mp3 => FormatMetadata::Mp3(mp3::inspect(stream)?),
        FormatKind::AviCompressed | FormatKind::AviUncompressed => FormatMetadata::Avi,
    })
}

/// Offset at which the trailer signature of a stego file starts.
pub fn trailer_offset<S: Read + Seek>(
    meta: &FormatMetadata,
    stream: &mut S,
) -> std::io::Result<u64> {
    Ok(match meta {
        FormatMetadata::Bmp(i) => i.header_size as u64 + i.data_size as u64,
        FormatMetadata::Wav(i) => i.header_size as u64 + i.data_size as u64,
        FormatMetadata::Png(i) => i.header_size as u64 + i.data_size as u64,
        FormatMetadata::Mp3(i) => i.end_of_audio,
        FormatMetadata::Flv(i) => i.file_size as u64,
        // RIFF header, content, then the JUNK fourcc.
        FormatMetadata::Avi => avi::riff_size(stream)? as u64 + 8 + 4,
    })
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;
    use std::io::Cursor;

    #[test]
    fn detection_order_finds_each_format() {
        let cases: Vec<(Vec<u8>, FormatKind)> = vec![
            (bmp_host(4, 4), FormatKind::BmpUncompressed),
            (wav_host(32), FormatKind::WavPcm),
            (png_host(16), FormatKind::Png),
            (flv_host(&[(flv::TAG_VIDEO, 8)]), FormatKind::Flv),
            (mp3_host(1, false), FormatKind::Mp3),
            (avi_host(32), FormatKind::AviUncompressed),
        ];
        for (bytes, expected) in cases {
            let mut host = Cursor::new(bytes);
            assert_eq!(detect(&mut host).unwrap(), Some(expected));
        }
    }

    #[test]
    fn unknown_hosts_are_not_claimed() {
        let mut host = Cursor::new(b"%PDF-1.4 certainly not media".to_vec());
        assert_eq!(detect(&mut host).unwrap(), None);
    }

    #[test]
    fn tiny_hosts_are_not_claimed() {
        let mut host = Cursor::new(vec![0x42]);
        assert_eq!(detect(&mut host).unwrap(), None);
    }

    #[test]
    fn trailer_offset_is_end_of_media() {
        let bytes = png_host(24);
        let len = bytes.len() as u64;
        let mut host = Cursor::new(bytes);
        let meta = inspect(&mut host, FormatKind::Png, false).unwrap();
        assert_eq!(trailer_offset(&meta, &mut host).unwrap(), len);
    }
}
