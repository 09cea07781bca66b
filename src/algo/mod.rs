//! Embedding algorithms and the capacity advisor.

pub mod advisor;
pub mod eoc;
pub mod eof;
pub mod junk;
pub mod lsb;
pub mod metadata;

use std::io::{Read, Write};

use enum_dispatch::enum_dispatch;

pub use eoc::EocEngine;
pub use eof::EofEngine;
pub use junk::JunkChunkEngine;
pub use lsb::LsbEngine;
pub use metadata::MetadataEngine;

use crate::scramble::{descramble_payload, scramble_payload, Keystream};
use crate::session::Session;

/// Payloads above this size are transformed as a stream (keystream XOR in
/// file order); smaller ones are buffered and position-scrambled as well.
pub const LARGE_FILE_THRESHOLD: u32 = 50_000;

/// Copy `n` bytes, XORing each with the keystream.
pub(crate) fn mask_copy<R, W>(
    src: &mut R,
    dst: &mut W,
    n: u64,
    keystream: &mut Keystream,
) -> std::io::Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; 8192];
    let mut left = n;
    while left > 0 {
        let want = buf.len().min(left as usize);
        src.read_exact(&mut buf[..want])?;
        keystream.mask_in_place(&mut buf[..want]);
        dst.write_all(&buf[..want])?;
        left -= want as u64;
    }
    Ok(())
}

/// Protect `len` payload bytes on their way into the result stream: large
/// payloads are keystream-XORed in order, small ones scrambled as a whole.
pub(crate) fn write_protected_payload<R, W>(
    src: &mut R,
    dst: &mut W,
    len: u32,
    password: &[u8],
) -> std::io::Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if len > LARGE_FILE_THRESHOLD {
        mask_copy(src, dst, len as u64, &mut Keystream::new(password))
    } else {
        let mut buf = vec![0u8; len as usize];
        src.read_exact(&mut buf)?;
        dst.write_all(&scramble_payload(&buf, password))
    }
}

/// Undo [`write_protected_payload`] while copying out of the stego stream.
pub(crate) fn read_protected_payload<R, W>(
    src: &mut R,
    dst: &mut W,
    len: u32,
    password: &[u8],
) -> std::io::Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if len > LARGE_FILE_THRESHOLD {
        mask_copy(src, dst, len as u64, &mut Keystream::new(password))
    } else {
        let mut buf = vec![0u8; len as usize];
        src.read_exact(&mut buf)?;
        dst.write_all(&descramble_payload(&buf, password))
    }
}

/// Embedding algorithms, one identifier per engine.
///
/// The discriminants are part of the trailer signature wire format and must
/// not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlgoKind {
    /// Least-significant-bit substitution in pixel, sample or frame-header
    /// bits.
    Lsb = 0,
    /// Append after the end of the recognized media content.
    Eof = 1,
    /// Store inside format metadata structures (BMP header gap, PNG `tEXt`
    /// chunks).
    Metadata = 2,
    /// Grow FLV video tag payloads ("end of chunk").
    Eoc = 3,
    /// Trailing junk chunk on RIFF AVI files.
    JunkChunk = 4,
}

impl AlgoKind {
    pub const COUNT: usize = 5;
    pub const ALL: [AlgoKind; Self::COUNT] = [
        AlgoKind::Lsb,
        AlgoKind::Eof,
        AlgoKind::Metadata,
        AlgoKind::Eoc,
        AlgoKind::JunkChunk,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    pub fn as_byte(&self) -> u8 {
        *self as u8
    }
}

/// One eligibility flag per algorithm, computed by the capacity advisor for
/// the current host and payload length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilitySet {
    flags: [bool; AlgoKind::COUNT],
}

impl EligibilitySet {
    pub fn offers(&self, algo: AlgoKind) -> bool {
        self.flags[algo.as_byte() as usize]
    }

    pub(crate) fn set(&mut self, algo: AlgoKind, eligible: bool) {
        self.flags[algo.as_byte() as usize] = eligible;
    }

    /// The offered algorithms, in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = AlgoKind> + '_ {
        AlgoKind::ALL.into_iter().filter(|a| self.offers(*a))
    }

    pub fn is_empty(&self) -> bool {
        self.flags.iter().all(|f| !f)
    }
}

/// The behavior every embedding engine implements: a full insertion pass
/// producing the result stream, and its extraction inverse.
///
/// Engines report plain I/O errors; the session layer wraps them into the
/// insertion/extraction failure kinds.
#[enum_dispatch]
pub trait EmbeddingAlgorithm {
    fn insert(&self, session: &mut Session) -> std::io::Result<()>;
    fn extract(&self, session: &mut Session) -> std::io::Result<()>;
}

/// Engine dispatch, indexed by [`AlgoKind`].
#[enum_dispatch(EmbeddingAlgorithm)]
pub enum Engine {
    Lsb(LsbEngine),
    Eof(EofEngine),
    Metadata(MetadataEngine),
    Eoc(EocEngine),
    JunkChunk(JunkChunkEngine),
}

impl From<AlgoKind> for Engine {
    fn from(kind: AlgoKind) -> Self {
        match kind {
            AlgoKind::Lsb => LsbEngine.into(),
            AlgoKind::Eof => EofEngine.into(),
            AlgoKind::Metadata => MetadataEngine.into(),
            AlgoKind::Eoc => EocEngine.into(),
            AlgoKind::JunkChunk => JunkChunkEngine.into(),
        }
    }
}
