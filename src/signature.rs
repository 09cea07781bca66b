//! The trailer signature.
//!
//! Every insertion appends (or embeds at the format-defined end offset) a
//! small trailer that lets extraction self-configure: which algorithm ran,
//! how many payload bytes are hidden and under which name. When the library
//! generated the password itself, the password travels in the trailer too.
//!
//! Wire layout: `[method u8][algorithm u8][payload length u32 LE]
//! [name length u8][name XOR cycled password][password, generated only]`.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::algo::AlgoKind;
use crate::error::StowawayError;
use crate::result::Result;
use crate::scramble::GENERATED_PASSWORD_LEN;

/// Longest payload name the trailer can carry.
pub const NAME_LEN_MAX: usize = 255;

/// How the session password came to be. Part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMethod {
    /// The library generated a password and embeds it in the trailer.
    Generated,
    /// The caller supplied the password; extraction must be given it again.
    UserSupplied,
}

impl PasswordMethod {
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Generated => 0,
            Self::UserSupplied => 1,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Generated),
            1 => Some(Self::UserSupplied),
            _ => None,
        }
    }
}

/// A decoded trailer.
#[derive(Debug, PartialEq, Eq)]
pub struct Trailer {
    pub method: PasswordMethod,
    pub algorithm: AlgoKind,
    pub payload_len: u32,
    pub payload_name: String,
    /// Present only for [`PasswordMethod::Generated`].
    pub embedded_password: Option<Vec<u8>>,
}

fn xor_with_password(name: &mut [u8], password: &[u8]) {
    if password.is_empty() {
        return;
    }
    for (i, b) in name.iter_mut().enumerate() {
        *b ^= password[i % password.len()];
    }
}

/// Serialize a trailer at the current position of `dst`.
pub fn write_trailer(
    dst: &mut dyn Write,
    method: PasswordMethod,
    algorithm: AlgoKind,
    payload_len: u32,
    payload_name: &str,
    password: &[u8],
) -> std::io::Result<()> {
    dst.write_u8(method.as_byte())?;
    dst.write_u8(algorithm.as_byte())?;
    dst.write_u32::<LittleEndian>(payload_len)?;

    let mut name = payload_name.as_bytes().to_vec();
    name.truncate(NAME_LEN_MAX);
    dst.write_u8(name.len() as u8)?;
    xor_with_password(&mut name, password);
    dst.write_all(&name)?;

    if method == PasswordMethod::Generated {
        debug_assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        dst.write_all(password)?;
    }
    Ok(())
}

fn read_err(source: std::io::Error) -> StowawayError {
    StowawayError::ReadError { source }
}

/// Decode a trailer at the current position of `src`.
///
/// `supplied_password` is the password the extracting caller typed, if any;
/// it is required to decode the name of user-protected payloads.
pub fn read_trailer(src: &mut dyn Read, supplied_password: Option<&[u8]>) -> Result<Trailer> {
    let method = PasswordMethod::from_byte(src.read_u8().map_err(read_err)?)
        .ok_or(StowawayError::DetectionFailure)?;
    let algorithm = AlgoKind::from_byte(src.read_u8().map_err(read_err)?)
        .ok_or(StowawayError::DetectionFailure)?;

    if method == PasswordMethod::UserSupplied && supplied_password.is_none() {
        return Err(StowawayError::PasswordRequired);
    }

    let payload_len = src.read_u32::<LittleEndian>().map_err(read_err)?;
    if payload_len == 0 {
        return Err(StowawayError::PayloadEmpty);
    }

    let name_len = src.read_u8().map_err(read_err)? as usize;
    let mut name = vec![0u8; name_len];
    src.read_exact(&mut name).map_err(read_err)?;

    let embedded_password = if method == PasswordMethod::Generated {
        let mut pw = vec![0u8; GENERATED_PASSWORD_LEN];
        src.read_exact(&mut pw).map_err(read_err)?;
        Some(pw)
    } else {
        None
    };

    let password = embedded_password
        .as_deref()
        .or(supplied_password)
        .ok_or(StowawayError::DetectionFailure)?;
    xor_with_password(&mut name, password);

    Ok(Trailer {
        method,
        algorithm,
        payload_len,
        payload_name: String::from_utf8_lossy(&name).into_owned(),
        embedded_password,
    })
}

/// Number of bytes a trailer with this name occupies, for seeking past it.
pub fn trailer_len(payload_name: &str, method: PasswordMethod) -> u64 {
    let name_len = payload_name.len().min(NAME_LEN_MAX) as u64;
    let password_len = match method {
        PasswordMethod::Generated => GENERATED_PASSWORD_LEN as u64,
        PasswordMethod::UserSupplied => 0,
    };
    2 + 4 + 1 + name_len + password_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrips_user_password_trailer() {
        let mut buf = Vec::new();
        write_trailer(
            &mut buf,
            PasswordMethod::UserSupplied,
            AlgoKind::Eoc,
            1234,
            "secret.tar.gz",
            b"hunter2",
        )
        .unwrap();
        assert_eq!(buf.len() as u64, trailer_len("secret.tar.gz", PasswordMethod::UserSupplied));

        let trailer = read_trailer(&mut Cursor::new(&buf), Some(b"hunter2")).unwrap();
        assert_eq!(trailer.algorithm, AlgoKind::Eoc);
        assert_eq!(trailer.payload_len, 1234);
        assert_eq!(trailer.payload_name, "secret.tar.gz");
        assert_eq!(trailer.embedded_password, None);
    }

    #[test]
    fn roundtrips_generated_password_trailer() {
        let password = vec![b'p'; GENERATED_PASSWORD_LEN];
        let mut buf = Vec::new();
        write_trailer(
            &mut buf,
            PasswordMethod::Generated,
            AlgoKind::Lsb,
            7,
            "note.txt",
            &password,
        )
        .unwrap();

        // No password supplied: the embedded one decodes the name.
        let trailer = read_trailer(&mut Cursor::new(&buf), None).unwrap();
        assert_eq!(trailer.payload_name, "note.txt");
        assert_eq!(trailer.embedded_password.as_deref(), Some(&password[..]));
    }

    #[test]
    fn user_protected_trailer_requires_password() {
        let mut buf = Vec::new();
        write_trailer(
            &mut buf,
            PasswordMethod::UserSupplied,
            AlgoKind::Eof,
            10,
            "x",
            b"pw",
        )
        .unwrap();
        match read_trailer(&mut Cursor::new(&buf), None) {
            Err(StowawayError::PasswordRequired) => {}
            other => panic!("expected PasswordRequired, got {other:?}"),
        }
    }

    #[test]
    fn long_names_are_capped() {
        let name = "n".repeat(400);
        let mut buf = Vec::new();
        write_trailer(
            &mut buf,
            PasswordMethod::UserSupplied,
            AlgoKind::Lsb,
            1,
            &name,
            b"pw",
        )
        .unwrap();
        let trailer = read_trailer(&mut Cursor::new(&buf), Some(b"pw")).unwrap();
        assert_eq!(trailer.payload_name.len(), NAME_LEN_MAX);
    }
}
