//! End-of-file engine.
//!
//! The host is copied verbatim up to its format-defined end, then the
//! trailer signature and the protected payload are appended. Works for
//! every recognized format except AVI, whose trailer belongs to the
//! junk-chunk engine.

use std::io::{ErrorKind, Seek, SeekFrom};

use crate::algo::{read_protected_payload, write_protected_payload, AlgoKind, EmbeddingAlgorithm};
use crate::media::{self, FormatMetadata};
use crate::session::Session;
use crate::signature::write_trailer;
use crate::stream::copy_bytes;

pub struct EofEngine;

impl EmbeddingAlgorithm for EofEngine {
    fn insert(&self, session: &mut Session) -> std::io::Result<()> {
        let meta = session.require_metadata()?;
        if matches!(meta, FormatMetadata::Avi) {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "EOF is not available on AVI hosts",
            ));
        }

        let len = session.payload_len;
        let method = session.method;
        let name = session.payload_name.clone().unwrap_or_default();
        let io = session.insert_io()?;

        io.host.seek(SeekFrom::Start(0))?;
        match meta {
            FormatMetadata::Flv(_) => {
                std::io::copy(io.host, io.result)?;
            }
            _ => {
                // Copy only the recognized media span; stray trailing bytes
                // in the host would shadow the signature.
                let end = media::trailer_offset(&meta, io.host)?;
                io.host.seek(SeekFrom::Start(0))?;
                copy_bytes(io.host, io.result, end)?;
            }
        }

        write_trailer(io.result, method, AlgoKind::Eof, len, &name, io.password)?;

        io.payload.seek(SeekFrom::Start(0))?;
        write_protected_payload(io.payload, io.result, len, io.password)
    }

    fn extract(&self, session: &mut Session) -> std::io::Result<()> {
        let len = session.payload_len;
        // The payload sits directly behind the trailer signature.
        let start = session.require_trailer_end()?;
        let io = session.extract_io()?;

        io.host.seek(SeekFrom::Start(start))?;
        read_protected_payload(io.host, io.result, len, io.password)
    }
}
