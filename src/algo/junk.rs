//! Junk-chunk engine for AVI hosts.
//!
//! The whole RIFF file is copied, then a bare `JUNK` fourcc, the trailer
//! signature and the protected payload follow. AVI players stop at the
//! declared RIFF size, so the appended bytes stay invisible to them.

use std::io::{Seek, SeekFrom, Write};

use crate::algo::{read_protected_payload, write_protected_payload, AlgoKind, EmbeddingAlgorithm};
use crate::media::avi;
use crate::session::Session;
use crate::signature::write_trailer;
use crate::stream::copy_bytes;

/// Fourcc opening the trailer chunk.
const JUNK_FOURCC: &[u8; 4] = b"JUNK";

pub struct JunkChunkEngine;

impl EmbeddingAlgorithm for JunkChunkEngine {
    fn insert(&self, session: &mut Session) -> std::io::Result<()> {
        let len = session.payload_len;
        let method = session.method;
        let name = session.payload_name.clone().unwrap_or_default();
        let io = session.insert_io()?;

        let riff_size = avi::riff_size(io.host)? as u64;
        io.host.seek(SeekFrom::Start(0))?;
        // The well-formed RIFF file spans its 8 byte prefix plus the
        // declared content size; anything beyond that is dropped.
        copy_bytes(io.host, io.result, riff_size + 8)?;

        io.result.write_all(JUNK_FOURCC)?;
        write_trailer(io.result, method, AlgoKind::JunkChunk, len, &name, io.password)?;

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
