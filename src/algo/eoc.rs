//! End-of-chunk engine for FLV hosts.
//!
//! Instead of substituting bits, every video tag grows: its 24-bit size
//! field, payload and trailing previous-tag-size are rewritten so the tag
//! carries one pad byte plus a share of the hidden payload after its
//! original data. The payload is split evenly across the video tags, the
//! remainder going to the last logical block, and the mapping from logical
//! block to physical tag comes from the password-keyed unit permutation, so
//! physical tag order and logical payload order need not agree.

use std::io::{ErrorKind, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::algo::{mask_copy, AlgoKind, EmbeddingAlgorithm};
use crate::media::flv::{BODY_OFFSET, TAG_REMAINDER, TAG_VIDEO};
use crate::media::FormatMetadata;
use crate::scramble::{Keystream, Permutation};
use crate::session::Session;
use crate::signature::write_trailer;
use crate::stream::copy_bytes;

/// Pad byte between a tag's original data and its payload share.
const PAD_BYTE: u8 = 28;
/// Upper bound of the 24-bit tag size field.
const TAG_SIZE_MAX: u32 = 0x00FF_FFFF;

fn invalid(msg: &str) -> std::io::Error {
    std::io::Error::new(ErrorKind::InvalidData, msg.to_string())
}

/// Which logical block each physical video tag carries: a password-shuffled
/// identity table over the video tag indices.
fn block_of_tag(password: &[u8], video_tags: u32) -> Vec<u32> {
    let identity: Vec<u32> = (0..video_tags).collect();
    Permutation::from_password(password, video_tags).shuffle(&identity)
}

/// Payload bytes carried by a logical block.
fn block_share(block: u32, video_tags: u32, payload_len: u32) -> u32 {
    let per_tag = payload_len / video_tags;
    if block == video_tags - 1 {
        per_tag + payload_len % video_tags
    } else {
        per_tag
    }
}

pub struct EocEngine;

impl EmbeddingAlgorithm for EocEngine {
    fn insert(&self, session: &mut Session) -> std::io::Result<()> {
        let meta = session.require_metadata()?;
        let flv = match meta {
            FormatMetadata::Flv(i) => i,
            _ => return Err(invalid("EOC runs on FLV hosts only")),
        };
        if flv.video_tags == 0 {
            return Err(invalid("FLV host has no video tags"));
        }

        let len = session.payload_len;
        let method = session.method;
        let name = session.payload_name.clone().unwrap_or_default();
        let io = session.insert_io()?;
        let blocks = block_of_tag(io.password, flv.video_tags);
        let per_tag = len / flv.video_tags;

        io.host.seek(SeekFrom::Start(0))?;
        copy_bytes(io.host, io.result, BODY_OFFSET)?;

        let mut videos_seen = 0u32;
        while videos_seen < flv.video_tags {
            let tag_type = io.host.read_u8()?;
            if tag_type != TAG_VIDEO {
                // Copied through untouched, size fields included.
                io.result.write_u8(tag_type)?;
                let field = io.host.read_u32::<BigEndian>()?;
                io.result.write_u32::<BigEndian>(field)?;
                let data_size = field >> 8;
                copy_bytes(io.host, io.result, data_size as u64 + TAG_REMAINDER)?;
                let prev_tag_size = io.host.read_u32::<BigEndian>()?;
                io.result.write_u32::<BigEndian>(prev_tag_size)?;
                continue;
            }

            io.result.write_u8(tag_type)?;
            // The 4-byte read grabs the size field plus the first timestamp
            // byte, which is re-emitted after the rewritten size.
            let field = io.host.read_u32::<BigEndian>()?;
            let data_size = field >> 8;
            let timestamp_byte = (field & 0xFF) as u8;

            let block = blocks[videos_seen as usize];
            let share = block_share(block, flv.video_tags, len);
            let new_size = data_size as u64 + share as u64 + 1;
            if new_size > TAG_SIZE_MAX as u64 {
                return Err(invalid("payload share overflows the 24 bit tag size"));
            }
            io.result.write_u24::<BigEndian>(new_size as u32)?;
            io.result.write_u8(timestamp_byte)?;

            // Original tag bytes: remaining header fields plus data.
            copy_bytes(io.host, io.result, data_size as u64 + TAG_REMAINDER)?;

            io.result.write_u8(PAD_BYTE)?;
            io.payload
                .seek(SeekFrom::Start(block as u64 * per_tag as u64))?;
            let mut keystream = Keystream::new(io.password);
            mask_copy(io.payload, io.result, share as u64, &mut keystream)?;

            let prev_tag_size = io.host.read_u32::<BigEndian>()?;
            let new_prev = prev_tag_size
                .checked_add(share + 1)
                .ok_or_else(|| invalid("previous tag size overflows 32 bits"))?;
            io.result.write_u32::<BigEndian>(new_prev)?;
            videos_seen += 1;
        }

        // Any tags after the last video tag travel unmodified.
        std::io::copy(io.host, io.result)?;

        write_trailer(io.result, method, AlgoKind::Eoc, len, &name, io.password)
    }

    fn extract(&self, session: &mut Session) -> std::io::Result<()> {
        let meta = session.require_metadata()?;
        let flv = match meta {
            FormatMetadata::Flv(i) => i,
            _ => return Err(invalid("EOC runs on FLV hosts only")),
        };
        if flv.video_tags == 0 {
            return Err(invalid("FLV host has no video tags"));
        }

        let len = session.payload_len;
        let io = session.extract_io()?;
        let blocks = block_of_tag(io.password, flv.video_tags);

        for block in 0..flv.video_tags {
            let physical = blocks
                .iter()
                .position(|&b| b == block)
                .ok_or_else(|| invalid("block table is not a bijection"))?
                as u32;

            // Walk from the first tag to the target video tag.
            io.host.seek(SeekFrom::Start(BODY_OFFSET))?;
            let mut videos_seen = 0u32;
            let enlarged_size = loop {
                let tag_type = io.host.read_u8()?;
                let field = io.host.read_u32::<BigEndian>()?;
                let data_size = field >> 8;
                if tag_type == TAG_VIDEO {
                    if videos_seen == physical {
                        break data_size;
                    }
                    videos_seen += 1;
                }
                io.host
                    .seek(SeekFrom::Current(data_size as i64 + TAG_REMAINDER as i64 + 4))?;
            };

            let share = block_share(block, flv.video_tags, len);
            // Skip the original tag bytes and the pad byte; the share sits
            // at the very end of the enlarged tag.
            let jump = (enlarged_size as u64)
                .checked_sub(share as u64)
                .ok_or_else(|| invalid("video tag is smaller than its payload share"))?
                + TAG_REMAINDER;
            io.host.seek(SeekFrom::Current(jump as i64))?;

            let mut keystream = Keystream::new(io.password);
            mask_copy(io.host, io.result, share as u64, &mut keystream)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_sum_to_payload_len() {
        for (tags, len) in [(1u32, 10u32), (3, 10), (7, 1), (5, 50_003)] {
            let total: u32 = (0..tags).map(|b| block_share(b, tags, len)).sum();
            assert_eq!(total, len, "tags={tags} len={len}");
        }
    }

    #[test]
    fn block_table_is_a_bijection() {
        let table = block_of_tag(b"pw", 9);
        let mut seen = vec![false; 9];
        for &b in &table {
            assert!(!seen[b as usize]);
            seen[b as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn block_table_depends_on_password() {
        assert_eq!(block_of_tag(b"pw", 32), block_of_tag(b"pw", 32));
        assert_ne!(block_of_tag(b"pw", 32), block_of_tag(b"other", 32));
    }
}
