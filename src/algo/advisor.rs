//! Capacity advisor.
//!
//! Decides, per algorithm, whether the current host can carry the current
//! payload, using closed-form capacity predicates over the inspected host
//! structure. Runs in insert mode only.

use log::{debug, error};

use crate::algo::{AlgoKind, EligibilitySet};
use crate::error::StowawayError;
use crate::media::{self, FormatKind, FormatMetadata};
use crate::result::Result;
use crate::scramble::generate_password;
use crate::session::{Mode, Session};
use crate::signature::PasswordMethod;
use crate::stream::stream_len;

/// BMP metadata embedding writes the payload length into a 4 byte offset
/// field; payload plus twice the header must stay below this ceiling.
const BMP_METADATA_MAX: u64 = 0xFFFF_FFFF;
/// Modifiable bits per MP3 frame header.
const MP3_BITS_PER_FRAME: u64 = 3;

fn can_use_lsb(kind: FormatKind, meta: &FormatMetadata, payload_len: u32) -> bool {
    let payload_bits = payload_len as u64 * 8;
    match (kind, meta) {
        // Palette-indexed bitmaps (8 bits or fewer) carry a color table the
        // substitution would corrupt.
        (FormatKind::BmpUncompressed, FormatMetadata::Bmp(i)) if i.bit_depth > 8 => {
            let capacity = (i.bit_depth as u64 * i.pixel_count as u64) / 8 / 4;
            payload_bits <= capacity
        }
        (FormatKind::WavPcm, FormatMetadata::Wav(i)) if i.bits_per_sample >= 8 => {
            let capacity = (i.data_size as u64 / (i.bits_per_sample as u64 / 8)) * 2;
            payload_bits <= capacity
        }
        (FormatKind::Mp3, FormatMetadata::Mp3(i)) => {
            i.frame_count * MP3_BITS_PER_FRAME >= payload_bits
        }
        _ => false,
    }
}

fn can_use_eof(kind: FormatKind) -> bool {
    !kind.is_avi()
}

fn can_use_metadata(kind: FormatKind, meta: &FormatMetadata, payload_len: u32) -> bool {
    match (kind, meta) {
        (k, FormatMetadata::Bmp(i)) if k.is_bmp() => {
            payload_len as u64 + 2 * i.header_size as u64 <= BMP_METADATA_MAX
        }
        (FormatKind::Png, _) => true,
        _ => false,
    }
}

fn can_use_eoc(kind: FormatKind, meta: &FormatMetadata) -> bool {
    matches!(
        (kind, meta),
        (FormatKind::Flv, FormatMetadata::Flv(i)) if i.video_tags > 0
    )
}

fn can_use_junk_chunk(kind: FormatKind) -> bool {
    kind.is_avi()
}

/// Size the payload, inspect the host and compute the eligibility flags.
pub fn suggest(session: &mut Session) -> Result<EligibilitySet> {
    if session.mode != Mode::Insert {
        return Err(StowawayError::SuggestionFailure);
    }
    let kind = session.kind.ok_or(StowawayError::SuggestionFailure)?;
    let meta = media::inspect(&mut session.host, kind, true).map_err(|e| {
        error!("host inspection failed: {e}");
        StowawayError::SuggestionFailure
    })?;
    session.metadata = Some(meta);

    let payload = session
        .payload
        .as_mut()
        .ok_or(StowawayError::SuggestionFailure)?;
    let payload_size = stream_len(payload).map_err(|e| {
        error!("payload sizing failed: {e}");
        StowawayError::SuggestionFailure
    })?;
    if payload_size == 0 {
        return Err(StowawayError::PayloadEmpty);
    }
    if payload_size >= u32::MAX as u64 {
        return Err(StowawayError::PayloadTooLarge);
    }
    session.payload_len = payload_size as u32;

    let mut set = EligibilitySet::default();
    set.set(AlgoKind::Lsb, can_use_lsb(kind, &meta, session.payload_len));
    set.set(AlgoKind::Eof, can_use_eof(kind));
    set.set(
        AlgoKind::Metadata,
        can_use_metadata(kind, &meta, session.payload_len),
    );
    set.set(AlgoKind::Eoc, can_use_eoc(kind, &meta));
    set.set(AlgoKind::JunkChunk, can_use_junk_chunk(kind));
    debug!(
        "offering {:?} for {kind:?} host and {} payload bytes",
        set.iter().collect::<Vec<_>>(),
        session.payload_len
    );

    session.eligibility = Some(set);
    Ok(set)
}

/// Record the chosen algorithm, provided the advisor offered it. Sessions
/// opened without a password get a generated one here.
pub fn choose(session: &mut Session, algo: AlgoKind) -> Result<()> {
    if session.mode != Mode::Insert {
        return Err(StowawayError::SuggestionFailure);
    }
    if session.method == PasswordMethod::Generated && session.password.is_empty() {
        session.password = generate_password().into_bytes();
    }
    let set = session.eligibility.ok_or(StowawayError::SuggestionFailure)?;
    if !set.offers(algo) {
        return Err(StowawayError::AlgorithmNotOffered);
    }
    session.algorithm = Some(algo);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{BmpInfo, FlvInfo, Mp3Info, WavInfo};

    fn bmp_meta(bit_depth: u16, pixel_count: u32) -> FormatMetadata {
        FormatMetadata::Bmp(BmpInfo {
            header_size: 54,
            data_size: pixel_count * 3,
            bit_depth,
            pixel_count,
        })
    }

    #[test]
    fn lsb_on_bmp_respects_bit_capacity() {
        let meta = bmp_meta(24, 1024);
        // capacity = 24 * 1024 / 8 / 4 = 768 bits = 96 bytes
        assert!(can_use_lsb(FormatKind::BmpUncompressed, &meta, 96));
        assert!(!can_use_lsb(FormatKind::BmpUncompressed, &meta, 97));
    }

    #[test]
    fn lsb_rejects_palette_bmp() {
        let meta = bmp_meta(8, 1 << 20);
        assert!(!can_use_lsb(FormatKind::BmpUncompressed, &meta, 1));
    }

    #[test]
    fn lsb_capacity_is_monotonic() {
        let meta = bmp_meta(24, 4096);
        // capacity = 24 * 4096 / 8 / 4 = 3072 bits = 384 bytes
        let limit = (1..=1000)
            .take_while(|&len| can_use_lsb(FormatKind::BmpUncompressed, &meta, len))
            .last()
            .unwrap();
        assert_eq!(limit, 384);
        assert!((1..=limit).all(|len| can_use_lsb(FormatKind::BmpUncompressed, &meta, len)));
        assert!(!can_use_lsb(FormatKind::BmpUncompressed, &meta, limit + 1));
    }

    #[test]
    fn lsb_on_wav_uses_two_bits_per_sample() {
        let meta = FormatMetadata::Wav(WavInfo {
            header_size: 44,
            data_size: 4000,
            bits_per_sample: 16,
        });
        // capacity = (4000 / 2) * 2 = 4000 bits = 500 bytes
        assert!(can_use_lsb(FormatKind::WavPcm, &meta, 500));
        assert!(!can_use_lsb(FormatKind::WavPcm, &meta, 501));
        assert!(!can_use_lsb(FormatKind::WavNoPcm, &meta, 1));
    }

    #[test]
    fn lsb_on_mp3_counts_three_bits_per_frame() {
        let meta = FormatMetadata::Mp3(Mp3Info {
            first_frame: 0,
            frame_count: 100,
            end_of_audio: 41700,
        });
        // capacity = 300 bits = 37.5 bytes
        assert!(can_use_lsb(FormatKind::Mp3, &meta, 37));
        assert!(!can_use_lsb(FormatKind::Mp3, &meta, 38));
    }

    #[test]
    fn eof_everywhere_but_avi() {
        assert!(can_use_eof(FormatKind::Png));
        assert!(can_use_eof(FormatKind::Flv));
        assert!(can_use_eof(FormatKind::WavNoPcm));
        assert!(!can_use_eof(FormatKind::AviUncompressed));
        assert!(!can_use_eof(FormatKind::AviCompressed));
    }

    #[test]
    fn metadata_is_bmp_and_png_only() {
        let meta = bmp_meta(24, 64);
        assert!(can_use_metadata(FormatKind::BmpUncompressed, &meta, 100));
        assert!(can_use_metadata(FormatKind::Png, &FormatMetadata::Avi, 100));
        assert!(!can_use_metadata(FormatKind::Flv, &FormatMetadata::Avi, 100));
    }

    #[test]
    fn eoc_needs_flv_with_video_tags() {
        let with_video = FormatMetadata::Flv(FlvInfo {
            video_tags: 3,
            metadata_tags: 1,
            file_size: 1000,
        });
        let without_video = FormatMetadata::Flv(FlvInfo {
            video_tags: 0,
            metadata_tags: 1,
            file_size: 1000,
        });
        assert!(can_use_eoc(FormatKind::Flv, &with_video));
        assert!(!can_use_eoc(FormatKind::Flv, &without_video));
        assert!(!can_use_eoc(FormatKind::Png, &with_video));
    }

    #[test]
    fn junk_chunk_is_avi_only() {
        assert!(can_use_junk_chunk(FormatKind::AviUncompressed));
        assert!(can_use_junk_chunk(FormatKind::AviCompressed));
        assert!(!can_use_junk_chunk(FormatKind::Flv));
    }
}
