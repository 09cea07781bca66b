//! # Stowaway Core
//!
//! Hides an arbitrary payload file inside a host media container (BMP, WAV,
//! PNG, FLV, MP3, AVI) and recovers it later, without the host looking
//! modified to casual inspection. A trailer signature embedded alongside the
//! payload lets extraction self-configure: the receiving side only needs the
//! stego file and, if one was set, the password.
//!
//! Supported embeddings:
//! - **LSB**: low-bit substitution in BMP pixels, WAV samples and MP3
//!   frame-header bits
//! - **EOC**: growing FLV video tags to smuggle payload shares
//! - **EOF**: appending past the recognized end of the media
//! - **Metadata**: BMP header gap and PNG `tEXt` chunks
//! - **Junk chunk**: a trailing `JUNK` chunk on AVI files
//!
//! The password keys a deterministic scrambler that decides *where* bits go
//! and *masks* their values. This is obfuscation, not cryptography: the
//! keystream is a reproducible pseudo random sequence and will not resist a
//! motivated cryptanalyst.
//!
//! ## Hide a file inside an image
//!
//! ```no_run
//! stowaway_core::api::hide::prepare()
//!     .with_file("secret-report.pdf")
//!     .with_host("holiday.bmp")
//!     .with_password("SuperSecret42")
//!     .with_output("holiday-out.bmp")
//!     .execute()
//!     .expect("Failed to hide file in image");
//! ```
//!
//! ## Unveil it again
//!
//! ```no_run
//! stowaway_core::api::unveil::prepare()
//!     .from_secret_file("holiday-out.bmp")
//!     .with_password("SuperSecret42")
//!     .into_output_folder("/tmp")
//!     .execute()
//!     .expect("Failed to unveil file from image");
//! ```
//!
//! ## Session surface
//!
//! The [`Session`] type exposes the full workflow for callers that want to
//! pick the algorithm themselves:
//!
//! ```no_run
//! use stowaway_core::{AlgoKind, Session};
//!
//! let mut session = Session::insert_into("movie.flv")
//!     .payload_file("notes.txt")
//!     .result_file("movie-out.flv")
//!     .password("pw")
//!     .open()?;
//! session.check_compatibility()?;
//! let offered = session.suggest_algorithms()?;
//! assert!(offered.offers(AlgoKind::Eoc));
//! session.choose_algorithm(AlgoKind::Eoc)?;
//! session.insert()?;
//! # Ok::<(), stowaway_core::StowawayError>(())
//! ```

pub mod algo;
pub mod api;
pub mod error;
pub mod media;
pub mod result;
pub mod scramble;
pub mod session;
pub mod signature;
pub mod stream;

pub use algo::{AlgoKind, EligibilitySet, LARGE_FILE_THRESHOLD};
pub use error::StowawayError;
pub use media::{FormatKind, FormatMetadata};
pub use result::Result;
pub use session::{Mode, Session, SessionBuilder};
pub use signature::PasswordMethod;
pub use stream::MediaStream;

#[cfg(test)]
mod e2e_tests {
    use super::*;
    use crate::media::test_fixtures::{
        avi_host, bmp_host, flv_host, mp3_host, png_host, wav_host,
    };
    use std::io::{Cursor, Read, Seek, SeekFrom};

    fn mem(bytes: Vec<u8>) -> MediaStream {
        MediaStream::new(Cursor::new(bytes))
    }

    fn drain(mut stream: MediaStream) -> Vec<u8> {
        let mut bytes = Vec::new();
        stream.seek(SeekFrom::Start(0)).unwrap();
        stream.read_to_end(&mut bytes).unwrap();
        bytes
    }

    fn hide(host: Vec<u8>, payload: &[u8], password: Option<&str>, algo: AlgoKind) -> Vec<u8> {
        let mut builder = Session::builder(Mode::Insert)
            .host_stream(mem(host))
            .payload_stream("secret.bin", mem(payload.to_vec()))
            .result_stream(mem(Vec::new()));
        if let Some(pw) = password {
            builder = builder.password(pw);
        }
        let mut session = builder.open().unwrap();
        session.check_compatibility().unwrap();
        let offered = session.suggest_algorithms().unwrap();
        assert!(offered.offers(algo), "{algo:?} not offered");
        session.choose_algorithm(algo).unwrap();
        session.insert().unwrap();
        drain(session.take_result().unwrap())
    }

    fn unveil(stego: Vec<u8>, password: Option<&str>, expected_algo: AlgoKind) -> Vec<u8> {
        let mut builder = Session::builder(Mode::Extract)
            .host_stream(mem(stego))
            .result_stream(mem(Vec::new()));
        if let Some(pw) = password {
            builder = builder.password(pw);
        }
        let mut session = builder.open().unwrap();
        session.check_compatibility().unwrap();
        session.detect_algorithm().unwrap();
        assert_eq!(session.algorithm(), Some(expected_algo));
        assert_eq!(session.payload_name(), Some("secret.bin"));
        session.extract().unwrap();
        drain(session.take_result().unwrap())
    }

    fn roundtrip(host: Vec<u8>, payload: &[u8], password: Option<&str>, algo: AlgoKind) {
        let stego = hide(host, payload, password, algo);
        let recovered = unveil(stego, password, algo);
        assert_eq!(recovered, payload, "{algo:?} did not round-trip");
    }

    #[test]
    fn lsb_roundtrips_in_a_small_bmp() {
        roundtrip(bmp_host(16, 16), b"0123456789", Some("pw"), AlgoKind::Lsb);
    }

    #[test]
    fn lsb_roundtrips_in_a_wav() {
        roundtrip(
            wav_host(4096),
            b"a wav payload, embedded in sample order",
            Some("hunter2"),
            AlgoKind::Lsb,
        );
    }

    #[test]
    fn lsb_roundtrips_in_an_mp3() {
        roundtrip(mp3_host(120, false), &[0xA5; 40], Some("pw"), AlgoKind::Lsb);
    }

    #[test]
    fn lsb_roundtrips_in_an_mp3_with_id3v1_trailer() {
        roundtrip(mp3_host(80, true), b"under the tag", Some("pw"), AlgoKind::Lsb);
    }

    #[test]
    fn eoc_roundtrips_in_an_flv() {
        let host = flv_host(&[(18, 16), (9, 32), (8, 10), (9, 20), (9, 44)]);
        roundtrip(host, b"spread across three video tags", Some("pw"), AlgoKind::Eoc);
    }

    #[test]
    fn eof_roundtrips_in_a_png() {
        roundtrip(png_host(256), b"appended payload", Some("pw"), AlgoKind::Eof);
    }

    #[test]
    fn eof_roundtrips_without_a_password() {
        // The generated password travels in the trailer.
        roundtrip(png_host(128), b"no password given", None, AlgoKind::Eof);
    }

    #[test]
    fn metadata_roundtrips_in_a_bmp() {
        roundtrip(bmp_host(12, 12), b"between header and pixels", Some("pw"), AlgoKind::Metadata);
    }

    #[test]
    fn metadata_roundtrips_in_a_png() {
        roundtrip(png_host(300), b"inside tEXt chunks", Some("pw"), AlgoKind::Metadata);
    }

    #[test]
    fn junk_chunk_roundtrips_in_an_avi() {
        roundtrip(avi_host(2048), b"after the riff body", Some("pw"), AlgoKind::JunkChunk);
    }

    #[test]
    fn payload_sizes_at_the_capacity_edges_roundtrip() {
        // 16x16 at 24 bit: capacity = 24*256/8/4 = 192 bytes.
        let capacity = 192u32;
        for len in [1, capacity / 2, capacity - 1, capacity] {
            let payload: Vec<u8> = (0..len).map(|i| (i * 13) as u8).collect();
            roundtrip(bmp_host(16, 16), &payload, Some("pw"), AlgoKind::Lsb);
        }
    }

    #[test]
    fn payload_just_over_capacity_is_not_offered() {
        let payload = vec![0u8; 193];
        let mut session = Session::builder(Mode::Insert)
            .host_stream(mem(bmp_host(16, 16)))
            .payload_stream("big.bin", mem(payload))
            .result_stream(mem(Vec::new()))
            .password("pw")
            .open()
            .unwrap();
        session.check_compatibility().unwrap();
        let offered = session.suggest_algorithms().unwrap();
        assert!(!offered.offers(AlgoKind::Lsb));
    }

    #[test]
    fn wrong_password_recovers_garbage_not_payload() {
        let payload = b"only the right password restores this";
        let stego = hide(png_host(256), payload, Some("right"), AlgoKind::Eof);
        let garbled = unveil(stego, Some("wrong"), AlgoKind::Eof);
        assert_eq!(garbled.len(), payload.len());
        assert_ne!(garbled, payload);
    }

    #[test]
    fn stego_host_still_detects_as_its_format() {
        let stego = hide(bmp_host(16, 16), b"payload", Some("pw"), AlgoKind::Lsb);
        let mut cursor = Cursor::new(stego);
        assert_eq!(
            media::detect(&mut cursor).unwrap(),
            Some(FormatKind::BmpUncompressed)
        );
    }
}
