//! Session lifecycle and the public operation surface.
//!
//! One [`Session`] owns every stream involved in a single insert or extract
//! operation, from open to drop. The operations mirror the workflow:
//! [`check_compatibility`] detects the host format, [`suggest_algorithms`]
//! computes the eligible set, [`choose_algorithm`] locks one in and
//! [`insert`] runs it. On the extraction side [`detect_algorithm`] reads
//! the trailer signature and [`extract`] recovers the payload. No state is
//! shared between sessions, and a failed stage abandons the whole run; a
//! partially written result is not usable.
//!
//! [`check_compatibility`]: Session::check_compatibility
//! [`suggest_algorithms`]: Session::suggest_algorithms
//! [`choose_algorithm`]: Session::choose_algorithm
//! [`insert`]: Session::insert
//! [`detect_algorithm`]: Session::detect_algorithm
//! [`extract`]: Session::extract

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, error};

use crate::algo::{advisor, AlgoKind, EligibilitySet, EmbeddingAlgorithm, Engine};
use crate::error::StowawayError;
use crate::media::{self, FormatKind, FormatMetadata};
use crate::result::Result;
use crate::signature::{self, PasswordMethod};
use crate::stream::MediaStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Insert,
    Extract,
}

/// One insert-or-extract operation with all its streams.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("algorithm", &self.algorithm)
            .field("payload_len", &self.payload_len)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub struct Session {
    pub(crate) mode: Mode,
    pub(crate) method: PasswordMethod,
    pub(crate) password: Vec<u8>,
    pub(crate) algorithm: Option<AlgoKind>,
    pub(crate) payload_len: u32,
    pub(crate) payload_name: Option<String>,
    pub(crate) kind: Option<FormatKind>,
    pub(crate) metadata: Option<FormatMetadata>,
    pub(crate) eligibility: Option<EligibilitySet>,
    /// Position right after the trailer signature, recorded during
    /// detection; extraction engines that read payload from there use it
    /// instead of re-deriving the trailer length.
    pub(crate) trailer_end: Option<u64>,
    pub(crate) host: MediaStream,
    pub(crate) payload: Option<MediaStream>,
    pub(crate) result: Option<MediaStream>,
    output_dir: Option<PathBuf>,
}

/// Mutable stream view for an insertion pass, split so engines can drive
/// host, payload and result at the same time.
pub(crate) struct InsertIo<'a> {
    pub host: &'a mut MediaStream,
    pub payload: &'a mut MediaStream,
    pub result: &'a mut MediaStream,
    pub password: &'a [u8],
}

/// Mutable stream view for an extraction pass.
pub(crate) struct ExtractIo<'a> {
    pub host: &'a mut MediaStream,
    pub result: &'a mut MediaStream,
    pub password: &'a [u8],
}

enum Input {
    Path(PathBuf),
    Stream(MediaStream),
}

/// Builder for both session modes; entry points are [`Session::insert_into`]
/// and [`Session::extract_from`].
pub struct SessionBuilder {
    mode: Mode,
    password: Option<String>,
    host: Option<Input>,
    payload: Option<Input>,
    payload_name: Option<String>,
    result: Option<Input>,
    output_dir: Option<PathBuf>,
}

impl Session {
    /// Start configuring an insertion session for the given host media.
    pub fn insert_into(host: impl AsRef<Path>) -> SessionBuilder {
        SessionBuilder::new(Mode::Insert).host_file(host)
    }

    /// Start configuring an extraction session for the given stego media.
    pub fn extract_from(host: impl AsRef<Path>) -> SessionBuilder {
        SessionBuilder::new(Mode::Extract).host_file(host)
    }

    /// Builder without a host yet, for stream-backed sessions.
    pub fn builder(mode: Mode) -> SessionBuilder {
        SessionBuilder::new(mode)
    }
}

impl SessionBuilder {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            password: None,
            host: None,
            payload: None,
            payload_name: None,
            result: None,
            output_dir: None,
        }
    }

    pub fn host_file(mut self, path: impl AsRef<Path>) -> Self {
        self.host = Some(Input::Path(path.as_ref().to_path_buf()));
        self
    }

    pub fn host_stream(mut self, stream: MediaStream) -> Self {
        self.host = Some(Input::Stream(stream));
        self
    }

    /// File to hide; its file name becomes the payload name.
    pub fn payload_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if self.payload_name.is_none() {
            self.payload_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
        }
        self.payload = Some(Input::Path(path.to_path_buf()));
        self
    }

    pub fn payload_stream(mut self, name: impl Into<String>, stream: MediaStream) -> Self {
        self.payload_name = Some(name.into());
        self.payload = Some(Input::Stream(stream));
        self
    }

    /// Result file of an insertion.
    pub fn result_file(mut self, path: impl AsRef<Path>) -> Self {
        self.result = Some(Input::Path(path.as_ref().to_path_buf()));
        self
    }

    /// Result stream; for insertion targets and in-memory extraction.
    pub fn result_stream(mut self, stream: MediaStream) -> Self {
        self.result = Some(Input::Stream(stream));
        self
    }

    /// Directory an extraction writes the recovered file into.
    pub fn output_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Protect (or unlock) the payload with this password. Without one, a
    /// password is generated and embedded in the trailer.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn open(self) -> Result<Session> {
        let (method, password) = match self.password {
            Some(pw) if pw.is_empty() => return Err(StowawayError::InvalidPassword),
            Some(pw) => (PasswordMethod::UserSupplied, pw.into_bytes()),
            None => (PasswordMethod::Generated, Vec::new()),
        };

        let host = match self.host {
            Some(Input::Stream(s)) => s,
            Some(Input::Path(p)) => MediaStream::new(
                File::open(&p).map_err(|source| StowawayError::HostOpen { source })?,
            ),
            None => {
                return Err(StowawayError::HostOpen {
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "no host media configured",
                    ),
                })
            }
        };

        let mut payload = None;
        let mut payload_name = self.payload_name;
        let mut result = None;

        match self.mode {
            Mode::Insert => {
                payload = Some(match self.payload {
                    Some(Input::Stream(s)) => s,
                    Some(Input::Path(p)) => MediaStream::new(
                        File::open(&p).map_err(|source| StowawayError::PayloadOpen { source })?,
                    ),
                    None => {
                        return Err(StowawayError::PayloadOpen {
                            source: std::io::Error::new(
                                std::io::ErrorKind::InvalidInput,
                                "no payload configured",
                            ),
                        })
                    }
                });
                result = Some(match self.result {
                    Some(Input::Stream(s)) => s,
                    Some(Input::Path(p)) => MediaStream::new(
                        File::create(&p).map_err(|source| StowawayError::ResultOpen { source })?,
                    ),
                    None => {
                        return Err(StowawayError::ResultOpen {
                            source: std::io::Error::new(
                                std::io::ErrorKind::InvalidInput,
                                "no result target configured",
                            ),
                        })
                    }
                });
            }
            Mode::Extract => {
                payload_name = None;
                match (&self.output_dir, self.result) {
                    (Some(dir), None) => {
                        if !dir.is_dir() {
                            return Err(StowawayError::ResultNotADirectory);
                        }
                    }
                    (None, Some(Input::Stream(s))) => result = Some(s),
                    _ => return Err(StowawayError::ResultNotADirectory),
                }
            }
        }

        Ok(Session {
            mode: self.mode,
            method,
            password,
            algorithm: None,
            payload_len: 0,
            payload_name,
            kind: None,
            metadata: None,
            eligibility: None,
            trailer_end: None,
            host,
            payload,
            result,
            output_dir: self.output_dir,
        })
    }
}

impl Session {
    /// Detect the host format; every other operation needs this first.
    pub fn check_compatibility(&mut self) -> Result<FormatKind> {
        let kind = media::detect(&mut self.host)
            .map_err(|e| {
                error!("host format detection failed: {e}");
                StowawayError::CompatibilityCheck
            })?
            .ok_or(StowawayError::CompatibilityCheck)?;
        debug!("host recognized as {kind:?}");
        self.kind = Some(kind);
        Ok(kind)
    }

    /// Compute which algorithms can carry the payload in this host.
    pub fn suggest_algorithms(&mut self) -> Result<EligibilitySet> {
        advisor::suggest(self)
    }

    /// Lock in one of the offered algorithms.
    pub fn choose_algorithm(&mut self, algo: AlgoKind) -> Result<()> {
        advisor::choose(self, algo)
    }

    /// Read the trailer signature of a stego host, recovering algorithm,
    /// payload length, payload name and, for generated protection, the
    /// password.
    pub fn detect_algorithm(&mut self) -> Result<()> {
        if self.mode != Mode::Extract {
            return Err(StowawayError::DetectionFailure);
        }
        let kind = self.kind.ok_or(StowawayError::DetectionFailure)?;
        let meta = media::inspect(&mut self.host, kind, false).map_err(|e| {
            error!("stego host inspection failed: {e}");
            StowawayError::DetectionFailure
        })?;
        self.metadata = Some(meta);

        let offset = media::trailer_offset(&meta, &mut self.host)
            .map_err(|_| StowawayError::DetectionFailure)?;
        self.host
            .seek(SeekFrom::Start(offset))
            .map_err(|_| StowawayError::DetectionFailure)?;

        let supplied = (!self.password.is_empty()).then_some(self.password.as_slice());
        let trailer = signature::read_trailer(&mut self.host, supplied).map_err(|e| match e {
            StowawayError::PasswordRequired => StowawayError::PasswordRequired,
            StowawayError::PayloadEmpty => StowawayError::PayloadEmpty,
            _ => StowawayError::DetectionFailure,
        })?;

        debug!(
            "trailer: {:?} carrying {} bytes as {:?}",
            trailer.algorithm, trailer.payload_len, trailer.payload_name
        );
        self.trailer_end = Some(
            self.host
                .stream_position()
                .map_err(|_| StowawayError::DetectionFailure)?,
        );
        self.method = trailer.method;
        self.algorithm = Some(trailer.algorithm);
        self.payload_len = trailer.payload_len;
        self.payload_name = Some(trailer.payload_name);
        if let Some(pw) = trailer.embedded_password {
            self.password = pw;
        }
        Ok(())
    }

    /// Run the chosen algorithm, producing the result stream plus trailer.
    pub fn insert(&mut self) -> Result<()> {
        if self.mode != Mode::Insert {
            return Err(StowawayError::InsertionFailure);
        }
        let algo = self.algorithm.ok_or(StowawayError::InsertionFailure)?;
        Engine::from(algo).insert(self).map_err(|e| {
            error!("insertion failed: {e}");
            StowawayError::InsertionFailure
        })?;
        if let Some(result) = self.result.as_mut() {
            result
                .flush()
                .map_err(|source| StowawayError::WriteError { source })?;
        }
        Ok(())
    }

    /// Recover the hidden payload. Returns the created file path, or `None`
    /// when extracting into a caller-provided result stream.
    pub fn extract(&mut self) -> Result<Option<PathBuf>> {
        if self.mode != Mode::Extract {
            return Err(StowawayError::ExtractionFailure);
        }
        let algo = self.algorithm.ok_or(StowawayError::DetectionFailure)?;

        let mut created = None;
        if self.result.is_none() {
            let dir = self
                .output_dir
                .clone()
                .ok_or(StowawayError::ResultNotADirectory)?;
            let name = self
                .payload_name
                .clone()
                .ok_or(StowawayError::ExtractionFailure)?;
            let path = dir.join(name);
            let file =
                File::create(&path).map_err(|source| StowawayError::ResultOpen { source })?;
            self.result = Some(MediaStream::new(file));
            created = Some(path);
        }

        Engine::from(algo).extract(self).map_err(|e| {
            error!("extraction failed: {e}");
            StowawayError::ExtractionFailure
        })?;
        if let Some(result) = self.result.as_mut() {
            result
                .flush()
                .map_err(|source| StowawayError::WriteError { source })?;
        }
        Ok(created)
    }

    /// Take the result stream back out of the session, for callers that
    /// passed an in-memory target.
    pub fn take_result(&mut self) -> Option<MediaStream> {
        self.result.take()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn format_kind(&self) -> Option<FormatKind> {
        self.kind
    }

    pub fn eligibility(&self) -> Option<&EligibilitySet> {
        self.eligibility.as_ref()
    }

    pub fn algorithm(&self) -> Option<AlgoKind> {
        self.algorithm
    }

    /// Length of the payload being hidden, or recovered from the trailer.
    pub fn payload_len(&self) -> u32 {
        self.payload_len
    }

    pub fn payload_name(&self) -> Option<&str> {
        self.payload_name.as_deref()
    }

    pub(crate) fn require_metadata(&self) -> std::io::Result<FormatMetadata> {
        self.metadata.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "host structure has not been inspected",
            )
        })
    }

    pub(crate) fn require_trailer_end(&self) -> std::io::Result<u64> {
        self.trailer_end.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "trailer signature has not been read",
            )
        })
    }

    pub(crate) fn insert_io(&mut self) -> std::io::Result<InsertIo<'_>> {
        let payload = self.payload.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no payload stream")
        })?;
        let result = self.result.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no result stream")
        })?;
        Ok(InsertIo {
            host: &mut self.host,
            payload,
            result,
            password: &self.password,
        })
    }

    pub(crate) fn extract_io(&mut self) -> std::io::Result<ExtractIo<'_>> {
        let result = self.result.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no result stream")
        })?;
        Ok(ExtractIo {
            host: &mut self.host,
            result,
            password: &self.password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::test_fixtures::{bmp_host, flv_host, png_host, wav_host};
    use std::io::Cursor;

    pub(crate) fn mem(bytes: Vec<u8>) -> MediaStream {
        MediaStream::new(Cursor::new(bytes))
    }

    fn insert_session(host: Vec<u8>, payload: &[u8], password: &str) -> Session {
        Session::builder(Mode::Insert)
            .host_stream(mem(host))
            .payload_stream("payload.bin", mem(payload.to_vec()))
            .result_stream(mem(Vec::new()))
            .password(password)
            .open()
            .unwrap()
    }

    #[test]
    fn empty_password_is_rejected() {
        let err = Session::builder(Mode::Insert)
            .host_stream(mem(bmp_host(4, 4)))
            .payload_stream("p", mem(vec![1]))
            .result_stream(mem(Vec::new()))
            .password("")
            .open()
            .unwrap_err();
        assert!(matches!(err, StowawayError::InvalidPassword));
    }

    #[test]
    fn unknown_host_fails_compatibility() {
        let mut session = insert_session(b"not a media file at all".to_vec(), b"x", "pw");
        assert!(matches!(
            session.check_compatibility(),
            Err(StowawayError::CompatibilityCheck)
        ));
    }

    #[test]
    fn empty_payload_is_rejected_at_suggestion() {
        let mut session = insert_session(wav_host(64), b"", "pw");
        session.check_compatibility().unwrap();
        assert!(matches!(
            session.suggest_algorithms(),
            Err(StowawayError::PayloadEmpty)
        ));
    }

    /// Reports a 4 GiB length without holding any bytes.
    struct HugePayload;

    impl std::io::Read for HugePayload {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    impl std::io::Write for HugePayload {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for HugePayload {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            Ok(match pos {
                SeekFrom::End(_) => u32::MAX as u64,
                _ => 0,
            })
        }
    }

    #[test]
    fn payload_over_the_length_field_is_rejected() {
        let mut session = Session::builder(Mode::Insert)
            .host_stream(mem(wav_host(64)))
            .payload_stream("huge.bin", MediaStream::new(HugePayload))
            .result_stream(mem(Vec::new()))
            .password("pw")
            .open()
            .unwrap();
        session.check_compatibility().unwrap();
        assert!(matches!(
            session.suggest_algorithms(),
            Err(StowawayError::PayloadTooLarge)
        ));
    }

    #[test]
    fn unoffered_algorithm_is_rejected() {
        let mut session = insert_session(png_host(64), b"data", "pw");
        session.check_compatibility().unwrap();
        let offered = session.suggest_algorithms().unwrap();
        assert!(!offered.offers(AlgoKind::Eoc));
        assert!(matches!(
            session.choose_algorithm(AlgoKind::Eoc),
            Err(StowawayError::AlgorithmNotOffered)
        ));
    }

    #[test]
    fn suggestion_is_insert_mode_only() {
        let mut session = Session::builder(Mode::Extract)
            .host_stream(mem(png_host(64)))
            .result_stream(mem(Vec::new()))
            .password("pw")
            .open()
            .unwrap();
        session.check_compatibility().unwrap();
        assert!(matches!(
            session.suggest_algorithms(),
            Err(StowawayError::SuggestionFailure)
        ));
    }

    #[test]
    fn eligibility_follows_the_host_format() {
        let mut session = insert_session(flv_host(&[(9, 32), (9, 24)]), b"data", "pw");
        session.check_compatibility().unwrap();
        let offered = session.suggest_algorithms().unwrap();
        assert!(offered.offers(AlgoKind::Eoc));
        assert!(offered.offers(AlgoKind::Eof));
        assert!(!offered.offers(AlgoKind::Lsb));
        assert!(!offered.offers(AlgoKind::Metadata));
        assert!(!offered.offers(AlgoKind::JunkChunk));
    }

    #[test]
    fn missing_password_is_generated_at_choice() {
        let mut session = Session::builder(Mode::Insert)
            .host_stream(mem(bmp_host(64, 64)))
            .payload_stream("p.bin", mem(vec![42; 16]))
            .result_stream(mem(Vec::new()))
            .open()
            .unwrap();
        session.check_compatibility().unwrap();
        session.suggest_algorithms().unwrap();
        assert!(session.password.is_empty());
        session.choose_algorithm(AlgoKind::Lsb).unwrap();
        assert_eq!(session.password.len(), 64);
        assert_eq!(session.method, PasswordMethod::Generated);
    }
}
