use std::path::{Path, PathBuf};

use crate::algo::AlgoKind;
use crate::error::StowawayError;
use crate::result::Result;
use crate::session::Session;

pub fn prepare() -> HideApi {
    HideApi::default()
}

/// Builder that hides one file inside a host media file.
#[derive(Default, Debug)]
pub struct HideApi {
    payload: Option<PathBuf>,
    host: Option<PathBuf>,
    output: Option<PathBuf>,
    password: Option<String>,
    algorithm: Option<AlgoKind>,
}

impl HideApi {
    /// The file that is going to be hidden.
    pub fn with_file<A: AsRef<Path>>(mut self, payload: A) -> Self {
        self.payload = Some(payload.as_ref().to_path_buf());
        self
    }

    /// The host media file (BMP, WAV, PNG, FLV, MP3 or AVI).
    pub fn with_host<A: AsRef<Path>>(mut self, host: A) -> Self {
        self.host = Some(host.as_ref().to_path_buf());
        self
    }

    /// Where the stego result is written.
    pub fn with_output<A: AsRef<Path>>(mut self, output: A) -> Self {
        self.output = Some(output.as_ref().to_path_buf());
        self
    }

    /// Protect the payload with a password.
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Set the password, or keep the generated one when `None` is passed.
    pub fn use_password<S: AsRef<str>>(mut self, password: Option<S>) -> Self {
        self.password = password.map(|s| s.as_ref().to_string());
        self
    }

    /// Force a specific algorithm instead of the first offered one.
    pub fn with_algorithm(mut self, algorithm: AlgoKind) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Returns the algorithm that embedded the payload.
    pub fn execute(self) -> Result<AlgoKind> {
        let host = self.host.ok_or(StowawayError::HostOpen {
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no host configured"),
        })?;
        let payload = self.payload.ok_or(StowawayError::PayloadOpen {
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no payload configured"),
        })?;
        let output = self.output.ok_or(StowawayError::ResultOpen {
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no output configured"),
        })?;

        let mut builder = Session::insert_into(host)
            .payload_file(payload)
            .result_file(output);
        if let Some(pw) = self.password {
            builder = builder.password(pw);
        }
        let mut session = builder.open()?;

        session.check_compatibility()?;
        let offered = session.suggest_algorithms()?;
        let algorithm = match self.algorithm {
            Some(a) => a,
            None => offered
                .iter()
                .next()
                .ok_or(StowawayError::SuggestionFailure)?,
        };
        session.choose_algorithm(algorithm)?;
        session.insert()?;
        Ok(algorithm)
    }
}
