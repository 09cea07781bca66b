use std::path::{Path, PathBuf};

use crate::error::StowawayError;
use crate::result::Result;
use crate::session::Session;

pub fn prepare() -> UnveilApi {
    UnveilApi::default()
}

/// Builder that recovers a hidden file from a stego media file.
#[derive(Default, Debug)]
pub struct UnveilApi {
    secret_media: Option<PathBuf>,
    output_folder: Option<PathBuf>,
    password: Option<String>,
}

impl UnveilApi {
    /// The stego media file to read.
    pub fn from_secret_file<A: AsRef<Path>>(mut self, media: A) -> Self {
        self.secret_media = Some(media.as_ref().to_path_buf());
        self
    }

    /// The directory the recovered file is written into, named after the
    /// hidden file's original name.
    pub fn into_output_folder<A: AsRef<Path>>(mut self, folder: A) -> Self {
        self.output_folder = Some(folder.as_ref().to_path_buf());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn use_password<S: AsRef<str>>(mut self, password: Option<S>) -> Self {
        self.password = password.map(|s| s.as_ref().to_string());
        self
    }

    /// Returns the path of the recovered file.
    pub fn execute(self) -> Result<PathBuf> {
        let media = self.secret_media.ok_or(StowawayError::HostOpen {
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no media configured"),
        })?;
        let folder = self.output_folder.ok_or(StowawayError::ResultNotADirectory)?;

        let mut builder = Session::extract_from(media).output_dir(folder);
        if let Some(pw) = self.password {
            builder = builder.password(pw);
        }
        let mut session = builder.open()?;

        session.check_compatibility()?;
        session.detect_algorithm()?;
        session
            .extract()?
            .ok_or(StowawayError::ExtractionFailure)
    }
}
