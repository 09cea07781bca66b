use thiserror::Error;

#[derive(Error, Debug)]
pub enum StowawayError {
    /// Represents a failure to open the host media file.
    #[error("Host media could not be opened")]
    HostOpen { source: std::io::Error },

    /// Represents a failure to open the payload file that should be hidden.
    #[error("Payload file could not be opened")]
    PayloadOpen { source: std::io::Error },

    /// Represents a failure to create the result file during insertion.
    #[error("Result file could not be created")]
    ResultOpen { source: std::io::Error },

    /// Represents an invalid extraction target, which must be a directory.
    #[error("Extraction target is not a directory")]
    ResultNotADirectory,

    /// Represents an empty password string passed by the caller.
    #[error("Password must not be empty")]
    InvalidPassword,

    /// Represents a failure to read from one of the session streams.
    #[error("Read error")]
    ReadError { source: std::io::Error },

    /// Represents a failure to write to the result stream.
    #[error("Write error")]
    WriteError { source: std::io::Error },

    /// Represents a host media whose format is not recognized.
    #[error("Host media format is not supported")]
    CompatibilityCheck,

    /// Represents a failure while analysing the host structure or sizing the payload.
    #[error("Algorithm suggestion failed")]
    SuggestionFailure,

    /// Represents the choice of an algorithm that was not offered for this host.
    #[error("Algorithm was not offered for this host")]
    AlgorithmNotOffered,

    /// Represents a failure during the embedding pass.
    #[error("Insertion failed")]
    InsertionFailure,

    /// Represents a failure during the extraction pass.
    #[error("Extraction failed")]
    ExtractionFailure,

    /// Represents an unreadable or absent trailer signature.
    #[error("No embedded data could be detected")]
    DetectionFailure,

    /// Represents a payload larger than the 32 bit length field allows.
    #[error("Payload is too large (must be below 4 GiB)")]
    PayloadTooLarge,

    /// Represents an empty payload file, which cannot be hidden.
    #[error("Payload file is empty")]
    PayloadEmpty,

    /// Represents a trailer that requires a password the caller did not supply.
    #[error("A password is required to extract this payload")]
    PasswordRequired,

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
