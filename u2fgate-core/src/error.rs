use thiserror::Error;

use crate::verifier::VerifierFailure;

/// The verification step during which a fatal verifier fault surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Registration,
    Authentication,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registration => write!(f, "registration"),
            Self::Authentication => write!(f, "authentication"),
        }
    }
}

#[derive(Error, Debug)]
pub enum U2fError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The crypto verifier reported a failure this engine does not recognize
    /// for the given operation. The verifier's contract has drifted; callers
    /// must treat this as fatal.
    #[error("The U2F verifier reported a failure that should not occur during {operation}: {failure}")]
    UnexpectedVerifierFailure {
        operation: Operation,
        failure: VerifierFailure,
    },

    #[error("Challenge generation failed: {0}")]
    ChallengeGeneration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "openssl")]
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

pub type Result<T> = std::result::Result<T, U2fError>;
