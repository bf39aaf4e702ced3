use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovtrackError {
    #[error("Coverage source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed coverage report: {0}")]
    MalformedReport(String),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("Failed to append to change log '{}': {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize change log record: {0}")]
    Serialize(String),

    #[error("A coverage cycle is already in progress")]
    Busy,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure classes surfaced to the trigger loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SourceUnavailable,
    MalformedReport,
    WriteFailure,
    Busy,
    Other,
}

impl CovtrackError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            CovtrackError::SourceUnavailable(_) => FailureKind::SourceUnavailable,
            CovtrackError::MalformedReport(_) | CovtrackError::Xml { .. } => {
                FailureKind::MalformedReport
            }
            CovtrackError::WriteFailure { .. } | CovtrackError::Serialize(_) => {
                FailureKind::WriteFailure
            }
            CovtrackError::Busy => FailureKind::Busy,
            CovtrackError::Io(_) => FailureKind::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, CovtrackError>;
