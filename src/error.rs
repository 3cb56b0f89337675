//! Error types for blobkit

use std::fmt;
use thiserror::Error;

/// Result type alias for blobkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in blobkit operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid range: offset {offset} length {length} for blob of {size} bytes")]
    Range { offset: u64, length: usize, size: u64 },

    #[error("Short read: wanted {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Verification failed: expected {expected_len} bytes, got {actual_len} (first mismatch at {first_mismatch:?})")]
    Verification {
        expected_len: usize,
        actual_len: usize,
        first_mismatch: Option<usize>,
    },

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("Backend is closed")]
    Closed,

    #[error("Config error: {0}")]
    Config(String),

    #[error("{phase} failed for {handle}: {source}")]
    Scenario {
        phase: Phase,
        handle: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// True if the error (or the error it wraps) means the object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Scenario { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// The harness phase this error was raised in, if any
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Scenario { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Step of a harness scenario, used to tag failures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Save,
    Load,
    Read,
    Close,
    Verify,
    Remove,
    Stat,
    List,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Save => "save",
            Phase::Load => "load",
            Phase::Read => "read",
            Phase::Close => "close",
            Phase::Verify => "verification",
            Phase::Remove => "remove",
            Phase::Stat => "stat",
            Phase::List => "list",
            Phase::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}
