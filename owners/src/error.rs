use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure taxonomy for database construction and finder commands.
///
/// Every variant is terminal to the operation that raised it; callers never
/// retry, and a rejected finder command leaves session state untouched.
#[derive(Error, Debug)]
pub enum OwnersError {
    /// File-system access failure, tagged with the offending path.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed OWNERS line, with 1-based line number.
    #[error("{path}:{line}: {message}")]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Invalid per-file glob, invalid scope, or missing file of interest.
    #[error("{0}")]
    Config(String),

    /// Select/deselect of an unknown or already-decided owner.
    #[error("{0}")]
    Precondition(String),
}

pub type Result<T, E = OwnersError> = std::result::Result<T, E>;
