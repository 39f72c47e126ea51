use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while locating, parsing, or querying protocol files.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}:{line}: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("uri '{uri}' not found in '{}'", .path.display())]
    UnknownUri { uri: String, path: PathBuf },
    #[error("unknown protocol '{0}'")]
    UnknownProtocol(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("json export failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

impl DatabaseError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DatabaseError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        DatabaseError::Malformed {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Whether the error comes from a missing or unreadable file.
    pub fn is_file_access(&self) -> bool {
        matches!(self, DatabaseError::Io { .. })
    }
}
