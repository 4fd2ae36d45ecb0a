use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type AcquireResult<T> = Result<T, AcquireError>;

/// Failures of the acquisition pipeline.
///
/// Batch operations isolate these per requirement; only environment
/// failures are meant to end a run.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Connection error, timeout or broken stream.
    #[error("network failure for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed index metadata from {url}: {reason}")]
    MalformedMetadata { url: String, reason: String },

    /// No artifact could be located for a resolved package.
    #[error("no artifact found for {name} {version}")]
    NotFound { name: String, version: String },

    #[error("{} has {local} bytes, index reports {remote}", path.display())]
    IntegrityMismatch {
        path: PathBuf,
        local: u64,
        remote: u64,
    },

    #[error("download of {url} was interrupted")]
    Interrupted { url: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("virtual environment is missing or incomplete: {}", path.display())]
    EnvironmentMissing { path: PathBuf },
}

impl AcquireError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
