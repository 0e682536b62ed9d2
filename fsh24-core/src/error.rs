use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the core. Per-line manifest problems are not errors;
/// they come back as [`crate::manifest::LineIssue`] values.
#[derive(Error, Debug)]
pub enum Error {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid checksum file: {0}")]
    Format(String),
    /// Path contains `|` or a line break, or is not valid UTF-8.
    #[error("path cannot be written to a manifest: {0}")]
    UnrepresentablePath(String),
    #[error("hash init failed: {0}")]
    HashInit(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
