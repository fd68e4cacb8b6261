//! Error types for the native library loader.
//!
//! Most operations in this crate report failure through sentinels (`None`
//! handles, `None` symbols, `false` from directory switches). The error type
//! here covers the few places where a reason is worth carrying, chiefly
//! querying the process working directory.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the native library crate.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Path is not valid Unicode: {0:?}")]
    NonUnicodePath(PathBuf),

    #[error("Path is empty")]
    EmptyPath,

    #[error("Path length {length} exceeds the platform maximum of {max}")]
    PathTooLong { length: usize, max: usize },
}

/// Result type alias for native library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}
