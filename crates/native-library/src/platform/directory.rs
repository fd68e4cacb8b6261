//! Process working directory access.
//!
//! The working directory is process-wide state. It is reached through the
//! [`DirectoryContext`] trait so the loader's redirect-and-restore sequence
//! can be observed and faked in tests.

use crate::config::PathConfig;
use crate::error::{LibraryError, Result};
use crate::path::strip_trailing_separators;
use std::path::PathBuf;
use tracing::debug;

/// Get/set access to the current working directory.
///
/// Implementations are not expected to be atomic with respect to other
/// threads: a concurrent change of the process directory between a get and
/// a set is the caller's hazard to serialize.
pub trait DirectoryContext: Send + Sync {
    /// The current working directory with trailing separators stripped.
    fn current_directory(&self) -> Result<String>;

    /// Change the current working directory. Returns `false` on failure.
    fn set_current_directory(&self, path: &str) -> bool;
}

/// [`DirectoryContext`] backed by the real process working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessDirectory;

impl DirectoryContext for ProcessDirectory {
    fn current_directory(&self) -> Result<String> {
        let dir = std::env::current_dir()?;
        let dir = dir
            .into_os_string()
            .into_string()
            .map_err(|raw| LibraryError::NonUnicodePath(PathBuf::from(raw)))?;
        check_length(&dir)?;
        Ok(strip_trailing_separators(&dir))
    }

    fn set_current_directory(&self, path: &str) -> bool {
        match std::env::set_current_dir(path) {
            Ok(()) => true,
            Err(e) => {
                debug!("Failed to change working directory to {}: {}", path, e);
                false
            }
        }
    }
}

/// Length of `path` in the units the OS measures paths in.
fn path_units(path: &str) -> usize {
    #[cfg(windows)]
    {
        path.encode_utf16().count()
    }

    #[cfg(not(windows))]
    {
        path.len()
    }
}

/// Reject directories the OS could not have reported through a
/// `MAX_PATH`-sized buffer.
fn check_length(path: &str) -> Result<()> {
    let length = path_units(path);
    if length == 0 {
        return Err(LibraryError::EmptyPath);
    }
    if length > PathConfig::MAX_PATH {
        return Err(LibraryError::PathTooLong {
            length,
            max: PathConfig::MAX_PATH,
        });
    }
    Ok(())
}
