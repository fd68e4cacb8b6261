//! Centralized configuration for the native library loader.
//!
//! Path constants used by the normalizer plus the runtime options that
//! control how [`LibraryLoader`](crate::LibraryLoader) performs a load.

/// Path handling constants.
pub struct PathConfig;

impl PathConfig {
    /// Characters recognized as path separators, regardless of host platform.
    pub const SEPARATORS: [char; 2] = ['\\', '/'];
    /// Marker returned when a path has no parent component.
    pub const CURRENT_DIRECTORY: &'static str = ".";

    /// Longest working directory the loader will capture and restore.
    #[cfg(windows)]
    pub const MAX_PATH: usize = windows_sys::Win32::Foundation::MAX_PATH as usize;
    #[cfg(unix)]
    pub const MAX_PATH: usize = libc::PATH_MAX as usize;
    #[cfg(not(any(unix, windows)))]
    pub const MAX_PATH: usize = 4096;
}

/// Options controlling a [`LibraryLoader`](crate::LibraryLoader).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Point the working directory at the library's folder while loading it,
    /// so dependencies next to the library resolve.
    pub redirect_working_directory: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            redirect_working_directory: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_redirects() {
        assert!(LoaderConfig::default().redirect_working_directory);
    }

    #[test]
    fn test_separators() {
        assert!(PathConfig::SEPARATORS.contains(&'\\'));
        assert!(PathConfig::SEPARATORS.contains(&'/'));
        assert!(PathConfig::MAX_PATH > 0);
    }
}
