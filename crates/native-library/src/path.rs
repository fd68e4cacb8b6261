//! Drive-letter and separator aware path normalization.
//!
//! These helpers operate on plain strings so the same rules apply on every
//! host: both `\` and `/` count as separators, and a leading `<letter>:` is
//! treated as a drive prefix that must survive any trimming. They perform
//! no I/O.
//!
//! All cut points fall directly after an ASCII byte (a separator or the
//! drive colon), so truncation always lands on a character boundary.

use crate::config::PathConfig;

/// Returns `true` if `ch` is a recognized path separator.
pub fn is_separator(ch: char) -> bool {
    PathConfig::SEPARATORS.contains(&ch)
}

fn is_separator_byte(byte: u8) -> bool {
    byte.is_ascii() && is_separator(byte as char)
}

/// Locate a drive-letter prefix.
///
/// Returns `Some(1)`, the index of the `:`, when the path begins with an
/// ASCII letter followed by a colon. Anything else has no drive letter.
pub fn find_drive_letter(path: &str) -> Option<usize> {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        Some(1)
    } else {
        None
    }
}

/// The drive-letter index in signed form, `-1` when absent.
fn drive_letter_offset(path: &str) -> isize {
    find_drive_letter(path).map(|i| i as isize).unwrap_or(-1)
}

/// Remove trailing separators.
///
/// Never strips into the drive prefix, so `C:\` keeps its root separator.
/// A path made of exactly two leading separators (`\\` or `C:\\`) keeps both,
/// marking an alternate root, unless the path started with more than two.
pub fn strip_trailing_separators(path: &str) -> String {
    let bytes = path.as_bytes();
    // One past the first character that may be stripped.
    let start = (drive_letter_offset(path) + 2) as usize;
    let mut len = bytes.len();
    let mut last_stripped: Option<usize> = None;

    let mut pos = len;
    while pos > start && is_separator_byte(bytes[pos - 1]) {
        if pos != start + 1
            || last_stripped == Some(start + 2)
            || !is_separator_byte(bytes[start - 1])
        {
            len = pos - 1;
            last_stripped = Some(pos);
        }
        pos -= 1;
    }

    path[..len].to_string()
}

/// Compute the parent directory of `path`.
///
/// The drive letter is always retained. A path without any separator lives in
/// the current directory, so only the drive prefix (or `.`) is returned. Root
/// paths are their own parent.
pub fn parent(path: &str) -> String {
    let mut path = strip_trailing_separators(path);

    let letter = drive_letter_offset(&path);
    let last_separator = path.rfind(is_separator).map(|i| i as isize);

    match last_separator {
        // In the current directory.
        None => path.truncate((letter + 1) as usize),
        // In the root directory.
        Some(sep) if sep == letter + 1 => path.truncate((letter + 2) as usize),
        // In a double-separator root: keep both separators intact.
        Some(sep)
            if sep == letter + 2 && is_separator_byte(path.as_bytes()[(letter + 1) as usize]) =>
        {
            path.truncate((letter + 3) as usize)
        }
        // A lone separator at the very start has nothing left to trim.
        Some(0) => {}
        // Somewhere deeper: drop the basename.
        Some(sep) => path.truncate(sep as usize),
    }

    let path = strip_trailing_separators(&path);
    if path.is_empty() {
        PathConfig::CURRENT_DIRECTORY.to_string()
    } else {
        path
    }
}
