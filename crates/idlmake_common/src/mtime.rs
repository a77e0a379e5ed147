//! File timestamp helpers.
//!
//! Change detection in idlmake is timestamp based only. These helpers fold
//! "file missing" and "timestamp unavailable" into `None` so callers can treat
//! both as "does not exist" for staleness purposes.

use std::path::Path;
use std::time::SystemTime;

/// Returns the last-modified time of `path`, or `None` if it cannot be read.
///
/// Directories are reported as `None`; only regular files (or symlinks to
/// them) have a meaningful modification time for build purposes.
pub fn file_mtime(path: &Path) -> Option<SystemTime> {
    let meta = std::fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    meta.modified().ok()
}

/// Returns `true` if `a` is strictly newer than `b`.
///
/// Equal timestamps are not "newer": edits within the filesystem's timestamp
/// granularity are not detected.
pub fn is_newer(a: SystemTime, b: SystemTime) -> bool {
    a > b
}
