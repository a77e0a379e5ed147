//! Stale generated-file garbage collection.
//!
//! A file is a GC candidate when the previous build state tracked it, or when
//! it lies under the output directory and carries one of the configured
//! generated-file extensions. Candidates not referenced by the new artifact map
//! are deleted. The state directory is never scanned.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::coordinator::BuildSettings;

/// Lists the files under the output directory that look generated.
pub fn generated_looking_files(settings: &BuildSettings) -> BTreeSet<PathBuf> {
    if settings.generated_extensions.is_empty() || !settings.output_dir.is_dir() {
        return BTreeSet::new();
    }

    WalkDir::new(&settings.output_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.path() != settings.state_dir)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| settings.generated_extensions.iter().any(|g| g == ext))
        })
        .map(|e| e.into_path())
        .collect()
}

/// Deletes every candidate file that is not in `referenced`.
///
/// Candidates are `tracked` plus [`generated_looking_files`]. Deletion failures
/// are logged and skipped. Returns the files that were actually removed.
pub fn collect_garbage(
    settings: &BuildSettings,
    tracked: &BTreeSet<PathBuf>,
    referenced: &BTreeSet<PathBuf>,
) -> Vec<PathBuf> {
    let mut candidates = generated_looking_files(settings);
    candidates.extend(tracked.iter().cloned());

    let mut removed = Vec::new();
    for path in candidates {
        if referenced.contains(&path) || path.starts_with(&settings.state_dir) {
            continue;
        }
        if remove_generated(&path) {
            removed.push(path);
        }
    }

    if settings.prune_empty_dirs {
        for path in &removed {
            prune_empty_parents(path, &settings.output_dir);
        }
    }

    debug!(count = removed.len(), "removed stale generated files");
    removed
}

/// Removes one generated file, returning `true` if it existed and was deleted.
pub(crate) fn remove_generated(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed generated file");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove generated file");
            false
        }
    }
}

/// Removes empty directories from `file`'s parent up to, but excluding, `root`.
fn prune_empty_parents(file: &Path, root: &Path) {
    let mut dir = file.parent();
    while let Some(d) = dir {
        if d == root || !d.starts_with(root) {
            break;
        }
        // Fails on a non-empty directory, which ends the walk.
        if std::fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
}
