//! On-disk persistence of [`BuildState`].
//!
//! Three records live in the state directory:
//!
//! - `compiler-args`: one argument per line
//! - `dependencies.xml`: the dependency graph
//! - `generated.xml`: the source → generated-file map
//!
//! Loading is fail-safe: missing, empty, or corrupt records mean "no prior
//! state" and trigger a full rebuild rather than an error. Saving writes each
//! record to a temporary file and renames it into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use idlmake_common::CompilerArgs;
use tracing::{debug, warn};

use crate::error::StateError;
use crate::records::{parse_dependencies, parse_generated, write_dependencies, write_generated};
use crate::state::BuildState;

/// Record holding the last-used compiler argument vector.
pub const ARGS_FILE: &str = "compiler-args";

/// Record holding the dependency graph.
pub const DEPENDENCIES_FILE: &str = "dependencies.xml";

/// Record holding the source → generated-file map.
pub const GENERATED_FILE: &str = "generated.xml";

/// Persistent storage for one output directory's build state.
#[derive(Debug, Clone)]
pub struct StateStore {
    /// Directory containing the three records.
    dir: PathBuf,
}

impl StateStore {
    /// Creates a store rooted at the given state directory.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Returns the state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns `true` if any record exists on disk.
    pub fn exists(&self) -> bool {
        [ARGS_FILE, DEPENDENCIES_FILE, GENERATED_FILE]
            .iter()
            .any(|name| self.dir.join(name).is_file())
    }

    /// Loads the persisted state, or an empty state if there is none.
    ///
    /// A corrupt dependency or artifact record is logged and replaced by an
    /// empty map, which forces the affected sources to rebuild.
    pub fn load(&self) -> BuildState {
        let compiler_args = self
            .read_record(ARGS_FILE)
            .map(|text| CompilerArgs::from_lines(&text))
            .unwrap_or_default();

        let dependencies = match self.read_record(DEPENDENCIES_FILE) {
            Some(text) => parse_dependencies(&text).unwrap_or_else(|e| {
                warn!(error = %e, "discarding corrupt dependency record");
                Default::default()
            }),
            None => Default::default(),
        };

        let artifacts = match self.read_record(GENERATED_FILE) {
            Some(text) => parse_generated(&text).unwrap_or_else(|e| {
                warn!(error = %e, "discarding corrupt generated-file record");
                Default::default()
            }),
            None => Default::default(),
        };

        debug!(
            dir = %self.dir.display(),
            sources = dependencies.len(),
            artifacts = artifacts.len(),
            "loaded build state"
        );

        BuildState {
            dependencies,
            artifacts,
            compiler_args,
        }
    }

    /// Saves the state, replacing each record atomically.
    ///
    /// Creates the state directory if it doesn't exist. The argument record is
    /// replaced last so that a partially saved state never pairs new maps with
    /// stale arguments that would make them look valid.
    pub fn save(&self, state: &BuildState) -> Result<(), StateError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StateError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        let dependencies = write_dependencies(&state.dependencies)?;
        let generated = write_generated(&state.artifacts)?;

        self.replace_record(DEPENDENCIES_FILE, &dependencies)?;
        self.replace_record(GENERATED_FILE, &generated)?;
        self.replace_record(ARGS_FILE, &state.compiler_args.to_lines())?;
        Ok(())
    }

    /// Deletes every record and, if it is then empty, the state directory.
    pub fn remove(&self) -> Result<(), StateError> {
        for name in [ARGS_FILE, DEPENDENCIES_FILE, GENERATED_FILE] {
            let path = self.dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StateError::Io { path, source: e }),
            }
        }
        // Leave the directory alone if anything else lives there.
        let _ = std::fs::remove_dir(&self.dir);
        Ok(())
    }

    fn read_record(&self, name: &str) -> Option<String> {
        let path = self.dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => None,
            Ok(text) => Some(text),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable state record");
                None
            }
        }
    }

    fn replace_record(&self, name: &str, contents: &str) -> Result<(), StateError> {
        let path = self.dir.join(name);
        let tmp_path = self.dir.join(format!("{name}.tmp"));
        std::fs::write(&tmp_path, contents).map_err(|e| StateError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| StateError::Io { path, source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> BuildState {
        let mut state = BuildState::new(CompilerArgs::new([
            "slice2java",
            "--output-dir",
            "/w/gen",
        ]));
        state
            .dependencies
            .insert(PathBuf::from("/w/A.ice"), vec![]);
        state.dependencies.insert(
            PathBuf::from("/w/B.ice"),
            vec![PathBuf::from("/w/A.ice")],
        );
        state
            .artifacts
            .insert(PathBuf::from("/w/A.ice"), vec![PathBuf::from("/w/gen/A.java")]);
        state
            .artifacts
            .insert(PathBuf::from("/w/B.ice"), vec![PathBuf::from("/w/gen/B.java")]);
        state
    }

    #[test]
    fn load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(&dir.path().join(".idlmake"));
        assert!(!store.exists());
        let state = store.load();
        assert!(state.is_empty());
        assert!(state.compiler_args.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(&dir.path().join("deeply").join("nested"));
        let state = sample_state();
        store.save(&state).unwrap();
        assert!(store.exists());
        assert_eq!(store.load(), state);
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&sample_state()).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn args_record_is_line_oriented() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&sample_state()).unwrap();
        let text = std::fs::read_to_string(dir.path().join(ARGS_FILE)).unwrap();
        assert_eq!(text, "slice2java\n--output-dir\n/w/gen\n");
    }

    #[test]
    fn corrupt_dependency_record_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&sample_state()).unwrap();
        std::fs::write(dir.path().join(DEPENDENCIES_FILE), "<dependencies><sou").unwrap();

        let state = store.load();
        assert!(state.dependencies.is_empty());
        assert_eq!(state.artifacts.len(), 2);
        assert_eq!(state.compiler_args.len(), 3);
    }

    #[test]
    fn corrupt_generated_record_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&sample_state()).unwrap();
        std::fs::write(dir.path().join(GENERATED_FILE), "not xml at all <<<").unwrap();

        let state = store.load();
        assert!(state.artifacts.is_empty());
        assert_eq!(state.dependencies.len(), 2);
    }

    #[test]
    fn empty_records_are_no_state() {
        let dir = tempfile::tempdir().unwrap();
        for name in [ARGS_FILE, DEPENDENCIES_FILE, GENERATED_FILE] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let state = StateStore::new(dir.path()).load();
        assert_eq!(state, BuildState::default());
    }

    #[test]
    fn remove_deletes_records_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join(".idlmake");
        let store = StateStore::new(&state_dir);
        store.save(&sample_state()).unwrap();
        store.remove().unwrap();
        assert!(!store.exists());
        assert!(!state_dir.exists());
    }

    #[test]
    fn remove_keeps_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&sample_state()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        store.remove().unwrap();
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn remove_when_nothing_saved_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(&dir.path().join("missing"));
        store.remove().unwrap();
    }
}
