//! Host-driven build session for IDE integrations.
//!
//! The host owns the project model and tells the session what happened:
//! a source was added, edited or removed, or the project tree changed enough
//! to warrant a [`reap`](ProjectSession::reap). The session registers no
//! listeners of its own.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use idlmake_common::CompilerArgs;
use idlmake_compiler::CompilerInvoker;
use tracing::debug;

use crate::coordinator::{BuildCoordinator, BuildReport};
use crate::error::BuildError;
use crate::tracker::{FileTracker, ProjectItem, ReapOutcome};

/// One project's sources, build coordinator and file tracker.
pub struct ProjectSession<I> {
    name: String,
    args: CompilerArgs,
    sources: BTreeSet<PathBuf>,
    coordinator: BuildCoordinator<I>,
    tracker: FileTracker,
}

impl<I: CompilerInvoker> ProjectSession<I> {
    /// Opens a session, seeding the tracker from the persisted build state.
    ///
    /// Every source listed in the dependency map is a member, including
    /// sources whose last generation failed and so have no outputs.
    pub fn new(name: impl Into<String>, coordinator: BuildCoordinator<I>, args: CompilerArgs) -> Self {
        let name = name.into();
        let tracker = FileTracker::new();
        let state = coordinator.store().load();
        let sources = state
            .dependencies
            .keys()
            .chain(state.artifacts.keys())
            .cloned()
            .collect();
        tracker.replace_project(&name, state.artifacts);
        Self {
            name,
            args,
            sources,
            coordinator,
            tracker,
        }
    }

    /// Returns the project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current source set.
    pub fn sources(&self) -> &BTreeSet<PathBuf> {
        &self.sources
    }

    /// Returns the file tracker.
    pub fn tracker(&self) -> &FileTracker {
        &self.tracker
    }

    /// Returns the build coordinator.
    pub fn coordinator(&self) -> &BuildCoordinator<I> {
        &self.coordinator
    }

    /// Replaces the compiler arguments; the next build is a full rebuild if they differ.
    pub fn set_args(&mut self, args: CompilerArgs) {
        self.args = args;
    }

    /// Adds a source to the project and builds.
    pub fn on_source_added(&mut self, path: &Path) -> Result<BuildReport, BuildError> {
        self.sources.insert(path.to_path_buf());
        self.build()
    }

    /// Rebuilds after a source was edited. Non-members are ignored.
    pub fn on_source_changed(&mut self, path: &Path) -> Result<BuildReport, BuildError> {
        if !self.sources.contains(path) {
            debug!(path = %path.display(), "ignoring change to non-member file");
            return Ok(BuildReport::default());
        }
        self.build()
    }

    /// Removes a source from the project and builds, deleting its outputs.
    pub fn on_source_removed(&mut self, path: &Path) -> Result<BuildReport, BuildError> {
        if !self.sources.remove(path) {
            return Ok(BuildReport::default());
        }
        self.build()
    }

    /// Reaps outputs of tracked sources that are no longer in the project tree.
    ///
    /// Reaped sources also leave the session's source set; the next build
    /// drops their state entries.
    pub fn reap(&mut self, root: &dyn ProjectItem) -> ReapOutcome {
        let outcome = self.tracker.reap(&self.name, root);
        if let ReapOutcome::Reaped { sources, .. } = &outcome {
            for source in sources {
                self.sources.remove(source);
            }
        }
        outcome
    }

    /// Builds the current source set and refreshes the tracker.
    ///
    /// The tracker is refreshed even when compilation fails, because sources
    /// that compiled are still committed.
    pub fn build(&mut self) -> Result<BuildReport, BuildError> {
        let sources: Vec<PathBuf> = self.sources.iter().cloned().collect();
        let result = self.coordinator.compile(&sources, &self.args);
        if matches!(result, Ok(_) | Err(BuildError::Compilation { .. })) {
            let state = self.coordinator.store().load();
            self.tracker.replace_project(&self.name, state.artifacts);
        }
        result
    }
}
