//! The build state aggregate threaded through each build pass.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use idlmake_common::CompilerArgs;

/// Source → one-hop dependency sources, as last reported by the compiler.
///
/// Edges are never transitively closed and may contain cycles.
pub type DependencyMap = BTreeMap<PathBuf, Vec<PathBuf>>;

/// Source → generated output paths it produced.
pub type ArtifactMap = BTreeMap<PathBuf, Vec<PathBuf>>;

/// Persisted snapshot of the dependency graph, artifact map and compiler arguments.
///
/// Created empty on first run, replaced at the end of each committed pass,
/// deleted when the source set becomes empty. Owned by the caller and passed
/// explicitly into and out of each pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildState {
    /// Dependency edges per source.
    pub dependencies: DependencyMap,
    /// Generated files per source.
    pub artifacts: ArtifactMap,
    /// Arguments the state was produced with.
    pub compiler_args: CompilerArgs,
}

impl BuildState {
    /// Creates an empty state for the given compiler arguments.
    pub fn new(compiler_args: CompilerArgs) -> Self {
        Self {
            dependencies: DependencyMap::new(),
            artifacts: ArtifactMap::new(),
            compiler_args,
        }
    }

    /// Returns `true` if no dependencies or artifacts are recorded.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.artifacts.is_empty()
    }

    /// Returns the recorded outputs of `source` (empty if none).
    pub fn outputs_of(&self, source: &Path) -> &[PathBuf] {
        self.artifacts.get(source).map_or(&[], Vec::as_slice)
    }

    /// Returns every output path referenced by the artifact map.
    pub fn referenced_outputs(&self) -> BTreeSet<PathBuf> {
        self.artifacts.values().flatten().cloned().collect()
    }

    /// Merges a generation delta: entries in `delta` replace prior entries.
    pub fn merge_artifacts(&mut self, delta: ArtifactMap) {
        for (source, outputs) in delta {
            self.artifacts.insert(source, outputs);
        }
    }

    /// Drops dependency and artifact entries for sources not in `sources`.
    ///
    /// Returns the sources whose artifact entries were dropped.
    pub fn retain_sources(&mut self, sources: &BTreeSet<PathBuf>) -> Vec<PathBuf> {
        let removed: Vec<PathBuf> = self
            .artifacts
            .keys()
            .filter(|s| !sources.contains(*s))
            .cloned()
            .collect();
        self.artifacts.retain(|s, _| sources.contains(s));
        self.dependencies.retain(|s, _| sources.contains(s));
        removed
    }
}
