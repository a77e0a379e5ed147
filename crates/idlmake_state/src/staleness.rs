//! Timestamp-based staleness analysis.
//!
//! [`compute_changed`] is a pure function over a [`FileSnapshot`]: every
//! filesystem fact it needs is captured up front, so the analysis itself has
//! no failure modes and can be exercised with synthetic timestamps.
//!
//! For each existing source `S` the rules below are tried in order and the
//! first match marks `S` as changed:
//!
//! 1. `S` has no recorded outputs, or none of them exist.
//! 2. The first existing recorded output (its mtime is `T`) predates the compiler.
//! 3. Some recorded output is missing or older than `S`.
//! 4. `S` has no dependency entry at all.
//! 5. Some existing dependency of `S` is newer than `T`.
//!
//! Equal timestamps never count as newer, so an edit landing in the same
//! timestamp tick as the last build goes unnoticed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use idlmake_common::{file_mtime, is_newer};
use tracing::debug;

use crate::state::{ArtifactMap, DependencyMap};

/// Modification times of every file relevant to one analysis.
///
/// A path with no entry is treated as nonexistent.
#[derive(Debug, Clone, Default)]
pub struct FileSnapshot {
    mtimes: HashMap<PathBuf, SystemTime>,
}

impl FileSnapshot {
    /// Creates an empty snapshot in which no file exists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the modification time of each path from disk.
    pub fn capture<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        let mut snapshot = Self::new();
        for path in paths {
            if snapshot.mtimes.contains_key(path) {
                continue;
            }
            if let Some(mtime) = file_mtime(path) {
                snapshot.mtimes.insert(path.clone(), mtime);
            }
        }
        snapshot
    }

    /// Captures every source, dependency and recorded output in one pass.
    pub fn for_state(
        sources: &[PathBuf],
        dependencies: &DependencyMap,
        artifacts: &ArtifactMap,
    ) -> Self {
        Self::capture(
            sources
                .iter()
                .chain(dependencies.values().flatten())
                .chain(artifacts.values().flatten()),
        )
    }

    /// Records a modification time, marking the path as existing.
    pub fn record(&mut self, path: impl Into<PathBuf>, mtime: SystemTime) {
        self.mtimes.insert(path.into(), mtime);
    }

    /// Returns the modification time of `path`, or `None` if it doesn't exist.
    pub fn mtime(&self, path: &Path) -> Option<SystemTime> {
        self.mtimes.get(path).copied()
    }

    /// Returns `true` if `path` exists in the snapshot.
    pub fn exists(&self, path: &Path) -> bool {
        self.mtimes.contains_key(path)
    }
}

/// Why a source was selected for recompilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// No outputs were ever recorded for the source.
    NeverBuilt,
    /// Outputs were recorded but none of them exist.
    OutputsMissing,
    /// The compiler binary was modified after the outputs were written.
    CompilerNewer,
    /// A recorded output is missing.
    OutputMissing(PathBuf),
    /// A recorded output is older than the source.
    OutputOlder(PathBuf),
    /// The source has no dependency entry.
    NeverAnalyzed,
    /// A dependency was modified after the outputs were written.
    DependencyNewer(PathBuf),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::NeverBuilt => write!(f, "never built"),
            StaleReason::OutputsMissing => write!(f, "all generated files are missing"),
            StaleReason::CompilerNewer => write!(f, "compiler is newer than generated files"),
            StaleReason::OutputMissing(p) => write!(f, "generated file {} is missing", p.display()),
            StaleReason::OutputOlder(p) => {
                write!(f, "generated file {} is older than the source", p.display())
            }
            StaleReason::NeverAnalyzed => write!(f, "no dependency information"),
            StaleReason::DependencyNewer(p) => write!(f, "dependency {} changed", p.display()),
        }
    }
}

/// Decides whether a single source must be recompiled.
///
/// Returns `None` when the source is up to date or doesn't exist.
pub fn check_source(
    source: &Path,
    dependencies: &DependencyMap,
    artifacts: &ArtifactMap,
    compiler_mtime: Option<SystemTime>,
    snapshot: &FileSnapshot,
) -> Option<StaleReason> {
    let source_mtime = snapshot.mtime(source)?;

    let outputs = match artifacts.get(source) {
        Some(outputs) if !outputs.is_empty() => outputs,
        _ => return Some(StaleReason::NeverBuilt),
    };

    let Some(built_at) = outputs.iter().find_map(|o| snapshot.mtime(o)) else {
        return Some(StaleReason::OutputsMissing);
    };

    if let Some(compiler) = compiler_mtime {
        if is_newer(compiler, built_at) {
            return Some(StaleReason::CompilerNewer);
        }
    }

    for output in outputs {
        match snapshot.mtime(output) {
            None => return Some(StaleReason::OutputMissing(output.clone())),
            Some(t) if is_newer(source_mtime, t) => {
                return Some(StaleReason::OutputOlder(output.clone()))
            }
            Some(_) => {}
        }
    }

    let Some(deps) = dependencies.get(source) else {
        return Some(StaleReason::NeverAnalyzed);
    };

    deps.iter()
        .find(|d| snapshot.mtime(d).is_some_and(|t| is_newer(t, built_at)))
        .map(|d| StaleReason::DependencyNewer(d.clone()))
}

/// Returns every stale source together with the reason it was selected.
pub fn stale_sources(
    sources: &[PathBuf],
    dependencies: &DependencyMap,
    artifacts: &ArtifactMap,
    compiler_mtime: Option<SystemTime>,
    snapshot: &FileSnapshot,
) -> BTreeMap<PathBuf, StaleReason> {
    let mut stale = BTreeMap::new();
    for source in sources {
        if let Some(reason) = check_source(source, dependencies, artifacts, compiler_mtime, snapshot)
        {
            debug!(source = %source.display(), %reason, "source is stale");
            stale.insert(source.clone(), reason);
        }
    }
    stale
}

/// Computes the set of sources that require recompilation.
pub fn compute_changed(
    sources: &[PathBuf],
    dependencies: &DependencyMap,
    artifacts: &ArtifactMap,
    compiler_mtime: Option<SystemTime>,
    snapshot: &FileSnapshot,
) -> BTreeSet<PathBuf> {
    stale_sources(sources, dependencies, artifacts, compiler_mtime, snapshot)
        .into_keys()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + secs)
    }

    /// A (no deps) and B (depends on A), both built at t=20 from sources at t=10.
    fn built_pair() -> (Vec<PathBuf>, DependencyMap, ArtifactMap, FileSnapshot) {
        let sources = vec![p("/s/A.ice"), p("/s/B.ice")];
        let mut deps = DependencyMap::new();
        deps.insert(p("/s/A.ice"), vec![]);
        deps.insert(p("/s/B.ice"), vec![p("/s/A.ice")]);
        let mut artifacts = ArtifactMap::new();
        artifacts.insert(p("/s/A.ice"), vec![p("/g/A.out")]);
        artifacts.insert(p("/s/B.ice"), vec![p("/g/B.out")]);

        let mut snap = FileSnapshot::new();
        snap.record("/s/A.ice", at(10));
        snap.record("/s/B.ice", at(10));
        snap.record("/g/A.out", at(20));
        snap.record("/g/B.out", at(20));
        (sources, deps, artifacts, snap)
    }

    #[test]
    fn first_build_changes_everything() {
        let (sources, deps, _, snap) = built_pair();
        let changed = compute_changed(&sources, &deps, &ArtifactMap::new(), None, &snap);
        assert_eq!(changed, sources.into_iter().collect());
    }

    #[test]
    fn up_to_date_build_changes_nothing() {
        let (sources, deps, artifacts, snap) = built_pair();
        assert!(compute_changed(&sources, &deps, &artifacts, Some(at(0)), &snap).is_empty());
    }

    #[test]
    fn touching_dependency_rebuilds_dependents() {
        let (sources, deps, artifacts, mut snap) = built_pair();
        snap.record("/s/A.ice", at(30));
        let stale = stale_sources(&sources, &deps, &artifacts, None, &snap);
        assert_eq!(stale[Path::new("/s/A.ice")], StaleReason::OutputOlder(p("/g/A.out")));
        assert_eq!(
            stale[Path::new("/s/B.ice")],
            StaleReason::DependencyNewer(p("/s/A.ice"))
        );
    }

    #[test]
    fn compiler_newer_than_outputs() {
        let (sources, deps, artifacts, snap) = built_pair();
        let stale = stale_sources(&sources, &deps, &artifacts, Some(at(25)), &snap);
        assert_eq!(stale.len(), 2);
        assert!(stale.values().all(|r| *r == StaleReason::CompilerNewer));
    }

    #[test]
    fn one_missing_output_is_stale() {
        let (sources, deps, mut artifacts, snap) = built_pair();
        artifacts
            .get_mut(Path::new("/s/A.ice"))
            .unwrap()
            .push(p("/g/AHolder.out"));
        let reason = check_source(&sources[0], &deps, &artifacts, None, &snap);
        assert_eq!(reason, Some(StaleReason::OutputMissing(p("/g/AHolder.out"))));
    }

    #[test]
    fn all_outputs_missing() {
        let (sources, deps, artifacts, _) = built_pair();
        let mut snap = FileSnapshot::new();
        snap.record("/s/A.ice", at(10));
        let reason = check_source(&sources[0], &deps, &artifacts, None, &snap);
        assert_eq!(reason, Some(StaleReason::OutputsMissing));
    }

    #[test]
    fn empty_output_list_counts_as_never_built() {
        let (sources, deps, mut artifacts, snap) = built_pair();
        artifacts.insert(p("/s/A.ice"), vec![]);
        let reason = check_source(&sources[0], &deps, &artifacts, None, &snap);
        assert_eq!(reason, Some(StaleReason::NeverBuilt));
    }

    #[test]
    fn missing_dependency_entry_is_stale() {
        let (sources, mut deps, artifacts, snap) = built_pair();
        deps.remove(Path::new("/s/B.ice"));
        let reason = check_source(&sources[1], &deps, &artifacts, None, &snap);
        assert_eq!(reason, Some(StaleReason::NeverAnalyzed));
    }

    #[test]
    fn nonexistent_dependency_is_ignored() {
        let (sources, mut deps, artifacts, snap) = built_pair();
        deps.insert(p("/s/B.ice"), vec![p("/s/A.ice"), p("/usr/share/slice/Gone.ice")]);
        assert!(check_source(&sources[1], &deps, &artifacts, None, &snap).is_none());
    }

    #[test]
    fn nonexistent_source_is_never_changed() {
        let (_, deps, artifacts, snap) = built_pair();
        let sources = vec![p("/s/Deleted.ice")];
        assert!(compute_changed(&sources, &deps, &artifacts, None, &snap).is_empty());
    }

    #[test]
    fn equal_timestamps_are_not_stale() {
        let (sources, deps, artifacts, mut snap) = built_pair();
        snap.record("/s/A.ice", at(20));
        assert!(compute_changed(&sources, &deps, &artifacts, Some(at(20)), &snap).is_empty());
    }

    #[test]
    fn dependency_cycle_is_flat() {
        let (sources, mut deps, artifacts, snap) = built_pair();
        deps.insert(p("/s/A.ice"), vec![p("/s/B.ice")]);
        assert!(compute_changed(&sources, &deps, &artifacts, None, &snap).is_empty());
    }

    #[test]
    fn reference_time_is_first_existing_output() {
        let sources = vec![p("/s/C.ice")];
        let mut deps = DependencyMap::new();
        deps.insert(p("/s/C.ice"), vec![p("/s/D.ice")]);
        let mut artifacts = ArtifactMap::new();
        artifacts.insert(p("/s/C.ice"), vec![p("/g/C1.out"), p("/g/C2.out")]);

        let mut snap = FileSnapshot::new();
        snap.record("/s/C.ice", at(0));
        snap.record("/s/D.ice", at(15));
        snap.record("/g/C1.out", at(10));
        snap.record("/g/C2.out", at(20));

        let reason = check_source(&sources[0], &deps, &artifacts, None, &snap);
        assert_eq!(reason, Some(StaleReason::DependencyNewer(p("/s/D.ice"))));
    }

    #[test]
    fn capture_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("A.ice");
        std::fs::write(&present, "module A {};").unwrap();
        let absent = dir.path().join("B.ice");

        let snap = FileSnapshot::capture([&present, &absent]);
        assert!(snap.exists(&present));
        assert!(!snap.exists(&absent));
        assert!(snap.mtime(&present).is_some());
    }

    #[test]
    fn reason_display() {
        assert_eq!(StaleReason::NeverBuilt.to_string(), "never built");
        assert_eq!(
            StaleReason::DependencyNewer(p("/s/A.ice")).to_string(),
            "dependency /s/A.ice changed"
        );
    }
}
