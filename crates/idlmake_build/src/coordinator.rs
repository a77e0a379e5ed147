//! The build pass.
//!
//! One pass, given the current source set and compiler arguments:
//!
//! 1. An empty source set cleans every generated file and yields empty state.
//! 2. Changed compiler arguments discard the prior dependency and artifact maps.
//! 3. The compiler lists dependencies for **all** sources.
//! 4. [`stale_sources`] selects the sources to regenerate.
//! 5. The compiler generates code for exactly those sources.
//! 6. The generation delta is merged and entries for removed sources dropped.
//! 7. Generated files no longer referenced are deleted.
//! 8. The new state is persisted (by [`BuildCoordinator::compile`]).
//!
//! A missing compiler, a compiler that cannot be started, or a failing
//! dependency listing aborts the pass before anything is written. A failing
//! generation run only discards the results of the sources it failed on.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use idlmake_common::CompilerArgs;
use idlmake_compiler::{CompilerInvoker, Invocation, InvokeMode};
use idlmake_config::resolve::DEFAULT_STATE_DIR;
use idlmake_config::ResolvedProject;
use idlmake_diagnostics::Diagnostic;
use idlmake_state::{stale_sources, BuildState, DependencyMap, FileSnapshot, StaleReason, StateStore};
use tracing::{debug, info, warn};

use crate::error::BuildError;
use crate::gc::{collect_garbage, remove_generated};

/// Where generated code and build state live, and how GC behaves.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Directory receiving generated code.
    pub output_dir: PathBuf,
    /// Directory holding the persisted build state.
    pub state_dir: PathBuf,
    /// Extensions of files under `output_dir` that GC may delete.
    pub generated_extensions: Vec<String>,
    /// Whether GC removes directories it leaves empty.
    pub prune_empty_dirs: bool,
}

impl BuildSettings {
    /// Creates settings with the state directory inside `output_dir`.
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            state_dir: output_dir.join(DEFAULT_STATE_DIR),
            generated_extensions: Vec::new(),
            prune_empty_dirs: true,
        }
    }
}

impl From<&ResolvedProject> for BuildSettings {
    fn from(project: &ResolvedProject) -> Self {
        Self {
            output_dir: project.output_dir.clone(),
            state_dir: project.state_dir.clone(),
            generated_extensions: project.generated_extensions.clone(),
            prune_empty_dirs: project.prune_empty_dirs,
        }
    }
}

/// Summary of one build pass.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Sources selected for regeneration.
    pub changed: BTreeSet<PathBuf>,
    /// Changed sources whose generation failed.
    pub failed: BTreeSet<PathBuf>,
    /// Files the compiler reported writing.
    pub generated: Vec<PathBuf>,
    /// Stale generated files that were deleted.
    pub removed: Vec<PathBuf>,
    /// Sources that left the source set this pass.
    pub dropped_sources: Vec<PathBuf>,
    /// Compiler warnings from both invocations.
    pub warnings: Vec<Diagnostic>,
    /// Whether the prior state was discarded because the arguments changed.
    pub full_rebuild: bool,
}

impl BuildReport {
    /// Returns `true` if the pass changed nothing on disk.
    pub fn is_up_to_date(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// The result of [`BuildCoordinator::run_pass`]: the state to commit, plus the
/// compilation error for sources that failed to generate.
#[derive(Debug)]
pub struct Pass {
    /// The state to persist.
    pub state: BuildState,
    /// What the pass did.
    pub report: BuildReport,
    /// Set when generation failed for some sources; the rest still commit.
    pub error: Option<BuildError>,
}

/// Outcome of a dry run.
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    /// Whether the next build discards the prior state.
    pub full_rebuild: bool,
    /// Stale sources and why.
    pub stale: BTreeMap<PathBuf, StaleReason>,
    /// Tracked sources that are no longer in the source set.
    pub removed_sources: Vec<PathBuf>,
    /// Warnings from the dependency listing.
    pub warnings: Vec<Diagnostic>,
}

/// Orchestrates build passes for one output directory.
pub struct BuildCoordinator<I> {
    invoker: I,
    settings: BuildSettings,
}

impl<I: CompilerInvoker> BuildCoordinator<I> {
    /// Creates a coordinator driving `invoker`.
    pub fn new(invoker: I, settings: BuildSettings) -> Self {
        Self { invoker, settings }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Returns the compiler invoker.
    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Returns the compiler invoker mutably.
    pub fn invoker_mut(&mut self) -> &mut I {
        &mut self.invoker
    }

    /// Returns the store holding this coordinator's persisted state.
    pub fn store(&self) -> StateStore {
        StateStore::new(&self.settings.state_dir)
    }

    /// Runs one pass against an explicit prior state without persisting.
    pub fn run_pass(
        &mut self,
        sources: &[PathBuf],
        prior: BuildState,
        args: &CompilerArgs,
    ) -> Result<Pass, BuildError> {
        let sources = normalize(sources);
        let mut report = BuildReport::default();

        if sources.is_empty() {
            info!("no sources; removing generated files");
            report.dropped_sources = prior.artifacts.keys().cloned().collect();
            report.removed =
                collect_garbage(&self.settings, &prior.referenced_outputs(), &BTreeSet::new());
            return Ok(Pass {
                state: BuildState::new(args.clone()),
                report,
                error: None,
            });
        }

        let tracked_before = prior.referenced_outputs();
        let mut state = if prior.compiler_args != *args {
            if !prior.compiler_args.is_empty() {
                info!("compiler arguments changed; rebuilding everything");
            }
            report.full_rebuild = true;
            BuildState::new(args.clone())
        } else {
            prior
        };

        let (dependencies, listing_warnings) = self.refresh_dependencies(&sources)?;
        state.dependencies = dependencies;
        report.warnings.extend(listing_warnings.iter().cloned());

        let snapshot = FileSnapshot::for_state(&sources, &state.dependencies, &state.artifacts);
        let stale = stale_sources(
            &sources,
            &state.dependencies,
            &state.artifacts,
            self.invoker.compiler_mtime(),
            &snapshot,
        );
        let changed: Vec<PathBuf> = stale.into_keys().collect();
        info!(changed = changed.len(), total = sources.len(), "computed stale sources");

        let mut error = None;
        let mut discarded = BTreeSet::new();
        if !changed.is_empty() {
            let generation = self.invoker.invoke(&changed, InvokeMode::Generate)?;
            report.warnings.extend(generation.warnings().cloned());
            let exit_code = generation.exit_code;
            let mut delta = generation.generated;

            if exit_code != 0 {
                let diagnostics = failure_diagnostics(generation.diagnostics, exit_code);
                let failing = failing_sources(&changed, &state.dependencies, &diagnostics);
                for source in &failing {
                    warn!(source = %source.display(), "code generation failed");
                    discarded.extend(delta.remove(source).unwrap_or_default());
                    discarded.extend(state.outputs_of(source).iter().cloned());
                    state.artifacts.remove(source);
                }
                report.failed = failing;
                // Listing warnings lead the error's diagnostics.
                let diagnostics = listing_warnings.into_iter().chain(diagnostics).collect();
                error = Some(BuildError::Compilation { diagnostics });
            }

            report.generated = delta.values().flatten().cloned().collect();
            state.merge_artifacts(delta);
        }
        report.changed = changed.into_iter().collect();

        report.dropped_sources = state.retain_sources(&sources.iter().cloned().collect());
        for source in &report.dropped_sources {
            debug!(source = %source.display(), "source left the build");
        }

        let referenced = state.referenced_outputs();
        for path in discarded.difference(&referenced) {
            if remove_generated(path) {
                report.removed.push(path.clone());
            }
        }
        report
            .removed
            .extend(collect_garbage(&self.settings, &tracked_before, &referenced));

        Ok(Pass {
            state,
            report,
            error,
        })
    }

    /// Loads the persisted state, runs a pass and persists the result.
    ///
    /// When generation fails for some sources the successful results are still
    /// persisted before the [`BuildError::Compilation`] is returned.
    pub fn compile(
        &mut self,
        sources: &[PathBuf],
        args: &CompilerArgs,
    ) -> Result<BuildReport, BuildError> {
        let store = self.store();
        let prior = store.load();
        let pass = self.run_pass(sources, prior, args)?;

        if sources.is_empty() {
            store.remove()?;
        } else {
            store.save(&pass.state)?;
        }

        info!(
            changed = pass.report.changed.len(),
            generated = pass.report.generated.len(),
            removed = pass.report.removed.len(),
            "build pass committed"
        );

        match pass.error {
            Some(err) => Err(err),
            None => Ok(pass.report),
        }
    }

    /// Deletes every generated file and the persisted state.
    ///
    /// Returns the files that were removed.
    pub fn clean(&self) -> Result<Vec<PathBuf>, BuildError> {
        let store = self.store();
        let prior = store.load();
        let removed =
            collect_garbage(&self.settings, &prior.referenced_outputs(), &BTreeSet::new());
        store.remove()?;
        info!(removed = removed.len(), "cleaned generated files");
        Ok(removed)
    }

    /// Reports what the next [`compile`](Self::compile) would regenerate.
    ///
    /// Runs the dependency listing but never generates code or writes state.
    pub fn status(
        &mut self,
        sources: &[PathBuf],
        args: &CompilerArgs,
    ) -> Result<StatusReport, BuildError> {
        let sources = normalize(sources);
        let mut prior = self.store().load();
        let mut report = StatusReport::default();

        let source_set: BTreeSet<PathBuf> = sources.iter().cloned().collect();
        report.removed_sources = prior
            .artifacts
            .keys()
            .filter(|s| !source_set.contains(*s))
            .cloned()
            .collect();

        if sources.is_empty() {
            return Ok(report);
        }

        if prior.compiler_args != *args {
            report.full_rebuild = true;
            prior = BuildState::new(args.clone());
        }

        let (dependencies, warnings) = self.refresh_dependencies(&sources)?;
        report.warnings = warnings;

        let snapshot = FileSnapshot::for_state(&sources, &dependencies, &prior.artifacts);
        report.stale = stale_sources(
            &sources,
            &dependencies,
            &prior.artifacts,
            self.invoker.compiler_mtime(),
            &snapshot,
        );
        Ok(report)
    }

    /// Lists dependencies for every source; a failing run aborts the pass.
    fn refresh_dependencies(
        &mut self,
        sources: &[PathBuf],
    ) -> Result<(DependencyMap, Vec<Diagnostic>), BuildError> {
        let listing: Invocation = self.invoker.invoke(sources, InvokeMode::Depend)?;
        if !listing.succeeded() {
            return Err(BuildError::Compilation {
                diagnostics: failure_diagnostics(listing.diagnostics, listing.exit_code),
            });
        }
        let warnings = listing.warnings().cloned().collect();
        debug!(entries = listing.dependencies.len(), "refreshed dependency graph");
        Ok((listing.dependencies, warnings))
    }
}

/// Sorts and deduplicates the source list.
fn normalize(sources: &[PathBuf]) -> Vec<PathBuf> {
    let set: BTreeSet<PathBuf> = sources.iter().cloned().collect();
    set.into_iter().collect()
}

/// Ensures a failed run carries at least one error diagnostic.
fn failure_diagnostics(mut diagnostics: Vec<Diagnostic>, exit_code: i32) -> Vec<Diagnostic> {
    if !diagnostics.iter().any(|d| d.severity.is_error()) {
        diagnostics.push(Diagnostic::error(
            format!("compiler exited with status {exit_code}"),
            None,
        ));
    }
    diagnostics
}

/// Decides which of the `changed` sources a failed generation run failed on.
///
/// An error located in a changed source fails that source. An error located in
/// some other file fails the changed sources that depend on it directly. An
/// error without a location, or one that can't be attributed either way, fails
/// every changed source.
fn failing_sources(
    changed: &[PathBuf],
    dependencies: &DependencyMap,
    diagnostics: &[Diagnostic],
) -> BTreeSet<PathBuf> {
    let all = || changed.iter().cloned().collect();
    let mut failing = BTreeSet::new();

    for diag in diagnostics.iter().filter(|d| d.severity.is_error()) {
        let Some(location) = &diag.location else {
            return all();
        };

        let direct: Vec<&PathBuf> = changed.iter().filter(|s| location.refers_to(s)).collect();
        if !direct.is_empty() {
            failing.extend(direct.into_iter().cloned());
            continue;
        }

        let dependents: Vec<&PathBuf> = changed
            .iter()
            .filter(|s| {
                dependencies
                    .get(*s)
                    .is_some_and(|deps| deps.iter().any(|d| location.refers_to(d)))
            })
            .collect();
        if dependents.is_empty() {
            return all();
        }
        failing.extend(dependents.into_iter().cloned());
    }
    failing
}
