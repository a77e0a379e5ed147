//! Shared pipeline helpers for CLI commands.
//!
//! Contains the steps every command starts with: project root resolution,
//! configuration loading, source discovery and coordinator construction.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use idlmake_build::{BuildCoordinator, BuildSettings};
use idlmake_common::CompilerArgs;
use idlmake_compiler::{locate_compiler, ProcessInvoker};
use idlmake_config::{resolve_project, ResolvedProject, CONFIG_FILE};
use idlmake_diagnostics::{Diagnostic, DiagnosticRenderer, TerminalRenderer};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `idlmake.toml`.
///
/// Returns the directory containing `idlmake.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `idlmake.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Finds, loads and resolves the project configuration.
///
/// The root is canonicalized so that every resolved path is absolute.
pub fn load_project(global: &GlobalArgs) -> Result<ResolvedProject, Box<dyn std::error::Error>> {
    let root = resolve_project_root(global)?;
    let root = std::fs::canonicalize(&root)
        .map_err(|e| format!("cannot open project directory {}: {e}", root.display()))?;
    let config = idlmake_config::load_config(&root)?;
    Ok(resolve_project(&config, &root))
}

/// Expands the configured source entries into the project's source set.
///
/// Directory entries are walked recursively for files with one of the
/// configured extensions; the output directory is never descended into.
/// File entries are taken as-is, even when they do not exist yet. The result
/// is sorted and free of duplicates.
pub fn discover_sources(project: &ResolvedProject) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();
    for entry in &project.sources {
        if !entry.is_dir() {
            if !entry.exists() {
                warn!(path = %entry.display(), "configured source does not exist");
            }
            found.insert(entry.clone());
            continue;
        }

        let files = WalkDir::new(entry)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.path() != project.output_dir)
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| has_extension(e.path(), &project.extensions))
            .map(|e| e.into_path());
        found.extend(files);
    }
    debug!(count = found.len(), "discovered sources");
    found.into_iter().collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}

/// Locates the compiler and builds a coordinator that runs it.
///
/// Returns the coordinator together with the argument vector identifying this
/// configuration.
pub fn make_coordinator(
    project: &ResolvedProject,
) -> Result<(BuildCoordinator<ProcessInvoker>, CompilerArgs), Box<dyn std::error::Error>> {
    let executable = locate_compiler(&project.compiler, project.compiler_home.as_deref())?;
    debug!(compiler = %executable.display(), "located compiler");
    let args = project.compiler_args(&executable);
    let invoker = ProcessInvoker::new(
        args.clone(),
        project.depend_flag.as_str(),
        project.generate_flag.as_str(),
    )?;
    let coordinator = BuildCoordinator::new(invoker, BuildSettings::from(project));
    Ok((coordinator, args))
}

/// Builds a coordinator for commands that never run the compiler.
///
/// The compiler is not located, so this works on machines without it.
pub fn offline_coordinator(
    project: &ResolvedProject,
) -> Result<BuildCoordinator<ProcessInvoker>, Box<dyn std::error::Error>> {
    let invoker = ProcessInvoker::new(
        project.compiler_args(&project.compiler),
        project.depend_flag.as_str(),
        project.generate_flag.as_str(),
    )?;
    Ok(BuildCoordinator::new(invoker, BuildSettings::from(project)))
}

/// Renders diagnostics to stderr.
pub fn render_diagnostics(diagnostics: &[Diagnostic], global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color);
    for diag in diagnostics {
        eprintln!("{}", renderer.render(diag));
    }
}

/// Formats `path` relative to the project root when it lies inside it.
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
