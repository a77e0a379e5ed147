//! `idlmake build`: incremental code generation.
//!
//! 1. Find project root (walk up looking for `idlmake.toml`)
//! 2. Load and resolve config via `idlmake_config`
//! 3. Discover IDL sources
//! 4. Locate the compiler and run one build pass
//! 5. Render diagnostics and a summary

use idlmake_build::{BuildError, BuildReport};
use idlmake_diagnostics::{DiagnosticSink, Severity};

use crate::pipeline::{discover_sources, display_path, load_project, make_coordinator, render_diagnostics};
use crate::GlobalArgs;

/// Runs the `idlmake build` command.
///
/// Returns exit code 0 on success, 1 if any source failed to generate.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let sources = discover_sources(&project);

    if !global.quiet {
        eprintln!("   Building {} ({} source(s))", project.name, sources.len());
        if sources.is_empty() {
            eprintln!("warning: no IDL sources found; removing generated files");
        }
    }

    let (mut coordinator, args) = make_coordinator(&project)?;

    let sink = DiagnosticSink::new();
    let report = match coordinator.compile(&sources, &args) {
        Ok(report) => {
            sink.extend(report.warnings.iter().cloned());
            Some(report)
        }
        Err(BuildError::Compilation { diagnostics }) => {
            sink.extend(diagnostics);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let errors = sink.count(Severity::Error);
    let warnings = sink.count(Severity::Warning);
    let shown: Vec<_> = sink
        .take_all()
        .into_iter()
        .filter(|d| !global.quiet || d.severity.is_error())
        .collect();
    render_diagnostics(&shown, global);

    let Some(report) = report else {
        eprintln!("   Result: build failed with {errors} error(s), {warnings} warning(s)");
        return Ok(1);
    };

    if !global.quiet {
        if global.verbose {
            for source in &report.changed {
                eprintln!("  Generated {}", display_path(&project.root, source));
            }
        }
        eprintln!("   {}", summary(&report));
    }
    Ok(0)
}

fn summary(report: &BuildReport) -> String {
    if report.is_up_to_date() {
        return "Fresh: all generated code is up to date".to_string();
    }
    let mut line = format!(
        "Result: {} source(s) regenerated, {} stale file(s) removed, {} warning(s)",
        report.changed.len(),
        report.removed.len(),
        report.warnings.len()
    );
    if report.full_rebuild {
        line.push_str(" (compiler arguments changed)");
    }
    line
}
