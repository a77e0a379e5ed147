//! `idlmake status`: dry run of the next build.
//!
//! Lists dependencies and checks timestamps exactly as `idlmake build` would,
//! but never generates code or writes state.

use idlmake_build::StatusReport;
use serde_json::json;

use crate::pipeline::{discover_sources, display_path, load_project, make_coordinator, render_diagnostics};
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// Runs the `idlmake status` command.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let sources = discover_sources(&project);
    let (mut coordinator, compiler_args) = make_coordinator(&project)?;

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!("   Checking {} ({} source(s))", project.name, sources.len());
    }

    let report = coordinator.status(&sources, &compiler_args)?;

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                render_diagnostics(&report.warnings, global);
            }
            for line in text_lines(&report, &project.root) {
                println!("{line}");
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&to_json(&report))
                .unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
    Ok(0)
}

fn text_lines(report: &StatusReport, root: &std::path::Path) -> Vec<String> {
    let mut lines = Vec::new();
    if report.full_rebuild {
        lines.push("full rebuild: no usable state for the current compiler arguments".to_string());
    }
    for (source, reason) in &report.stale {
        lines.push(format!("stale    {} ({reason})", display_path(root, source)));
    }
    for source in &report.removed_sources {
        lines.push(format!("removed  {}", display_path(root, source)));
    }
    if lines.is_empty() {
        lines.push("up to date".to_string());
    }
    lines
}

fn to_json(report: &StatusReport) -> serde_json::Value {
    let stale: Vec<_> = report
        .stale
        .iter()
        .map(|(source, reason)| {
            json!({
                "source": source.display().to_string(),
                "reason": reason.to_string(),
            })
        })
        .collect();
    let removed: Vec<String> = report
        .removed_sources
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    json!({
        "full_rebuild": report.full_rebuild,
        "stale": stale,
        "removed_sources": removed,
        "warnings": report.warnings,
    })
}
