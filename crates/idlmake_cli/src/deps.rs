//! `idlmake deps`: print the dependency graph recorded by the last build.
//!
//! Edges are one hop, exactly as the compiler reported them. Cycles are legal
//! in the recorded graph and are only reported here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use idlmake_state::{DependencyMap, StateStore};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::json;

use crate::pipeline::{display_path, load_project};
use crate::{DepsArgs, GlobalArgs, ReportFormat};

/// Runs the `idlmake deps` command.
pub fn run(args: &DepsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let state = StateStore::new(&project.state_dir).load();

    if state.dependencies.is_empty() && !global.quiet {
        eprintln!("warning: no recorded dependencies; run `idlmake build` first");
    }

    let cycles = find_cycles(&state.dependencies);

    match args.format {
        ReportFormat::Text => {
            for line in text_lines(&state.dependencies, &project.root) {
                println!("{line}");
            }
            if !global.quiet {
                for cycle in &cycles {
                    let names: Vec<String> =
                        cycle.iter().map(|p| display_path(&project.root, p)).collect();
                    eprintln!("warning: dependency cycle: {}", names.join(" -> "));
                }
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&to_json(&state.dependencies, &cycles))
                .unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
    Ok(0)
}

/// Returns every dependency cycle as a sorted list of its members.
///
/// A cycle is a strongly connected component with more than one node, or a
/// single source that lists itself.
pub fn find_cycles(dependencies: &DependencyMap) -> Vec<Vec<PathBuf>> {
    let mut graph: DiGraph<PathBuf, ()> = DiGraph::new();
    let mut index: BTreeMap<PathBuf, NodeIndex> = BTreeMap::new();

    for (source, deps) in dependencies {
        let from = node_for(&mut graph, &mut index, source);
        for dep in deps {
            let to = node_for(&mut graph, &mut index, dep);
            graph.add_edge(from, to, ());
        }
    }

    let mut cycles: Vec<Vec<PathBuf>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<PathBuf> = scc.iter().map(|&i| graph[i].clone()).collect();
            members.sort();
            members
        })
        .collect();
    cycles.sort();
    cycles
}

fn node_for(
    graph: &mut DiGraph<PathBuf, ()>,
    index: &mut BTreeMap<PathBuf, NodeIndex>,
    path: &Path,
) -> NodeIndex {
    if let Some(&i) = index.get(path) {
        return i;
    }
    let i = graph.add_node(path.to_path_buf());
    index.insert(path.to_path_buf(), i);
    i
}

fn text_lines(dependencies: &DependencyMap, root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (source, deps) in dependencies {
        lines.push(display_path(root, source));
        for dep in deps {
            lines.push(format!("    -> {}", display_path(root, dep)));
        }
    }
    lines
}

fn to_json(dependencies: &DependencyMap, cycles: &[Vec<PathBuf>]) -> serde_json::Value {
    let graph: serde_json::Map<String, serde_json::Value> = dependencies
        .iter()
        .map(|(source, deps)| {
            let deps: Vec<String> = deps.iter().map(|d| d.display().to_string()).collect();
            (source.display().to_string(), json!(deps))
        })
        .collect();
    let cycles: Vec<Vec<String>> = cycles
        .iter()
        .map(|c| c.iter().map(|p| p.display().to_string()).collect())
        .collect();
    json!({
        "dependencies": graph,
        "cycles": cycles,
    })
}
