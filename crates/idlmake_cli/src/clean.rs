//! `idlmake clean`: remove generated code and the persisted build state.

use crate::pipeline::{display_path, load_project, offline_coordinator};
use crate::GlobalArgs;

/// Runs the `idlmake clean` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let coordinator = offline_coordinator(&project)?;

    if !global.quiet {
        eprintln!("   Cleaning {}", project.name);
    }

    let removed = coordinator.clean()?;

    if !global.quiet {
        if global.verbose {
            for file in &removed {
                eprintln!("    Removed {}", display_path(&project.root, file));
            }
        }
        eprintln!("   Result: {} file(s) removed", removed.len());
    }
    Ok(0)
}
