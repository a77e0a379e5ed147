//! The compiler invocation seam.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use idlmake_diagnostics::{Diagnostic, Severity};
use idlmake_state::{ArtifactMap, DependencyMap};

use crate::error::InvokeError;

/// Which job the compiler is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeMode {
    /// List the dependencies of each source without generating code.
    Depend,
    /// Generate code and list the files written for each source.
    Generate,
}

impl fmt::Display for InvokeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeMode::Depend => write!(f, "depend"),
            InvokeMode::Generate => write!(f, "generate"),
        }
    }
}

/// The outcome of one compiler run.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Dependency edges reported in [`InvokeMode::Depend`]; empty otherwise.
    pub dependencies: DependencyMap,
    /// Files reported as written in [`InvokeMode::Generate`]; empty otherwise.
    pub generated: ArtifactMap,
    /// Classified stderr output.
    pub diagnostics: Vec<Diagnostic>,
    /// The process exit code; `-1` if the process was killed by a signal.
    pub exit_code: i32,
}

impl Invocation {
    /// Returns `true` if the compiler exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// Returns the warning diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

/// Runs the IDL compiler on behalf of the build coordinator.
pub trait CompilerInvoker {
    /// Runs the compiler over `sources` in the given mode.
    ///
    /// A compiler that runs and fails is reported through
    /// [`Invocation::exit_code`] and [`Invocation::diagnostics`]; `Err` is
    /// reserved for a compiler that could not be run at all.
    fn invoke(&mut self, sources: &[PathBuf], mode: InvokeMode) -> Result<Invocation, InvokeError>;

    /// Returns the modification time of the compiler executable, if known.
    fn compiler_mtime(&self) -> Option<SystemTime>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlmake_diagnostics::Location;

    #[test]
    fn invocation_filters_by_severity() {
        let inv = Invocation {
            diagnostics: vec![
                Diagnostic::warning("deprecated", Some(Location::new("A.ice", 2))),
                Diagnostic::error("syntax error", Some(Location::new("A.ice", 3))),
                Diagnostic::note("done", None),
            ],
            exit_code: 1,
            ..Default::default()
        };
        assert!(!inv.succeeded());
        assert_eq!(inv.errors().count(), 1);
        assert_eq!(inv.warnings().count(), 1);
    }

    #[test]
    fn mode_display() {
        assert_eq!(InvokeMode::Depend.to_string(), "depend");
        assert_eq!(InvokeMode::Generate.to_string(), "generate");
    }
}
