//! Error types for build passes.

use std::path::PathBuf;

use idlmake_compiler::InvokeError;
use idlmake_diagnostics::Diagnostic;
use idlmake_state::StateError;

/// Errors that can occur during a build pass.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The compiler executable is absent. Nothing was changed.
    #[error("compiler not found: {path}")]
    ToolNotFound {
        /// The executable that was looked for.
        path: PathBuf,
    },

    /// The compiler could not be started or its pipes failed. Nothing was changed.
    #[error("failed to run {tool}: {source}")]
    ToolInvocationFailed {
        /// The executable that was run.
        tool: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compiler ran and reported errors.
    ///
    /// Carries every diagnostic from the failing run, warnings included.
    #[error("{}", compilation_summary(.diagnostics))]
    Compilation {
        /// The classified compiler output.
        diagnostics: Vec<Diagnostic>,
    },

    /// Persisting the build state failed; the previous records stay in place.
    #[error(transparent)]
    State(#[from] StateError),
}

impl BuildError {
    /// Returns the compiler diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            BuildError::Compilation { diagnostics } => diagnostics,
            _ => &[],
        }
    }
}

impl From<InvokeError> for BuildError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::ToolNotFound { path } => BuildError::ToolNotFound { path },
            InvokeError::ToolInvocationFailed { tool, source } => {
                BuildError::ToolInvocationFailed { tool, source }
            }
        }
    }
}

fn compilation_summary(diagnostics: &[Diagnostic]) -> String {
    let errors = diagnostics.iter().filter(|d| d.severity.is_error()).count();
    match errors {
        1 => "compilation failed with 1 error".to_string(),
        n => format!("compilation failed with {n} errors"),
    }
}
