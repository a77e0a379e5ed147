//! Error types for compiler invocation.

use std::path::PathBuf;

/// Errors that prevent the compiler from producing a usable result.
///
/// A compiler that runs and reports errors is not an `InvokeError`: its
/// diagnostics and exit code are returned in an
/// [`Invocation`](crate::Invocation).
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The compiler executable could not be found.
    #[error("compiler not found: {path}")]
    ToolNotFound {
        /// The executable that was looked for.
        path: PathBuf,
    },

    /// The compiler could not be started, or its pipes failed.
    #[error("failed to run {tool}: {source}")]
    ToolInvocationFailed {
        /// The executable that was run.
        tool: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = InvokeError::ToolNotFound {
            path: PathBuf::from("slice2java"),
        };
        assert_eq!(err.to_string(), "compiler not found: slice2java");
    }

    #[test]
    fn invocation_failed_display() {
        let err = InvokeError::ToolInvocationFailed {
            tool: PathBuf::from("/opt/Ice/bin/slice2java"),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/opt/Ice/bin/slice2java"));
        assert!(msg.contains("pipe closed"));
    }
}
