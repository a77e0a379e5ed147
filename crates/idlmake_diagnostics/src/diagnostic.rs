//! Structured compiler diagnostics with an optional source location.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A `<path>:<line>` position reported by the compiler.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// The file named in the diagnostic, exactly as the compiler printed it.
    pub file: PathBuf,
    /// The 1-based line number.
    pub line: u32,
}

impl Location {
    /// Creates a new location.
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Returns `true` if this location refers to `path`.
    ///
    /// The compiler is invoked with absolute paths and normally echoes them
    /// back, but relative names are matched as a path suffix.
    pub fn refers_to(&self, path: &Path) -> bool {
        if self.file.is_absolute() {
            self.file == path
        } else {
            path.ends_with(&self.file)
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// A single classified line of compiler output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// Where the compiler says the problem is, if it said.
    pub location: Option<Location>,
    /// The message text with any `error:`/`warning:` marker stripped.
    pub message: String,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            severity: Severity::Error,
            location,
            message: message.into(),
        }
    }

    /// Creates a warning diagnostic.
    pub fn warning(message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            severity: Severity::Warning,
            location,
            message: message.into(),
        }
    }

    /// Creates a note diagnostic.
    pub fn note(message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            severity: Severity::Note,
            location,
            message: message.into(),
        }
    }

    /// Returns `true` if this diagnostic has no location (a general failure).
    pub fn is_general(&self) -> bool {
        self.location.is_none()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}: {}", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}
