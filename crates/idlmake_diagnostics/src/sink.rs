//! Shared diagnostic accumulator.

use std::path::Path;
use std::sync::Mutex;

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Collects the diagnostics of one or more compiler invocations.
///
/// Emission takes `&self`, so a sink can be shared with the thread draining a
/// compiler's stderr.
#[derive(Default)]
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        self.lock().push(diag);
    }

    /// Records every diagnostic from an iterator.
    pub fn extend(&self, diags: impl IntoIterator<Item = Diagnostic>) {
        self.lock().extend(diags);
    }

    /// Returns `true` if an error was recorded.
    pub fn has_errors(&self) -> bool {
        self.lock().iter().any(|d| d.severity.is_error())
    }

    /// Returns how many diagnostics of `severity` were recorded.
    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|d| d.severity == severity).count()
    }

    /// Returns the diagnostics located in `path`.
    pub fn for_file(&self, path: &Path) -> Vec<Diagnostic> {
        self.lock()
            .iter()
            .filter(|d| d.location.as_ref().is_some_and(|l| l.refers_to(path)))
            .cloned()
            .collect()
    }

    /// Drains the sink.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// Returns a copy of everything recorded, in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics.lock().unwrap_or_else(|e| e.into_inner())
    }
}
