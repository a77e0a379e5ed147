//! Diagnostics reported by the external IDL compiler.
//!
//! The compiler writes free-form text to stderr. [`classify_output`] turns it
//! into structured [`Diagnostic`] values with a [`Severity`] and, when the line
//! carries a `<path>:<line>:` prefix, a source [`Location`]. The thread-safe
//! [`DiagnosticSink`] accumulates diagnostics across a build pass and
//! [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod classify;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use classify::{classify_output, split_location};
pub use diagnostic::{Diagnostic, Location};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
