//! Invocation of the external IDL compiler.
//!
//! The compiler is driven in two modes: [`InvokeMode::Depend`] lists the
//! dependencies of each source, and [`InvokeMode::Generate`] writes code and
//! reports which files it produced. Both modes print XML on stdout and free-form
//! diagnostics on stderr. [`CompilerInvoker`] is the seam the build coordinator
//! talks to; [`ProcessInvoker`] is the implementation that spawns the real tool.

#![warn(missing_docs)]

pub mod error;
pub mod invoker;
pub mod locate;
pub mod process;

pub use error::InvokeError;
pub use invoker::{CompilerInvoker, Invocation, InvokeMode};
pub use locate::locate_compiler;
pub use process::ProcessInvoker;
