//! Incremental build orchestration for IDL compilers.
//!
//! [`BuildCoordinator`] runs one build pass: it refreshes the dependency graph,
//! selects stale sources, regenerates only those, merges the results into the
//! [`BuildState`](idlmake_state::BuildState), removes orphaned generated files
//! and persists the new state. [`FileTracker`] and [`ProjectSession`] serve
//! hosts that model sources as members of a project item tree.

#![warn(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod gc;
pub mod session;
pub mod tracker;

pub use coordinator::{BuildCoordinator, BuildReport, BuildSettings, Pass, StatusReport};
pub use error::BuildError;
pub use gc::{collect_garbage, generated_looking_files};
pub use session::ProjectSession;
pub use tracker::{FileTracker, ItemNode, ProjectItem, ReapOutcome};
