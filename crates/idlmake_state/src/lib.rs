//! Persisted incremental build state and staleness analysis.
//!
//! This crate owns the [`BuildState`] aggregate (dependency graph, artifact map
//! and last-used compiler arguments), its on-disk records, and the timestamp
//! based [`compute_changed`] analysis that decides which IDL sources must be
//! recompiled.

#![warn(missing_docs)]

pub mod error;
pub mod records;
pub mod staleness;
pub mod state;
pub mod store;

pub use error::StateError;
pub use records::{parse_dependencies, parse_generated, write_dependencies, write_generated};
pub use staleness::{check_source, compute_changed, stale_sources, FileSnapshot, StaleReason};
pub use state::{ArtifactMap, BuildState, DependencyMap};
pub use store::StateStore;
