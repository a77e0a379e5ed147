//! Shared foundational types used across the idlmake build orchestrator.
//!
//! This crate provides the compiler argument vector that identifies an
//! invocation configuration, and file timestamp helpers used by staleness
//! analysis and garbage collection.

#![warn(missing_docs)]

pub mod args;
pub mod mtime;

pub use args::CompilerArgs;
pub use mtime::{file_mtime, is_newer};
