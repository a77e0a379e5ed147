//! Parsing and validation of `idlmake.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`], then resolves it against the project root into a
//! [`ResolvedProject`] with absolute paths and the compiler argument vector.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_project, ResolvedProject};
pub use types::*;
