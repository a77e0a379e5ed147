//! Error types for build state operations.

use std::path::PathBuf;

/// Errors that can occur while reading or writing persisted build state.
///
/// Loading is fail-safe: unreadable or corrupt records are logged and treated
/// as "no prior state". These errors surface from record parsing and from
/// saving, where a failure must not be silently ignored.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// An I/O error occurred while reading or writing a state record.
    #[error("build state I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A dependency or artifact record could not be parsed as XML.
    #[error("failed to parse {record} record: {reason}")]
    Parse {
        /// Which record failed (`dependencies` or `generated`).
        record: &'static str,
        /// Description of the parse failure.
        reason: String,
    },

    /// A record could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
