//! Error types for duolog sinks and writers

use std::io;
use std::path::PathBuf;

/// Result type for duolog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by sinks, writers and collaborators at construction time
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error while writing or flushing a sink
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to create the log directory
    #[error("Failed to create log directory at {path}: {source}")]
    CreateDirectory {
        /// The directory that could not be created
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Invalid writer or rotation configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The terminal could not be prepared for colored output
    #[error("Unable to enable colors: {0}")]
    Color(String),
}
