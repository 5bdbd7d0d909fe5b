//! Crate-wide error types
//!
//! All fallible operations in this crate return [`Result`], which is an
//! alias over [`Error`]. Per-event failures inside the pipeline (persistence
//! errors, overload drops) are contained at the worker or session boundary
//! and never surface through these types; only API-level operations do.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hub operations
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying database operation failed
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Configuration rejected at startup
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Inbound topic did not match the expected subject layout
    #[error("malformed topic: {0}")]
    MalformedTopic(String),
}
