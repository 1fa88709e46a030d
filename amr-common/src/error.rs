//! Common error types for the AMR catalog

use thiserror::Error;

/// Common result type for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the catalog service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource or submission not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Submission failed validation; carries the full ordered violation list
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Another catalog entry already uses this repository URL
    #[error("Duplicate repository URL: {0}")]
    DuplicateUrl(String),

    /// Taxonomy configuration missing or malformed at startup
    #[error("Taxonomy unavailable")]
    TaxonomyUnavailable,

    /// Content acquisition failure in the extraction pipeline
    #[error("Content fetch failed: {0}")]
    Fetch(String),

    /// Classifier call or response-shape failure in the extraction pipeline
    #[error("Classification failed: {0}")]
    Classify(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error indicates a missing record rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
