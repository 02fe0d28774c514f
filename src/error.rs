//! Error types for the feed relay.

use thiserror::Error;

/// Common error type for the feed relay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Database error.
    ///
    /// Covers failed config reads and failed watermark writes.
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source could not be reached, returned a bad status, or could not be parsed.
    #[error("source fetch error: {0}")]
    SourceFetch(String),

    /// The destination channel does not exist or is not reachable.
    #[error("destination unresolved: {0}")]
    DestinationUnresolved(String),

    /// Sending to a resolved channel failed.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Validation error for configuration or stored values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for RelayError {
    fn from(e: sqlx::Error) -> Self {
        RelayError::Database(e.to_string())
    }
}

/// Result type alias for feed relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
