//! Error types for rayo-db
//!
//! Every failure surfaces as a variant here with enough context to act on.
//! The benchmark harness deliberately never catches callable errors; they
//! propagate to the caller and abort the remaining trials.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// rayo-db error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQL parsing error
    #[error("SQL parse error: {0}")]
    Parse(String),

    /// Storage error (Parquet/Arrow)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input (unknown column, unsupported type, bad dimensions)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Registered function signature does not match the supplied columns
    #[error("Signature mismatch for UDF '{udf}': expected {expected}, got {actual}")]
    SignatureMismatch {
        /// Name of the registered function
        udf: String,
        /// Declared signature
        expected: String,
        /// What the query actually supplied
        actual: String,
    },

    /// Query invoked a function that was never registered
    #[error("Unknown function: '{0}' is not registered")]
    UnknownFunction(String),

    /// Query referenced a table that was never registered
    #[error("Unknown table: '{0}' is not registered")]
    UnknownTable(String),

    /// Model deserialization or prediction error
    #[error("Model error: {0}")]
    Model(String),

    /// Trial count too small for a trimmed mean
    #[error("Degenerate trial count: {0} (trimmed mean requires at least 3 trials)")]
    Degenerate(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow/Parquet error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Serialized model format error
    #[error("Model format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
