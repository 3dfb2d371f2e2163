//! Error types for NextStat systematic-variation histogramming

use thiserror::Error;

/// NextStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed or incomplete systematic/histogram declaration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A requested input column is not defined
    #[error("missing column: '{0}'")]
    MissingColumn(String),

    /// A column with this name is already defined
    #[error("column already defined: '{0}'")]
    DuplicateColumn(String),

    /// A column has the wrong value type for its use
    #[error("column '{column}' has wrong type: expected {expected}, got {actual}")]
    ColumnType {
        /// Column name.
        column: String,
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// String expression failed to compile
    #[error("Expression error: {0}")]
    Expression(String),

    /// Parquet/Arrow input error
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
