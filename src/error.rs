//! Error types for QAIL queryables.

use thiserror::Error;

/// Which single-record lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    First,
    Last,
    Find,
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::First => write!(f, "first"),
            Lookup::Last => write!(f, "last"),
            Lookup::Find => write!(f, "find"),
        }
    }
}

/// The main error type for queryable operations.
#[derive(Debug, Error)]
pub enum QueryError {
    /// `first()`, `last()` or `find()` matched no rows.
    #[error("Record not found: {lookup} on table '{table}' returned no rows")]
    NotFound { table: &'static str, lookup: Lookup },

    /// A chain call received an argument it cannot use.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A scalar query returned zero rows.
    #[error("No results: scalar query returned no rows")]
    NoResults,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A row could not be turned into a record.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Create an invalid-argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not-found error for the given table.
    pub fn not_found(table: &'static str, lookup: Lookup) -> Self {
        Self::NotFound { table, lookup }
    }

    /// True for the "scalar query came back empty" condition.
    pub fn is_no_results(&self) -> bool {
        matches!(self, Self::NoResults)
    }
}

/// Result type alias for queryable operations.
pub type QueryResult<T> = Result<T, QueryError>;
