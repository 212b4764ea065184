//! Error types for oplog translation.

use thiserror::Error;

/// The main error type for oplog2sql operations.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The entry's `op` is missing or not one of `i`, `u`, `d`.
    #[error("Unsupported operation type: {0}. Expected: i, u, or d")]
    UnsupportedOperation(String),

    /// The entry's `ns` is missing or not of the form `<db>.<table>`.
    #[error("Missing namespace: {0}")]
    MissingNamespace(String),

    /// The entry has no `o` payload object.
    #[error("Missing payload: 'o' key not found or not an object")]
    MissingPayload,

    /// An update entry has no `o.diff` object.
    #[error("Missing diff: 'diff' key not found in update payload")]
    MissingDiff,

    /// An update would produce an empty SET clause.
    #[error("Missing update clause for table {table}")]
    MissingUpdateClause { table: String },

    /// An update or delete would produce an empty WHERE clause.
    #[error("Missing condition clause for table {table}")]
    MissingConditionClause { table: String },

    /// Column and value lists diverged while building an INSERT.
    #[error("Key/value length mismatch while inserting into {table}: {keys} keys, {values} values")]
    KeyValueMismatch {
        table: String,
        keys: usize,
        values: usize,
    },

    /// A nested table would be created without any data column.
    #[error("No columns to create table {0}")]
    NoColumnsToCreate(String),

    /// Malformed JSON at the input boundary.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslateError {
    /// Create an unsupported-operation error from the raw `op` value.
    pub fn unsupported(op: Option<&serde_json::Value>) -> Self {
        match op {
            Some(v) => Self::UnsupportedOperation(v.to_string()),
            None => Self::UnsupportedOperation("<missing>".to_string()),
        }
    }

    /// Create a missing-namespace error.
    pub fn namespace(message: impl Into<String>) -> Self {
        Self::MissingNamespace(message.into())
    }

    /// Whether this error is fatal regardless of the error policy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Json(_) | Self::Io(_) | Self::Config(_))
    }
}

/// Result type alias for oplog2sql operations.
pub type TranslateResult<T> = Result<T, TranslateError>;
