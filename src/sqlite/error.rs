//! Error taxonomy for the mapping and execution layer.
//!
//! Metadata and SQL-construction failures are raised before a statement
//! reaches the engine. Engine failures are wrapped unchanged.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SqliteError>;

#[derive(Debug, Error)]
pub enum SqliteError {
    /// Bad or ambiguous entity metadata (collision, missing table name, bad index).
    #[error("mapping error: {0}")]
    Mapping(String),

    /// Malformed query construction, e.g. a relational operator against NULL.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown column '{column}' for entity {entity}")]
    UnknownColumn { column: String, entity: String },

    #[error("entity {entity} has no primary key")]
    MissingPrimaryKey { entity: String },

    #[error("operation attempted on a completed scope (state: {state})")]
    InvalidOperationOnCompletedScope { state: &'static str },

    #[error("unit of work has been disposed")]
    ObjectDisposed,

    /// Uniqueness, not-null, check and foreign-key failures as reported by SQLite.
    #[error("constraint violation: {message}")]
    ConstraintViolation {
        message: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot convert column '{column}': {message}")]
    Conversion { column: String, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl SqliteError {
    pub(crate) fn mapping(entity: &str, reason: impl std::fmt::Display) -> Self {
        SqliteError::Mapping(format!("{entity}: {reason}"))
    }

    pub(crate) fn conversion(column: &str, message: impl Into<String>) -> Self {
        SqliteError::Conversion {
            column: column.to_string(),
            message: message.into(),
        }
    }

    /// True for failures raised by the engine's constraint checks.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, SqliteError::ConstraintViolation { .. })
    }
}

/// Wrap a rusqlite error, surfacing constraint failures as their own variant.
pub fn from_rusqlite(err: rusqlite::Error) -> SqliteError {
    match &err {
        rusqlite::Error::SqliteFailure(ffi, msg) if ffi.code == ErrorCode::ConstraintViolation => {
            let message = msg.clone().unwrap_or_else(|| ffi.to_string());
            SqliteError::ConstraintViolation {
                message,
                source: err,
            }
        }
        _ => SqliteError::Database(err),
    }
}
