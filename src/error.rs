use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while deriving or executing statements.
#[derive(Debug, Error)]
pub enum HelperError {
    /// The record exposes no fields, so no column list can be built.
    #[error("record for table `{table}` has no fields")]
    EmptyRecord { table: String },

    /// A field kind has no SQL mapping.
    #[error("field `{field}` has an unsupported kind")]
    UnsupportedKind { field: String },

    /// A table or column name is not a plain SQL identifier.
    #[error("`{0}` is not a valid SQL identifier")]
    InvalidIdentifier(String),

    /// A text value cannot be inlined as a literal without changing the statement.
    #[error("value of field `{field}` contains a single quote and cannot be inlined")]
    UnsafeLiteral { field: String },

    /// A float value has no SQL literal form (NaN or infinite).
    #[error("value of field `{field}` is not a finite number")]
    NonFiniteFloat { field: String },

    /// Record values disagree with the record's descriptors.
    #[error("value mismatch for `{field}`: {reason}")]
    ValueMismatch { field: String, reason: String },

    /// The statement text could not be prepared. Never retried.
    #[error("failed to prepare statement")]
    Prepare(#[source] rusqlite::Error),

    /// Parameters could not be bound to the prepared statement. Never retried.
    #[error("failed to bind statement parameters")]
    Bind(#[source] rusqlite::Error),

    /// Every execution round failed.
    #[error("failed to execute statement, {attempts} rounds exceeded")]
    RoundsExceeded {
        attempts: u32,
        #[source]
        last: rusqlite::Error,
    },

    /// The statement produces rows; run it through `with_connection` instead.
    #[error("statement returns rows")]
    ReturnsRows,

    /// A closure run against the locked connection failed.
    #[error("query failed")]
    Query(#[source] rusqlite::Error),

    /// A previous holder of the connection lock panicked.
    #[error("connection lock poisoned")]
    LockPoisoned,

    /// The database directory could not be created.
    #[error("failed to create database directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The database file could not be opened or configured.
    #[error("failed to open database {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, HelperError>;
