//! SQLite schema and statement derivation for flat records.
//!
//! # Intention
//!
//! - Derive `CREATE TABLE IF NOT EXISTS` and `INSERT INTO` statements from a
//!   record's ordered field descriptors.
//! - Execute statements against one embedded database connection, one at a
//!   time, retrying failed executions with exponential backoff.
//!
//! # Architectural Boundaries
//!
//! - Only create-table and insert-row derivation. No query builder.
//! - Opening the database file is a thin bootstrap in [`config`]; the engine
//!   itself is `rusqlite`'s bundled SQLite.

pub mod config;
pub mod error;
pub mod executor;
pub mod field;
pub mod row;
pub mod schema;

pub use config::{open_connection, DbConfig};
pub use error::{HelperError, Result};
pub use executor::{retry_with_backoff, RetryPolicy, Sleeper, StatementExecutor, ThreadSleeper};
pub use field::{FieldDescriptor, PrimitiveKind, Record, SqlField, Value};
pub use row::{build_bound_insert, build_insert, BoundStatement};
pub use schema::{
    build_create_table, build_drop_table, ColumnConstraint, ColumnDefinition, SqlType, TableSchema,
};

/// Crate version, as published in the manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
