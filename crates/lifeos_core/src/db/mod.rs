//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the three storage engines.
//! - Apply each engine's schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked per database via `PRAGMA user_version`.
//! - No engine reads or writes data before its migrations succeed.
//!
//! # See also
//! - `repo::engine` for the engines built on these connections.

use thiserror::Error;

pub mod migrations;
mod open;

pub use migrations::Schema;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("{schema} database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        schema: Schema,
        db_version: u32,
        latest_supported: u32,
    },
}
