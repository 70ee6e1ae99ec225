//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register each engine's schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values remain monotonic within a schema.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;
use std::fmt::{Display, Formatter};

/// Which engine a database belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Domain,
    Search,
    UseCase,
}

impl Schema {
    fn migrations(self) -> &'static [Migration] {
        match self {
            Self::Domain => DOMAIN_MIGRATIONS,
            Self::Search => SEARCH_MIGRATIONS,
            Self::UseCase => USE_CASE_MIGRATIONS,
        }
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Domain => "domain",
            Self::Search => "search",
            Self::UseCase => "use_case",
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const DOMAIN_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("domain/0001_init.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("domain/0002_record_ranges.sql"),
    },
];

const SEARCH_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("search/0001_init.sql"),
}];

const USE_CASE_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("use_case/0001_init.sql"),
}];

/// Latest migration version known by this binary for `schema`.
pub fn latest_version(schema: Schema) -> u32 {
    schema
        .migrations()
        .last()
        .map_or(0, |migration| migration.version)
}

/// Applies all pending migrations of `schema` on the provided connection.
pub fn apply_migrations(conn: &mut Connection, schema: Schema) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version(schema);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            schema,
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in schema.migrations() {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

pub(crate) fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
