//! Repository contracts, SQLite implementations and the unit of work.
//!
//! # Responsibility
//! - Persist entities, their index refs, their events and records.
//! - Bind repositories to one transaction per unit of work.
//!
//! # Invariants
//! - A save against a stale version fails with `VersionConflict`.
//! - Unique-key collisions surface as `EntityAlreadyExists`.
//! - Read paths reject invalid persisted state instead of masking it.
//!
//! # See also
//! - `db` for connection bootstrap and migrations.

use crate::db::DbError;
use crate::model::framework::{EntityId, InputValidationError};
use thiserror::Error;

pub mod engine;
pub mod entity_repo;
pub mod generic_repo;
pub mod record_repo;
pub mod unit_of_work;

pub use engine::DomainStorageEngine;
pub use entity_repo::{EntityRepository, RefFilter, SqliteEntityRepository, TrunkEntityRepository};
pub use generic_repo::SqliteGenericRepository;
pub use record_repo::{RecordRepository, SqliteRecordRepository};
pub use unit_of_work::DomainUnitOfWork;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{kind} {ref_id} does not exist")]
    EntityNotFound { kind: String, ref_id: EntityId },
    #[error("{kind} under {parent_ref_id} does not exist")]
    TrunkNotFound { kind: String, parent_ref_id: EntityId },
    #[error("{kind} record `{key}` under {parent_ref_id} does not exist")]
    RecordNotFound {
        kind: String,
        parent_ref_id: EntityId,
        key: String,
    },
    #[error("{kind} with key `{key}` already exists")]
    EntityAlreadyExists { kind: String, key: String },
    #[error("{kind} {ref_id} was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict {
        kind: String,
        ref_id: EntityId,
        expected: i64,
        actual: i64,
    },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    InputValidation(#[from] InputValidationError),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. } | Self::TrunkNotFound { .. } | Self::RecordNotFound { .. }
        )
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
