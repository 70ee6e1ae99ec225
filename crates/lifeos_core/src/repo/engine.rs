//! Domain storage engine: the one shared connection and the units of work it opens.
//!
//! # Responsibility
//! - Own the domain database connection for the process.
//! - Run one closure per unit of work inside an immediate transaction.
//!
//! # Invariants
//! - The unit of work commits only when the closure returns `Ok`.
//! - Any `Err` (or a panic unwinding through the closure) rolls back.
//! - Closures are synchronous, so a unit of work never spans an await point
//!   and units of work cannot nest.

use crate::db::{open_db, open_db_in_memory, DbResult, Schema};
use crate::repo::unit_of_work::DomainUnitOfWork;
use crate::repo::RepoError;
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;

pub struct DomainStorageEngine {
    conn: Mutex<Connection>,
    uow_opened: AtomicU64,
}

impl DomainStorageEngine {
    /// Opens the domain database at `path`, or an in-memory one for `None`.
    pub fn open(path: Option<&Path>) -> DbResult<Self> {
        let conn = match path {
            Some(path) => open_db(path, Schema::Domain)?,
            None => open_db_in_memory(Schema::Domain)?,
        };
        Ok(Self {
            conn: Mutex::new(conn),
            uow_opened: AtomicU64::new(0),
        })
    }

    /// Runs `work` inside one transaction, committing on success.
    pub async fn with_uow<T, E>(
        &self,
        work: impl FnOnce(&DomainUnitOfWork<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let mut conn = self.conn.lock().await;
        let uow_index = self.uow_opened.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = Instant::now();

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| E::from(RepoError::from(err)))?;
        let outcome = work(&DomainUnitOfWork::new(&tx));
        match outcome {
            Ok(value) => {
                if let Err(err) = tx.commit() {
                    error!(
                        "event=uow module=repo status=error uow={} duration_ms={} error_code=commit_failed error={}",
                        uow_index,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(E::from(RepoError::from(err)));
                }
                info!(
                    "event=uow module=repo status=ok uow={} duration_ms={}",
                    uow_index,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                drop(tx);
                info!(
                    "event=uow module=repo status=rollback uow={} duration_ms={}",
                    uow_index,
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Runs read-only `work` on a deferred transaction that is always rolled back.
    ///
    /// Snapshots are not units of work and do not count towards `uow_open_count`.
    pub async fn with_snapshot<T, E>(
        &self,
        work: impl FnOnce(&DomainUnitOfWork<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(|err| E::from(RepoError::from(err)))?;
        let outcome = work(&DomainUnitOfWork::new(&tx));
        drop(tx);
        outcome
    }

    /// How many units of work this engine has opened.
    pub fn uow_open_count(&self) -> u64 {
        self.uow_opened.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::DomainStorageEngine;
    use crate::repo::RepoError;

    fn count_rows(engine: &DomainStorageEngine) -> i64 {
        let conn = engine.conn.try_lock().expect("unlocked");
        conn.query_row("SELECT COUNT(*) FROM records;", [], |row| row.get(0))
            .expect("count")
    }

    #[tokio::test]
    async fn failing_work_rolls_back() {
        let engine = DomainStorageEngine::open(None).expect("engine");
        let result: Result<(), RepoError> = engine
            .with_uow(|uow| {
                uow.connection().execute(
                    "INSERT INTO records (kind, parent_ref_id, key, created_time, last_modified_time, data)
                     VALUES ('probe', 1, 'k', 't', 't', '{}');",
                    [],
                )?;
                Err(RepoError::InvalidData("abort".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(count_rows(&engine), 0);
        assert_eq!(engine.uow_open_count(), 1);
    }

    #[tokio::test]
    async fn snapshots_never_persist_and_are_not_counted() {
        let engine = DomainStorageEngine::open(None).expect("engine");
        engine
            .with_snapshot(|uow| -> Result<(), RepoError> {
                uow.connection().execute(
                    "INSERT INTO records (kind, parent_ref_id, key, created_time, last_modified_time, data)
                     VALUES ('probe', 1, 'k', 't', 't', '{}');",
                    [],
                )?;
                Ok(())
            })
            .await
            .expect("snapshot");
        assert_eq!(count_rows(&engine), 0);
        assert_eq!(engine.uow_open_count(), 0);
    }

    #[tokio::test]
    async fn successful_work_commits() {
        let engine = DomainStorageEngine::open(None).expect("engine");
        engine
            .with_uow(|uow| -> Result<(), RepoError> {
                uow.connection().execute(
                    "INSERT INTO records (kind, parent_ref_id, key, created_time, last_modified_time, data)
                     VALUES ('probe', 1, 'k', 't', 't', '{}');",
                    [],
                )?;
                Ok(())
            })
            .await
            .expect("commit");
        assert_eq!(count_rows(&engine), 1);
    }
}
