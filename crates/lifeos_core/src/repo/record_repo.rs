//! Record repositories over the keyed `records` table.
//!
//! # Invariants
//! - `(kind, parent_ref_id, key)` identifies at most one record.
//! - Range queries compare keys as text, so range-queried kinds use sortable keys.

use crate::model::framework::{EntityId, Record};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use std::marker::PhantomData;

pub trait RecordRepository<R: Record> {
    /// Inserts or replaces the record under its key.
    fn upsert(&self, record: R) -> RepoResult<R>;
    fn load_by_key(&self, parent_ref_id: EntityId, key: &str) -> RepoResult<R>;
    fn load_optional(&self, parent_ref_id: EntityId, key: &str) -> RepoResult<Option<R>>;
    fn find_all(&self, parent_ref_id: EntityId) -> RepoResult<Vec<R>>;
    /// Records with `from <= key <= to`, ordered by key.
    fn find_range(&self, parent_ref_id: EntityId, from: &str, to: &str) -> RepoResult<Vec<R>>;
    fn remove(&self, parent_ref_id: EntityId, key: &str) -> RepoResult<()>;
    fn remove_all_for_parent(&self, parent_ref_id: EntityId) -> RepoResult<usize>;
}

pub struct SqliteRecordRepository<'conn, R> {
    conn: &'conn Connection,
    _kind: PhantomData<fn() -> R>,
}

impl<'conn, R: Record> SqliteRecordRepository<'conn, R> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _kind: PhantomData,
        }
    }

    fn query_records(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<R>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row::<R>(row)?);
        }
        Ok(records)
    }
}

impl<R: Record> RecordRepository<R> for SqliteRecordRepository<'_, R> {
    fn upsert(&self, record: R) -> RepoResult<R> {
        let data = serde_json::to_string(&record)
            .map_err(|err| RepoError::InvalidData(format!("unencodable {} record: {err}", R::KIND)))?;
        self.conn.execute(
            "INSERT INTO records (kind, parent_ref_id, key, created_time, last_modified_time, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(kind, parent_ref_id, key) DO UPDATE SET
                last_modified_time = excluded.last_modified_time,
                data = excluded.data;",
            params![
                R::KIND,
                record.parent_ref_id().as_i64(),
                record.raw_key(),
                record.created_time().to_string(),
                record.last_modified_time().to_string(),
                data,
            ],
        )?;
        Ok(record)
    }

    fn load_by_key(&self, parent_ref_id: EntityId, key: &str) -> RepoResult<R> {
        self.load_optional(parent_ref_id, key)?
            .ok_or_else(|| RepoError::RecordNotFound {
                kind: R::KIND.to_string(),
                parent_ref_id,
                key: key.to_string(),
            })
    }

    fn load_optional(&self, parent_ref_id: EntityId, key: &str) -> RepoResult<Option<R>> {
        Ok(self
            .query_records(
                "SELECT data FROM records WHERE kind = ?1 AND parent_ref_id = ?2 AND key = ?3;",
                &[&R::KIND, &parent_ref_id.as_i64(), &key],
            )?
            .into_iter()
            .next())
    }

    fn find_all(&self, parent_ref_id: EntityId) -> RepoResult<Vec<R>> {
        self.query_records(
            "SELECT data FROM records WHERE kind = ?1 AND parent_ref_id = ?2 ORDER BY key ASC;",
            &[&R::KIND, &parent_ref_id.as_i64()],
        )
    }

    fn find_range(&self, parent_ref_id: EntityId, from: &str, to: &str) -> RepoResult<Vec<R>> {
        self.query_records(
            "SELECT data FROM records
             WHERE kind = ?1 AND parent_ref_id = ?2 AND key >= ?3 AND key <= ?4
             ORDER BY key ASC;",
            &[&R::KIND, &parent_ref_id.as_i64(), &from, &to],
        )
    }

    fn remove(&self, parent_ref_id: EntityId, key: &str) -> RepoResult<()> {
        let removed = self.conn.execute(
            "DELETE FROM records WHERE kind = ?1 AND parent_ref_id = ?2 AND key = ?3;",
            params![R::KIND, parent_ref_id.as_i64(), key],
        )?;
        if removed == 0 {
            return Err(RepoError::RecordNotFound {
                kind: R::KIND.to_string(),
                parent_ref_id,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn remove_all_for_parent(&self, parent_ref_id: EntityId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM records WHERE kind = ?1 AND parent_ref_id = ?2;",
            params![R::KIND, parent_ref_id.as_i64()],
        )?)
    }
}

fn parse_record_row<R: Record>(row: &Row<'_>) -> RepoResult<R> {
    let data: String = row.get(0)?;
    serde_json::from_str(&data)
        .map_err(|err| RepoError::InvalidData(format!("invalid {} record: {err}", R::KIND)))
}
