//! Free-text search over entity names, one index per workspace.
//!
//! # Responsibility
//! - Own the search database connection.
//! - Apply entity changes published after a unit of work commits.
//! - Answer ranked name queries scoped to one workspace.
//!
//! # Invariants
//! - The index is derived state; the domain database stays the source of truth.
//! - `(workspace_ref_id, entity_kind, ref_id)` identifies at most one entry.

mod fts;

pub use fts::{SearchHit, SearchQuery};

use crate::db::{open_db, open_db_in_memory, DbError, DbResult, Schema};
use crate::model::framework::{EntityId, Timestamp};
use log::{error, info};
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid full-text query `{query}`: {message}")]
    InvalidQuery { query: String, message: String },
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid search row: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Indexed projection of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    pub entity_kind: String,
    pub ref_id: EntityId,
    pub name: String,
    pub archived: bool,
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
    pub archived_time: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchChange {
    Upsert(SearchEntry),
    Remove { entity_kind: String, ref_id: EntityId },
}

pub struct SearchStorageEngine {
    conn: Mutex<Connection>,
}

impl SearchStorageEngine {
    pub fn open(path: Option<&Path>) -> DbResult<Self> {
        let conn = match path {
            Some(path) => open_db(path, Schema::Search)?,
            None => open_db_in_memory(Schema::Search)?,
        };
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Applies `changes` for `workspace_ref_id` in one transaction.
    pub async fn apply(&self, workspace_ref_id: EntityId, changes: &[SearchChange]) -> SearchResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let started_at = Instant::now();
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for change in changes {
            match change {
                SearchChange::Upsert(entry) => upsert_entry(&tx, workspace_ref_id, entry)?,
                SearchChange::Remove { entity_kind, ref_id } => {
                    tx.execute(
                        "DELETE FROM search_entries
                         WHERE workspace_ref_id = ?1 AND entity_kind = ?2 AND ref_id = ?3;",
                        params![workspace_ref_id.as_i64(), entity_kind, ref_id.as_i64()],
                    )?;
                }
            }
        }
        if let Err(err) = tx.commit() {
            error!(
                "event=search_apply module=search status=error workspace={} changes={} error={}",
                workspace_ref_id,
                changes.len(),
                err
            );
            return Err(err.into());
        }
        info!(
            "event=search_apply module=search status=ok workspace={} changes={} duration_ms={}",
            workspace_ref_id,
            changes.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    pub async fn upsert(&self, workspace_ref_id: EntityId, entry: SearchEntry) -> SearchResult<()> {
        self.apply(workspace_ref_id, &[SearchChange::Upsert(entry)]).await
    }

    pub async fn remove(&self, workspace_ref_id: EntityId, entity_kind: &str, ref_id: EntityId) -> SearchResult<()> {
        self.apply(
            workspace_ref_id,
            &[SearchChange::Remove {
                entity_kind: entity_kind.to_string(),
                ref_id,
            }],
        )
        .await
    }

    pub async fn search(&self, workspace_ref_id: EntityId, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
        let conn = self.conn.lock().await;
        fts::search_workspace(&conn, workspace_ref_id, query)
    }

    /// Drops every entry of `workspace_ref_id`.
    pub async fn clear_workspace(&self, workspace_ref_id: EntityId) -> SearchResult<usize> {
        let conn = self.conn.lock().await;
        Ok(conn.execute(
            "DELETE FROM search_entries WHERE workspace_ref_id = ?1;",
            [workspace_ref_id.as_i64()],
        )?)
    }
}

fn upsert_entry(conn: &Connection, workspace_ref_id: EntityId, entry: &SearchEntry) -> SearchResult<()> {
    conn.execute(
        "INSERT INTO search_entries (
            workspace_ref_id, entity_kind, ref_id, name, archived,
            created_time, last_modified_time, archived_time
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(workspace_ref_id, entity_kind, ref_id) DO UPDATE SET
            name = excluded.name,
            archived = excluded.archived,
            last_modified_time = excluded.last_modified_time,
            archived_time = excluded.archived_time;",
        params![
            workspace_ref_id.as_i64(),
            entry.entity_kind,
            entry.ref_id.as_i64(),
            entry.name,
            i64::from(entry.archived),
            entry.created_time.to_string(),
            entry.last_modified_time.to_string(),
            entry.archived_time.map(|at| at.to_string()),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SearchChange, SearchEntry, SearchQuery, SearchStorageEngine};
    use crate::model::framework::{EntityId, Timestamp};

    fn entry(kind: &str, ref_id: i64, name: &str) -> SearchEntry {
        let at: Timestamp = "2024-03-04T09:00:00Z".parse().expect("timestamp");
        SearchEntry {
            entity_kind: kind.to_string(),
            ref_id: EntityId::from_raw(ref_id),
            name: name.to_string(),
            archived: false,
            created_time: at,
            last_modified_time: at,
            archived_time: None,
        }
    }

    #[tokio::test]
    async fn search_is_scoped_to_the_workspace() {
        let engine = SearchStorageEngine::open(None).expect("engine");
        let ws_a = EntityId::from_raw(1);
        let ws_b = EntityId::from_raw(2);
        engine.upsert(ws_a, entry("inbox_task", 10, "Buy groceries")).await.expect("upsert");
        engine.upsert(ws_b, entry("inbox_task", 11, "Buy stamps")).await.expect("upsert");

        let hits = engine.search(ws_a, &SearchQuery::new("buy")).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].ref_id, EntityId::from_raw(10));
        assert!(hits[0].snippet.contains("[Buy]"));
    }

    #[tokio::test]
    async fn upsert_replaces_and_remove_deletes() {
        let engine = SearchStorageEngine::open(None).expect("engine");
        let ws = EntityId::from_raw(1);
        engine
            .apply(
                ws,
                &[
                    SearchChange::Upsert(entry("big_plan", 5, "Launch rocket")),
                    SearchChange::Upsert(entry("big_plan", 5, "Launch boat")),
                ],
            )
            .await
            .expect("apply");
        assert!(engine.search(ws, &SearchQuery::new("rocket")).await.expect("search").is_empty());
        assert_eq!(engine.search(ws, &SearchQuery::new("boat")).await.expect("search").len(), 1);

        engine.remove(ws, "big_plan", EntityId::from_raw(5)).await.expect("remove");
        assert!(engine.search(ws, &SearchQuery::new("boat")).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn kind_filter_and_blank_queries() {
        let engine = SearchStorageEngine::open(None).expect("engine");
        let ws = EntityId::from_raw(1);
        engine.upsert(ws, entry("habit", 3, "Morning run")).await.expect("upsert");
        engine.upsert(ws, entry("chore", 4, "Morning dishes")).await.expect("upsert");

        let mut query = SearchQuery::new("morning");
        query.entity_kinds = vec!["chore".to_string()];
        let hits = engine.search(ws, &query).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_kind, "chore");
        assert!(engine.search(ws, &SearchQuery::new("   ")).await.expect("blank").is_empty());
    }
}
