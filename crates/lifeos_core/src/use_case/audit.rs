//! Audit journal of mutation invocations, in its own database.

use crate::db::{open_db, open_db_in_memory, DbError, Schema};
use crate::model::framework::enum_value::enum_value;
use crate::model::framework::{EntityId, Timestamp};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;

enum_value! {
    pub enum InvocationResult("invocation_result") {
        Success => "success",
        Failure => "failure",
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid audit row: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for AuditError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub type AuditResult<T> = Result<T, AuditError>;

/// One audited mutation; `args` is the JSON of the invocation arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationUseCaseInvocationRecord {
    pub user_ref_id: Option<EntityId>,
    pub workspace_ref_id: Option<EntityId>,
    pub timestamp: Timestamp,
    pub name: String,
    pub args: String,
    pub result: InvocationResult,
    pub error_str: Option<String>,
}

pub struct UseCaseStorageEngine {
    conn: Mutex<Connection>,
}

impl UseCaseStorageEngine {
    pub fn open(path: Option<&Path>) -> AuditResult<Self> {
        let conn = match path {
            Some(path) => open_db(path, Schema::UseCase)?,
            None => open_db_in_memory(Schema::UseCase)?,
        };
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn record(&self, record: &MutationUseCaseInvocationRecord) -> AuditResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO mutation_use_case_invocation_records (
                user_ref_id, workspace_ref_id, timestamp, name, args, result, error_str
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                record.user_ref_id.map(EntityId::as_i64),
                record.workspace_ref_id.map(EntityId::as_i64),
                record.timestamp.to_string(),
                record.name,
                record.args,
                record.result.as_str(),
                record.error_str,
            ],
        )?;
        Ok(())
    }

    /// Newest first.
    pub async fn find_for_workspace(
        &self,
        workspace_ref_id: EntityId,
        limit: u32,
    ) -> AuditResult<Vec<MutationUseCaseInvocationRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT user_ref_id, workspace_ref_id, timestamp, name, args, result, error_str
             FROM mutation_use_case_invocation_records
             WHERE workspace_ref_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2;",
        )?;
        let rows = stmt.query_map(params![workspace_ref_id.as_i64(), limit], RawRow::read)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.parse()?);
        }
        Ok(records)
    }

    /// Rows whose name is `name`, oldest first.
    pub async fn find_by_name(&self, name: &str) -> AuditResult<Vec<MutationUseCaseInvocationRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT user_ref_id, workspace_ref_id, timestamp, name, args, result, error_str
             FROM mutation_use_case_invocation_records
             WHERE name = ?1
             ORDER BY timestamp ASC, id ASC;",
        )?;
        let rows = stmt.query_map([name], RawRow::read)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.parse()?);
        }
        Ok(records)
    }
}

struct RawRow {
    user_ref_id: Option<i64>,
    workspace_ref_id: Option<i64>,
    timestamp: String,
    name: String,
    args: String,
    result: String,
    error_str: Option<String>,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_ref_id: row.get(0)?,
            workspace_ref_id: row.get(1)?,
            timestamp: row.get(2)?,
            name: row.get(3)?,
            args: row.get(4)?,
            result: row.get(5)?,
            error_str: row.get(6)?,
        })
    }

    fn parse(self) -> AuditResult<MutationUseCaseInvocationRecord> {
        Ok(MutationUseCaseInvocationRecord {
            user_ref_id: self.user_ref_id.map(EntityId::from_raw),
            workspace_ref_id: self.workspace_ref_id.map(EntityId::from_raw),
            timestamp: self
                .timestamp
                .parse()
                .map_err(|_| AuditError::InvalidData(format!("timestamp `{}`", self.timestamp)))?,
            name: self.name,
            args: self.args,
            result: self
                .result
                .parse()
                .map_err(|_| AuditError::InvalidData(format!("result `{}`", self.result)))?,
            error_str: self.error_str,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{InvocationResult, MutationUseCaseInvocationRecord, UseCaseStorageEngine};
    use crate::model::framework::EntityId;

    #[tokio::test]
    async fn records_read_back_newest_first() {
        let engine = UseCaseStorageEngine::open(None).expect("engine");
        let ws = EntityId::from_raw(4);
        for (at, name, result) in [
            ("2024-03-04T09:00:00Z", "big_plan_create", InvocationResult::Success),
            ("2024-03-04T10:00:00Z", "big_plan_milestone_create", InvocationResult::Failure),
        ] {
            engine
                .record(&MutationUseCaseInvocationRecord {
                    user_ref_id: Some(EntityId::from_raw(1)),
                    workspace_ref_id: Some(ws),
                    timestamp: at.parse().expect("timestamp"),
                    name: name.to_string(),
                    args: "{}".to_string(),
                    result,
                    error_str: (result == InvocationResult::Failure).then(|| "boom".to_string()),
                })
                .await
                .expect("record");
        }
        let rows = engine.find_for_workspace(ws, 10).await.expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "big_plan_milestone_create");
        assert_eq!(rows[0].error_str.as_deref(), Some("boom"));
        assert_eq!(engine.find_by_name("big_plan_create").await.expect("rows").len(), 1);
    }
}
