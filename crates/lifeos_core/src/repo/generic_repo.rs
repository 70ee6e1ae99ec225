//! Kind-erased lookups used by the traversal walkers.

use crate::model::framework::{EntityId, RefResolver};
use crate::repo::entity_repo::placeholders;
use crate::repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

/// Summary columns of an entity row, readable without knowing its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRowSummary {
    pub kind: String,
    pub ref_id: EntityId,
    pub parent_ref_id: Option<EntityId>,
    pub name: String,
    pub archived: bool,
}

pub struct SqliteGenericRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGenericRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Ids of `child_kind` entities linked to `owner_ref_id` through `resolver`.
    pub fn find_child_ids(
        &self,
        child_kind: &str,
        resolver: RefResolver,
        owner_ref_id: EntityId,
        filters: &[(&str, &str)],
        include_archived: bool,
    ) -> RepoResult<Vec<EntityId>> {
        let mut sql = String::from("SELECT ref_id FROM entities WHERE kind = ?");
        let mut bind_values = vec![Value::Text(child_kind.to_string())];
        match resolver {
            RefResolver::Parent => {
                sql.push_str(" AND parent_ref_id = ?");
                bind_values.push(Value::Integer(owner_ref_id.as_i64()));
            }
            RefResolver::IsRefId(field) | RefResolver::IsOneOfRefId(field) => {
                sql.push_str(
                    " AND ref_id IN (SELECT ref_id FROM entity_refs WHERE field = ? AND value = ?)",
                );
                bind_values.push(Value::Text(field.to_string()));
                bind_values.push(Value::Text(owner_ref_id.to_string()));
            }
        }
        for (field, value) in filters {
            sql.push_str(" AND ref_id IN (SELECT ref_id FROM entity_refs WHERE field = ? AND value = ?)");
            bind_values.push(Value::Text((*field).to_string()));
            bind_values.push(Value::Text((*value).to_string()));
        }
        if !include_archived {
            sql.push_str(" AND archived = 0");
        }
        sql.push_str(" ORDER BY ref_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(bind_values), |row| row.get::<_, i64>(0))?
            .map(|raw| raw.map(EntityId::from_raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn kind_of(&self, ref_id: EntityId) -> RepoResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT kind FROM entities WHERE ref_id = ?1;",
                [ref_id.as_i64()],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn summaries(&self, ref_ids: &[EntityId]) -> RepoResult<Vec<EntityRowSummary>> {
        if ref_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT kind, ref_id, parent_ref_id, name, archived FROM entities
             WHERE ref_id IN ({}) ORDER BY ref_id ASC",
            placeholders(ref_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter(ref_ids.iter().map(|id| id.as_i64())),
                |row| {
                    Ok(EntityRowSummary {
                        kind: row.get(0)?,
                        ref_id: EntityId::from_raw(row.get(1)?),
                        parent_ref_id: row.get::<_, Option<i64>>(2)?.map(EntityId::from_raw),
                        name: row.get(3)?,
                        archived: row.get::<_, i64>(4)? == 1,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Deletes every record keyed under `parent_ref_id`, whatever its kind.
    pub fn remove_records_for_parent(&self, parent_ref_id: EntityId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM records WHERE parent_ref_id = ?1;",
            [parent_ref_id.as_i64()],
        )?)
    }
}
