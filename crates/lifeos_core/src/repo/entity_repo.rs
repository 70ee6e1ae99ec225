//! Typed entity repositories over the uniform `entities` table.
//!
//! # Responsibility
//! - Store entity header columns next to a JSON body.
//! - Mirror `Entity::index_fields` into `entity_refs` for generic lookups.
//! - Append pending events to `entity_events` on every write.
//!
//! # Invariants
//! - `create` assigns the id; entities passed to it must be new.
//! - `save` only succeeds when the row still has the version the entity was loaded at.
//! - Returned entities carry no pending events.

use crate::model::framework::{
    ArchivalReason, Entity, EntityEvent, EntityHeader, EntityId, IndexField, Timestamp,
    TrunkEntity,
};
use crate::repo::{bool_to_int, int_to_bool, is_unique_violation, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::marker::PhantomData;

const ENTITY_SELECT_SQL: &str = "SELECT
    ref_id,
    version,
    archived,
    archival_reason,
    created_time,
    last_modified_time,
    archived_time,
    data
FROM entities";

/// `field IN (values)` over indexed entity refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefFilter {
    pub field: String,
    pub values: Vec<String>,
}

impl RefFilter {
    pub fn eq(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            values: vec![value.to_string()],
        }
    }

    pub fn any_of<T: ToString>(field: &str, values: &[T]) -> Self {
        Self {
            field: field.to_string(),
            values: values.iter().map(ToString::to_string).collect(),
        }
    }
}

/// CRUD and query surface shared by every entity kind.
pub trait EntityRepository<E: Entity> {
    fn create(&self, entity: E) -> RepoResult<E>;
    fn save(&self, entity: E) -> RepoResult<E>;
    /// Hard delete, including refs and events; returns the last stored state.
    fn remove(&self, ref_id: EntityId) -> RepoResult<E>;
    fn load_by_id(&self, ref_id: EntityId, allow_archived: bool) -> RepoResult<E>;
    fn load_optional(&self, ref_id: EntityId, allow_archived: bool) -> RepoResult<Option<E>>;
    fn find_all(
        &self,
        parent_ref_id: EntityId,
        allow_archived: bool,
        filter_ref_ids: Option<&[EntityId]>,
    ) -> RepoResult<Vec<E>>;
    /// Entities matching every filter; `parent_ref_id` narrows when given.
    fn find_all_generic(
        &self,
        parent_ref_id: Option<EntityId>,
        allow_archived: bool,
        filters: &[RefFilter],
    ) -> RepoResult<Vec<E>>;
    /// Archived rows are included since keys stay reserved after archival.
    fn load_by_unique_key(&self, unique_key: &str) -> RepoResult<Option<E>>;
    fn events_for(&self, ref_id: EntityId) -> RepoResult<Vec<EntityEvent>>;
}

/// Extra lookup for kinds that exist exactly once per parent.
pub trait TrunkEntityRepository<E: TrunkEntity>: EntityRepository<E> {
    fn load_by_parent(&self, parent_ref_id: EntityId) -> RepoResult<E>;
    fn load_by_parent_optional(&self, parent_ref_id: EntityId) -> RepoResult<Option<E>>;
}

/// SQLite-backed repository for entities of kind `E`.
pub struct SqliteEntityRepository<'conn, E> {
    conn: &'conn Connection,
    _kind: PhantomData<fn() -> E>,
}

impl<'conn, E: Entity> SqliteEntityRepository<'conn, E> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _kind: PhantomData,
        }
    }

    fn write_refs(&self, ref_id: EntityId, fields: &[IndexField]) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM entity_refs WHERE ref_id = ?1;", [ref_id.as_i64()])?;
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO entity_refs (ref_id, field, value) VALUES (?1, ?2, ?3);")?;
        for (field, value) in fields {
            stmt.execute(params![ref_id.as_i64(), field, value])?;
        }
        Ok(())
    }

    fn write_events(&self, ref_id: EntityId, events: Vec<EntityEvent>) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO entity_events (
                owner_kind,
                owner_ref_id,
                timestamp,
                session_index,
                name,
                source,
                owner_version,
                kind,
                data
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        )?;
        for event in events {
            let data = serde_json::to_string(&event.frame_args)
                .map_err(|err| RepoError::InvalidData(format!("unencodable event args: {err}")))?;
            stmt.execute(params![
                E::KIND,
                ref_id.as_i64(),
                event.timestamp.to_string(),
                event.owner_version,
                event.name,
                event.source.as_str(),
                event.owner_version,
                event.kind.as_str(),
                data,
            ])?;
        }
        Ok(())
    }

    fn query_entities(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<E>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_entity_row::<E>(row)?);
        }
        Ok(entities)
    }
}

impl<E: Entity> EntityRepository<E> for SqliteEntityRepository<'_, E> {
    fn create(&self, mut entity: E) -> RepoResult<E> {
        if !entity.ref_id().is_new() {
            return Err(RepoError::InvalidData(format!(
                "{} {} is already persisted",
                E::KIND,
                entity.ref_id()
            )));
        }
        let data = encode_body(&entity)?;
        let unique_key = entity.unique_key();
        let header = entity.header().clone();

        self.conn
            .execute(
                "INSERT INTO entities (
                    kind,
                    parent_ref_id,
                    unique_key,
                    version,
                    archived,
                    archival_reason,
                    created_time,
                    last_modified_time,
                    archived_time,
                    name,
                    data
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
                params![
                    E::KIND,
                    entity.parent_ref_id().map(EntityId::as_i64),
                    unique_key.as_deref(),
                    header.version,
                    bool_to_int(header.archived),
                    header.archival_reason.map(|reason| reason.as_str()),
                    header.created_time.to_string(),
                    header.last_modified_time.to_string(),
                    header.archived_time.map(|time| time.to_string()),
                    entity.display_name(),
                    data,
                ],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    RepoError::EntityAlreadyExists {
                        kind: E::KIND.to_string(),
                        key: unique_key.clone().unwrap_or_default(),
                    }
                } else {
                    err.into()
                }
            })?;

        let ref_id = EntityId::from_raw(self.conn.last_insert_rowid());
        entity.header_mut().ref_id = ref_id;
        self.write_refs(ref_id, &entity.index_fields())?;
        let events = entity.header_mut().take_pending_events();
        self.write_events(ref_id, events)?;
        Ok(entity)
    }

    fn save(&self, mut entity: E) -> RepoResult<E> {
        if entity.header().pending_events().is_empty() {
            return Ok(entity);
        }
        let ref_id = entity.ref_id();
        let expected = entity.header().persisted_version();
        let actual: Option<i64> = self
            .conn
            .query_row(
                "SELECT version FROM entities WHERE ref_id = ?1 AND kind = ?2;",
                params![ref_id.as_i64(), E::KIND],
                |row| row.get(0),
            )
            .optional()?;
        match actual {
            None => {
                return Err(RepoError::EntityNotFound {
                    kind: E::KIND.to_string(),
                    ref_id,
                })
            }
            Some(actual) if actual != expected => {
                return Err(RepoError::VersionConflict {
                    kind: E::KIND.to_string(),
                    ref_id,
                    expected,
                    actual,
                })
            }
            Some(_) => {}
        }

        let data = encode_body(&entity)?;
        let unique_key = entity.unique_key();
        let header = entity.header().clone();
        self.conn
            .execute(
                "UPDATE entities
                 SET
                    parent_ref_id = ?1,
                    unique_key = ?2,
                    version = ?3,
                    archived = ?4,
                    archival_reason = ?5,
                    last_modified_time = ?6,
                    archived_time = ?7,
                    name = ?8,
                    data = ?9
                 WHERE ref_id = ?10 AND version = ?11;",
                params![
                    entity.parent_ref_id().map(EntityId::as_i64),
                    unique_key.as_deref(),
                    header.version,
                    bool_to_int(header.archived),
                    header.archival_reason.map(|reason| reason.as_str()),
                    header.last_modified_time.to_string(),
                    header.archived_time.map(|time| time.to_string()),
                    entity.display_name(),
                    data,
                    ref_id.as_i64(),
                    expected,
                ],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    RepoError::EntityAlreadyExists {
                        kind: E::KIND.to_string(),
                        key: unique_key.clone().unwrap_or_default(),
                    }
                } else {
                    err.into()
                }
            })?;

        self.write_refs(ref_id, &entity.index_fields())?;
        let events = entity.header_mut().take_pending_events();
        self.write_events(ref_id, events)?;
        Ok(entity)
    }

    fn remove(&self, ref_id: EntityId) -> RepoResult<E> {
        let entity = self.load_by_id(ref_id, true)?;
        self.conn.execute(
            "DELETE FROM entity_events WHERE owner_kind = ?1 AND owner_ref_id = ?2;",
            params![E::KIND, ref_id.as_i64()],
        )?;
        self.conn.execute(
            "DELETE FROM entities WHERE ref_id = ?1 AND kind = ?2;",
            params![ref_id.as_i64(), E::KIND],
        )?;
        Ok(entity)
    }

    fn load_by_id(&self, ref_id: EntityId, allow_archived: bool) -> RepoResult<E> {
        self.load_optional(ref_id, allow_archived)?
            .ok_or_else(|| RepoError::EntityNotFound {
                kind: E::KIND.to_string(),
                ref_id,
            })
    }

    fn load_optional(&self, ref_id: EntityId, allow_archived: bool) -> RepoResult<Option<E>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{ENTITY_SELECT_SQL}
             WHERE ref_id = ?1
               AND kind = ?2
               AND (?3 = 1 OR archived = 0);"
        ))?;
        let mut rows = stmt.query(params![ref_id.as_i64(), E::KIND, bool_to_int(allow_archived)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entity_row::<E>(row)?));
        }
        Ok(None)
    }

    fn find_all(
        &self,
        parent_ref_id: EntityId,
        allow_archived: bool,
        filter_ref_ids: Option<&[EntityId]>,
    ) -> RepoResult<Vec<E>> {
        let mut sql = format!("{ENTITY_SELECT_SQL} WHERE kind = ? AND parent_ref_id = ?");
        let mut bind_values: Vec<Value> = vec![
            Value::Text(E::KIND.to_string()),
            Value::Integer(parent_ref_id.as_i64()),
        ];
        if !allow_archived {
            sql.push_str(" AND archived = 0");
        }
        if let Some(ids) = filter_ref_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND ref_id IN ({})", placeholders(ids.len())));
            bind_values.extend(ids.iter().map(|id| Value::Integer(id.as_i64())));
        }
        sql.push_str(" ORDER BY ref_id ASC");
        self.query_entities(&sql, bind_values)
    }

    fn find_all_generic(
        &self,
        parent_ref_id: Option<EntityId>,
        allow_archived: bool,
        filters: &[RefFilter],
    ) -> RepoResult<Vec<E>> {
        let mut sql = format!("{ENTITY_SELECT_SQL} WHERE kind = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(E::KIND.to_string())];
        if let Some(parent_ref_id) = parent_ref_id {
            sql.push_str(" AND parent_ref_id = ?");
            bind_values.push(Value::Integer(parent_ref_id.as_i64()));
        }
        if !allow_archived {
            sql.push_str(" AND archived = 0");
        }
        for filter in filters {
            if filter.values.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(
                " AND ref_id IN (SELECT ref_id FROM entity_refs WHERE field = ? AND value IN ({}))",
                placeholders(filter.values.len())
            ));
            bind_values.push(Value::Text(filter.field.clone()));
            bind_values.extend(filter.values.iter().cloned().map(Value::Text));
        }
        sql.push_str(" ORDER BY ref_id ASC");
        self.query_entities(&sql, bind_values)
    }

    fn load_by_unique_key(&self, unique_key: &str) -> RepoResult<Option<E>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{ENTITY_SELECT_SQL} WHERE kind = ?1 AND unique_key = ?2;"
        ))?;
        let mut rows = stmt.query(params![E::KIND, unique_key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entity_row::<E>(row)?));
        }
        Ok(None)
    }

    fn events_for(&self, ref_id: EntityId) -> RepoResult<Vec<EntityEvent>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT timestamp, source, owner_version, kind, name, data
             FROM entity_events
             WHERE owner_kind = ?1 AND owner_ref_id = ?2
             ORDER BY owner_version ASC;",
        )?;
        let mut rows = stmt.query(params![E::KIND, ref_id.as_i64()])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }
}

impl<E: TrunkEntity> TrunkEntityRepository<E> for SqliteEntityRepository<'_, E> {
    fn load_by_parent(&self, parent_ref_id: EntityId) -> RepoResult<E> {
        self.load_by_parent_optional(parent_ref_id)?
            .ok_or_else(|| RepoError::TrunkNotFound {
                kind: E::KIND.to_string(),
                parent_ref_id,
            })
    }

    fn load_by_parent_optional(&self, parent_ref_id: EntityId) -> RepoResult<Option<E>> {
        Ok(self
            .find_all(parent_ref_id, false, None)?
            .into_iter()
            .next())
    }
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn encode_body<E: Entity>(entity: &E) -> RepoResult<String> {
    serde_json::to_string(entity)
        .map_err(|err| RepoError::InvalidData(format!("unencodable {} body: {err}", E::KIND)))
}

fn parse_timestamp(raw: &str, column: &str) -> RepoResult<Timestamp> {
    raw.parse()
        .map_err(|_| RepoError::InvalidData(format!("invalid timestamp `{raw}` in {column}")))
}

fn parse_entity_row<E: Entity>(row: &Row<'_>) -> RepoResult<E> {
    let ref_id = EntityId::from_raw(row.get("ref_id")?);
    let data: String = row.get("data")?;
    let mut entity: E = serde_json::from_str(&data).map_err(|err| {
        RepoError::InvalidData(format!("invalid {} body for {ref_id}: {err}", E::KIND))
    })?;

    let archived = int_to_bool(row.get("archived")?, "entities.archived")?;
    let archival_reason = match row.get::<_, Option<String>>("archival_reason")? {
        Some(raw) => Some(raw.parse::<ArchivalReason>().map_err(|_| {
            RepoError::InvalidData(format!("invalid archival reason `{raw}` in entities.archival_reason"))
        })?),
        None => None,
    };
    let created_time = parse_timestamp(&row.get::<_, String>("created_time")?, "entities.created_time")?;
    let last_modified_time = parse_timestamp(
        &row.get::<_, String>("last_modified_time")?,
        "entities.last_modified_time",
    )?;
    let archived_time = match row.get::<_, Option<String>>("archived_time")? {
        Some(raw) => Some(parse_timestamp(&raw, "entities.archived_time")?),
        None => None,
    };

    *entity.header_mut() = EntityHeader::hydrate(
        ref_id,
        row.get("version")?,
        archived,
        archival_reason,
        created_time,
        last_modified_time,
        archived_time,
    );
    Ok(entity)
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<EntityEvent> {
    let source: String = row.get("source")?;
    let kind: String = row.get("kind")?;
    let data: String = row.get("data")?;
    Ok(EntityEvent {
        source: source
            .parse()
            .map_err(|_| RepoError::InvalidData(format!("invalid event source `{source}`")))?,
        owner_version: row.get("owner_version")?,
        timestamp: parse_timestamp(&row.get::<_, String>("timestamp")?, "entity_events.timestamp")?,
        kind: kind
            .parse()
            .map_err(|_| RepoError::InvalidData(format!("invalid event kind `{kind}`")))?,
        name: row.get("name")?,
        frame_args: serde_json::from_str(&data)
            .map_err(|err| RepoError::InvalidData(format!("invalid event args: {err}")))?,
    })
}
