//! Generation and garbage-collection run logs.
//!
//! # Invariants
//! - A log entry is opened when a run starts and closed once every
//!   per-entity outcome has been recorded.
//! - A closed entry rejects further records.

use crate::model::framework::entity::{contains_many, entity_header, simple_trunk};
use crate::model::framework::realm::serde_realm_value;
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityStructure,
    EventSource, InputValidationError, Timestamp, ValidationResult,
};
use crate::model::values::{GcTarget, SyncTarget};
use serde::{Deserialize, Serialize};

/// What happened to one entity during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityOutcome {
    Created,
    Updated,
    Archived,
    Removed,
}

/// Compact description of an entity touched by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub kind: String,
    pub ref_id: EntityId,
    pub name: String,
    pub outcome: EntityOutcome,
}

impl EntitySummary {
    pub fn of<E: Entity>(entity: &E, outcome: EntityOutcome) -> Self {
        Self {
            kind: E::KIND.to_string(),
            ref_id: entity.ref_id(),
            name: entity.display_name(),
            outcome,
        }
    }
}

serde_realm_value!(EntitySummary, "entity_summary");

fn check_open(opened: bool, what: &str) -> ValidationResult<()> {
    if !opened {
        return Err(InputValidationError::new(format!("{what} entry is already closed")));
    }
    Ok(())
}

simple_trunk!(
    GenLog("gen_log", workspace_ref_id),
    links = &[contains_many("gen_log_entry")]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenLogEntry {
    #[serde(skip)]
    pub header: EntityHeader,
    pub gen_log_ref_id: EntityId,
    pub source: EventSource,
    pub gen_even_if_not_modified: bool,
    pub today: ADate,
    pub gen_targets: Vec<SyncTarget>,
    pub filter_project_ref_ids: Option<Vec<EntityId>>,
    pub opened: bool,
    pub entity_created_records: Vec<EntitySummary>,
    pub entity_updated_records: Vec<EntitySummary>,
    pub entity_removed_records: Vec<EntitySummary>,
    pub closed_time: Option<Timestamp>,
}

impl GenLogEntry {
    pub fn new_log_entry(
        ctx: &DomainContext,
        gen_log_ref_id: EntityId,
        gen_even_if_not_modified: bool,
        today: ADate,
        gen_targets: Vec<SyncTarget>,
        filter_project_ref_ids: Option<Vec<EntityId>>,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("gen_even_if_not_modified", &gen_even_if_not_modified)
            .arg("today", &today)
            .arg_list("gen_targets", &gen_targets)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_gen_log_entry", args),
            gen_log_ref_id,
            source: ctx.source,
            gen_even_if_not_modified,
            today,
            gen_targets,
            filter_project_ref_ids,
            opened: true,
            entity_created_records: Vec::new(),
            entity_updated_records: Vec::new(),
            entity_removed_records: Vec::new(),
            closed_time: None,
        }
    }

    pub fn add_entity_record(mut self, ctx: &DomainContext, summary: EntitySummary) -> ValidationResult<Self> {
        check_open(self.opened, "gen log")?;
        let args = ctx.frame().arg("summary", &summary).finish();
        match summary.outcome {
            EntityOutcome::Created => self.entity_created_records.push(summary),
            EntityOutcome::Updated => self.entity_updated_records.push(summary),
            EntityOutcome::Archived | EntityOutcome::Removed => self.entity_removed_records.push(summary),
        }
        self.header.record_update(ctx, "add_entity_record", args);
        Ok(self)
    }

    pub fn close(mut self, ctx: &DomainContext) -> ValidationResult<Self> {
        check_open(self.opened, "gen log")?;
        self.opened = false;
        self.closed_time = Some(ctx.action_timestamp);
        self.header.record_update(ctx, "close", ctx.frame().finish());
        Ok(self)
    }

    pub fn touched_count(&self) -> usize {
        self.entity_created_records.len()
            + self.entity_updated_records.len()
            + self.entity_removed_records.len()
    }
}

impl Entity for GenLogEntry {
    const KIND: &'static str = "gen_log_entry";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.gen_log_ref_id)
    }
}

impl CrownEntity for GenLogEntry {}

simple_trunk!(
    GcLog("gc_log", workspace_ref_id),
    links = &[contains_many("gc_log_entry")]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcLogEntry {
    #[serde(skip)]
    pub header: EntityHeader,
    pub gc_log_ref_id: EntityId,
    pub source: EventSource,
    pub gc_targets: Vec<GcTarget>,
    pub opened: bool,
    pub entity_records: Vec<EntitySummary>,
    pub closed_time: Option<Timestamp>,
}

impl GcLogEntry {
    pub fn new_log_entry(ctx: &DomainContext, gc_log_ref_id: EntityId, gc_targets: Vec<GcTarget>) -> Self {
        let args = ctx.frame().arg_list("gc_targets", &gc_targets).finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_gc_log_entry", args),
            gc_log_ref_id,
            source: ctx.source,
            gc_targets,
            opened: true,
            entity_records: Vec::new(),
            closed_time: None,
        }
    }

    pub fn add_entity_record(mut self, ctx: &DomainContext, summary: EntitySummary) -> ValidationResult<Self> {
        check_open(self.opened, "gc log")?;
        let args = ctx.frame().arg("summary", &summary).finish();
        self.entity_records.push(summary);
        self.header.record_update(ctx, "add_entity_record", args);
        Ok(self)
    }

    pub fn close(mut self, ctx: &DomainContext) -> ValidationResult<Self> {
        check_open(self.opened, "gc log")?;
        self.opened = false;
        self.closed_time = Some(ctx.action_timestamp);
        self.header.record_update(ctx, "close", ctx.frame().finish());
        Ok(self)
    }
}

impl Entity for GcLogEntry {
    const KIND: &'static str = "gc_log_entry";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.gc_log_ref_id)
    }
}

impl CrownEntity for GcLogEntry {}

#[cfg(test)]
mod tests {
    use super::{EntityOutcome, EntitySummary, GcLogEntry};
    use crate::model::framework::{DomainContext, EntityId, EventSource, Timestamp};
    use crate::model::values::{standard_registry, GcTarget};
    use std::sync::Arc;

    #[test]
    fn closed_entries_reject_records() {
        let ctx = DomainContext::new(
            EventSource::Gc,
            "2024-03-04T09:00:00Z".parse::<Timestamp>().expect("timestamp"),
            Arc::new(standard_registry().expect("registry")),
        );
        let entry = GcLogEntry::new_log_entry(&ctx, EntityId::from_raw(3), vec![GcTarget::InboxTasks]);
        let summary = EntitySummary {
            kind: "inbox_task".into(),
            ref_id: EntityId::from_raw(10),
            name: "Old".into(),
            outcome: EntityOutcome::Archived,
        };
        let entry = entry
            .add_entity_record(&ctx, summary.clone())
            .expect("open entry")
            .close(&ctx)
            .expect("close");
        assert!(!entry.opened);
        assert_eq!(entry.header.version, 3);
        assert!(entry.add_entity_record(&ctx, summary).is_err());
    }
}
