//! Working memory: a scratch note per daily or weekly bucket.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_at_most_one, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, InputValidationError, TrunkEntity, ValidationResult,
};
use crate::model::note::note_link;
use crate::model::values::RecurringTaskPeriod;
use serde::{Deserialize, Serialize};

fn check_generation_period(period: RecurringTaskPeriod) -> ValidationResult<()> {
    match period {
        RecurringTaskPeriod::Daily | RecurringTaskPeriod::Weekly => Ok(()),
        other => Err(InputValidationError::new(format!(
            "working memory is generated daily or weekly, not {other}"
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMemCollection {
    #[serde(skip)]
    pub header: EntityHeader,
    pub workspace_ref_id: EntityId,
    pub generation_period: RecurringTaskPeriod,
    pub cleanup_project_ref_id: EntityId,
}

impl WorkingMemCollection {
    pub fn new(ctx: &DomainContext, workspace_ref_id: EntityId, cleanup_project_ref_id: EntityId) -> Self {
        let generation_period = RecurringTaskPeriod::Weekly;
        let args = ctx
            .frame()
            .arg("workspace_ref_id", &workspace_ref_id)
            .arg("generation_period", &generation_period)
            .arg("cleanup_project_ref_id", &cleanup_project_ref_id)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_working_mem_collection", args),
            workspace_ref_id,
            generation_period,
            cleanup_project_ref_id,
        }
    }

    pub fn change_settings(
        mut self,
        ctx: &DomainContext,
        generation_period: RecurringTaskPeriod,
        cleanup_project_ref_id: EntityId,
    ) -> ValidationResult<Self> {
        check_generation_period(generation_period)?;
        let args = ctx
            .frame()
            .arg("generation_period", &generation_period)
            .arg("cleanup_project_ref_id", &cleanup_project_ref_id)
            .finish();
        self.generation_period = generation_period;
        self.cleanup_project_ref_id = cleanup_project_ref_id;
        self.header.record_update(ctx, "change_settings", args);
        Ok(self)
    }
}

impl Entity for WorkingMemCollection {
    const KIND: &'static str = "working_mem_collection";
    const STRUCTURE: EntityStructure = EntityStructure::Trunk;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.workspace_ref_id)
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[contains_many("working_mem")];
        LINKS
    }
}

impl TrunkEntity for WorkingMemCollection {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMem {
    #[serde(skip)]
    pub header: EntityHeader,
    pub working_mem_collection_ref_id: EntityId,
    pub name: EntityName,
    pub right_now: ADate,
    pub period: RecurringTaskPeriod,
    pub timeline: String,
}

impl WorkingMem {
    pub fn new_working_mem(
        ctx: &DomainContext,
        working_mem_collection_ref_id: EntityId,
        right_now: ADate,
        period: RecurringTaskPeriod,
        timeline: String,
    ) -> ValidationResult<Self> {
        check_generation_period(period)?;
        let name = EntityName::from_generated(&format!("Working memory for {right_now}"));
        let args = ctx
            .frame()
            .arg("right_now", &right_now)
            .arg("period", &period)
            .arg("timeline", &timeline)
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_working_mem", args),
            working_mem_collection_ref_id,
            name,
            right_now,
            period,
            timeline,
        })
    }
}

impl Entity for WorkingMem {
    const KIND: &'static str = "working_mem";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.working_mem_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!(
            "working_mem:{}:{}:{}",
            self.working_mem_collection_ref_id, self.period, self.timeline
        ))
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_at_most_one("inbox_task", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("source", "working_mem_cleanup")]),
            note_link!("working_mem"),
        ];
        LINKS
    }
}

impl CrownEntity for WorkingMem {}
