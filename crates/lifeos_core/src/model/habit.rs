//! Habits and their per-day streak marks.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, IndexField, InputValidationError, Record, Timestamp, UpdateAction,
    ValidationResult,
};
use crate::model::note::note_link;
use crate::model::values::{InboxTaskStatus, RecurringTaskGenParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

simple_trunk!(
    HabitCollection("habit_collection", workspace_ref_id),
    links = &[contains_many("habit")]
);

const MAX_REPEATS_IN_PERIOD: u32 = 25;

fn check_repeats(repeats_in_period_count: Option<u32>) -> ValidationResult<()> {
    match repeats_in_period_count {
        Some(0) => Err(InputValidationError::new(
            "repeats in period count must be at least 1",
        )),
        Some(count) if count > MAX_REPEATS_IN_PERIOD => Err(InputValidationError::new(format!(
            "repeats in period count must be at most {MAX_REPEATS_IN_PERIOD}"
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    #[serde(skip)]
    pub header: EntityHeader,
    pub habit_collection_ref_id: EntityId,
    pub project_ref_id: EntityId,
    pub name: EntityName,
    pub is_key: bool,
    pub gen_params: RecurringTaskGenParams,
    pub suspended: bool,
    pub repeats_in_period_count: Option<u32>,
}

impl Habit {
    pub fn new_habit(
        ctx: &DomainContext,
        habit_collection_ref_id: EntityId,
        project_ref_id: EntityId,
        name: EntityName,
        is_key: bool,
        gen_params: RecurringTaskGenParams,
        repeats_in_period_count: Option<u32>,
    ) -> ValidationResult<Self> {
        check_repeats(repeats_in_period_count)?;
        let args = ctx
            .frame()
            .arg("project_ref_id", &project_ref_id)
            .arg("name", &name)
            .arg("is_key", &is_key)
            .arg("gen_params", &gen_params)
            .arg_opt("repeats_in_period_count", repeats_in_period_count.as_ref())
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_habit", args),
            habit_collection_ref_id,
            project_ref_id,
            name,
            is_key,
            gen_params,
            suspended: false,
            repeats_in_period_count,
        })
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        project_ref_id: UpdateAction<EntityId>,
        name: UpdateAction<EntityName>,
        is_key: UpdateAction<bool>,
        gen_params: UpdateAction<RecurringTaskGenParams>,
        repeats_in_period_count: UpdateAction<Option<u32>>,
    ) -> ValidationResult<Self> {
        if let Some(count) = repeats_in_period_count.value() {
            check_repeats(*count)?;
        }
        let args = ctx
            .frame()
            .update("project_ref_id", &project_ref_id)
            .update("name", &name)
            .update("is_key", &is_key)
            .update("gen_params", &gen_params)
            .update_opt("repeats_in_period_count", &repeats_in_period_count)
            .finish();
        self.project_ref_id = project_ref_id.or_else(self.project_ref_id);
        self.name = name.or_else(self.name);
        self.is_key = is_key.or_else(self.is_key);
        self.gen_params = gen_params.or_else(self.gen_params);
        self.repeats_in_period_count = repeats_in_period_count.or_else(self.repeats_in_period_count);
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    pub fn suspend(mut self, ctx: &DomainContext) -> ValidationResult<Self> {
        if self.suspended {
            return Err(InputValidationError::new("habit is already suspended"));
        }
        self.suspended = true;
        self.header.record_update(ctx, "suspend", Default::default());
        Ok(self)
    }

    pub fn unsuspend(mut self, ctx: &DomainContext) -> ValidationResult<Self> {
        if !self.suspended {
            return Err(InputValidationError::new("habit is not suspended"));
        }
        self.suspended = false;
        self.header.record_update(ctx, "unsuspend", Default::default());
        Ok(self)
    }
}

impl Entity for Habit {
    const KIND: &'static str = "habit";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.habit_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![("project_ref_id", self.project_ref_id.to_string())]
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("inbox_task", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("source", "habit")]),
            note_link!("habit"),
        ];
        LINKS
    }
}

impl CrownEntity for Habit {}

/// Per-day record of the statuses of a habit's tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStreakMark {
    pub habit_ref_id: EntityId,
    pub date: ADate,
    pub statuses: BTreeMap<EntityId, InboxTaskStatus>,
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
}

impl HabitStreakMark {
    pub fn new_mark(ctx: &DomainContext, habit_ref_id: EntityId, date: ADate) -> Self {
        Self {
            habit_ref_id,
            date,
            statuses: BTreeMap::new(),
            created_time: ctx.action_timestamp,
            last_modified_time: ctx.action_timestamp,
        }
    }

    pub fn update_status(
        mut self,
        ctx: &DomainContext,
        inbox_task_ref_id: EntityId,
        status: InboxTaskStatus,
    ) -> Self {
        self.statuses.insert(inbox_task_ref_id, status);
        self.last_modified_time = ctx.action_timestamp;
        self
    }

    pub fn remove_task(mut self, ctx: &DomainContext, inbox_task_ref_id: EntityId) -> Self {
        self.statuses.remove(&inbox_task_ref_id);
        self.last_modified_time = ctx.action_timestamp;
        self
    }

    pub fn is_fulfilled(&self) -> bool {
        !self.statuses.is_empty()
            && self
                .statuses
                .values()
                .all(|status| *status == InboxTaskStatus::Done)
    }
}

impl Record for HabitStreakMark {
    const KIND: &'static str = "habit_streak_mark";

    fn parent_ref_id(&self) -> EntityId {
        self.habit_ref_id
    }

    fn raw_key(&self) -> String {
        self.date.to_string()
    }

    fn created_time(&self) -> Timestamp {
        self.created_time
    }

    fn last_modified_time(&self) -> Timestamp {
        self.last_modified_time
    }
}
