//! Inbox tasks: the unit of actionable work.
//!
//! # Responsibility
//! - Hold the user or generator supplied task state.
//! - Stamp accepted/working/completed times on status transitions.
//!
//! # Invariants
//! - Generated tasks reject user edits to generator-owned fields:
//!   name, project, key flag, Eisenhower quadrant, difficulty, actionable and due dates.
//! - Generated tasks are unique by `(source, source entity, period, timeline, repeat index)`.
//! - Actionable date never falls after the due date.

use crate::model::framework::entity::{contains_many, entity_header, simple_trunk, LinkDescriptor};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, IndexField, InputValidationError, Timestamp, UpdateAction, ValidationResult,
};
use crate::model::note::note_link;
use crate::model::values::{
    Difficulty, Eisen, InboxTaskSource, InboxTaskStatus, RecurringTaskPeriod,
};
use serde::{Deserialize, Serialize};

simple_trunk!(
    InboxTaskCollection("inbox_task_collection", workspace_ref_id),
    links = &[contains_many("inbox_task")]
);

/// Recurrence bucket a generated task belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTaskInfo {
    pub period: RecurringTaskPeriod,
    pub timeline: String,
    pub repeat_index: u32,
    pub gen_right_now: Timestamp,
}

/// Inputs for a new inbox task.
#[derive(Debug, Clone)]
pub struct InboxTaskDraft {
    pub source: InboxTaskSource,
    pub source_entity_ref_id: Option<EntityId>,
    pub name: EntityName,
    pub status: InboxTaskStatus,
    pub project_ref_id: EntityId,
    pub is_key: bool,
    pub eisen: Eisen,
    pub difficulty: Option<Difficulty>,
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
    pub recurring: Option<RecurringTaskInfo>,
}

impl InboxTaskDraft {
    pub fn user(name: EntityName, project_ref_id: EntityId) -> Self {
        Self {
            source: InboxTaskSource::User,
            source_entity_ref_id: None,
            name,
            status: InboxTaskStatus::Accepted,
            project_ref_id,
            is_key: false,
            eisen: Eisen::Regular,
            difficulty: None,
            actionable_date: None,
            due_date: None,
            recurring: None,
        }
    }
}

/// User-facing partial update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxTaskUpdate {
    pub name: UpdateAction<EntityName>,
    pub status: UpdateAction<InboxTaskStatus>,
    pub project_ref_id: UpdateAction<EntityId>,
    pub is_key: UpdateAction<bool>,
    pub eisen: UpdateAction<Eisen>,
    pub difficulty: UpdateAction<Option<Difficulty>>,
    pub actionable_date: UpdateAction<Option<ADate>>,
    pub due_date: UpdateAction<Option<ADate>>,
}

impl InboxTaskUpdate {
    fn touches_generated_fields(&self) -> bool {
        self.name.should_change()
            || self.project_ref_id.should_change()
            || self.is_key.should_change()
            || self.eisen.should_change()
            || self.difficulty.should_change()
            || self.actionable_date.should_change()
            || self.due_date.should_change()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxTask {
    #[serde(skip)]
    pub header: EntityHeader,
    pub inbox_task_collection_ref_id: EntityId,
    pub source: InboxTaskSource,
    pub source_entity_ref_id: Option<EntityId>,
    pub name: EntityName,
    pub status: InboxTaskStatus,
    pub project_ref_id: EntityId,
    pub is_key: bool,
    pub eisen: Eisen,
    pub difficulty: Option<Difficulty>,
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
    pub recurring: Option<RecurringTaskInfo>,
    pub accepted_time: Option<Timestamp>,
    pub working_time: Option<Timestamp>,
    pub completed_time: Option<Timestamp>,
}

fn check_dates(actionable_date: Option<ADate>, due_date: Option<ADate>) -> ValidationResult<()> {
    if let (Some(actionable), Some(due)) = (actionable_date, due_date) {
        if actionable > due {
            return Err(InputValidationError::new(
                "actionable date must not be after the due date",
            ));
        }
    }
    Ok(())
}

impl InboxTask {
    pub fn new_inbox_task(
        ctx: &DomainContext,
        inbox_task_collection_ref_id: EntityId,
        draft: InboxTaskDraft,
    ) -> ValidationResult<Self> {
        check_dates(draft.actionable_date, draft.due_date)?;
        if draft.source != InboxTaskSource::User && draft.source_entity_ref_id.is_none() {
            return Err(InputValidationError::new(format!(
                "an inbox task with source {} needs a source entity",
                draft.source
            )));
        }
        let args = ctx
            .frame()
            .arg("source", &draft.source)
            .arg_opt("source_entity_ref_id", draft.source_entity_ref_id.as_ref())
            .arg("name", &draft.name)
            .arg("status", &draft.status)
            .arg("project_ref_id", &draft.project_ref_id)
            .arg("is_key", &draft.is_key)
            .arg("eisen", &draft.eisen)
            .arg_opt("difficulty", draft.difficulty.as_ref())
            .arg_opt("actionable_date", draft.actionable_date.as_ref())
            .arg_opt("due_date", draft.due_date.as_ref())
            .arg_opt(
                "recurring_timeline",
                draft.recurring.as_ref().map(|info| &info.timeline),
            )
            .finish();
        let mut task = Self {
            header: EntityHeader::new_created(ctx, "new_inbox_task", args),
            inbox_task_collection_ref_id,
            source: draft.source,
            source_entity_ref_id: draft.source_entity_ref_id,
            name: draft.name,
            status: draft.status,
            project_ref_id: draft.project_ref_id,
            is_key: draft.is_key,
            eisen: draft.eisen,
            difficulty: draft.difficulty,
            actionable_date: draft.actionable_date,
            due_date: draft.due_date,
            recurring: draft.recurring,
            accepted_time: None,
            working_time: None,
            completed_time: None,
        };
        task.stamp_status_times(ctx, InboxTaskStatus::NotStarted);
        Ok(task)
    }

    /// User edit; generator-owned fields are locked for generated tasks.
    pub fn update(mut self, ctx: &DomainContext, update: InboxTaskUpdate) -> ValidationResult<Self> {
        if !self.source.allow_user_changes() && update.touches_generated_fields() {
            return Err(InputValidationError::new(format!(
                "inbox task generated from {} only allows status changes",
                self.source
            )));
        }
        let actionable_date = update.actionable_date.clone().or_else(self.actionable_date);
        let due_date = update.due_date.clone().or_else(self.due_date);
        check_dates(actionable_date, due_date)?;

        let args = ctx
            .frame()
            .update("name", &update.name)
            .update("status", &update.status)
            .update("project_ref_id", &update.project_ref_id)
            .update("is_key", &update.is_key)
            .update("eisen", &update.eisen)
            .update_opt("difficulty", &update.difficulty)
            .update_opt("actionable_date", &update.actionable_date)
            .update_opt("due_date", &update.due_date)
            .finish();

        let previous_status = self.status;
        self.name = update.name.or_else(self.name);
        self.status = update.status.or_else(self.status);
        self.project_ref_id = update.project_ref_id.or_else(self.project_ref_id);
        self.is_key = update.is_key.or_else(self.is_key);
        self.eisen = update.eisen.or_else(self.eisen);
        self.difficulty = update.difficulty.or_else(self.difficulty);
        self.actionable_date = actionable_date;
        self.due_date = due_date;
        self.stamp_status_times(ctx, previous_status);
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    /// Generator refresh of the fields it owns; status is left to the user.
    pub fn update_generated(
        mut self,
        ctx: &DomainContext,
        name: EntityName,
        project_ref_id: EntityId,
        eisen: Eisen,
        difficulty: Option<Difficulty>,
        actionable_date: Option<ADate>,
        due_date: Option<ADate>,
    ) -> ValidationResult<Self> {
        check_dates(actionable_date, due_date)?;
        let args = ctx
            .frame()
            .arg("name", &name)
            .arg("project_ref_id", &project_ref_id)
            .arg("eisen", &eisen)
            .arg_opt("difficulty", difficulty.as_ref())
            .arg_opt("actionable_date", actionable_date.as_ref())
            .arg_opt("due_date", due_date.as_ref())
            .finish();
        self.name = name;
        self.project_ref_id = project_ref_id;
        self.eisen = eisen;
        self.difficulty = difficulty;
        self.actionable_date = actionable_date;
        self.due_date = due_date;
        self.header.record_update(ctx, "update_generated", args);
        Ok(self)
    }

    /// Links a user task to a big plan, or unlinks it with `None`.
    pub fn update_link_to_big_plan(
        mut self,
        ctx: &DomainContext,
        project_ref_id: EntityId,
        big_plan_ref_id: Option<EntityId>,
    ) -> ValidationResult<Self> {
        if !self.source.allow_user_changes() {
            return Err(InputValidationError::new(format!(
                "inbox task generated from {} cannot be linked to a big plan",
                self.source
            )));
        }
        let args = ctx
            .frame()
            .arg("project_ref_id", &project_ref_id)
            .arg_opt("big_plan_ref_id", big_plan_ref_id.as_ref())
            .finish();
        self.project_ref_id = project_ref_id;
        self.source = if big_plan_ref_id.is_some() {
            InboxTaskSource::BigPlan
        } else {
            InboxTaskSource::User
        };
        self.source_entity_ref_id = big_plan_ref_id;
        self.header.record_update(ctx, "update_link_to_big_plan", args);
        Ok(self)
    }

    pub fn big_plan_ref_id(&self) -> Option<EntityId> {
        match self.source {
            InboxTaskSource::BigPlan => self.source_entity_ref_id,
            _ => None,
        }
    }

    fn stamp_status_times(&mut self, ctx: &DomainContext, previous: InboxTaskStatus) {
        let now = ctx.action_timestamp;
        let status = self.status;
        if status.is_accepted_or_more() && self.accepted_time.is_none() {
            self.accepted_time = Some(now);
        }
        if !status.is_accepted_or_more() {
            self.accepted_time = None;
        }
        if status.is_working() && (!previous.is_working() || self.working_time.is_none()) {
            self.working_time = Some(now);
        }
        if status.rank() < InboxTaskStatus::InProgress.rank() {
            self.working_time = None;
        }
        if status.is_completed() && (!previous.is_completed() || self.completed_time.is_none()) {
            self.completed_time = Some(now);
        }
        if !status.is_completed() {
            self.completed_time = None;
        }
    }
}

impl Entity for InboxTask {
    const KIND: &'static str = "inbox_task";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.inbox_task_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        let mut fields = vec![
            ("project_ref_id", self.project_ref_id.to_string()),
            ("source", self.source.to_string()),
            ("status", self.status.to_string()),
        ];
        if let Some(source_entity_ref_id) = self.source_entity_ref_id {
            fields.push(("source_entity_ref_id", source_entity_ref_id.to_string()));
        }
        fields
    }

    fn unique_key(&self) -> Option<String> {
        let recurring = self.recurring.as_ref()?;
        let source_entity = self.source_entity_ref_id?;
        Some(generated_task_key(
            self.source,
            source_entity,
            recurring.period,
            &recurring.timeline,
            recurring.repeat_index,
        ))
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            crate::model::framework::entity::owns_many(
                "time_event_in_day_block",
                crate::model::framework::RefResolver::IsRefId("source_entity_ref_id"),
            )
            .with_filters(&[("namespace", "inbox_task")]),
            crate::model::framework::entity::owns_many(
                "time_plan_activity",
                crate::model::framework::RefResolver::IsRefId("target_ref_id"),
            )
            .with_filters(&[("target", "inbox_task")]),
            note_link!("inbox_task"),
        ];
        LINKS
    }
}

impl CrownEntity for InboxTask {}

/// Unique key of a generated task.
pub fn generated_task_key(
    source: InboxTaskSource,
    source_entity_ref_id: EntityId,
    period: RecurringTaskPeriod,
    timeline: &str,
    repeat_index: u32,
) -> String {
    format!("gen:{source}:{source_entity_ref_id}:{period}:{timeline}:{repeat_index}")
}

#[cfg(test)]
mod tests {
    use super::{InboxTask, InboxTaskDraft, InboxTaskUpdate};
    use crate::model::framework::{
        DomainContext, EntityId, EventSource, Timestamp, UpdateAction,
    };
    use crate::model::values::{standard_registry, InboxTaskSource, InboxTaskStatus};
    use std::sync::Arc;

    fn ctx() -> DomainContext {
        DomainContext::new(
            EventSource::Web,
            "2024-03-04T09:00:00Z".parse::<Timestamp>().expect("timestamp"),
            Arc::new(standard_registry().expect("registry")),
        )
    }

    fn generated_draft() -> InboxTaskDraft {
        let mut draft = InboxTaskDraft::user("Stretch".parse().expect("name"), EntityId::from_raw(1));
        draft.source = InboxTaskSource::Habit;
        draft.source_entity_ref_id = Some(EntityId::from_raw(9));
        draft.status = InboxTaskStatus::Recurring;
        draft
    }

    #[test]
    fn generated_tasks_only_accept_status_edits() {
        let ctx = ctx();
        let task = InboxTask::new_inbox_task(&ctx, EntityId::from_raw(2), generated_draft())
            .expect("valid task");
        let rename = InboxTaskUpdate {
            name: UpdateAction::change_to("Other".parse().expect("name")),
            ..Default::default()
        };
        assert!(task.clone().update(&ctx, rename).is_err());
        let finish = InboxTaskUpdate {
            status: UpdateAction::change_to(InboxTaskStatus::Done),
            ..Default::default()
        };
        let done = task.update(&ctx, finish).expect("status edit allowed");
        assert_eq!(done.completed_time, Some(ctx.action_timestamp));
        assert_eq!(done.header.version, 2);
    }

    #[test]
    fn non_user_sources_need_a_source_entity() {
        let mut draft = generated_draft();
        draft.source_entity_ref_id = None;
        assert!(InboxTask::new_inbox_task(&ctx(), EntityId::from_raw(2), draft).is_err());
    }

    #[test]
    fn reopening_clears_completed_time() {
        let ctx = ctx();
        let draft = InboxTaskDraft::user("Write".parse().expect("name"), EntityId::from_raw(1));
        let task = InboxTask::new_inbox_task(&ctx, EntityId::from_raw(2), draft).expect("task");
        assert!(task.accepted_time.is_some());
        let done = task
            .update(
                &ctx,
                InboxTaskUpdate {
                    status: UpdateAction::change_to(InboxTaskStatus::Done),
                    ..Default::default()
                },
            )
            .expect("done");
        let reopened = done
            .update(
                &ctx,
                InboxTaskUpdate {
                    status: UpdateAction::change_to(InboxTaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .expect("reopen");
        assert!(reopened.completed_time.is_none());
        assert!(reopened.working_time.is_some());
    }
}
