//! Big plans and their milestones.
//!
//! # Invariants
//! - Actionable date never falls after the due date.
//! - A milestone's date lies within its big plan's `[actionable_date, due_date]`.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, IndexField, InputValidationError, Timestamp, UpdateAction, ValidationResult,
};
use crate::model::note::note_link;
use crate::model::values::{BigPlanStatus, Difficulty, Eisen};
use serde::{Deserialize, Serialize};

simple_trunk!(
    BigPlanCollection("big_plan_collection", workspace_ref_id),
    links = &[contains_many("big_plan")]
);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BigPlanUpdate {
    pub name: UpdateAction<EntityName>,
    pub status: UpdateAction<BigPlanStatus>,
    pub project_ref_id: UpdateAction<EntityId>,
    pub is_key: UpdateAction<bool>,
    pub eisen: UpdateAction<Eisen>,
    pub difficulty: UpdateAction<Option<Difficulty>>,
    pub actionable_date: UpdateAction<Option<ADate>>,
    pub due_date: UpdateAction<Option<ADate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigPlan {
    #[serde(skip)]
    pub header: EntityHeader,
    pub big_plan_collection_ref_id: EntityId,
    pub project_ref_id: EntityId,
    pub name: EntityName,
    pub status: BigPlanStatus,
    pub is_key: bool,
    pub eisen: Eisen,
    pub difficulty: Option<Difficulty>,
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
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

impl BigPlan {
    #[allow(clippy::too_many_arguments)]
    pub fn new_big_plan(
        ctx: &DomainContext,
        big_plan_collection_ref_id: EntityId,
        project_ref_id: EntityId,
        name: EntityName,
        is_key: bool,
        eisen: Eisen,
        difficulty: Option<Difficulty>,
        actionable_date: Option<ADate>,
        due_date: Option<ADate>,
    ) -> ValidationResult<Self> {
        check_dates(actionable_date, due_date)?;
        let status = BigPlanStatus::Accepted;
        let args = ctx
            .frame()
            .arg("project_ref_id", &project_ref_id)
            .arg("name", &name)
            .arg("status", &status)
            .arg("is_key", &is_key)
            .arg("eisen", &eisen)
            .arg_opt("difficulty", difficulty.as_ref())
            .arg_opt("actionable_date", actionable_date.as_ref())
            .arg_opt("due_date", due_date.as_ref())
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_big_plan", args),
            big_plan_collection_ref_id,
            project_ref_id,
            name,
            status,
            is_key,
            eisen,
            difficulty,
            actionable_date,
            due_date,
            accepted_time: Some(ctx.action_timestamp),
            working_time: None,
            completed_time: None,
        })
    }

    pub fn update(mut self, ctx: &DomainContext, update: BigPlanUpdate) -> ValidationResult<Self> {
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

        let previous = self.status;
        self.name = update.name.or_else(self.name);
        self.status = update.status.or_else(self.status);
        self.project_ref_id = update.project_ref_id.or_else(self.project_ref_id);
        self.is_key = update.is_key.or_else(self.is_key);
        self.eisen = update.eisen.or_else(self.eisen);
        self.difficulty = update.difficulty.or_else(self.difficulty);
        self.actionable_date = actionable_date;
        self.due_date = due_date;

        let now = ctx.action_timestamp;
        if self.status != BigPlanStatus::NotStarted && self.accepted_time.is_none() {
            self.accepted_time = Some(now);
        }
        if self.status.is_working() && !previous.is_working() {
            self.working_time = Some(now);
        }
        if self.status.is_completed() && !previous.is_completed() {
            self.completed_time = Some(now);
        }
        if !self.status.is_completed() {
            self.completed_time = None;
        }
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    /// Whether `date` lies within the plan's actionable/due bounds.
    pub fn check_milestone_date(&self, date: ADate) -> ValidationResult<()> {
        if let Some(actionable) = self.actionable_date {
            if date < actionable {
                return Err(InputValidationError::new(
                    "milestone date before actionable date",
                ));
            }
        }
        if let Some(due) = self.due_date {
            if date > due {
                return Err(InputValidationError::new("milestone date after due date"));
            }
        }
        Ok(())
    }
}

impl Entity for BigPlan {
    const KIND: &'static str = "big_plan";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.big_plan_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![
            ("project_ref_id", self.project_ref_id.to_string()),
            ("status", self.status.to_string()),
        ]
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("big_plan_milestone", RefResolver::Parent),
            owns_many("inbox_task", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("source", "big_plan")]),
            owns_many("time_plan_activity", RefResolver::IsRefId("target_ref_id"))
                .with_filters(&[("target", "big_plan")]),
            note_link!("big_plan"),
        ];
        LINKS
    }
}

impl CrownEntity for BigPlan {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigPlanMilestone {
    #[serde(skip)]
    pub header: EntityHeader,
    pub big_plan_ref_id: EntityId,
    pub date: ADate,
    pub name: EntityName,
}

impl BigPlanMilestone {
    pub fn new_milestone(
        ctx: &DomainContext,
        big_plan: &BigPlan,
        date: ADate,
        name: EntityName,
    ) -> ValidationResult<Self> {
        big_plan.check_milestone_date(date)?;
        let args = ctx.frame().arg("date", &date).arg("name", &name).finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_big_plan_milestone", args),
            big_plan_ref_id: big_plan.header.ref_id,
            date,
            name,
        })
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        big_plan: &BigPlan,
        date: UpdateAction<ADate>,
        name: UpdateAction<EntityName>,
    ) -> ValidationResult<Self> {
        if let Some(next) = date.value() {
            big_plan.check_milestone_date(*next)?;
        }
        let args = ctx.frame().update("date", &date).update("name", &name).finish();
        self.date = date.or_else(self.date);
        self.name = name.or_else(self.name);
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }
}

impl Entity for BigPlanMilestone {
    const KIND: &'static str = "big_plan_milestone";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.big_plan_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }
}

impl CrownEntity for BigPlanMilestone {}

#[cfg(test)]
mod tests {
    use super::{BigPlan, BigPlanMilestone};
    use crate::model::framework::{DomainContext, Entity, EntityId, EventSource, Timestamp};
    use crate::model::values::{standard_registry, BigPlanStatus, Eisen};
    use std::sync::Arc;

    fn ctx() -> DomainContext {
        DomainContext::new(
            EventSource::Web,
            "2024-05-01T09:00:00Z".parse::<Timestamp>().expect("timestamp"),
            Arc::new(standard_registry().expect("registry")),
        )
    }

    fn launch(ctx: &DomainContext) -> BigPlan {
        BigPlan::new_big_plan(
            ctx,
            EntityId::from_raw(1),
            EntityId::from_raw(2),
            "Launch".parse().expect("name"),
            false,
            Eisen::Regular,
            None,
            Some("2024-06-01".parse().expect("date")),
            Some("2024-06-30".parse().expect("date")),
        )
        .expect("valid plan")
    }

    #[test]
    fn new_big_plan_is_accepted_with_one_event() {
        let ctx = ctx();
        let plan = launch(&ctx);
        assert_eq!(plan.status, BigPlanStatus::Accepted);
        assert_eq!(plan.version(), 1);
        assert_eq!(plan.header.pending_events().len(), 1);
    }

    #[test]
    fn milestone_outside_bounds_is_rejected() {
        let ctx = ctx();
        let plan = launch(&ctx);
        let err = BigPlanMilestone::new_milestone(
            &ctx,
            &plan,
            "2024-05-15".parse().expect("date"),
            "Kickoff".parse().expect("name"),
        )
        .expect_err("before actionable date");
        assert_eq!(err.message(), "milestone date before actionable date");
        assert!(BigPlanMilestone::new_milestone(
            &ctx,
            &plan,
            "2024-06-10".parse().expect("date"),
            "Kickoff".parse().expect("name"),
        )
        .is_ok());
    }
}
