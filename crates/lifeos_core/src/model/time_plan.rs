//! Time plans and the activities committed to inside them.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, IndexField, UpdateAction,
};
use crate::model::note::note_link;
use crate::model::values::{
    RecurringTaskPeriod, TimePlanActivityFeasibility, TimePlanActivityKind, TimePlanActivityTarget,
};
use serde::{Deserialize, Serialize};

simple_trunk!(
    TimePlanDomain("time_plan_domain", workspace_ref_id),
    links = &[contains_many("time_plan")]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePlan {
    #[serde(skip)]
    pub header: EntityHeader,
    pub time_plan_domain_ref_id: EntityId,
    pub name: EntityName,
    pub right_now: ADate,
    pub period: RecurringTaskPeriod,
    pub timeline: String,
    pub start_date: ADate,
    pub end_date: ADate,
}

impl TimePlan {
    pub fn new_time_plan(
        ctx: &DomainContext,
        time_plan_domain_ref_id: EntityId,
        right_now: ADate,
        period: RecurringTaskPeriod,
        timeline: String,
        start_date: ADate,
        end_date: ADate,
    ) -> Self {
        let name = EntityName::from_generated(&format!("Plan for {period} {timeline}"));
        let args = ctx
            .frame()
            .arg("right_now", &right_now)
            .arg("period", &period)
            .arg("timeline", &timeline)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_time_plan", args),
            time_plan_domain_ref_id,
            name,
            right_now,
            period,
            timeline,
            start_date,
            end_date,
        }
    }

    pub fn covers(&self, date: ADate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

impl Entity for TimePlan {
    const KIND: &'static str = "time_plan";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.time_plan_domain_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![("period", self.period.to_string())]
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!(
            "time_plan:{}:{}:{}",
            self.time_plan_domain_ref_id, self.period, self.timeline
        ))
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("time_plan_activity", RefResolver::Parent),
            note_link!("time_plan"),
        ];
        LINKS
    }
}

impl CrownEntity for TimePlan {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePlanActivity {
    #[serde(skip)]
    pub header: EntityHeader,
    pub time_plan_ref_id: EntityId,
    pub target: TimePlanActivityTarget,
    pub target_ref_id: EntityId,
    pub kind: TimePlanActivityKind,
    pub feasibility: TimePlanActivityFeasibility,
}

impl TimePlanActivity {
    pub fn new_activity(
        ctx: &DomainContext,
        time_plan_ref_id: EntityId,
        target: TimePlanActivityTarget,
        target_ref_id: EntityId,
        kind: TimePlanActivityKind,
        feasibility: TimePlanActivityFeasibility,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("target", &target)
            .arg("target_ref_id", &target_ref_id)
            .arg("kind", &kind)
            .arg("feasibility", &feasibility)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_time_plan_activity", args),
            time_plan_ref_id,
            target,
            target_ref_id,
            kind,
            feasibility,
        }
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        kind: UpdateAction<TimePlanActivityKind>,
        feasibility: UpdateAction<TimePlanActivityFeasibility>,
    ) -> Self {
        let args = ctx
            .frame()
            .update("kind", &kind)
            .update("feasibility", &feasibility)
            .finish();
        self.kind = kind.or_else(self.kind);
        self.feasibility = feasibility.or_else(self.feasibility);
        self.header.record_update(ctx, "update", args);
        self
    }
}

impl Entity for TimePlanActivity {
    const KIND: &'static str = "time_plan_activity";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.time_plan_ref_id)
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![
            ("target", self.target.to_string()),
            ("target_ref_id", self.target_ref_id.to_string()),
        ]
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!(
            "activity:{}:{}:{}",
            self.time_plan_ref_id, self.target, self.target_ref_id
        ))
    }
}

impl CrownEntity for TimePlanActivity {}
