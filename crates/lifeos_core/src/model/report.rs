//! Report snapshot shapes shared by the report engine and journal stats.

use crate::model::framework::realm::serde_realm_value;
use crate::model::framework::{ADate, EntityId};
use crate::model::values::{BigPlanStatus, InboxTaskSource, RecurringTaskPeriod};
use serde::{Deserialize, Serialize};

/// Counts of work items by lifecycle stage within one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub created: u32,
    pub workable: u32,
    pub working: u32,
    pub not_done: u32,
    pub done: u32,
}

impl StatusCounts {
    pub fn completed(&self) -> u32 {
        self.not_done + self.done
    }

    pub fn add(&mut self, other: &StatusCounts) {
        self.created += other.created;
        self.workable += other.workable;
        self.working += other.working;
        self.not_done += other.not_done;
        self.done += other.done;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub source: InboxTaskSource,
    pub inbox_tasks: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBreakdown {
    pub ref_id: EntityId,
    pub name: String,
    pub inbox_tasks: StatusCounts,
    pub big_plans: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBreakdown {
    pub period: RecurringTaskPeriod,
    pub timeline: String,
    pub start_date: ADate,
    pub end_date: ADate,
    pub inbox_tasks: StatusCounts,
    pub big_plans: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringBreakdown {
    pub ref_id: EntityId,
    pub name: String,
    pub period: RecurringTaskPeriod,
    pub inbox_tasks: StatusCounts,
    /// Done-task streak per day, oldest first; only filled for habits.
    pub streak: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigPlanBreakdown {
    pub ref_id: EntityId,
    pub name: String,
    pub status: BigPlanStatus,
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
    pub inbox_tasks: StatusCounts,
}

/// Full report for one `(period, today)` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriodResult {
    pub today: ADate,
    pub period: RecurringTaskPeriod,
    pub timeline: String,
    pub start_date: ADate,
    pub end_date: ADate,
    pub sources: Vec<InboxTaskSource>,
    pub global_inbox_tasks: StatusCounts,
    pub global_big_plans: StatusCounts,
    pub per_source: Vec<SourceBreakdown>,
    pub per_project: Vec<ProjectBreakdown>,
    pub per_period: Vec<PeriodBreakdown>,
    pub per_habit: Vec<RecurringBreakdown>,
    pub per_chore: Vec<RecurringBreakdown>,
    pub per_big_plan: Vec<BigPlanBreakdown>,
}

serde_realm_value!(ReportPeriodResult, "report_period_result");
