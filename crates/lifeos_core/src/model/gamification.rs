//! Score log, its entries and the derived score records.
//!
//! # Invariants
//! - `total_score` is the sum of the bucket's deltas, floored at zero.
//! - `inbox_task_cnt + big_plan_cnt` equals the number of entries in the bucket.

use crate::model::framework::entity::{contains_many, entity_header, LinkDescriptor};
use crate::model::framework::enum_value::enum_value;
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityStructure,
    IndexField, Record, Timestamp, TrunkEntity,
};
use crate::model::values::{Difficulty, RecurringTaskPeriod};
use serde::{Deserialize, Serialize};

enum_value! {
    pub enum ScoreSource("score_source") {
        InboxTask => "inbox_task",
        BigPlan => "big_plan",
    }
}

/// Timeline label used for the lifetime bucket.
pub const LIFETIME_TIMELINE: &str = "lifetime";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreLog {
    #[serde(skip)]
    pub header: EntityHeader,
    pub user_ref_id: EntityId,
}

impl ScoreLog {
    pub fn new(ctx: &DomainContext, user_ref_id: EntityId) -> Self {
        let args = ctx.frame().arg("user_ref_id", &user_ref_id).finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_score_log", args),
            user_ref_id,
        }
    }
}

impl Entity for ScoreLog {
    const KIND: &'static str = "score_log";
    const STRUCTURE: EntityStructure = EntityStructure::Trunk;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.user_ref_id)
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[contains_many("score_log_entry")];
        LINKS
    }
}

impl TrunkEntity for ScoreLog {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreLogEntry {
    #[serde(skip)]
    pub header: EntityHeader,
    pub score_log_ref_id: EntityId,
    pub source: ScoreSource,
    pub task_ref_id: EntityId,
    pub difficulty: Option<Difficulty>,
    pub success: bool,
    pub has_lucky_puppy_bonus: bool,
    pub score: i64,
}

impl ScoreLogEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new_entry(
        ctx: &DomainContext,
        score_log_ref_id: EntityId,
        source: ScoreSource,
        task_ref_id: EntityId,
        difficulty: Option<Difficulty>,
        success: bool,
        has_lucky_puppy_bonus: bool,
        score: i64,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("source", &source)
            .arg("task_ref_id", &task_ref_id)
            .arg_opt("difficulty", difficulty.as_ref())
            .arg("success", &success)
            .arg("has_lucky_puppy_bonus", &has_lucky_puppy_bonus)
            .arg("score", &score)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_score_log_entry", args),
            score_log_ref_id,
            source,
            task_ref_id,
            difficulty,
            success,
            has_lucky_puppy_bonus,
            score,
        }
    }
}

impl Entity for ScoreLogEntry {
    const KIND: &'static str = "score_log_entry";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.score_log_ref_id)
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![
            ("source", self.source.to_string()),
            ("task_ref_id", self.task_ref_id.to_string()),
        ]
    }
}

impl CrownEntity for ScoreLogEntry {}

fn period_label(period: Option<RecurringTaskPeriod>) -> &'static str {
    period.map(|period| period.as_str()).unwrap_or(LIFETIME_TIMELINE)
}

/// Running score for one `(period, timeline)` bucket; `None` period is lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub score_log_ref_id: EntityId,
    pub period: Option<RecurringTaskPeriod>,
    pub timeline: String,
    pub score_sum: i64,
    pub total_score: i64,
    pub inbox_task_cnt: u32,
    pub big_plan_cnt: u32,
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
}

impl ScoreStats {
    pub fn new_stats(
        ctx: &DomainContext,
        score_log_ref_id: EntityId,
        period: Option<RecurringTaskPeriod>,
        timeline: String,
    ) -> Self {
        Self {
            score_log_ref_id,
            period,
            timeline,
            score_sum: 0,
            total_score: 0,
            inbox_task_cnt: 0,
            big_plan_cnt: 0,
            created_time: ctx.action_timestamp,
            last_modified_time: ctx.action_timestamp,
        }
    }

    pub fn key_for(period: Option<RecurringTaskPeriod>, timeline: &str) -> String {
        format!("{}:{timeline}", period_label(period))
    }

    pub fn add_entry(mut self, ctx: &DomainContext, entry: &ScoreLogEntry) -> Self {
        self.score_sum += entry.score;
        self.total_score = self.score_sum.max(0);
        match entry.source {
            ScoreSource::InboxTask => self.inbox_task_cnt += 1,
            ScoreSource::BigPlan => self.big_plan_cnt += 1,
        }
        self.last_modified_time = ctx.action_timestamp;
        self
    }
}

impl Record for ScoreStats {
    const KIND: &'static str = "score_stats";

    fn parent_ref_id(&self) -> EntityId {
        self.score_log_ref_id
    }

    fn raw_key(&self) -> String {
        Self::key_for(self.period, &self.timeline)
    }

    fn created_time(&self) -> Timestamp {
        self.created_time
    }

    fn last_modified_time(&self) -> Timestamp {
        self.last_modified_time
    }
}

/// Best `sub_period` bucket ever seen inside one `(period, timeline)` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePeriodBest {
    pub score_log_ref_id: EntityId,
    pub period: Option<RecurringTaskPeriod>,
    pub timeline: String,
    pub sub_period: RecurringTaskPeriod,
    pub total_score: i64,
    pub inbox_task_cnt: u32,
    pub big_plan_cnt: u32,
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
}

impl ScorePeriodBest {
    pub fn new_best(
        ctx: &DomainContext,
        score_log_ref_id: EntityId,
        period: Option<RecurringTaskPeriod>,
        timeline: String,
        sub_period: RecurringTaskPeriod,
    ) -> Self {
        Self {
            score_log_ref_id,
            period,
            timeline,
            sub_period,
            total_score: 0,
            inbox_task_cnt: 0,
            big_plan_cnt: 0,
            created_time: ctx.action_timestamp,
            last_modified_time: ctx.action_timestamp,
        }
    }

    pub fn key_for(period: Option<RecurringTaskPeriod>, timeline: &str, sub_period: RecurringTaskPeriod) -> String {
        format!("{}:{timeline}:{sub_period}", period_label(period))
    }

    /// Keeps the snapshot when the candidate beats the stored best.
    pub fn offer(mut self, ctx: &DomainContext, candidate: &ScoreStats) -> Self {
        if candidate.total_score > self.total_score {
            self.total_score = candidate.total_score;
            self.inbox_task_cnt = candidate.inbox_task_cnt;
            self.big_plan_cnt = candidate.big_plan_cnt;
            self.last_modified_time = ctx.action_timestamp;
        }
        self
    }
}

impl Record for ScorePeriodBest {
    const KIND: &'static str = "score_period_best";

    fn parent_ref_id(&self) -> EntityId {
        self.score_log_ref_id
    }

    fn raw_key(&self) -> String {
        Self::key_for(self.period, &self.timeline, self.sub_period)
    }

    fn created_time(&self) -> Timestamp {
        self.created_time
    }

    fn last_modified_time(&self) -> Timestamp {
        self.last_modified_time
    }
}

/// Day-granularity snapshot of the daily score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistory {
    pub score_log_ref_id: EntityId,
    pub date: ADate,
    pub total_score: i64,
    pub inbox_task_cnt: u32,
    pub big_plan_cnt: u32,
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
}

impl ScoreHistory {
    pub fn snapshot(ctx: &DomainContext, score_log_ref_id: EntityId, date: ADate, daily: &ScoreStats) -> Self {
        Self {
            score_log_ref_id,
            date,
            total_score: daily.total_score,
            inbox_task_cnt: daily.inbox_task_cnt,
            big_plan_cnt: daily.big_plan_cnt,
            created_time: ctx.action_timestamp,
            last_modified_time: ctx.action_timestamp,
        }
    }
}

impl Record for ScoreHistory {
    const KIND: &'static str = "score_history";

    fn parent_ref_id(&self) -> EntityId {
        self.score_log_ref_id
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

#[cfg(test)]
mod tests {
    use super::{ScoreLogEntry, ScoreSource, ScoreStats};
    use crate::model::framework::{DomainContext, EntityId, EventSource, Timestamp};
    use crate::model::values::{standard_registry, RecurringTaskPeriod};
    use std::sync::Arc;

    #[test]
    fn total_score_never_goes_negative() {
        let ctx = DomainContext::new(
            EventSource::Web,
            "2024-03-04T09:00:00Z".parse::<Timestamp>().expect("timestamp"),
            Arc::new(standard_registry().expect("registry")),
        );
        let log = EntityId::from_raw(1);
        let entry = |source, score| {
            ScoreLogEntry::new_entry(&ctx, log, source, EntityId::from_raw(5), None, score > 0, false, score)
        };
        let stats = ScoreStats::new_stats(&ctx, log, Some(RecurringTaskPeriod::Daily), "t".into())
            .add_entry(&ctx, &entry(ScoreSource::InboxTask, -2))
            .add_entry(&ctx, &entry(ScoreSource::BigPlan, 10))
            .add_entry(&ctx, &entry(ScoreSource::InboxTask, -10));
        assert_eq!(stats.score_sum, -2);
        assert_eq!(stats.total_score, 0);
        assert_eq!(stats.inbox_task_cnt + stats.big_plan_cnt, 3);
        assert_eq!(stats.big_plan_cnt, 1);
    }
}
