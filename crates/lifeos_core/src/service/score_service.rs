//! Gamification scoring.
//!
//! # Responsibility
//! - Turn inbox task and big plan status transitions into score log entries.
//! - Keep `ScoreStats`, `ScorePeriodBest` and `ScoreHistory` in step with the log.
//!
//! # Invariants
//! - Scores are only recorded for users with gamification enabled.
//! - Leaving a completed status appends the negated sum of the task's prior entries.
//! - Every entry feeds the lifetime bucket and one bucket per period of "today".

use crate::config::ScoringConfig;
use crate::model::big_plan::BigPlan;
use crate::model::framework::{ADate, Entity, EntityId};
use crate::model::gamification::{
    ScoreHistory, ScoreLog, ScoreLogEntry, ScorePeriodBest, ScoreSource, ScoreStats,
};
use crate::model::inbox_task::InboxTask;
use crate::model::user::User;
use crate::model::values::{
    BigPlanStatus, Difficulty, InboxTaskStatus, RecurringTaskPeriod, UserFeature,
};
use crate::repo::{EntityRepository, RecordRepository, RefFilter, TrunkEntityRepository};
use crate::scheduler::timeline_for;
use crate::service::{ServiceResult, ServiceScope};
use log::info;
use rand::Rng;

const HISTORY_DAYS: i64 = 30;

/// Entries appended for one transition.
#[derive(Debug, Clone, Default)]
pub struct RecordedScore {
    pub entries: Vec<ScoreLogEntry>,
    pub has_lucky_puppy_bonus: bool,
}

impl RecordedScore {
    pub fn total(&self) -> i64 {
        self.entries.iter().map(|entry| entry.score).sum()
    }
}

/// Score buckets of "today" as seen by the caller.
#[derive(Debug, Clone)]
pub struct ScoreOverview {
    pub daily: ScoreStats,
    pub weekly: ScoreStats,
    pub monthly: ScoreStats,
    pub quarterly: ScoreStats,
    pub yearly: ScoreStats,
    pub lifetime: ScoreStats,
    pub best: Vec<ScorePeriodBest>,
    pub history: Vec<ScoreHistory>,
}

/// Base delta for marking an inbox task done; key tasks are multiplied.
pub fn inbox_task_delta(settings: &ScoringConfig, difficulty: Option<Difficulty>, is_key: bool) -> i64 {
    let base = match difficulty.unwrap_or(Difficulty::Easy) {
        Difficulty::Easy => settings.easy,
        Difficulty::Medium => settings.medium,
        Difficulty::Hard => settings.hard,
    };
    if is_key {
        base * settings.key_multiplier
    } else {
        base
    }
}

/// Records the score effect of an inbox task moving off `previous`.
pub fn record_inbox_task_transition(
    scope: ServiceScope<'_, '_>,
    settings: &ScoringConfig,
    user: &User,
    previous: InboxTaskStatus,
    task: &InboxTask,
) -> ServiceResult<RecordedScore> {
    let success = match task.status {
        InboxTaskStatus::Done => Some(true),
        InboxTaskStatus::NotDone => Some(false),
        _ => None,
    };
    let delta = inbox_task_delta(settings, task.difficulty, task.is_key);
    record_transition(
        scope,
        settings,
        user,
        Transition {
            source: ScoreSource::InboxTask,
            task_ref_id: task.ref_id(),
            difficulty: task.difficulty,
            was_completed: previous.is_completed(),
            success,
            changed: previous != task.status,
            delta,
        },
    )
}

/// Records the score effect of a big plan moving off `previous`.
pub fn record_big_plan_transition(
    scope: ServiceScope<'_, '_>,
    settings: &ScoringConfig,
    user: &User,
    previous: BigPlanStatus,
    big_plan: &BigPlan,
) -> ServiceResult<RecordedScore> {
    let success = match big_plan.status {
        BigPlanStatus::Done => Some(true),
        BigPlanStatus::NotDone => Some(false),
        _ => None,
    };
    record_transition(
        scope,
        settings,
        user,
        Transition {
            source: ScoreSource::BigPlan,
            task_ref_id: big_plan.ref_id(),
            difficulty: big_plan.difficulty,
            was_completed: previous.is_completed(),
            success,
            changed: previous != big_plan.status,
            delta: settings.big_plan,
        },
    )
}

struct Transition {
    source: ScoreSource,
    task_ref_id: EntityId,
    difficulty: Option<Difficulty>,
    was_completed: bool,
    /// `Some` when the new status is a completed one.
    success: Option<bool>,
    changed: bool,
    delta: i64,
}

fn record_transition(
    scope: ServiceScope<'_, '_>,
    settings: &ScoringConfig,
    user: &User,
    transition: Transition,
) -> ServiceResult<RecordedScore> {
    let mut recorded = RecordedScore::default();
    if !transition.changed || !user.feature_flags.is_enabled(UserFeature::Gamification) {
        return Ok(recorded);
    }
    if !transition.was_completed && transition.success.is_none() {
        return Ok(recorded);
    }
    let Some(log) = scope
        .uow
        .get_for::<ScoreLog>()
        .load_by_parent_optional(user.ref_id())?
    else {
        return Ok(recorded);
    };
    let entries = scope.uow.get_for::<ScoreLogEntry>();

    if transition.was_completed {
        let prior: i64 = entries
            .find_all_generic(
                Some(log.ref_id()),
                false,
                &[
                    RefFilter::eq("source", transition.source),
                    RefFilter::eq("task_ref_id", transition.task_ref_id),
                ],
            )?
            .iter()
            .map(|entry| entry.score)
            .sum();
        if prior != 0 {
            let compensating = ScoreLogEntry::new_entry(
                scope.ctx,
                log.ref_id(),
                transition.source,
                transition.task_ref_id,
                transition.difficulty,
                false,
                false,
                -prior,
            );
            recorded.entries.push(append_entry(scope, log.ref_id(), compensating)?);
        }
    }

    if let Some(success) = transition.success {
        let mut score = if success { transition.delta } else { -transition.delta };
        let lucky = score > 0 && draw_lucky_puppy(settings.lucky_puppy_probability);
        if lucky {
            score += settings.lucky_puppy_bonus;
        }
        let entry = ScoreLogEntry::new_entry(
            scope.ctx,
            log.ref_id(),
            transition.source,
            transition.task_ref_id,
            transition.difficulty,
            success,
            lucky,
            score,
        );
        recorded.entries.push(append_entry(scope, log.ref_id(), entry)?);
        recorded.has_lucky_puppy_bonus = lucky;
    }

    info!(
        "event=score_record module=service status=ok source={} task_id={} entries={} delta={}",
        transition.source,
        transition.task_ref_id,
        recorded.entries.len(),
        recorded.total()
    );
    Ok(recorded)
}

fn draw_lucky_puppy(probability: f64) -> bool {
    if probability <= 0.0 {
        return false;
    }
    rand::thread_rng().gen_bool(probability.min(1.0))
}

/// Persists `entry` and folds it into every bucket of today.
fn append_entry(
    scope: ServiceScope<'_, '_>,
    score_log_ref_id: EntityId,
    entry: ScoreLogEntry,
) -> ServiceResult<ScoreLogEntry> {
    let entry = scope.uow.get_for::<ScoreLogEntry>().create(entry)?;
    scope.reporter.mark_created(&entry);

    let today = scope.ctx.action_timestamp.date();
    let stats_repo = scope.uow.records::<ScoreStats>();
    let mut buckets: Vec<Option<RecurringTaskPeriod>> = vec![None];
    buckets.extend(RecurringTaskPeriod::ALL.iter().copied().map(Some));

    let mut updated = Vec::with_capacity(buckets.len());
    for period in buckets {
        let stats = load_stats(scope, score_log_ref_id, period, today)?;
        updated.push(stats_repo.upsert(stats.add_entry(scope.ctx, &entry))?);
    }

    let best_repo = scope.uow.records::<ScorePeriodBest>();
    for container in &updated {
        let container_period = container.period;
        for candidate in &updated {
            let Some(sub_period) = candidate.period else {
                continue;
            };
            if container_period.is_some_and(|period| sub_period >= period) {
                continue;
            }
            let key = ScorePeriodBest::key_for(container_period, &container.timeline, sub_period);
            let best = best_repo
                .load_optional(score_log_ref_id, &key)?
                .unwrap_or_else(|| {
                    ScorePeriodBest::new_best(
                        scope.ctx,
                        score_log_ref_id,
                        container_period,
                        container.timeline.clone(),
                        sub_period,
                    )
                });
            best_repo.upsert(best.offer(scope.ctx, candidate))?;
        }
    }

    if let Some(daily) = updated
        .iter()
        .find(|stats| stats.period == Some(RecurringTaskPeriod::Daily))
    {
        scope
            .uow
            .records::<ScoreHistory>()
            .upsert(ScoreHistory::snapshot(scope.ctx, score_log_ref_id, today, daily))?;
    }
    Ok(entry)
}

fn load_stats(
    scope: ServiceScope<'_, '_>,
    score_log_ref_id: EntityId,
    period: Option<RecurringTaskPeriod>,
    today: ADate,
) -> ServiceResult<ScoreStats> {
    let timeline = timeline_for(period, today);
    let key = ScoreStats::key_for(period, &timeline);
    Ok(scope
        .uow
        .records::<ScoreStats>()
        .load_optional(score_log_ref_id, &key)?
        .unwrap_or_else(|| ScoreStats::new_stats(scope.ctx, score_log_ref_id, period, timeline)))
}

/// Current buckets, best sub-periods and recent history of a user's scores.
pub fn load_overview(
    scope: ServiceScope<'_, '_>,
    user_ref_id: EntityId,
    today: ADate,
) -> ServiceResult<ScoreOverview> {
    let log = scope.uow.get_for::<ScoreLog>().load_by_parent(user_ref_id)?;
    let log_ref_id = log.ref_id();
    let stats = |period| load_stats(scope, log_ref_id, period, today);

    let mut best = Vec::new();
    let best_repo = scope.uow.records::<ScorePeriodBest>();
    let mut containers: Vec<Option<RecurringTaskPeriod>> = vec![None];
    containers.extend(RecurringTaskPeriod::ALL.iter().copied().map(Some));
    for container in containers {
        let timeline = timeline_for(container, today);
        for sub_period in RecurringTaskPeriod::ALL {
            if container.is_some_and(|period| *sub_period >= period) {
                continue;
            }
            let key = ScorePeriodBest::key_for(container, &timeline, *sub_period);
            if let Some(found) = best_repo.load_optional(log_ref_id, &key)? {
                best.push(found);
            }
        }
    }

    let history = scope.uow.records::<ScoreHistory>().find_range(
        log_ref_id,
        &today.add_days(-HISTORY_DAYS).to_string(),
        &today.to_string(),
    )?;

    Ok(ScoreOverview {
        daily: stats(Some(RecurringTaskPeriod::Daily))?,
        weekly: stats(Some(RecurringTaskPeriod::Weekly))?,
        monthly: stats(Some(RecurringTaskPeriod::Monthly))?,
        quarterly: stats(Some(RecurringTaskPeriod::Quarterly))?,
        yearly: stats(Some(RecurringTaskPeriod::Yearly))?,
        lifetime: stats(None)?,
        best,
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::{inbox_task_delta, load_overview, record_inbox_task_transition};
    use crate::config::ScoringConfig;
    use crate::model::framework::{Entity, EntityId};
    use crate::model::gamification::{ScoreLog, ScoreLogEntry};
    use crate::model::inbox_task::{InboxTask, InboxTaskDraft};
    use crate::model::user::User;
    use crate::model::values::{
        Difficulty, InboxTaskStatus, Timezone, UserFeature, UserFeatureFlags,
    };
    use crate::repo::EntityRepository;
    use crate::service::test_support::{ctx_at, domain_conn, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    fn settings() -> ScoringConfig {
        ScoringConfig {
            lucky_puppy_probability: 0.0,
            ..ScoringConfig::default()
        }
    }

    #[test]
    fn deltas_follow_difficulty_and_key_flag() {
        let settings = settings();
        assert_eq!(inbox_task_delta(&settings, None, false), 1);
        assert_eq!(inbox_task_delta(&settings, Some(Difficulty::Medium), false), 2);
        assert_eq!(inbox_task_delta(&settings, Some(Difficulty::Hard), true), 10);
    }

    #[test]
    fn reopening_a_done_task_compensates() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let user = uow
            .get_for::<User>()
            .create(User::new_user(
                &ctx,
                "s@b.c".parse().expect("email"),
                "Sam".parse().expect("name"),
                Timezone::utc(),
                UserFeatureFlags::default(),
            ))
            .expect("user");
        uow.get_for::<ScoreLog>()
            .create(ScoreLog::new(&ctx, user.ref_id()))
            .expect("log");

        let mut draft = InboxTaskDraft::user("Write".parse().expect("name"), EntityId::from_raw(3));
        draft.difficulty = Some(Difficulty::Hard);
        draft.status = InboxTaskStatus::Done;
        let task = uow
            .get_for::<InboxTask>()
            .create(InboxTask::new_inbox_task(&ctx, EntityId::from_raw(2), draft).expect("task"))
            .expect("stored");

        let done = record_inbox_task_transition(scope, &settings(), &user, InboxTaskStatus::Accepted, &task)
            .expect("score");
        assert_eq!(done.total(), 5);

        let mut reopened = task.clone();
        reopened.status = InboxTaskStatus::InProgress;
        let undone =
            record_inbox_task_transition(scope, &settings(), &user, InboxTaskStatus::Done, &reopened)
                .expect("score");
        assert_eq!(undone.total(), -5);

        let overview = load_overview(scope, user.ref_id(), ctx.action_timestamp.date()).expect("overview");
        assert_eq!(overview.daily.total_score, 0);
        assert_eq!(overview.lifetime.inbox_task_cnt, 2);
        assert_eq!(overview.history.len(), 1);
        assert!(overview.best.iter().any(|best| best.total_score == 5));
    }

    #[test]
    fn disabled_gamification_records_nothing() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let user = uow
            .get_for::<User>()
            .create(User::new_user(
                &ctx,
                "t@b.c".parse().expect("email"),
                "Tee".parse().expect("name"),
                Timezone::utc(),
                UserFeatureFlags::default().with(UserFeature::Gamification, false),
            ))
            .expect("user");
        uow.get_for::<ScoreLog>()
            .create(ScoreLog::new(&ctx, user.ref_id()))
            .expect("log");
        let mut draft = InboxTaskDraft::user("Read".parse().expect("name"), EntityId::from_raw(3));
        draft.status = InboxTaskStatus::Done;
        let task = uow
            .get_for::<InboxTask>()
            .create(InboxTask::new_inbox_task(&ctx, EntityId::from_raw(2), draft).expect("task"))
            .expect("stored");
        let recorded =
            record_inbox_task_transition(scope, &settings(), &user, InboxTaskStatus::Accepted, &task)
                .expect("score");
        assert!(recorded.entries.is_empty());
        assert_eq!(reporter.count_of(crate::service::ChangeKind::Created, ScoreLogEntry::KIND), 0);
    }
}
