//! Period reports over inbox tasks and big plans.
//!
//! # Responsibility
//! - Count work items per lifecycle stage inside one `(period, today)` bucket.
//! - Break the counts down by source, project, sub-period, habit, chore and big plan.
//!
//! # Invariants
//! - A task counts in a stage when the stage's timestamp falls inside the bucket.
//! - Sub-period rows tile the bucket with the next finer period.
//! - Reports read only; they never mark the progress reporter.

use crate::model::big_plan::{BigPlan, BigPlanCollection};
use crate::model::chore::{Chore, ChoreCollection};
use crate::model::framework::{ADate, Entity, EntityId, Timestamp};
use crate::model::habit::{Habit, HabitCollection};
use crate::model::inbox_task::{InboxTask, InboxTaskCollection};
use crate::model::project::{Project, ProjectCollection};
use crate::model::report::{
    BigPlanBreakdown, PeriodBreakdown, ProjectBreakdown, RecurringBreakdown, ReportPeriodResult,
    SourceBreakdown, StatusCounts,
};
use crate::model::values::{BigPlanStatus, InboxTaskSource, InboxTaskStatus, RecurringTaskPeriod};
use crate::repo::EntityRepository;
use crate::scheduler::Schedule;
use crate::service::habit_service::load_streak_marks;
use crate::service::{ServiceResult, ServiceScope};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// What to report on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub today: ADate,
    pub period: RecurringTaskPeriod,
    pub sources: Option<Vec<InboxTaskSource>>,
    pub project_ref_ids: Option<Vec<EntityId>>,
    pub big_plan_ref_ids: Option<Vec<EntityId>>,
    pub habit_ref_ids: Option<Vec<EntityId>>,
    pub chore_ref_ids: Option<Vec<EntityId>>,
    pub metric_ref_ids: Option<Vec<EntityId>>,
    pub person_ref_ids: Option<Vec<EntityId>>,
    pub slack_task_ref_ids: Option<Vec<EntityId>>,
    pub email_task_ref_ids: Option<Vec<EntityId>>,
}

impl ReportRequest {
    pub fn new(today: ADate, period: RecurringTaskPeriod) -> Self {
        Self {
            today,
            period,
            sources: None,
            project_ref_ids: None,
            big_plan_ref_ids: None,
            habit_ref_ids: None,
            chore_ref_ids: None,
            metric_ref_ids: None,
            person_ref_ids: None,
            slack_task_ref_ids: None,
            email_task_ref_ids: None,
        }
    }

    fn source_filter(&self, source: InboxTaskSource) -> Option<&Vec<EntityId>> {
        match source {
            InboxTaskSource::BigPlan => self.big_plan_ref_ids.as_ref(),
            InboxTaskSource::Habit => self.habit_ref_ids.as_ref(),
            InboxTaskSource::Chore => self.chore_ref_ids.as_ref(),
            InboxTaskSource::Metric => self.metric_ref_ids.as_ref(),
            InboxTaskSource::PersonCatchUp | InboxTaskSource::PersonBirthday => self.person_ref_ids.as_ref(),
            InboxTaskSource::SlackTask => self.slack_task_ref_ids.as_ref(),
            InboxTaskSource::EmailTask => self.email_task_ref_ids.as_ref(),
            InboxTaskSource::User | InboxTaskSource::WorkingMemCleanup => None,
        }
    }

    fn keeps_task(&self, task: &InboxTask) -> bool {
        if let Some(sources) = &self.sources {
            if !sources.contains(&task.source) {
                return false;
            }
        }
        if let Some(projects) = &self.project_ref_ids {
            if !projects.contains(&task.project_ref_id) {
                return false;
            }
        }
        match (self.source_filter(task.source), task.source_entity_ref_id) {
            (Some(ids), Some(source_entity)) => ids.contains(&source_entity),
            _ => true,
        }
    }

    fn keeps_big_plan(&self, big_plan: &BigPlan) -> bool {
        let wanted_source = self
            .sources
            .as_ref()
            .map_or(true, |sources| sources.contains(&InboxTaskSource::BigPlan));
        let wanted_project = self
            .project_ref_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&big_plan.project_ref_id));
        let wanted_plan = self
            .big_plan_ref_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&big_plan.ref_id()));
        wanted_source && wanted_project && wanted_plan
    }
}

fn within(time: Option<Timestamp>, schedule: &Schedule) -> bool {
    time.map_or(false, |time| schedule.contains(time.date()))
}

fn count_task(counts: &mut StatusCounts, task: &InboxTask, schedule: &Schedule) {
    if schedule.contains(task.header.created_time.date()) {
        counts.created += 1;
    }
    if within(task.accepted_time, schedule) {
        counts.workable += 1;
    }
    if within(task.working_time, schedule) {
        counts.working += 1;
    }
    if within(task.completed_time, schedule) {
        match task.status {
            InboxTaskStatus::Done => counts.done += 1,
            InboxTaskStatus::NotDone => counts.not_done += 1,
            _ => {}
        }
    }
}

fn count_big_plan(counts: &mut StatusCounts, big_plan: &BigPlan, schedule: &Schedule) {
    if schedule.contains(big_plan.header.created_time.date()) {
        counts.created += 1;
    }
    if within(big_plan.accepted_time, schedule) {
        counts.workable += 1;
    }
    if within(big_plan.working_time, schedule) {
        counts.working += 1;
    }
    if within(big_plan.completed_time, schedule) {
        match big_plan.status {
            BigPlanStatus::Done => counts.done += 1,
            BigPlanStatus::NotDone => counts.not_done += 1,
            _ => {}
        }
    }
}

fn counts_for<'t>(tasks: impl IntoIterator<Item = &'t InboxTask>, schedule: &Schedule) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for task in tasks {
        count_task(&mut counts, task, schedule);
    }
    counts
}

/// Builds the report for one bucket. Archived items count too.
pub fn run_report(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    request: &ReportRequest,
) -> ServiceResult<ReportPeriodResult> {
    let started_at = Instant::now();
    let schedule = Schedule::new(request.period, request.today);

    let task_collection: InboxTaskCollection = scope.trunk(workspace_ref_id)?;
    let tasks: Vec<InboxTask> = scope
        .uow
        .get_for::<InboxTask>()
        .find_all(task_collection.ref_id(), true, None)?
        .into_iter()
        .filter(|task| request.keeps_task(task))
        .collect();
    let plan_collection: BigPlanCollection = scope.trunk(workspace_ref_id)?;
    let big_plans: Vec<BigPlan> = scope
        .uow
        .get_for::<BigPlan>()
        .find_all(plan_collection.ref_id(), true, None)?
        .into_iter()
        .filter(|big_plan| request.keeps_big_plan(big_plan))
        .collect();

    let mut global_big_plans = StatusCounts::default();
    for big_plan in &big_plans {
        count_big_plan(&mut global_big_plans, big_plan, &schedule);
    }

    let sources: Vec<InboxTaskSource> = request
        .sources
        .clone()
        .unwrap_or_else(|| InboxTaskSource::ALL.to_vec());
    let per_source = sources
        .iter()
        .map(|source| SourceBreakdown {
            source: *source,
            inbox_tasks: counts_for(tasks.iter().filter(|task| task.source == *source), &schedule),
        })
        .collect();

    let per_project = project_breakdown(scope, workspace_ref_id, &tasks, &big_plans, &schedule)?;
    let per_period = period_breakdown(&tasks, &big_plans, &schedule);
    let per_habit = habit_breakdown(scope, workspace_ref_id, request, &tasks, &schedule)?;
    let per_chore = chore_breakdown(scope, workspace_ref_id, request, &tasks, &schedule)?;
    let per_big_plan = big_plans
        .iter()
        .filter(|big_plan| !big_plan.is_archived() || within(big_plan.header.archived_time, &schedule))
        .map(|big_plan| BigPlanBreakdown {
            ref_id: big_plan.ref_id(),
            name: big_plan.name.to_string(),
            status: big_plan.status,
            actionable_date: big_plan.actionable_date,
            due_date: big_plan.due_date,
            inbox_tasks: counts_for(
                tasks
                    .iter()
                    .filter(|task| task.big_plan_ref_id() == Some(big_plan.ref_id())),
                &schedule,
            ),
        })
        .collect();

    let result = ReportPeriodResult {
        today: request.today,
        period: request.period,
        timeline: schedule.timeline.clone(),
        start_date: schedule.first_day,
        end_date: schedule.end_day,
        sources,
        global_inbox_tasks: counts_for(&tasks, &schedule),
        global_big_plans,
        per_source,
        per_project,
        per_period,
        per_habit,
        per_chore,
        per_big_plan,
    };
    info!(
        "event=report_run module=report status=ok workspace_id={} period={} inbox_tasks={} big_plans={} duration_ms={}",
        workspace_ref_id,
        request.period,
        tasks.len(),
        big_plans.len(),
        started_at.elapsed().as_millis()
    );
    Ok(result)
}

fn project_breakdown(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    tasks: &[InboxTask],
    big_plans: &[BigPlan],
    schedule: &Schedule,
) -> ServiceResult<Vec<ProjectBreakdown>> {
    let collection: ProjectCollection = scope.trunk(workspace_ref_id)?;
    let projects = scope
        .uow
        .get_for::<Project>()
        .find_all(collection.ref_id(), true, None)?;
    let mut rows = BTreeMap::new();
    for project in projects {
        let inbox_tasks = counts_for(
            tasks.iter().filter(|task| task.project_ref_id == project.ref_id()),
            schedule,
        );
        let mut plan_counts = StatusCounts::default();
        for big_plan in big_plans.iter().filter(|plan| plan.project_ref_id == project.ref_id()) {
            count_big_plan(&mut plan_counts, big_plan, schedule);
        }
        if inbox_tasks == StatusCounts::default() && plan_counts == StatusCounts::default() {
            continue;
        }
        rows.insert(
            project.ref_id(),
            ProjectBreakdown {
                ref_id: project.ref_id(),
                name: project.name.to_string(),
                inbox_tasks,
                big_plans: plan_counts,
            },
        );
    }
    Ok(rows.into_values().collect())
}

fn period_breakdown(tasks: &[InboxTask], big_plans: &[BigPlan], schedule: &Schedule) -> Vec<PeriodBreakdown> {
    let Some((_, sub_schedules)) = schedule.sub_schedules().into_iter().last() else {
        return Vec::new();
    };
    sub_schedules
        .iter()
        .map(|sub| {
            let mut plan_counts = StatusCounts::default();
            for big_plan in big_plans {
                count_big_plan(&mut plan_counts, big_plan, sub);
            }
            PeriodBreakdown {
                period: sub.period,
                timeline: sub.timeline.clone(),
                start_date: sub.first_day,
                end_date: sub.end_day,
                inbox_tasks: counts_for(tasks, sub),
                big_plans: plan_counts,
            }
        })
        .collect()
}

fn generated_by<'t>(tasks: &'t [InboxTask], source: InboxTaskSource, ref_id: EntityId) -> impl Iterator<Item = &'t InboxTask> {
    tasks
        .iter()
        .filter(move |task| task.source == source && task.source_entity_ref_id == Some(ref_id))
}

fn habit_breakdown(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    request: &ReportRequest,
    tasks: &[InboxTask],
    schedule: &Schedule,
) -> ServiceResult<Vec<RecurringBreakdown>> {
    let collection: HabitCollection = scope.trunk(workspace_ref_id)?;
    let habits = scope
        .uow
        .get_for::<Habit>()
        .find_all(collection.ref_id(), false, None)?;
    let mut rows = Vec::new();
    for habit in habits {
        if let Some(ids) = &request.habit_ref_ids {
            if !ids.contains(&habit.ref_id()) {
                continue;
            }
        }
        let marks = load_streak_marks(scope, habit.ref_id(), schedule.first_day, schedule.end_day)?;
        let fulfilled: BTreeMap<ADate, bool> = marks
            .iter()
            .map(|mark| (mark.date, mark.is_fulfilled()))
            .collect();
        let streak = (0..=schedule.first_day.days_until(schedule.end_day))
            .map(|offset| {
                let day = schedule.first_day.add_days(offset);
                fulfilled.get(&day).copied().unwrap_or(false)
            })
            .collect();
        rows.push(RecurringBreakdown {
            ref_id: habit.ref_id(),
            name: habit.name.to_string(),
            period: habit.gen_params.period,
            inbox_tasks: counts_for(generated_by(tasks, InboxTaskSource::Habit, habit.ref_id()), schedule),
            streak,
        });
    }
    Ok(rows)
}

fn chore_breakdown(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    request: &ReportRequest,
    tasks: &[InboxTask],
    schedule: &Schedule,
) -> ServiceResult<Vec<RecurringBreakdown>> {
    let collection: ChoreCollection = scope.trunk(workspace_ref_id)?;
    let chores = scope
        .uow
        .get_for::<Chore>()
        .find_all(collection.ref_id(), false, None)?;
    Ok(chores
        .into_iter()
        .filter(|chore| {
            request
                .chore_ref_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&chore.ref_id()))
        })
        .map(|chore| RecurringBreakdown {
            ref_id: chore.ref_id(),
            name: chore.name.to_string(),
            period: chore.gen_params.period,
            inbox_tasks: counts_for(generated_by(tasks, InboxTaskSource::Chore, chore.ref_id()), schedule),
            streak: Vec::new(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{run_report, ReportRequest};
    use crate::config::ScoringConfig;
    use crate::model::framework::Entity;
    use crate::model::values::{InboxTaskSource, InboxTaskStatus, RecurringTaskPeriod};
    use crate::service::inbox_task_service::{create_inbox_task, status_update, update_inbox_task, NewInboxTask};
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    #[test]
    fn weekly_report_counts_stages_and_days() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-05T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let settings = ScoringConfig::default();

        let done = create_inbox_task(scope, ws, NewInboxTask::named("Taxes".parse().expect("name")))
            .expect("task");
        create_inbox_task(scope, ws, NewInboxTask::named("Dishes".parse().expect("name"))).expect("task");
        let later = ctx_at("2024-03-07T18:00:00Z");
        update_inbox_task(
            scope.with_ctx(&later),
            &settings,
            &seeded.user,
            ws,
            done.ref_id(),
            status_update(InboxTaskStatus::Done),
        )
        .expect("done");

        let report = run_report(
            scope,
            ws,
            &ReportRequest::new("2024-03-06".parse().expect("date"), RecurringTaskPeriod::Weekly),
        )
        .expect("report");
        assert_eq!(report.timeline, "2024,Q1,Mar,W10");
        assert_eq!(report.global_inbox_tasks.created, 2);
        assert_eq!(report.global_inbox_tasks.done, 1);
        assert_eq!(report.per_period.len(), 7);
        assert_eq!(report.per_period[1].inbox_tasks.created, 2);
        assert_eq!(report.per_period[3].inbox_tasks.done, 1);
        let user_row = report
            .per_source
            .iter()
            .find(|row| row.source == InboxTaskSource::User)
            .expect("user row");
        assert_eq!(user_row.inbox_tasks.created, 2);
        assert_eq!(report.per_project.len(), 1);

        let next_week = run_report(
            scope,
            ws,
            &ReportRequest::new("2024-03-12".parse().expect("date"), RecurringTaskPeriod::Weekly),
        )
        .expect("report");
        assert_eq!(next_week.global_inbox_tasks.created, 0);
    }
}
