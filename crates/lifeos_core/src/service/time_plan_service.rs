//! Time plans: a bucket of committed activities over tasks and big plans.
//!
//! # Invariants
//! - One time plan per `(domain, period, timeline)`.
//! - A plan holds at most one activity per target.
//! - Targets are live and belong to the plan's workspace.

use crate::model::big_plan::{BigPlan, BigPlanCollection};
use crate::model::framework::{ADate, Entity, EntityId, UpdateAction};
use crate::model::inbox_task::{InboxTask, InboxTaskCollection};
use crate::model::time_plan::{TimePlan, TimePlanActivity, TimePlanDomain};
use crate::model::values::{
    InboxTaskSource, RecurringTaskPeriod, TimePlanActivityFeasibility, TimePlanActivityKind,
    TimePlanActivityTarget,
};
use crate::repo::EntityRepository;
use crate::scheduler::Schedule;
use crate::service::inbox_task_service::find_generated_tasks;
use crate::service::{ServiceError, ServiceResult, ServiceScope};

#[derive(Debug, Clone)]
pub struct TimePlanView {
    pub time_plan: TimePlan,
    pub activities: Vec<TimePlanActivity>,
}

pub fn create_time_plan(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    right_now: ADate,
    period: RecurringTaskPeriod,
) -> ServiceResult<TimePlan> {
    let domain: TimePlanDomain = scope.trunk(workspace_ref_id)?;
    let schedule = Schedule::new(period, right_now);
    let time_plan = scope.uow.get_for::<TimePlan>().create(TimePlan::new_time_plan(
        scope.ctx,
        domain.ref_id(),
        right_now,
        period,
        schedule.timeline,
        schedule.first_day,
        schedule.end_day,
    ))?;
    scope.reporter.mark_created(&time_plan);
    Ok(time_plan)
}

pub fn archive_time_plan(scope: ServiceScope<'_, '_>, time_plan_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<TimePlan>(time_plan_ref_id)
}

pub fn remove_time_plan(scope: ServiceScope<'_, '_>, time_plan_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<TimePlan>(time_plan_ref_id)
}

pub fn load_time_plan(
    scope: ServiceScope<'_, '_>,
    time_plan_ref_id: EntityId,
    allow_archived: bool,
) -> ServiceResult<TimePlanView> {
    let time_plan = scope.uow.get_for::<TimePlan>().load_by_id(time_plan_ref_id, allow_archived)?;
    let activities = scope
        .uow
        .get_for::<TimePlanActivity>()
        .find_all(time_plan_ref_id, allow_archived, None)?;
    Ok(TimePlanView {
        time_plan,
        activities,
    })
}

/// Adds an activity unless the plan already tracks the target.
fn ensure_activity(
    scope: ServiceScope<'_, '_>,
    time_plan: &TimePlan,
    target: TimePlanActivityTarget,
    target_ref_id: EntityId,
    kind: TimePlanActivityKind,
    feasibility: TimePlanActivityFeasibility,
) -> ServiceResult<Option<TimePlanActivity>> {
    let activity = TimePlanActivity::new_activity(
        scope.ctx,
        time_plan.ref_id(),
        target,
        target_ref_id,
        kind,
        feasibility,
    );
    let repo = scope.uow.get_for::<TimePlanActivity>();
    if let Some(key) = activity.unique_key() {
        if repo.load_by_unique_key(&key)?.is_some() {
            return Ok(None);
        }
    }
    let activity = repo.create(activity)?;
    scope.reporter.mark_created(&activity);
    Ok(Some(activity))
}

fn live_plan(scope: ServiceScope<'_, '_>, time_plan_ref_id: EntityId) -> ServiceResult<TimePlan> {
    Ok(scope.uow.get_for::<TimePlan>().load_by_id(time_plan_ref_id, false)?)
}

/// Adds one activity per inbox task; tasks already in the plan are skipped.
pub fn create_activities_from_inbox_tasks(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    time_plan_ref_id: EntityId,
    inbox_task_ref_ids: &[EntityId],
    kind: TimePlanActivityKind,
    feasibility: TimePlanActivityFeasibility,
) -> ServiceResult<Vec<TimePlanActivity>> {
    let time_plan = live_plan(scope, time_plan_ref_id)?;
    let collection: InboxTaskCollection = scope.trunk(workspace_ref_id)?;
    let repo = scope.uow.get_for::<InboxTask>();
    let mut created = Vec::new();
    for inbox_task_ref_id in inbox_task_ref_ids {
        let task = repo.load_by_id(*inbox_task_ref_id, false)?;
        if task.inbox_task_collection_ref_id != collection.ref_id() {
            return Err(ServiceError::invariant(format!(
                "inbox task {inbox_task_ref_id} belongs to another workspace"
            )));
        }
        if let Some(activity) = ensure_activity(
            scope,
            &time_plan,
            TimePlanActivityTarget::InboxTask,
            task.ref_id(),
            kind,
            feasibility,
        )? {
            created.push(activity);
        }
    }
    Ok(created)
}

/// Adds big plans to the plan together with their unfinished tasks.
pub fn create_activities_from_big_plans(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    time_plan_ref_id: EntityId,
    big_plan_ref_ids: &[EntityId],
    kind: TimePlanActivityKind,
    feasibility: TimePlanActivityFeasibility,
) -> ServiceResult<Vec<TimePlanActivity>> {
    let time_plan = live_plan(scope, time_plan_ref_id)?;
    let collection: BigPlanCollection = scope.trunk(workspace_ref_id)?;
    let repo = scope.uow.get_for::<BigPlan>();
    let mut created = Vec::new();
    for big_plan_ref_id in big_plan_ref_ids {
        let big_plan = repo.load_by_id(*big_plan_ref_id, false)?;
        if big_plan.big_plan_collection_ref_id != collection.ref_id() {
            return Err(ServiceError::invariant(format!(
                "big plan {big_plan_ref_id} belongs to another workspace"
            )));
        }
        created.extend(ensure_activity(
            scope,
            &time_plan,
            TimePlanActivityTarget::BigPlan,
            big_plan.ref_id(),
            kind,
            feasibility,
        )?);
        for task in find_generated_tasks(scope, InboxTaskSource::BigPlan, big_plan.ref_id(), false)? {
            if task.status.is_completed() {
                continue;
            }
            created.extend(ensure_activity(
                scope,
                &time_plan,
                TimePlanActivityTarget::InboxTask,
                task.ref_id(),
                TimePlanActivityKind::Finish,
                feasibility,
            )?);
        }
    }
    Ok(created)
}

pub fn update_activity(
    scope: ServiceScope<'_, '_>,
    activity_ref_id: EntityId,
    kind: UpdateAction<TimePlanActivityKind>,
    feasibility: UpdateAction<TimePlanActivityFeasibility>,
) -> ServiceResult<TimePlanActivity> {
    let repo = scope.uow.get_for::<TimePlanActivity>();
    let activity = repo.save(repo.load_by_id(activity_ref_id, false)?.update(scope.ctx, kind, feasibility))?;
    scope.reporter.mark_updated(&activity);
    Ok(activity)
}

pub fn remove_activity(scope: ServiceScope<'_, '_>, activity_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<TimePlanActivity>(activity_ref_id)
}

#[cfg(test)]
mod tests {
    use super::{
        create_activities_from_big_plans, create_activities_from_inbox_tasks, create_time_plan, load_time_plan,
        remove_activity, remove_time_plan,
    };
    use crate::model::framework::Entity;
    use crate::model::values::{RecurringTaskPeriod, TimePlanActivityFeasibility, TimePlanActivityKind};
    use crate::repo::RepoError;
    use crate::service::big_plan_service::{create_big_plan, NewBigPlan};
    use crate::service::inbox_task_service::{create_inbox_task, NewInboxTask};
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    #[test]
    fn plan_collects_tasks_and_big_plans_once() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();

        let plan = create_time_plan(scope, ws, "2024-03-06".parse().expect("date"), RecurringTaskPeriod::Weekly)
            .expect("plan");
        assert_eq!(plan.start_date, "2024-03-04".parse().expect("date"));
        assert!(matches!(
            create_time_plan(scope, ws, "2024-03-08".parse().expect("date"), RecurringTaskPeriod::Weekly),
            Err(ServiceError::Repo(RepoError::EntityAlreadyExists { .. }))
        ));

        let task = create_inbox_task(scope, ws, NewInboxTask::named("Call bank".parse().expect("name")))
            .expect("task");
        let added = create_activities_from_inbox_tasks(
            scope,
            ws,
            plan.ref_id(),
            &[task.ref_id(), task.ref_id()],
            TimePlanActivityKind::Finish,
            TimePlanActivityFeasibility::MustDo,
        )
        .expect("activities");
        assert_eq!(added.len(), 1);

        let big_plan = create_big_plan(scope, ws, NewBigPlan::named("Move house".parse().expect("name")))
            .expect("big plan");
        let added = create_activities_from_big_plans(
            scope,
            ws,
            plan.ref_id(),
            &[big_plan.ref_id()],
            TimePlanActivityKind::MakeProgress,
            TimePlanActivityFeasibility::NiceToHave,
        )
        .expect("activities");
        assert_eq!(added.len(), 1);

        let view = load_time_plan(scope, plan.ref_id(), false).expect("load");
        assert_eq!(view.activities.len(), 2);
        remove_activity(scope, added[0].ref_id()).expect("remove");
        assert_eq!(remove_time_plan(scope, plan.ref_id()).expect("remove plan"), 2);
    }
}
