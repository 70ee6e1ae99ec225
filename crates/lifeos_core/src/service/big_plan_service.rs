//! Big plans and their milestones.
//!
//! # Responsibility
//! - Create and update big plans, booking status changes with scoring.
//! - Keep milestones inside the plan's actionable/due bounds.
//! - Archive and remove plans together with their tasks and milestones.
//!
//! # Invariants
//! - Tasks of a plan follow the plan when it moves to another project.
//! - Narrowing a plan's dates never strands a milestone outside them.

use crate::config::ScoringConfig;
use crate::model::big_plan::{BigPlan, BigPlanCollection, BigPlanMilestone, BigPlanUpdate};
use crate::model::framework::{ADate, Entity, EntityId, EntityName, UpdateAction};
use crate::model::inbox_task::InboxTask;
use crate::model::note::Note;
use crate::model::user::User;
use crate::model::values::{Difficulty, Eisen, InboxTaskSource, NoteDomain};
use crate::repo::{EntityRepository, RefFilter};
use crate::service::note_service::load_for_source;
use crate::service::project_service::resolve_project;
use crate::service::score_service::{record_big_plan_transition, RecordedScore};
use crate::service::traversal::generic_loader_with2;
use crate::service::{ServiceError, ServiceResult, ServiceScope};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBigPlan {
    pub name: EntityName,
    pub project_ref_id: Option<EntityId>,
    pub is_key: bool,
    pub eisen: Eisen,
    pub difficulty: Option<Difficulty>,
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
}

impl NewBigPlan {
    pub fn named(name: EntityName) -> Self {
        Self {
            name,
            project_ref_id: None,
            is_key: false,
            eisen: Eisen::Regular,
            difficulty: None,
            actionable_date: None,
            due_date: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdatedBigPlan {
    pub big_plan: BigPlan,
    pub score: RecordedScore,
}

/// A big plan with everything hanging off it.
#[derive(Debug, Clone)]
pub struct BigPlanView {
    pub big_plan: BigPlan,
    pub inbox_tasks: Vec<InboxTask>,
    pub milestones: Vec<BigPlanMilestone>,
    pub note: Option<Note>,
}

pub fn create_big_plan(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    input: NewBigPlan,
) -> ServiceResult<BigPlan> {
    let collection: BigPlanCollection = scope.trunk(workspace_ref_id)?;
    let project_ref_id = resolve_project(scope, workspace_ref_id, input.project_ref_id)?;
    let big_plan = scope.uow.get_for::<BigPlan>().create(BigPlan::new_big_plan(
        scope.ctx,
        collection.ref_id(),
        project_ref_id,
        input.name,
        input.is_key,
        input.eisen,
        input.difficulty,
        input.actionable_date,
        input.due_date,
    )?)?;
    scope.reporter.mark_created(&big_plan);
    Ok(big_plan)
}

fn load_milestones(
    scope: ServiceScope<'_, '_>,
    big_plan_ref_id: EntityId,
) -> ServiceResult<Vec<BigPlanMilestone>> {
    Ok(scope
        .uow
        .get_for::<BigPlanMilestone>()
        .find_all(big_plan_ref_id, false, None)?)
}

fn load_plan_tasks(scope: ServiceScope<'_, '_>, big_plan: &BigPlan) -> ServiceResult<Vec<InboxTask>> {
    Ok(scope.uow.get_for::<InboxTask>().find_all_generic(
        None,
        false,
        &[
            RefFilter::eq("source", InboxTaskSource::BigPlan),
            RefFilter::eq("source_entity_ref_id", big_plan.ref_id()),
        ],
    )?)
}

pub fn update_big_plan(
    scope: ServiceScope<'_, '_>,
    settings: &ScoringConfig,
    user: &User,
    workspace_ref_id: EntityId,
    big_plan_ref_id: EntityId,
    update: BigPlanUpdate,
) -> ServiceResult<UpdatedBigPlan> {
    if let Some(project_ref_id) = update.project_ref_id.value() {
        resolve_project(scope, workspace_ref_id, Some(*project_ref_id))?;
    }
    let repo = scope.uow.get_for::<BigPlan>();
    let current = repo.load_by_id(big_plan_ref_id, false)?;
    let previous_status = current.status;
    let previous_project = current.project_ref_id;
    let big_plan = current.update(scope.ctx, update)?;
    for milestone in load_milestones(scope, big_plan_ref_id)? {
        if big_plan.check_milestone_date(milestone.date).is_err() {
            return Err(ServiceError::invariant(format!(
                "milestone {} on {} falls outside the new big plan dates",
                milestone.ref_id(),
                milestone.date
            )));
        }
    }
    let big_plan = repo.save(big_plan)?;
    scope.reporter.mark_updated(&big_plan);

    if big_plan.project_ref_id != previous_project {
        let tasks = scope.uow.get_for::<InboxTask>();
        for task in load_plan_tasks(scope, &big_plan)? {
            let task = tasks.save(task.update_link_to_big_plan(
                scope.ctx,
                big_plan.project_ref_id,
                Some(big_plan.ref_id()),
            )?)?;
            scope.reporter.mark_updated(&task);
        }
    }

    let score = record_big_plan_transition(scope, settings, user, previous_status, &big_plan)?;
    Ok(UpdatedBigPlan { big_plan, score })
}

/// Archives the plan, its milestones and every task it owns.
pub fn archive_big_plan(scope: ServiceScope<'_, '_>, big_plan_ref_id: EntityId) -> ServiceResult<usize> {
    let changed = scope.archive::<BigPlan>(big_plan_ref_id)?;
    info!(
        "event=big_plan_archive module=service status=ok big_plan_id={} changed={}",
        big_plan_ref_id, changed
    );
    Ok(changed)
}

pub fn remove_big_plan(scope: ServiceScope<'_, '_>, big_plan_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<BigPlan>(big_plan_ref_id)
}

pub fn load_big_plan(
    scope: ServiceScope<'_, '_>,
    big_plan_ref_id: EntityId,
    allow_archived: bool,
) -> ServiceResult<BigPlanView> {
    let (big_plan, inbox_tasks, milestones) = generic_loader_with2::<
        BigPlan,
        InboxTask,
        BigPlanMilestone,
    >(scope.uow, big_plan_ref_id, allow_archived)?;
    let note = load_for_source(scope, NoteDomain::BigPlan, big_plan_ref_id)?;
    Ok(BigPlanView {
        big_plan,
        inbox_tasks,
        milestones,
        note,
    })
}

pub fn find_big_plans(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    allow_archived: bool,
    project_ref_ids: &[EntityId],
) -> ServiceResult<Vec<BigPlan>> {
    let collection: BigPlanCollection = scope.trunk(workspace_ref_id)?;
    let filters = if project_ref_ids.is_empty() {
        Vec::new()
    } else {
        vec![RefFilter::any_of("project_ref_id", project_ref_ids)]
    };
    Ok(scope
        .uow
        .get_for::<BigPlan>()
        .find_all_generic(Some(collection.ref_id()), allow_archived, &filters)?)
}

pub fn create_milestone(
    scope: ServiceScope<'_, '_>,
    big_plan_ref_id: EntityId,
    date: ADate,
    name: EntityName,
) -> ServiceResult<BigPlanMilestone> {
    let big_plan = scope.uow.get_for::<BigPlan>().load_by_id(big_plan_ref_id, false)?;
    let milestone = scope
        .uow
        .get_for::<BigPlanMilestone>()
        .create(BigPlanMilestone::new_milestone(scope.ctx, &big_plan, date, name)?)?;
    scope.reporter.mark_created(&milestone);
    Ok(milestone)
}

pub fn update_milestone(
    scope: ServiceScope<'_, '_>,
    milestone_ref_id: EntityId,
    date: UpdateAction<ADate>,
    name: UpdateAction<EntityName>,
) -> ServiceResult<BigPlanMilestone> {
    let repo = scope.uow.get_for::<BigPlanMilestone>();
    let milestone = repo.load_by_id(milestone_ref_id, false)?;
    let big_plan = scope
        .uow
        .get_for::<BigPlan>()
        .load_by_id(milestone.big_plan_ref_id, false)?;
    let milestone = repo.save(milestone.update(scope.ctx, &big_plan, date, name)?)?;
    scope.reporter.mark_updated(&milestone);
    Ok(milestone)
}

pub fn remove_milestone(scope: ServiceScope<'_, '_>, milestone_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<BigPlanMilestone>(milestone_ref_id)
}

#[cfg(test)]
mod tests {
    use super::{
        archive_big_plan, create_big_plan, create_milestone, update_big_plan, NewBigPlan,
    };
    use crate::config::ScoringConfig;
    use crate::model::big_plan::{BigPlanMilestone, BigPlanUpdate};
    use crate::model::framework::{ADate, ArchivalReason, Entity, UpdateAction};
    use crate::model::inbox_task::InboxTask;
    use crate::model::values::{BigPlanStatus, InboxTaskStatus};
    use crate::repo::EntityRepository;
    use crate::service::inbox_task_service::{
        create_inbox_task, status_update, update_inbox_task, NewInboxTask,
    };
    use crate::service::project_service::create_project;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{ChangeKind, EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    fn date(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    fn launch() -> NewBigPlan {
        let mut input = NewBigPlan::named("Launch".parse().expect("name"));
        input.actionable_date = Some(date("2024-06-01"));
        input.due_date = Some(date("2024-06-30"));
        input
    }

    #[test]
    fn milestones_stay_inside_the_plan() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-05-10T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let plan = create_big_plan(scope, seeded.workspace.ref_id(), launch()).expect("plan");
        assert_eq!(plan.status, BigPlanStatus::Accepted);

        let err = create_milestone(scope, plan.ref_id(), date("2024-05-15"), "Kickoff".parse().expect("name"))
            .expect_err("too early");
        match err {
            ServiceError::InputValidation(inner) => {
                assert_eq!(inner.to_string(), "milestone date before actionable date")
            }
            other => panic!("unexpected error {other:?}"),
        }
        create_milestone(scope, plan.ref_id(), date("2024-06-10"), "Beta".parse().expect("name"))
            .expect("milestone");

        let narrow = BigPlanUpdate {
            due_date: UpdateAction::change_to(Some(date("2024-06-05"))),
            ..Default::default()
        };
        assert!(matches!(
            update_big_plan(
                scope,
                &ScoringConfig::default(),
                &seeded.user,
                seeded.workspace.ref_id(),
                plan.ref_id(),
                narrow
            ),
            Err(ServiceError::InvariantViolation(_))
        ));
    }

    #[test]
    fn archiving_cascades_to_tasks_and_milestones() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-05-10T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let plan = create_big_plan(scope, ws, launch()).expect("plan");
        create_milestone(scope, plan.ref_id(), date("2024-06-10"), "Beta".parse().expect("name"))
            .expect("milestone");
        let mut tasks = Vec::new();
        for name in ["One", "Two", "Three"] {
            let mut input = NewInboxTask::named(name.parse().expect("name"));
            input.big_plan_ref_id = Some(plan.ref_id());
            tasks.push(create_inbox_task(scope, ws, input).expect("task"));
        }
        update_inbox_task(
            scope,
            &ScoringConfig::default(),
            &seeded.user,
            ws,
            tasks[2].ref_id(),
            status_update(InboxTaskStatus::Done),
        )
        .expect("done");
        reporter.reset();

        assert_eq!(archive_big_plan(scope, plan.ref_id()).expect("archive"), 5);
        for task in &tasks {
            let stored = uow
                .get_for::<InboxTask>()
                .load_by_id(task.ref_id(), true)
                .expect("load");
            assert!(stored.header.archived);
            assert_eq!(stored.header.archival_reason, Some(ArchivalReason::User));
        }
        assert_eq!(reporter.count_of(ChangeKind::Archived, InboxTask::KIND), 3);
        assert_eq!(reporter.count_of(ChangeKind::Archived, BigPlanMilestone::KIND), 1);
        assert_eq!(reporter.take_search_changes().len(), 4);
    }

    #[test]
    fn archiving_restamps_tasks_archived_for_another_reason() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-05-10T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let plan = create_big_plan(scope, ws, launch()).expect("plan");
        let mut input = NewInboxTask::named("Old chore".parse().expect("name"));
        input.big_plan_ref_id = Some(plan.ref_id());
        let task = create_inbox_task(scope, ws, input).expect("task");
        scope
            .archive_with_reason::<InboxTask>(task.ref_id(), ArchivalReason::Gc)
            .expect("gc archive");

        assert_eq!(archive_big_plan(scope, plan.ref_id()).expect("archive"), 2);
        let stored = uow
            .get_for::<InboxTask>()
            .load_by_id(task.ref_id(), true)
            .expect("load");
        assert_eq!(stored.header.archival_reason, Some(ArchivalReason::User));
        assert_eq!(stored.header.archived_time, Some(ctx.action_timestamp));
        assert_eq!(archive_big_plan(scope, plan.ref_id()).expect("again"), 0);
    }

    #[test]
    fn moving_a_plan_moves_its_tasks() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-05-10T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let plan = create_big_plan(scope, ws, launch()).expect("plan");
        let mut input = NewInboxTask::named("Write".parse().expect("name"));
        input.big_plan_ref_id = Some(plan.ref_id());
        let task = create_inbox_task(scope, ws, input).expect("task");
        let other = create_project(scope, ws, None, "Side".parse().expect("name")).expect("project");

        let moved = update_big_plan(
            scope,
            &ScoringConfig::default(),
            &seeded.user,
            ws,
            plan.ref_id(),
            BigPlanUpdate {
                project_ref_id: UpdateAction::change_to(other.ref_id()),
                ..Default::default()
            },
        )
        .expect("move");
        assert_eq!(moved.big_plan.project_ref_id, other.ref_id());
        let stored = uow
            .get_for::<InboxTask>()
            .load_by_id(task.ref_id(), false)
            .expect("load");
        assert_eq!(stored.project_ref_id, other.ref_id());
    }
}
