//! Inbox task operations.
//!
//! # Responsibility
//! - Create user tasks, optionally inside a big plan.
//! - Apply status changes and feed them to scoring and habit streaks.
//! - Archive and remove tasks with their notes and time blocks.
//!
//! # Invariants
//! - A task linked to a big plan lives in the big plan's project.
//! - Score entries and streak marks change in the same unit of work as the task.
//!
//! # See also
//! - `score_service` for the score bookkeeping.
//! - `habit_service` for streak marks.

use crate::config::ScoringConfig;
use crate::model::big_plan::{BigPlan, BigPlanCollection};
use crate::model::framework::{
    ADate, ArchivalReason, Entity, EntityId, EntityName, UpdateAction,
};
use crate::model::inbox_task::{InboxTask, InboxTaskCollection, InboxTaskDraft, InboxTaskUpdate};
use crate::model::note::Note;
use crate::model::user::User;
use crate::model::values::{Difficulty, Eisen, InboxTaskSource, InboxTaskStatus};
use crate::repo::{EntityRepository, RefFilter};
use crate::service::habit_service::{drop_streak_task, record_streak_status};
use crate::service::project_service::resolve_project;
use crate::service::score_service::{record_inbox_task_transition, RecordedScore};
use crate::service::traversal::{generic_full_archiver, generic_loader_with};
use crate::service::{ServiceError, ServiceResult, ServiceScope};
use serde::{Deserialize, Serialize};

/// Inputs for a user-created task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInboxTask {
    pub name: EntityName,
    pub project_ref_id: Option<EntityId>,
    pub big_plan_ref_id: Option<EntityId>,
    pub is_key: bool,
    pub eisen: Eisen,
    pub difficulty: Option<Difficulty>,
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
}

impl NewInboxTask {
    pub fn named(name: EntityName) -> Self {
        Self {
            name,
            project_ref_id: None,
            big_plan_ref_id: None,
            is_key: false,
            eisen: Eisen::Regular,
            difficulty: None,
            actionable_date: None,
            due_date: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdatedInboxTask {
    pub inbox_task: InboxTask,
    pub score: RecordedScore,
}

fn load_big_plan_in_workspace(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    big_plan_ref_id: EntityId,
) -> ServiceResult<BigPlan> {
    let collection: BigPlanCollection = scope.trunk(workspace_ref_id)?;
    let big_plan = scope.uow.get_for::<BigPlan>().load_by_id(big_plan_ref_id, false)?;
    if big_plan.big_plan_collection_ref_id != collection.ref_id() {
        return Err(ServiceError::invariant(format!(
            "big plan {big_plan_ref_id} belongs to another workspace"
        )));
    }
    Ok(big_plan)
}

pub fn create_inbox_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    input: NewInboxTask,
) -> ServiceResult<InboxTask> {
    let collection: InboxTaskCollection = scope.trunk(workspace_ref_id)?;
    let (project_ref_id, source, source_entity_ref_id) = match input.big_plan_ref_id {
        Some(big_plan_ref_id) => {
            let big_plan = load_big_plan_in_workspace(scope, workspace_ref_id, big_plan_ref_id)?;
            (big_plan.project_ref_id, InboxTaskSource::BigPlan, Some(big_plan_ref_id))
        }
        None => (
            resolve_project(scope, workspace_ref_id, input.project_ref_id)?,
            InboxTaskSource::User,
            None,
        ),
    };
    let mut draft = InboxTaskDraft::user(input.name, project_ref_id);
    draft.source = source;
    draft.source_entity_ref_id = source_entity_ref_id;
    draft.is_key = input.is_key;
    draft.eisen = input.eisen;
    draft.difficulty = input.difficulty;
    draft.actionable_date = input.actionable_date;
    draft.due_date = input.due_date;
    let task = scope
        .uow
        .get_for::<InboxTask>()
        .create(InboxTask::new_inbox_task(scope.ctx, collection.ref_id(), draft)?)?;
    scope.reporter.mark_created(&task);
    Ok(task)
}

/// Applies a user edit and books its score and streak effects.
pub fn update_inbox_task(
    scope: ServiceScope<'_, '_>,
    settings: &ScoringConfig,
    user: &User,
    workspace_ref_id: EntityId,
    inbox_task_ref_id: EntityId,
    update: InboxTaskUpdate,
) -> ServiceResult<UpdatedInboxTask> {
    if let Some(project_ref_id) = update.project_ref_id.value() {
        resolve_project(scope, workspace_ref_id, Some(*project_ref_id))?;
    }
    let repo = scope.uow.get_for::<InboxTask>();
    let task = repo.load_by_id(inbox_task_ref_id, false)?;
    let previous = task.status;
    let task = repo.save(task.update(scope.ctx, update)?)?;
    scope.reporter.mark_updated(&task);
    let score = record_inbox_task_transition(scope, settings, user, previous, &task)?;
    if task.source == InboxTaskSource::Habit && previous != task.status {
        record_streak_status(scope, &task)?;
    }
    Ok(UpdatedInboxTask {
        inbox_task: task,
        score,
    })
}

/// Moves a user task into a big plan's project, or back out with `None`.
pub fn change_big_plan_link(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    inbox_task_ref_id: EntityId,
    big_plan_ref_id: Option<EntityId>,
) -> ServiceResult<InboxTask> {
    let repo = scope.uow.get_for::<InboxTask>();
    let task = repo.load_by_id(inbox_task_ref_id, false)?;
    let project_ref_id = match big_plan_ref_id {
        Some(big_plan_ref_id) => {
            load_big_plan_in_workspace(scope, workspace_ref_id, big_plan_ref_id)?.project_ref_id
        }
        None => task.project_ref_id,
    };
    let task = repo.save(task.update_link_to_big_plan(scope.ctx, project_ref_id, big_plan_ref_id)?)?;
    scope.reporter.mark_updated(&task);
    Ok(task)
}

pub fn archive_inbox_task(scope: ServiceScope<'_, '_>, inbox_task_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<InboxTask>(inbox_task_ref_id)
}

pub fn remove_inbox_task(scope: ServiceScope<'_, '_>, inbox_task_ref_id: EntityId) -> ServiceResult<usize> {
    let task = scope.uow.get_for::<InboxTask>().load_by_id(inbox_task_ref_id, true)?;
    if task.source == InboxTaskSource::Habit {
        drop_streak_task(scope, &task)?;
    }
    scope.remove::<InboxTask>(inbox_task_ref_id)
}

/// A task together with its note, if it has one.
pub fn load_inbox_task(
    scope: ServiceScope<'_, '_>,
    inbox_task_ref_id: EntityId,
    allow_archived: bool,
) -> ServiceResult<(InboxTask, Option<Note>)> {
    let (task, notes) =
        generic_loader_with::<InboxTask, Note>(scope.uow, inbox_task_ref_id, allow_archived)?;
    Ok((task, notes.into_iter().next()))
}

/// Filters for [`find_inbox_tasks`]; empty lists mean "any".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboxTaskFilter {
    pub allow_archived: bool,
    pub sources: Vec<InboxTaskSource>,
    pub project_ref_ids: Vec<EntityId>,
    pub statuses: Vec<InboxTaskStatus>,
    pub source_entity_ref_ids: Vec<EntityId>,
}

impl InboxTaskFilter {
    fn ref_filters(&self) -> Vec<RefFilter> {
        let mut filters = Vec::new();
        if !self.sources.is_empty() {
            filters.push(RefFilter::any_of("source", &self.sources));
        }
        if !self.project_ref_ids.is_empty() {
            filters.push(RefFilter::any_of("project_ref_id", &self.project_ref_ids));
        }
        if !self.statuses.is_empty() {
            filters.push(RefFilter::any_of("status", &self.statuses));
        }
        if !self.source_entity_ref_ids.is_empty() {
            filters.push(RefFilter::any_of(
                "source_entity_ref_id",
                &self.source_entity_ref_ids,
            ));
        }
        filters
    }
}

pub fn find_inbox_tasks(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    filter: &InboxTaskFilter,
) -> ServiceResult<Vec<InboxTask>> {
    let collection: InboxTaskCollection = scope.trunk(workspace_ref_id)?;
    Ok(scope.uow.get_for::<InboxTask>().find_all_generic(
        Some(collection.ref_id()),
        filter.allow_archived,
        &filter.ref_filters(),
    )?)
}

/// Live tasks generated from `source_entity_ref_id` through `source`.
pub fn find_generated_tasks(
    scope: ServiceScope<'_, '_>,
    source: InboxTaskSource,
    source_entity_ref_id: EntityId,
    allow_archived: bool,
) -> ServiceResult<Vec<InboxTask>> {
    Ok(scope.uow.get_for::<InboxTask>().find_all_generic(
        None,
        allow_archived,
        &[
            RefFilter::eq("source", source),
            RefFilter::eq("source_entity_ref_id", source_entity_ref_id),
        ],
    )?)
}

/// Archives every live task a source generated; returns how many entities changed.
pub fn archive_generated_tasks(
    scope: ServiceScope<'_, '_>,
    source: InboxTaskSource,
    source_entity_ref_id: EntityId,
    reason: ArchivalReason,
) -> ServiceResult<usize> {
    let mut changed = 0;
    for task in find_generated_tasks(scope, source, source_entity_ref_id, false)? {
        changed += generic_full_archiver(
            scope.uow,
            scope.catalog,
            scope.ctx,
            InboxTask::KIND,
            task.ref_id(),
            reason,
            scope.reporter,
        )?;
    }
    Ok(changed)
}

/// Status-only update helper for generated tasks.
pub fn status_update(status: InboxTaskStatus) -> InboxTaskUpdate {
    InboxTaskUpdate {
        status: UpdateAction::change_to(status),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        archive_inbox_task, change_big_plan_link, create_inbox_task, find_inbox_tasks,
        status_update, update_inbox_task, InboxTaskFilter, NewInboxTask,
    };
    use crate::config::ScoringConfig;
    use crate::model::big_plan::{BigPlan, BigPlanCollection};
    use crate::model::framework::{ArchivalReason, Entity};
    use crate::model::inbox_task::InboxTask;
    use crate::model::values::{Difficulty, Eisen, InboxTaskSource, InboxTaskStatus};
    use crate::repo::EntityRepository;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    fn no_luck() -> ScoringConfig {
        ScoringConfig {
            lucky_puppy_probability: 0.0,
            ..ScoringConfig::default()
        }
    }

    #[test]
    fn new_tasks_land_in_the_root_project() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);

        let task = create_inbox_task(
            scope,
            seeded.workspace.ref_id(),
            NewInboxTask::named("Buy milk".parse().expect("name")),
        )
        .expect("task");
        assert_eq!(task.project_ref_id, seeded.root_project_ref_id);
        assert_eq!(task.source, InboxTaskSource::User);
        assert_eq!(task.status, InboxTaskStatus::Accepted);
        assert_eq!(task.header.version, 1);
    }

    #[test]
    fn completing_a_hard_key_task_scores_ten() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let mut input = NewInboxTask::named("Ship".parse().expect("name"));
        input.is_key = true;
        input.difficulty = Some(Difficulty::Hard);
        let task = create_inbox_task(scope, seeded.workspace.ref_id(), input).expect("task");

        let updated = update_inbox_task(
            scope,
            &no_luck(),
            &seeded.user,
            seeded.workspace.ref_id(),
            task.ref_id(),
            status_update(InboxTaskStatus::Done),
        )
        .expect("done");
        assert_eq!(updated.score.total(), 10);
        assert!(!updated.score.has_lucky_puppy_bonus);
        assert!(updated.inbox_task.completed_time.is_some());
    }

    #[test]
    fn linking_to_a_big_plan_moves_the_project() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let collection: BigPlanCollection = scope.trunk(ws).expect("trunk");
        let plan = uow
            .get_for::<BigPlan>()
            .create(
                BigPlan::new_big_plan(
                    &ctx,
                    collection.ref_id(),
                    seeded.root_project_ref_id,
                    "Launch".parse().expect("name"),
                    false,
                    Eisen::Regular,
                    None,
                    None,
                    None,
                )
                .expect("plan"),
            )
            .expect("persist");
        let task = create_inbox_task(scope, ws, NewInboxTask::named("Draft".parse().expect("name")))
            .expect("task");

        let linked = change_big_plan_link(scope, ws, task.ref_id(), Some(plan.ref_id())).expect("link");
        assert_eq!(linked.big_plan_ref_id(), Some(plan.ref_id()));
        let unlinked = change_big_plan_link(scope, ws, task.ref_id(), None).expect("unlink");
        assert_eq!(unlinked.source, InboxTaskSource::User);
        assert_eq!(unlinked.big_plan_ref_id(), None);
    }

    #[test]
    fn archived_tasks_are_hidden_by_default() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let task = create_inbox_task(scope, ws, NewInboxTask::named("Old".parse().expect("name")))
            .expect("task");
        create_inbox_task(scope, ws, NewInboxTask::named("New".parse().expect("name"))).expect("task");

        assert_eq!(archive_inbox_task(scope, task.ref_id()).expect("archive"), 1);
        let live = find_inbox_tasks(scope, ws, &InboxTaskFilter::default()).expect("find");
        assert_eq!(live.len(), 1);
        let all = find_inbox_tasks(
            scope,
            ws,
            &InboxTaskFilter {
                allow_archived: true,
                ..Default::default()
            },
        )
        .expect("find");
        assert_eq!(all.len(), 2);
        let archived = uow
            .get_for::<InboxTask>()
            .load_by_id(task.ref_id(), true)
            .expect("load");
        assert_eq!(archived.header.archival_reason, Some(ArchivalReason::User));
    }
}
