//! Habit operations and streak bookkeeping.
//!
//! # Responsibility
//! - Create, update, suspend, archive and remove habits.
//! - Keep one streak mark per habit and day in step with the habit's tasks.
//!
//! # Invariants
//! - A streak mark is keyed by the task's due date, or by the action day when undated.
//! - Removing a habit archives its tasks, then drops its note, marks and the habit.

use crate::model::framework::{ADate, ArchivalReason, Entity, EntityId, EntityName, UpdateAction};
use crate::model::habit::{Habit, HabitCollection, HabitStreakMark};
use crate::model::inbox_task::InboxTask;
use crate::model::note::Note;
use crate::model::values::{InboxTaskSource, NoteDomain, RecurringTaskGenParams};
use crate::repo::{EntityRepository, RecordRepository, RefFilter};
use crate::service::inbox_task_service::archive_generated_tasks;
use crate::service::project_service::resolve_project;
use crate::service::traversal::{generic_destroyer, generic_loader_with2};
use crate::service::{ServiceError, ServiceResult, ServiceScope};
use log::info;

#[allow(clippy::too_many_arguments)]
pub fn create_habit(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    project_ref_id: Option<EntityId>,
    name: EntityName,
    is_key: bool,
    gen_params: RecurringTaskGenParams,
    repeats_in_period_count: Option<u32>,
) -> ServiceResult<Habit> {
    gen_params.validate()?;
    let collection: HabitCollection = scope.trunk(workspace_ref_id)?;
    let project_ref_id = resolve_project(scope, workspace_ref_id, project_ref_id)?;
    let habit = scope.uow.get_for::<Habit>().create(Habit::new_habit(
        scope.ctx,
        collection.ref_id(),
        project_ref_id,
        name,
        is_key,
        gen_params,
        repeats_in_period_count,
    )?)?;
    scope.reporter.mark_created(&habit);
    Ok(habit)
}

#[allow(clippy::too_many_arguments)]
pub fn update_habit(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    habit_ref_id: EntityId,
    project_ref_id: UpdateAction<EntityId>,
    name: UpdateAction<EntityName>,
    is_key: UpdateAction<bool>,
    gen_params: UpdateAction<RecurringTaskGenParams>,
    repeats_in_period_count: UpdateAction<Option<u32>>,
) -> ServiceResult<Habit> {
    if let Some(params) = gen_params.value() {
        params.validate()?;
    }
    if let Some(project) = project_ref_id.value() {
        resolve_project(scope, workspace_ref_id, Some(*project))?;
    }
    let repo = scope.uow.get_for::<Habit>();
    let habit = repo.load_by_id(habit_ref_id, false)?;
    let habit = repo.save(habit.update(
        scope.ctx,
        project_ref_id,
        name,
        is_key,
        gen_params,
        repeats_in_period_count,
    )?)?;
    scope.reporter.mark_updated(&habit);
    Ok(habit)
}

pub fn suspend_habit(scope: ServiceScope<'_, '_>, habit_ref_id: EntityId) -> ServiceResult<Habit> {
    let repo = scope.uow.get_for::<Habit>();
    let habit = repo.save(repo.load_by_id(habit_ref_id, false)?.suspend(scope.ctx)?)?;
    scope.reporter.mark_updated(&habit);
    Ok(habit)
}

pub fn unsuspend_habit(scope: ServiceScope<'_, '_>, habit_ref_id: EntityId) -> ServiceResult<Habit> {
    let repo = scope.uow.get_for::<Habit>();
    let habit = repo.save(repo.load_by_id(habit_ref_id, false)?.unsuspend(scope.ctx)?)?;
    scope.reporter.mark_updated(&habit);
    Ok(habit)
}

pub fn archive_habit(scope: ServiceScope<'_, '_>, habit_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<Habit>(habit_ref_id)
}

/// Archives the habit's tasks, then removes its note, streak marks and the habit itself.
pub fn remove_habit(scope: ServiceScope<'_, '_>, habit_ref_id: EntityId) -> ServiceResult<usize> {
    let repo = scope.uow.get_for::<Habit>();
    repo.load_by_id(habit_ref_id, true)?;
    let mut changed =
        archive_generated_tasks(scope, InboxTaskSource::Habit, habit_ref_id, ArchivalReason::User)?;
    let notes = scope.uow.get_for::<Note>().find_all_generic(
        None,
        true,
        &[
            RefFilter::eq("domain", NoteDomain::Habit),
            RefFilter::eq("source_entity_ref_id", habit_ref_id),
        ],
    )?;
    for note in notes {
        changed += generic_destroyer(scope.uow, scope.catalog, Note::KIND, note.ref_id(), scope.reporter)?;
    }
    let marks = scope
        .uow
        .records::<HabitStreakMark>()
        .remove_all_for_parent(habit_ref_id)?;
    let habit = repo.remove(habit_ref_id)?;
    scope.reporter.mark_removed(&habit);
    changed += 1;
    info!(
        "event=habit_remove module=service status=ok habit_id={} changed={} marks={}",
        habit_ref_id, changed, marks
    );
    Ok(changed)
}

/// A habit with its tasks and its note.
pub fn load_habit(
    scope: ServiceScope<'_, '_>,
    habit_ref_id: EntityId,
    allow_archived: bool,
) -> ServiceResult<(Habit, Vec<InboxTask>, Option<Note>)> {
    let (habit, tasks, notes) =
        generic_loader_with2::<Habit, InboxTask, Note>(scope.uow, habit_ref_id, allow_archived)?;
    Ok((habit, tasks, notes.into_iter().next()))
}

fn streak_day(scope: ServiceScope<'_, '_>, task: &InboxTask) -> ADate {
    task.due_date
        .unwrap_or_else(|| scope.ctx.action_timestamp.date())
}

fn streak_habit_of(task: &InboxTask) -> ServiceResult<EntityId> {
    match (task.source, task.source_entity_ref_id) {
        (InboxTaskSource::Habit, Some(habit_ref_id)) => Ok(habit_ref_id),
        _ => Err(ServiceError::invariant(format!(
            "inbox task {} was not generated by a habit",
            task.ref_id()
        ))),
    }
}

/// Records the task's current status in its habit's streak mark for the day.
pub fn record_streak_status(
    scope: ServiceScope<'_, '_>,
    task: &InboxTask,
) -> ServiceResult<HabitStreakMark> {
    let habit_ref_id = streak_habit_of(task)?;
    let date = streak_day(scope, task);
    let marks = scope.uow.records::<HabitStreakMark>();
    let mark = marks
        .load_optional(habit_ref_id, &date.to_string())?
        .unwrap_or_else(|| HabitStreakMark::new_mark(scope.ctx, habit_ref_id, date));
    Ok(marks.upsert(mark.update_status(scope.ctx, task.ref_id(), task.status))?)
}

/// Forgets a task in its streak mark; the mark goes away once empty.
pub fn drop_streak_task(scope: ServiceScope<'_, '_>, task: &InboxTask) -> ServiceResult<()> {
    let habit_ref_id = streak_habit_of(task)?;
    let key = streak_day(scope, task).to_string();
    let marks = scope.uow.records::<HabitStreakMark>();
    let Some(mark) = marks.load_optional(habit_ref_id, &key)? else {
        return Ok(());
    };
    let mark = mark.remove_task(scope.ctx, task.ref_id());
    if mark.statuses.is_empty() {
        marks.remove(habit_ref_id, &key)?;
    } else {
        marks.upsert(mark)?;
    }
    Ok(())
}

/// Streak marks of a habit between two days, both inclusive.
pub fn load_streak_marks(
    scope: ServiceScope<'_, '_>,
    habit_ref_id: EntityId,
    from: ADate,
    to: ADate,
) -> ServiceResult<Vec<HabitStreakMark>> {
    if from > to {
        return Err(ServiceError::invariant(format!(
            "streak range starts at {from} after it ends at {to}"
        )));
    }
    scope.uow.get_for::<Habit>().load_by_id(habit_ref_id, true)?;
    Ok(scope
        .uow
        .records::<HabitStreakMark>()
        .find_range(habit_ref_id, &from.to_string(), &to.to_string())?)
}

#[cfg(test)]
mod tests {
    use super::{create_habit, load_streak_marks, record_streak_status, remove_habit, suspend_habit};
    use crate::model::framework::{ADate, Entity};
    use crate::model::habit::Habit;
    use crate::model::inbox_task::{InboxTask, InboxTaskCollection, InboxTaskDraft};
    use crate::model::values::{
        InboxTaskSource, InboxTaskStatus, RecurringTaskGenParams, RecurringTaskPeriod,
    };
    use crate::repo::EntityRepository;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{ChangeKind, EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    fn habit_task(
        scope: ServiceScope<'_, '_>,
        workspace: crate::model::framework::EntityId,
        habit: &Habit,
        due: &str,
    ) -> InboxTask {
        let collection: InboxTaskCollection = scope.trunk(workspace).expect("trunk");
        let mut draft = InboxTaskDraft::user(habit.name.clone(), habit.project_ref_id);
        draft.source = InboxTaskSource::Habit;
        draft.source_entity_ref_id = Some(habit.ref_id());
        draft.status = InboxTaskStatus::Recurring;
        draft.due_date = Some(due.parse::<ADate>().expect("date"));
        scope
            .uow
            .get_for::<InboxTask>()
            .create(InboxTask::new_inbox_task(scope.ctx, collection.ref_id(), draft).expect("draft"))
            .expect("task")
    }

    #[test]
    fn streak_marks_follow_task_status() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let habit = create_habit(
            scope,
            ws,
            None,
            "Stretch".parse().expect("name"),
            true,
            RecurringTaskGenParams::simple(RecurringTaskPeriod::Daily),
            None,
        )
        .expect("habit");
        let mut task = habit_task(scope, ws, &habit, "2024-03-04");
        task.status = InboxTaskStatus::Done;
        let mark = record_streak_status(scope, &task).expect("mark");
        assert!(mark.is_fulfilled());

        let marks = load_streak_marks(
            scope,
            habit.ref_id(),
            "2024-03-01".parse().expect("date"),
            "2024-03-31".parse().expect("date"),
        )
        .expect("range");
        assert_eq!(marks.len(), 1);
        assert!(matches!(
            load_streak_marks(
                scope,
                habit.ref_id(),
                "2024-03-31".parse().expect("date"),
                "2024-03-01".parse().expect("date"),
            ),
            Err(ServiceError::InvariantViolation(_))
        ));
    }

    #[test]
    fn suspending_twice_is_rejected() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let habit = create_habit(
            scope,
            seeded.workspace.ref_id(),
            None,
            "Read".parse().expect("name"),
            false,
            RecurringTaskGenParams::simple(RecurringTaskPeriod::Weekly),
            Some(3),
        )
        .expect("habit");
        suspend_habit(scope, habit.ref_id()).expect("suspend");
        assert!(matches!(
            suspend_habit(scope, habit.ref_id()),
            Err(ServiceError::InputValidation(_))
        ));
    }

    #[test]
    fn removing_a_habit_archives_its_tasks() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let habit = create_habit(
            scope,
            ws,
            None,
            "Run".parse().expect("name"),
            false,
            RecurringTaskGenParams::simple(RecurringTaskPeriod::Daily),
            None,
        )
        .expect("habit");
        let task = habit_task(scope, ws, &habit, "2024-03-04");
        reporter.reset();

        remove_habit(scope, habit.ref_id()).expect("remove");
        let archived = uow
            .get_for::<InboxTask>()
            .load_by_id(task.ref_id(), true)
            .expect("task survives");
        assert!(archived.header.archived);
        assert!(uow
            .get_for::<Habit>()
            .load_optional(habit.ref_id(), true)
            .expect("load")
            .is_none());
        assert_eq!(reporter.count_of(ChangeKind::Removed, Habit::KIND), 1);
        assert_eq!(reporter.count_of(ChangeKind::Archived, InboxTask::KIND), 1);
    }
}
