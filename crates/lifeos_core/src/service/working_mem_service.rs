//! Working memory: one scratch note per generation bucket.
//!
//! # Invariants
//! - At most one working memory per `(collection, period, timeline)`.
//! - A finished bucket gets at most one cleanup task in the cleanup project.

use crate::model::framework::{ADate, Entity, EntityId, EntityName};
use crate::model::note::Note;
use crate::model::values::{Eisen, InboxTaskSource, NoteDomain, RecurringTaskPeriod};
use crate::model::working_mem::{WorkingMem, WorkingMemCollection};
use crate::repo::{EntityRepository, TrunkEntityRepository};
use crate::scheduler::Schedule;
use crate::service::gen_service::{upsert_generated_task, GeneratedTaskSpec, Upserted};
use crate::service::note_service::{create_note, load_for_source};
use crate::service::project_service::resolve_project;
use crate::service::{ServiceError, ServiceResult, ServiceScope};

/// The working memory of a bucket with its note.
#[derive(Debug, Clone)]
pub struct CurrentWorkingMem {
    pub working_mem: WorkingMem,
    pub note: Note,
    /// Whether this call created the working memory.
    pub created: bool,
}

fn working_mem_key(collection_ref_id: EntityId, period: RecurringTaskPeriod, timeline: &str) -> String {
    format!("working_mem:{collection_ref_id}:{period}:{timeline}")
}

/// The working memory of the bucket containing `today`, created on first access.
pub fn ensure_working_mem(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    today: ADate,
) -> ServiceResult<CurrentWorkingMem> {
    let collection: WorkingMemCollection = scope.trunk(workspace_ref_id)?;
    let schedule = Schedule::new(collection.generation_period, today);
    let repo = scope.uow.get_for::<WorkingMem>();
    let key = working_mem_key(collection.ref_id(), schedule.period, &schedule.timeline);
    if let Some(working_mem) = repo.load_by_unique_key(&key)? {
        if working_mem.is_archived() {
            return Err(ServiceError::invariant(format!(
                "working memory {} for this period is archived",
                working_mem.ref_id()
            )));
        }
        let note = match load_for_source(scope, NoteDomain::WorkingMem, working_mem.ref_id())? {
            Some(note) => note,
            None => create_note(
                scope,
                workspace_ref_id,
                NoteDomain::WorkingMem,
                working_mem.ref_id(),
                String::new(),
            )?,
        };
        return Ok(CurrentWorkingMem {
            working_mem,
            note,
            created: false,
        });
    }
    let working_mem = repo.create(WorkingMem::new_working_mem(
        scope.ctx,
        collection.ref_id(),
        schedule.first_day,
        schedule.period,
        schedule.timeline,
    )?)?;
    scope.reporter.mark_created(&working_mem);
    let note = create_note(
        scope,
        workspace_ref_id,
        NoteDomain::WorkingMem,
        working_mem.ref_id(),
        String::new(),
    )?;
    Ok(CurrentWorkingMem {
        working_mem,
        note,
        created: true,
    })
}

/// Working memory for the current day of the context.
pub fn load_current_working_mem(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
) -> ServiceResult<CurrentWorkingMem> {
    ensure_working_mem(scope, workspace_ref_id, scope.ctx.action_timestamp.date())
}

pub fn change_working_mem_settings(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    generation_period: RecurringTaskPeriod,
    cleanup_project_ref_id: Option<EntityId>,
) -> ServiceResult<WorkingMemCollection> {
    let cleanup_project_ref_id = resolve_project(scope, workspace_ref_id, cleanup_project_ref_id)?;
    let repo = scope.uow.get_for::<WorkingMemCollection>();
    let collection = repo.load_by_parent(workspace_ref_id)?;
    let collection = repo.save(collection.change_settings(scope.ctx, generation_period, cleanup_project_ref_id)?)?;
    scope.reporter.mark_updated(&collection);
    Ok(collection)
}

/// Cleanup task for the bucket right before the one containing `today`.
///
/// Nothing happens when that bucket never had a working memory.
pub fn ensure_cleanup_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    today: ADate,
    force: bool,
) -> ServiceResult<Upserted> {
    let collection: WorkingMemCollection = scope.trunk(workspace_ref_id)?;
    let current = Schedule::new(collection.generation_period, today);
    let previous = Schedule::new(collection.generation_period, current.first_day.add_days(-1));
    let key = working_mem_key(collection.ref_id(), previous.period, &previous.timeline);
    let Some(working_mem) = scope.uow.get_for::<WorkingMem>().load_by_unique_key(&key)? else {
        return Ok(Upserted::Unchanged);
    };
    if working_mem.is_archived() {
        return Ok(Upserted::Unchanged);
    }
    let spec = GeneratedTaskSpec {
        source: InboxTaskSource::WorkingMemCleanup,
        source_entity_ref_id: working_mem.ref_id(),
        name: EntityName::from_generated(&format!("Clean up working memory for {}", previous.first_day)),
        project_ref_id: collection.cleanup_project_ref_id,
        is_key: false,
        eisen: Eisen::Regular,
        difficulty: None,
        actionable_date: Some(current.first_day),
        due_date: Some(current.end_day),
        period: previous.period,
        timeline: previous.timeline,
        repeat_index: 0,
    };
    upsert_generated_task(scope, workspace_ref_id, spec, force)
}

#[cfg(test)]
mod tests {
    use super::{ensure_cleanup_task, ensure_working_mem, load_current_working_mem};
    use crate::model::framework::{ADate, Entity};
    use crate::model::values::InboxTaskSource;
    use crate::service::gen_service::Upserted;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    fn date(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    #[test]
    fn current_working_mem_is_stable_within_its_week() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-06T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();

        let first = load_current_working_mem(scope, ws).expect("working mem");
        assert!(first.created);
        assert_eq!(first.working_mem.right_now, date("2024-03-04"));
        assert_eq!(first.note.source_entity_ref_id, first.working_mem.ref_id());
        let again = ensure_working_mem(scope, ws, date("2024-03-10")).expect("working mem");
        assert!(!again.created);
        assert_eq!(first.working_mem.ref_id(), again.working_mem.ref_id());

        let cleanup = ensure_cleanup_task(scope, ws, date("2024-03-12"), false).expect("cleanup");
        let Upserted::Created(task) = cleanup else {
            panic!("expected a new cleanup task");
        };
        assert_eq!(task.source, InboxTaskSource::WorkingMemCleanup);
        assert!(matches!(
            ensure_cleanup_task(scope, ws, date("2024-03-13"), false).expect("cleanup"),
            Upserted::Unchanged
        ));
    }
}
