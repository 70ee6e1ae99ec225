//! Chore operations.
//!
//! # Invariants
//! - Archiving a chore archives its generated tasks and its note.
//! - Removing a chore removes its generated tasks; its note is archived and kept.

use crate::model::chore::{Chore, ChoreCollection, ChoreUpdate};
use crate::model::framework::{ADate, ArchivalReason, Entity, EntityId, EntityName};
use crate::model::inbox_task::InboxTask;
use crate::model::note::Note;
use crate::model::values::{InboxTaskSource, NoteDomain, RecurringTaskGenParams};
use crate::repo::EntityRepository;
use crate::service::inbox_task_service::find_generated_tasks;
use crate::service::note_service::load_for_source;
use crate::service::project_service::resolve_project;
use crate::service::traversal::{generic_destroyer, generic_full_archiver};
use crate::service::{ServiceResult, ServiceScope};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChore {
    pub name: EntityName,
    pub project_ref_id: Option<EntityId>,
    pub is_key: bool,
    pub gen_params: RecurringTaskGenParams,
    pub must_do: bool,
    pub start_at_date: Option<ADate>,
    pub end_at_date: Option<ADate>,
}

pub fn create_chore(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    input: NewChore,
) -> ServiceResult<Chore> {
    input.gen_params.validate()?;
    let collection: ChoreCollection = scope.trunk(workspace_ref_id)?;
    let project_ref_id = resolve_project(scope, workspace_ref_id, input.project_ref_id)?;
    let chore = scope.uow.get_for::<Chore>().create(Chore::new_chore(
        scope.ctx,
        collection.ref_id(),
        project_ref_id,
        input.name,
        input.is_key,
        input.gen_params,
        input.must_do,
        input.start_at_date,
        input.end_at_date,
    )?)?;
    scope.reporter.mark_created(&chore);
    Ok(chore)
}

pub fn update_chore(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    chore_ref_id: EntityId,
    update: ChoreUpdate,
) -> ServiceResult<Chore> {
    if let Some(params) = update.gen_params.value() {
        params.validate()?;
    }
    if let Some(project) = update.project_ref_id.value() {
        resolve_project(scope, workspace_ref_id, Some(*project))?;
    }
    let repo = scope.uow.get_for::<Chore>();
    let chore = repo.save(repo.load_by_id(chore_ref_id, false)?.update(scope.ctx, update)?)?;
    scope.reporter.mark_updated(&chore);
    Ok(chore)
}

pub fn suspend_chore(scope: ServiceScope<'_, '_>, chore_ref_id: EntityId) -> ServiceResult<Chore> {
    let repo = scope.uow.get_for::<Chore>();
    let chore = repo.save(repo.load_by_id(chore_ref_id, false)?.suspend(scope.ctx)?)?;
    scope.reporter.mark_updated(&chore);
    Ok(chore)
}

pub fn unsuspend_chore(scope: ServiceScope<'_, '_>, chore_ref_id: EntityId) -> ServiceResult<Chore> {
    let repo = scope.uow.get_for::<Chore>();
    let chore = repo.save(repo.load_by_id(chore_ref_id, false)?.unsuspend(scope.ctx)?)?;
    scope.reporter.mark_updated(&chore);
    Ok(chore)
}

pub fn archive_chore(scope: ServiceScope<'_, '_>, chore_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<Chore>(chore_ref_id)
}

pub fn remove_chore(scope: ServiceScope<'_, '_>, chore_ref_id: EntityId) -> ServiceResult<usize> {
    let repo = scope.uow.get_for::<Chore>();
    repo.load_by_id(chore_ref_id, true)?;
    let mut changed = 0;
    for task in find_generated_tasks(scope, InboxTaskSource::Chore, chore_ref_id, true)? {
        changed += generic_destroyer(
            scope.uow,
            scope.catalog,
            InboxTask::KIND,
            task.ref_id(),
            scope.reporter,
        )?;
    }
    if let Some(note) = load_for_source(scope, NoteDomain::Chore, chore_ref_id)? {
        changed += generic_full_archiver(
            scope.uow,
            scope.catalog,
            scope.ctx,
            Note::KIND,
            note.ref_id(),
            ArchivalReason::User,
            scope.reporter,
        )?;
    }
    let chore = repo.remove(chore_ref_id)?;
    scope.reporter.mark_removed(&chore);
    Ok(changed + 1)
}

#[cfg(test)]
mod tests {
    use super::{create_chore, remove_chore, update_chore, NewChore};
    use crate::model::chore::ChoreUpdate;
    use crate::model::framework::{ADate, Entity, UpdateAction};
    use crate::model::note::Note;
    use crate::model::values::{NoteDomain, RecurringTaskGenParams, RecurringTaskPeriod};
    use crate::repo::EntityRepository;
    use crate::service::note_service::create_note;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    fn weekly_chore() -> NewChore {
        NewChore {
            name: "Water plants".parse().expect("name"),
            project_ref_id: None,
            is_key: false,
            gen_params: RecurringTaskGenParams::simple(RecurringTaskPeriod::Weekly),
            must_do: false,
            start_at_date: None,
            end_at_date: None,
        }
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let chore = create_chore(scope, ws, weekly_chore()).expect("chore");
        assert_eq!(chore.start_at_date, "2024-03-04".parse::<ADate>().expect("date"));

        let update = ChoreUpdate {
            end_at_date: UpdateAction::change_to(Some("2024-03-01".parse().expect("date"))),
            ..Default::default()
        };
        assert!(matches!(
            update_chore(scope, ws, chore.ref_id(), update),
            Err(ServiceError::InputValidation(_))
        ));
    }

    #[test]
    fn removing_a_chore_keeps_its_note_archived() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let chore = create_chore(scope, ws, weekly_chore()).expect("chore");
        let note = create_note(scope, ws, NoteDomain::Chore, chore.ref_id(), "use rain water".into())
            .expect("note");

        assert_eq!(remove_chore(scope, chore.ref_id()).expect("remove"), 2);
        let kept = uow
            .get_for::<Note>()
            .load_by_id(note.ref_id(), true)
            .expect("note kept");
        assert!(kept.header.archived);
    }
}
