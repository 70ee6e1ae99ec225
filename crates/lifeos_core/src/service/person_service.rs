//! People and their birthday calendar blocks.
//!
//! # Invariants
//! - A person with a birthday owns one full-days block on its next occurrence.
//! - Archiving a person archives both its catch-up and birthday task streams.

use crate::model::framework::{ADate, ArchivalReason, Entity, EntityId, EntityName, UpdateAction};
use crate::model::person::{Person, PersonCollection};
use crate::model::values::{
    InboxTaskSource, PersonBirthday, PersonRelationship, RecurringTaskGenParams,
    TimeEventFullDaysNamespace,
};
use crate::repo::{EntityRepository, TrunkEntityRepository};
use crate::service::inbox_task_service::archive_generated_tasks;
use crate::service::project_service::resolve_project;
use crate::service::time_event_service::{remove_full_days_blocks, upsert_full_days_block};
use crate::service::{ServiceResult, ServiceScope};

/// First day on or after `today` the birthday falls on.
pub fn next_birthday(birthday: PersonBirthday, today: ADate) -> ServiceResult<ADate> {
    let this_year = birthday.in_year(today.year())?;
    if this_year >= today {
        return Ok(this_year);
    }
    Ok(birthday.in_year(today.year() + 1)?)
}

fn sync_birthday_block(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    person: &Person,
) -> ServiceResult<()> {
    let namespace = TimeEventFullDaysNamespace::PersonBirthday;
    match person.birthday {
        Some(birthday) => {
            let start = next_birthday(birthday, scope.ctx.action_timestamp.date())?;
            upsert_full_days_block(scope, workspace_ref_id, namespace, person.ref_id(), start, 1)?;
        }
        None => {
            remove_full_days_blocks(scope, namespace, person.ref_id())?;
        }
    }
    Ok(())
}

pub fn create_person(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    name: EntityName,
    relationship: PersonRelationship,
    catch_up_params: Option<RecurringTaskGenParams>,
    birthday: Option<PersonBirthday>,
) -> ServiceResult<Person> {
    if let Some(params) = &catch_up_params {
        params.validate()?;
    }
    let collection: PersonCollection = scope.trunk(workspace_ref_id)?;
    let person = scope.uow.get_for::<Person>().create(Person::new_person(
        scope.ctx,
        collection.ref_id(),
        name,
        relationship,
        catch_up_params,
        birthday,
    ))?;
    scope.reporter.mark_created(&person);
    sync_birthday_block(scope, workspace_ref_id, &person)?;
    Ok(person)
}

pub fn update_person(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    person_ref_id: EntityId,
    name: UpdateAction<EntityName>,
    relationship: UpdateAction<PersonRelationship>,
    catch_up_params: UpdateAction<Option<RecurringTaskGenParams>>,
    birthday: UpdateAction<Option<PersonBirthday>>,
) -> ServiceResult<Person> {
    if let Some(Some(params)) = catch_up_params.value() {
        params.validate()?;
    }
    let birthday_changed = birthday.should_change();
    let repo = scope.uow.get_for::<Person>();
    let person = repo.load_by_id(person_ref_id, false)?;
    let person = repo.save(person.update(scope.ctx, name, relationship, catch_up_params, birthday))?;
    scope.reporter.mark_updated(&person);
    if birthday_changed {
        sync_birthday_block(scope, workspace_ref_id, &person)?;
    }
    Ok(person)
}

/// Points catch-up tasks at another project of the workspace.
pub fn change_catch_up_project(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    project_ref_id: Option<EntityId>,
) -> ServiceResult<PersonCollection> {
    let project_ref_id = resolve_project(scope, workspace_ref_id, project_ref_id)?;
    let repo = scope.uow.get_for::<PersonCollection>();
    let collection = repo.load_by_parent(workspace_ref_id)?;
    let collection = repo.save(collection.change_catch_up_project(scope.ctx, project_ref_id))?;
    scope.reporter.mark_updated(&collection);
    Ok(collection)
}

/// Archives both generated task streams, then the person with its blocks and note.
pub fn archive_person(scope: ServiceScope<'_, '_>, person_ref_id: EntityId) -> ServiceResult<usize> {
    let mut changed = 0;
    for source in [InboxTaskSource::PersonCatchUp, InboxTaskSource::PersonBirthday] {
        changed += archive_generated_tasks(scope, source, person_ref_id, ArchivalReason::User)?;
    }
    changed += scope.archive::<Person>(person_ref_id)?;
    Ok(changed)
}

pub fn remove_person(scope: ServiceScope<'_, '_>, person_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<Person>(person_ref_id)
}

#[cfg(test)]
mod tests {
    use super::{create_person, next_birthday, update_person};
    use crate::model::framework::{ADate, Entity, UpdateAction};
    use crate::model::values::{PersonRelationship, TimeEventFullDaysNamespace};
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::time_event_service::find_full_days_blocks;
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    fn date(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    #[test]
    fn next_birthday_rolls_into_next_year() {
        let birthday = "3 Mar".parse().expect("birthday");
        assert_eq!(next_birthday(birthday, date("2024-03-04")).expect("next"), date("2025-03-03"));
        assert_eq!(next_birthday(birthday, date("2024-03-03")).expect("next"), date("2024-03-03"));
        let leap = "29 Feb".parse().expect("birthday");
        assert_eq!(next_birthday(leap, date("2025-01-10")).expect("next"), date("2025-02-28"));
    }

    #[test]
    fn birthday_block_follows_the_person() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let ns = TimeEventFullDaysNamespace::PersonBirthday;

        let person = create_person(
            scope,
            ws,
            "Ada".parse().expect("name"),
            PersonRelationship::Friend,
            None,
            Some("10 Dec".parse().expect("birthday")),
        )
        .expect("person");
        let blocks = find_full_days_blocks(scope, ns, person.ref_id(), false).expect("blocks");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_date, date("2024-12-10"));

        update_person(
            scope,
            ws,
            person.ref_id(),
            UpdateAction::do_nothing(),
            UpdateAction::do_nothing(),
            UpdateAction::do_nothing(),
            UpdateAction::change_to(None),
        )
        .expect("update");
        assert!(find_full_days_blocks(scope, ns, person.ref_id(), true)
            .expect("blocks")
            .is_empty());
    }
}
