//! Vacations and their calendar blocks.
//!
//! # Invariants
//! - Every live vacation owns one full-days block spanning its dates.

use crate::model::framework::{ADate, Entity, EntityId, EntityName, UpdateAction};
use crate::model::values::TimeEventFullDaysNamespace;
use crate::model::vacation::{Vacation, VacationCollection};
use crate::repo::EntityRepository;
use crate::service::time_event_service::upsert_full_days_block;
use crate::service::{ServiceResult, ServiceScope};

fn sync_block(scope: ServiceScope<'_, '_>, workspace_ref_id: EntityId, vacation: &Vacation) -> ServiceResult<()> {
    let days = u32::try_from(vacation.duration_days()).unwrap_or(1);
    upsert_full_days_block(
        scope,
        workspace_ref_id,
        TimeEventFullDaysNamespace::Vacation,
        vacation.ref_id(),
        vacation.start_date,
        days,
    )?;
    Ok(())
}

pub fn create_vacation(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    name: EntityName,
    start_date: ADate,
    end_date: ADate,
) -> ServiceResult<Vacation> {
    let collection: VacationCollection = scope.trunk(workspace_ref_id)?;
    let vacation = scope.uow.get_for::<Vacation>().create(Vacation::new_vacation(
        scope.ctx,
        collection.ref_id(),
        name,
        start_date,
        end_date,
    )?)?;
    scope.reporter.mark_created(&vacation);
    sync_block(scope, workspace_ref_id, &vacation)?;
    Ok(vacation)
}

pub fn update_vacation(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    vacation_ref_id: EntityId,
    name: UpdateAction<EntityName>,
    start_date: UpdateAction<ADate>,
    end_date: UpdateAction<ADate>,
) -> ServiceResult<Vacation> {
    let dates_changed = start_date.should_change() || end_date.should_change();
    let repo = scope.uow.get_for::<Vacation>();
    let vacation = repo.load_by_id(vacation_ref_id, false)?;
    let vacation = repo.save(vacation.update(scope.ctx, name, start_date, end_date)?)?;
    scope.reporter.mark_updated(&vacation);
    if dates_changed {
        sync_block(scope, workspace_ref_id, &vacation)?;
    }
    Ok(vacation)
}

pub fn archive_vacation(scope: ServiceScope<'_, '_>, vacation_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<Vacation>(vacation_ref_id)
}

pub fn remove_vacation(scope: ServiceScope<'_, '_>, vacation_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<Vacation>(vacation_ref_id)
}

/// Live vacations of a workspace.
pub fn load_vacations(scope: ServiceScope<'_, '_>, workspace_ref_id: EntityId) -> ServiceResult<Vec<Vacation>> {
    let collection: VacationCollection = scope.trunk(workspace_ref_id)?;
    Ok(scope
        .uow
        .get_for::<Vacation>()
        .find_all(collection.ref_id(), false, None)?)
}

/// Whether some live vacation covers the whole `[first, last]` interval.
pub fn is_on_vacation(vacations: &[Vacation], first: ADate, last: ADate) -> bool {
    vacations.iter().any(|vacation| vacation.covers_range(first, last))
}

#[cfg(test)]
mod tests {
    use super::{archive_vacation, create_vacation, is_on_vacation, load_vacations, update_vacation};
    use crate::model::framework::{ADate, Entity, UpdateAction};
    use crate::model::time_event::TimeEventFullDaysBlock;
    use crate::model::values::TimeEventFullDaysNamespace;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::time_event_service::find_full_days_blocks;
    use crate::service::{ChangeKind, EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    fn date(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    #[test]
    fn block_tracks_the_vacation_dates() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let ns = TimeEventFullDaysNamespace::Vacation;

        let vacation = create_vacation(
            scope,
            ws,
            "Alps".parse().expect("name"),
            date("2024-07-01"),
            date("2024-07-14"),
        )
        .expect("vacation");
        let blocks = find_full_days_blocks(scope, ns, vacation.ref_id(), false).expect("blocks");
        assert_eq!(blocks[0].duration_days, 14);

        update_vacation(
            scope,
            ws,
            vacation.ref_id(),
            UpdateAction::do_nothing(),
            UpdateAction::do_nothing(),
            UpdateAction::change_to(date("2024-07-07")),
        )
        .expect("update");
        let blocks = find_full_days_blocks(scope, ns, vacation.ref_id(), false).expect("blocks");
        assert_eq!(blocks[0].end_date(), date("2024-07-07"));

        assert!(matches!(
            update_vacation(
                scope,
                ws,
                vacation.ref_id(),
                UpdateAction::do_nothing(),
                UpdateAction::do_nothing(),
                UpdateAction::change_to(date("2024-06-01")),
            ),
            Err(ServiceError::InputValidation(_))
        ));

        let vacations = load_vacations(scope, ws).expect("vacations");
        assert!(is_on_vacation(&vacations, date("2024-07-02"), date("2024-07-03")));
        assert!(!is_on_vacation(&vacations, date("2024-07-06"), date("2024-07-08")));

        reporter.reset();
        archive_vacation(scope, vacation.ref_id()).expect("archive");
        assert_eq!(reporter.count_of(ChangeKind::Archived, TimeEventFullDaysBlock::KIND), 1);
        assert!(load_vacations(scope, ws).expect("vacations").is_empty());
    }
}
