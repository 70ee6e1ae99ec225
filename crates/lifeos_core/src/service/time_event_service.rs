//! Calendar blocks owned by tasks, schedule events, birthdays and vacations.
//!
//! # Invariants
//! - Owners keep at most one full-days block per namespace.
//! - Blocks live in the workspace's time event domain.

use crate::model::framework::{ADate, Entity, EntityId, UpdateAction};
use crate::model::time_event::{TimeEventDomain, TimeEventFullDaysBlock, TimeEventInDayBlock};
use crate::model::values::{TimeEventFullDaysNamespace, TimeEventInDayNamespace, TimeInDay};
use crate::repo::{EntityRepository, RefFilter};
use crate::service::{ServiceResult, ServiceScope};

pub fn find_full_days_blocks(
    scope: ServiceScope<'_, '_>,
    namespace: TimeEventFullDaysNamespace,
    source_entity_ref_id: EntityId,
    allow_archived: bool,
) -> ServiceResult<Vec<TimeEventFullDaysBlock>> {
    Ok(scope.uow.get_for::<TimeEventFullDaysBlock>().find_all_generic(
        None,
        allow_archived,
        &[
            RefFilter::eq("namespace", namespace),
            RefFilter::eq("source_entity_ref_id", source_entity_ref_id),
        ],
    )?)
}

/// Creates the owner's full-days block or moves the existing one.
pub fn upsert_full_days_block(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    namespace: TimeEventFullDaysNamespace,
    source_entity_ref_id: EntityId,
    start_date: ADate,
    duration_days: u32,
) -> ServiceResult<TimeEventFullDaysBlock> {
    let repo = scope.uow.get_for::<TimeEventFullDaysBlock>();
    let existing = find_full_days_blocks(scope, namespace, source_entity_ref_id, false)?
        .into_iter()
        .next();
    match existing {
        Some(block) => {
            if block.start_date == start_date && block.duration_days == duration_days {
                return Ok(block);
            }
            let block = repo.save(block.update(
                scope.ctx,
                UpdateAction::change_to(start_date),
                UpdateAction::change_to(duration_days),
            )?)?;
            scope.reporter.mark_updated(&block);
            Ok(block)
        }
        None => {
            let domain: TimeEventDomain = scope.trunk(workspace_ref_id)?;
            let block = repo.create(TimeEventFullDaysBlock::new_block(
                scope.ctx,
                domain.ref_id(),
                namespace,
                source_entity_ref_id,
                start_date,
                duration_days,
            )?)?;
            scope.reporter.mark_created(&block);
            Ok(block)
        }
    }
}

/// Removes every full-days block of an owner; returns how many went away.
pub fn remove_full_days_blocks(
    scope: ServiceScope<'_, '_>,
    namespace: TimeEventFullDaysNamespace,
    source_entity_ref_id: EntityId,
) -> ServiceResult<usize> {
    let mut removed = 0;
    for block in find_full_days_blocks(scope, namespace, source_entity_ref_id, true)? {
        removed += scope.remove::<TimeEventFullDaysBlock>(block.ref_id())?;
    }
    Ok(removed)
}

pub fn create_in_day_block(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    namespace: TimeEventInDayNamespace,
    source_entity_ref_id: EntityId,
    start_date: ADate,
    start_time_in_day: TimeInDay,
    duration_mins: u32,
) -> ServiceResult<TimeEventInDayBlock> {
    let domain: TimeEventDomain = scope.trunk(workspace_ref_id)?;
    let block = scope
        .uow
        .get_for::<TimeEventInDayBlock>()
        .create(TimeEventInDayBlock::new_block(
            scope.ctx,
            domain.ref_id(),
            namespace,
            source_entity_ref_id,
            start_date,
            start_time_in_day,
            duration_mins,
        )?)?;
    scope.reporter.mark_created(&block);
    Ok(block)
}

pub fn update_in_day_block(
    scope: ServiceScope<'_, '_>,
    block_ref_id: EntityId,
    start_date: UpdateAction<ADate>,
    start_time_in_day: UpdateAction<TimeInDay>,
    duration_mins: UpdateAction<u32>,
) -> ServiceResult<TimeEventInDayBlock> {
    let repo = scope.uow.get_for::<TimeEventInDayBlock>();
    let block = repo.load_by_id(block_ref_id, false)?;
    let block = repo.save(block.update(scope.ctx, start_date, start_time_in_day, duration_mins)?)?;
    scope.reporter.mark_updated(&block);
    Ok(block)
}

pub fn find_in_day_blocks(
    scope: ServiceScope<'_, '_>,
    namespace: TimeEventInDayNamespace,
    source_entity_ref_id: EntityId,
    allow_archived: bool,
) -> ServiceResult<Vec<TimeEventInDayBlock>> {
    Ok(scope.uow.get_for::<TimeEventInDayBlock>().find_all_generic(
        None,
        allow_archived,
        &[
            RefFilter::eq("namespace", namespace),
            RefFilter::eq("source_entity_ref_id", source_entity_ref_id),
        ],
    )?)
}

/// Live blocks of a workspace touching `[from, to]`.
#[derive(Debug, Clone, Default)]
pub struct CalendarWindow {
    pub in_day: Vec<TimeEventInDayBlock>,
    pub full_days: Vec<TimeEventFullDaysBlock>,
}

pub fn load_window(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    from: ADate,
    to: ADate,
) -> ServiceResult<CalendarWindow> {
    let domain: TimeEventDomain = scope.trunk(workspace_ref_id)?;
    let mut in_day: Vec<TimeEventInDayBlock> = scope
        .uow
        .get_for::<TimeEventInDayBlock>()
        .find_all(domain.ref_id(), false, None)?
        .into_iter()
        .filter(|block| block.start_date >= from && block.start_date <= to)
        .collect();
    in_day.sort_by_key(|block| (block.start_date, block.start_time_in_day));
    let mut full_days: Vec<TimeEventFullDaysBlock> = scope
        .uow
        .get_for::<TimeEventFullDaysBlock>()
        .find_all(domain.ref_id(), false, None)?
        .into_iter()
        .filter(|block| block.start_date <= to && block.end_date() >= from)
        .collect();
    full_days.sort_by_key(|block| block.start_date);
    Ok(CalendarWindow { in_day, full_days })
}

#[cfg(test)]
mod tests {
    use super::{load_window, remove_full_days_blocks, upsert_full_days_block};
    use crate::model::framework::{ADate, Entity, EntityId};
    use crate::model::values::TimeEventFullDaysNamespace;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    fn date(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    #[test]
    fn upsert_moves_the_single_block() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let owner = EntityId::from_raw(777);
        let ns = TimeEventFullDaysNamespace::Vacation;

        let first = upsert_full_days_block(scope, ws, ns, owner, date("2024-07-01"), 5).expect("block");
        let moved = upsert_full_days_block(scope, ws, ns, owner, date("2024-07-10"), 3).expect("block");
        assert_eq!(first.header.ref_id, moved.header.ref_id);
        assert_eq!(moved.end_date(), date("2024-07-12"));

        let window = load_window(scope, ws, date("2024-07-12"), date("2024-07-20")).expect("window");
        assert_eq!(window.full_days.len(), 1);
        let empty = load_window(scope, ws, date("2024-07-01"), date("2024-07-09")).expect("window");
        assert!(empty.full_days.is_empty());

        assert_eq!(remove_full_days_blocks(scope, ns, owner).expect("remove"), 1);
    }
}
