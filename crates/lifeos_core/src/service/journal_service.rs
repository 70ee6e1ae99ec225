//! Journals: a reflection note per bucket plus the bucket's report snapshot.
//!
//! # Invariants
//! - One journal per `(collection, period, timeline)`, archived ones included.
//! - The stats snapshot always describes the journal's current bucket.

use crate::model::framework::{ADate, Entity, EntityId, UpdateAction};
use crate::model::journal::{Journal, JournalCollection, JournalStats};
use crate::model::note::Note;
use crate::model::values::{JournalSource, NoteDomain, RecurringTaskPeriod};
use crate::repo::{EntityRepository, RecordRepository, RefFilter};
use crate::scheduler::Schedule;
use crate::service::note_service::{create_note, load_for_source};
use crate::service::report_service::{run_report, ReportRequest};
use crate::service::{ServiceResult, ServiceScope};

#[derive(Debug, Clone)]
pub struct JournalView {
    pub journal: Journal,
    pub note: Option<Note>,
    pub stats: Option<JournalStats>,
}

fn snapshot_stats(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    journal: &Journal,
) -> ServiceResult<JournalStats> {
    let report = run_report(
        scope,
        workspace_ref_id,
        &ReportRequest::new(journal.right_now, journal.period),
    )?;
    let records = scope.uow.records::<JournalStats>();
    let stats = match records.load_optional(journal.ref_id(), "stats")? {
        Some(stats) => stats.update_report(scope.ctx, report),
        None => JournalStats::new_stats(scope.ctx, journal.ref_id(), report),
    };
    Ok(records.upsert(stats)?)
}

/// Creates the journal of the bucket around `right_now` with its note and stats.
///
/// # Errors
/// - `EntityAlreadyExists` when the bucket already has a journal.
pub fn create_journal(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    source: JournalSource,
    right_now: ADate,
    period: RecurringTaskPeriod,
) -> ServiceResult<JournalView> {
    let collection: JournalCollection = scope.trunk(workspace_ref_id)?;
    let schedule = Schedule::new(period, right_now);
    let journal = scope.uow.get_for::<Journal>().create(Journal::new_journal(
        scope.ctx,
        collection.ref_id(),
        source,
        right_now,
        period,
        schedule.timeline,
    ))?;
    scope.reporter.mark_created(&journal);
    let note = create_note(scope, workspace_ref_id, NoteDomain::Journal, journal.ref_id(), String::new())?;
    let stats = snapshot_stats(scope, workspace_ref_id, &journal)?;
    Ok(JournalView {
        journal,
        note: Some(note),
        stats: Some(stats),
    })
}

/// Moves a journal to another bucket and refreshes its stats.
pub fn change_journal_time_config(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    journal_ref_id: EntityId,
    right_now: UpdateAction<ADate>,
    period: UpdateAction<RecurringTaskPeriod>,
) -> ServiceResult<Journal> {
    let repo = scope.uow.get_for::<Journal>();
    let journal = repo.load_by_id(journal_ref_id, false)?;
    if !right_now.should_change() && !period.should_change() {
        return Ok(journal);
    }
    let right_now = right_now.or_else(journal.right_now);
    let period = period.or_else(journal.period);
    let timeline = Schedule::new(period, right_now).timeline;
    let journal = repo.save(journal.change_time_config(scope.ctx, right_now, period, timeline))?;
    scope.reporter.mark_updated(&journal);
    snapshot_stats(scope, workspace_ref_id, &journal)?;
    Ok(journal)
}

/// Recomputes the stats snapshot of a live journal.
pub fn refresh_journal_stats(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    journal_ref_id: EntityId,
) -> ServiceResult<JournalStats> {
    let journal = scope.uow.get_for::<Journal>().load_by_id(journal_ref_id, false)?;
    snapshot_stats(scope, workspace_ref_id, &journal)
}

pub fn archive_journal(scope: ServiceScope<'_, '_>, journal_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<Journal>(journal_ref_id)
}

pub fn remove_journal(scope: ServiceScope<'_, '_>, journal_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<Journal>(journal_ref_id)
}

pub fn load_journal(
    scope: ServiceScope<'_, '_>,
    journal_ref_id: EntityId,
    allow_archived: bool,
) -> ServiceResult<JournalView> {
    let journal = scope.uow.get_for::<Journal>().load_by_id(journal_ref_id, allow_archived)?;
    let note = load_for_source(scope, NoteDomain::Journal, journal_ref_id)?;
    let stats = scope.uow.records::<JournalStats>().load_optional(journal_ref_id, "stats")?;
    Ok(JournalView { journal, note, stats })
}

/// Journals of a workspace, optionally limited to one period.
pub fn find_journals(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    period: Option<RecurringTaskPeriod>,
    allow_archived: bool,
) -> ServiceResult<Vec<Journal>> {
    let collection: JournalCollection = scope.trunk(workspace_ref_id)?;
    let filters: Vec<RefFilter> = period
        .map(|period| RefFilter::eq("period", period))
        .into_iter()
        .collect();
    Ok(scope
        .uow
        .get_for::<Journal>()
        .find_all_generic(Some(collection.ref_id()), allow_archived, &filters)?)
}

#[cfg(test)]
mod tests {
    use super::{change_journal_time_config, create_journal, find_journals, load_journal, remove_journal};
    use crate::model::framework::{ADate, Entity, UpdateAction};
    use crate::model::journal::JournalStats;
    use crate::model::values::{JournalSource, RecurringTaskPeriod};
    use crate::repo::{RecordRepository, RepoError};
    use crate::service::inbox_task_service::{create_inbox_task, NewInboxTask};
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    fn date(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    #[test]
    fn journal_snapshots_its_bucket_and_is_unique() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-05T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        create_inbox_task(scope, ws, NewInboxTask::named("Plan week".parse().expect("name"))).expect("task");

        let view = create_journal(scope, ws, JournalSource::User, date("2024-03-06"), RecurringTaskPeriod::Weekly)
            .expect("journal");
        assert_eq!(view.journal.timeline, "2024,Q1,Mar,W10");
        let stats = view.stats.expect("stats");
        assert_eq!(stats.report.global_inbox_tasks.created, 1);

        let duplicate = create_journal(scope, ws, JournalSource::User, date("2024-03-08"), RecurringTaskPeriod::Weekly);
        assert!(matches!(
            duplicate,
            Err(ServiceError::Repo(RepoError::EntityAlreadyExists { .. }))
        ));

        let moved = change_journal_time_config(
            scope,
            ws,
            view.journal.ref_id(),
            UpdateAction::change_to(date("2024-03-13")),
            UpdateAction::do_nothing(),
        )
        .expect("move");
        assert_eq!(moved.timeline, "2024,Q1,Mar,W11");
        let loaded = load_journal(scope, moved.ref_id(), false).expect("load");
        assert_eq!(loaded.stats.expect("stats").report.global_inbox_tasks.created, 0);
        assert!(loaded.note.is_some());
        assert_eq!(
            find_journals(scope, ws, Some(RecurringTaskPeriod::Weekly), false)
                .expect("find")
                .len(),
            1
        );

        remove_journal(scope, moved.ref_id()).expect("remove");
        assert!(uow
            .records::<JournalStats>()
            .load_optional(moved.ref_id(), "stats")
            .expect("stats")
            .is_none());
    }
}
