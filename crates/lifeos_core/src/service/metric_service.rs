//! Metrics and their entries.
//!
//! # Invariants
//! - Collection tasks of a metric land in the collection's project.
//! - Removing a metric removes its entries, their notes, its collection tasks and its note.

use crate::model::framework::{ADate, Entity, EntityId, EntityName, UpdateAction};
use crate::model::metric::{Metric, MetricCollection, MetricEntry};
use crate::model::values::{MetricUnit, RecurringTaskGenParams};
use crate::repo::{EntityRepository, TrunkEntityRepository};
use crate::service::project_service::resolve_project;
use crate::service::{ServiceResult, ServiceScope};
use log::info;

pub fn create_metric(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    name: EntityName,
    is_key: bool,
    collection_params: Option<RecurringTaskGenParams>,
    metric_unit: Option<MetricUnit>,
) -> ServiceResult<Metric> {
    if let Some(params) = &collection_params {
        params.validate()?;
    }
    let collection: MetricCollection = scope.trunk(workspace_ref_id)?;
    let metric = scope.uow.get_for::<Metric>().create(Metric::new_metric(
        scope.ctx,
        collection.ref_id(),
        name,
        is_key,
        collection_params,
        metric_unit,
    ))?;
    scope.reporter.mark_created(&metric);
    Ok(metric)
}

pub fn update_metric(
    scope: ServiceScope<'_, '_>,
    metric_ref_id: EntityId,
    name: UpdateAction<EntityName>,
    is_key: UpdateAction<bool>,
    collection_params: UpdateAction<Option<RecurringTaskGenParams>>,
    metric_unit: UpdateAction<Option<MetricUnit>>,
) -> ServiceResult<Metric> {
    if let Some(Some(params)) = collection_params.value() {
        params.validate()?;
    }
    let repo = scope.uow.get_for::<Metric>();
    let metric = repo.load_by_id(metric_ref_id, false)?;
    let metric = repo.save(metric.update(scope.ctx, name, is_key, collection_params, metric_unit))?;
    scope.reporter.mark_updated(&metric);
    Ok(metric)
}

/// Points metric collection tasks at another project of the workspace.
pub fn change_collection_project(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    project_ref_id: Option<EntityId>,
) -> ServiceResult<MetricCollection> {
    let project_ref_id = resolve_project(scope, workspace_ref_id, project_ref_id)?;
    let repo = scope.uow.get_for::<MetricCollection>();
    let collection = repo.load_by_parent(workspace_ref_id)?;
    let collection = repo.save(collection.change_collection_project(scope.ctx, project_ref_id))?;
    scope.reporter.mark_updated(&collection);
    Ok(collection)
}

pub fn archive_metric(scope: ServiceScope<'_, '_>, metric_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<Metric>(metric_ref_id)
}

pub fn remove_metric(scope: ServiceScope<'_, '_>, metric_ref_id: EntityId) -> ServiceResult<usize> {
    let removed = scope.remove::<Metric>(metric_ref_id)?;
    info!(
        "event=metric_remove module=service status=ok metric_id={} removed={}",
        metric_ref_id, removed
    );
    Ok(removed)
}

pub fn create_metric_entry(
    scope: ServiceScope<'_, '_>,
    metric_ref_id: EntityId,
    collection_time: Option<ADate>,
    value: f64,
) -> ServiceResult<MetricEntry> {
    scope.uow.get_for::<Metric>().load_by_id(metric_ref_id, false)?;
    let collection_time = collection_time.unwrap_or_else(|| scope.ctx.action_timestamp.date());
    let entry = scope.uow.get_for::<MetricEntry>().create(MetricEntry::new_metric_entry(
        scope.ctx,
        metric_ref_id,
        collection_time,
        value,
    )?)?;
    scope.reporter.mark_created(&entry);
    Ok(entry)
}

pub fn update_metric_entry(
    scope: ServiceScope<'_, '_>,
    entry_ref_id: EntityId,
    collection_time: UpdateAction<ADate>,
    value: UpdateAction<f64>,
) -> ServiceResult<MetricEntry> {
    let repo = scope.uow.get_for::<MetricEntry>();
    let entry = repo.load_by_id(entry_ref_id, false)?;
    let entry = repo.save(entry.update(scope.ctx, collection_time, value)?)?;
    scope.reporter.mark_updated(&entry);
    Ok(entry)
}

pub fn archive_metric_entry(scope: ServiceScope<'_, '_>, entry_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<MetricEntry>(entry_ref_id)
}

pub fn remove_metric_entry(scope: ServiceScope<'_, '_>, entry_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<MetricEntry>(entry_ref_id)
}

/// Live entries of a metric, oldest collection first.
pub fn load_entries(scope: ServiceScope<'_, '_>, metric_ref_id: EntityId) -> ServiceResult<Vec<MetricEntry>> {
    let mut entries = scope
        .uow
        .get_for::<MetricEntry>()
        .find_all(metric_ref_id, false, None)?;
    entries.sort_by_key(|entry| entry.collection_time);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::{create_metric, create_metric_entry, load_entries, remove_metric};
    use crate::model::framework::{ADate, Entity};
    use crate::model::metric::MetricEntry;
    use crate::model::note::Note;
    use crate::model::values::{MetricUnit, NoteDomain};
    use crate::repo::EntityRepository;
    use crate::service::note_service::create_note;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{ChangeKind, EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    #[test]
    fn entries_default_to_today_and_reject_nan() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let metric = create_metric(
            scope,
            seeded.workspace.ref_id(),
            "Weight".parse().expect("name"),
            false,
            None,
            Some(MetricUnit::Weight),
        )
        .expect("metric");
        create_metric_entry(scope, metric.ref_id(), Some("2024-03-01".parse().expect("date")), 71.5)
            .expect("entry");
        let today = create_metric_entry(scope, metric.ref_id(), None, 71.0).expect("entry");
        assert_eq!(today.collection_time, "2024-03-04".parse::<ADate>().expect("date"));
        assert!(matches!(
            create_metric_entry(scope, metric.ref_id(), None, f64::NAN),
            Err(ServiceError::InputValidation(_))
        ));
        let entries = load_entries(scope, metric.ref_id()).expect("entries");
        assert_eq!(entries.len(), 2);
        assert!(entries[0].collection_time < entries[1].collection_time);
    }

    #[test]
    fn removing_a_metric_takes_entries_and_their_notes() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let metric = create_metric(scope, ws, "Steps".parse().expect("name"), false, None, None)
            .expect("metric");
        let entry = create_metric_entry(scope, metric.ref_id(), None, 9000.0).expect("entry");
        create_note(scope, ws, NoteDomain::MetricEntry, entry.ref_id(), "long walk".into()).expect("note");
        create_note(scope, ws, NoteDomain::Metric, metric.ref_id(), "daily".into()).expect("note");
        reporter.reset();

        assert_eq!(remove_metric(scope, metric.ref_id()).expect("remove"), 4);
        assert_eq!(reporter.count_of(ChangeKind::Removed, Note::KIND), 2);
        assert!(uow
            .get_for::<MetricEntry>()
            .load_optional(entry.ref_id(), true)
            .expect("load")
            .is_none());
    }
}
