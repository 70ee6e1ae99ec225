//! Metric and metric entry use cases.

use crate::model::framework::{ADate, EntityId, EntityName, UpdateAction};
use crate::model::metric::{Metric, MetricCollection, MetricEntry};
use crate::model::values::{MetricUnit, RecurringTaskGenParams, WorkspaceFeature};
use crate::repo::EntityRepository;
use crate::service::metric_service::{
    archive_metric, archive_metric_entry, change_collection_project, create_metric,
    create_metric_entry, load_entries, remove_metric, remove_metric_entry, update_metric,
    update_metric_entry,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoadArgs, LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseResult,
};
use serde::{Deserialize, Serialize};

const METRICS: &[WorkspaceFeature] = &[WorkspaceFeature::Metrics];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricCreateArgs {
    pub name: EntityName,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub collection_params: Option<RecurringTaskGenParams>,
    #[serde(default)]
    pub metric_unit: Option<MetricUnit>,
}

use_case! {
    MetricCreateUseCase: MetricCreateArgs => Metric,
    UseCaseDescriptor::mutation("metric_create").requires(METRICS)
}

impl LoggedInMutation for MetricCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: MetricCreateArgs) -> UseCaseResult<Metric> {
        Ok(create_metric(
            cx.scope,
            cx.workspace_ref_id(),
            args.name,
            args.is_key,
            args.collection_params,
            args.metric_unit,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub is_key: UpdateAction<bool>,
    #[serde(default)]
    pub collection_params: UpdateAction<Option<RecurringTaskGenParams>>,
    #[serde(default)]
    pub metric_unit: UpdateAction<Option<MetricUnit>>,
}

use_case! {
    MetricUpdateUseCase: MetricUpdateArgs => Metric,
    UseCaseDescriptor::mutation("metric_update").requires(METRICS)
}

impl LoggedInMutation for MetricUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: MetricUpdateArgs) -> UseCaseResult<Metric> {
        Ok(update_metric(
            cx.scope,
            args.ref_id,
            args.name,
            args.is_key,
            args.collection_params,
            args.metric_unit,
        )?)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricChangeCollectionProjectArgs {
    /// `None` falls back to the root project.
    #[serde(default)]
    pub collection_project_ref_id: Option<EntityId>,
}

use_case! {
    MetricChangeCollectionProjectUseCase: MetricChangeCollectionProjectArgs => MetricCollection,
    UseCaseDescriptor::mutation("metric_change_collection_project").requires(METRICS)
}

impl LoggedInMutation for MetricChangeCollectionProjectUseCase {
    fn perform(
        &self,
        cx: &LoggedInCx<'_, '_>,
        args: MetricChangeCollectionProjectArgs,
    ) -> UseCaseResult<MetricCollection> {
        Ok(change_collection_project(
            cx.scope,
            cx.workspace_ref_id(),
            args.collection_project_ref_id,
        )?)
    }
}

use_case! {
    MetricArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("metric_archive").requires(METRICS)
}

impl LoggedInMutation for MetricArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_metric(cx.scope, args.ref_id)?)
    }
}

use_case! {
    MetricRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("metric_remove").requires(METRICS)
}

impl LoggedInMutation for MetricRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_metric(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone)]
pub struct MetricLoadResult {
    pub metric: Metric,
    pub entries: Vec<MetricEntry>,
}

use_case! {
    MetricLoadUseCase: LoadArgs => MetricLoadResult,
    UseCaseDescriptor::readonly("metric_load").requires(METRICS)
}

impl LoggedInReadonly for MetricLoadUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: LoadArgs) -> UseCaseResult<MetricLoadResult> {
        let metric = cx
            .scope
            .uow
            .get_for::<Metric>()
            .load_by_id(args.ref_id, args.allow_archived)?;
        let entries = load_entries(cx.scope, args.ref_id)?;
        Ok(MetricLoadResult { metric, entries })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricEntryCreateArgs {
    pub metric_ref_id: EntityId,
    /// Defaults to the day of the call.
    #[serde(default)]
    pub collection_time: Option<ADate>,
    pub value: f64,
}

use_case! {
    MetricEntryCreateUseCase: MetricEntryCreateArgs => MetricEntry,
    UseCaseDescriptor::mutation("metric_entry_create").requires(METRICS)
}

impl LoggedInMutation for MetricEntryCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: MetricEntryCreateArgs) -> UseCaseResult<MetricEntry> {
        Ok(create_metric_entry(
            cx.scope,
            args.metric_ref_id,
            args.collection_time,
            args.value,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntryUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub collection_time: UpdateAction<ADate>,
    #[serde(default)]
    pub value: UpdateAction<f64>,
}

use_case! {
    MetricEntryUpdateUseCase: MetricEntryUpdateArgs => MetricEntry,
    UseCaseDescriptor::mutation("metric_entry_update").requires(METRICS)
}

impl LoggedInMutation for MetricEntryUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: MetricEntryUpdateArgs) -> UseCaseResult<MetricEntry> {
        Ok(update_metric_entry(
            cx.scope,
            args.ref_id,
            args.collection_time,
            args.value,
        )?)
    }
}

use_case! {
    MetricEntryArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("metric_entry_archive").requires(METRICS)
}

impl LoggedInMutation for MetricEntryArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_metric_entry(cx.scope, args.ref_id)?)
    }
}

use_case! {
    MetricEntryRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("metric_entry_remove").requires(METRICS)
}

impl LoggedInMutation for MetricEntryRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_metric_entry(cx.scope, args.ref_id)?)
    }
}
