//! Session-less runs applied to every workspace in turn.

use crate::model::framework::EventSource;
use crate::model::run_log::{GcLogEntry, GenLogEntry};
use crate::model::schedule::ScheduleExternalSyncLogEntry;
use crate::model::values::WorkspaceFeature;
use crate::service::gc_service::{run_gc, GcRequest};
use crate::service::gen_service::{run_generation, GenRequest};
use crate::service::workspace_service::backfill_workspace;
use crate::sync::SyncRequest;
use crate::use_case::app::{AppServices, Session};
use crate::use_case::descriptor::use_case;
use crate::use_case::engine::run_external_sync;
use crate::use_case::{BackgroundMutation, UseCaseDescriptor, UseCaseKind, UseCaseResult};
use async_trait::async_trait;

use_case! {
    GenBackgroundUseCase: () => GenLogEntry,
    UseCaseDescriptor::new("gen_background", UseCaseKind::BackgroundMutation)
}

#[async_trait(?Send)]
impl BackgroundMutation for GenBackgroundUseCase {
    async fn perform_for_workspace(&self, app: &AppServices, session: &Session) -> UseCaseResult<GenLogEntry> {
        let ctx = app.context_with(app.now(), EventSource::Gen);
        app.in_uow(session, &ctx, |cx| {
            Ok(run_generation(cx.scope, cx.workspace_ref_id(), &GenRequest::all(cx.today()))?)
        })
        .await
    }
}

use_case! {
    GcBackgroundUseCase: () => GcLogEntry,
    UseCaseDescriptor::new("gc_background", UseCaseKind::BackgroundMutation)
}

#[async_trait(?Send)]
impl BackgroundMutation for GcBackgroundUseCase {
    async fn perform_for_workspace(&self, app: &AppServices, session: &Session) -> UseCaseResult<GcLogEntry> {
        let ctx = app.context_with(app.now(), EventSource::Gc);
        app.in_uow(session, &ctx, |cx| {
            Ok(run_gc(
                cx.scope,
                &cx.config.gc,
                cx.workspace_ref_id(),
                &GcRequest::all(cx.today()),
            )?)
        })
        .await
    }
}

use_case! {
    ScheduleExternalSyncBackgroundUseCase: () => ScheduleExternalSyncLogEntry,
    UseCaseDescriptor::new("schedule_external_sync_background", UseCaseKind::BackgroundMutation)
        .requires(&[WorkspaceFeature::Schedule])
}

#[async_trait(?Send)]
impl BackgroundMutation for ScheduleExternalSyncBackgroundUseCase {
    async fn perform_for_workspace(
        &self,
        app: &AppServices,
        session: &Session,
    ) -> UseCaseResult<ScheduleExternalSyncLogEntry> {
        let now = app.now();
        let ctx = app.context_with(now, EventSource::Sync);
        let request = SyncRequest {
            today: now.date(),
            sync_even_if_not_modified: false,
            filter_schedule_stream_ref_ids: None,
        };
        run_external_sync(app, session, &ctx, &request).await
    }
}

use_case! {
    /// Creates trunks missing from workspaces made by older builds.
    BackfillWorkspacesUseCase: () => Vec<&'static str>,
    UseCaseDescriptor::new("backfill_workspaces", UseCaseKind::SysBackgroundMutation)
}

#[async_trait(?Send)]
impl BackgroundMutation for BackfillWorkspacesUseCase {
    async fn perform_for_workspace(&self, app: &AppServices, session: &Session) -> UseCaseResult<Vec<&'static str>> {
        let ctx = app.context_with(app.now(), EventSource::System);
        app.in_uow(session, &ctx, |cx| Ok(backfill_workspace(cx.scope, cx.workspace())?))
            .await
    }
}
