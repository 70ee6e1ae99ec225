//! Ad-hoc runs of the engines: generation, GC, reports, scores, search and sync.

use crate::model::framework::{ADate, DomainContext};
use crate::model::report::ReportPeriodResult;
use crate::model::run_log::{GcLogEntry, GenLogEntry};
use crate::model::schedule::ScheduleExternalSyncLogEntry;
use crate::model::values::{UserFeature, WorkspaceFeature};
use crate::search::{SearchHit, SearchQuery};
use crate::service::gc_service::{run_gc, GcRequest};
use crate::service::gen_service::{run_generation, GenRequest};
use crate::service::report_service::{run_report, ReportRequest};
use crate::service::score_service::{load_overview, ScoreOverview};
use crate::sync::{apply_external_sync, fetch_feeds, streams_to_sync, SyncRequest};
use crate::use_case::app::{AppServices, LoggedInCx, Session};
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoggedInAsync, LoggedInMutation, LoggedInReadonly, UseCaseDescriptor, UseCaseError, UseCaseResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const MAX_SEARCH_LIMIT: u32 = 100;

use_case! {
    /// Generates recurring work for the caller's workspace.
    GenDoUseCase: GenRequest => GenLogEntry,
    UseCaseDescriptor::mutation("gen_do")
}

impl LoggedInMutation for GenDoUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: GenRequest) -> UseCaseResult<GenLogEntry> {
        Ok(run_generation(cx.scope, cx.workspace_ref_id(), &args)?)
    }
}

use_case! {
    GcDoUseCase: GcRequest => GcLogEntry,
    UseCaseDescriptor::mutation("gc_do")
}

impl LoggedInMutation for GcDoUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: GcRequest) -> UseCaseResult<GcLogEntry> {
        Ok(run_gc(cx.scope, &cx.config.gc, cx.workspace_ref_id(), &args)?)
    }
}

use_case! {
    ReportUseCase: ReportRequest => ReportPeriodResult,
    UseCaseDescriptor::readonly("report")
}

impl LoggedInReadonly for ReportUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ReportRequest) -> UseCaseResult<ReportPeriodResult> {
        Ok(run_report(cx.scope, cx.workspace_ref_id(), &args)?)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GetScoresArgs {
    /// Defaults to the day of the call.
    #[serde(default)]
    pub today: Option<ADate>,
}

use_case! {
    GetScoresUseCase: GetScoresArgs => ScoreOverview,
    UseCaseDescriptor::readonly("get_scores").requires_user(&[UserFeature::Gamification])
}

impl LoggedInReadonly for GetScoresUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: GetScoresArgs) -> UseCaseResult<ScoreOverview> {
        let today = args.today.unwrap_or_else(|| cx.today());
        Ok(load_overview(cx.scope, cx.user().header.ref_id, today)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub entity_kinds: Vec<String>,
    #[serde(default)]
    pub include_archived: bool,
}

impl SearchArgs {
    fn to_query(&self) -> UseCaseResult<SearchQuery> {
        let mut query = SearchQuery::new(self.query.clone());
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_SEARCH_LIMIT {
                return Err(UseCaseError::invalid(format!(
                    "search limit must be between 1 and {MAX_SEARCH_LIMIT}"
                )));
            }
            query.limit = limit;
        }
        query.entity_kinds = self.entity_kinds.clone();
        query.include_archived = self.include_archived;
        Ok(query)
    }
}

use_case! {
    /// Full-text search over the caller's workspace.
    SearchUseCase: SearchArgs => Vec<SearchHit>,
    UseCaseDescriptor::readonly("search")
}

#[async_trait(?Send)]
impl LoggedInAsync for SearchUseCase {
    async fn perform(&self, app: &AppServices, session: &Session, args: SearchArgs) -> UseCaseResult<Vec<SearchHit>> {
        let query = args.to_query()?;
        Ok(app.search().search(session.workspace_ref_id(), &query).await?)
    }
}

/// Reads the streams in a snapshot, fetches outside any unit of work, then applies.
pub(crate) async fn run_external_sync(
    app: &AppServices,
    session: &Session,
    ctx: &DomainContext,
    request: &SyncRequest,
) -> UseCaseResult<ScheduleExternalSyncLogEntry> {
    let workspace_ref_id = session.workspace_ref_id();
    let streams = app
        .in_snapshot(session, ctx, |cx| Ok(streams_to_sync(cx.scope, workspace_ref_id, request)?))
        .await?;
    let feeds = fetch_feeds(app.fetcher(), &streams).await;
    app.in_uow(session, ctx, |cx| {
        Ok(apply_external_sync(cx.scope, workspace_ref_id, request, feeds)?)
    })
    .await
}

use_case! {
    ScheduleExternalSyncDoUseCase: SyncRequest => ScheduleExternalSyncLogEntry,
    UseCaseDescriptor::mutation("schedule_external_sync_do").requires(&[WorkspaceFeature::Schedule])
}

#[async_trait(?Send)]
impl LoggedInAsync for ScheduleExternalSyncDoUseCase {
    async fn perform(
        &self,
        app: &AppServices,
        session: &Session,
        args: SyncRequest,
    ) -> UseCaseResult<ScheduleExternalSyncLogEntry> {
        let ctx = app.context(app.now());
        run_external_sync(app, session, &ctx, &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::SearchArgs;

    fn args(limit: Option<u32>) -> SearchArgs {
        SearchArgs {
            query: "launch".to_string(),
            limit,
            entity_kinds: vec!["big_plan".to_string()],
            include_archived: true,
        }
    }

    #[test]
    fn search_args_carry_filters_into_the_query() {
        let query = args(Some(5)).to_query().expect("query");
        assert_eq!(query.limit, 5);
        assert_eq!(query.entity_kinds, vec!["big_plan".to_string()]);
        assert!(query.include_archived);
        assert_eq!(args(None).to_query().expect("query").limit, 20);
    }

    #[test]
    fn search_limit_out_of_range_is_rejected() {
        let err = args(Some(0)).to_query().expect_err("zero limit");
        assert_eq!(err.code(), "input_validation");
        assert!(args(Some(101)).to_query().is_err());
        assert!(args(Some(100)).to_query().is_ok());
    }
}
