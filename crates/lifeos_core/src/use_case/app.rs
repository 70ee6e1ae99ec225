//! Composition root and the runners every invocation goes through.
//!
//! # Responsibility
//! - Build the engines, clock, codecs, catalog and token stamper once.
//! - Resolve the session, enforce gates, open the unit of work, publish
//!   search changes and write the audit row for each invocation.
//!
//! # Invariants
//! - No unit of work opens before every gate has passed.
//! - The session is read from a rolled-back snapshot.
//! - Audit and search failures are logged, never returned to the caller.

use crate::auth::{AuthError, AuthToken, AuthTokenKind, AuthTokenStamper};
use crate::config::{ConfigError, CoreConfig};
use crate::db::DbError;
use crate::logging::{init_logging, LoggingError};
use crate::model::framework::{
    ADate, DomainContext, Entity, EntityId, EventSource, RealmCodecError, RealmCodecRegistry,
    Timestamp,
};
use crate::model::user::{User, UserWorkspaceLink};
use crate::model::values::standard_registry;
use crate::model::workspace::Workspace;
use crate::repo::{DomainStorageEngine, DomainUnitOfWork, EntityRepository};
use crate::search::SearchStorageEngine;
use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};
use crate::sync::{CalendarFetcher, CalendarSyncError, HttpCalendarFetcher};
use crate::time::{SystemTimeProvider, TimeProvider};
use crate::use_case::audit::{
    AuditError, InvocationResult, MutationUseCaseInvocationRecord, UseCaseStorageEngine,
};
use crate::use_case::descriptor::{
    BackgroundMutation, ClientApp, GuestMutation, GuestReadonly, LoggedInAsync, LoggedInMutation,
    LoggedInReadonly, UseCaseDescriptor,
};
use crate::use_case::{UseCaseError, UseCaseResult};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Codecs(#[from] RealmCodecError),
    #[error(transparent)]
    Fetcher(#[from] CalendarSyncError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
}

/// The resolved user and workspace of an authenticated call.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub workspace: Workspace,
}

impl Session {
    pub fn user_ref_id(&self) -> EntityId {
        self.user.ref_id()
    }

    pub fn workspace_ref_id(&self) -> EntityId {
        self.workspace.ref_id()
    }

    pub fn subject(&self) -> AuditSubject {
        AuditSubject {
            user_ref_id: self.user_ref_id(),
            workspace_ref_id: self.workspace_ref_id(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditSubject {
    pub user_ref_id: EntityId,
    pub workspace_ref_id: EntityId,
}

/// What a logged-in use case sees while its unit of work is open.
#[derive(Clone, Copy)]
pub struct LoggedInCx<'a, 'conn> {
    pub scope: ServiceScope<'a, 'conn>,
    pub session: &'a Session,
    pub config: &'a CoreConfig,
    pub stamper: &'a AuthTokenStamper,
}

impl LoggedInCx<'_, '_> {
    pub fn user(&self) -> &User {
        &self.session.user
    }

    pub fn workspace(&self) -> &Workspace {
        &self.session.workspace
    }

    pub fn workspace_ref_id(&self) -> EntityId {
        self.session.workspace_ref_id()
    }

    pub fn now(&self) -> Timestamp {
        self.scope.ctx.action_timestamp
    }

    /// Calendar day of the invocation, in UTC.
    pub fn today(&self) -> ADate {
        self.now().date()
    }
}

/// What a guest use case sees; `session` is set when a valid token came along.
#[derive(Clone, Copy)]
pub struct GuestCx<'a, 'conn> {
    pub scope: ServiceScope<'a, 'conn>,
    pub session: Option<&'a Session>,
    pub config: &'a CoreConfig,
    pub stamper: &'a AuthTokenStamper,
}

impl GuestCx<'_, '_> {
    pub fn now(&self) -> Timestamp {
        self.scope.ctx.action_timestamp
    }
}

/// Per-run tally of a background use case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackgroundRun {
    pub workspaces: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct AppServices {
    config: CoreConfig,
    app: ClientApp,
    time: Arc<dyn TimeProvider>,
    codecs: Arc<RealmCodecRegistry>,
    catalog: EntityCatalog,
    stamper: AuthTokenStamper,
    domain: DomainStorageEngine,
    search: SearchStorageEngine,
    audit: UseCaseStorageEngine,
    fetcher: Box<dyn CalendarFetcher>,
}

impl AppServices {
    /// Production wiring: file logging when `log_dir` is set, system clock and HTTP calendar fetching.
    pub fn build(config: CoreConfig, app: ClientApp) -> Result<Self, AppBuildError> {
        if let Some(dir) = &config.log_dir {
            init_logging(&config.log_level, &dir.to_string_lossy())?;
        }
        let fetcher = HttpCalendarFetcher::new(Duration::from_secs(config.sync.fetch_timeout_secs))?;
        Self::with_parts(config, app, Arc::new(SystemTimeProvider), Box::new(fetcher))
    }

    pub fn with_parts(
        config: CoreConfig,
        app: ClientApp,
        time: Arc<dyn TimeProvider>,
        fetcher: Box<dyn CalendarFetcher>,
    ) -> Result<Self, AppBuildError> {
        let config = config.validated()?;
        let codecs = Arc::new(standard_registry()?);
        let catalog = EntityCatalog::standard();
        let stamper = AuthTokenStamper::new(&config.auth_token_secret, config.auth_token_ttl_days);
        let domain = DomainStorageEngine::open(config.domain_db.as_deref())?;
        let search = SearchStorageEngine::open(config.search_db.as_deref())?;
        let audit = UseCaseStorageEngine::open(config.use_case_db.as_deref())?;
        info!(
            "event=app_build module=use_case status=ok env={} app={} entity_kinds={}",
            config.env,
            app,
            catalog.len()
        );
        Ok(Self {
            config,
            app,
            time,
            codecs,
            catalog,
            stamper,
            domain,
            search,
            audit,
            fetcher,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn client_app(&self) -> ClientApp {
        self.app
    }

    pub fn now(&self) -> Timestamp {
        self.time.now()
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn stamper(&self) -> &AuthTokenStamper {
        &self.stamper
    }

    pub fn domain(&self) -> &DomainStorageEngine {
        &self.domain
    }

    pub fn search(&self) -> &SearchStorageEngine {
        &self.search
    }

    pub fn audit(&self) -> &UseCaseStorageEngine {
        &self.audit
    }

    pub fn fetcher(&self) -> &dyn CalendarFetcher {
        self.fetcher.as_ref()
    }

    /// Domain context stamped with the client app as source.
    pub fn context(&self, now: Timestamp) -> DomainContext {
        self.context_with(now, self.app.event_source())
    }

    pub fn context_with(&self, now: Timestamp, source: EventSource) -> DomainContext {
        DomainContext::new(source, now, Arc::clone(&self.codecs))
    }

    /// Opens one unit of work for `session` and publishes its changes after commit.
    pub async fn in_uow<T>(
        &self,
        session: &Session,
        ctx: &DomainContext,
        work: impl FnOnce(&LoggedInCx<'_, '_>) -> UseCaseResult<T>,
    ) -> UseCaseResult<T> {
        let reporter = ProgressReporter::new();
        let value = self
            .domain
            .with_uow(|uow| work(&self.logged_in_cx(uow, ctx, &reporter, session)))
            .await?;
        self.publish(session.workspace_ref_id(), &reporter).await;
        Ok(value)
    }

    /// Read-only counterpart of `in_uow`; nothing persists or publishes.
    pub async fn in_snapshot<T>(
        &self,
        session: &Session,
        ctx: &DomainContext,
        work: impl FnOnce(&LoggedInCx<'_, '_>) -> UseCaseResult<T>,
    ) -> UseCaseResult<T> {
        let reporter = ProgressReporter::new();
        self.domain
            .with_snapshot(|uow| work(&self.logged_in_cx(uow, ctx, &reporter, session)))
            .await
    }

    fn logged_in_cx<'a, 'conn>(
        &'a self,
        uow: &'a DomainUnitOfWork<'conn>,
        ctx: &'a DomainContext,
        reporter: &'a ProgressReporter,
        session: &'a Session,
    ) -> LoggedInCx<'a, 'conn> {
        LoggedInCx {
            scope: ServiceScope::new(uow, ctx, &self.catalog, reporter),
            session,
            config: &self.config,
            stamper: &self.stamper,
        }
    }

    pub async fn execute_mutation<U: LoggedInMutation>(
        &self,
        use_case: &U,
        token: &AuthToken,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let started_at = Instant::now();
        let now = self.now();
        let descriptor = &U::DESCRIPTOR;
        let encoded = audit_args(descriptor, &args);
        let session = match self.gated_session(descriptor, token, now).await {
            Ok(session) => session,
            Err((subject, err)) => {
                self.finish(descriptor, subject, now, encoded, started_at, Err(&err)).await;
                return Err(err);
            }
        };
        let ctx = self.context(now);
        let reporter = ProgressReporter::new();
        let outcome = self
            .domain
            .with_uow(|uow| use_case.perform(&self.logged_in_cx(uow, &ctx, &reporter, &session), args))
            .await;
        if outcome.is_ok() {
            self.publish(session.workspace_ref_id(), &reporter).await;
        }
        self.finish(
            descriptor,
            Some(session.subject()),
            now,
            encoded,
            started_at,
            outcome.as_ref().map(|_| ()),
        )
        .await;
        outcome
    }

    pub async fn execute_read<U: LoggedInReadonly>(
        &self,
        use_case: &U,
        token: &AuthToken,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let started_at = Instant::now();
        let now = self.now();
        let descriptor = &U::DESCRIPTOR;
        let outcome = match self.gated_session(descriptor, token, now).await {
            Ok(session) => {
                let ctx = self.context(now);
                self.in_snapshot(&session, &ctx, |cx| use_case.perform(cx, args)).await
            }
            Err((_, err)) => Err(err),
        };
        log_outcome(descriptor, started_at, outcome.as_ref().map(|_| ()));
        outcome
    }

    /// Runs an async logged-in use case; only mutation kinds leave an audit row.
    pub async fn execute_async<U: LoggedInAsync>(
        &self,
        use_case: &U,
        token: &AuthToken,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let started_at = Instant::now();
        let now = self.now();
        let descriptor = &U::DESCRIPTOR;
        let encoded = audit_args(descriptor, &args);
        let (subject, outcome) = match self.gated_session(descriptor, token, now).await {
            Ok(session) => (
                Some(session.subject()),
                use_case.perform(self, &session, args).await,
            ),
            Err((subject, err)) => (subject, Err(err)),
        };
        self.finish(
            descriptor,
            subject,
            now,
            encoded,
            started_at,
            outcome.as_ref().map(|_| ()),
        )
        .await;
        outcome
    }

    pub async fn execute_guest_mutation<U: GuestMutation>(
        &self,
        use_case: &U,
        token: Option<&AuthToken>,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let started_at = Instant::now();
        let now = self.now();
        let descriptor = &U::DESCRIPTOR;
        let encoded = audit_args(descriptor, &args);
        if let Err(err) = descriptor.check_surface(self.app, self.config.env) {
            self.finish(descriptor, None, now, encoded, started_at, Err(&err)).await;
            return Err(err);
        }
        let session = self.guest_session(token, now).await;
        let ctx = self.context(now);
        let reporter = ProgressReporter::new();
        let outcome = self
            .domain
            .with_uow(|uow| {
                let cx = GuestCx {
                    scope: ServiceScope::new(uow, &ctx, &self.catalog, &reporter),
                    session: session.as_ref(),
                    config: &self.config,
                    stamper: &self.stamper,
                };
                use_case.perform(&cx, args)
            })
            .await;
        let subject = match &outcome {
            Ok(output) => use_case
                .audit_subject(output)
                .or_else(|| session.as_ref().map(Session::subject)),
            Err(_) => session.as_ref().map(Session::subject),
        };
        if let (Ok(_), Some(subject)) = (&outcome, subject) {
            self.publish(subject.workspace_ref_id, &reporter).await;
        }
        self.finish(
            descriptor,
            subject,
            now,
            encoded,
            started_at,
            outcome.as_ref().map(|_| ()),
        )
        .await;
        outcome
    }

    pub async fn execute_guest_read<U: GuestReadonly>(
        &self,
        use_case: &U,
        token: Option<&AuthToken>,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let started_at = Instant::now();
        let now = self.now();
        let descriptor = &U::DESCRIPTOR;
        let outcome = match descriptor.check_surface(self.app, self.config.env) {
            Ok(()) => {
                let session = self.guest_session(token, now).await;
                let ctx = self.context(now);
                let reporter = ProgressReporter::new();
                self.domain
                    .with_snapshot(|uow| {
                        let cx = GuestCx {
                            scope: ServiceScope::new(uow, &ctx, &self.catalog, &reporter),
                            session: session.as_ref(),
                            config: &self.config,
                            stamper: &self.stamper,
                        };
                        use_case.perform(&cx, args)
                    })
                    .await
            }
            Err(err) => Err(err),
        };
        log_outcome(descriptor, started_at, outcome.as_ref().map(|_| ()));
        outcome
    }

    /// Applies a background use case to every workspace, one after the other.
    ///
    /// Workspaces lacking a required feature are skipped; a failing workspace
    /// is logged and counted without stopping the run.
    pub async fn execute_background<U: BackgroundMutation>(&self, use_case: &U) -> UseCaseResult<BackgroundRun> {
        let run_started_at = Instant::now();
        let descriptor = &U::DESCRIPTOR;
        descriptor.check_surface(self.app, self.config.env)?;
        let sessions = self.sessions_for_all_workspaces().await?;
        let mut run = BackgroundRun::default();
        for session in sessions {
            run.workspaces += 1;
            if descriptor.check_features(&session.workspace, &session.user).is_err() {
                run.skipped += 1;
                info!(
                    "event=use_case_workspace module=use_case status=skip name={} workspace_id={}",
                    descriptor.name,
                    session.workspace_ref_id()
                );
                continue;
            }
            let started_at = Instant::now();
            let now = self.now();
            let outcome = use_case.perform_for_workspace(self, &session).await;
            if let Err(err) = &outcome {
                run.failed += 1;
                error!(
                    "event=use_case_workspace module=use_case status=error name={} workspace_id={} error_code={}",
                    descriptor.name,
                    session.workspace_ref_id(),
                    err.code()
                );
            }
            self.finish(
                descriptor,
                Some(session.subject()),
                now,
                "null".to_string(),
                started_at,
                outcome.as_ref().map(|_| ()),
            )
            .await;
        }
        info!(
            "event=background_run module=use_case status=ok name={} workspaces={} skipped={} failed={} duration_ms={}",
            descriptor.name,
            run.workspaces,
            run.skipped,
            run.failed,
            run_started_at.elapsed().as_millis()
        );
        Ok(run)
    }

    /// Surface gates, token, session and feature gates, in that order.
    async fn gated_session(
        &self,
        descriptor: &UseCaseDescriptor,
        token: &AuthToken,
        now: Timestamp,
    ) -> Result<Session, (Option<AuditSubject>, UseCaseError)> {
        descriptor
            .check_surface(self.app, self.config.env)
            .map_err(|err| (None, err))?;
        let claims = self
            .stamper
            .verify(token, AuthTokenKind::General, now)
            .map_err(|err| (None, UseCaseError::from(err)))?;
        let session = self
            .load_session(claims.user_ref_id)
            .await
            .map_err(|err| (None, err))?;
        descriptor
            .check_features(&session.workspace, &session.user)
            .map_err(|err| (Some(session.subject()), err))?;
        Ok(session)
    }

    /// Session behind an optional token; a bad token reads as no session.
    async fn guest_session(&self, token: Option<&AuthToken>, now: Timestamp) -> Option<Session> {
        let claims = self.stamper.verify(token?, AuthTokenKind::General, now).ok()?;
        self.load_session(claims.user_ref_id).await.ok()
    }

    async fn load_session(&self, user_ref_id: EntityId) -> UseCaseResult<Session> {
        self.domain
            .with_snapshot(|uow| -> UseCaseResult<Session> {
                let user = uow
                    .get_for::<User>()
                    .load_optional(user_ref_id, false)?
                    .ok_or(UseCaseError::Authentication(AuthError::BadCredentials))?;
                let link = uow
                    .get_for::<UserWorkspaceLink>()
                    .load_by_unique_key(&UserWorkspaceLink::key_for_user(user.ref_id()))?
                    .ok_or(UseCaseError::Authentication(AuthError::BadCredentials))?;
                let workspace = uow.get_for::<Workspace>().load_by_id(link.workspace_ref_id, false)?;
                Ok(Session { user, workspace })
            })
            .await
    }

    async fn sessions_for_all_workspaces(&self) -> UseCaseResult<Vec<Session>> {
        self.domain
            .with_snapshot(|uow| -> UseCaseResult<Vec<Session>> {
                let links = uow.get_for::<UserWorkspaceLink>().find_all_generic(None, false, &[])?;
                let users = uow.get_for::<User>();
                let workspaces = uow.get_for::<Workspace>();
                let mut sessions = Vec::with_capacity(links.len());
                for link in links {
                    let user = users.load_optional(link.user_ref_id, false)?;
                    let workspace = workspaces.load_optional(link.workspace_ref_id, false)?;
                    if let (Some(user), Some(workspace)) = (user, workspace) {
                        sessions.push(Session { user, workspace });
                    }
                }
                Ok(sessions)
            })
            .await
    }

    /// Flushes committed changes to search, retrying once.
    async fn publish(&self, workspace_ref_id: EntityId, reporter: &ProgressReporter) {
        let changes = reporter.take_search_changes();
        if changes.is_empty() {
            return;
        }
        let Err(first) = self.search.apply(workspace_ref_id, &changes).await else {
            return;
        };
        warn!(
            "event=search_publish module=use_case status=retry workspace_id={} changes={} error={}",
            workspace_ref_id,
            changes.len(),
            first
        );
        if let Err(err) = self.search.apply(workspace_ref_id, &changes).await {
            warn!(
                "event=search_publish module=use_case status=error workspace_id={} changes={} error={}",
                workspace_ref_id,
                changes.len(),
                err
            );
        }
    }

    async fn finish(
        &self,
        descriptor: &UseCaseDescriptor,
        subject: Option<AuditSubject>,
        at: Timestamp,
        args: String,
        started_at: Instant,
        outcome: Result<(), &UseCaseError>,
    ) {
        if descriptor.kind.is_mutation() {
            let record = MutationUseCaseInvocationRecord {
                user_ref_id: subject.map(|subject| subject.user_ref_id),
                workspace_ref_id: subject.map(|subject| subject.workspace_ref_id),
                timestamp: at,
                name: descriptor.name.to_string(),
                args,
                result: match outcome {
                    Ok(()) => InvocationResult::Success,
                    Err(_) => InvocationResult::Failure,
                },
                error_str: outcome.err().map(ToString::to_string),
            };
            if let Err(err) = self.audit.record(&record).await {
                error!(
                    "event=audit_record module=use_case status=error name={} error={}",
                    descriptor.name, err
                );
            }
        }
        log_outcome(descriptor, started_at, outcome);
    }
}

fn audit_args<A: Serialize>(descriptor: &UseCaseDescriptor, args: &A) -> String {
    match serde_json::to_string(args) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(
                "event=audit_args module=use_case status=error name={} error={}",
                descriptor.name, err
            );
            serde_json::json!({ "unencodable_args": descriptor.name }).to_string()
        }
    }
}

fn log_outcome(descriptor: &UseCaseDescriptor, started_at: Instant, outcome: Result<(), &UseCaseError>) {
    let duration_ms = started_at.elapsed().as_millis();
    match outcome {
        Ok(()) => info!(
            "event=use_case module=use_case status=ok name={} kind={} duration_ms={}",
            descriptor.name,
            descriptor.kind.as_str(),
            duration_ms
        ),
        Err(err) if err.is_input_class() || err.code() == "feature_unavailable" => warn!(
            "event=use_case module=use_case status=error name={} kind={} error_code={} duration_ms={}",
            descriptor.name,
            descriptor.kind.as_str(),
            err.code(),
            duration_ms
        ),
        Err(err) => error!(
            "event=use_case module=use_case status=error name={} kind={} error_code={} duration_ms={}",
            descriptor.name,
            descriptor.kind.as_str(),
            err.code(),
            duration_ms
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::audit_args;
    use crate::use_case::descriptor::UseCaseDescriptor;
    use std::collections::BTreeMap;

    #[test]
    fn unencodable_args_leave_a_marker_in_the_audit_row() {
        let descriptor = UseCaseDescriptor::mutation("habit_create");
        let args = BTreeMap::from([(vec![1u8, 2], "value")]);
        assert_eq!(audit_args(&descriptor, &args), r#"{"unencodable_args":"habit_create"}"#);
        assert_eq!(audit_args(&descriptor, &vec![1, 2]), "[1,2]");
    }
}
