//! Workspace bootstrap, backfill and feature-flag changes.
//!
//! # Responsibility
//! - Create every trunk a workspace needs, plus its root project and default stream.
//! - Recreate trunks missing from older workspaces.
//! - Route feature-flag edits through the dependency controls.
//!
//! # Invariants
//! - Every trunk exists exactly once per workspace after `init_workspace`.
//! - `backfill_workspace` never duplicates an existing trunk.
//! - A workspace with schedule enabled always ends with a user-owned stream.

use crate::model::big_plan::BigPlanCollection;
use crate::model::chore::ChoreCollection;
use crate::model::doc::DocCollection;
use crate::model::framework::{Entity, EntityId, EntityName, TrunkEntity};
use crate::model::gamification::ScoreLog;
use crate::model::habit::HabitCollection;
use crate::model::home::HomeConfig;
use crate::model::inbox_task::InboxTaskCollection;
use crate::model::journal::JournalCollection;
use crate::model::metric::MetricCollection;
use crate::model::note::NoteCollection;
use crate::model::person::PersonCollection;
use crate::model::project::{Project, ProjectCollection};
use crate::model::push_integration::{
    EmailTaskCollection, PushIntegrationGroup, SlackTaskCollection,
};
use crate::model::run_log::{GcLog, GenLog};
use crate::model::schedule::{ScheduleDomain, ScheduleExternalSyncLog, ScheduleStream};
use crate::model::smart_list::SmartListCollection;
use crate::model::time_event::TimeEventDomain;
use crate::model::time_plan::TimePlanDomain;
use crate::model::user::User;
use crate::model::vacation::VacationCollection;
use crate::model::values::{
    ScheduleSource, ScheduleStreamColor, UserFeature, UserFeatureFlagsControls, WorkspaceFeature,
    WorkspaceFeatureFlagsControls,
};
use crate::model::working_mem::WorkingMemCollection;
use crate::model::workspace::Workspace;
use crate::repo::{EntityRepository, RefFilter, TrunkEntityRepository};
use crate::service::{ServiceScope, ServiceResult};
use log::info;
use std::collections::BTreeMap;

pub const DEFAULT_STREAM_NAME: &str = "Personal";

/// Ids handed back by a fresh workspace bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceInitResult {
    pub root_project_ref_id: EntityId,
    pub default_schedule_stream_ref_id: Option<EntityId>,
    pub score_log_ref_id: EntityId,
}

/// Creates every trunk of a freshly created workspace.
pub fn init_workspace(
    scope: ServiceScope<'_, '_>,
    user: &User,
    workspace: &Workspace,
    root_project_name: EntityName,
) -> ServiceResult<WorkspaceInitResult> {
    let workspace_ref_id = workspace.ref_id();
    let project_collection = create_trunk(scope, ProjectCollection::new(scope.ctx, workspace_ref_id))?;
    let root_project = scope.uow.get_for::<Project>().create(Project::new_root_project(
        scope.ctx,
        project_collection.ref_id(),
        root_project_name,
    ))?;
    scope.reporter.mark_created(&root_project);

    create_missing_trunks(scope, workspace_ref_id, root_project.ref_id())?;
    let default_stream = ensure_user_stream(scope, workspace)?;
    let score_log = ensure_score_log(scope, user.ref_id())?;

    info!(
        "event=workspace_init module=service status=ok workspace_id={} root_project_id={}",
        workspace_ref_id,
        root_project.ref_id()
    );
    Ok(WorkspaceInitResult {
        root_project_ref_id: root_project.ref_id(),
        default_schedule_stream_ref_id: default_stream,
        score_log_ref_id: score_log,
    })
}

/// Creates any trunk missing from an existing workspace.
///
/// Returns the kinds that were created.
pub fn backfill_workspace(
    scope: ServiceScope<'_, '_>,
    workspace: &Workspace,
) -> ServiceResult<Vec<&'static str>> {
    let workspace_ref_id = workspace.ref_id();
    let mut created = Vec::new();
    let project_collection = match scope
        .uow
        .get_for::<ProjectCollection>()
        .load_by_parent_optional(workspace_ref_id)?
    {
        Some(collection) => collection,
        None => {
            created.push(ProjectCollection::KIND);
            create_trunk(scope, ProjectCollection::new(scope.ctx, workspace_ref_id))?
        }
    };
    let root_project = root_project_of(scope, project_collection.ref_id())?;
    let root_project_ref_id = match root_project {
        Some(project) => project.ref_id(),
        None => {
            let project = scope.uow.get_for::<Project>().create(Project::new_root_project(
                scope.ctx,
                project_collection.ref_id(),
                EntityName::from_generated("Work"),
            ))?;
            scope.reporter.mark_created(&project);
            created.push(Project::KIND);
            project.ref_id()
        }
    };
    created.extend(create_missing_trunks(scope, workspace_ref_id, root_project_ref_id)?);
    if ensure_user_stream(scope, workspace)?.is_some() {
        created.push(ScheduleStream::KIND);
    }
    if !created.is_empty() {
        info!(
            "event=workspace_backfill module=service status=ok workspace_id={} created={}",
            workspace_ref_id,
            created.len()
        );
    }
    Ok(created)
}

/// Applies feature-flag edits to a workspace.
pub fn change_workspace_feature_flags(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    changes: &BTreeMap<WorkspaceFeature, bool>,
) -> ServiceResult<Workspace> {
    let repo = scope.uow.get_for::<Workspace>();
    let workspace = repo.load_by_id(workspace_ref_id, false)?;
    let next = WorkspaceFeatureFlagsControls.apply(&workspace.feature_flags, changes)?;
    let workspace = repo.save(workspace.change_feature_flags(scope.ctx, next))?;
    scope.reporter.mark_updated(&workspace);
    ensure_user_stream(scope, &workspace)?;
    Ok(workspace)
}

pub fn change_user_feature_flags(
    scope: ServiceScope<'_, '_>,
    user_ref_id: EntityId,
    changes: &BTreeMap<UserFeature, bool>,
) -> ServiceResult<User> {
    let repo = scope.uow.get_for::<User>();
    let user = repo.load_by_id(user_ref_id, false)?;
    let next = UserFeatureFlagsControls.apply(&user.feature_flags, changes)?;
    let user = repo.save(user.change_feature_flags(scope.ctx, next))?;
    scope.reporter.mark_updated(&user);
    if user.feature_flags.is_enabled(UserFeature::Gamification) {
        ensure_score_log(scope, user.ref_id())?;
    }
    Ok(user)
}

/// The root project of a workspace.
pub fn load_root_project(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
) -> ServiceResult<Project> {
    let collection = scope
        .uow
        .get_for::<ProjectCollection>()
        .load_by_parent(workspace_ref_id)?;
    root_project_of(scope, collection.ref_id())?.ok_or_else(|| {
        crate::service::ServiceError::invariant(format!(
            "workspace {workspace_ref_id} has no root project"
        ))
    })
}

fn root_project_of(
    scope: ServiceScope<'_, '_>,
    project_collection_ref_id: EntityId,
) -> ServiceResult<Option<Project>> {
    Ok(scope
        .uow
        .get_for::<Project>()
        .find_all(project_collection_ref_id, true, None)?
        .into_iter()
        .find(Project::is_root))
}

fn create_trunk<T: TrunkEntity>(scope: ServiceScope<'_, '_>, trunk: T) -> ServiceResult<T> {
    let trunk = scope.uow.get_for::<T>().create(trunk)?;
    scope.reporter.mark_created(&trunk);
    Ok(trunk)
}

/// Creates `trunk()` unless `T` already exists under `parent_ref_id`.
fn ensure_trunk<T: TrunkEntity>(
    scope: ServiceScope<'_, '_>,
    parent_ref_id: EntityId,
    trunk: impl FnOnce() -> T,
    created: &mut Vec<&'static str>,
) -> ServiceResult<T> {
    if let Some(existing) = scope.uow.get_for::<T>().load_by_parent_optional(parent_ref_id)? {
        return Ok(existing);
    }
    created.push(T::KIND);
    create_trunk(scope, trunk())
}

fn create_missing_trunks(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    root_project_ref_id: EntityId,
) -> ServiceResult<Vec<&'static str>> {
    let ctx = scope.ctx;
    let ws = workspace_ref_id;
    let project = root_project_ref_id;
    let mut created = Vec::new();
    let c = &mut created;

    ensure_trunk(scope, ws, || InboxTaskCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || BigPlanCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || HabitCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || ChoreCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || MetricCollection::new(ctx, ws, project), c)?;
    ensure_trunk(scope, ws, || PersonCollection::new(ctx, ws, project), c)?;
    ensure_trunk(scope, ws, || SmartListCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || VacationCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || DocCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || JournalCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || NoteCollection::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || ScheduleDomain::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || ScheduleExternalSyncLog::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || TimeEventDomain::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || TimePlanDomain::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || WorkingMemCollection::new(ctx, ws, project), c)?;
    let group = ensure_trunk(scope, ws, || PushIntegrationGroup::new(ctx, ws), c)?;
    let group_ref_id = group.ref_id();
    ensure_trunk(scope, group_ref_id, || SlackTaskCollection::new(ctx, group_ref_id, project), c)?;
    ensure_trunk(scope, group_ref_id, || EmailTaskCollection::new(ctx, group_ref_id, project), c)?;
    ensure_trunk(scope, ws, || HomeConfig::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || GenLog::new(ctx, ws), c)?;
    ensure_trunk(scope, ws, || GcLog::new(ctx, ws), c)?;
    Ok(created)
}

/// Creates the default user stream when schedule is on and none is live.
///
/// Returns the id of a newly created stream.
fn ensure_user_stream(
    scope: ServiceScope<'_, '_>,
    workspace: &Workspace,
) -> ServiceResult<Option<EntityId>> {
    if !workspace.is_feature_available(WorkspaceFeature::Schedule) {
        return Ok(None);
    }
    let Some(domain) = scope
        .uow
        .get_for::<ScheduleDomain>()
        .load_by_parent_optional(workspace.ref_id())?
    else {
        return Ok(None);
    };
    let repo = scope.uow.get_for::<ScheduleStream>();
    let user_streams = repo.find_all_generic(
        Some(domain.ref_id()),
        false,
        &[RefFilter::eq("source", ScheduleSource::User)],
    )?;
    if !user_streams.is_empty() {
        return Ok(None);
    }
    let stream = repo.create(ScheduleStream::new_for_user(
        scope.ctx,
        domain.ref_id(),
        EntityName::from_generated(DEFAULT_STREAM_NAME),
        ScheduleStreamColor::Blue,
    ))?;
    scope.reporter.mark_created(&stream);
    Ok(Some(stream.ref_id()))
}

fn ensure_score_log(scope: ServiceScope<'_, '_>, user_ref_id: EntityId) -> ServiceResult<EntityId> {
    let repo = scope.uow.get_for::<ScoreLog>();
    if let Some(existing) = repo.load_by_parent_optional(user_ref_id)? {
        return Ok(existing.ref_id());
    }
    let log = repo.create(ScoreLog::new(scope.ctx, user_ref_id))?;
    scope.reporter.mark_created(&log);
    Ok(log.ref_id())
}

#[cfg(test)]
mod tests {
    use super::{backfill_workspace, change_workspace_feature_flags, init_workspace};
    use crate::model::framework::Entity;
    use crate::model::home::HomeConfig;
    use crate::model::schedule::{ScheduleDomain, ScheduleStream};
    use crate::model::user::User;
    use crate::model::values::{
        Timezone, UserFeatureFlags, WorkspaceFeature, WorkspaceFeatureFlags,
    };
    use crate::model::workspace::Workspace;
    use crate::repo::{EntityRepository, TrunkEntityRepository};
    use crate::service::test_support::{ctx_at, domain_conn, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};
    use std::collections::BTreeMap;

    #[test]
    fn init_creates_every_trunk_once() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);

        let user = uow
            .get_for::<User>()
            .create(User::new_user(
                &ctx,
                "a@b.c".parse().expect("email"),
                "Alex".parse().expect("name"),
                Timezone::utc(),
                UserFeatureFlags::default(),
            ))
            .expect("user");
        let workspace = uow
            .get_for::<Workspace>()
            .create(Workspace::new_workspace(
                &ctx,
                "Home".parse().expect("name"),
                WorkspaceFeatureFlags::default(),
            ))
            .expect("workspace");

        let result = init_workspace(scope, &user, &workspace, "Life".parse().expect("name"))
            .expect("init");
        assert!(result.default_schedule_stream_ref_id.is_some());
        assert!(uow
            .get_for::<HomeConfig>()
            .load_by_parent_optional(workspace.ref_id())
            .expect("query")
            .is_some());

        let created = backfill_workspace(scope, &workspace).expect("backfill");
        assert!(created.is_empty(), "unexpected backfill of {created:?}");
    }

    #[test]
    fn reenabling_schedule_keeps_a_user_stream() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let flags = WorkspaceFeatureFlags::default()
            .with(WorkspaceFeature::Schedule, false)
            .with(WorkspaceFeature::TimePlans, false);
        let workspace = uow
            .get_for::<Workspace>()
            .create(Workspace::new_workspace(&ctx, "Home".parse().expect("name"), flags))
            .expect("workspace");
        let user = uow
            .get_for::<User>()
            .create(User::new_user(
                &ctx,
                "b@b.c".parse().expect("email"),
                "Bo".parse().expect("name"),
                Timezone::utc(),
                UserFeatureFlags::default(),
            ))
            .expect("user");
        let result = init_workspace(scope, &user, &workspace, "Life".parse().expect("name"))
            .expect("init");
        assert!(result.default_schedule_stream_ref_id.is_none());

        let changes = BTreeMap::from([(WorkspaceFeature::Schedule, true)]);
        change_workspace_feature_flags(scope, workspace.ref_id(), &changes).expect("enable");
        let domain = uow
            .get_for::<ScheduleDomain>()
            .load_by_parent(workspace.ref_id())
            .expect("domain");
        let streams = uow
            .get_for::<ScheduleStream>()
            .find_all(domain.ref_id(), false, None)
            .expect("streams");
        assert_eq!(streams.len(), 1);
    }
}
