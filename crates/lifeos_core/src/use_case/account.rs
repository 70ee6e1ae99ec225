//! Account-level use cases: password, feature flags, top-level info and teardown.

use crate::auth::{hash_password, verify_password, AuthError, AuthToken, AuthTokenKind};
use crate::config::Env;
use crate::model::framework::realm::SecretValue;
use crate::model::framework::{Entity, EntityName, Timestamp, UpdateAction};
use crate::model::gamification::ScoreLog;
use crate::model::project::Project;
use crate::model::user::{AuthRecord, User, UserWorkspaceLink};
use crate::model::values::{
    PasswordNewPlain, PasswordPlain, Timezone, UserFeature, WorkspaceFeature,
};
use crate::model::workspace::Workspace;
use crate::repo::{EntityRepository, TrunkEntityRepository};
use crate::service::traversal::{generic_children_destroyer, generic_destroyer};
use crate::service::workspace_service::{
    change_user_feature_flags, change_workspace_feature_flags, init_workspace, load_root_project,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoggedInMutation, LoggedInReadonly, UseCaseDescriptor, UseCaseError, UseCaseResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordArgs {
    pub current_password: PasswordPlain,
    pub new_password: PasswordNewPlain,
    pub new_password_repeat: PasswordNewPlain,
}

use_case! {
    ChangePasswordUseCase: ChangePasswordArgs => (),
    UseCaseDescriptor::mutation("change_password")
}

impl LoggedInMutation for ChangePasswordUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ChangePasswordArgs) -> UseCaseResult<()> {
        if args.new_password.reveal() != args.new_password_repeat.reveal() {
            return Err(UseCaseError::invalid("passwords do not match"));
        }
        let auth: AuthRecord = cx.scope.trunk(cx.user().ref_id())?;
        if !verify_password(&args.current_password, &auth.password_hash)? {
            return Err(UseCaseError::Authentication(AuthError::BadCredentials));
        }
        let auth = auth.change_password(cx.scope.ctx, hash_password(&args.new_password.as_plain())?);
        let auth = cx.scope.uow.get_for::<AuthRecord>().save(auth)?;
        cx.scope.reporter.mark_updated(&auth);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdateArgs {
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub timezone: UpdateAction<Timezone>,
}

use_case! {
    UserUpdateUseCase: UserUpdateArgs => User,
    UseCaseDescriptor::mutation("user_update")
}

impl LoggedInMutation for UserUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: UserUpdateArgs) -> UseCaseResult<User> {
        let user = cx.user().clone().update(cx.scope.ctx, args.name, args.timezone);
        let user = cx.scope.uow.get_for::<User>().save(user)?;
        cx.scope.reporter.mark_updated(&user);
        Ok(user)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceUpdateArgs {
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
}

use_case! {
    WorkspaceUpdateUseCase: WorkspaceUpdateArgs => Workspace,
    UseCaseDescriptor::mutation("workspace_update")
}

impl LoggedInMutation for WorkspaceUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: WorkspaceUpdateArgs) -> UseCaseResult<Workspace> {
        let workspace = cx.workspace().clone().update(cx.scope.ctx, args.name);
        let workspace = cx.scope.uow.get_for::<Workspace>().save(workspace)?;
        cx.scope.reporter.mark_updated(&workspace);
        Ok(workspace)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceChangeFeatureFlagsArgs {
    pub feature_flags: BTreeMap<WorkspaceFeature, bool>,
}

use_case! {
    WorkspaceChangeFeatureFlagsUseCase: WorkspaceChangeFeatureFlagsArgs => Workspace,
    UseCaseDescriptor::mutation("workspace_change_feature_flags")
}

impl LoggedInMutation for WorkspaceChangeFeatureFlagsUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: WorkspaceChangeFeatureFlagsArgs) -> UseCaseResult<Workspace> {
        Ok(change_workspace_feature_flags(
            cx.scope,
            cx.workspace_ref_id(),
            &args.feature_flags,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserChangeFeatureFlagsArgs {
    pub feature_flags: BTreeMap<UserFeature, bool>,
}

use_case! {
    UserChangeFeatureFlagsUseCase: UserChangeFeatureFlagsArgs => User,
    UseCaseDescriptor::mutation("user_change_feature_flags")
}

impl LoggedInMutation for UserChangeFeatureFlagsUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: UserChangeFeatureFlagsArgs) -> UseCaseResult<User> {
        Ok(change_user_feature_flags(cx.scope, cx.user().ref_id(), &args.feature_flags)?)
    }
}

#[derive(Debug, Clone)]
pub struct TopLevelInfo {
    pub user: User,
    pub workspace: Workspace,
    pub enabled_features: Vec<WorkspaceFeature>,
    pub root_project: Project,
    /// Lets a live UI channel subscribe to progress for this user.
    pub progress_reporter_token: AuthToken,
    pub progress_reporter_token_issued_at: Timestamp,
}

use_case! {
    LoadTopLevelInfoUseCase: () => TopLevelInfo,
    UseCaseDescriptor::readonly("load_top_level_info")
}

impl LoggedInReadonly for LoadTopLevelInfoUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, _args: ()) -> UseCaseResult<TopLevelInfo> {
        let root_project = load_root_project(cx.scope, cx.workspace_ref_id())?;
        let progress_reporter_token =
            cx.stamper
                .stamp(AuthTokenKind::ProgressReporter, cx.user().ref_id(), cx.now())?;
        Ok(TopLevelInfo {
            user: cx.user().clone(),
            workspace: cx.workspace().clone(),
            enabled_features: cx.workspace().feature_flags.enabled(),
            root_project,
            progress_reporter_token,
            progress_reporter_token_issued_at: cx.now(),
        })
    }
}

use_case! {
    /// Destroys the workspace, the link and the user with everything they own.
    CloseAccountUseCase: () => usize,
    UseCaseDescriptor::mutation("close_account")
}

impl LoggedInMutation for CloseAccountUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, _args: ()) -> UseCaseResult<usize> {
        let scope = cx.scope;
        let user_ref_id = cx.user().ref_id();
        let mut removed = generic_destroyer(
            scope.uow,
            scope.catalog,
            Workspace::KIND,
            cx.workspace_ref_id(),
            scope.reporter,
        )?;
        if let Some(link) = scope
            .uow
            .get_for::<UserWorkspaceLink>()
            .load_by_unique_key(&UserWorkspaceLink::key_for_user(user_ref_id))?
        {
            removed += generic_destroyer(
                scope.uow,
                scope.catalog,
                UserWorkspaceLink::KIND,
                link.ref_id(),
                scope.reporter,
            )?;
        }
        removed += generic_destroyer(scope.uow, scope.catalog, User::KIND, user_ref_id, scope.reporter)?;
        Ok(removed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestHelperClearAllArgs {
    pub workspace_root_project_name: EntityName,
}

use_case! {
    /// Wipes the workspace content and the score log, then re-initializes the workspace.
    TestHelperClearAllUseCase: TestHelperClearAllArgs => (),
    UseCaseDescriptor::mutation("test_helper_clear_all").excluding_envs(&[Env::Production])
}

impl LoggedInMutation for TestHelperClearAllUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: TestHelperClearAllArgs) -> UseCaseResult<()> {
        let scope = cx.scope;
        generic_children_destroyer(
            scope.uow,
            scope.catalog,
            Workspace::KIND,
            cx.workspace_ref_id(),
            scope.reporter,
        )?;
        if let Some(score_log) = scope
            .uow
            .get_for::<ScoreLog>()
            .load_by_parent_optional(cx.user().ref_id())?
        {
            generic_destroyer(
                scope.uow,
                scope.catalog,
                ScoreLog::KIND,
                score_log.ref_id(),
                scope.reporter,
            )?;
        }
        init_workspace(scope, cx.user(), cx.workspace(), args.workspace_root_project_name)?;
        Ok(())
    }
}
