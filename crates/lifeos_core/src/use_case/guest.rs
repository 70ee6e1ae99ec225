//! Guest use cases: account creation, login and password recovery.

use crate::auth::{
    hash_password, hash_recovery_token, verify_password, verify_recovery_token, AuthError, AuthToken,
    AuthTokenKind,
};
use crate::model::framework::realm::SecretValue;
use crate::model::framework::{Entity, EntityId, EntityName};
use crate::model::user::{AuthRecord, User, UserWorkspaceLink};
use crate::model::values::{
    EmailAddress, PasswordNewPlain, PasswordPlain, RecoveryTokenPlain, Timezone, UserFeature,
    UserFeatureFlags, UserFeatureFlagsControls, WorkspaceFeature, WorkspaceFeatureFlags,
    WorkspaceFeatureFlagsControls,
};
use crate::model::workspace::Workspace;
use crate::repo::EntityRepository;
use crate::service::workspace_service::init_workspace;
use crate::use_case::app::{AuditSubject, GuestCx};
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    GuestMutation, GuestReadonly, UseCaseDescriptor, UseCaseError, UseCaseKind, UseCaseResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn check_repeat(password: &PasswordNewPlain, repeat: &PasswordNewPlain) -> UseCaseResult<()> {
    if password.reveal() != repeat.reveal() {
        return Err(UseCaseError::invalid("passwords do not match"));
    }
    Ok(())
}

fn user_by_email(cx: &GuestCx<'_, '_>, email_address: &EmailAddress) -> UseCaseResult<User> {
    cx.scope
        .uow
        .get_for::<User>()
        .load_by_unique_key(&User::key_for_email(email_address))?
        .filter(|user| !user.header.archived)
        .ok_or(UseCaseError::Authentication(AuthError::BadCredentials))
}

fn workspace_of(cx: &GuestCx<'_, '_>, user_ref_id: EntityId) -> UseCaseResult<EntityId> {
    cx.scope
        .uow
        .get_for::<UserWorkspaceLink>()
        .load_by_unique_key(&UserWorkspaceLink::key_for_user(user_ref_id))?
        .map(|link| link.workspace_ref_id)
        .ok_or(UseCaseError::Authentication(AuthError::BadCredentials))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterArgs {
    pub user_email_address: EmailAddress,
    pub user_name: EntityName,
    pub user_timezone: Timezone,
    pub auth_password: PasswordNewPlain,
    pub auth_password_repeat: PasswordNewPlain,
    pub workspace_name: EntityName,
    pub workspace_root_project_name: EntityName,
    #[serde(default)]
    pub workspace_feature_flags: BTreeMap<WorkspaceFeature, bool>,
    #[serde(default)]
    pub user_feature_flags: BTreeMap<UserFeature, bool>,
}

#[derive(Debug, Clone)]
pub struct RegisterResult {
    pub user_ref_id: EntityId,
    pub workspace_ref_id: EntityId,
    pub auth_token: AuthToken,
    /// Shown once; only its hash is stored.
    pub recovery_token: RecoveryTokenPlain,
}

use_case! {
    /// Creates a user, its auth record, a workspace and the link between them.
    RegisterUseCase: RegisterArgs => RegisterResult,
    UseCaseDescriptor::new("register", UseCaseKind::GuestMutation)
}

impl GuestMutation for RegisterUseCase {
    fn perform(&self, cx: &GuestCx<'_, '_>, args: RegisterArgs) -> UseCaseResult<RegisterResult> {
        check_repeat(&args.auth_password, &args.auth_password_repeat)?;
        let scope = cx.scope;
        let users = scope.uow.get_for::<User>();
        if users
            .load_by_unique_key(&User::key_for_email(&args.user_email_address))?
            .is_some()
        {
            return Err(UseCaseError::EntityAlreadyExists(
                "a user with this email address already exists".to_string(),
            ));
        }

        let user_flags = UserFeatureFlagsControls.apply(&UserFeatureFlags::default(), &args.user_feature_flags)?;
        let user = users.create(User::new_user(
            scope.ctx,
            args.user_email_address,
            args.user_name,
            args.user_timezone,
            user_flags,
        ))?;
        scope.reporter.mark_created(&user);

        let recovery_token = RecoveryTokenPlain::generate();
        let auth = scope.uow.get_for::<AuthRecord>().create(AuthRecord::new_auth(
            scope.ctx,
            user.ref_id(),
            hash_password(&args.auth_password.as_plain())?,
            hash_recovery_token(&recovery_token)?,
        ))?;
        scope.reporter.mark_created(&auth);

        let workspace_flags = WorkspaceFeatureFlagsControls
            .apply(&WorkspaceFeatureFlags::default(), &args.workspace_feature_flags)?;
        let workspace = scope.uow.get_for::<Workspace>().create(Workspace::new_workspace(
            scope.ctx,
            args.workspace_name,
            workspace_flags,
        ))?;
        scope.reporter.mark_created(&workspace);

        let link = scope.uow.get_for::<UserWorkspaceLink>().create(UserWorkspaceLink::new_link(
            scope.ctx,
            user.ref_id(),
            workspace.ref_id(),
        ))?;
        scope.reporter.mark_created(&link);

        init_workspace(scope, &user, &workspace, args.workspace_root_project_name)?;
        let auth_token = cx.stamper.stamp(AuthTokenKind::General, user.ref_id(), cx.now())?;
        Ok(RegisterResult {
            user_ref_id: user.ref_id(),
            workspace_ref_id: workspace.ref_id(),
            auth_token,
            recovery_token,
        })
    }

    fn audit_subject(&self, output: &RegisterResult) -> Option<AuditSubject> {
        Some(AuditSubject {
            user_ref_id: output.user_ref_id,
            workspace_ref_id: output.workspace_ref_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginArgs {
    pub email_address: EmailAddress,
    pub password: PasswordPlain,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub auth_token: AuthToken,
}

use_case! {
    LoginUseCase: LoginArgs => LoginResult,
    UseCaseDescriptor::new("login", UseCaseKind::GuestReadonly)
}

impl GuestReadonly for LoginUseCase {
    fn perform(&self, cx: &GuestCx<'_, '_>, args: LoginArgs) -> UseCaseResult<LoginResult> {
        let user = user_by_email(cx, &args.email_address)?;
        let auth: AuthRecord = cx.scope.trunk(user.ref_id())?;
        if !verify_password(&args.password, &auth.password_hash)? {
            return Err(UseCaseError::Authentication(AuthError::BadCredentials));
        }
        let auth_token = cx.stamper.stamp(AuthTokenKind::General, user.ref_id(), cx.now())?;
        Ok(LoginResult { auth_token })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordArgs {
    pub email_address: EmailAddress,
    pub recovery_token: RecoveryTokenPlain,
    pub new_password: PasswordNewPlain,
    pub new_password_repeat: PasswordNewPlain,
}

#[derive(Debug, Clone)]
pub struct ResetPasswordResult {
    pub user_ref_id: EntityId,
    pub workspace_ref_id: EntityId,
    pub new_recovery_token: RecoveryTokenPlain,
}

use_case! {
    /// Swaps the password using the recovery token and issues a fresh token.
    ResetPasswordUseCase: ResetPasswordArgs => ResetPasswordResult,
    UseCaseDescriptor::new("reset_password", UseCaseKind::GuestMutation)
}

impl GuestMutation for ResetPasswordUseCase {
    fn perform(&self, cx: &GuestCx<'_, '_>, args: ResetPasswordArgs) -> UseCaseResult<ResetPasswordResult> {
        check_repeat(&args.new_password, &args.new_password_repeat)?;
        let user = user_by_email(cx, &args.email_address)?;
        let workspace_ref_id = workspace_of(cx, user.ref_id())?;
        let auth: AuthRecord = cx.scope.trunk(user.ref_id())?;
        if !verify_recovery_token(&args.recovery_token, &auth.recovery_token_hash)? {
            return Err(UseCaseError::Authentication(AuthError::BadCredentials));
        }
        let new_recovery_token = RecoveryTokenPlain::generate();
        let auth = auth.reset_password(
            cx.scope.ctx,
            hash_password(&args.new_password.as_plain())?,
            hash_recovery_token(&new_recovery_token)?,
        );
        let auth = cx.scope.uow.get_for::<AuthRecord>().save(auth)?;
        cx.scope.reporter.mark_updated(&auth);
        Ok(ResetPasswordResult {
            user_ref_id: user.ref_id(),
            workspace_ref_id,
            new_recovery_token,
        })
    }

    fn audit_subject(&self, output: &ResetPasswordResult) -> Option<AuditSubject> {
        Some(AuditSubject {
            user_ref_id: output.user_ref_id,
            workspace_ref_id: output.workspace_ref_id,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UserAndWorkspace {
    pub user: User,
    pub workspace: Workspace,
}

use_case! {
    /// `None` when the caller carries no valid token.
    LoadUserAndWorkspaceUseCase: () => Option<UserAndWorkspace>,
    UseCaseDescriptor::new("load_user_and_workspace", UseCaseKind::GuestReadonly)
}

impl GuestReadonly for LoadUserAndWorkspaceUseCase {
    fn perform(&self, cx: &GuestCx<'_, '_>, _args: ()) -> UseCaseResult<Option<UserAndWorkspace>> {
        Ok(cx.session.map(|session| UserAndWorkspace {
            user: session.user.clone(),
            workspace: session.workspace.clone(),
        }))
    }
}
