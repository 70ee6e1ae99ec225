//! User root, its auth record and the user-workspace link.
//!
//! # Invariants
//! - A user is unique by email address.
//! - Each user has exactly one auth record and one workspace link.

use crate::model::framework::entity::{entity_header, owns_one, LinkDescriptor, RefResolver};
use crate::model::framework::{
    DomainContext, Entity, EntityHeader, EntityId, EntityName, EntityStructure, IndexField,
    TrunkEntity, UpdateAction,
};
use crate::model::values::{
    EmailAddress, PasswordHash, RecoveryTokenHash, Timezone, UserFeatureFlags,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(skip)]
    pub header: EntityHeader,
    pub email_address: EmailAddress,
    pub name: EntityName,
    pub timezone: Timezone,
    pub feature_flags: UserFeatureFlags,
}

impl User {
    pub fn new_user(
        ctx: &DomainContext,
        email_address: EmailAddress,
        name: EntityName,
        timezone: Timezone,
        feature_flags: UserFeatureFlags,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("email_address", &email_address)
            .arg("name", &name)
            .arg("timezone", &timezone)
            .arg("feature_flags", &feature_flags)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_user", args),
            email_address,
            name,
            timezone,
            feature_flags,
        }
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        name: UpdateAction<EntityName>,
        timezone: UpdateAction<Timezone>,
    ) -> Self {
        let args = ctx
            .frame()
            .update("name", &name)
            .update("timezone", &timezone)
            .finish();
        self.name = name.or_else(self.name);
        self.timezone = timezone.or_else(self.timezone);
        self.header.record_update(ctx, "update", args);
        self
    }

    /// Unique key of the user registered under `email_address`.
    pub fn key_for_email(email_address: &EmailAddress) -> String {
        format!("email:{}", email_address.as_str().to_ascii_lowercase())
    }

    pub fn change_feature_flags(mut self, ctx: &DomainContext, feature_flags: UserFeatureFlags) -> Self {
        let args = ctx.frame().arg("feature_flags", &feature_flags).finish();
        self.feature_flags = feature_flags;
        self.header.record_update(ctx, "change_feature_flags", args);
        self
    }
}

impl Entity for User {
    const KIND: &'static str = "user";
    const STRUCTURE: EntityStructure = EntityStructure::Root;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        None
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn unique_key(&self) -> Option<String> {
        Some(Self::key_for_email(&self.email_address))
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_one("auth_record", RefResolver::Parent),
            owns_one("score_log", RefResolver::Parent),
        ];
        LINKS
    }
}

/// Password and recovery-token hashes of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRecord {
    #[serde(skip)]
    pub header: EntityHeader,
    pub user_ref_id: EntityId,
    pub password_hash: PasswordHash,
    pub recovery_token_hash: RecoveryTokenHash,
}

impl AuthRecord {
    pub fn new_auth(
        ctx: &DomainContext,
        user_ref_id: EntityId,
        password_hash: PasswordHash,
        recovery_token_hash: RecoveryTokenHash,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("user_ref_id", &user_ref_id)
            .arg("password_hash", &password_hash)
            .arg("recovery_token_hash", &recovery_token_hash)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_auth", args),
            user_ref_id,
            password_hash,
            recovery_token_hash,
        }
    }

    pub fn change_password(mut self, ctx: &DomainContext, password_hash: PasswordHash) -> Self {
        let args = ctx.frame().arg("password_hash", &password_hash).finish();
        self.password_hash = password_hash;
        self.header.record_update(ctx, "change_password", args);
        self
    }

    /// Replaces both hashes after a successful recovery-token check.
    pub fn reset_password(
        mut self,
        ctx: &DomainContext,
        password_hash: PasswordHash,
        recovery_token_hash: RecoveryTokenHash,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("password_hash", &password_hash)
            .arg("recovery_token_hash", &recovery_token_hash)
            .finish();
        self.password_hash = password_hash;
        self.recovery_token_hash = recovery_token_hash;
        self.header.record_update(ctx, "reset_password", args);
        self
    }
}

impl Entity for AuthRecord {
    const KIND: &'static str = "auth_record";
    const STRUCTURE: EntityStructure = EntityStructure::Stub;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.user_ref_id)
    }
}

impl TrunkEntity for AuthRecord {}

/// Ties one user to one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWorkspaceLink {
    #[serde(skip)]
    pub header: EntityHeader,
    pub user_ref_id: EntityId,
    pub workspace_ref_id: EntityId,
}

impl UserWorkspaceLink {
    pub fn new_link(ctx: &DomainContext, user_ref_id: EntityId, workspace_ref_id: EntityId) -> Self {
        let args = ctx
            .frame()
            .arg("user_ref_id", &user_ref_id)
            .arg("workspace_ref_id", &workspace_ref_id)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_user_workspace_link", args),
            user_ref_id,
            workspace_ref_id,
        }
    }
}

impl UserWorkspaceLink {
    pub fn key_for_user(user_ref_id: EntityId) -> String {
        format!("user:{user_ref_id}")
    }
}

impl Entity for UserWorkspaceLink {
    const KIND: &'static str = "user_workspace_link";
    const STRUCTURE: EntityStructure = EntityStructure::Root;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        None
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![
            ("user_ref_id", self.user_ref_id.to_string()),
            ("workspace_ref_id", self.workspace_ref_id.to_string()),
        ]
    }

    fn unique_key(&self) -> Option<String> {
        Some(Self::key_for_user(self.user_ref_id))
    }
}
