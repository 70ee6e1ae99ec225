//! Push integrations: Slack and email messages turned into inbox tasks.
//!
//! # Invariants
//! - Each push task owns at most one generated inbox task.
//! - Generated tasks land in the collection's generation project.

use crate::model::framework::entity::{
    contains_one, contains_many, entity_header, owns_at_most_one, simple_trunk, LinkDescriptor,
    RefResolver,
};
use crate::model::framework::realm::serde_realm_value;
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, TrunkEntity, UpdateAction,
};
use crate::model::values::{Difficulty, EmailAddress, Eisen, InboxTaskStatus};
use serde::{Deserialize, Serialize};

simple_trunk!(
    /// Configuration point grouping every push integration of a workspace.
    PushIntegrationGroup("push_integration_group", workspace_ref_id),
    links = &[
        contains_one("slack_task_collection"),
        contains_one("email_task_collection"),
    ]
);

/// Overrides the message author can attach to the generated inbox task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushGenerationExtraInfo {
    pub name: Option<EntityName>,
    pub status: Option<InboxTaskStatus>,
    pub eisen: Option<Eisen>,
    pub difficulty: Option<Difficulty>,
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
}

serde_realm_value!(PushGenerationExtraInfo, "push_generation_extra_info");

macro_rules! push_task_collection {
    ($name:ident, $kind:literal, $child:literal) => {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $name {
            #[serde(skip)]
            pub header: EntityHeader,
            pub push_integration_group_ref_id: EntityId,
            pub generation_project_ref_id: EntityId,
        }

        impl $name {
            pub fn new(
                ctx: &DomainContext,
                push_integration_group_ref_id: EntityId,
                generation_project_ref_id: EntityId,
            ) -> Self {
                let args = ctx
                    .frame()
                    .arg("push_integration_group_ref_id", &push_integration_group_ref_id)
                    .arg("generation_project_ref_id", &generation_project_ref_id)
                    .finish();
                Self {
                    header: EntityHeader::new_created(ctx, concat!("new_", $kind), args),
                    push_integration_group_ref_id,
                    generation_project_ref_id,
                }
            }

            pub fn change_generation_project(mut self, ctx: &DomainContext, project_ref_id: EntityId) -> Self {
                let args = ctx.frame().arg("generation_project_ref_id", &project_ref_id).finish();
                self.generation_project_ref_id = project_ref_id;
                self.header.record_update(ctx, "change_generation_project", args);
                self
            }
        }

        impl Entity for $name {
            const KIND: &'static str = $kind;
            const STRUCTURE: EntityStructure = EntityStructure::Trunk;

            entity_header!();

            fn parent_ref_id(&self) -> Option<EntityId> {
                Some(self.push_integration_group_ref_id)
            }

            fn links() -> &'static [LinkDescriptor] {
                const LINKS: &[LinkDescriptor] = &[contains_many($child)];
                LINKS
            }
        }

        impl TrunkEntity for $name {}
    };
}

push_task_collection!(SlackTaskCollection, "slack_task_collection", "slack_task");
push_task_collection!(EmailTaskCollection, "email_task_collection", "email_task");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackTask {
    #[serde(skip)]
    pub header: EntityHeader,
    pub slack_task_collection_ref_id: EntityId,
    pub user: String,
    pub channel: Option<String>,
    pub message: String,
    pub generation_extra_info: PushGenerationExtraInfo,
    pub has_generated_task: bool,
}

impl SlackTask {
    pub fn new_slack_task(
        ctx: &DomainContext,
        slack_task_collection_ref_id: EntityId,
        user: String,
        channel: Option<String>,
        message: String,
        generation_extra_info: PushGenerationExtraInfo,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("user", &user)
            .arg_opt("channel", channel.as_ref())
            .arg("generation_extra_info", &generation_extra_info)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_slack_task", args),
            slack_task_collection_ref_id,
            user,
            channel,
            message,
            generation_extra_info,
            has_generated_task: false,
        }
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        message: UpdateAction<String>,
        generation_extra_info: UpdateAction<PushGenerationExtraInfo>,
    ) -> Self {
        let args = ctx
            .frame()
            .update("generation_extra_info", &generation_extra_info)
            .finish();
        self.message = message.or_else(self.message);
        self.generation_extra_info = generation_extra_info.or_else(self.generation_extra_info);
        self.header.record_update(ctx, "update", args);
        self
    }

    pub fn mark_generated(mut self, ctx: &DomainContext) -> Self {
        self.has_generated_task = true;
        self.header.record_update(ctx, "mark_generated", ctx.frame().finish());
        self
    }

    pub fn default_task_name(&self) -> EntityName {
        self.generation_extra_info
            .name
            .clone()
            .unwrap_or_else(|| EntityName::from_generated(&format!("Respond to {} on Slack", self.user)))
    }
}

impl Entity for SlackTask {
    const KIND: &'static str = "slack_task";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.slack_task_collection_ref_id)
    }

    fn display_name(&self) -> String {
        format!("Slack message from {}", self.user)
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[owns_at_most_one(
            "inbox_task",
            RefResolver::IsRefId("source_entity_ref_id"),
        )
        .with_filters(&[("source", "slack_task")])];
        LINKS
    }
}

impl CrownEntity for SlackTask {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTask {
    #[serde(skip)]
    pub header: EntityHeader,
    pub email_task_collection_ref_id: EntityId,
    pub from_address: EmailAddress,
    pub from_name: String,
    pub to_address: EmailAddress,
    pub subject: String,
    pub body: String,
    pub generation_extra_info: PushGenerationExtraInfo,
    pub has_generated_task: bool,
}

impl EmailTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new_email_task(
        ctx: &DomainContext,
        email_task_collection_ref_id: EntityId,
        from_address: EmailAddress,
        from_name: String,
        to_address: EmailAddress,
        subject: String,
        body: String,
        generation_extra_info: PushGenerationExtraInfo,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("from_address", &from_address)
            .arg("to_address", &to_address)
            .arg("generation_extra_info", &generation_extra_info)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_email_task", args),
            email_task_collection_ref_id,
            from_address,
            from_name,
            to_address,
            subject,
            body,
            generation_extra_info,
            has_generated_task: false,
        }
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        subject: UpdateAction<String>,
        body: UpdateAction<String>,
        generation_extra_info: UpdateAction<PushGenerationExtraInfo>,
    ) -> Self {
        let args = ctx
            .frame()
            .update("generation_extra_info", &generation_extra_info)
            .finish();
        self.subject = subject.or_else(self.subject);
        self.body = body.or_else(self.body);
        self.generation_extra_info = generation_extra_info.or_else(self.generation_extra_info);
        self.header.record_update(ctx, "update", args);
        self
    }

    pub fn mark_generated(mut self, ctx: &DomainContext) -> Self {
        self.has_generated_task = true;
        self.header.record_update(ctx, "mark_generated", ctx.frame().finish());
        self
    }

    pub fn default_task_name(&self) -> EntityName {
        self.generation_extra_info
            .name
            .clone()
            .unwrap_or_else(|| EntityName::from_generated(&format!("Reply to {}", self.subject)))
    }
}

impl Entity for EmailTask {
    const KIND: &'static str = "email_task";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.email_task_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.subject.clone()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[owns_at_most_one(
            "inbox_task",
            RefResolver::IsRefId("source_entity_ref_id"),
        )
        .with_filters(&[("source", "email_task")])];
        LINKS
    }
}

impl CrownEntity for EmailTask {}
