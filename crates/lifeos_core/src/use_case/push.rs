//! Slack and email push integrations.
//!
//! Every pushed item generates one inbox task in the collection's project.

use crate::model::framework::{EntityId, UpdateAction};
use crate::model::inbox_task::InboxTask;
use crate::model::push_integration::{EmailTask, PushGenerationExtraInfo, SlackTask};
use crate::model::values::{EmailAddress, WorkspaceFeature};
use crate::service::push_service::{
    archive_email_task, archive_slack_task, change_generation_project, create_email_task,
    create_slack_task, remove_email_task, remove_slack_task, update_email_task, update_slack_task,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{LoggedInMutation, RefIdArgs, UseCaseDescriptor, UseCaseResult};
use serde::{Deserialize, Serialize};

const SLACK_TASKS: &[WorkspaceFeature] = &[WorkspaceFeature::SlackTasks];
const EMAIL_TASKS: &[WorkspaceFeature] = &[WorkspaceFeature::EmailTasks];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackTaskCreateArgs {
    pub user: String,
    #[serde(default)]
    pub channel: Option<String>,
    pub message: String,
    #[serde(default)]
    pub generation_extra_info: PushGenerationExtraInfo,
}

#[derive(Debug, Clone)]
pub struct SlackTaskCreateResult {
    pub slack_task: SlackTask,
    pub inbox_task: InboxTask,
}

use_case! {
    SlackTaskCreateUseCase: SlackTaskCreateArgs => SlackTaskCreateResult,
    UseCaseDescriptor::mutation("slack_task_create").requires(SLACK_TASKS)
}

impl LoggedInMutation for SlackTaskCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: SlackTaskCreateArgs) -> UseCaseResult<SlackTaskCreateResult> {
        let (slack_task, inbox_task) = create_slack_task(
            cx.scope,
            cx.workspace_ref_id(),
            args.user,
            args.channel,
            args.message,
            args.generation_extra_info,
        )?;
        Ok(SlackTaskCreateResult {
            slack_task,
            inbox_task,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackTaskUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub message: UpdateAction<String>,
    #[serde(default)]
    pub generation_extra_info: UpdateAction<PushGenerationExtraInfo>,
}

use_case! {
    /// The generated inbox task follows the new message and overrides.
    SlackTaskUpdateUseCase: SlackTaskUpdateArgs => SlackTask,
    UseCaseDescriptor::mutation("slack_task_update").requires(SLACK_TASKS)
}

impl LoggedInMutation for SlackTaskUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: SlackTaskUpdateArgs) -> UseCaseResult<SlackTask> {
        Ok(update_slack_task(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.message,
            args.generation_extra_info,
        )?)
    }
}

use_case! {
    SlackTaskArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("slack_task_archive").requires(SLACK_TASKS)
}

impl LoggedInMutation for SlackTaskArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_slack_task(cx.scope, args.ref_id)?)
    }
}

use_case! {
    SlackTaskRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("slack_task_remove").requires(SLACK_TASKS)
}

impl LoggedInMutation for SlackTaskRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_slack_task(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTaskCreateArgs {
    pub from_address: EmailAddress,
    pub from_name: String,
    pub to_address: EmailAddress,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub generation_extra_info: PushGenerationExtraInfo,
}

#[derive(Debug, Clone)]
pub struct EmailTaskCreateResult {
    pub email_task: EmailTask,
    pub inbox_task: InboxTask,
}

use_case! {
    EmailTaskCreateUseCase: EmailTaskCreateArgs => EmailTaskCreateResult,
    UseCaseDescriptor::mutation("email_task_create").requires(EMAIL_TASKS)
}

impl LoggedInMutation for EmailTaskCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: EmailTaskCreateArgs) -> UseCaseResult<EmailTaskCreateResult> {
        let (email_task, inbox_task) = create_email_task(
            cx.scope,
            cx.workspace_ref_id(),
            args.from_address,
            args.from_name,
            args.to_address,
            args.subject,
            args.body,
            args.generation_extra_info,
        )?;
        Ok(EmailTaskCreateResult {
            email_task,
            inbox_task,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTaskUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub subject: UpdateAction<String>,
    #[serde(default)]
    pub body: UpdateAction<String>,
    #[serde(default)]
    pub generation_extra_info: UpdateAction<PushGenerationExtraInfo>,
}

use_case! {
    EmailTaskUpdateUseCase: EmailTaskUpdateArgs => EmailTask,
    UseCaseDescriptor::mutation("email_task_update").requires(EMAIL_TASKS)
}

impl LoggedInMutation for EmailTaskUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: EmailTaskUpdateArgs) -> UseCaseResult<EmailTask> {
        Ok(update_email_task(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.subject,
            args.body,
            args.generation_extra_info,
        )?)
    }
}

use_case! {
    EmailTaskArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("email_task_archive").requires(EMAIL_TASKS)
}

impl LoggedInMutation for EmailTaskArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_email_task(cx.scope, args.ref_id)?)
    }
}

use_case! {
    EmailTaskRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("email_task_remove").requires(EMAIL_TASKS)
}

impl LoggedInMutation for EmailTaskRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_email_task(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PushChangeGenerationProjectArgs {
    #[serde(default)]
    pub generation_project_ref_id: Option<EntityId>,
}

use_case! {
    /// Applies to both Slack and email collections.
    PushChangeGenerationProjectUseCase: PushChangeGenerationProjectArgs => (),
    UseCaseDescriptor::mutation("push_integration_change_generation_project")
}

impl LoggedInMutation for PushChangeGenerationProjectUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: PushChangeGenerationProjectArgs) -> UseCaseResult<()> {
        Ok(change_generation_project(
            cx.scope,
            cx.workspace_ref_id(),
            args.generation_project_ref_id,
        )?)
    }
}
