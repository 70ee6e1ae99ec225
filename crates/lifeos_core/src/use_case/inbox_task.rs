//! Inbox task use cases.

use crate::model::framework::EntityId;
use crate::model::inbox_task::{InboxTask, InboxTaskUpdate};
use crate::model::note::Note;
use crate::model::values::WorkspaceFeature;
use crate::service::inbox_task_service::{
    archive_inbox_task, change_big_plan_link, create_inbox_task, find_inbox_tasks, load_inbox_task,
    remove_inbox_task, update_inbox_task, InboxTaskFilter, NewInboxTask, UpdatedInboxTask,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoadArgs, LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseResult,
};
use serde::{Deserialize, Serialize};

use_case! {
    InboxTaskCreateUseCase: NewInboxTask => InboxTask,
    UseCaseDescriptor::mutation("inbox_task_create")
}

impl LoggedInMutation for InboxTaskCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: NewInboxTask) -> UseCaseResult<InboxTask> {
        Ok(create_inbox_task(cx.scope, cx.workspace_ref_id(), args)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxTaskUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub update: InboxTaskUpdate,
}

use_case! {
    /// Status changes record score entries for the caller.
    InboxTaskUpdateUseCase: InboxTaskUpdateArgs => UpdatedInboxTask,
    UseCaseDescriptor::mutation("inbox_task_update")
}

impl LoggedInMutation for InboxTaskUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: InboxTaskUpdateArgs) -> UseCaseResult<UpdatedInboxTask> {
        Ok(update_inbox_task(
            cx.scope,
            &cx.config.scoring,
            cx.user(),
            cx.workspace_ref_id(),
            args.ref_id,
            args.update,
        )?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InboxTaskChangeBigPlanArgs {
    pub ref_id: EntityId,
    pub big_plan_ref_id: Option<EntityId>,
}

use_case! {
    InboxTaskChangeBigPlanUseCase: InboxTaskChangeBigPlanArgs => InboxTask,
    UseCaseDescriptor::mutation("inbox_task_change_big_plan").requires(&[WorkspaceFeature::BigPlans])
}

impl LoggedInMutation for InboxTaskChangeBigPlanUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: InboxTaskChangeBigPlanArgs) -> UseCaseResult<InboxTask> {
        Ok(change_big_plan_link(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.big_plan_ref_id,
        )?)
    }
}

use_case! {
    InboxTaskArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("inbox_task_archive")
}

impl LoggedInMutation for InboxTaskArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_inbox_task(cx.scope, args.ref_id)?)
    }
}

use_case! {
    InboxTaskRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("inbox_task_remove")
}

impl LoggedInMutation for InboxTaskRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_inbox_task(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone)]
pub struct InboxTaskLoadResult {
    pub inbox_task: InboxTask,
    pub note: Option<Note>,
}

use_case! {
    InboxTaskLoadUseCase: LoadArgs => InboxTaskLoadResult,
    UseCaseDescriptor::readonly("inbox_task_load")
}

impl LoggedInReadonly for InboxTaskLoadUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: LoadArgs) -> UseCaseResult<InboxTaskLoadResult> {
        let (inbox_task, note) = load_inbox_task(cx.scope, args.ref_id, args.allow_archived)?;
        Ok(InboxTaskLoadResult { inbox_task, note })
    }
}

use_case! {
    InboxTaskFindUseCase: InboxTaskFilter => Vec<InboxTask>,
    UseCaseDescriptor::readonly("inbox_task_find")
}

impl LoggedInReadonly for InboxTaskFindUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: InboxTaskFilter) -> UseCaseResult<Vec<InboxTask>> {
        Ok(find_inbox_tasks(cx.scope, cx.workspace_ref_id(), &args)?)
    }
}
