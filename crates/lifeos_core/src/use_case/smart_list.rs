//! Smart list, tag and item use cases.

use crate::model::framework::{EntityId, EntityName, UpdateAction};
use crate::model::smart_list::{SmartList, SmartListItem, SmartListTag};
use crate::model::values::{Url, WorkspaceFeature};
use crate::service::smart_list_service::{
    archive_item, archive_smart_list, create_item, create_smart_list, create_tag, remove_item,
    remove_smart_list, remove_tag, update_item, update_smart_list,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{LoggedInMutation, RefIdArgs, UseCaseDescriptor, UseCaseResult};
use serde::{Deserialize, Serialize};

const SMART_LISTS: &[WorkspaceFeature] = &[WorkspaceFeature::SmartLists];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartListCreateArgs {
    pub name: EntityName,
}

use_case! {
    SmartListCreateUseCase: SmartListCreateArgs => SmartList,
    UseCaseDescriptor::mutation("smart_list_create").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: SmartListCreateArgs) -> UseCaseResult<SmartList> {
        Ok(create_smart_list(cx.scope, cx.workspace_ref_id(), args.name)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartListUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
}

use_case! {
    SmartListUpdateUseCase: SmartListUpdateArgs => SmartList,
    UseCaseDescriptor::mutation("smart_list_update").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: SmartListUpdateArgs) -> UseCaseResult<SmartList> {
        Ok(update_smart_list(cx.scope, args.ref_id, args.name)?)
    }
}

use_case! {
    SmartListArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("smart_list_archive").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_smart_list(cx.scope, args.ref_id)?)
    }
}

use_case! {
    SmartListRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("smart_list_remove").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_smart_list(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartListTagCreateArgs {
    pub smart_list_ref_id: EntityId,
    pub tag_name: EntityName,
}

use_case! {
    SmartListTagCreateUseCase: SmartListTagCreateArgs => SmartListTag,
    UseCaseDescriptor::mutation("smart_list_tag_create").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListTagCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: SmartListTagCreateArgs) -> UseCaseResult<SmartListTag> {
        Ok(create_tag(cx.scope, args.smart_list_ref_id, args.tag_name)?)
    }
}

use_case! {
    /// Strips the tag from every item of its list first.
    SmartListTagRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("smart_list_tag_remove").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListTagRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_tag(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartListItemCreateArgs {
    pub smart_list_ref_id: EntityId,
    pub name: EntityName,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub tags_ref_id: Vec<EntityId>,
    #[serde(default)]
    pub url: Option<Url>,
}

use_case! {
    SmartListItemCreateUseCase: SmartListItemCreateArgs => SmartListItem,
    UseCaseDescriptor::mutation("smart_list_item_create").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListItemCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: SmartListItemCreateArgs) -> UseCaseResult<SmartListItem> {
        Ok(create_item(
            cx.scope,
            args.smart_list_ref_id,
            args.name,
            args.is_done,
            &args.tags_ref_id,
            args.url,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartListItemUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub is_done: UpdateAction<bool>,
    #[serde(default)]
    pub tags_ref_id: UpdateAction<Vec<EntityId>>,
    #[serde(default)]
    pub url: UpdateAction<Option<Url>>,
}

use_case! {
    SmartListItemUpdateUseCase: SmartListItemUpdateArgs => SmartListItem,
    UseCaseDescriptor::mutation("smart_list_item_update").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListItemUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: SmartListItemUpdateArgs) -> UseCaseResult<SmartListItem> {
        Ok(update_item(
            cx.scope,
            args.ref_id,
            args.name,
            args.is_done,
            args.tags_ref_id,
            args.url,
        )?)
    }
}

use_case! {
    SmartListItemArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("smart_list_item_archive").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListItemArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_item(cx.scope, args.ref_id)?)
    }
}

use_case! {
    SmartListItemRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("smart_list_item_remove").requires(SMART_LISTS)
}

impl LoggedInMutation for SmartListItemRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_item(cx.scope, args.ref_id)?)
    }
}
