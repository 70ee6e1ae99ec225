//! Project use cases.

use crate::model::framework::{EntityId, EntityName, UpdateAction};
use crate::model::project::Project;
use crate::model::values::WorkspaceFeature;
use crate::service::project_service::{
    archive_project, change_parent, create_project, find_projects, remove_project, update_project,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseResult};
use serde::{Deserialize, Serialize};

const PROJECTS: &[WorkspaceFeature] = &[WorkspaceFeature::Projects];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCreateArgs {
    /// Defaults to the root project.
    #[serde(default)]
    pub parent_project_ref_id: Option<EntityId>,
    pub name: EntityName,
}

use_case! {
    ProjectCreateUseCase: ProjectCreateArgs => Project,
    UseCaseDescriptor::mutation("project_create").requires(PROJECTS)
}

impl LoggedInMutation for ProjectCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ProjectCreateArgs) -> UseCaseResult<Project> {
        Ok(create_project(
            cx.scope,
            cx.workspace_ref_id(),
            args.parent_project_ref_id,
            args.name,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
}

use_case! {
    ProjectUpdateUseCase: ProjectUpdateArgs => Project,
    UseCaseDescriptor::mutation("project_update").requires(PROJECTS)
}

impl LoggedInMutation for ProjectUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ProjectUpdateArgs) -> UseCaseResult<Project> {
        Ok(update_project(cx.scope, args.ref_id, args.name)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectChangeParentArgs {
    pub ref_id: EntityId,
    pub parent_project_ref_id: EntityId,
}

use_case! {
    /// Reparents a project; cycles are refused.
    ProjectChangeParentUseCase: ProjectChangeParentArgs => Project,
    UseCaseDescriptor::mutation("project_change_parent").requires(PROJECTS)
}

impl LoggedInMutation for ProjectChangeParentUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ProjectChangeParentArgs) -> UseCaseResult<Project> {
        Ok(change_parent(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.parent_project_ref_id,
        )?)
    }
}

use_case! {
    ProjectArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("project_archive").requires(PROJECTS)
}

impl LoggedInMutation for ProjectArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_project(cx.scope, args.ref_id)?)
    }
}

use_case! {
    ProjectRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("project_remove").requires(PROJECTS)
}

impl LoggedInMutation for ProjectRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_project(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFindArgs {
    pub allow_archived: bool,
    pub filter_ref_ids: Option<Vec<EntityId>>,
}

use_case! {
    ProjectFindUseCase: ProjectFindArgs => Vec<Project>,
    UseCaseDescriptor::readonly("project_find")
}

impl LoggedInReadonly for ProjectFindUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ProjectFindArgs) -> UseCaseResult<Vec<Project>> {
        Ok(find_projects(
            cx.scope,
            cx.workspace_ref_id(),
            args.allow_archived,
            args.filter_ref_ids.as_deref(),
        )?)
    }
}
