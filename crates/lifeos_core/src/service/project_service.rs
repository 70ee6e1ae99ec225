//! Project tree operations.
//!
//! # Responsibility
//! - Create, rename, re-parent, archive and remove projects.
//! - Resolve the project a new piece of work lands in.
//!
//! # Invariants
//! - Each workspace has exactly one root project; it is never moved, archived or removed.
//! - Re-parenting must not create a parent-child cycle.
//! - A parent project must be live and belong to the same collection.

use crate::model::framework::{Entity, EntityId, EntityName, UpdateAction};
use crate::model::project::{Project, ProjectCollection};
use crate::repo::EntityRepository;
use crate::service::workspace_service::load_root_project;
use crate::service::{ServiceError, ServiceResult, ServiceScope};
use std::collections::HashSet;

/// The project work should land in: `requested` when valid, the root otherwise.
pub fn resolve_project(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    requested: Option<EntityId>,
) -> ServiceResult<EntityId> {
    match requested {
        Some(project_ref_id) => Ok(load_in_workspace(scope, workspace_ref_id, project_ref_id)?.ref_id()),
        None => Ok(load_root_project(scope, workspace_ref_id)?.ref_id()),
    }
}

fn load_in_workspace(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    project_ref_id: EntityId,
) -> ServiceResult<Project> {
    let collection: ProjectCollection = scope.trunk(workspace_ref_id)?;
    let project = scope.uow.get_for::<Project>().load_by_id(project_ref_id, false)?;
    if project.project_collection_ref_id != collection.ref_id() {
        return Err(ServiceError::invariant(format!(
            "project {project_ref_id} belongs to another workspace"
        )));
    }
    Ok(project)
}

pub fn create_project(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    parent_project_ref_id: Option<EntityId>,
    name: EntityName,
) -> ServiceResult<Project> {
    let parent = resolve_project(scope, workspace_ref_id, parent_project_ref_id)?;
    let collection: ProjectCollection = scope.trunk(workspace_ref_id)?;
    let project = scope.uow.get_for::<Project>().create(Project::new_project(
        scope.ctx,
        collection.ref_id(),
        parent,
        name,
    ))?;
    scope.reporter.mark_created(&project);
    Ok(project)
}

pub fn update_project(
    scope: ServiceScope<'_, '_>,
    project_ref_id: EntityId,
    name: UpdateAction<EntityName>,
) -> ServiceResult<Project> {
    let repo = scope.uow.get_for::<Project>();
    let project = repo.load_by_id(project_ref_id, false)?;
    let project = repo.save(project.update(scope.ctx, name))?;
    scope.reporter.mark_updated(&project);
    Ok(project)
}

/// Moves a project under `parent_project_ref_id`.
///
/// # Errors
/// - `InvariantViolation` when the new parent lies inside the project's own subtree.
pub fn change_parent(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    project_ref_id: EntityId,
    parent_project_ref_id: EntityId,
) -> ServiceResult<Project> {
    let repo = scope.uow.get_for::<Project>();
    let project = load_in_workspace(scope, workspace_ref_id, project_ref_id)?;
    load_in_workspace(scope, workspace_ref_id, parent_project_ref_id)?;
    check_cycles(scope, project_ref_id, parent_project_ref_id)?;
    let project = repo.save(project.change_parent(scope.ctx, parent_project_ref_id)?)?;
    scope.reporter.mark_updated(&project);
    Ok(project)
}

/// Walks up from `new_parent` and fails if it reaches `project_ref_id`.
pub fn check_cycles(
    scope: ServiceScope<'_, '_>,
    project_ref_id: EntityId,
    new_parent_ref_id: EntityId,
) -> ServiceResult<()> {
    let repo = scope.uow.get_for::<Project>();
    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent_ref_id);
    while let Some(current) = cursor {
        if current == project_ref_id {
            return Err(ServiceError::invariant(format!(
                "moving project {project_ref_id} under {new_parent_ref_id} would create a cycle"
            )));
        }
        if !seen.insert(current) {
            return Err(ServiceError::invariant(format!(
                "project tree already contains a cycle through {current}"
            )));
        }
        cursor = repo.load_by_id(current, true)?.parent_project_ref_id;
    }
    Ok(())
}

pub fn archive_project(scope: ServiceScope<'_, '_>, project_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<Project>(project_ref_id)
}

pub fn remove_project(scope: ServiceScope<'_, '_>, project_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<Project>(project_ref_id)
}

pub fn find_projects(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    allow_archived: bool,
    filter_ref_ids: Option<&[EntityId]>,
) -> ServiceResult<Vec<Project>> {
    let collection: ProjectCollection = scope.trunk(workspace_ref_id)?;
    Ok(scope
        .uow
        .get_for::<Project>()
        .find_all(collection.ref_id(), allow_archived, filter_ref_ids)?)
}

#[cfg(test)]
mod tests {
    use super::{archive_project, change_parent, create_project};
    use crate::model::framework::Entity;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::workspace_service::load_root_project;
    use crate::service::{EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    #[test]
    fn reparenting_under_a_descendant_is_rejected() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();

        let parent = create_project(scope, ws, None, "Parent".parse().expect("name")).expect("parent");
        let child = create_project(scope, ws, Some(parent.ref_id()), "Child".parse().expect("name"))
            .expect("child");
        let err = change_parent(scope, ws, parent.ref_id(), child.ref_id()).expect_err("cycle");
        assert!(matches!(err, ServiceError::InvariantViolation(_)));

        let other = create_project(scope, ws, None, "Other".parse().expect("name")).expect("other");
        let moved = change_parent(scope, ws, child.ref_id(), other.ref_id()).expect("move");
        assert_eq!(moved.parent_project_ref_id, Some(other.ref_id()));
    }

    #[test]
    fn root_project_cannot_be_archived() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let root = load_root_project(scope, seeded.workspace.ref_id()).expect("root");
        assert!(matches!(
            archive_project(scope, root.ref_id()),
            Err(ServiceError::InputValidation(_))
        ));
    }
}
