//! Projects: a tree of work containers under the project collection.
//!
//! # Invariants
//! - Exactly one root project (no parent) per collection; it is never archived.
//! - Parent links never form a cycle (checked by `service::project_service`).

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName, EntityStructure,
    IndexField, InputValidationError, UpdateAction, ValidationResult,
};
use crate::model::note::note_link;
use serde::{Deserialize, Serialize};

simple_trunk!(
    ProjectCollection("project_collection", workspace_ref_id),
    links = &[contains_many("project")]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(skip)]
    pub header: EntityHeader,
    pub project_collection_ref_id: EntityId,
    pub parent_project_ref_id: Option<EntityId>,
    pub name: EntityName,
}

impl Project {
    pub fn new_root_project(
        ctx: &DomainContext,
        project_collection_ref_id: EntityId,
        name: EntityName,
    ) -> Self {
        let args = ctx.frame().arg("name", &name).finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_root_project", args),
            project_collection_ref_id,
            parent_project_ref_id: None,
            name,
        }
    }

    pub fn new_project(
        ctx: &DomainContext,
        project_collection_ref_id: EntityId,
        parent_project_ref_id: EntityId,
        name: EntityName,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("parent_project_ref_id", &parent_project_ref_id)
            .arg("name", &name)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_project", args),
            project_collection_ref_id,
            parent_project_ref_id: Some(parent_project_ref_id),
            name,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_project_ref_id.is_none()
    }

    pub fn update(mut self, ctx: &DomainContext, name: UpdateAction<EntityName>) -> Self {
        let args = ctx.frame().update("name", &name).finish();
        self.name = name.or_else(self.name);
        self.header.record_update(ctx, "update", args);
        self
    }

    /// Moves the project under a new parent; cycle checks live in the service.
    pub fn change_parent(
        mut self,
        ctx: &DomainContext,
        parent_project_ref_id: EntityId,
    ) -> ValidationResult<Self> {
        if self.is_root() {
            return Err(InputValidationError::new("the root project cannot be moved"));
        }
        if parent_project_ref_id == self.header.ref_id {
            return Err(InputValidationError::new("a project cannot be its own parent"));
        }
        let args = ctx
            .frame()
            .arg("parent_project_ref_id", &parent_project_ref_id)
            .finish();
        self.parent_project_ref_id = Some(parent_project_ref_id);
        self.header.record_update(ctx, "change_parent", args);
        Ok(self)
    }
}

impl Entity for Project {
    const KIND: &'static str = "project";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.project_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        self.parent_project_ref_id
            .map(|parent| vec![("parent_project_ref_id", parent.to_string())])
            .unwrap_or_default()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("project", RefResolver::IsRefId("parent_project_ref_id")),
            owns_many("inbox_task", RefResolver::IsRefId("project_ref_id")),
            owns_many("big_plan", RefResolver::IsRefId("project_ref_id")),
            owns_many("habit", RefResolver::IsRefId("project_ref_id")),
            owns_many("chore", RefResolver::IsRefId("project_ref_id")),
            note_link!("project"),
        ];
        LINKS
    }

    fn is_safe_to_archive(&self) -> bool {
        !self.is_root()
    }
}

impl CrownEntity for Project {}
