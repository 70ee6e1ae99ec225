//! Docs: nested free-form documents whose body lives in a note.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName, EntityStructure,
    IndexField, UpdateAction,
};
use crate::model::note::note_link;
use serde::{Deserialize, Serialize};

simple_trunk!(
    DocCollection("doc_collection", workspace_ref_id),
    links = &[contains_many("doc")]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doc {
    #[serde(skip)]
    pub header: EntityHeader,
    pub doc_collection_ref_id: EntityId,
    pub parent_doc_ref_id: Option<EntityId>,
    pub name: EntityName,
}

impl Doc {
    pub fn new_doc(
        ctx: &DomainContext,
        doc_collection_ref_id: EntityId,
        parent_doc_ref_id: Option<EntityId>,
        name: EntityName,
    ) -> Self {
        let args = ctx
            .frame()
            .arg_opt("parent_doc_ref_id", parent_doc_ref_id.as_ref())
            .arg("name", &name)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_doc", args),
            doc_collection_ref_id,
            parent_doc_ref_id,
            name,
        }
    }

    pub fn update(mut self, ctx: &DomainContext, name: UpdateAction<EntityName>) -> Self {
        let args = ctx.frame().update("name", &name).finish();
        self.name = name.or_else(self.name);
        self.header.record_update(ctx, "update", args);
        self
    }
}

impl Entity for Doc {
    const KIND: &'static str = "doc";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.doc_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        self.parent_doc_ref_id
            .map(|parent| vec![("parent_doc_ref_id", parent.to_string())])
            .unwrap_or_default()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("doc", RefResolver::IsRefId("parent_doc_ref_id")),
            note_link!("doc"),
        ];
        LINKS
    }
}

impl CrownEntity for Doc {}
