//! Smart lists with their tags and items.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, refs_many, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName, EntityStructure,
    IndexField, UpdateAction,
};
use crate::model::note::note_link;
use crate::model::values::Url;
use serde::{Deserialize, Serialize};

simple_trunk!(
    SmartListCollection("smart_list_collection", workspace_ref_id),
    links = &[contains_many("smart_list")]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartList {
    #[serde(skip)]
    pub header: EntityHeader,
    pub smart_list_collection_ref_id: EntityId,
    pub name: EntityName,
}

impl SmartList {
    pub fn new_smart_list(ctx: &DomainContext, smart_list_collection_ref_id: EntityId, name: EntityName) -> Self {
        let args = ctx.frame().arg("name", &name).finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_smart_list", args),
            smart_list_collection_ref_id,
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

impl Entity for SmartList {
    const KIND: &'static str = "smart_list";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.smart_list_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("smart_list_item", RefResolver::Parent),
            owns_many("smart_list_tag", RefResolver::Parent),
            note_link!("smart_list"),
        ];
        LINKS
    }
}

impl CrownEntity for SmartList {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartListTag {
    #[serde(skip)]
    pub header: EntityHeader,
    pub smart_list_ref_id: EntityId,
    pub tag_name: EntityName,
}

impl SmartListTag {
    pub fn new_smart_list_tag(ctx: &DomainContext, smart_list_ref_id: EntityId, tag_name: EntityName) -> Self {
        let args = ctx.frame().arg("tag_name", &tag_name).finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_smart_list_tag", args),
            smart_list_ref_id,
            tag_name,
        }
    }

    pub fn update(mut self, ctx: &DomainContext, tag_name: UpdateAction<EntityName>) -> Self {
        let args = ctx.frame().update("tag_name", &tag_name).finish();
        self.tag_name = tag_name.or_else(self.tag_name);
        self.header.record_update(ctx, "update", args);
        self
    }
}

impl Entity for SmartListTag {
    const KIND: &'static str = "smart_list_tag";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.smart_list_ref_id)
    }

    fn display_name(&self) -> String {
        self.tag_name.to_string()
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!(
            "tag:{}:{}",
            self.smart_list_ref_id,
            self.tag_name.as_str().to_lowercase()
        ))
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[refs_many(
            "smart_list_item",
            RefResolver::IsOneOfRefId("tags_ref_id"),
        )];
        LINKS
    }
}

impl CrownEntity for SmartListTag {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartListItem {
    #[serde(skip)]
    pub header: EntityHeader,
    pub smart_list_ref_id: EntityId,
    pub name: EntityName,
    pub is_done: bool,
    pub tags_ref_id: Vec<EntityId>,
    pub url: Option<Url>,
}

impl SmartListItem {
    pub fn new_smart_list_item(
        ctx: &DomainContext,
        smart_list_ref_id: EntityId,
        name: EntityName,
        is_done: bool,
        tags_ref_id: Vec<EntityId>,
        url: Option<Url>,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("name", &name)
            .arg("is_done", &is_done)
            .arg_list("tags_ref_id", &tags_ref_id)
            .arg_opt("url", url.as_ref())
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_smart_list_item", args),
            smart_list_ref_id,
            name,
            is_done,
            tags_ref_id,
            url,
        }
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        name: UpdateAction<EntityName>,
        is_done: UpdateAction<bool>,
        tags_ref_id: UpdateAction<Vec<EntityId>>,
        url: UpdateAction<Option<Url>>,
    ) -> Self {
        let mut frame = ctx
            .frame()
            .update("name", &name)
            .update("is_done", &is_done)
            .update_opt("url", &url);
        if let Some(tags) = tags_ref_id.value() {
            frame = frame.arg_list("tags_ref_id", tags);
        }
        let args = frame.finish();
        self.name = name.or_else(self.name);
        self.is_done = is_done.or_else(self.is_done);
        self.tags_ref_id = tags_ref_id.or_else(self.tags_ref_id);
        self.url = url.or_else(self.url);
        self.header.record_update(ctx, "update", args);
        self
    }

    pub fn without_tag(self, ctx: &DomainContext, tag_ref_id: EntityId) -> Self {
        let tags = self
            .tags_ref_id
            .iter()
            .copied()
            .filter(|tag| *tag != tag_ref_id)
            .collect();
        self.update(
            ctx,
            UpdateAction::DoNothing,
            UpdateAction::DoNothing,
            UpdateAction::change_to(tags),
            UpdateAction::DoNothing,
        )
    }
}

impl Entity for SmartListItem {
    const KIND: &'static str = "smart_list_item";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.smart_list_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        self.tags_ref_id
            .iter()
            .map(|tag| ("tags_ref_id", tag.to_string()))
            .collect()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[note_link!("smart_list_item")];
        LINKS
    }
}

impl CrownEntity for SmartListItem {}
