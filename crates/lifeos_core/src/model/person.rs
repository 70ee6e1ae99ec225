//! Persons: relationships with catch-up and birthday task streams.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName, EntityStructure,
    TrunkEntity, UpdateAction,
};
use crate::model::note::note_link;
use crate::model::values::{PersonBirthday, PersonRelationship, RecurringTaskGenParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonCollection {
    #[serde(skip)]
    pub header: EntityHeader,
    pub workspace_ref_id: EntityId,
    pub catch_up_project_ref_id: EntityId,
}

impl PersonCollection {
    pub fn new(ctx: &DomainContext, workspace_ref_id: EntityId, catch_up_project_ref_id: EntityId) -> Self {
        let args = ctx
            .frame()
            .arg("workspace_ref_id", &workspace_ref_id)
            .arg("catch_up_project_ref_id", &catch_up_project_ref_id)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_person_collection", args),
            workspace_ref_id,
            catch_up_project_ref_id,
        }
    }

    pub fn change_catch_up_project(mut self, ctx: &DomainContext, project_ref_id: EntityId) -> Self {
        let args = ctx.frame().arg("catch_up_project_ref_id", &project_ref_id).finish();
        self.catch_up_project_ref_id = project_ref_id;
        self.header.record_update(ctx, "change_catch_up_project", args);
        self
    }
}

impl Entity for PersonCollection {
    const KIND: &'static str = "person_collection";
    const STRUCTURE: EntityStructure = EntityStructure::Trunk;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.workspace_ref_id)
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[contains_many("person")];
        LINKS
    }
}

impl TrunkEntity for PersonCollection {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    #[serde(skip)]
    pub header: EntityHeader,
    pub person_collection_ref_id: EntityId,
    pub name: EntityName,
    pub relationship: PersonRelationship,
    pub catch_up_params: Option<RecurringTaskGenParams>,
    pub birthday: Option<PersonBirthday>,
}

impl Person {
    pub fn new_person(
        ctx: &DomainContext,
        person_collection_ref_id: EntityId,
        name: EntityName,
        relationship: PersonRelationship,
        catch_up_params: Option<RecurringTaskGenParams>,
        birthday: Option<PersonBirthday>,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("name", &name)
            .arg("relationship", &relationship)
            .arg_opt("catch_up_params", catch_up_params.as_ref())
            .arg_opt("birthday", birthday.as_ref())
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_person", args),
            person_collection_ref_id,
            name,
            relationship,
            catch_up_params,
            birthday,
        }
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        name: UpdateAction<EntityName>,
        relationship: UpdateAction<PersonRelationship>,
        catch_up_params: UpdateAction<Option<RecurringTaskGenParams>>,
        birthday: UpdateAction<Option<PersonBirthday>>,
    ) -> Self {
        let args = ctx
            .frame()
            .update("name", &name)
            .update("relationship", &relationship)
            .update_opt("catch_up_params", &catch_up_params)
            .update_opt("birthday", &birthday)
            .finish();
        self.name = name.or_else(self.name);
        self.relationship = relationship.or_else(self.relationship);
        self.catch_up_params = catch_up_params.or_else(self.catch_up_params);
        self.birthday = birthday.or_else(self.birthday);
        self.header.record_update(ctx, "update", args);
        self
    }
}

impl Entity for Person {
    const KIND: &'static str = "person";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.person_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("inbox_task", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("source", "person_catch_up")]),
            owns_many("inbox_task", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("source", "person_birthday")]),
            owns_many("time_event_full_days_block", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("namespace", "person_birthday")]),
            note_link!("person"),
        ];
        LINKS
    }
}

impl CrownEntity for Person {}
