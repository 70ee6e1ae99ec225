//! Chores: recurring obligations with an optional active window.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, IndexField, InputValidationError, UpdateAction, ValidationResult,
};
use crate::model::note::note_link;
use crate::model::values::RecurringTaskGenParams;
use serde::{Deserialize, Serialize};

simple_trunk!(
    ChoreCollection("chore_collection", workspace_ref_id),
    links = &[contains_many("chore")]
);

fn check_window(start_at_date: ADate, end_at_date: Option<ADate>) -> ValidationResult<()> {
    if let Some(end) = end_at_date {
        if end < start_at_date {
            return Err(InputValidationError::new(
                "chore end date must not be before its start date",
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chore {
    #[serde(skip)]
    pub header: EntityHeader,
    pub chore_collection_ref_id: EntityId,
    pub project_ref_id: EntityId,
    pub name: EntityName,
    pub is_key: bool,
    pub gen_params: RecurringTaskGenParams,
    pub suspended: bool,
    /// Generated even during vacations.
    pub must_do: bool,
    pub start_at_date: ADate,
    pub end_at_date: Option<ADate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreUpdate {
    pub project_ref_id: UpdateAction<EntityId>,
    pub name: UpdateAction<EntityName>,
    pub is_key: UpdateAction<bool>,
    pub gen_params: UpdateAction<RecurringTaskGenParams>,
    pub must_do: UpdateAction<bool>,
    pub start_at_date: UpdateAction<ADate>,
    pub end_at_date: UpdateAction<Option<ADate>>,
}

impl Chore {
    #[allow(clippy::too_many_arguments)]
    pub fn new_chore(
        ctx: &DomainContext,
        chore_collection_ref_id: EntityId,
        project_ref_id: EntityId,
        name: EntityName,
        is_key: bool,
        gen_params: RecurringTaskGenParams,
        must_do: bool,
        start_at_date: Option<ADate>,
        end_at_date: Option<ADate>,
    ) -> ValidationResult<Self> {
        let start_at_date = start_at_date.unwrap_or_else(|| ctx.action_timestamp.date());
        check_window(start_at_date, end_at_date)?;
        let args = ctx
            .frame()
            .arg("project_ref_id", &project_ref_id)
            .arg("name", &name)
            .arg("is_key", &is_key)
            .arg("gen_params", &gen_params)
            .arg("must_do", &must_do)
            .arg("start_at_date", &start_at_date)
            .arg_opt("end_at_date", end_at_date.as_ref())
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_chore", args),
            chore_collection_ref_id,
            project_ref_id,
            name,
            is_key,
            gen_params,
            suspended: false,
            must_do,
            start_at_date,
            end_at_date,
        })
    }

    pub fn update(mut self, ctx: &DomainContext, update: ChoreUpdate) -> ValidationResult<Self> {
        let start_at_date = update.start_at_date.clone().or_else(self.start_at_date);
        let end_at_date = update.end_at_date.clone().or_else(self.end_at_date);
        check_window(start_at_date, end_at_date)?;
        let args = ctx
            .frame()
            .update("project_ref_id", &update.project_ref_id)
            .update("name", &update.name)
            .update("is_key", &update.is_key)
            .update("gen_params", &update.gen_params)
            .update("must_do", &update.must_do)
            .update("start_at_date", &update.start_at_date)
            .update_opt("end_at_date", &update.end_at_date)
            .finish();
        self.project_ref_id = update.project_ref_id.or_else(self.project_ref_id);
        self.name = update.name.or_else(self.name);
        self.is_key = update.is_key.or_else(self.is_key);
        self.gen_params = update.gen_params.or_else(self.gen_params);
        self.must_do = update.must_do.or_else(self.must_do);
        self.start_at_date = start_at_date;
        self.end_at_date = end_at_date;
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    pub fn suspend(mut self, ctx: &DomainContext) -> ValidationResult<Self> {
        if self.suspended {
            return Err(InputValidationError::new("chore is already suspended"));
        }
        self.suspended = true;
        self.header.record_update(ctx, "suspend", Default::default());
        Ok(self)
    }

    pub fn unsuspend(mut self, ctx: &DomainContext) -> ValidationResult<Self> {
        if !self.suspended {
            return Err(InputValidationError::new("chore is not suspended"));
        }
        self.suspended = false;
        self.header.record_update(ctx, "unsuspend", Default::default());
        Ok(self)
    }

    /// Whether `date` lies inside the chore's active window.
    pub fn is_active_on(&self, date: ADate) -> bool {
        date >= self.start_at_date && self.end_at_date.map_or(true, |end| date <= end)
    }
}

impl Entity for Chore {
    const KIND: &'static str = "chore";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.chore_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![("project_ref_id", self.project_ref_id.to_string())]
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("inbox_task", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("source", "chore")]),
            note_link!("chore"),
        ];
        LINKS
    }
}

impl CrownEntity for Chore {}
