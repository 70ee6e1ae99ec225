//! Vacations: date ranges during which non-mandatory generation pauses.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_one, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, InputValidationError, UpdateAction, ValidationResult,
};
use crate::model::note::note_link;
use serde::{Deserialize, Serialize};

simple_trunk!(
    VacationCollection("vacation_collection", workspace_ref_id),
    links = &[contains_many("vacation")]
);

fn check_range(start_date: ADate, end_date: ADate) -> ValidationResult<()> {
    if end_date < start_date {
        return Err(InputValidationError::new(
            "vacation end date must not be before its start date",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vacation {
    #[serde(skip)]
    pub header: EntityHeader,
    pub vacation_collection_ref_id: EntityId,
    pub name: EntityName,
    pub start_date: ADate,
    pub end_date: ADate,
}

impl Vacation {
    pub fn new_vacation(
        ctx: &DomainContext,
        vacation_collection_ref_id: EntityId,
        name: EntityName,
        start_date: ADate,
        end_date: ADate,
    ) -> ValidationResult<Self> {
        check_range(start_date, end_date)?;
        let args = ctx
            .frame()
            .arg("name", &name)
            .arg("start_date", &start_date)
            .arg("end_date", &end_date)
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_vacation", args),
            vacation_collection_ref_id,
            name,
            start_date,
            end_date,
        })
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        name: UpdateAction<EntityName>,
        start_date: UpdateAction<ADate>,
        end_date: UpdateAction<ADate>,
    ) -> ValidationResult<Self> {
        let next_start = start_date.clone().or_else(self.start_date);
        let next_end = end_date.clone().or_else(self.end_date);
        check_range(next_start, next_end)?;
        let args = ctx
            .frame()
            .update("name", &name)
            .update("start_date", &start_date)
            .update("end_date", &end_date)
            .finish();
        self.name = name.or_else(self.name);
        self.start_date = next_start;
        self.end_date = next_end;
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    pub fn covers(&self, date: ADate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Whether the whole `[first, last]` interval is inside the vacation.
    pub fn covers_range(&self, first: ADate, last: ADate) -> bool {
        self.start_date <= first && last <= self.end_date
    }

    pub fn duration_days(&self) -> i64 {
        self.start_date.days_until(self.end_date) + 1
    }
}

impl Entity for Vacation {
    const KIND: &'static str = "vacation";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.vacation_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_one("time_event_full_days_block", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("namespace", "vacation")]),
            note_link!("vacation"),
        ];
        LINKS
    }
}

impl CrownEntity for Vacation {}
