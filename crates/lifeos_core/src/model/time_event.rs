//! Time blocks that place tasks, events and birthdays on the calendar.
//!
//! # Invariants
//! - A block is owned by exactly one `(namespace, source entity)` pair.
//! - In-day blocks last between 1 minute and one day.
//! - Full-days blocks last at least one day.

use crate::model::framework::entity::{contains_many, entity_header, simple_trunk};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityStructure,
    IndexField, InputValidationError, UpdateAction, ValidationResult,
};
use crate::model::values::{TimeEventFullDaysNamespace, TimeEventInDayNamespace, TimeInDay};
use serde::{Deserialize, Serialize};

simple_trunk!(
    TimeEventDomain("time_event_domain", workspace_ref_id),
    links = &[
        contains_many("time_event_in_day_block"),
        contains_many("time_event_full_days_block"),
    ]
);

const MAX_IN_DAY_MINS: u32 = 24 * 60;

fn check_in_day_duration(duration_mins: u32) -> ValidationResult<()> {
    if duration_mins == 0 || duration_mins > MAX_IN_DAY_MINS {
        return Err(InputValidationError::new(format!(
            "in-day duration must be between 1 and {MAX_IN_DAY_MINS} minutes, got {duration_mins}"
        )));
    }
    Ok(())
}

fn check_full_days_duration(duration_days: u32) -> ValidationResult<()> {
    if duration_days == 0 {
        return Err(InputValidationError::new("full-days duration must be at least one day"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEventInDayBlock {
    #[serde(skip)]
    pub header: EntityHeader,
    pub time_event_domain_ref_id: EntityId,
    pub namespace: TimeEventInDayNamespace,
    pub source_entity_ref_id: EntityId,
    pub start_date: ADate,
    pub start_time_in_day: TimeInDay,
    pub duration_mins: u32,
}

impl TimeEventInDayBlock {
    pub fn new_block(
        ctx: &DomainContext,
        time_event_domain_ref_id: EntityId,
        namespace: TimeEventInDayNamespace,
        source_entity_ref_id: EntityId,
        start_date: ADate,
        start_time_in_day: TimeInDay,
        duration_mins: u32,
    ) -> ValidationResult<Self> {
        check_in_day_duration(duration_mins)?;
        let args = ctx
            .frame()
            .arg("namespace", &namespace)
            .arg("source_entity_ref_id", &source_entity_ref_id)
            .arg("start_date", &start_date)
            .arg("start_time_in_day", &start_time_in_day)
            .arg("duration_mins", &duration_mins)
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_time_event_in_day_block", args),
            time_event_domain_ref_id,
            namespace,
            source_entity_ref_id,
            start_date,
            start_time_in_day,
            duration_mins,
        })
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        start_date: UpdateAction<ADate>,
        start_time_in_day: UpdateAction<TimeInDay>,
        duration_mins: UpdateAction<u32>,
    ) -> ValidationResult<Self> {
        let next_duration = duration_mins.clone().or_else(self.duration_mins);
        check_in_day_duration(next_duration)?;
        let args = ctx
            .frame()
            .update("start_date", &start_date)
            .update("start_time_in_day", &start_time_in_day)
            .update("duration_mins", &duration_mins)
            .finish();
        self.start_date = start_date.or_else(self.start_date);
        self.start_time_in_day = start_time_in_day.or_else(self.start_time_in_day);
        self.duration_mins = next_duration;
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }
}

impl Entity for TimeEventInDayBlock {
    const KIND: &'static str = "time_event_in_day_block";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.time_event_domain_ref_id)
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![
            ("namespace", self.namespace.to_string()),
            ("source_entity_ref_id", self.source_entity_ref_id.to_string()),
            ("start_date", self.start_date.to_string()),
        ]
    }
}

impl CrownEntity for TimeEventInDayBlock {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEventFullDaysBlock {
    #[serde(skip)]
    pub header: EntityHeader,
    pub time_event_domain_ref_id: EntityId,
    pub namespace: TimeEventFullDaysNamespace,
    pub source_entity_ref_id: EntityId,
    pub start_date: ADate,
    pub duration_days: u32,
}

impl TimeEventFullDaysBlock {
    pub fn new_block(
        ctx: &DomainContext,
        time_event_domain_ref_id: EntityId,
        namespace: TimeEventFullDaysNamespace,
        source_entity_ref_id: EntityId,
        start_date: ADate,
        duration_days: u32,
    ) -> ValidationResult<Self> {
        check_full_days_duration(duration_days)?;
        let args = ctx
            .frame()
            .arg("namespace", &namespace)
            .arg("source_entity_ref_id", &source_entity_ref_id)
            .arg("start_date", &start_date)
            .arg("duration_days", &duration_days)
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_time_event_full_days_block", args),
            time_event_domain_ref_id,
            namespace,
            source_entity_ref_id,
            start_date,
            duration_days,
        })
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        start_date: UpdateAction<ADate>,
        duration_days: UpdateAction<u32>,
    ) -> ValidationResult<Self> {
        let next_duration = duration_days.clone().or_else(self.duration_days);
        check_full_days_duration(next_duration)?;
        let args = ctx
            .frame()
            .update("start_date", &start_date)
            .update("duration_days", &duration_days)
            .finish();
        self.start_date = start_date.or_else(self.start_date);
        self.duration_days = next_duration;
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    pub fn end_date(&self) -> ADate {
        self.start_date.add_days(i64::from(self.duration_days) - 1)
    }
}

impl Entity for TimeEventFullDaysBlock {
    const KIND: &'static str = "time_event_full_days_block";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.time_event_domain_ref_id)
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![
            ("namespace", self.namespace.to_string()),
            ("source_entity_ref_id", self.source_entity_ref_id.to_string()),
        ]
    }
}

impl CrownEntity for TimeEventFullDaysBlock {}
