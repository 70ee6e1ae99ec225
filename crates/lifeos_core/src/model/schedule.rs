//! Calendar streams, their events, and the external sync log.
//!
//! # Responsibility
//! - Model user-owned and externally sourced schedule streams.
//! - Hold in-day and full-days events; their placement lives in time blocks.
//! - Record every external sync run.
//!
//! # Invariants
//! - External streams are read-only in name and color.
//! - Events of external streams are only changed by sync.
//!
//! # See also
//! - `service::schedule_service` for the last-user-stream rule.
//! - `sync` for the iCal ingestion.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, owns_one, simple_trunk, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, EventSource, IndexField, InputValidationError, Timestamp, UpdateAction,
    ValidationResult,
};
use crate::model::note::note_link;
use crate::model::run_log::EntitySummary;
use crate::model::values::{ScheduleSource, ScheduleStreamColor, Url};
use serde::{Deserialize, Serialize};

simple_trunk!(
    ScheduleDomain("schedule_domain", workspace_ref_id),
    links = &[contains_many("schedule_stream")]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStream {
    #[serde(skip)]
    pub header: EntityHeader,
    pub schedule_domain_ref_id: EntityId,
    pub source: ScheduleSource,
    pub name: EntityName,
    pub color: ScheduleStreamColor,
    pub source_ical_url: Option<Url>,
    pub last_synced_time: Option<Timestamp>,
}

impl ScheduleStream {
    pub fn new_for_user(
        ctx: &DomainContext,
        schedule_domain_ref_id: EntityId,
        name: EntityName,
        color: ScheduleStreamColor,
    ) -> Self {
        let args = ctx.frame().arg("name", &name).arg("color", &color).finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_schedule_stream_for_user", args),
            schedule_domain_ref_id,
            source: ScheduleSource::User,
            name,
            color,
            source_ical_url: None,
            last_synced_time: None,
        }
    }

    pub fn new_for_external_ical(
        ctx: &DomainContext,
        schedule_domain_ref_id: EntityId,
        name: EntityName,
        color: ScheduleStreamColor,
        source_ical_url: Url,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("name", &name)
            .arg("color", &color)
            .arg("source_ical_url", &source_ical_url)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_schedule_stream_for_external_ical", args),
            schedule_domain_ref_id,
            source: ScheduleSource::ExternalIcal,
            name,
            color,
            source_ical_url: Some(source_ical_url),
            last_synced_time: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.source == ScheduleSource::ExternalIcal
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        name: UpdateAction<EntityName>,
        color: UpdateAction<ScheduleStreamColor>,
    ) -> ValidationResult<Self> {
        if self.is_external() && (name.should_change() || color.should_change()) {
            return Err(InputValidationError::new(
                "an externally sourced schedule stream cannot be renamed or recolored",
            ));
        }
        let args = ctx.frame().update("name", &name).update("color", &color).finish();
        self.name = name.or_else(self.name);
        self.color = color.or_else(self.color);
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    pub fn mark_synced(mut self, ctx: &DomainContext) -> Self {
        self.last_synced_time = Some(ctx.action_timestamp);
        self.header.record_update(ctx, "mark_synced", ctx.frame().finish());
        self
    }
}

impl Entity for ScheduleStream {
    const KIND: &'static str = "schedule_stream";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.schedule_domain_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![("source", self.source.to_string())]
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("schedule_event_in_day", RefResolver::Parent),
            owns_many("schedule_event_full_days", RefResolver::Parent),
            note_link!("schedule_stream"),
        ];
        LINKS
    }
}

impl CrownEntity for ScheduleStream {}

fn check_user_editable(source: ScheduleSource, what: &str) -> ValidationResult<()> {
    if source == ScheduleSource::ExternalIcal {
        return Err(InputValidationError::new(format!(
            "an externally sourced {what} can only be changed by sync"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEventInDay {
    #[serde(skip)]
    pub header: EntityHeader,
    pub schedule_stream_ref_id: EntityId,
    pub source: ScheduleSource,
    pub name: EntityName,
    pub external_uid: Option<String>,
}

impl ScheduleEventInDay {
    pub fn new_event(
        ctx: &DomainContext,
        schedule_stream_ref_id: EntityId,
        source: ScheduleSource,
        name: EntityName,
        external_uid: Option<String>,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("source", &source)
            .arg("name", &name)
            .arg_opt("external_uid", external_uid.as_ref())
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_schedule_event_in_day", args),
            schedule_stream_ref_id,
            source,
            name,
            external_uid,
        }
    }

    pub fn update(mut self, ctx: &DomainContext, name: UpdateAction<EntityName>) -> ValidationResult<Self> {
        check_user_editable(self.source, "event")?;
        let args = ctx.frame().update("name", &name).finish();
        self.name = name.or_else(self.name);
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    pub fn update_from_sync(mut self, ctx: &DomainContext, name: EntityName) -> Self {
        let args = ctx.frame().arg("name", &name).finish();
        self.name = name;
        self.header.record_update(ctx, "update_from_sync", args);
        self
    }
}

impl Entity for ScheduleEventInDay {
    const KIND: &'static str = "schedule_event_in_day";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.schedule_stream_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        self.external_uid
            .iter()
            .map(|uid| ("external_uid", uid.clone()))
            .collect()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_one("time_event_in_day_block", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("namespace", "schedule_event_in_day")]),
            note_link!("schedule_event_in_day"),
        ];
        LINKS
    }
}

impl CrownEntity for ScheduleEventInDay {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEventFullDays {
    #[serde(skip)]
    pub header: EntityHeader,
    pub schedule_stream_ref_id: EntityId,
    pub source: ScheduleSource,
    pub name: EntityName,
    pub external_uid: Option<String>,
}

impl ScheduleEventFullDays {
    pub fn new_event(
        ctx: &DomainContext,
        schedule_stream_ref_id: EntityId,
        source: ScheduleSource,
        name: EntityName,
        external_uid: Option<String>,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("source", &source)
            .arg("name", &name)
            .arg_opt("external_uid", external_uid.as_ref())
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_schedule_event_full_days", args),
            schedule_stream_ref_id,
            source,
            name,
            external_uid,
        }
    }

    pub fn update(mut self, ctx: &DomainContext, name: UpdateAction<EntityName>) -> ValidationResult<Self> {
        check_user_editable(self.source, "event")?;
        let args = ctx.frame().update("name", &name).finish();
        self.name = name.or_else(self.name);
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }

    pub fn update_from_sync(mut self, ctx: &DomainContext, name: EntityName) -> Self {
        let args = ctx.frame().arg("name", &name).finish();
        self.name = name;
        self.header.record_update(ctx, "update_from_sync", args);
        self
    }
}

impl Entity for ScheduleEventFullDays {
    const KIND: &'static str = "schedule_event_full_days";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.schedule_stream_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        self.external_uid
            .iter()
            .map(|uid| ("external_uid", uid.clone()))
            .collect()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_one("time_event_full_days_block", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("namespace", "schedule_full_days_event")]),
            note_link!("schedule_event_full_days"),
        ];
        LINKS
    }
}

impl CrownEntity for ScheduleEventFullDays {}

simple_trunk!(
    ScheduleExternalSyncLog("schedule_external_sync_log", workspace_ref_id),
    links = &[contains_many("schedule_external_sync_log_entry")]
);

/// Outcome of syncing one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSyncResult {
    pub schedule_stream_ref_id: EntityId,
    pub success: bool,
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleExternalSyncLogEntry {
    #[serde(skip)]
    pub header: EntityHeader,
    pub schedule_external_sync_log_ref_id: EntityId,
    pub source: EventSource,
    pub today: ADate,
    pub sync_even_if_not_modified: bool,
    pub filter_schedule_stream_ref_ids: Option<Vec<EntityId>>,
    pub opened: bool,
    pub per_stream_results: Vec<StreamSyncResult>,
    pub entity_records: Vec<EntitySummary>,
    pub closed_time: Option<Timestamp>,
}

impl ScheduleExternalSyncLogEntry {
    pub fn new_log_entry(
        ctx: &DomainContext,
        schedule_external_sync_log_ref_id: EntityId,
        today: ADate,
        sync_even_if_not_modified: bool,
        filter_schedule_stream_ref_ids: Option<Vec<EntityId>>,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("today", &today)
            .arg("sync_even_if_not_modified", &sync_even_if_not_modified)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_schedule_external_sync_log_entry", args),
            schedule_external_sync_log_ref_id,
            source: ctx.source,
            today,
            sync_even_if_not_modified,
            filter_schedule_stream_ref_ids,
            opened: true,
            per_stream_results: Vec::new(),
            entity_records: Vec::new(),
            closed_time: None,
        }
    }

    /// Appends a stream outcome and the entities it touched.
    pub fn add_stream_result(
        mut self,
        ctx: &DomainContext,
        result: StreamSyncResult,
        touched: Vec<EntitySummary>,
    ) -> ValidationResult<Self> {
        if !self.opened {
            return Err(InputValidationError::new("sync log entry is already closed"));
        }
        let args = ctx
            .frame()
            .arg("schedule_stream_ref_id", &result.schedule_stream_ref_id)
            .arg("success", &result.success)
            .arg_list("entity_records", &touched)
            .finish();
        self.per_stream_results.push(result);
        self.entity_records.extend(touched);
        self.header.record_update(ctx, "add_stream_result", args);
        Ok(self)
    }

    pub fn close(mut self, ctx: &DomainContext) -> ValidationResult<Self> {
        if !self.opened {
            return Err(InputValidationError::new("sync log entry is already closed"));
        }
        self.opened = false;
        self.closed_time = Some(ctx.action_timestamp);
        self.header.record_update(ctx, "close", ctx.frame().finish());
        Ok(self)
    }
}

impl Entity for ScheduleExternalSyncLogEntry {
    const KIND: &'static str = "schedule_external_sync_log_entry";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.schedule_external_sync_log_ref_id)
    }
}

impl CrownEntity for ScheduleExternalSyncLogEntry {}

#[cfg(test)]
mod tests {
    use super::ScheduleStream;
    use crate::model::framework::{DomainContext, EntityId, EventSource, Timestamp, UpdateAction};
    use crate::model::values::{standard_registry, ScheduleStreamColor};
    use std::sync::Arc;

    #[test]
    fn external_streams_keep_their_name_and_color() {
        let ctx = DomainContext::new(
            EventSource::Web,
            "2024-03-04T09:00:00Z".parse::<Timestamp>().expect("timestamp"),
            Arc::new(standard_registry().expect("registry")),
        );
        let stream = ScheduleStream::new_for_external_ical(
            &ctx,
            EntityId::from_raw(4),
            "Holidays".parse().expect("name"),
            ScheduleStreamColor::Green,
            "https://example.com/h.ics".parse().expect("url"),
        );
        assert!(stream
            .clone()
            .update(&ctx, UpdateAction::DoNothing, UpdateAction::change_to(ScheduleStreamColor::Red))
            .is_err());
        let touched = stream
            .update(&ctx, UpdateAction::DoNothing, UpdateAction::DoNothing)
            .expect("no-op edit");
        assert_eq!(touched.header.version, 2);
    }
}
