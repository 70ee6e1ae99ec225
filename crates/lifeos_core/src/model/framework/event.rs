//! Entity events and the lifecycle header every entity carries.
//!
//! # Invariants
//! - `version` equals the number of events ever emitted for the entity.
//! - `archived`, `archived_time` and `archival_reason` are set together.
//! - Events are appended, never rewritten.

use crate::model::framework::base::{EntityId, Timestamp};
use crate::model::framework::context::{DomainContext, EventSource, FrameArgs};
use crate::model::framework::enum_value::enum_value;
use serde::{Deserialize, Serialize};

enum_value! {
    pub enum EventKind("event_kind") {
        Created => "created",
        Updated => "updated",
        Archived => "archived",
    }
}

enum_value! {
    /// Why an entity was archived.
    pub enum ArchivalReason("archival_reason") {
        User => "user",
        Gc => "gc",
        Gen => "gen",
        Sync => "sync",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEvent {
    pub source: EventSource,
    pub owner_version: i64,
    pub timestamp: Timestamp,
    pub kind: EventKind,
    pub name: String,
    pub frame_args: FrameArgs,
}

/// Identity and lifecycle fields shared by all entities.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityHeader {
    pub ref_id: EntityId,
    pub version: i64,
    pub archived: bool,
    pub archival_reason: Option<ArchivalReason>,
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
    pub archived_time: Option<Timestamp>,
    pending_events: Vec<EntityEvent>,
}

impl Default for EntityHeader {
    fn default() -> Self {
        let epoch = Timestamp::from_unix_seconds(0).unwrap_or_else(Timestamp::now);
        Self {
            ref_id: EntityId::NEW,
            version: 0,
            archived: false,
            archival_reason: None,
            created_time: epoch,
            last_modified_time: epoch,
            archived_time: None,
            pending_events: Vec::new(),
        }
    }
}

impl EntityHeader {
    /// Header of a freshly constructed entity: version 1 with one `Created` event.
    pub fn new_created(ctx: &DomainContext, name: &str, frame_args: FrameArgs) -> Self {
        let mut header = Self {
            ref_id: EntityId::NEW,
            version: 0,
            archived: false,
            archival_reason: None,
            created_time: ctx.action_timestamp,
            last_modified_time: ctx.action_timestamp,
            archived_time: None,
            pending_events: Vec::new(),
        };
        header.push_event(ctx, EventKind::Created, name, frame_args);
        header
    }

    /// Rebuilds a header from persisted columns; no pending events.
    pub fn hydrate(
        ref_id: EntityId,
        version: i64,
        archived: bool,
        archival_reason: Option<ArchivalReason>,
        created_time: Timestamp,
        last_modified_time: Timestamp,
        archived_time: Option<Timestamp>,
    ) -> Self {
        Self {
            ref_id,
            version,
            archived,
            archival_reason,
            created_time,
            last_modified_time,
            archived_time,
            pending_events: Vec::new(),
        }
    }

    pub fn record_update(&mut self, ctx: &DomainContext, name: &str, frame_args: FrameArgs) {
        self.last_modified_time = ctx.action_timestamp;
        self.push_event(ctx, EventKind::Updated, name, frame_args);
    }

    /// Returns `false` when the entity was already archived.
    pub fn record_archive(&mut self, ctx: &DomainContext, reason: ArchivalReason) -> bool {
        if self.archived {
            return false;
        }
        self.archived = true;
        self.archival_reason = Some(reason);
        self.archived_time = Some(ctx.action_timestamp);
        self.last_modified_time = ctx.action_timestamp;
        let args = ctx.frame().arg("archival_reason", &reason).finish();
        self.push_event(ctx, EventKind::Archived, "mark_archived", args);
        true
    }

    /// Replaces the reason of an already archived header; `false` when live or unchanged.
    pub fn restamp_archival(&mut self, ctx: &DomainContext, reason: ArchivalReason) -> bool {
        if !self.archived || self.archival_reason == Some(reason) {
            return false;
        }
        self.archival_reason = Some(reason);
        self.last_modified_time = ctx.action_timestamp;
        let args = ctx.frame().arg("archival_reason", &reason).finish();
        self.push_event(ctx, EventKind::Archived, "restamp_archival", args);
        true
    }

    pub fn pending_events(&self) -> &[EntityEvent] {
        &self.pending_events
    }

    pub fn take_pending_events(&mut self) -> Vec<EntityEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Version of the row this entity was loaded from.
    pub fn persisted_version(&self) -> i64 {
        self.version - self.pending_events.len() as i64
    }

    fn push_event(&mut self, ctx: &DomainContext, kind: EventKind, name: &str, frame_args: FrameArgs) {
        self.version += 1;
        self.pending_events.push(EntityEvent {
            source: ctx.source,
            owner_version: self.version,
            timestamp: ctx.action_timestamp,
            kind,
            name: name.to_string(),
            frame_args,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchivalReason, EntityHeader, EventKind};
    use crate::model::framework::base::Timestamp;
    use crate::model::framework::context::{DomainContext, EventSource};
    use crate::model::framework::realm::RealmCodecRegistry;
    use std::sync::Arc;

    fn ctx() -> DomainContext {
        let mut codecs = RealmCodecRegistry::new();
        codecs
            .register::<ArchivalReason>()
            .expect("register archival reason");
        DomainContext::new(
            EventSource::Cli,
            "2024-06-01T08:00:00Z".parse::<Timestamp>().expect("timestamp"),
            Arc::new(codecs),
        )
    }

    #[test]
    fn version_tracks_event_count() {
        let ctx = ctx();
        let mut header = EntityHeader::new_created(&ctx, "new", Default::default());
        header.record_update(&ctx, "update", Default::default());
        assert_eq!(header.version, 2);
        assert_eq!(header.pending_events().len(), 2);
        assert_eq!(header.pending_events()[1].kind, EventKind::Updated);
        assert_eq!(header.persisted_version(), 0);
    }

    #[test]
    fn archive_is_idempotent() {
        let ctx = ctx();
        let mut header = EntityHeader::new_created(&ctx, "new", Default::default());
        assert!(header.record_archive(&ctx, ArchivalReason::User));
        assert!(!header.record_archive(&ctx, ArchivalReason::Gc));
        assert_eq!(header.archival_reason, Some(ArchivalReason::User));
        assert_eq!(header.archived_time, Some(ctx.action_timestamp));
        assert_eq!(header.version, 2);
    }

    #[test]
    fn restamp_only_touches_archived_headers_with_another_reason() {
        let ctx = ctx();
        let mut header = EntityHeader::new_created(&ctx, "new", Default::default());
        assert!(!header.restamp_archival(&ctx, ArchivalReason::User));
        header.record_archive(&ctx, ArchivalReason::Gc);
        assert!(!header.restamp_archival(&ctx, ArchivalReason::Gc));
        assert!(header.restamp_archival(&ctx, ArchivalReason::User));
        assert_eq!(header.archival_reason, Some(ArchivalReason::User));
        assert_eq!(header.version, 3);
    }
}
