//! Per-invocation collector of entity changes.
//!
//! # Invariants
//! - One reporter belongs to exactly one use-case invocation.
//! - Only searchable kinds contribute search changes; every kind is counted.
//! - Nothing leaves the reporter before the unit of work commits.

use crate::model::framework::{Entity, EntityId};
use crate::search::{SearchChange, SearchEntry};
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Archived,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityChange {
    pub change: ChangeKind,
    pub entity_kind: &'static str,
    pub ref_id: EntityId,
}

#[derive(Debug, Default)]
pub struct ProgressReporter {
    changes: RefCell<Vec<EntityChange>>,
    search: RefCell<Vec<SearchChange>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_created<E: Entity>(&self, entity: &E) {
        self.record(ChangeKind::Created, entity);
        self.push_upsert(entity);
    }

    pub fn mark_updated<E: Entity>(&self, entity: &E) {
        self.record(ChangeKind::Updated, entity);
        self.push_upsert(entity);
    }

    pub fn mark_archived<E: Entity>(&self, entity: &E) {
        self.record(ChangeKind::Archived, entity);
        self.push_remove::<E>(entity.ref_id());
    }

    pub fn mark_removed<E: Entity>(&self, entity: &E) {
        self.record(ChangeKind::Removed, entity);
        self.push_remove::<E>(entity.ref_id());
    }

    pub fn changes(&self) -> Vec<EntityChange> {
        self.changes.borrow().clone()
    }

    pub fn count_of(&self, change: ChangeKind, entity_kind: &str) -> usize {
        self.changes
            .borrow()
            .iter()
            .filter(|entry| entry.change == change && entry.entity_kind == entity_kind)
            .count()
    }

    /// Drains pending search changes, keeping the entity change log.
    pub fn take_search_changes(&self) -> Vec<SearchChange> {
        std::mem::take(&mut *self.search.borrow_mut())
    }

    /// Forgets everything collected so far; used when a unit of work rolls back.
    pub fn reset(&self) {
        self.changes.borrow_mut().clear();
        self.search.borrow_mut().clear();
    }

    fn record<E: Entity>(&self, change: ChangeKind, entity: &E) {
        self.changes.borrow_mut().push(EntityChange {
            change,
            entity_kind: E::KIND,
            ref_id: entity.ref_id(),
        });
    }

    fn push_upsert<E: Entity>(&self, entity: &E) {
        if !E::SEARCHABLE {
            return;
        }
        let header = entity.header();
        self.search.borrow_mut().push(SearchChange::Upsert(SearchEntry {
            entity_kind: E::KIND.to_string(),
            ref_id: header.ref_id,
            name: entity.display_name(),
            archived: header.archived,
            created_time: header.created_time,
            last_modified_time: header.last_modified_time,
            archived_time: header.archived_time,
        }));
    }

    fn push_remove<E: Entity>(&self, ref_id: EntityId) {
        if !E::SEARCHABLE {
            return;
        }
        self.search.borrow_mut().push(SearchChange::Remove {
            entity_kind: E::KIND.to_string(),
            ref_id,
        });
    }
}
