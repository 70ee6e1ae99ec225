//! Notes attached to other entities.
//!
//! # Invariants
//! - At most one note per `(domain, source_entity_ref_id)`.
//! - Content is markdown; previews are derived, never stored.

use crate::model::framework::entity::{entity_header, simple_trunk, contains_many};
use crate::model::framework::{
    CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityStructure, IndexField,
    InputValidationError, ValidationResult,
};
use crate::model::values::NoteDomain;
use serde::{Deserialize, Serialize};

simple_trunk!(
    NoteCollection("note_collection", workspace_ref_id),
    links = &[contains_many("note")]
);

pub const MAX_NOTE_CONTENT_CHARS: usize = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip)]
    pub header: EntityHeader,
    pub note_collection_ref_id: EntityId,
    pub domain: NoteDomain,
    pub source_entity_ref_id: EntityId,
    pub content: String,
}

fn validate_content(content: &str) -> ValidationResult<()> {
    if content.chars().count() > MAX_NOTE_CONTENT_CHARS {
        return Err(InputValidationError::new(format!(
            "note content is longer than {MAX_NOTE_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

impl Note {
    pub fn new_note(
        ctx: &DomainContext,
        note_collection_ref_id: EntityId,
        domain: NoteDomain,
        source_entity_ref_id: EntityId,
        content: String,
    ) -> ValidationResult<Self> {
        validate_content(&content)?;
        let args = ctx
            .frame()
            .arg("domain", &domain)
            .arg("source_entity_ref_id", &source_entity_ref_id)
            .arg("content", &content)
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_note", args),
            note_collection_ref_id,
            domain,
            source_entity_ref_id,
            content,
        })
    }

    pub fn update_content(mut self, ctx: &DomainContext, content: String) -> ValidationResult<Self> {
        validate_content(&content)?;
        let args = ctx.frame().arg("content", &content).finish();
        self.content = content;
        self.header.record_update(ctx, "update_content", args);
        Ok(self)
    }
}

impl Entity for Note {
    const KIND: &'static str = "note";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.note_collection_ref_id)
    }

    fn display_name(&self) -> String {
        crate::service::note_service::plain_preview(&self.content, 80)
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![
            ("domain", self.domain.to_string()),
            ("source_entity_ref_id", self.source_entity_ref_id.to_string()),
        ]
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("note:{}:{}", self.domain, self.source_entity_ref_id))
    }
}

impl CrownEntity for Note {}

/// Link filter for a note attached to one domain.
macro_rules! note_link {
    ($domain:literal) => {
        $crate::model::framework::entity::owns_at_most_one(
            "note",
            $crate::model::framework::entity::RefResolver::IsRefId("source_entity_ref_id"),
        )
        .with_filters(&[("domain", $domain)])
    };
}

pub(crate) use note_link;
