//! Notes owned by other entities.
//!
//! # Responsibility
//! - Create, update and load the note attached to a source entity.
//! - Derive the plain-text preview used as a note's display name.
//!
//! # Invariants
//! - At most one note exists per `(domain, source_entity_ref_id)`.
//! - Archiving or removing the source cascades to its note through `note_link!`.

use crate::model::framework::{EntityId, InputValidationError};
use crate::model::note::{Note, NoteCollection};
use crate::model::values::NoteDomain;
use crate::repo::{EntityRepository, RefFilter, TrunkEntityRepository};
use crate::service::{ServiceError, ServiceResult, ServiceScope};
use once_cell::sync::Lazy;
use regex::Regex;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Markdown stripped to plain text, whitespace collapsed, at most `max_chars` chars.
pub fn plain_preview(content: &str, max_chars: usize) -> String {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return "empty note".to_string();
    }
    trimmed.chars().take(max_chars).collect()
}

/// Loads the live note of a source entity, if any.
pub fn load_for_source(
    scope: ServiceScope<'_, '_>,
    domain: NoteDomain,
    source_entity_ref_id: EntityId,
) -> ServiceResult<Option<Note>> {
    let notes = scope.uow.get_for::<Note>().find_all_generic(
        None,
        false,
        &[
            RefFilter::eq("domain", domain),
            RefFilter::eq("source_entity_ref_id", source_entity_ref_id),
        ],
    )?;
    Ok(notes.into_iter().next())
}

/// Creates the note for a source entity.
///
/// # Errors
/// - `InvariantViolation` when the source already has a note.
pub fn create_note(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    domain: NoteDomain,
    source_entity_ref_id: EntityId,
    content: String,
) -> ServiceResult<Note> {
    let collection = scope
        .uow
        .get_for::<NoteCollection>()
        .load_by_parent(workspace_ref_id)?;
    let note = Note::new_note(
        scope.ctx,
        collection.header.ref_id,
        domain,
        source_entity_ref_id,
        content,
    )?;
    let repo = scope.uow.get_for::<Note>();
    if let Some(key) = crate::model::framework::Entity::unique_key(&note) {
        if repo.load_by_unique_key(&key)?.is_some() {
            return Err(ServiceError::invariant(format!(
                "{domain} {source_entity_ref_id} already has a note"
            )));
        }
    }
    let note = repo.create(note)?;
    scope.reporter.mark_created(&note);
    Ok(note)
}

/// Replaces the content of an existing note.
pub fn update_note(
    scope: ServiceScope<'_, '_>,
    note_ref_id: EntityId,
    content: String,
) -> ServiceResult<Note> {
    let repo = scope.uow.get_for::<Note>();
    let note = repo.load_by_id(note_ref_id, false)?;
    let note = repo.save(note.update_content(scope.ctx, content)?)?;
    scope.reporter.mark_updated(&note);
    Ok(note)
}

/// Creates the note when missing, otherwise replaces its content.
pub fn upsert_for_source(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    domain: NoteDomain,
    source_entity_ref_id: EntityId,
    content: String,
) -> ServiceResult<Note> {
    match load_for_source(scope, domain, source_entity_ref_id)? {
        Some(note) => update_note(scope, note.header.ref_id, content),
        None => create_note(scope, workspace_ref_id, domain, source_entity_ref_id, content),
    }
}

/// Rejects blank content for note kinds that must say something.
pub fn require_content(content: &str) -> ServiceResult<()> {
    if content.trim().is_empty() {
        return Err(InputValidationError::new("note content must not be blank").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{create_note, load_for_source, plain_preview, upsert_for_source};
    use crate::model::framework::EntityId;
    use crate::model::note::NoteCollection;
    use crate::model::values::NoteDomain;
    use crate::repo::EntityRepository;
    use crate::service::test_support::{ctx_at, domain_conn, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    #[test]
    fn preview_strips_markdown_and_limits_length() {
        let text = plain_preview("# title\n\n- [link](https://example.com)\n**bold** `code`", 100);
        assert_eq!(text, "title link bold code");
        assert_eq!(plain_preview("![x](a.png)", 10), "empty note");
        assert_eq!(plain_preview("abcdefghij", 4), "abcd");
    }

    #[test]
    fn one_note_per_source() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-06-01T08:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let workspace = EntityId::from_raw(1);
        uow.get_for::<NoteCollection>()
            .create(NoteCollection::new(&ctx, workspace))
            .expect("collection");

        let source = EntityId::from_raw(42);
        create_note(scope, workspace, NoteDomain::Doc, source, "first".into()).expect("note");
        assert!(matches!(
            create_note(scope, workspace, NoteDomain::Doc, source, "again".into()),
            Err(ServiceError::InvariantViolation(_))
        ));

        let updated = upsert_for_source(scope, workspace, NoteDomain::Doc, source, "second".into())
            .expect("upsert");
        assert_eq!(updated.content, "second");
        assert_eq!(updated.header.version, 2);
        let loaded = load_for_source(scope, NoteDomain::Doc, source)
            .expect("load")
            .expect("present");
        assert_eq!(loaded.header.ref_id, updated.header.ref_id);
        assert!(load_for_source(scope, NoteDomain::Habit, source)
            .expect("load")
            .is_none());
    }
}
