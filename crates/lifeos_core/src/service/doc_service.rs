//! Docs: nested documents whose body is a note.
//!
//! # Invariants
//! - A parent doc is live and lives in the same collection.
//! - Archiving or removing a doc takes its sub-docs and their notes along.

use crate::model::doc::{Doc, DocCollection};
use crate::model::framework::{Entity, EntityId, EntityName, UpdateAction};
use crate::model::note::Note;
use crate::model::values::NoteDomain;
use crate::repo::{EntityRepository, RefFilter};
use crate::service::note_service::{create_note, load_for_source};
use crate::service::{ServiceError, ServiceResult, ServiceScope};

/// A doc with its body note.
#[derive(Debug, Clone)]
pub struct DocView {
    pub doc: Doc,
    pub note: Option<Note>,
    pub sub_docs: Vec<Doc>,
}

pub fn create_doc(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    parent_doc_ref_id: Option<EntityId>,
    name: EntityName,
    content: String,
) -> ServiceResult<(Doc, Note)> {
    let collection: DocCollection = scope.trunk(workspace_ref_id)?;
    let repo = scope.uow.get_for::<Doc>();
    if let Some(parent_ref_id) = parent_doc_ref_id {
        let parent = repo.load_by_id(parent_ref_id, false)?;
        if parent.doc_collection_ref_id != collection.ref_id() {
            return Err(ServiceError::invariant(format!(
                "doc {parent_ref_id} belongs to another workspace"
            )));
        }
    }
    let doc = repo.create(Doc::new_doc(scope.ctx, collection.ref_id(), parent_doc_ref_id, name))?;
    scope.reporter.mark_created(&doc);
    let note = create_note(scope, workspace_ref_id, NoteDomain::Doc, doc.ref_id(), content)?;
    Ok((doc, note))
}

pub fn update_doc(
    scope: ServiceScope<'_, '_>,
    doc_ref_id: EntityId,
    name: UpdateAction<EntityName>,
) -> ServiceResult<Doc> {
    let repo = scope.uow.get_for::<Doc>();
    let doc = repo.save(repo.load_by_id(doc_ref_id, false)?.update(scope.ctx, name))?;
    scope.reporter.mark_updated(&doc);
    Ok(doc)
}

pub fn archive_doc(scope: ServiceScope<'_, '_>, doc_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<Doc>(doc_ref_id)
}

pub fn remove_doc(scope: ServiceScope<'_, '_>, doc_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<Doc>(doc_ref_id)
}

pub fn load_doc(scope: ServiceScope<'_, '_>, doc_ref_id: EntityId, allow_archived: bool) -> ServiceResult<DocView> {
    let repo = scope.uow.get_for::<Doc>();
    let doc = repo.load_by_id(doc_ref_id, allow_archived)?;
    let note = load_for_source(scope, NoteDomain::Doc, doc_ref_id)?;
    let sub_docs = repo.find_all_generic(
        Some(doc.doc_collection_ref_id),
        allow_archived,
        &[RefFilter::eq("parent_doc_ref_id", doc_ref_id)],
    )?;
    Ok(DocView { doc, note, sub_docs })
}

#[cfg(test)]
mod tests {
    use super::{archive_doc, create_doc, load_doc, remove_doc};
    use crate::model::doc::Doc;
    use crate::model::framework::{ArchivalReason, Entity};
    use crate::model::note::Note;
    use crate::repo::EntityRepository;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{ChangeKind, EntityCatalog, ProgressReporter, ServiceScope};

    #[test]
    fn archiving_a_doc_archives_sub_docs() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();

        let (root, _) = create_doc(scope, ws, None, "Recipes".parse().expect("name"), "# Food".into())
            .expect("doc");
        let (child, note) = create_doc(
            scope,
            ws,
            Some(root.ref_id()),
            "Soups".parse().expect("name"),
            "Lentil soup".into(),
        )
        .expect("doc");
        assert_eq!(note.source_entity_ref_id, child.ref_id());
        assert_eq!(load_doc(scope, root.ref_id(), false).expect("load").sub_docs.len(), 1);

        assert_eq!(archive_doc(scope, root.ref_id()).expect("archive"), 4);
        let child = uow.get_for::<Doc>().load_by_id(child.ref_id(), true).expect("child");
        assert_eq!(child.header.archival_reason, Some(ArchivalReason::User));

        reporter.reset();
        assert_eq!(remove_doc(scope, root.ref_id()).expect("remove"), 4);
        assert_eq!(reporter.count_of(ChangeKind::Removed, Note::KIND), 2);
    }
}
