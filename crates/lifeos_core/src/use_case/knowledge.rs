//! Docs and free-standing note edits.

use crate::model::doc::Doc;
use crate::model::framework::{EntityId, EntityName, UpdateAction};
use crate::model::note::Note;
use crate::model::values::WorkspaceFeature;
use crate::service::doc_service::{archive_doc, create_doc, load_doc, remove_doc, update_doc, DocView};
use crate::service::note_service::update_note;
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoadArgs, LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseResult,
};
use serde::{Deserialize, Serialize};

const DOCS: &[WorkspaceFeature] = &[WorkspaceFeature::Docs];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocCreateArgs {
    #[serde(default)]
    pub parent_doc_ref_id: Option<EntityId>,
    pub name: EntityName,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct DocCreateResult {
    pub doc: Doc,
    pub note: Note,
}

use_case! {
    DocCreateUseCase: DocCreateArgs => DocCreateResult,
    UseCaseDescriptor::mutation("doc_create").requires(DOCS)
}

impl LoggedInMutation for DocCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: DocCreateArgs) -> UseCaseResult<DocCreateResult> {
        let (doc, note) = create_doc(
            cx.scope,
            cx.workspace_ref_id(),
            args.parent_doc_ref_id,
            args.name,
            args.content,
        )?;
        Ok(DocCreateResult { doc, note })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
}

use_case! {
    DocUpdateUseCase: DocUpdateArgs => Doc,
    UseCaseDescriptor::mutation("doc_update").requires(DOCS)
}

impl LoggedInMutation for DocUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: DocUpdateArgs) -> UseCaseResult<Doc> {
        Ok(update_doc(cx.scope, args.ref_id, args.name)?)
    }
}

use_case! {
    /// Sub-docs and their notes are archived along.
    DocArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("doc_archive").requires(DOCS)
}

impl LoggedInMutation for DocArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_doc(cx.scope, args.ref_id)?)
    }
}

use_case! {
    DocRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("doc_remove").requires(DOCS)
}

impl LoggedInMutation for DocRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_doc(cx.scope, args.ref_id)?)
    }
}

use_case! {
    DocLoadUseCase: LoadArgs => DocView,
    UseCaseDescriptor::readonly("doc_load").requires(DOCS)
}

impl LoggedInReadonly for DocLoadUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: LoadArgs) -> UseCaseResult<DocView> {
        Ok(load_doc(cx.scope, args.ref_id, args.allow_archived)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteUpdateArgs {
    pub ref_id: EntityId,
    pub content: String,
}

use_case! {
    NoteUpdateUseCase: NoteUpdateArgs => Note,
    UseCaseDescriptor::mutation("note_update")
}

impl LoggedInMutation for NoteUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: NoteUpdateArgs) -> UseCaseResult<Note> {
        Ok(update_note(cx.scope, args.ref_id, args.content)?)
    }
}
