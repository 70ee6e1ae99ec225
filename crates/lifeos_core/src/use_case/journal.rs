//! Journal use cases.

use crate::model::framework::{ADate, EntityId, UpdateAction};
use crate::model::journal::{Journal, JournalStats};
use crate::model::values::{JournalSource, RecurringTaskPeriod, WorkspaceFeature};
use crate::service::journal_service::{
    archive_journal, change_journal_time_config, create_journal, find_journals, load_journal,
    refresh_journal_stats, remove_journal, JournalView,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoadArgs, LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseResult,
};
use serde::{Deserialize, Serialize};

const JOURNALS: &[WorkspaceFeature] = &[WorkspaceFeature::Journals];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JournalCreateArgs {
    pub right_now: ADate,
    pub period: RecurringTaskPeriod,
}

use_case! {
    /// Creates the journal with an empty note and a first stats snapshot.
    JournalCreateUseCase: JournalCreateArgs => JournalView,
    UseCaseDescriptor::mutation("journal_create").requires(JOURNALS)
}

impl LoggedInMutation for JournalCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: JournalCreateArgs) -> UseCaseResult<JournalView> {
        Ok(create_journal(
            cx.scope,
            cx.workspace_ref_id(),
            JournalSource::User,
            args.right_now,
            args.period,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalChangeTimeConfigArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub right_now: UpdateAction<ADate>,
    #[serde(default)]
    pub period: UpdateAction<RecurringTaskPeriod>,
}

use_case! {
    JournalChangeTimeConfigUseCase: JournalChangeTimeConfigArgs => Journal,
    UseCaseDescriptor::mutation("journal_change_time_config").requires(JOURNALS)
}

impl LoggedInMutation for JournalChangeTimeConfigUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: JournalChangeTimeConfigArgs) -> UseCaseResult<Journal> {
        Ok(change_journal_time_config(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.right_now,
            args.period,
        )?)
    }
}

use_case! {
    JournalRefreshStatsUseCase: RefIdArgs => JournalStats,
    UseCaseDescriptor::mutation("journal_refresh_stats").requires(JOURNALS)
}

impl LoggedInMutation for JournalRefreshStatsUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<JournalStats> {
        Ok(refresh_journal_stats(cx.scope, cx.workspace_ref_id(), args.ref_id)?)
    }
}

use_case! {
    JournalArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("journal_archive").requires(JOURNALS)
}

impl LoggedInMutation for JournalArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_journal(cx.scope, args.ref_id)?)
    }
}

use_case! {
    JournalRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("journal_remove").requires(JOURNALS)
}

impl LoggedInMutation for JournalRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_journal(cx.scope, args.ref_id)?)
    }
}

use_case! {
    JournalLoadUseCase: LoadArgs => JournalView,
    UseCaseDescriptor::readonly("journal_load").requires(JOURNALS)
}

impl LoggedInReadonly for JournalLoadUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: LoadArgs) -> UseCaseResult<JournalView> {
        Ok(load_journal(cx.scope, args.ref_id, args.allow_archived)?)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalFindArgs {
    pub period: Option<RecurringTaskPeriod>,
    pub allow_archived: bool,
}

use_case! {
    JournalFindUseCase: JournalFindArgs => Vec<Journal>,
    UseCaseDescriptor::readonly("journal_find").requires(JOURNALS)
}

impl LoggedInReadonly for JournalFindUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: JournalFindArgs) -> UseCaseResult<Vec<Journal>> {
        Ok(find_journals(
            cx.scope,
            cx.workspace_ref_id(),
            args.period,
            args.allow_archived,
        )?)
    }
}
