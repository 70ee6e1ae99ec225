//! Habit and chore use cases.

use crate::model::chore::{Chore, ChoreUpdate};
use crate::model::framework::{ADate, EntityId, EntityName, UpdateAction};
use crate::model::habit::{Habit, HabitStreakMark};
use crate::model::inbox_task::InboxTask;
use crate::model::note::Note;
use crate::model::values::{RecurringTaskGenParams, WorkspaceFeature};
use crate::service::chore_service::{
    archive_chore, create_chore, remove_chore, suspend_chore, unsuspend_chore, update_chore, NewChore,
};
use crate::service::habit_service::{
    archive_habit, create_habit, load_habit, load_streak_marks, remove_habit, suspend_habit,
    unsuspend_habit, update_habit,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoadArgs, LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseResult,
};
use serde::{Deserialize, Serialize};

const HABITS: &[WorkspaceFeature] = &[WorkspaceFeature::Habits];
const CHORES: &[WorkspaceFeature] = &[WorkspaceFeature::Chores];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitCreateArgs {
    #[serde(default)]
    pub project_ref_id: Option<EntityId>,
    pub name: EntityName,
    #[serde(default)]
    pub is_key: bool,
    pub gen_params: RecurringTaskGenParams,
    #[serde(default)]
    pub repeats_in_period_count: Option<u32>,
}

use_case! {
    HabitCreateUseCase: HabitCreateArgs => Habit,
    UseCaseDescriptor::mutation("habit_create").requires(HABITS)
}

impl LoggedInMutation for HabitCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: HabitCreateArgs) -> UseCaseResult<Habit> {
        Ok(create_habit(
            cx.scope,
            cx.workspace_ref_id(),
            args.project_ref_id,
            args.name,
            args.is_key,
            args.gen_params,
            args.repeats_in_period_count,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub project_ref_id: UpdateAction<EntityId>,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub is_key: UpdateAction<bool>,
    #[serde(default)]
    pub gen_params: UpdateAction<RecurringTaskGenParams>,
    #[serde(default)]
    pub repeats_in_period_count: UpdateAction<Option<u32>>,
}

use_case! {
    HabitUpdateUseCase: HabitUpdateArgs => Habit,
    UseCaseDescriptor::mutation("habit_update").requires(HABITS)
}

impl LoggedInMutation for HabitUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: HabitUpdateArgs) -> UseCaseResult<Habit> {
        Ok(update_habit(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.project_ref_id,
            args.name,
            args.is_key,
            args.gen_params,
            args.repeats_in_period_count,
        )?)
    }
}

use_case! {
    /// Suspended habits generate no tasks.
    HabitSuspendUseCase: RefIdArgs => Habit,
    UseCaseDescriptor::mutation("habit_suspend").requires(HABITS)
}

impl LoggedInMutation for HabitSuspendUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<Habit> {
        Ok(suspend_habit(cx.scope, args.ref_id)?)
    }
}

use_case! {
    HabitUnsuspendUseCase: RefIdArgs => Habit,
    UseCaseDescriptor::mutation("habit_unsuspend").requires(HABITS)
}

impl LoggedInMutation for HabitUnsuspendUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<Habit> {
        Ok(unsuspend_habit(cx.scope, args.ref_id)?)
    }
}

use_case! {
    HabitArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("habit_archive").requires(HABITS)
}

impl LoggedInMutation for HabitArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_habit(cx.scope, args.ref_id)?)
    }
}

use_case! {
    HabitRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("habit_remove").requires(HABITS)
}

impl LoggedInMutation for HabitRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_habit(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone)]
pub struct HabitLoadResult {
    pub habit: Habit,
    pub inbox_tasks: Vec<InboxTask>,
    pub note: Option<Note>,
}

use_case! {
    HabitLoadUseCase: LoadArgs => HabitLoadResult,
    UseCaseDescriptor::readonly("habit_load").requires(HABITS)
}

impl LoggedInReadonly for HabitLoadUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: LoadArgs) -> UseCaseResult<HabitLoadResult> {
        let (habit, inbox_tasks, note) = load_habit(cx.scope, args.ref_id, args.allow_archived)?;
        Ok(HabitLoadResult {
            habit,
            inbox_tasks,
            note,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HabitLoadStreakArgs {
    pub ref_id: EntityId,
    pub from: ADate,
    pub to: ADate,
}

use_case! {
    HabitLoadStreakUseCase: HabitLoadStreakArgs => Vec<HabitStreakMark>,
    UseCaseDescriptor::readonly("habit_load_streak").requires(HABITS)
}

impl LoggedInReadonly for HabitLoadStreakUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: HabitLoadStreakArgs) -> UseCaseResult<Vec<HabitStreakMark>> {
        Ok(load_streak_marks(cx.scope, args.ref_id, args.from, args.to)?)
    }
}

use_case! {
    ChoreCreateUseCase: NewChore => Chore,
    UseCaseDescriptor::mutation("chore_create").requires(CHORES)
}

impl LoggedInMutation for ChoreCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: NewChore) -> UseCaseResult<Chore> {
        Ok(create_chore(cx.scope, cx.workspace_ref_id(), args)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoreUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub update: ChoreUpdate,
}

use_case! {
    ChoreUpdateUseCase: ChoreUpdateArgs => Chore,
    UseCaseDescriptor::mutation("chore_update").requires(CHORES)
}

impl LoggedInMutation for ChoreUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ChoreUpdateArgs) -> UseCaseResult<Chore> {
        Ok(update_chore(cx.scope, cx.workspace_ref_id(), args.ref_id, args.update)?)
    }
}

use_case! {
    ChoreSuspendUseCase: RefIdArgs => Chore,
    UseCaseDescriptor::mutation("chore_suspend").requires(CHORES)
}

impl LoggedInMutation for ChoreSuspendUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<Chore> {
        Ok(suspend_chore(cx.scope, args.ref_id)?)
    }
}

use_case! {
    ChoreUnsuspendUseCase: RefIdArgs => Chore,
    UseCaseDescriptor::mutation("chore_unsuspend").requires(CHORES)
}

impl LoggedInMutation for ChoreUnsuspendUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<Chore> {
        Ok(unsuspend_chore(cx.scope, args.ref_id)?)
    }
}

use_case! {
    ChoreArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("chore_archive").requires(CHORES)
}

impl LoggedInMutation for ChoreArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_chore(cx.scope, args.ref_id)?)
    }
}

use_case! {
    ChoreRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("chore_remove").requires(CHORES)
}

impl LoggedInMutation for ChoreRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_chore(cx.scope, args.ref_id)?)
    }
}
