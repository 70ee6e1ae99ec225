//! Vacations, time plans, working memory and the home screen.

use crate::model::framework::{ADate, EntityId, EntityName, UpdateAction};
use crate::model::home::{HomeTab, HomeWidget, WidgetGeometry};
use crate::model::time_plan::{TimePlan, TimePlanActivity};
use crate::model::vacation::Vacation;
use crate::model::working_mem::WorkingMemCollection;
use crate::model::values::{
    HomeTabTarget, RecurringTaskPeriod, TimePlanActivityFeasibility, TimePlanActivityKind,
    WidgetType, WorkspaceFeature,
};
use crate::service::home_service::{
    archive_tab, create_tab, create_widget, load_home, move_widget, remove_tab, remove_widget,
    update_tab, HomeTabView,
};
use crate::service::time_plan_service::{
    archive_time_plan, create_activities_from_big_plans, create_activities_from_inbox_tasks,
    create_time_plan, load_time_plan, remove_activity, remove_time_plan, update_activity,
    TimePlanView,
};
use crate::service::vacation_service::{
    archive_vacation, create_vacation, load_vacations, remove_vacation, update_vacation,
};
use crate::service::working_mem_service::{
    change_working_mem_settings, load_current_working_mem, CurrentWorkingMem,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoadArgs, LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseResult,
};
use serde::{Deserialize, Serialize};

const VACATIONS: &[WorkspaceFeature] = &[WorkspaceFeature::Vacations];
const TIME_PLANS: &[WorkspaceFeature] = &[WorkspaceFeature::TimePlans];
const WORKING_MEM: &[WorkspaceFeature] = &[WorkspaceFeature::WorkingMem];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacationCreateArgs {
    pub name: EntityName,
    pub start_date: ADate,
    pub end_date: ADate,
}

use_case! {
    VacationCreateUseCase: VacationCreateArgs => Vacation,
    UseCaseDescriptor::mutation("vacation_create").requires(VACATIONS)
}

impl LoggedInMutation for VacationCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: VacationCreateArgs) -> UseCaseResult<Vacation> {
        Ok(create_vacation(
            cx.scope,
            cx.workspace_ref_id(),
            args.name,
            args.start_date,
            args.end_date,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacationUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub start_date: UpdateAction<ADate>,
    #[serde(default)]
    pub end_date: UpdateAction<ADate>,
}

use_case! {
    VacationUpdateUseCase: VacationUpdateArgs => Vacation,
    UseCaseDescriptor::mutation("vacation_update").requires(VACATIONS)
}

impl LoggedInMutation for VacationUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: VacationUpdateArgs) -> UseCaseResult<Vacation> {
        Ok(update_vacation(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.name,
            args.start_date,
            args.end_date,
        )?)
    }
}

use_case! {
    VacationArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("vacation_archive").requires(VACATIONS)
}

impl LoggedInMutation for VacationArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_vacation(cx.scope, args.ref_id)?)
    }
}

use_case! {
    VacationRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("vacation_remove").requires(VACATIONS)
}

impl LoggedInMutation for VacationRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_vacation(cx.scope, args.ref_id)?)
    }
}

use_case! {
    VacationFindUseCase: () => Vec<Vacation>,
    UseCaseDescriptor::readonly("vacation_find").requires(VACATIONS)
}

impl LoggedInReadonly for VacationFindUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, _args: ()) -> UseCaseResult<Vec<Vacation>> {
        Ok(load_vacations(cx.scope, cx.workspace_ref_id())?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimePlanCreateArgs {
    pub right_now: ADate,
    pub period: RecurringTaskPeriod,
}

use_case! {
    TimePlanCreateUseCase: TimePlanCreateArgs => TimePlan,
    UseCaseDescriptor::mutation("time_plan_create").requires(TIME_PLANS)
}

impl LoggedInMutation for TimePlanCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: TimePlanCreateArgs) -> UseCaseResult<TimePlan> {
        Ok(create_time_plan(
            cx.scope,
            cx.workspace_ref_id(),
            args.right_now,
            args.period,
        )?)
    }
}

use_case! {
    TimePlanArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("time_plan_archive").requires(TIME_PLANS)
}

impl LoggedInMutation for TimePlanArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_time_plan(cx.scope, args.ref_id)?)
    }
}

use_case! {
    TimePlanRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("time_plan_remove").requires(TIME_PLANS)
}

impl LoggedInMutation for TimePlanRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_time_plan(cx.scope, args.ref_id)?)
    }
}

use_case! {
    TimePlanLoadUseCase: LoadArgs => TimePlanView,
    UseCaseDescriptor::readonly("time_plan_load").requires(TIME_PLANS)
}

impl LoggedInReadonly for TimePlanLoadUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: LoadArgs) -> UseCaseResult<TimePlanView> {
        Ok(load_time_plan(cx.scope, args.ref_id, args.allow_archived)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePlanAssociateArgs {
    pub time_plan_ref_id: EntityId,
    pub ref_ids: Vec<EntityId>,
    pub kind: TimePlanActivityKind,
    pub feasibility: TimePlanActivityFeasibility,
}

use_case! {
    /// Targets already in the plan are skipped.
    TimePlanAssociateWithInboxTasksUseCase: TimePlanAssociateArgs => Vec<TimePlanActivity>,
    UseCaseDescriptor::mutation("time_plan_associate_with_inbox_tasks").requires(TIME_PLANS)
}

impl LoggedInMutation for TimePlanAssociateWithInboxTasksUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: TimePlanAssociateArgs) -> UseCaseResult<Vec<TimePlanActivity>> {
        Ok(create_activities_from_inbox_tasks(
            cx.scope,
            cx.workspace_ref_id(),
            args.time_plan_ref_id,
            &args.ref_ids,
            args.kind,
            args.feasibility,
        )?)
    }
}

use_case! {
    /// Unfinished tasks of each big plan come along as finish activities.
    TimePlanAssociateWithBigPlansUseCase: TimePlanAssociateArgs => Vec<TimePlanActivity>,
    UseCaseDescriptor::mutation("time_plan_associate_with_big_plans")
        .requires(&[WorkspaceFeature::TimePlans, WorkspaceFeature::BigPlans])
}

impl LoggedInMutation for TimePlanAssociateWithBigPlansUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: TimePlanAssociateArgs) -> UseCaseResult<Vec<TimePlanActivity>> {
        Ok(create_activities_from_big_plans(
            cx.scope,
            cx.workspace_ref_id(),
            args.time_plan_ref_id,
            &args.ref_ids,
            args.kind,
            args.feasibility,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePlanActivityUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub kind: UpdateAction<TimePlanActivityKind>,
    #[serde(default)]
    pub feasibility: UpdateAction<TimePlanActivityFeasibility>,
}

use_case! {
    TimePlanActivityUpdateUseCase: TimePlanActivityUpdateArgs => TimePlanActivity,
    UseCaseDescriptor::mutation("time_plan_activity_update").requires(TIME_PLANS)
}

impl LoggedInMutation for TimePlanActivityUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: TimePlanActivityUpdateArgs) -> UseCaseResult<TimePlanActivity> {
        Ok(update_activity(cx.scope, args.ref_id, args.kind, args.feasibility)?)
    }
}

use_case! {
    TimePlanActivityRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("time_plan_activity_remove").requires(TIME_PLANS)
}

impl LoggedInMutation for TimePlanActivityRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_activity(cx.scope, args.ref_id)?)
    }
}

use_case! {
    /// Creates the working memory of the current bucket on first access.
    WorkingMemLoadCurrentUseCase: () => CurrentWorkingMem,
    UseCaseDescriptor::mutation("working_mem_load_current").requires(WORKING_MEM)
}

impl LoggedInMutation for WorkingMemLoadCurrentUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, _args: ()) -> UseCaseResult<CurrentWorkingMem> {
        Ok(load_current_working_mem(cx.scope, cx.workspace_ref_id())?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkingMemChangeSettingsArgs {
    pub generation_period: RecurringTaskPeriod,
    #[serde(default)]
    pub cleanup_project_ref_id: Option<EntityId>,
}

use_case! {
    WorkingMemChangeSettingsUseCase: WorkingMemChangeSettingsArgs => WorkingMemCollection,
    UseCaseDescriptor::mutation("working_mem_change_settings").requires(WORKING_MEM)
}

impl LoggedInMutation for WorkingMemChangeSettingsUseCase {
    fn perform(
        &self,
        cx: &LoggedInCx<'_, '_>,
        args: WorkingMemChangeSettingsArgs,
    ) -> UseCaseResult<WorkingMemCollection> {
        Ok(change_working_mem_settings(
            cx.scope,
            cx.workspace_ref_id(),
            args.generation_period,
            args.cleanup_project_ref_id,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeTabCreateArgs {
    pub target: HomeTabTarget,
    pub name: EntityName,
}

use_case! {
    HomeTabCreateUseCase: HomeTabCreateArgs => HomeTab,
    UseCaseDescriptor::mutation("home_tab_create")
}

impl LoggedInMutation for HomeTabCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: HomeTabCreateArgs) -> UseCaseResult<HomeTab> {
        Ok(create_tab(cx.scope, cx.workspace_ref_id(), args.target, args.name)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeTabUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
}

use_case! {
    HomeTabUpdateUseCase: HomeTabUpdateArgs => HomeTab,
    UseCaseDescriptor::mutation("home_tab_update")
}

impl LoggedInMutation for HomeTabUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: HomeTabUpdateArgs) -> UseCaseResult<HomeTab> {
        Ok(update_tab(cx.scope, args.ref_id, args.name)?)
    }
}

use_case! {
    HomeTabArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("home_tab_archive")
}

impl LoggedInMutation for HomeTabArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_tab(cx.scope, cx.workspace_ref_id(), args.ref_id)?)
    }
}

use_case! {
    HomeTabRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("home_tab_remove")
}

impl LoggedInMutation for HomeTabRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_tab(cx.scope, cx.workspace_ref_id(), args.ref_id)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HomeWidgetCreateArgs {
    pub home_tab_ref_id: EntityId,
    pub the_type: WidgetType,
    pub geometry: WidgetGeometry,
}

use_case! {
    /// Widgets may not overlap on their tab.
    HomeWidgetCreateUseCase: HomeWidgetCreateArgs => HomeWidget,
    UseCaseDescriptor::mutation("home_widget_create")
}

impl LoggedInMutation for HomeWidgetCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: HomeWidgetCreateArgs) -> UseCaseResult<HomeWidget> {
        Ok(create_widget(cx.scope, args.home_tab_ref_id, args.the_type, args.geometry)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HomeWidgetMoveArgs {
    pub ref_id: EntityId,
    pub geometry: WidgetGeometry,
}

use_case! {
    HomeWidgetMoveUseCase: HomeWidgetMoveArgs => HomeWidget,
    UseCaseDescriptor::mutation("home_widget_move_and_resize")
}

impl LoggedInMutation for HomeWidgetMoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: HomeWidgetMoveArgs) -> UseCaseResult<HomeWidget> {
        Ok(move_widget(cx.scope, args.ref_id, args.geometry)?)
    }
}

use_case! {
    HomeWidgetRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("home_widget_remove")
}

impl LoggedInMutation for HomeWidgetRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_widget(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HomeLoadArgs {
    pub target: HomeTabTarget,
}

use_case! {
    HomeLoadUseCase: HomeLoadArgs => Vec<HomeTabView>,
    UseCaseDescriptor::readonly("home_config_load")
}

impl LoggedInReadonly for HomeLoadUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: HomeLoadArgs) -> UseCaseResult<Vec<HomeTabView>> {
        Ok(load_home(cx.scope, cx.workspace_ref_id(), args.target)?)
    }
}
