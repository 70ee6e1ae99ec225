//! Big plan and milestone use cases.

use crate::model::big_plan::{BigPlan, BigPlanMilestone, BigPlanUpdate};
use crate::model::framework::{ADate, EntityId, EntityName, UpdateAction};
use crate::model::values::WorkspaceFeature;
use crate::service::big_plan_service::{
    archive_big_plan, create_big_plan, create_milestone, find_big_plans, load_big_plan,
    remove_big_plan, remove_milestone, update_big_plan, update_milestone, BigPlanView, NewBigPlan,
    UpdatedBigPlan,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoadArgs, LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseResult,
};
use serde::{Deserialize, Serialize};

const BIG_PLANS: &[WorkspaceFeature] = &[WorkspaceFeature::BigPlans];

use_case! {
    BigPlanCreateUseCase: NewBigPlan => BigPlan,
    UseCaseDescriptor::mutation("big_plan_create").requires(BIG_PLANS)
}

impl LoggedInMutation for BigPlanCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: NewBigPlan) -> UseCaseResult<BigPlan> {
        Ok(create_big_plan(cx.scope, cx.workspace_ref_id(), args)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigPlanUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub update: BigPlanUpdate,
}

use_case! {
    BigPlanUpdateUseCase: BigPlanUpdateArgs => UpdatedBigPlan,
    UseCaseDescriptor::mutation("big_plan_update").requires(BIG_PLANS)
}

impl LoggedInMutation for BigPlanUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: BigPlanUpdateArgs) -> UseCaseResult<UpdatedBigPlan> {
        Ok(update_big_plan(
            cx.scope,
            &cx.config.scoring,
            cx.user(),
            cx.workspace_ref_id(),
            args.ref_id,
            args.update,
        )?)
    }
}

use_case! {
    /// Archives the plan, its milestones and every inbox task linked to it.
    BigPlanArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("big_plan_archive").requires(BIG_PLANS)
}

impl LoggedInMutation for BigPlanArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_big_plan(cx.scope, args.ref_id)?)
    }
}

use_case! {
    BigPlanRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("big_plan_remove").requires(BIG_PLANS)
}

impl LoggedInMutation for BigPlanRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_big_plan(cx.scope, args.ref_id)?)
    }
}

use_case! {
    BigPlanLoadUseCase: LoadArgs => BigPlanView,
    UseCaseDescriptor::readonly("big_plan_load").requires(BIG_PLANS)
}

impl LoggedInReadonly for BigPlanLoadUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: LoadArgs) -> UseCaseResult<BigPlanView> {
        Ok(load_big_plan(cx.scope, args.ref_id, args.allow_archived)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BigPlanFindArgs {
    pub allow_archived: bool,
    /// Empty means every project.
    pub filter_project_ref_ids: Vec<EntityId>,
}

use_case! {
    BigPlanFindUseCase: BigPlanFindArgs => Vec<BigPlan>,
    UseCaseDescriptor::readonly("big_plan_find").requires(BIG_PLANS)
}

impl LoggedInReadonly for BigPlanFindUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: BigPlanFindArgs) -> UseCaseResult<Vec<BigPlan>> {
        Ok(find_big_plans(
            cx.scope,
            cx.workspace_ref_id(),
            args.allow_archived,
            &args.filter_project_ref_ids,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigPlanMilestoneCreateArgs {
    pub big_plan_ref_id: EntityId,
    pub date: ADate,
    pub name: EntityName,
}

use_case! {
    /// The date must fall within the plan's actionable and due dates.
    BigPlanMilestoneCreateUseCase: BigPlanMilestoneCreateArgs => BigPlanMilestone,
    UseCaseDescriptor::mutation("big_plan_milestone_create").requires(BIG_PLANS)
}

impl LoggedInMutation for BigPlanMilestoneCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: BigPlanMilestoneCreateArgs) -> UseCaseResult<BigPlanMilestone> {
        Ok(create_milestone(cx.scope, args.big_plan_ref_id, args.date, args.name)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigPlanMilestoneUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub date: UpdateAction<ADate>,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
}

use_case! {
    BigPlanMilestoneUpdateUseCase: BigPlanMilestoneUpdateArgs => BigPlanMilestone,
    UseCaseDescriptor::mutation("big_plan_milestone_update").requires(BIG_PLANS)
}

impl LoggedInMutation for BigPlanMilestoneUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: BigPlanMilestoneUpdateArgs) -> UseCaseResult<BigPlanMilestone> {
        Ok(update_milestone(cx.scope, args.ref_id, args.date, args.name)?)
    }
}

use_case! {
    BigPlanMilestoneRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("big_plan_milestone_remove").requires(BIG_PLANS)
}

impl LoggedInMutation for BigPlanMilestoneRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_milestone(cx.scope, args.ref_id)?)
    }
}
