//! Person use cases.

use crate::model::framework::{EntityId, EntityName, UpdateAction};
use crate::model::person::{Person, PersonCollection};
use crate::model::values::{PersonBirthday, PersonRelationship, RecurringTaskGenParams, WorkspaceFeature};
use crate::service::person_service::{
    archive_person, change_catch_up_project, create_person, remove_person, update_person,
};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{LoggedInMutation, RefIdArgs, UseCaseDescriptor, UseCaseResult};
use serde::{Deserialize, Serialize};

const PERSONS: &[WorkspaceFeature] = &[WorkspaceFeature::Persons];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonCreateArgs {
    pub name: EntityName,
    pub relationship: PersonRelationship,
    #[serde(default)]
    pub catch_up_params: Option<RecurringTaskGenParams>,
    #[serde(default)]
    pub birthday: Option<PersonBirthday>,
}

use_case! {
    /// A birthday also adds a yearly full-days block to the calendar.
    PersonCreateUseCase: PersonCreateArgs => Person,
    UseCaseDescriptor::mutation("person_create").requires(PERSONS)
}

impl LoggedInMutation for PersonCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: PersonCreateArgs) -> UseCaseResult<Person> {
        Ok(create_person(
            cx.scope,
            cx.workspace_ref_id(),
            args.name,
            args.relationship,
            args.catch_up_params,
            args.birthday,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub relationship: UpdateAction<PersonRelationship>,
    #[serde(default)]
    pub catch_up_params: UpdateAction<Option<RecurringTaskGenParams>>,
    #[serde(default)]
    pub birthday: UpdateAction<Option<PersonBirthday>>,
}

use_case! {
    PersonUpdateUseCase: PersonUpdateArgs => Person,
    UseCaseDescriptor::mutation("person_update").requires(PERSONS)
}

impl LoggedInMutation for PersonUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: PersonUpdateArgs) -> UseCaseResult<Person> {
        Ok(update_person(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.name,
            args.relationship,
            args.catch_up_params,
            args.birthday,
        )?)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PersonChangeCatchUpProjectArgs {
    #[serde(default)]
    pub catch_up_project_ref_id: Option<EntityId>,
}

use_case! {
    PersonChangeCatchUpProjectUseCase: PersonChangeCatchUpProjectArgs => PersonCollection,
    UseCaseDescriptor::mutation("person_change_catch_up_project").requires(PERSONS)
}

impl LoggedInMutation for PersonChangeCatchUpProjectUseCase {
    fn perform(
        &self,
        cx: &LoggedInCx<'_, '_>,
        args: PersonChangeCatchUpProjectArgs,
    ) -> UseCaseResult<PersonCollection> {
        Ok(change_catch_up_project(
            cx.scope,
            cx.workspace_ref_id(),
            args.catch_up_project_ref_id,
        )?)
    }
}

use_case! {
    PersonArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("person_archive").requires(PERSONS)
}

impl LoggedInMutation for PersonArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_person(cx.scope, args.ref_id)?)
    }
}

use_case! {
    PersonRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("person_remove").requires(PERSONS)
}

impl LoggedInMutation for PersonRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_person(cx.scope, args.ref_id)?)
    }
}
