//! Schedule streams, their events and the calendar window.

use crate::model::framework::{ADate, EntityId, EntityName, UpdateAction};
use crate::model::schedule::ScheduleStream;
use crate::model::values::{ScheduleSource, ScheduleStreamColor, TimeInDay, Url, WorkspaceFeature};
use crate::service::schedule_service::{
    archive_event_full_days, archive_event_in_day, archive_stream, create_event_full_days,
    create_event_in_day, create_stream_for_external_ical, create_stream_for_user, find_streams,
    load_stream_events, remove_stream, update_event_full_days, update_event_in_day, update_stream,
    FullDaysEventView, InDayEventView,
};
use crate::service::time_event_service::{load_window, CalendarWindow};
use crate::use_case::app::LoggedInCx;
use crate::use_case::descriptor::use_case;
use crate::use_case::{
    LoggedInMutation, LoggedInReadonly, RefIdArgs, UseCaseDescriptor, UseCaseError, UseCaseResult,
};
use serde::{Deserialize, Serialize};

const SCHEDULE: &[WorkspaceFeature] = &[WorkspaceFeature::Schedule];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStreamCreateForUserArgs {
    pub name: EntityName,
    pub color: ScheduleStreamColor,
}

use_case! {
    ScheduleStreamCreateForUserUseCase: ScheduleStreamCreateForUserArgs => ScheduleStream,
    UseCaseDescriptor::mutation("schedule_stream_create_for_user").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleStreamCreateForUserUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ScheduleStreamCreateForUserArgs) -> UseCaseResult<ScheduleStream> {
        Ok(create_stream_for_user(cx.scope, cx.workspace_ref_id(), args.name, args.color)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStreamCreateForExternalIcalArgs {
    pub name: EntityName,
    pub color: ScheduleStreamColor,
    pub source_ical_url: Url,
}

use_case! {
    /// The stream fills up on the next external sync.
    ScheduleStreamCreateForExternalIcalUseCase: ScheduleStreamCreateForExternalIcalArgs => ScheduleStream,
    UseCaseDescriptor::mutation("schedule_stream_create_for_external_ical").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleStreamCreateForExternalIcalUseCase {
    fn perform(
        &self,
        cx: &LoggedInCx<'_, '_>,
        args: ScheduleStreamCreateForExternalIcalArgs,
    ) -> UseCaseResult<ScheduleStream> {
        Ok(create_stream_for_external_ical(
            cx.scope,
            cx.workspace_ref_id(),
            args.name,
            args.color,
            args.source_ical_url,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStreamUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub color: UpdateAction<ScheduleStreamColor>,
}

use_case! {
    ScheduleStreamUpdateUseCase: ScheduleStreamUpdateArgs => ScheduleStream,
    UseCaseDescriptor::mutation("schedule_stream_update").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleStreamUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ScheduleStreamUpdateArgs) -> UseCaseResult<ScheduleStream> {
        Ok(update_stream(cx.scope, args.ref_id, args.name, args.color)?)
    }
}

use_case! {
    /// The last live user stream of the workspace cannot go.
    ScheduleStreamArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("schedule_stream_archive").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleStreamArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_stream(cx.scope, cx.workspace_ref_id(), args.ref_id)?)
    }
}

use_case! {
    ScheduleStreamRemoveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("schedule_stream_remove").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleStreamRemoveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(remove_stream(cx.scope, cx.workspace_ref_id(), args.ref_id)?)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleStreamFindArgs {
    pub source: Option<ScheduleSource>,
    pub allow_archived: bool,
}

use_case! {
    ScheduleStreamFindUseCase: ScheduleStreamFindArgs => Vec<ScheduleStream>,
    UseCaseDescriptor::readonly("schedule_stream_find").requires(SCHEDULE)
}

impl LoggedInReadonly for ScheduleStreamFindUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ScheduleStreamFindArgs) -> UseCaseResult<Vec<ScheduleStream>> {
        Ok(find_streams(
            cx.scope,
            cx.workspace_ref_id(),
            args.source,
            args.allow_archived,
        )?)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleStreamEvents {
    pub in_day: Vec<InDayEventView>,
    pub full_days: Vec<FullDaysEventView>,
}

use_case! {
    ScheduleStreamLoadEventsUseCase: RefIdArgs => ScheduleStreamEvents,
    UseCaseDescriptor::readonly("schedule_stream_load_events").requires(SCHEDULE)
}

impl LoggedInReadonly for ScheduleStreamLoadEventsUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<ScheduleStreamEvents> {
        let (in_day, full_days) = load_stream_events(cx.scope, args.ref_id)?;
        Ok(ScheduleStreamEvents { in_day, full_days })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEventInDayCreateArgs {
    pub schedule_stream_ref_id: EntityId,
    pub name: EntityName,
    pub start_date: ADate,
    pub start_time_in_day: TimeInDay,
    pub duration_mins: u32,
}

use_case! {
    ScheduleEventInDayCreateUseCase: ScheduleEventInDayCreateArgs => InDayEventView,
    UseCaseDescriptor::mutation("schedule_event_in_day_create").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleEventInDayCreateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ScheduleEventInDayCreateArgs) -> UseCaseResult<InDayEventView> {
        Ok(create_event_in_day(
            cx.scope,
            cx.workspace_ref_id(),
            args.schedule_stream_ref_id,
            args.name,
            args.start_date,
            args.start_time_in_day,
            args.duration_mins,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEventInDayUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub start_date: UpdateAction<ADate>,
    #[serde(default)]
    pub start_time_in_day: UpdateAction<TimeInDay>,
    #[serde(default)]
    pub duration_mins: UpdateAction<u32>,
}

use_case! {
    ScheduleEventInDayUpdateUseCase: ScheduleEventInDayUpdateArgs => InDayEventView,
    UseCaseDescriptor::mutation("schedule_event_in_day_update").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleEventInDayUpdateUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: ScheduleEventInDayUpdateArgs) -> UseCaseResult<InDayEventView> {
        Ok(update_event_in_day(
            cx.scope,
            args.ref_id,
            args.name,
            args.start_date,
            args.start_time_in_day,
            args.duration_mins,
        )?)
    }
}

use_case! {
    ScheduleEventInDayArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("schedule_event_in_day_archive").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleEventInDayArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_event_in_day(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEventFullDaysCreateArgs {
    pub schedule_stream_ref_id: EntityId,
    pub name: EntityName,
    pub start_date: ADate,
    pub duration_days: u32,
}

use_case! {
    ScheduleEventFullDaysCreateUseCase: ScheduleEventFullDaysCreateArgs => FullDaysEventView,
    UseCaseDescriptor::mutation("schedule_event_full_days_create").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleEventFullDaysCreateUseCase {
    fn perform(
        &self,
        cx: &LoggedInCx<'_, '_>,
        args: ScheduleEventFullDaysCreateArgs,
    ) -> UseCaseResult<FullDaysEventView> {
        Ok(create_event_full_days(
            cx.scope,
            cx.workspace_ref_id(),
            args.schedule_stream_ref_id,
            args.name,
            args.start_date,
            args.duration_days,
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEventFullDaysUpdateArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub name: UpdateAction<EntityName>,
    #[serde(default)]
    pub start_date: UpdateAction<ADate>,
    #[serde(default)]
    pub duration_days: UpdateAction<u32>,
}

use_case! {
    ScheduleEventFullDaysUpdateUseCase: ScheduleEventFullDaysUpdateArgs => FullDaysEventView,
    UseCaseDescriptor::mutation("schedule_event_full_days_update").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleEventFullDaysUpdateUseCase {
    fn perform(
        &self,
        cx: &LoggedInCx<'_, '_>,
        args: ScheduleEventFullDaysUpdateArgs,
    ) -> UseCaseResult<FullDaysEventView> {
        Ok(update_event_full_days(
            cx.scope,
            cx.workspace_ref_id(),
            args.ref_id,
            args.name,
            args.start_date,
            args.duration_days,
        )?)
    }
}

use_case! {
    ScheduleEventFullDaysArchiveUseCase: RefIdArgs => usize,
    UseCaseDescriptor::mutation("schedule_event_full_days_archive").requires(SCHEDULE)
}

impl LoggedInMutation for ScheduleEventFullDaysArchiveUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: RefIdArgs) -> UseCaseResult<usize> {
        Ok(archive_event_full_days(cx.scope, args.ref_id)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalendarLoadWindowArgs {
    pub from: ADate,
    pub to: ADate,
}

use_case! {
    /// Every time-event block of the workspace touching the window.
    CalendarLoadWindowUseCase: CalendarLoadWindowArgs => CalendarWindow,
    UseCaseDescriptor::readonly("calendar_load_for_date_and_period")
}

impl LoggedInReadonly for CalendarLoadWindowUseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: CalendarLoadWindowArgs) -> UseCaseResult<CalendarWindow> {
        if args.from > args.to {
            return Err(UseCaseError::invalid("calendar window starts after it ends"));
        }
        Ok(load_window(cx.scope, cx.workspace_ref_id(), args.from, args.to)?)
    }
}
