//! Schedule streams and the events users place on them.
//!
//! # Invariants
//! - With schedule on, a workspace keeps at least one live user stream.
//! - Users only add or edit events on user streams; external streams belong to sync.
//! - Every event owns exactly one time block.

use crate::model::framework::{ADate, Entity, EntityId, EntityName, UpdateAction};
use crate::model::schedule::{ScheduleDomain, ScheduleEventFullDays, ScheduleEventInDay, ScheduleStream};
use crate::model::time_event::{TimeEventFullDaysBlock, TimeEventInDayBlock};
use crate::model::values::{
    ScheduleSource, ScheduleStreamColor, TimeEventFullDaysNamespace, TimeEventInDayNamespace, TimeInDay,
    Url, WorkspaceFeature,
};
use crate::model::workspace::Workspace;
use crate::repo::{EntityRepository, RefFilter};
use crate::service::time_event_service::{
    create_in_day_block, find_full_days_blocks, find_in_day_blocks, update_in_day_block,
    upsert_full_days_block,
};
use crate::service::{ServiceError, ServiceResult, ServiceScope};

pub fn create_stream_for_user(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    name: EntityName,
    color: ScheduleStreamColor,
) -> ServiceResult<ScheduleStream> {
    let domain: ScheduleDomain = scope.trunk(workspace_ref_id)?;
    let stream = scope
        .uow
        .get_for::<ScheduleStream>()
        .create(ScheduleStream::new_for_user(scope.ctx, domain.ref_id(), name, color))?;
    scope.reporter.mark_created(&stream);
    Ok(stream)
}

/// Registers an iCal feed; its events arrive with the next sync.
pub fn create_stream_for_external_ical(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    name: EntityName,
    color: ScheduleStreamColor,
    source_ical_url: Url,
) -> ServiceResult<ScheduleStream> {
    let domain: ScheduleDomain = scope.trunk(workspace_ref_id)?;
    let stream = scope.uow.get_for::<ScheduleStream>().create(ScheduleStream::new_for_external_ical(
        scope.ctx,
        domain.ref_id(),
        name,
        color,
        source_ical_url,
    ))?;
    scope.reporter.mark_created(&stream);
    Ok(stream)
}

pub fn update_stream(
    scope: ServiceScope<'_, '_>,
    stream_ref_id: EntityId,
    name: UpdateAction<EntityName>,
    color: UpdateAction<ScheduleStreamColor>,
) -> ServiceResult<ScheduleStream> {
    let repo = scope.uow.get_for::<ScheduleStream>();
    let stream = repo.save(repo.load_by_id(stream_ref_id, false)?.update(scope.ctx, name, color)?)?;
    scope.reporter.mark_updated(&stream);
    Ok(stream)
}

pub fn find_streams(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    source: Option<ScheduleSource>,
    allow_archived: bool,
) -> ServiceResult<Vec<ScheduleStream>> {
    let domain: ScheduleDomain = scope.trunk(workspace_ref_id)?;
    let filters: Vec<RefFilter> = source
        .map(|source| RefFilter::eq("source", source))
        .into_iter()
        .collect();
    Ok(scope
        .uow
        .get_for::<ScheduleStream>()
        .find_all_generic(Some(domain.ref_id()), allow_archived, &filters)?)
}

/// Fails when `stream` is the last live user stream of a schedule-enabled workspace.
fn guard_last_user_stream(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    stream: &ScheduleStream,
) -> ServiceResult<()> {
    if stream.is_external() || stream.is_archived() {
        return Ok(());
    }
    let workspace = scope.uow.get_for::<Workspace>().load_by_id(workspace_ref_id, false)?;
    if !workspace.is_feature_available(WorkspaceFeature::Schedule) {
        return Ok(());
    }
    let others = find_streams(scope, workspace_ref_id, Some(ScheduleSource::User), false)?
        .into_iter()
        .filter(|other| other.ref_id() != stream.ref_id())
        .count();
    if others == 0 {
        return Err(ServiceError::invariant(format!(
            "schedule stream {} is the last user stream of the workspace",
            stream.ref_id()
        )));
    }
    Ok(())
}

pub fn archive_stream(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    stream_ref_id: EntityId,
) -> ServiceResult<usize> {
    let stream = scope.uow.get_for::<ScheduleStream>().load_by_id(stream_ref_id, false)?;
    guard_last_user_stream(scope, workspace_ref_id, &stream)?;
    scope.archive::<ScheduleStream>(stream_ref_id)
}

pub fn remove_stream(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    stream_ref_id: EntityId,
) -> ServiceResult<usize> {
    let stream = scope.uow.get_for::<ScheduleStream>().load_by_id(stream_ref_id, true)?;
    guard_last_user_stream(scope, workspace_ref_id, &stream)?;
    scope.remove::<ScheduleStream>(stream_ref_id)
}

fn user_stream(scope: ServiceScope<'_, '_>, stream_ref_id: EntityId) -> ServiceResult<ScheduleStream> {
    let stream = scope.uow.get_for::<ScheduleStream>().load_by_id(stream_ref_id, false)?;
    if stream.is_external() {
        return Err(ServiceError::invariant(format!(
            "schedule stream {stream_ref_id} is synced from an external calendar"
        )));
    }
    Ok(stream)
}

fn reject_external(source: ScheduleSource, event_ref_id: EntityId) -> ServiceResult<()> {
    if source == ScheduleSource::ExternalIcal {
        return Err(ServiceError::invariant(format!(
            "schedule event {event_ref_id} can only be changed by sync"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct InDayEventView {
    pub event: ScheduleEventInDay,
    pub block: Option<TimeEventInDayBlock>,
}

#[derive(Debug, Clone)]
pub struct FullDaysEventView {
    pub event: ScheduleEventFullDays,
    pub block: Option<TimeEventFullDaysBlock>,
}

pub fn create_event_in_day(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    stream_ref_id: EntityId,
    name: EntityName,
    start_date: ADate,
    start_time_in_day: TimeInDay,
    duration_mins: u32,
) -> ServiceResult<InDayEventView> {
    let stream = user_stream(scope, stream_ref_id)?;
    let event = scope.uow.get_for::<ScheduleEventInDay>().create(ScheduleEventInDay::new_event(
        scope.ctx,
        stream.ref_id(),
        ScheduleSource::User,
        name,
        None,
    ))?;
    scope.reporter.mark_created(&event);
    let block = create_in_day_block(
        scope,
        workspace_ref_id,
        TimeEventInDayNamespace::ScheduleEventInDay,
        event.ref_id(),
        start_date,
        start_time_in_day,
        duration_mins,
    )?;
    Ok(InDayEventView {
        event,
        block: Some(block),
    })
}

pub fn update_event_in_day(
    scope: ServiceScope<'_, '_>,
    event_ref_id: EntityId,
    name: UpdateAction<EntityName>,
    start_date: UpdateAction<ADate>,
    start_time_in_day: UpdateAction<TimeInDay>,
    duration_mins: UpdateAction<u32>,
) -> ServiceResult<InDayEventView> {
    let repo = scope.uow.get_for::<ScheduleEventInDay>();
    let event = repo.load_by_id(event_ref_id, false)?;
    reject_external(event.source, event_ref_id)?;
    let event = if name.should_change() {
        let event = repo.save(event.update(scope.ctx, name)?)?;
        scope.reporter.mark_updated(&event);
        event
    } else {
        event
    };
    let block = find_in_day_blocks(scope, TimeEventInDayNamespace::ScheduleEventInDay, event_ref_id, false)?
        .into_iter()
        .next();
    let block = match block {
        Some(block)
            if start_date.should_change() || start_time_in_day.should_change() || duration_mins.should_change() =>
        {
            Some(update_in_day_block(scope, block.ref_id(), start_date, start_time_in_day, duration_mins)?)
        }
        other => other,
    };
    Ok(InDayEventView { event, block })
}

pub fn archive_event_in_day(scope: ServiceScope<'_, '_>, event_ref_id: EntityId) -> ServiceResult<usize> {
    let event = scope.uow.get_for::<ScheduleEventInDay>().load_by_id(event_ref_id, false)?;
    reject_external(event.source, event_ref_id)?;
    scope.archive::<ScheduleEventInDay>(event_ref_id)
}

pub fn create_event_full_days(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    stream_ref_id: EntityId,
    name: EntityName,
    start_date: ADate,
    duration_days: u32,
) -> ServiceResult<FullDaysEventView> {
    let stream = user_stream(scope, stream_ref_id)?;
    let event = scope
        .uow
        .get_for::<ScheduleEventFullDays>()
        .create(ScheduleEventFullDays::new_event(
            scope.ctx,
            stream.ref_id(),
            ScheduleSource::User,
            name,
            None,
        ))?;
    scope.reporter.mark_created(&event);
    let block = upsert_full_days_block(
        scope,
        workspace_ref_id,
        TimeEventFullDaysNamespace::ScheduleFullDaysEvent,
        event.ref_id(),
        start_date,
        duration_days,
    )?;
    Ok(FullDaysEventView {
        event,
        block: Some(block),
    })
}

pub fn update_event_full_days(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    event_ref_id: EntityId,
    name: UpdateAction<EntityName>,
    start_date: UpdateAction<ADate>,
    duration_days: UpdateAction<u32>,
) -> ServiceResult<FullDaysEventView> {
    let repo = scope.uow.get_for::<ScheduleEventFullDays>();
    let event = repo.load_by_id(event_ref_id, false)?;
    reject_external(event.source, event_ref_id)?;
    let event = if name.should_change() {
        let event = repo.save(event.update(scope.ctx, name)?)?;
        scope.reporter.mark_updated(&event);
        event
    } else {
        event
    };
    let namespace = TimeEventFullDaysNamespace::ScheduleFullDaysEvent;
    let block = find_full_days_blocks(scope, namespace, event_ref_id, false)?
        .into_iter()
        .next();
    let block = match block {
        Some(block) if start_date.should_change() || duration_days.should_change() => Some(upsert_full_days_block(
            scope,
            workspace_ref_id,
            namespace,
            event_ref_id,
            start_date.or_else(block.start_date),
            duration_days.or_else(block.duration_days),
        )?),
        other => other,
    };
    Ok(FullDaysEventView { event, block })
}

pub fn archive_event_full_days(scope: ServiceScope<'_, '_>, event_ref_id: EntityId) -> ServiceResult<usize> {
    let event = scope.uow.get_for::<ScheduleEventFullDays>().load_by_id(event_ref_id, false)?;
    reject_external(event.source, event_ref_id)?;
    scope.archive::<ScheduleEventFullDays>(event_ref_id)
}

/// Live events of a stream with their blocks.
pub fn load_stream_events(
    scope: ServiceScope<'_, '_>,
    stream_ref_id: EntityId,
) -> ServiceResult<(Vec<InDayEventView>, Vec<FullDaysEventView>)> {
    let mut in_day = Vec::new();
    for event in scope
        .uow
        .get_for::<ScheduleEventInDay>()
        .find_all(stream_ref_id, false, None)?
    {
        let block = find_in_day_blocks(scope, TimeEventInDayNamespace::ScheduleEventInDay, event.ref_id(), false)?
            .into_iter()
            .next();
        in_day.push(InDayEventView { event, block });
    }
    let mut full_days = Vec::new();
    for event in scope
        .uow
        .get_for::<ScheduleEventFullDays>()
        .find_all(stream_ref_id, false, None)?
    {
        let block = find_full_days_blocks(
            scope,
            TimeEventFullDaysNamespace::ScheduleFullDaysEvent,
            event.ref_id(),
            false,
        )?
        .into_iter()
        .next();
        full_days.push(FullDaysEventView { event, block });
    }
    Ok((in_day, full_days))
}

#[cfg(test)]
mod tests {
    use super::{
        archive_stream, create_event_full_days, create_event_in_day, create_stream_for_external_ical,
        create_stream_for_user, find_streams, load_stream_events, remove_stream, update_event_full_days,
    };
    use crate::model::framework::{Entity, UpdateAction};
    use crate::model::values::{ScheduleSource, ScheduleStreamColor};
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    #[test]
    fn last_user_stream_cannot_go_away() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();

        let streams = find_streams(scope, ws, Some(ScheduleSource::User), false).expect("streams");
        assert_eq!(streams.len(), 1);
        let personal = streams[0].ref_id();
        assert!(matches!(
            archive_stream(scope, ws, personal),
            Err(ServiceError::InvariantViolation(_))
        ));

        let external = create_stream_for_external_ical(
            scope,
            ws,
            "Holidays".parse().expect("name"),
            ScheduleStreamColor::Green,
            "https://example.com/holidays.ics".parse().expect("url"),
        )
        .expect("external");
        assert!(matches!(
            create_event_in_day(
                scope,
                ws,
                external.ref_id(),
                "Standup".parse().expect("name"),
                "2024-03-05".parse().expect("date"),
                "09:30".parse().expect("time"),
                15,
            ),
            Err(ServiceError::InvariantViolation(_))
        ));
        assert!(matches!(
            remove_stream(scope, ws, personal),
            Err(ServiceError::InvariantViolation(_))
        ));

        let work = create_stream_for_user(scope, ws, "Work".parse().expect("name"), ScheduleStreamColor::Red)
            .expect("stream");
        assert!(archive_stream(scope, ws, personal).expect("archive") >= 1);
        assert!(matches!(
            archive_stream(scope, ws, work.ref_id()),
            Err(ServiceError::InvariantViolation(_))
        ));
    }

    #[test]
    fn full_days_events_move_their_block() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let stream = create_stream_for_user(scope, ws, "Trips".parse().expect("name"), ScheduleStreamColor::Blue)
            .expect("stream");

        let created = create_event_full_days(
            scope,
            ws,
            stream.ref_id(),
            "Conference".parse().expect("name"),
            "2024-04-10".parse().expect("date"),
            3,
        )
        .expect("event");
        let moved = update_event_full_days(
            scope,
            ws,
            created.event.ref_id(),
            UpdateAction::do_nothing(),
            UpdateAction::change_to("2024-04-15".parse().expect("date")),
            UpdateAction::do_nothing(),
        )
        .expect("move");
        let block = moved.block.expect("block");
        assert_eq!(block.start_date, "2024-04-15".parse().expect("date"));
        assert_eq!(block.duration_days, 3);
        let (in_day, full_days) = load_stream_events(scope, stream.ref_id()).expect("events");
        assert!(in_day.is_empty());
        assert_eq!(full_days.len(), 1);
    }
}
