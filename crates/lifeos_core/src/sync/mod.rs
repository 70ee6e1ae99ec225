//! External calendar sync.
//!
//! # Responsibility
//! - Fetch every external stream's iCal feed through a `CalendarFetcher`.
//! - Project feed events 1:1 onto schedule events and their time blocks.
//! - Record one `ScheduleExternalSyncLogEntry` per run with per-stream outcomes.
//!
//! # Invariants
//! - A failing stream is logged and skipped; the other streams still sync.
//! - Events that left the feed are archived with reason `sync`.
//! - At most one live event per stream carries a given sync key; extras are archived.

pub mod ical;

use crate::model::framework::{
    ADate, ArchivalReason, CrownEntity, Entity, EntityId, EntityName, UpdateAction,
};
use crate::model::run_log::{EntityOutcome, EntitySummary};
use crate::model::schedule::{
    ScheduleEventFullDays, ScheduleEventInDay, ScheduleExternalSyncLog, ScheduleExternalSyncLogEntry,
    ScheduleStream, StreamSyncResult,
};
use crate::model::values::{ScheduleSource, TimeEventFullDaysNamespace, TimeEventInDayNamespace, Url};
use crate::repo::EntityRepository;
use crate::service::schedule_service::find_streams;
use crate::service::time_event_service::{
    create_in_day_block, find_full_days_blocks, find_in_day_blocks, update_in_day_block,
    upsert_full_days_block,
};
use crate::service::{ServiceResult, ServiceScope};
use async_trait::async_trait;
use ical::{parse_calendar, ExternalEvent, ExternalTiming};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarSyncError {
    #[error("calendar fetch failed: {0}")]
    Fetch(String),
    #[error("calendar parse failed: {0}")]
    Parse(String),
}

/// Source of raw iCal text for a stream URL.
#[async_trait(?Send)]
pub trait CalendarFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, CalendarSyncError>;
}

/// Fetches feeds over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpCalendarFetcher {
    client: reqwest::Client,
}

impl HttpCalendarFetcher {
    pub fn new(timeout: Duration) -> Result<Self, CalendarSyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CalendarSyncError::Fetch(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl CalendarFetcher for HttpCalendarFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, CalendarSyncError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|err| CalendarSyncError::Fetch(err.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|err| CalendarSyncError::Fetch(err.to_string()))?;
        response
            .text()
            .await
            .map_err(|err| CalendarSyncError::Fetch(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub today: ADate,
    pub sync_even_if_not_modified: bool,
    pub filter_schedule_stream_ref_ids: Option<Vec<EntityId>>,
}

struct StreamSync<'a, 'conn> {
    scope: ServiceScope<'a, 'conn>,
    workspace_ref_id: EntityId,
    force: bool,
    touched: Vec<EntitySummary>,
}

impl StreamSync<'_, '_> {
    fn archive<E: CrownEntity>(&mut self, entity: &E) -> ServiceResult<()> {
        self.scope
            .archive_with_reason::<E>(entity.ref_id(), ArchivalReason::Sync)?;
        self.touched.push(EntitySummary::of(entity, EntityOutcome::Archived));
        Ok(())
    }

    fn index_by_key<E: CrownEntity>(
        &mut self,
        events: Vec<E>,
        key_of: impl Fn(&E) -> Option<String>,
    ) -> ServiceResult<HashMap<String, E>> {
        let mut indexed = HashMap::with_capacity(events.len());
        for event in events {
            let Some(key) = key_of(&event) else {
                continue;
            };
            match indexed.entry(key) {
                Entry::Occupied(_) => self.archive(&event)?,
                Entry::Vacant(slot) => {
                    slot.insert(event);
                }
            }
        }
        Ok(indexed)
    }

    fn apply(&mut self, stream: &ScheduleStream, events: Vec<ExternalEvent>) -> ServiceResult<()> {
        let scope = self.scope;
        let in_day_repo = scope.uow.get_for::<ScheduleEventInDay>();
        let full_days_repo = scope.uow.get_for::<ScheduleEventFullDays>();
        let mut in_day = self.index_by_key(
            in_day_repo.find_all(stream.ref_id(), false, None)?,
            |event: &ScheduleEventInDay| event.external_uid.clone(),
        )?;
        let mut full_days = self.index_by_key(
            full_days_repo.find_all(stream.ref_id(), false, None)?,
            |event: &ScheduleEventFullDays| event.external_uid.clone(),
        )?;

        for external in events {
            let key = external.sync_key();
            let name = EntityName::from_generated(&external.name);
            match external.timing {
                ExternalTiming::InDay {
                    start_date,
                    start_time_in_day,
                    duration_mins,
                } => {
                    if let Some(stale) = full_days.remove(&key) {
                        self.archive(&stale)?;
                    }
                    match in_day.remove(&key) {
                        Some(event) => {
                            let block = find_in_day_blocks(
                                scope,
                                TimeEventInDayNamespace::ScheduleEventInDay,
                                event.ref_id(),
                                false,
                            )?
                            .into_iter()
                            .next();
                            let moved = block.as_ref().map_or(true, |block| {
                                block.start_date != start_date
                                    || block.start_time_in_day != start_time_in_day
                                    || block.duration_mins != duration_mins
                            });
                            if !self.force && !moved && event.name == name {
                                continue;
                            }
                            let event = in_day_repo.save(event.update_from_sync(scope.ctx, name))?;
                            scope.reporter.mark_updated(&event);
                            match block {
                                Some(block) => {
                                    update_in_day_block(
                                        scope,
                                        block.ref_id(),
                                        UpdateAction::change_to(start_date),
                                        UpdateAction::change_to(start_time_in_day),
                                        UpdateAction::change_to(duration_mins),
                                    )?;
                                }
                                None => {
                                    create_in_day_block(
                                        scope,
                                        self.workspace_ref_id,
                                        TimeEventInDayNamespace::ScheduleEventInDay,
                                        event.ref_id(),
                                        start_date,
                                        start_time_in_day,
                                        duration_mins,
                                    )?;
                                }
                            }
                            self.touched.push(EntitySummary::of(&event, EntityOutcome::Updated));
                        }
                        None => {
                            let event = in_day_repo.create(ScheduleEventInDay::new_event(
                                scope.ctx,
                                stream.ref_id(),
                                ScheduleSource::ExternalIcal,
                                name,
                                Some(key),
                            ))?;
                            scope.reporter.mark_created(&event);
                            create_in_day_block(
                                scope,
                                self.workspace_ref_id,
                                TimeEventInDayNamespace::ScheduleEventInDay,
                                event.ref_id(),
                                start_date,
                                start_time_in_day,
                                duration_mins,
                            )?;
                            self.touched.push(EntitySummary::of(&event, EntityOutcome::Created));
                        }
                    }
                }
                ExternalTiming::FullDays {
                    start_date,
                    duration_days,
                } => {
                    if let Some(stale) = in_day.remove(&key) {
                        self.archive(&stale)?;
                    }
                    let namespace = TimeEventFullDaysNamespace::ScheduleFullDaysEvent;
                    match full_days.remove(&key) {
                        Some(event) => {
                            let block = find_full_days_blocks(scope, namespace, event.ref_id(), false)?
                                .into_iter()
                                .next();
                            let moved = block.as_ref().map_or(true, |block| {
                                block.start_date != start_date || block.duration_days != duration_days
                            });
                            if !self.force && !moved && event.name == name {
                                continue;
                            }
                            let event = full_days_repo.save(event.update_from_sync(scope.ctx, name))?;
                            scope.reporter.mark_updated(&event);
                            upsert_full_days_block(
                                scope,
                                self.workspace_ref_id,
                                namespace,
                                event.ref_id(),
                                start_date,
                                duration_days,
                            )?;
                            self.touched.push(EntitySummary::of(&event, EntityOutcome::Updated));
                        }
                        None => {
                            let event = full_days_repo.create(ScheduleEventFullDays::new_event(
                                scope.ctx,
                                stream.ref_id(),
                                ScheduleSource::ExternalIcal,
                                name,
                                Some(key),
                            ))?;
                            scope.reporter.mark_created(&event);
                            upsert_full_days_block(
                                scope,
                                self.workspace_ref_id,
                                namespace,
                                event.ref_id(),
                                start_date,
                                duration_days,
                            )?;
                            self.touched.push(EntitySummary::of(&event, EntityOutcome::Created));
                        }
                    }
                }
            }
        }

        for stale in in_day.into_values() {
            self.archive(&stale)?;
        }
        for stale in full_days.into_values() {
            self.archive(&stale)?;
        }
        let stream = scope
            .uow
            .get_for::<ScheduleStream>()
            .save(stream.clone().mark_synced(scope.ctx))?;
        scope.reporter.mark_updated(&stream);
        Ok(())
    }
}

/// Raw feed outcome for one stream, fetched outside any unit of work.
#[derive(Debug)]
pub struct FetchedFeed {
    pub schedule_stream_ref_id: EntityId,
    pub outcome: Result<Vec<ExternalEvent>, CalendarSyncError>,
}

/// External streams of a workspace that `request` selects.
pub fn streams_to_sync(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    request: &SyncRequest,
) -> ServiceResult<Vec<ScheduleStream>> {
    Ok(
        find_streams(scope, workspace_ref_id, Some(ScheduleSource::ExternalIcal), false)?
            .into_iter()
            .filter(|stream| stream.source_ical_url.is_some())
            .filter(|stream| {
                request
                    .filter_schedule_stream_ref_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&stream.ref_id()))
            })
            .collect(),
    )
}

/// Fetches and parses every stream's feed; failures stay per stream.
pub async fn fetch_feeds(fetcher: &dyn CalendarFetcher, streams: &[ScheduleStream]) -> Vec<FetchedFeed> {
    let mut feeds = Vec::with_capacity(streams.len());
    for stream in streams {
        let Some(url) = stream.source_ical_url.as_ref() else {
            continue;
        };
        let outcome = match fetcher.fetch(url).await {
            Ok(raw) => parse_calendar(&raw),
            Err(err) => Err(err),
        };
        feeds.push(FetchedFeed {
            schedule_stream_ref_id: stream.ref_id(),
            outcome,
        });
    }
    feeds
}

/// Projects fetched feeds onto one workspace's schedule and logs the run.
pub fn apply_external_sync(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    request: &SyncRequest,
    feeds: Vec<FetchedFeed>,
) -> ServiceResult<ScheduleExternalSyncLogEntry> {
    let started_at = Instant::now();
    let sync_log: ScheduleExternalSyncLog = scope.trunk(workspace_ref_id)?;
    let entries = scope.uow.get_for::<ScheduleExternalSyncLogEntry>();
    let mut entry = entries.create(ScheduleExternalSyncLogEntry::new_log_entry(
        scope.ctx,
        sync_log.ref_id(),
        request.today,
        request.sync_even_if_not_modified,
        request.filter_schedule_stream_ref_ids.clone(),
    ))?;
    scope.reporter.mark_created(&entry);

    let streams = scope.uow.get_for::<ScheduleStream>();
    let mut failed = 0usize;
    for feed in feeds {
        // The stream may have been archived while its feed was in flight.
        let Some(stream) = streams.load_optional(feed.schedule_stream_ref_id, false)? else {
            continue;
        };
        let mut sync = StreamSync {
            scope,
            workspace_ref_id,
            force: request.sync_even_if_not_modified,
            touched: Vec::new(),
        };
        let result = match feed.outcome {
            Ok(events) => {
                sync.apply(&stream, events)?;
                StreamSyncResult {
                    schedule_stream_ref_id: stream.ref_id(),
                    success: true,
                    error_msg: None,
                }
            }
            Err(err) => {
                failed += 1;
                warn!(
                    "event=schedule_sync_stream module=sync status=error workspace_id={} stream_id={} error={}",
                    workspace_ref_id,
                    stream.ref_id(),
                    err
                );
                StreamSyncResult {
                    schedule_stream_ref_id: stream.ref_id(),
                    success: false,
                    error_msg: Some(err.to_string()),
                }
            }
        };
        entry = entry.add_stream_result(scope.ctx, result, sync.touched)?;
    }

    let entry = entries.save(entry.close(scope.ctx)?)?;
    scope.reporter.mark_updated(&entry);
    info!(
        "event=schedule_sync module=sync status=ok workspace_id={} streams={} failed={} touched={} duration_ms={}",
        workspace_ref_id,
        entry.per_stream_results.len(),
        failed,
        entry.entity_records.len(),
        started_at.elapsed().as_millis()
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::{
        apply_external_sync, fetch_feeds, streams_to_sync, CalendarFetcher, CalendarSyncError,
        SyncRequest,
    };
    use crate::model::schedule::ScheduleExternalSyncLogEntry;
    use crate::service::ServiceResult;
    use crate::model::framework::{Entity, EntityId};
    use crate::model::schedule::{ScheduleEventFullDays, ScheduleEventInDay};
    use crate::model::values::{ScheduleSource, ScheduleStreamColor, Url};
    use crate::repo::EntityRepository;
    use crate::service::schedule_service::create_stream_for_external_ical;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeFetcher {
        feeds: RefCell<HashMap<String, String>>,
    }

    #[async_trait(?Send)]
    impl CalendarFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<String, CalendarSyncError> {
            self.feeds
                .borrow()
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| CalendarSyncError::Fetch(format!("404 for {}", url.as_str())))
        }
    }

    fn feed(events: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//lifeos//test//EN\r\n{events}END:VCALENDAR\r\n")
    }

    const STANDUP: &str = "BEGIN:VEVENT\r\nUID:standup\r\nSUMMARY:Standup\r\n\
DTSTART:20240305T093000Z\r\nDTEND:20240305T094500Z\r\nEND:VEVENT\r\n";
    const OFFSITE: &str = "BEGIN:VEVENT\r\nUID:offsite\r\nSUMMARY:Offsite\r\n\
DTSTART;VALUE=DATE:20240310\r\nDTEND;VALUE=DATE:20240312\r\nEND:VEVENT\r\n";

    const WEEKLY: &str = "BEGIN:VEVENT\r\nUID:weekly\r\nSUMMARY:Weekly sync\r\n\
DTSTART:20240304T100000Z\r\nDTEND:20240304T103000Z\r\nRRULE:FREQ=WEEKLY\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nUID:weekly\r\nRECURRENCE-ID:20240311T100000Z\r\nSUMMARY:Weekly sync (moved)\r\n\
DTSTART:20240311T140000Z\r\nDTEND:20240311T143000Z\r\nEND:VEVENT\r\n";

    fn request() -> SyncRequest {
        SyncRequest {
            today: "2024-03-04".parse().expect("date"),
            sync_even_if_not_modified: false,
            filter_schedule_stream_ref_ids: None,
        }
    }

    async fn sync_once(
        scope: ServiceScope<'_, '_>,
        fetcher: &FakeFetcher,
        ws: EntityId,
        request: &SyncRequest,
    ) -> ServiceResult<ScheduleExternalSyncLogEntry> {
        let streams = streams_to_sync(scope, ws, request)?;
        let feeds = fetch_feeds(fetcher, &streams).await;
        apply_external_sync(scope, ws, request, feeds)
    }

    #[tokio::test]
    async fn failing_stream_does_not_stop_the_others() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();

        let broken = create_stream_for_external_ical(
            scope,
            ws,
            "Broken".parse().expect("name"),
            ScheduleStreamColor::Red,
            "https://example.com/missing.ics".parse().expect("url"),
        )
        .expect("stream");
        let team = create_stream_for_external_ical(
            scope,
            ws,
            "Team".parse().expect("name"),
            ScheduleStreamColor::Green,
            "https://example.com/team.ics".parse().expect("url"),
        )
        .expect("stream");
        let fetcher = FakeFetcher {
            feeds: RefCell::new(HashMap::from([(
                "https://example.com/team.ics".to_string(),
                feed(&format!("{STANDUP}{OFFSITE}")),
            )])),
        };
        let request = SyncRequest {
            today: "2024-03-04".parse().expect("date"),
            sync_even_if_not_modified: false,
            filter_schedule_stream_ref_ids: None,
        };

        let entry = sync_once(scope, &fetcher, ws, &request).await.expect("sync");
        assert_eq!(entry.per_stream_results.len(), 2);
        let broken_result = entry
            .per_stream_results
            .iter()
            .find(|result| result.schedule_stream_ref_id == broken.ref_id())
            .expect("broken result");
        assert!(!broken_result.success);
        assert_eq!(entry.entity_records.len(), 2);
        assert_eq!(
            uow.get_for::<ScheduleEventInDay>()
                .find_all(team.ref_id(), false, None)
                .expect("events")
                .len(),
            1
        );

        let again = sync_once(scope, &fetcher, ws, &request).await.expect("sync");
        assert!(again.entity_records.is_empty());

        fetcher
            .feeds
            .borrow_mut()
            .insert("https://example.com/team.ics".to_string(), feed(STANDUP));
        let third = sync_once(scope, &fetcher, ws, &request).await.expect("sync");
        assert_eq!(third.entity_records.len(), 1);
        assert!(uow
            .get_for::<ScheduleEventFullDays>()
            .find_all(team.ref_id(), false, None)
            .expect("events")
            .is_empty());
    }

    #[tokio::test]
    async fn recurring_event_and_its_override_sync_idempotently() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let team = create_stream_for_external_ical(
            scope,
            ws,
            "Team".parse().expect("name"),
            ScheduleStreamColor::Blue,
            "https://example.com/team.ics".parse().expect("url"),
        )
        .expect("stream");
        let fetcher = FakeFetcher {
            feeds: RefCell::new(HashMap::from([(
                "https://example.com/team.ics".to_string(),
                feed(WEEKLY),
            )])),
        };

        let first = sync_once(scope, &fetcher, ws, &request()).await.expect("sync");
        assert_eq!(first.entity_records.len(), 2);
        for _ in 0..2 {
            let again = sync_once(scope, &fetcher, ws, &request()).await.expect("sync");
            assert!(again.entity_records.is_empty());
        }
        let mut uids: Vec<_> = uow
            .get_for::<ScheduleEventInDay>()
            .find_all(team.ref_id(), false, None)
            .expect("events")
            .into_iter()
            .filter_map(|event| event.external_uid)
            .collect();
        uids.sort();
        assert_eq!(uids, vec!["weekly".to_string(), "weekly#20240311T100000Z".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_live_events_for_one_key_are_archived() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let team = create_stream_for_external_ical(
            scope,
            ws,
            "Team".parse().expect("name"),
            ScheduleStreamColor::Blue,
            "https://example.com/team.ics".parse().expect("url"),
        )
        .expect("stream");
        let events = uow.get_for::<ScheduleEventInDay>();
        for _ in 0..2 {
            events
                .create(ScheduleEventInDay::new_event(
                    &ctx,
                    team.ref_id(),
                    ScheduleSource::ExternalIcal,
                    "Standup".parse().expect("name"),
                    Some("standup".to_string()),
                ))
                .expect("event");
        }
        let fetcher = FakeFetcher {
            feeds: RefCell::new(HashMap::from([(
                "https://example.com/team.ics".to_string(),
                feed(STANDUP),
            )])),
        };

        sync_once(scope, &fetcher, ws, &request()).await.expect("sync");
        assert_eq!(events.find_all(team.ref_id(), false, None).expect("events").len(), 1);
        assert_eq!(events.find_all(team.ref_id(), true, None).expect("events").len(), 2);
        let again = sync_once(scope, &fetcher, ws, &request()).await.expect("sync");
        assert!(again.entity_records.is_empty());
    }
}
