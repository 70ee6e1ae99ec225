mod common;

use common::{registered_with_feed, Harness};
use lifeos_core::model::values::ScheduleStreamColor;
use lifeos_core::sync::SyncRequest;
use lifeos_core::use_case::background::ScheduleExternalSyncBackgroundUseCase;
use lifeos_core::use_case::engine::ScheduleExternalSyncDoUseCase;
use lifeos_core::use_case::schedule::{
    ScheduleStreamCreateForExternalIcalArgs, ScheduleStreamCreateForExternalIcalUseCase,
    ScheduleStreamLoadEventsUseCase,
};
use lifeos_core::use_case::RefIdArgs;
use lifeos_core::EntityId;

const FEED: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//lifeos//test//EN\r\n\
BEGIN:VEVENT\r\nUID:standup\r\nSUMMARY:Standup\r\n\
DTSTART:20240305T093000Z\r\nDTEND:20240305T094500Z\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nUID:offsite\r\nSUMMARY:Offsite\r\n\
DTSTART;VALUE=DATE:20240310\r\nDTEND;VALUE=DATE:20240312\r\nEND:VEVENT\r\n\
END:VCALENDAR\r\n";

async fn team_stream(h: &Harness) -> EntityId {
    h.app
        .execute_mutation(
            &ScheduleStreamCreateForExternalIcalUseCase,
            &h.registered.auth_token,
            ScheduleStreamCreateForExternalIcalArgs {
                name: "Team".parse().expect("name"),
                color: ScheduleStreamColor::Green,
                source_ical_url: "https://example.com/team.ics".parse().expect("url"),
            },
        )
        .await
        .expect("stream")
        .header
        .ref_id
}

fn sync_request() -> SyncRequest {
    SyncRequest {
        today: "2024-03-04".parse().expect("date"),
        sync_even_if_not_modified: false,
        filter_schedule_stream_ref_ids: None,
    }
}

#[tokio::test]
async fn external_sync_mirrors_the_feed_into_the_stream() {
    let h = registered_with_feed("2024-03-04T09:00:00Z", Some(FEED.to_string())).await;
    let stream = team_stream(&h).await;
    let token = &h.registered.auth_token;

    let entry = h
        .app
        .execute_async(&ScheduleExternalSyncDoUseCase, token, sync_request())
        .await
        .expect("sync");
    assert_eq!(entry.per_stream_results.len(), 1);
    assert!(entry.per_stream_results[0].success);
    assert_eq!(entry.entity_records.len(), 2);

    let events = h
        .app
        .execute_read(&ScheduleStreamLoadEventsUseCase, token, RefIdArgs { ref_id: stream })
        .await
        .expect("events");
    assert_eq!(events.in_day.len(), 1);
    assert_eq!(events.in_day[0].event.name.as_str(), "Standup");
    assert_eq!(events.full_days.len(), 1);

    let again = h
        .app
        .execute_async(&ScheduleExternalSyncDoUseCase, token, sync_request())
        .await
        .expect("sync");
    assert!(again.entity_records.is_empty());

    let rows = h
        .app
        .audit()
        .find_by_name("schedule_external_sync_do")
        .await
        .expect("audit");
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn unreachable_feed_is_reported_per_stream() {
    let h = registered_with_feed("2024-03-04T09:00:00Z", None).await;
    team_stream(&h).await;

    let run = h
        .app
        .execute_background(&ScheduleExternalSyncBackgroundUseCase)
        .await
        .expect("run");
    assert_eq!(run.workspaces, 1);
    assert_eq!(run.failed, 0);

    let entry = h
        .app
        .execute_async(
            &ScheduleExternalSyncDoUseCase,
            &h.registered.auth_token,
            sync_request(),
        )
        .await
        .expect("sync");
    assert!(!entry.per_stream_results[0].success);
    assert!(entry.per_stream_results[0].error_msg.is_some());
}

const RECURRING_FEED: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//lifeos//test//EN\r\n\
BEGIN:VEVENT\r\nUID:weekly\r\nSUMMARY:Weekly sync\r\n\
DTSTART:20240304T100000Z\r\nDTEND:20240304T103000Z\r\nRRULE:FREQ=WEEKLY\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nUID:weekly\r\nRECURRENCE-ID:20240311T100000Z\r\nSUMMARY:Weekly sync (moved)\r\n\
DTSTART:20240311T140000Z\r\nDTEND:20240311T143000Z\r\nEND:VEVENT\r\n\
END:VCALENDAR\r\n";

#[tokio::test]
async fn recurring_override_sharing_a_uid_is_not_duplicated() {
    let h = registered_with_feed("2024-03-04T09:00:00Z", Some(RECURRING_FEED.to_string())).await;
    let stream = team_stream(&h).await;
    let token = &h.registered.auth_token;

    for run in 0..3 {
        let entry = h
            .app
            .execute_async(&ScheduleExternalSyncDoUseCase, token, sync_request())
            .await
            .expect("sync");
        let expected = if run == 0 { 2 } else { 0 };
        assert_eq!(entry.entity_records.len(), expected);
    }

    let events = h
        .app
        .execute_read(&ScheduleStreamLoadEventsUseCase, token, RefIdArgs { ref_id: stream })
        .await
        .expect("events");
    assert_eq!(events.in_day.len(), 2);
}
