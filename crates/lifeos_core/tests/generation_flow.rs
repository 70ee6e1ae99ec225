mod common;

use common::registered_at;
use lifeos_core::model::values::{InboxTaskSource, RecurringTaskGenParams, RecurringTaskPeriod, SyncTarget};
use lifeos_core::service::gen_service::GenRequest;
use lifeos_core::service::inbox_task_service::InboxTaskFilter;
use lifeos_core::use_case::background::GenBackgroundUseCase;
use lifeos_core::use_case::engine::GenDoUseCase;
use lifeos_core::use_case::habit::{HabitCreateArgs, HabitCreateUseCase};
use lifeos_core::use_case::inbox_task::InboxTaskFindUseCase;
use lifeos_core::ADate;

fn habits_on(today: &str) -> GenRequest {
    GenRequest {
        targets: vec![SyncTarget::Habits],
        ..GenRequest::all(today.parse::<ADate>().expect("date"))
    }
}

fn habit_tasks() -> InboxTaskFilter {
    InboxTaskFilter {
        sources: vec![InboxTaskSource::Habit],
        ..InboxTaskFilter::default()
    }
}

#[tokio::test]
async fn daily_habit_generates_once_per_day() {
    let h = registered_at("2024-03-04T06:00:00Z").await;
    let token = &h.registered.auth_token;
    let habit = h
        .app
        .execute_mutation(
            &HabitCreateUseCase,
            token,
            HabitCreateArgs {
                project_ref_id: None,
                name: "Stretch".parse().expect("name"),
                is_key: false,
                gen_params: RecurringTaskGenParams::simple(RecurringTaskPeriod::Daily),
                repeats_in_period_count: None,
            },
        )
        .await
        .expect("habit");

    let first = h
        .app
        .execute_mutation(&GenDoUseCase, token, habits_on("2024-03-04"))
        .await
        .expect("first run");
    assert_eq!(first.entity_created_records.len(), 1);

    let tasks = h
        .app
        .execute_read(&InboxTaskFindUseCase, token, habit_tasks())
        .await
        .expect("find");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].source_entity_ref_id, Some(habit.header.ref_id));
    let recurring = tasks[0].recurring.as_ref().expect("recurring info");
    assert_eq!(recurring.period, RecurringTaskPeriod::Daily);
    assert_eq!(recurring.timeline, "2024,Q1,Mar,W10,D1");

    let second = h
        .app
        .execute_mutation(&GenDoUseCase, token, habits_on("2024-03-04"))
        .await
        .expect("second run");
    assert_eq!(second.touched_count(), 0);
    let tasks = h
        .app
        .execute_read(&InboxTaskFindUseCase, token, habit_tasks())
        .await
        .expect("find");
    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn background_generation_visits_every_workspace_and_audits_each() {
    let h = registered_at("2024-03-04T06:00:00Z").await;
    h.app
        .execute_mutation(
            &HabitCreateUseCase,
            &h.registered.auth_token,
            HabitCreateArgs {
                project_ref_id: None,
                name: "Read".parse().expect("name"),
                is_key: false,
                gen_params: RecurringTaskGenParams::simple(RecurringTaskPeriod::Daily),
                repeats_in_period_count: None,
            },
        )
        .await
        .expect("habit");

    let run = h.app.execute_background(&GenBackgroundUseCase).await.expect("run");
    assert_eq!(run.workspaces, 1);
    assert_eq!(run.failed, 0);

    let rows = h.app.audit().find_by_name("gen_background").await.expect("audit");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].workspace_ref_id, Some(h.registered.workspace_ref_id));

    let tasks = h
        .app
        .execute_read(&InboxTaskFindUseCase, &h.registered.auth_token, habit_tasks())
        .await
        .expect("find");
    assert_eq!(tasks.len(), 1);
}
