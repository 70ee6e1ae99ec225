mod common;

use common::registered_at;
use lifeos_core::model::big_plan::{BigPlan, BigPlanMilestone};
use lifeos_core::model::framework::{ADate, ArchivalReason, EventKind};
use lifeos_core::model::inbox_task::{InboxTask, InboxTaskUpdate};
use lifeos_core::model::values::{BigPlanStatus, InboxTaskStatus};
use lifeos_core::repo::EntityRepository;
use lifeos_core::service::big_plan_service::NewBigPlan;
use lifeos_core::service::inbox_task_service::NewInboxTask;
use lifeos_core::use_case::big_plan::{
    BigPlanArchiveUseCase, BigPlanCreateUseCase, BigPlanMilestoneCreateArgs, BigPlanMilestoneCreateUseCase,
};
use lifeos_core::use_case::engine::{SearchArgs, SearchUseCase};
use lifeos_core::use_case::inbox_task::{InboxTaskCreateUseCase, InboxTaskUpdateArgs, InboxTaskUpdateUseCase};
use lifeos_core::use_case::{InvocationResult, RefIdArgs};
use lifeos_core::{UpdateAction, UseCaseError};

fn date(raw: &str) -> ADate {
    raw.parse().expect("date")
}

fn launch_plan() -> NewBigPlan {
    NewBigPlan {
        actionable_date: Some(date("2024-06-01")),
        due_date: Some(date("2024-06-30")),
        ..NewBigPlan::named("Launch".parse().expect("name"))
    }
}

fn search_launch() -> SearchArgs {
    SearchArgs {
        query: "launch".to_string(),
        limit: None,
        entity_kinds: Vec::new(),
        include_archived: false,
    }
}

#[tokio::test]
async fn create_big_plan_starts_accepted_with_one_created_event() {
    let h = registered_at("2024-05-20T09:00:00Z").await;
    let token = &h.registered.auth_token;

    let big_plan = h
        .app
        .execute_mutation(&BigPlanCreateUseCase, token, launch_plan())
        .await
        .expect("create big plan");
    assert_eq!(big_plan.status, BigPlanStatus::Accepted);
    assert_eq!(big_plan.header.version, 1);
    assert!(big_plan.accepted_time.is_some());

    let ref_id = big_plan.header.ref_id;
    let events = h
        .app
        .domain()
        .with_snapshot(|uow| uow.get_for::<BigPlan>().events_for(ref_id))
        .await
        .expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Created);

    let audit = h.app.audit().find_by_name("big_plan_create").await.expect("audit");
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].result, InvocationResult::Success);
    assert_eq!(audit[0].workspace_ref_id, Some(h.registered.workspace_ref_id));
}

#[tokio::test]
async fn milestone_before_actionable_date_is_rejected_and_audited() {
    let h = registered_at("2024-05-20T09:00:00Z").await;
    let token = &h.registered.auth_token;
    let big_plan = h
        .app
        .execute_mutation(&BigPlanCreateUseCase, token, launch_plan())
        .await
        .expect("create big plan");

    let err = h
        .app
        .execute_mutation(
            &BigPlanMilestoneCreateUseCase,
            token,
            BigPlanMilestoneCreateArgs {
                big_plan_ref_id: big_plan.header.ref_id,
                date: date("2024-05-15"),
                name: "Kickoff".parse().expect("name"),
            },
        )
        .await
        .expect_err("milestone outside the plan");
    assert!(matches!(err, UseCaseError::InputValidation(_)));
    assert!(err.to_string().contains("milestone date before actionable date"));

    let parent = big_plan.header.ref_id;
    let milestones = h
        .app
        .domain()
        .with_snapshot(|uow| uow.get_for::<BigPlanMilestone>().find_all(parent, true, None))
        .await
        .expect("milestones");
    assert!(milestones.is_empty());

    let audit = h
        .app
        .audit()
        .find_by_name("big_plan_milestone_create")
        .await
        .expect("audit");
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].result, InvocationResult::Failure);
    assert!(audit[0]
        .error_str
        .as_deref()
        .unwrap_or_default()
        .contains("milestone date before actionable date"));
}

#[tokio::test]
async fn archiving_a_big_plan_archives_its_inbox_tasks_and_drops_them_from_search() {
    let h = registered_at("2024-05-20T09:00:00Z").await;
    let token = &h.registered.auth_token;
    let big_plan = h
        .app
        .execute_mutation(&BigPlanCreateUseCase, token, launch_plan())
        .await
        .expect("create big plan");

    let mut task_ids = Vec::new();
    for name in ["Launch checklist", "Launch party", "Launch poster"] {
        let task = h
            .app
            .execute_mutation(
                &InboxTaskCreateUseCase,
                token,
                NewInboxTask {
                    big_plan_ref_id: Some(big_plan.header.ref_id),
                    ..NewInboxTask::named(name.parse().expect("name"))
                },
            )
            .await
            .expect("create inbox task");
        task_ids.push(task.header.ref_id);
    }
    h.app
        .execute_mutation(
            &InboxTaskUpdateUseCase,
            token,
            InboxTaskUpdateArgs {
                ref_id: task_ids[2],
                update: InboxTaskUpdate {
                    status: UpdateAction::change_to(InboxTaskStatus::Done),
                    ..InboxTaskUpdate::default()
                },
            },
        )
        .await
        .expect("complete one task");

    let hits = h
        .app
        .execute_async(&SearchUseCase, token, search_launch())
        .await
        .expect("search before");
    assert_eq!(hits.len(), 4);

    h.app
        .execute_mutation(
            &BigPlanArchiveUseCase,
            token,
            RefIdArgs {
                ref_id: big_plan.header.ref_id,
            },
        )
        .await
        .expect("archive big plan");

    let plan_ref_id = big_plan.header.ref_id;
    let (plan, tasks) = h
        .app
        .domain()
        .with_snapshot(|uow| -> Result<(BigPlan, Vec<InboxTask>), lifeos_core::RepoError> {
            let plan = uow.get_for::<BigPlan>().load_by_id(plan_ref_id, true)?;
            let tasks = task_ids
                .iter()
                .map(|ref_id| uow.get_for::<InboxTask>().load_by_id(*ref_id, true))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((plan, tasks))
        })
        .await
        .expect("reload");
    assert!(plan.header.archived);
    assert_eq!(plan.header.archival_reason, Some(ArchivalReason::User));
    for task in &tasks {
        assert!(task.header.archived, "task {} still active", task.name);
        assert_eq!(task.header.archival_reason, Some(ArchivalReason::User));
    }

    let ref_id = task_ids[0];
    let events = h
        .app
        .domain()
        .with_snapshot(|uow| uow.get_for::<InboxTask>().events_for(ref_id))
        .await
        .expect("events");
    assert_eq!(events.last().map(|event| event.kind), Some(EventKind::Archived));

    let hits = h
        .app
        .execute_async(&SearchUseCase, token, search_launch())
        .await
        .expect("search after");
    assert!(hits.is_empty());
}
