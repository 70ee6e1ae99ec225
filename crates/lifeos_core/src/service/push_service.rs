//! Slack and email push tasks with their generated inbox tasks.
//!
//! # Invariants
//! - A push task owns at most one generated inbox task, flagged by `has_generated_task`.
//! - Generated tasks land in the push collection's generation project.
//! - Archiving or removing a push task cascades to its inbox task.

use crate::model::framework::{Entity, EntityId, EntityName, UpdateAction};
use crate::model::inbox_task::{InboxTask, InboxTaskCollection, InboxTaskDraft};
use crate::model::push_integration::{
    EmailTask, EmailTaskCollection, PushGenerationExtraInfo, PushIntegrationGroup, SlackTask,
    SlackTaskCollection,
};
use crate::model::values::{EmailAddress, Eisen, InboxTaskSource, InboxTaskStatus};
use crate::repo::{EntityRepository, TrunkEntityRepository};
use crate::service::inbox_task_service::find_generated_tasks;
use crate::service::project_service::resolve_project;
use crate::service::{ServiceResult, ServiceScope};
use log::info;

fn push_draft(
    source: InboxTaskSource,
    source_entity_ref_id: EntityId,
    name: EntityName,
    project_ref_id: EntityId,
    extra: &PushGenerationExtraInfo,
) -> InboxTaskDraft {
    let mut draft = InboxTaskDraft::user(name, project_ref_id);
    draft.source = source;
    draft.source_entity_ref_id = Some(source_entity_ref_id);
    draft.status = extra.status.unwrap_or(InboxTaskStatus::Accepted);
    draft.eisen = extra.eisen.unwrap_or(Eisen::Regular);
    draft.difficulty = extra.difficulty;
    draft.actionable_date = extra.actionable_date;
    draft.due_date = extra.due_date;
    draft
}

fn create_push_inbox_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    draft: InboxTaskDraft,
) -> ServiceResult<InboxTask> {
    let collection: InboxTaskCollection = scope.trunk(workspace_ref_id)?;
    let task = scope
        .uow
        .get_for::<InboxTask>()
        .create(InboxTask::new_inbox_task(scope.ctx, collection.ref_id(), draft)?)?;
    scope.reporter.mark_created(&task);
    Ok(task)
}

/// Rewrites the generator-owned fields of the push task's inbox task, if any.
fn refresh_push_inbox_task(
    scope: ServiceScope<'_, '_>,
    source: InboxTaskSource,
    source_entity_ref_id: EntityId,
    draft: InboxTaskDraft,
) -> ServiceResult<Option<InboxTask>> {
    let repo = scope.uow.get_for::<InboxTask>();
    let Some(task) = find_generated_tasks(scope, source, source_entity_ref_id, false)?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    let task = repo.save(task.update_generated(
        scope.ctx,
        draft.name,
        draft.project_ref_id,
        draft.eisen,
        draft.difficulty,
        draft.actionable_date,
        draft.due_date,
    )?)?;
    scope.reporter.mark_updated(&task);
    Ok(Some(task))
}

pub(crate) fn slack_collection(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
) -> ServiceResult<SlackTaskCollection> {
    let group: PushIntegrationGroup = scope.trunk(workspace_ref_id)?;
    scope.trunk(group.ref_id())
}

pub(crate) fn email_collection(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
) -> ServiceResult<EmailTaskCollection> {
    let group: PushIntegrationGroup = scope.trunk(workspace_ref_id)?;
    scope.trunk(group.ref_id())
}

pub fn create_slack_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    user: String,
    channel: Option<String>,
    message: String,
    extra: PushGenerationExtraInfo,
) -> ServiceResult<(SlackTask, InboxTask)> {
    let collection = slack_collection(scope, workspace_ref_id)?;
    let repo = scope.uow.get_for::<SlackTask>();
    let slack_task = repo.create(SlackTask::new_slack_task(
        scope.ctx,
        collection.ref_id(),
        user,
        channel,
        message,
        extra,
    ))?;
    scope.reporter.mark_created(&slack_task);
    let (slack_task, task) = generate_for_slack_task(scope, workspace_ref_id, &collection, slack_task)?;
    info!(
        "event=push_task_create module=service status=ok kind=slack_task id={} inbox_task_id={}",
        slack_task.ref_id(),
        task.ref_id()
    );
    Ok((slack_task, task))
}

fn generate_for_slack_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    collection: &SlackTaskCollection,
    slack_task: SlackTask,
) -> ServiceResult<(SlackTask, InboxTask)> {
    let draft = push_draft(
        InboxTaskSource::SlackTask,
        slack_task.ref_id(),
        slack_task.default_task_name(),
        collection.generation_project_ref_id,
        &slack_task.generation_extra_info,
    );
    let task = create_push_inbox_task(scope, workspace_ref_id, draft)?;
    let slack_task = scope
        .uow
        .get_for::<SlackTask>()
        .save(slack_task.mark_generated(scope.ctx))?;
    scope.reporter.mark_updated(&slack_task);
    Ok((slack_task, task))
}

pub fn update_slack_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    slack_task_ref_id: EntityId,
    message: UpdateAction<String>,
    extra: UpdateAction<PushGenerationExtraInfo>,
) -> ServiceResult<SlackTask> {
    let collection = slack_collection(scope, workspace_ref_id)?;
    let repo = scope.uow.get_for::<SlackTask>();
    let slack_task = repo.save(repo.load_by_id(slack_task_ref_id, false)?.update(scope.ctx, message, extra))?;
    scope.reporter.mark_updated(&slack_task);
    let draft = push_draft(
        InboxTaskSource::SlackTask,
        slack_task.ref_id(),
        slack_task.default_task_name(),
        collection.generation_project_ref_id,
        &slack_task.generation_extra_info,
    );
    refresh_push_inbox_task(scope, InboxTaskSource::SlackTask, slack_task.ref_id(), draft)?;
    Ok(slack_task)
}

pub fn archive_slack_task(scope: ServiceScope<'_, '_>, slack_task_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<SlackTask>(slack_task_ref_id)
}

pub fn remove_slack_task(scope: ServiceScope<'_, '_>, slack_task_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<SlackTask>(slack_task_ref_id)
}

#[allow(clippy::too_many_arguments)]
pub fn create_email_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    from_address: EmailAddress,
    from_name: String,
    to_address: EmailAddress,
    subject: String,
    body: String,
    extra: PushGenerationExtraInfo,
) -> ServiceResult<(EmailTask, InboxTask)> {
    let collection = email_collection(scope, workspace_ref_id)?;
    let email_task = scope.uow.get_for::<EmailTask>().create(EmailTask::new_email_task(
        scope.ctx,
        collection.ref_id(),
        from_address,
        from_name,
        to_address,
        subject,
        body,
        extra,
    ))?;
    scope.reporter.mark_created(&email_task);
    let (email_task, task) = generate_for_email_task(scope, workspace_ref_id, &collection, email_task)?;
    info!(
        "event=push_task_create module=service status=ok kind=email_task id={} inbox_task_id={}",
        email_task.ref_id(),
        task.ref_id()
    );
    Ok((email_task, task))
}

fn generate_for_email_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    collection: &EmailTaskCollection,
    email_task: EmailTask,
) -> ServiceResult<(EmailTask, InboxTask)> {
    let draft = push_draft(
        InboxTaskSource::EmailTask,
        email_task.ref_id(),
        email_task.default_task_name(),
        collection.generation_project_ref_id,
        &email_task.generation_extra_info,
    );
    let task = create_push_inbox_task(scope, workspace_ref_id, draft)?;
    let email_task = scope
        .uow
        .get_for::<EmailTask>()
        .save(email_task.mark_generated(scope.ctx))?;
    scope.reporter.mark_updated(&email_task);
    Ok((email_task, task))
}

pub fn update_email_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    email_task_ref_id: EntityId,
    subject: UpdateAction<String>,
    body: UpdateAction<String>,
    extra: UpdateAction<PushGenerationExtraInfo>,
) -> ServiceResult<EmailTask> {
    let collection = email_collection(scope, workspace_ref_id)?;
    let repo = scope.uow.get_for::<EmailTask>();
    let email_task =
        repo.save(repo.load_by_id(email_task_ref_id, false)?.update(scope.ctx, subject, body, extra))?;
    scope.reporter.mark_updated(&email_task);
    let draft = push_draft(
        InboxTaskSource::EmailTask,
        email_task.ref_id(),
        email_task.default_task_name(),
        collection.generation_project_ref_id,
        &email_task.generation_extra_info,
    );
    refresh_push_inbox_task(scope, InboxTaskSource::EmailTask, email_task.ref_id(), draft)?;
    Ok(email_task)
}

pub fn archive_email_task(scope: ServiceScope<'_, '_>, email_task_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<EmailTask>(email_task_ref_id)
}

pub fn remove_email_task(scope: ServiceScope<'_, '_>, email_task_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<EmailTask>(email_task_ref_id)
}

/// Points both push collections at another project of the workspace.
pub fn change_generation_project(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    project_ref_id: Option<EntityId>,
) -> ServiceResult<()> {
    let project_ref_id = resolve_project(scope, workspace_ref_id, project_ref_id)?;
    let group: PushIntegrationGroup = scope.trunk(workspace_ref_id)?;
    let slack_repo = scope.uow.get_for::<SlackTaskCollection>();
    let slack = slack_repo.load_by_parent(group.ref_id())?;
    let slack = slack_repo.save(slack.change_generation_project(scope.ctx, project_ref_id))?;
    scope.reporter.mark_updated(&slack);
    let email_repo = scope.uow.get_for::<EmailTaskCollection>();
    let email = email_repo.load_by_parent(group.ref_id())?;
    let email = email_repo.save(email.change_generation_project(scope.ctx, project_ref_id))?;
    scope.reporter.mark_updated(&email);
    Ok(())
}

/// Generates inbox tasks for live Slack tasks still missing one.
pub fn generate_missing_slack_tasks(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
) -> ServiceResult<Vec<InboxTask>> {
    let collection = slack_collection(scope, workspace_ref_id)?;
    let pending = scope
        .uow
        .get_for::<SlackTask>()
        .find_all(collection.ref_id(), false, None)?
        .into_iter()
        .filter(|slack_task| !slack_task.has_generated_task);
    let mut created = Vec::new();
    for slack_task in pending {
        let (_, task) = generate_for_slack_task(scope, workspace_ref_id, &collection, slack_task)?;
        created.push(task);
    }
    Ok(created)
}

/// Generates inbox tasks for live email tasks still missing one.
pub fn generate_missing_email_tasks(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
) -> ServiceResult<Vec<InboxTask>> {
    let collection = email_collection(scope, workspace_ref_id)?;
    let pending = scope
        .uow
        .get_for::<EmailTask>()
        .find_all(collection.ref_id(), false, None)?
        .into_iter()
        .filter(|email_task| !email_task.has_generated_task);
    let mut created = Vec::new();
    for email_task in pending {
        let (_, task) = generate_for_email_task(scope, workspace_ref_id, &collection, email_task)?;
        created.push(task);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::{archive_slack_task, create_email_task, create_slack_task, update_slack_task};
    use crate::model::framework::{ArchivalReason, Entity, UpdateAction};
    use crate::model::inbox_task::InboxTask;
    use crate::model::push_integration::PushGenerationExtraInfo;
    use crate::model::values::{InboxTaskSource, InboxTaskStatus};
    use crate::repo::EntityRepository;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    #[test]
    fn slack_task_generates_and_archives_its_inbox_task() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();

        let (slack_task, task) = create_slack_task(
            scope,
            ws,
            "grace".into(),
            Some("general".into()),
            "can you review?".into(),
            PushGenerationExtraInfo::default(),
        )
        .expect("slack task");
        assert!(slack_task.has_generated_task);
        assert_eq!(task.source, InboxTaskSource::SlackTask);
        assert_eq!(task.status, InboxTaskStatus::Accepted);
        assert_eq!(task.project_ref_id, seeded.root_project_ref_id);

        let extra = PushGenerationExtraInfo {
            name: Some("Review the PR".parse().expect("name")),
            ..Default::default()
        };
        update_slack_task(
            scope,
            ws,
            slack_task.ref_id(),
            UpdateAction::do_nothing(),
            UpdateAction::change_to(extra),
        )
        .expect("update");
        let task = uow.get_for::<InboxTask>().load_by_id(task.ref_id(), false).expect("task");
        assert_eq!(task.name.to_string(), "Review the PR");

        assert_eq!(archive_slack_task(scope, slack_task.ref_id()).expect("archive"), 2);
        let task = uow.get_for::<InboxTask>().load_by_id(task.ref_id(), true).expect("task");
        assert_eq!(task.header.archival_reason, Some(ArchivalReason::User));
    }

    #[test]
    fn email_task_honours_extra_info() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let extra = PushGenerationExtraInfo {
            status: Some(InboxTaskStatus::InProgress),
            due_date: Some("2024-03-08".parse().expect("date")),
            ..Default::default()
        };
        let (_, task) = create_email_task(
            scope,
            seeded.workspace.ref_id(),
            "ada@example.com".parse().expect("email"),
            "Ada".into(),
            "owner@example.com".parse().expect("email"),
            "Invoice".into(),
            "Please pay".into(),
            extra,
        )
        .expect("email task");
        assert_eq!(task.name.to_string(), "Reply to Invoice");
        assert_eq!(task.status, InboxTaskStatus::InProgress);
        assert!(task.working_time.is_some());
    }
}
