//! Garbage collection: archives work that is finished or orphaned.
//!
//! # Responsibility
//! - Sweep each requested target family with its collection rule.
//! - Archive with reason `gc` and log every archived root in a `GcLogEntry`.
//!
//! # Invariants
//! - GC only archives; nothing is removed.
//! - A second run over unchanged data archives nothing.

use crate::config::GcConfig;
use crate::model::big_plan::{BigPlan, BigPlanCollection};
use crate::model::chore::{Chore, ChoreCollection};
use crate::model::doc::{Doc, DocCollection};
use crate::model::framework::{ADate, ArchivalReason, CrownEntity, Entity, EntityId};
use crate::model::habit::{Habit, HabitCollection};
use crate::model::inbox_task::{InboxTask, InboxTaskCollection};
use crate::model::metric::{Metric, MetricCollection, MetricEntry};
use crate::model::person::Person;
use crate::model::push_integration::{EmailTask, SlackTask};
use crate::model::run_log::{EntityOutcome, EntitySummary, GcLog, GcLogEntry};
use crate::model::values::{GcTarget, InboxTaskSource};
use crate::model::working_mem::WorkingMem;
use crate::repo::EntityRepository;
use crate::service::inbox_task_service::find_generated_tasks;
use crate::service::push_service::{email_collection, slack_collection};
use crate::service::{ServiceResult, ServiceScope};
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcRequest {
    pub today: ADate,
    pub targets: Vec<GcTarget>,
}

impl GcRequest {
    pub fn all(today: ADate) -> Self {
        Self {
            today,
            targets: GcTarget::ALL.to_vec(),
        }
    }
}

struct GcRun<'s, 'a, 'conn> {
    scope: ServiceScope<'a, 'conn>,
    workspace_ref_id: EntityId,
    settings: &'s GcConfig,
    today: ADate,
    records: Vec<EntitySummary>,
}

/// Whether the entity is archived or no longer exists.
fn is_gone<E: Entity>(scope: ServiceScope<'_, '_>, ref_id: EntityId) -> ServiceResult<bool> {
    Ok(scope
        .uow
        .get_for::<E>()
        .load_optional(ref_id, true)?
        .map_or(true, |entity| entity.is_archived()))
}

impl GcRun<'_, '_, '_> {
    fn cutoff(&self, factor: i64) -> ADate {
        self.today.add_days(-(i64::from(self.settings.completed_age_days) * factor))
    }

    fn collect<E: CrownEntity>(&mut self, entity: &E) -> ServiceResult<()> {
        self.scope
            .archive_with_reason::<E>(entity.ref_id(), ArchivalReason::Gc)?;
        self.records.push(EntitySummary::of(entity, EntityOutcome::Archived));
        Ok(())
    }

    fn source_is_gone(&self, task: &InboxTask) -> ServiceResult<bool> {
        let Some(source_ref_id) = task.source_entity_ref_id else {
            return Ok(false);
        };
        let scope = self.scope;
        match task.source {
            InboxTaskSource::User => Ok(false),
            InboxTaskSource::WorkingMemCleanup => is_gone::<WorkingMem>(scope, source_ref_id),
            InboxTaskSource::Habit => is_gone::<Habit>(scope, source_ref_id),
            InboxTaskSource::Chore => is_gone::<Chore>(scope, source_ref_id),
            InboxTaskSource::BigPlan => is_gone::<BigPlan>(scope, source_ref_id),
            InboxTaskSource::Metric => is_gone::<Metric>(scope, source_ref_id),
            InboxTaskSource::PersonCatchUp | InboxTaskSource::PersonBirthday => {
                is_gone::<Person>(scope, source_ref_id)
            }
            InboxTaskSource::SlackTask => is_gone::<SlackTask>(scope, source_ref_id),
            InboxTaskSource::EmailTask => is_gone::<EmailTask>(scope, source_ref_id),
        }
    }

    fn inbox_tasks(&mut self) -> ServiceResult<()> {
        let collection: InboxTaskCollection = self.scope.trunk(self.workspace_ref_id)?;
        let cutoff = self.cutoff(1);
        let tasks = self
            .scope
            .uow
            .get_for::<InboxTask>()
            .find_all(collection.ref_id(), false, None)?;
        for task in tasks {
            let completed_long_ago = task.status.is_completed()
                && task.completed_time.map_or(false, |time| time.date() < cutoff);
            if completed_long_ago || self.source_is_gone(&task)? {
                self.collect(&task)?;
            }
        }
        Ok(())
    }

    fn big_plans(&mut self) -> ServiceResult<()> {
        let collection: BigPlanCollection = self.scope.trunk(self.workspace_ref_id)?;
        let cutoff = self.cutoff(1);
        let big_plans = self
            .scope
            .uow
            .get_for::<BigPlan>()
            .find_all(collection.ref_id(), false, None)?;
        for big_plan in big_plans {
            if big_plan.status.is_completed()
                && big_plan.completed_time.map_or(false, |time| time.date() < cutoff)
            {
                self.collect(&big_plan)?;
            }
        }
        Ok(())
    }

    fn habits(&mut self) -> ServiceResult<()> {
        let collection: HabitCollection = self.scope.trunk(self.workspace_ref_id)?;
        let stale = self.cutoff(3);
        let habits = self
            .scope
            .uow
            .get_for::<Habit>()
            .find_all(collection.ref_id(), false, None)?;
        for habit in habits {
            if habit.suspended && habit.header.last_modified_time.date() < stale {
                self.collect(&habit)?;
            }
        }
        Ok(())
    }

    fn chores(&mut self) -> ServiceResult<()> {
        let collection: ChoreCollection = self.scope.trunk(self.workspace_ref_id)?;
        let stale = self.cutoff(3);
        let ended = self.cutoff(1);
        let chores = self
            .scope
            .uow
            .get_for::<Chore>()
            .find_all(collection.ref_id(), false, None)?;
        for chore in chores {
            let suspended_long = chore.suspended && chore.header.last_modified_time.date() < stale;
            let ended_long_ago = chore.end_at_date.map_or(false, |end| end < ended);
            if suspended_long || ended_long_ago {
                self.collect(&chore)?;
            }
        }
        Ok(())
    }

    fn docs(&mut self) -> ServiceResult<()> {
        let collection: DocCollection = self.scope.trunk(self.workspace_ref_id)?;
        let docs = self
            .scope
            .uow
            .get_for::<Doc>()
            .find_all(collection.ref_id(), false, None)?;
        for doc in docs {
            let Some(parent_ref_id) = doc.parent_doc_ref_id else {
                continue;
            };
            // An earlier sweep in this run may already have taken the doc along.
            if is_gone::<Doc>(self.scope, doc.ref_id())? {
                continue;
            }
            if is_gone::<Doc>(self.scope, parent_ref_id)? {
                self.collect(&doc)?;
            }
        }
        Ok(())
    }

    fn metric_entries(&mut self) -> ServiceResult<()> {
        let collection: MetricCollection = self.scope.trunk(self.workspace_ref_id)?;
        let archived_metrics = self
            .scope
            .uow
            .get_for::<Metric>()
            .find_all(collection.ref_id(), true, None)?
            .into_iter()
            .filter(|metric| metric.is_archived());
        for metric in archived_metrics {
            let entries = self
                .scope
                .uow
                .get_for::<MetricEntry>()
                .find_all(metric.ref_id(), false, None)?;
            for entry in entries {
                self.collect(&entry)?;
            }
        }
        Ok(())
    }

    fn generated_task_is_gone(&self, source: InboxTaskSource, ref_id: EntityId) -> ServiceResult<bool> {
        let tasks = find_generated_tasks(self.scope, source, ref_id, true)?;
        Ok(!tasks.is_empty() && tasks.iter().all(|task| task.is_archived()))
    }

    fn slack_tasks(&mut self) -> ServiceResult<()> {
        let collection = slack_collection(self.scope, self.workspace_ref_id)?;
        let tasks = self
            .scope
            .uow
            .get_for::<SlackTask>()
            .find_all(collection.ref_id(), false, None)?;
        for task in tasks {
            if task.has_generated_task && self.generated_task_is_gone(InboxTaskSource::SlackTask, task.ref_id())? {
                self.collect(&task)?;
            }
        }
        Ok(())
    }

    fn email_tasks(&mut self) -> ServiceResult<()> {
        let collection = email_collection(self.scope, self.workspace_ref_id)?;
        let tasks = self
            .scope
            .uow
            .get_for::<EmailTask>()
            .find_all(collection.ref_id(), false, None)?;
        for task in tasks {
            if task.has_generated_task && self.generated_task_is_gone(InboxTaskSource::EmailTask, task.ref_id())? {
                self.collect(&task)?;
            }
        }
        Ok(())
    }
}

/// Runs one collection pass over a workspace and logs it.
pub fn run_gc(
    scope: ServiceScope<'_, '_>,
    settings: &GcConfig,
    workspace_ref_id: EntityId,
    request: &GcRequest,
) -> ServiceResult<GcLogEntry> {
    let started_at = Instant::now();
    let gc_log: GcLog = scope.trunk(workspace_ref_id)?;
    let entries = scope.uow.get_for::<GcLogEntry>();
    let entry = entries.create(GcLogEntry::new_log_entry(
        scope.ctx,
        gc_log.ref_id(),
        request.targets.clone(),
    ))?;
    scope.reporter.mark_created(&entry);

    let mut run = GcRun {
        scope,
        workspace_ref_id,
        settings,
        today: request.today,
        records: Vec::new(),
    };
    for target in &request.targets {
        match target {
            GcTarget::InboxTasks => run.inbox_tasks()?,
            GcTarget::Habits => run.habits()?,
            GcTarget::Chores => run.chores()?,
            GcTarget::BigPlans => run.big_plans()?,
            GcTarget::Docs => run.docs()?,
            GcTarget::MetricEntries => run.metric_entries()?,
            GcTarget::SlackTasks => run.slack_tasks()?,
            GcTarget::EmailTasks => run.email_tasks()?,
        }
    }

    let mut entry = entry;
    for summary in std::mem::take(&mut run.records) {
        entry = entry.add_entity_record(scope.ctx, summary)?;
    }
    let entry = entries.save(entry.close(scope.ctx)?)?;
    scope.reporter.mark_updated(&entry);
    info!(
        "event=gc_run module=gc status=ok workspace_id={} archived={} duration_ms={}",
        workspace_ref_id,
        entry.entity_records.len(),
        started_at.elapsed().as_millis()
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::{run_gc, GcRequest};
    use crate::config::{GcConfig, ScoringConfig};
    use crate::model::framework::{ArchivalReason, Entity};
    use crate::model::inbox_task::InboxTask;
    use crate::model::values::InboxTaskStatus;
    use crate::repo::EntityRepository;
    use crate::service::doc_service::{archive_doc, create_doc};
    use crate::service::inbox_task_service::{create_inbox_task, status_update, update_inbox_task, NewInboxTask};
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    #[test]
    fn old_completed_tasks_are_archived_once() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-01T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let scoring = ScoringConfig {
            lucky_puppy_probability: 0.0,
            ..ScoringConfig::default()
        };

        let old = create_inbox_task(scope, ws, NewInboxTask::named("File taxes".parse().expect("name")))
            .expect("task");
        update_inbox_task(scope, &scoring, &seeded.user, ws, old.ref_id(), status_update(InboxTaskStatus::Done))
            .expect("done");
        let fresh_ctx = ctx_at("2024-03-25T09:00:00Z");
        let fresh_scope = scope.with_ctx(&fresh_ctx);
        let fresh = create_inbox_task(fresh_scope, ws, NewInboxTask::named("Buy milk".parse().expect("name")))
            .expect("task");
        update_inbox_task(
            fresh_scope,
            &scoring,
            &seeded.user,
            ws,
            fresh.ref_id(),
            status_update(InboxTaskStatus::Done),
        )
        .expect("done");

        let (root, _) = create_doc(scope, ws, None, "Old notes".parse().expect("name"), String::new()).expect("doc");
        archive_doc(scope, root.ref_id()).expect("archive");

        let entry = run_gc(fresh_scope, &GcConfig::default(), ws, &GcRequest::all("2024-03-26".parse().expect("date")))
            .expect("gc");
        assert_eq!(entry.entity_records.len(), 1);
        assert!(!entry.opened);
        let old = uow.get_for::<InboxTask>().load_by_id(old.ref_id(), true).expect("task");
        assert_eq!(old.header.archival_reason, Some(ArchivalReason::Gc));
        assert!(!uow
            .get_for::<InboxTask>()
            .load_by_id(fresh.ref_id(), false)
            .expect("task")
            .is_archived());

        let again = run_gc(fresh_scope, &GcConfig::default(), ws, &GcRequest::all("2024-03-26".parse().expect("date")))
            .expect("gc");
        assert!(again.entity_records.is_empty());
    }
}
