//! Recurring task generation.
//!
//! # Responsibility
//! - Turn habits, chores, metrics and persons into inbox tasks for the buckets due today.
//! - Keep working memory and push-task inbox tasks current.
//! - Record every run as a gen log entry.
//!
//! # Invariants
//! - Generated tasks are keyed by `(source, source entity, period, timeline, repeat index)`.
//! - Re-running on the same inputs creates nothing and changes nothing.
//! - Archived generated tasks are never resurrected.
//! - Vacations covering a whole bucket pause every source except must-do chores
//!   and birthdays.
//!
//! # See also
//! - `scheduler` for bucket bounds, timelines and skip positions.

use crate::model::chore::{Chore, ChoreCollection};
use crate::model::framework::{ADate, Entity, EntityId, EntityName};
use crate::model::habit::{Habit, HabitCollection};
use crate::model::inbox_task::{
    generated_task_key, InboxTask, InboxTaskCollection, InboxTaskDraft, RecurringTaskInfo,
};
use crate::model::metric::{Metric, MetricCollection};
use crate::model::person::{Person, PersonCollection};
use crate::model::run_log::{EntityOutcome, EntitySummary, GenLog, GenLogEntry};
use crate::model::vacation::Vacation;
use crate::model::values::{
    Difficulty, Eisen, InboxTaskSource, InboxTaskStatus, PersonBirthday, RecurringTaskGenParams,
    RecurringTaskPeriod, SyncTarget, TimeEventFullDaysNamespace,
};
use crate::repo::EntityRepository;
use crate::scheduler::Schedule;
use crate::service::person_service::next_birthday;
use crate::service::push_service::{generate_missing_email_tasks, generate_missing_slack_tasks};
use crate::service::time_event_service::upsert_full_days_block;
use crate::service::vacation_service::{is_on_vacation, load_vacations};
use crate::service::working_mem_service::{ensure_cleanup_task, ensure_working_mem};
use crate::service::{ServiceResult, ServiceScope};
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Desired state of one generated inbox task.
#[derive(Debug, Clone)]
pub struct GeneratedTaskSpec {
    pub source: InboxTaskSource,
    pub source_entity_ref_id: EntityId,
    pub name: EntityName,
    pub project_ref_id: EntityId,
    pub is_key: bool,
    pub eisen: Eisen,
    pub difficulty: Option<Difficulty>,
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
    pub period: RecurringTaskPeriod,
    pub timeline: String,
    pub repeat_index: u32,
}

impl GeneratedTaskSpec {
    fn from_params(
        source: InboxTaskSource,
        source_entity_ref_id: EntityId,
        name: EntityName,
        project_ref_id: EntityId,
        is_key: bool,
        params: &RecurringTaskGenParams,
        schedule: &Schedule,
    ) -> Self {
        Self {
            source,
            source_entity_ref_id,
            name,
            project_ref_id,
            is_key,
            eisen: params.eisen.unwrap_or(Eisen::Regular),
            difficulty: params.difficulty,
            actionable_date: schedule.actionable_date(params),
            due_date: Some(schedule.due_date(params)),
            period: schedule.period,
            timeline: schedule.timeline.clone(),
            repeat_index: 0,
        }
    }

    fn key(&self) -> String {
        generated_task_key(
            self.source,
            self.source_entity_ref_id,
            self.period,
            &self.timeline,
            self.repeat_index,
        )
    }

    fn matches(&self, task: &InboxTask) -> bool {
        task.name == self.name
            && task.project_ref_id == self.project_ref_id
            && task.eisen == self.eisen
            && task.difficulty == self.difficulty
            && task.actionable_date == self.actionable_date
            && task.due_date == self.due_date
    }
}

/// What an upsert did to the keyed task.
#[derive(Debug, Clone)]
pub enum Upserted {
    Created(InboxTask),
    Updated(InboxTask),
    Unchanged,
}

/// Creates the keyed task or refreshes its generator-owned fields.
///
/// `force` rewrites a live task even when it already matches.
pub fn upsert_generated_task(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    spec: GeneratedTaskSpec,
    force: bool,
) -> ServiceResult<Upserted> {
    let repo = scope.uow.get_for::<InboxTask>();
    match repo.load_by_unique_key(&spec.key())? {
        Some(task) if task.is_archived() => Ok(Upserted::Unchanged),
        Some(task) if !force && spec.matches(&task) => Ok(Upserted::Unchanged),
        Some(task) => {
            let task = repo.save(task.update_generated(
                scope.ctx,
                spec.name,
                spec.project_ref_id,
                spec.eisen,
                spec.difficulty,
                spec.actionable_date,
                spec.due_date,
            )?)?;
            scope.reporter.mark_updated(&task);
            Ok(Upserted::Updated(task))
        }
        None => {
            let collection: InboxTaskCollection = scope.trunk(workspace_ref_id)?;
            let draft = InboxTaskDraft {
                source: spec.source,
                source_entity_ref_id: Some(spec.source_entity_ref_id),
                name: spec.name,
                status: InboxTaskStatus::Recurring,
                project_ref_id: spec.project_ref_id,
                is_key: spec.is_key,
                eisen: spec.eisen,
                difficulty: spec.difficulty,
                actionable_date: spec.actionable_date,
                due_date: spec.due_date,
                recurring: Some(RecurringTaskInfo {
                    period: spec.period,
                    timeline: spec.timeline,
                    repeat_index: spec.repeat_index,
                    gen_right_now: scope.ctx.action_timestamp,
                }),
            };
            let task = repo.create(InboxTask::new_inbox_task(scope.ctx, collection.ref_id(), draft)?)?;
            scope.reporter.mark_created(&task);
            Ok(Upserted::Created(task))
        }
    }
}

/// Inputs of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenRequest {
    pub today: ADate,
    pub targets: Vec<SyncTarget>,
    pub gen_even_if_not_modified: bool,
    pub filter_project_ref_ids: Option<Vec<EntityId>>,
    /// Restricts habits, chores, metrics and persons to these ids.
    pub filter_source_ref_ids: Option<Vec<EntityId>>,
}

impl GenRequest {
    pub fn all(today: ADate) -> Self {
        Self {
            today,
            targets: SyncTarget::ALL.to_vec(),
            gen_even_if_not_modified: false,
            filter_project_ref_ids: None,
            filter_source_ref_ids: None,
        }
    }

    fn wants_project(&self, project_ref_id: EntityId) -> bool {
        self.filter_project_ref_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&project_ref_id))
    }

    fn wants_source(&self, ref_id: EntityId) -> bool {
        self.filter_source_ref_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&ref_id))
    }
}

struct GenRun<'s, 'a, 'conn> {
    scope: ServiceScope<'a, 'conn>,
    workspace_ref_id: EntityId,
    request: &'s GenRequest,
    vacations: Vec<Vacation>,
    records: Vec<EntitySummary>,
}

impl GenRun<'_, '_, '_> {
    fn record(&mut self, upserted: Upserted) {
        match upserted {
            Upserted::Created(task) => self.records.push(EntitySummary::of(&task, EntityOutcome::Created)),
            Upserted::Updated(task) => self.records.push(EntitySummary::of(&task, EntityOutcome::Updated)),
            Upserted::Unchanged => {}
        }
    }

    fn upsert(&mut self, spec: GeneratedTaskSpec) -> ServiceResult<()> {
        let upserted = upsert_generated_task(
            self.scope,
            self.workspace_ref_id,
            spec,
            self.request.gen_even_if_not_modified,
        )?;
        self.record(upserted);
        Ok(())
    }

    /// The bucket due today, unless skipped or fully inside a vacation.
    fn due_schedule(&self, params: &RecurringTaskGenParams, pausable: bool) -> Option<Schedule> {
        let schedule = Schedule::new(params.period, self.request.today);
        if params.skip_rule.skips(schedule.skip_position()) {
            return None;
        }
        if pausable && is_on_vacation(&self.vacations, schedule.first_day, schedule.end_day) {
            return None;
        }
        Some(schedule)
    }

    fn habits(&mut self) -> ServiceResult<()> {
        let collection: HabitCollection = self.scope.trunk(self.workspace_ref_id)?;
        let habits = self
            .scope
            .uow
            .get_for::<Habit>()
            .find_all(collection.ref_id(), false, None)?;
        for habit in habits {
            if habit.suspended
                || !self.request.wants_project(habit.project_ref_id)
                || !self.request.wants_source(habit.ref_id())
            {
                continue;
            }
            let Some(schedule) = self.due_schedule(&habit.gen_params, true) else {
                continue;
            };
            let repeats = habit.repeats_in_period_count.unwrap_or(1).max(1);
            for repeat_index in 0..repeats {
                let name = if repeats > 1 {
                    EntityName::from_generated(&format!(
                        "{} [{}/{}]",
                        habit.name,
                        repeat_index + 1,
                        repeats
                    ))
                } else {
                    habit.name.clone()
                };
                let mut spec = GeneratedTaskSpec::from_params(
                    InboxTaskSource::Habit,
                    habit.ref_id(),
                    name,
                    habit.project_ref_id,
                    habit.is_key,
                    &habit.gen_params,
                    &schedule,
                );
                spec.repeat_index = repeat_index;
                self.upsert(spec)?;
            }
        }
        Ok(())
    }

    fn chores(&mut self) -> ServiceResult<()> {
        let collection: ChoreCollection = self.scope.trunk(self.workspace_ref_id)?;
        let chores = self
            .scope
            .uow
            .get_for::<Chore>()
            .find_all(collection.ref_id(), false, None)?;
        for chore in chores {
            if chore.suspended
                || !chore.is_active_on(self.request.today)
                || !self.request.wants_project(chore.project_ref_id)
                || !self.request.wants_source(chore.ref_id())
            {
                continue;
            }
            let Some(schedule) = self.due_schedule(&chore.gen_params, !chore.must_do) else {
                continue;
            };
            self.upsert(GeneratedTaskSpec::from_params(
                InboxTaskSource::Chore,
                chore.ref_id(),
                chore.name.clone(),
                chore.project_ref_id,
                chore.is_key,
                &chore.gen_params,
                &schedule,
            ))?;
        }
        Ok(())
    }

    fn metrics(&mut self) -> ServiceResult<()> {
        let collection: MetricCollection = self.scope.trunk(self.workspace_ref_id)?;
        if !self.request.wants_project(collection.collection_project_ref_id) {
            return Ok(());
        }
        let metrics = self
            .scope
            .uow
            .get_for::<Metric>()
            .find_all(collection.ref_id(), false, None)?;
        for metric in metrics {
            let Some(params) = metric.collection_params.as_ref() else {
                continue;
            };
            if !self.request.wants_source(metric.ref_id()) {
                continue;
            }
            let Some(schedule) = self.due_schedule(params, true) else {
                continue;
            };
            self.upsert(GeneratedTaskSpec::from_params(
                InboxTaskSource::Metric,
                metric.ref_id(),
                EntityName::from_generated(&format!("Collect value for metric {}", metric.name)),
                collection.collection_project_ref_id,
                metric.is_key,
                params,
                &schedule,
            ))?;
        }
        Ok(())
    }

    fn persons(&mut self) -> ServiceResult<()> {
        let collection: PersonCollection = self.scope.trunk(self.workspace_ref_id)?;
        if !self.request.wants_project(collection.catch_up_project_ref_id) {
            return Ok(());
        }
        let persons = self
            .scope
            .uow
            .get_for::<Person>()
            .find_all(collection.ref_id(), false, None)?;
        for person in persons {
            if !self.request.wants_source(person.ref_id()) {
                continue;
            }
            if let Some(params) = person.catch_up_params.as_ref() {
                if let Some(schedule) = self.due_schedule(params, true) {
                    self.upsert(GeneratedTaskSpec::from_params(
                        InboxTaskSource::PersonCatchUp,
                        person.ref_id(),
                        EntityName::from_generated(&format!("Catch up with {}", person.name)),
                        collection.catch_up_project_ref_id,
                        false,
                        params,
                        &schedule,
                    ))?;
                }
            }
            if let Some(birthday) = person.birthday {
                self.birthday(&collection, &person, birthday)?;
            }
        }
        Ok(())
    }

    fn birthday(
        &mut self,
        collection: &PersonCollection,
        person: &Person,
        birthday: PersonBirthday,
    ) -> ServiceResult<()> {
        let today = self.request.today;
        let schedule = Schedule::new(RecurringTaskPeriod::Yearly, today);
        let due_date = birthday.in_year(today.year())?;
        self.upsert(GeneratedTaskSpec {
            source: InboxTaskSource::PersonBirthday,
            source_entity_ref_id: person.ref_id(),
            name: EntityName::from_generated(&format!("Wish happy birthday to {}", person.name)),
            project_ref_id: collection.catch_up_project_ref_id,
            is_key: false,
            eisen: Eisen::Regular,
            difficulty: None,
            actionable_date: Some(due_date.add_days(-7).max(schedule.first_day)),
            due_date: Some(due_date),
            period: schedule.period,
            timeline: schedule.timeline,
            repeat_index: 0,
        })?;
        upsert_full_days_block(
            self.scope,
            self.workspace_ref_id,
            TimeEventFullDaysNamespace::PersonBirthday,
            person.ref_id(),
            next_birthday(birthday, today)?,
            1,
        )?;
        Ok(())
    }

    fn working_mem(&mut self) -> ServiceResult<()> {
        let current = ensure_working_mem(self.scope, self.workspace_ref_id, self.request.today)?;
        if current.created {
            self.records
                .push(EntitySummary::of(&current.working_mem, EntityOutcome::Created));
        }
        let upserted = ensure_cleanup_task(
            self.scope,
            self.workspace_ref_id,
            self.request.today,
            self.request.gen_even_if_not_modified,
        )?;
        self.record(upserted);
        Ok(())
    }

    fn push_tasks(&mut self, target: SyncTarget) -> ServiceResult<()> {
        let created = match target {
            SyncTarget::SlackTasks => generate_missing_slack_tasks(self.scope, self.workspace_ref_id)?,
            _ => generate_missing_email_tasks(self.scope, self.workspace_ref_id)?,
        };
        for task in created {
            self.record(Upserted::Created(task));
        }
        Ok(())
    }
}

/// Runs generation for one workspace and records a closed gen log entry.
pub fn run_generation(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    request: &GenRequest,
) -> ServiceResult<GenLogEntry> {
    let started_at = Instant::now();
    let gen_log: GenLog = scope.trunk(workspace_ref_id)?;
    let entries = scope.uow.get_for::<GenLogEntry>();
    let entry = entries.create(GenLogEntry::new_log_entry(
        scope.ctx,
        gen_log.ref_id(),
        request.gen_even_if_not_modified,
        request.today,
        request.targets.clone(),
        request.filter_project_ref_ids.clone(),
    ))?;
    scope.reporter.mark_created(&entry);

    let mut run = GenRun {
        scope,
        workspace_ref_id,
        request,
        vacations: load_vacations(scope, workspace_ref_id)?,
        records: Vec::new(),
    };
    for target in &request.targets {
        match target {
            SyncTarget::WorkingMem => run.working_mem()?,
            SyncTarget::Habits => run.habits()?,
            SyncTarget::Chores => run.chores()?,
            SyncTarget::Metrics => run.metrics()?,
            SyncTarget::Persons => run.persons()?,
            SyncTarget::SlackTasks | SyncTarget::EmailTasks => run.push_tasks(*target)?,
        }
    }

    let mut entry = entry;
    for summary in std::mem::take(&mut run.records) {
        entry = entry.add_entity_record(scope.ctx, summary)?;
    }
    let entry = entries.save(entry.close(scope.ctx)?)?;
    scope.reporter.mark_updated(&entry);
    info!(
        "event=gen_run module=gen status=ok workspace_id={} created={} updated={} duration_ms={}",
        workspace_ref_id,
        entry.entity_created_records.len(),
        entry.entity_updated_records.len(),
        started_at.elapsed().as_millis()
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::{run_generation, GenRequest};
    use crate::model::framework::{ADate, Entity};
    use crate::model::inbox_task::InboxTask;
    use crate::model::values::{
        InboxTaskSource, RecurringTaskGenParams, RecurringTaskPeriod, RecurringTaskSkipRule,
        SyncTarget,
    };
    use crate::service::chore_service::{create_chore, NewChore};
    use crate::service::habit_service::create_habit;
    use crate::service::inbox_task_service::find_generated_tasks;
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::vacation_service::create_vacation;
    use crate::service::{EntityCatalog, ProgressReporter, ServiceScope};

    fn date(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    fn habits_only(today: &str) -> GenRequest {
        GenRequest {
            targets: vec![SyncTarget::Habits],
            ..GenRequest::all(date(today))
        }
    }

    #[test]
    fn daily_habit_generation_is_idempotent() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T06:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let habit = create_habit(
            scope,
            ws,
            None,
            "Stretch".parse().expect("name"),
            false,
            RecurringTaskGenParams::simple(RecurringTaskPeriod::Daily),
            None,
        )
        .expect("habit");

        let first = run_generation(scope, ws, &habits_only("2024-03-04")).expect("gen");
        assert_eq!(first.entity_created_records.len(), 1);
        assert!(!first.opened);
        let tasks: Vec<InboxTask> =
            find_generated_tasks(scope, InboxTaskSource::Habit, habit.ref_id(), false).expect("tasks");
        let recurring = tasks[0].recurring.as_ref().expect("recurring info");
        assert_eq!(recurring.timeline, "2024,Q1,Mar,W10,D1");
        assert_eq!(tasks[0].due_date, Some(date("2024-03-04")));

        let second = run_generation(scope, ws, &habits_only("2024-03-04")).expect("gen");
        assert_eq!(second.touched_count(), 0);
        assert_eq!(
            find_generated_tasks(scope, InboxTaskSource::Habit, habit.ref_id(), false)
                .expect("tasks")
                .len(),
            1
        );
    }

    #[test]
    fn skip_rules_and_vacations_pause_generation() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T06:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();
        let mut params = RecurringTaskGenParams::simple(RecurringTaskPeriod::Daily);
        params.skip_rule = RecurringTaskSkipRule::from_positions(&[1]).expect("rule");
        let skipped = create_habit(scope, ws, None, "Run".parse().expect("name"), false, params, Some(2))
            .expect("habit");

        create_vacation(scope, ws, "Beach".parse().expect("name"), date("2024-03-05"), date("2024-03-06"))
            .expect("vacation");
        let mut vacation_chore = NewChore {
            name: "Water plants".parse().expect("name"),
            project_ref_id: None,
            is_key: false,
            gen_params: RecurringTaskGenParams::simple(RecurringTaskPeriod::Daily),
            must_do: false,
            start_at_date: None,
            end_at_date: None,
        };
        let paused = create_chore(scope, ws, vacation_chore.clone()).expect("chore");
        vacation_chore.name = "Feed cat".parse().expect("name");
        vacation_chore.must_do = true;
        let must_do = create_chore(scope, ws, vacation_chore).expect("chore");

        let monday = run_generation(scope, ws, &GenRequest::all(date("2024-03-04"))).expect("gen");
        assert!(monday
            .entity_created_records
            .iter()
            .all(|summary| summary.ref_id != skipped.ref_id()));
        assert!(find_generated_tasks(scope, InboxTaskSource::Habit, skipped.ref_id(), true)
            .expect("tasks")
            .is_empty());

        run_generation(scope, ws, &GenRequest::all(date("2024-03-05"))).expect("gen");
        let habit_tasks =
            find_generated_tasks(scope, InboxTaskSource::Habit, skipped.ref_id(), false).expect("tasks");
        assert!(habit_tasks.is_empty());
        let paused_tasks =
            find_generated_tasks(scope, InboxTaskSource::Chore, paused.ref_id(), false).expect("tasks");
        assert_eq!(paused_tasks.len(), 1);
        let must_do_tasks =
            find_generated_tasks(scope, InboxTaskSource::Chore, must_do.ref_id(), false).expect("tasks");
        assert_eq!(must_do_tasks.len(), 2);

        run_generation(scope, ws, &GenRequest::all(date("2024-03-07"))).expect("gen");
        let habit_tasks =
            find_generated_tasks(scope, InboxTaskSource::Habit, skipped.ref_id(), false).expect("tasks");
        assert_eq!(habit_tasks.len(), 2);
        assert!(habit_tasks[0].name.to_string().ends_with("[1/2]"));
    }
}
