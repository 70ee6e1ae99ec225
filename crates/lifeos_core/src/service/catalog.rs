//! Kind-indexed table of entity operations.
//!
//! Traversal only sees kinds as strings through link descriptors; the catalog
//! turns a kind back into typed load/archive/remove calls.

use crate::model::big_plan::{BigPlan, BigPlanCollection, BigPlanMilestone};
use crate::model::chore::{Chore, ChoreCollection};
use crate::model::doc::{Doc, DocCollection};
use crate::model::framework::{
    ArchivalReason, DomainContext, Entity, EntityId, EntityStructure, LinkDescriptor,
};
use crate::model::gamification::{ScoreLog, ScoreLogEntry};
use crate::model::habit::{Habit, HabitCollection};
use crate::model::home::{HomeConfig, HomeTab, HomeWidget};
use crate::model::inbox_task::{InboxTask, InboxTaskCollection};
use crate::model::journal::{Journal, JournalCollection};
use crate::model::metric::{Metric, MetricCollection, MetricEntry};
use crate::model::note::{Note, NoteCollection};
use crate::model::person::{Person, PersonCollection};
use crate::model::project::{Project, ProjectCollection};
use crate::model::push_integration::{
    EmailTask, EmailTaskCollection, PushIntegrationGroup, SlackTask, SlackTaskCollection,
};
use crate::model::run_log::{GcLog, GcLogEntry, GenLog, GenLogEntry};
use crate::model::schedule::{
    ScheduleDomain, ScheduleEventFullDays, ScheduleEventInDay, ScheduleExternalSyncLog,
    ScheduleExternalSyncLogEntry, ScheduleStream,
};
use crate::model::smart_list::{SmartList, SmartListCollection, SmartListItem, SmartListTag};
use crate::model::time_event::{TimeEventDomain, TimeEventFullDaysBlock, TimeEventInDayBlock};
use crate::model::time_plan::{TimePlan, TimePlanActivity, TimePlanDomain};
use crate::model::user::{AuthRecord, User, UserWorkspaceLink};
use crate::model::vacation::{Vacation, VacationCollection};
use crate::model::working_mem::{WorkingMem, WorkingMemCollection};
use crate::model::workspace::Workspace;
use crate::repo::{DomainUnitOfWork, EntityRepository, RepoError, RepoResult};
use crate::service::progress::ProgressReporter;
use std::collections::BTreeMap;

type ArchiveFn =
    fn(&DomainUnitOfWork<'_>, &DomainContext, EntityId, ArchivalReason, &ProgressReporter) -> RepoResult<bool>;
type RemoveFn = fn(&DomainUnitOfWork<'_>, EntityId, &ProgressReporter) -> RepoResult<bool>;

#[derive(Clone, Copy)]
pub struct EntityOps {
    pub kind: &'static str,
    pub structure: EntityStructure,
    pub searchable: bool,
    pub links: fn() -> &'static [LinkDescriptor],
    /// `Ok(false)` when the entity is missing or already archived for `reason`.
    pub archive: ArchiveFn,
    /// `Ok(false)` when the entity is already gone.
    pub remove: RemoveFn,
}

impl EntityOps {
    pub fn of<E: Entity>() -> Self {
        Self {
            kind: E::KIND,
            structure: E::STRUCTURE,
            searchable: E::SEARCHABLE,
            links: E::links,
            archive: archive_one::<E>,
            remove: remove_one::<E>,
        }
    }
}

fn archive_one<E: Entity>(
    uow: &DomainUnitOfWork<'_>,
    ctx: &DomainContext,
    ref_id: EntityId,
    reason: ArchivalReason,
    reporter: &ProgressReporter,
) -> RepoResult<bool> {
    let repo = uow.get_for::<E>();
    let Some(entity) = repo.load_optional(ref_id, true)? else {
        return Ok(false);
    };
    if entity.header().archival_reason == Some(reason) {
        return Ok(false);
    }
    let archived = repo.save(entity.mark_archived_for(ctx, reason))?;
    reporter.mark_archived(&archived);
    Ok(true)
}

fn remove_one<E: Entity>(
    uow: &DomainUnitOfWork<'_>,
    ref_id: EntityId,
    reporter: &ProgressReporter,
) -> RepoResult<bool> {
    let repo = uow.get_for::<E>();
    if repo.load_optional(ref_id, true)?.is_none() {
        return Ok(false);
    }
    let removed = repo.remove(ref_id)?;
    uow.generic().remove_records_for_parent(ref_id)?;
    reporter.mark_removed(&removed);
    Ok(true)
}

pub struct EntityCatalog {
    ops: BTreeMap<&'static str, EntityOps>,
}

impl EntityCatalog {
    pub fn empty() -> Self {
        Self { ops: BTreeMap::new() }
    }

    pub fn register<E: Entity>(&mut self) -> &mut Self {
        self.ops.insert(E::KIND, EntityOps::of::<E>());
        self
    }

    pub fn get(&self, kind: &str) -> RepoResult<&EntityOps> {
        self.ops
            .get(kind)
            .ok_or_else(|| RepoError::InvalidData(format!("unregistered entity kind `{kind}`")))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ops.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Every entity kind of the domain model.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        catalog
            .register::<User>()
            .register::<AuthRecord>()
            .register::<UserWorkspaceLink>()
            .register::<ScoreLog>()
            .register::<ScoreLogEntry>()
            .register::<Workspace>()
            .register::<InboxTaskCollection>()
            .register::<InboxTask>()
            .register::<ProjectCollection>()
            .register::<Project>()
            .register::<BigPlanCollection>()
            .register::<BigPlan>()
            .register::<BigPlanMilestone>()
            .register::<HabitCollection>()
            .register::<Habit>()
            .register::<ChoreCollection>()
            .register::<Chore>()
            .register::<MetricCollection>()
            .register::<Metric>()
            .register::<MetricEntry>()
            .register::<PersonCollection>()
            .register::<Person>()
            .register::<SmartListCollection>()
            .register::<SmartList>()
            .register::<SmartListTag>()
            .register::<SmartListItem>()
            .register::<VacationCollection>()
            .register::<Vacation>()
            .register::<DocCollection>()
            .register::<Doc>()
            .register::<JournalCollection>()
            .register::<Journal>()
            .register::<NoteCollection>()
            .register::<Note>()
            .register::<ScheduleDomain>()
            .register::<ScheduleStream>()
            .register::<ScheduleEventInDay>()
            .register::<ScheduleEventFullDays>()
            .register::<ScheduleExternalSyncLog>()
            .register::<ScheduleExternalSyncLogEntry>()
            .register::<TimeEventDomain>()
            .register::<TimeEventInDayBlock>()
            .register::<TimeEventFullDaysBlock>()
            .register::<TimePlanDomain>()
            .register::<TimePlan>()
            .register::<TimePlanActivity>()
            .register::<WorkingMemCollection>()
            .register::<WorkingMem>()
            .register::<PushIntegrationGroup>()
            .register::<SlackTaskCollection>()
            .register::<SlackTask>()
            .register::<EmailTaskCollection>()
            .register::<EmailTask>()
            .register::<HomeConfig>()
            .register::<HomeTab>()
            .register::<HomeWidget>()
            .register::<GenLog>()
            .register::<GenLogEntry>()
            .register::<GcLog>()
            .register::<GcLogEntry>();
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::EntityCatalog;

    #[test]
    fn every_linked_kind_is_registered() {
        let catalog = EntityCatalog::standard();
        for kind in catalog.kinds() {
            let ops = catalog.get(kind).expect("registered");
            for link in (ops.links)() {
                assert!(
                    catalog.get(link.child_kind).is_ok(),
                    "{kind} links to unregistered {}",
                    link.child_kind
                );
            }
        }
    }
}
