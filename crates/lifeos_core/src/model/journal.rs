//! Journals: one reflection per `(period, timeline)`, with a stats snapshot.

use crate::model::framework::entity::{contains_many, entity_header, simple_trunk, LinkDescriptor};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, IndexField, Record, Timestamp,
};
use crate::model::note::note_link;
use crate::model::report::ReportPeriodResult;
use crate::model::values::{JournalSource, RecurringTaskPeriod};
use serde::{Deserialize, Serialize};

simple_trunk!(
    JournalCollection("journal_collection", workspace_ref_id),
    links = &[contains_many("journal")]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    #[serde(skip)]
    pub header: EntityHeader,
    pub journal_collection_ref_id: EntityId,
    pub name: EntityName,
    pub source: JournalSource,
    pub right_now: ADate,
    pub period: RecurringTaskPeriod,
    pub timeline: String,
}

fn journal_name(period: RecurringTaskPeriod, right_now: ADate) -> EntityName {
    EntityName::from_generated(&format!(
        "{} journal for {}",
        capitalize(period.as_str()),
        right_now
    ))
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl Journal {
    pub fn new_journal(
        ctx: &DomainContext,
        journal_collection_ref_id: EntityId,
        source: JournalSource,
        right_now: ADate,
        period: RecurringTaskPeriod,
        timeline: String,
    ) -> Self {
        let name = journal_name(period, right_now);
        let args = ctx
            .frame()
            .arg("source", &source)
            .arg("right_now", &right_now)
            .arg("period", &period)
            .arg("timeline", &timeline)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_journal", args),
            journal_collection_ref_id,
            name,
            source,
            right_now,
            period,
            timeline,
        }
    }

    /// Moves the journal to a new bucket; the caller recomputes its timeline.
    pub fn change_time_config(
        mut self,
        ctx: &DomainContext,
        right_now: ADate,
        period: RecurringTaskPeriod,
        timeline: String,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("right_now", &right_now)
            .arg("period", &period)
            .arg("timeline", &timeline)
            .finish();
        self.name = journal_name(period, right_now);
        self.right_now = right_now;
        self.period = period;
        self.timeline = timeline;
        self.header.record_update(ctx, "change_time_config", args);
        self
    }
}

impl Entity for Journal {
    const KIND: &'static str = "journal";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.journal_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![("period", self.period.to_string())]
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!(
            "journal:{}:{}:{}",
            self.journal_collection_ref_id, self.period, self.timeline
        ))
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[note_link!("journal")];
        LINKS
    }
}

impl CrownEntity for Journal {}

/// Report snapshot taken when a journal is created or refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalStats {
    pub journal_ref_id: EntityId,
    pub report: ReportPeriodResult,
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
}

impl JournalStats {
    pub fn new_stats(ctx: &DomainContext, journal_ref_id: EntityId, report: ReportPeriodResult) -> Self {
        Self {
            journal_ref_id,
            report,
            created_time: ctx.action_timestamp,
            last_modified_time: ctx.action_timestamp,
        }
    }

    pub fn update_report(mut self, ctx: &DomainContext, report: ReportPeriodResult) -> Self {
        self.report = report;
        self.last_modified_time = ctx.action_timestamp;
        self
    }
}

impl Record for JournalStats {
    const KIND: &'static str = "journal_stats";

    fn parent_ref_id(&self) -> EntityId {
        self.journal_ref_id
    }

    fn raw_key(&self) -> String {
        "stats".to_string()
    }

    fn created_time(&self) -> Timestamp {
        self.created_time
    }

    fn last_modified_time(&self) -> Timestamp {
        self.last_modified_time
    }
}
