//! Metrics and their entries.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    ADate, CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName,
    EntityStructure, InputValidationError, TrunkEntity, UpdateAction, ValidationResult,
};
use crate::model::note::note_link;
use crate::model::values::{MetricUnit, RecurringTaskGenParams};
use serde::{Deserialize, Serialize};

/// Trunk of all metrics; collection tasks land in `collection_project_ref_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricCollection {
    #[serde(skip)]
    pub header: EntityHeader,
    pub workspace_ref_id: EntityId,
    pub collection_project_ref_id: EntityId,
}

impl MetricCollection {
    pub fn new(ctx: &DomainContext, workspace_ref_id: EntityId, collection_project_ref_id: EntityId) -> Self {
        let args = ctx
            .frame()
            .arg("workspace_ref_id", &workspace_ref_id)
            .arg("collection_project_ref_id", &collection_project_ref_id)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_metric_collection", args),
            workspace_ref_id,
            collection_project_ref_id,
        }
    }

    pub fn change_collection_project(mut self, ctx: &DomainContext, project_ref_id: EntityId) -> Self {
        let args = ctx.frame().arg("collection_project_ref_id", &project_ref_id).finish();
        self.collection_project_ref_id = project_ref_id;
        self.header.record_update(ctx, "change_collection_project", args);
        self
    }
}

impl Entity for MetricCollection {
    const KIND: &'static str = "metric_collection";
    const STRUCTURE: EntityStructure = EntityStructure::Trunk;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.workspace_ref_id)
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[contains_many("metric")];
        LINKS
    }
}

impl TrunkEntity for MetricCollection {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    #[serde(skip)]
    pub header: EntityHeader,
    pub metric_collection_ref_id: EntityId,
    pub name: EntityName,
    pub is_key: bool,
    pub collection_params: Option<RecurringTaskGenParams>,
    pub metric_unit: Option<MetricUnit>,
}

impl Metric {
    pub fn new_metric(
        ctx: &DomainContext,
        metric_collection_ref_id: EntityId,
        name: EntityName,
        is_key: bool,
        collection_params: Option<RecurringTaskGenParams>,
        metric_unit: Option<MetricUnit>,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("name", &name)
            .arg("is_key", &is_key)
            .arg_opt("collection_params", collection_params.as_ref())
            .arg_opt("metric_unit", metric_unit.as_ref())
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_metric", args),
            metric_collection_ref_id,
            name,
            is_key,
            collection_params,
            metric_unit,
        }
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        name: UpdateAction<EntityName>,
        is_key: UpdateAction<bool>,
        collection_params: UpdateAction<Option<RecurringTaskGenParams>>,
        metric_unit: UpdateAction<Option<MetricUnit>>,
    ) -> Self {
        let args = ctx
            .frame()
            .update("name", &name)
            .update("is_key", &is_key)
            .update_opt("collection_params", &collection_params)
            .update_opt("metric_unit", &metric_unit)
            .finish();
        self.name = name.or_else(self.name);
        self.is_key = is_key.or_else(self.is_key);
        self.collection_params = collection_params.or_else(self.collection_params);
        self.metric_unit = metric_unit.or_else(self.metric_unit);
        self.header.record_update(ctx, "update", args);
        self
    }
}

impl Entity for Metric {
    const KIND: &'static str = "metric";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;
    const SEARCHABLE: bool = true;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.metric_collection_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            owns_many("metric_entry", RefResolver::Parent),
            owns_many("inbox_task", RefResolver::IsRefId("source_entity_ref_id"))
                .with_filters(&[("source", "metric")]),
            note_link!("metric"),
        ];
        LINKS
    }
}

impl CrownEntity for Metric {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    #[serde(skip)]
    pub header: EntityHeader,
    pub metric_ref_id: EntityId,
    pub collection_time: ADate,
    pub value: f64,
}

fn check_value(value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(InputValidationError::new("metric entry value must be a finite number"));
    }
    Ok(())
}

impl MetricEntry {
    pub fn new_metric_entry(
        ctx: &DomainContext,
        metric_ref_id: EntityId,
        collection_time: ADate,
        value: f64,
    ) -> ValidationResult<Self> {
        check_value(value)?;
        let args = ctx
            .frame()
            .arg("collection_time", &collection_time)
            .arg("value", &value)
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_metric_entry", args),
            metric_ref_id,
            collection_time,
            value,
        })
    }

    pub fn update(
        mut self,
        ctx: &DomainContext,
        collection_time: UpdateAction<ADate>,
        value: UpdateAction<f64>,
    ) -> ValidationResult<Self> {
        if let Some(value) = value.value() {
            check_value(*value)?;
        }
        let args = ctx
            .frame()
            .update("collection_time", &collection_time)
            .update("value", &value)
            .finish();
        self.collection_time = collection_time.or_else(self.collection_time);
        self.value = value.or_else(self.value);
        self.header.record_update(ctx, "update", args);
        Ok(self)
    }
}

impl Entity for MetricEntry {
    const KIND: &'static str = "metric_entry";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.metric_ref_id)
    }

    fn display_name(&self) -> String {
        format!("{} on {}", self.value, self.collection_time)
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[note_link!("metric_entry")];
        LINKS
    }
}

impl CrownEntity for MetricEntry {}
