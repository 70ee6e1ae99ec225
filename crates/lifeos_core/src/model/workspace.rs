//! Workspace root: the container for every concept trunk.

use crate::model::framework::entity::{contains_one, entity_header, LinkDescriptor};
use crate::model::framework::{
    DomainContext, Entity, EntityHeader, EntityId, EntityName, EntityStructure, UpdateAction,
};
use crate::model::values::{WorkspaceFeature, WorkspaceFeatureFlags};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(skip)]
    pub header: EntityHeader,
    pub name: EntityName,
    pub feature_flags: WorkspaceFeatureFlags,
}

impl Workspace {
    pub fn new_workspace(
        ctx: &DomainContext,
        name: EntityName,
        feature_flags: WorkspaceFeatureFlags,
    ) -> Self {
        let args = ctx
            .frame()
            .arg("name", &name)
            .arg("feature_flags", &feature_flags)
            .finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_workspace", args),
            name,
            feature_flags,
        }
    }

    pub fn update(mut self, ctx: &DomainContext, name: UpdateAction<EntityName>) -> Self {
        let args = ctx.frame().update("name", &name).finish();
        self.name = name.or_else(self.name);
        self.header.record_update(ctx, "update", args);
        self
    }

    pub fn change_feature_flags(
        mut self,
        ctx: &DomainContext,
        feature_flags: WorkspaceFeatureFlags,
    ) -> Self {
        let args = ctx.frame().arg("feature_flags", &feature_flags).finish();
        self.feature_flags = feature_flags;
        self.header.record_update(ctx, "change_feature_flags", args);
        self
    }

    pub fn is_feature_available(&self, feature: WorkspaceFeature) -> bool {
        self.feature_flags.is_enabled(feature)
    }
}

impl Entity for Workspace {
    const KIND: &'static str = "workspace";
    const STRUCTURE: EntityStructure = EntityStructure::Root;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        None
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[
            contains_one("inbox_task_collection"),
            contains_one("project_collection"),
            contains_one("big_plan_collection"),
            contains_one("habit_collection"),
            contains_one("chore_collection"),
            contains_one("metric_collection"),
            contains_one("person_collection"),
            contains_one("smart_list_collection"),
            contains_one("vacation_collection"),
            contains_one("doc_collection"),
            contains_one("journal_collection"),
            contains_one("schedule_domain"),
            contains_one("time_event_domain"),
            contains_one("time_plan_domain"),
            contains_one("working_mem_collection"),
            contains_one("push_integration_group"),
            contains_one("home_config"),
            contains_one("note_collection"),
            contains_one("gen_log"),
            contains_one("gc_log"),
            contains_one("schedule_external_sync_log"),
        ];
        LINKS
    }
}
