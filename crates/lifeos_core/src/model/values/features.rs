//! Workspace and user feature flags, plus the controls that validate changes.
//!
//! # Invariants
//! - `InboxTasks` is always enabled.
//! - `TimePlans` is only enabled together with `Schedule`.
//! - Missing flags in a persisted map read as enabled.

use crate::model::framework::enum_value::enum_value;
use crate::model::framework::errors::{InputValidationError, ValidationResult};
use crate::model::framework::realm::serde_realm_value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

enum_value! {
    pub enum WorkspaceFeature("workspace_feature") {
        InboxTasks => "inbox_tasks",
        WorkingMem => "working_mem",
        TimePlans => "time_plans",
        Schedule => "schedule",
        Habits => "habits",
        Chores => "chores",
        BigPlans => "big_plans",
        Journals => "journals",
        Docs => "docs",
        Vacations => "vacations",
        Projects => "projects",
        SmartLists => "smart_lists",
        Metrics => "metrics",
        Persons => "persons",
        SlackTasks => "slack_tasks",
        EmailTasks => "email_tasks",
    }
}

enum_value! {
    pub enum UserFeature("user_feature") {
        Gamification => "gamification",
    }
}

impl WorkspaceFeature {
    /// Features that must be on for `self` to be on.
    pub fn requires(self) -> &'static [WorkspaceFeature] {
        match self {
            Self::TimePlans => &[WorkspaceFeature::Schedule],
            _ => &[],
        }
    }

    pub fn is_user_editable(self) -> bool {
        self != Self::InboxTasks
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceFeatureFlags(BTreeMap<WorkspaceFeature, bool>);

impl Default for WorkspaceFeatureFlags {
    fn default() -> Self {
        Self(
            WorkspaceFeature::ALL
                .iter()
                .map(|feature| (*feature, true))
                .collect(),
        )
    }
}

impl WorkspaceFeatureFlags {
    pub fn with(mut self, feature: WorkspaceFeature, enabled: bool) -> Self {
        self.0.insert(feature, enabled);
        self
    }

    pub fn is_enabled(&self, feature: WorkspaceFeature) -> bool {
        self.0.get(&feature).copied().unwrap_or(true)
    }

    pub fn enabled(&self) -> Vec<WorkspaceFeature> {
        WorkspaceFeature::ALL
            .iter()
            .copied()
            .filter(|feature| self.is_enabled(*feature))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserFeatureFlags(BTreeMap<UserFeature, bool>);

impl Default for UserFeatureFlags {
    fn default() -> Self {
        Self(UserFeature::ALL.iter().map(|feature| (*feature, true)).collect())
    }
}

impl UserFeatureFlags {
    pub fn with(mut self, feature: UserFeature, enabled: bool) -> Self {
        self.0.insert(feature, enabled);
        self
    }

    pub fn is_enabled(&self, feature: UserFeature) -> bool {
        self.0.get(&feature).copied().unwrap_or(true)
    }
}

serde_realm_value!(WorkspaceFeatureFlags, "workspace_feature_flags");
serde_realm_value!(UserFeatureFlags, "user_feature_flags");

/// Validates feature-flag change requests against co-feature dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceFeatureFlagsControls;

impl WorkspaceFeatureFlagsControls {
    /// Applies `changes` over `current`, rejecting edits that break dependencies.
    pub fn apply(
        &self,
        current: &WorkspaceFeatureFlags,
        changes: &BTreeMap<WorkspaceFeature, bool>,
    ) -> ValidationResult<WorkspaceFeatureFlags> {
        let mut next = current.clone();
        for (feature, enabled) in changes {
            if !feature.is_user_editable() && !enabled {
                return Err(InputValidationError::new(format!(
                    "feature {feature} cannot be disabled"
                )));
            }
            next = next.with(*feature, *enabled);
        }
        for feature in WorkspaceFeature::ALL {
            if !next.is_enabled(*feature) {
                continue;
            }
            for dependency in feature.requires() {
                if !next.is_enabled(*dependency) {
                    return Err(InputValidationError::new(format!(
                        "feature {feature} requires feature {dependency} to be enabled"
                    )));
                }
            }
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserFeatureFlagsControls;

impl UserFeatureFlagsControls {
    pub fn apply(
        &self,
        current: &UserFeatureFlags,
        changes: &BTreeMap<UserFeature, bool>,
    ) -> ValidationResult<UserFeatureFlags> {
        let mut next = current.clone();
        for (feature, enabled) in changes {
            next = next.with(*feature, *enabled);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::{WorkspaceFeature, WorkspaceFeatureFlags, WorkspaceFeatureFlagsControls};
    use std::collections::BTreeMap;

    #[test]
    fn inbox_tasks_cannot_be_disabled() {
        let changes = BTreeMap::from([(WorkspaceFeature::InboxTasks, false)]);
        assert!(WorkspaceFeatureFlagsControls
            .apply(&WorkspaceFeatureFlags::default(), &changes)
            .is_err());
    }

    #[test]
    fn time_plans_require_schedule() {
        let changes = BTreeMap::from([(WorkspaceFeature::Schedule, false)]);
        assert!(WorkspaceFeatureFlagsControls
            .apply(&WorkspaceFeatureFlags::default(), &changes)
            .is_err());
        let changes = BTreeMap::from([
            (WorkspaceFeature::Schedule, false),
            (WorkspaceFeature::TimePlans, false),
        ]);
        let flags = WorkspaceFeatureFlagsControls
            .apply(&WorkspaceFeatureFlags::default(), &changes)
            .expect("consistent change");
        assert!(!flags.is_enabled(WorkspaceFeature::Schedule));
        assert!(flags.is_enabled(WorkspaceFeature::Habits));
    }

    #[test]
    fn flags_serialize_as_a_string_keyed_map() {
        let flags = WorkspaceFeatureFlags::default().with(WorkspaceFeature::Vacations, false);
        let json = serde_json::to_value(&flags).expect("serialize");
        assert_eq!(json["vacations"], serde_json::Value::Bool(false));
    }
}
