//! Domain value types and the start-up codec registration.
//!
//! # Responsibility
//! - Define immutable, validated values shared by all concepts.
//! - Build the process-wide realm codec registry in one declarative step.
//!
//! # Invariants
//! - Every value type that crosses a realm boundary is registered exactly once.

pub mod contact;
pub mod features;
pub mod gen_params;
pub mod kinds;
pub mod period;
pub mod person_birthday;
pub mod secrets;
pub mod status;
pub mod time_in_day;

pub use contact::{EmailAddress, Timezone, Url};
pub use features::{
    UserFeature, UserFeatureFlags, UserFeatureFlagsControls, WorkspaceFeature,
    WorkspaceFeatureFlags, WorkspaceFeatureFlagsControls,
};
pub use gen_params::{
    RecurringTaskActionableFromDay, RecurringTaskActionableFromMonth, RecurringTaskDueAtDay,
    RecurringTaskDueAtMonth, RecurringTaskGenParams, RecurringTaskSkipRule,
};
pub use kinds::*;
pub use period::RecurringTaskPeriod;
pub use person_birthday::PersonBirthday;
pub use secrets::{
    PasswordHash, PasswordNewPlain, PasswordPlain, RecoveryTokenHash, RecoveryTokenPlain,
};
pub use status::{BigPlanStatus, Difficulty, Eisen, InboxTaskSource, InboxTaskStatus};
pub use time_in_day::TimeInDay;

use crate::model::framework::{
    ADate, ArchivalReason, EntityId, EntityName, EventKind, EventSource, RealmCodecError,
    RealmCodecRegistry, Timestamp,
};

/// Registers every domain value type with a fresh registry.
pub fn standard_registry() -> Result<RealmCodecRegistry, RealmCodecError> {
    let mut registry = RealmCodecRegistry::new();

    registry.register::<String>()?;
    registry.register::<bool>()?;
    registry.register::<i64>()?;
    registry.register::<u32>()?;
    registry.register::<f64>()?;

    registry.register::<EntityId>()?;
    registry.register::<Timestamp>()?;
    registry.register::<ADate>()?;
    registry.register::<EntityName>()?;
    registry.register::<EventSource>()?;
    registry.register::<EventKind>()?;
    registry.register::<ArchivalReason>()?;

    registry.register::<EmailAddress>()?;
    registry.register::<Url>()?;
    registry.register::<Timezone>()?;
    registry.register::<PasswordPlain>()?;
    registry.register::<PasswordNewPlain>()?;
    registry.register::<PasswordHash>()?;
    registry.register::<RecoveryTokenPlain>()?;
    registry.register::<RecoveryTokenHash>()?;
    registry.register::<TimeInDay>()?;
    registry.register::<PersonBirthday>()?;

    registry.register::<RecurringTaskPeriod>()?;
    registry.register::<Difficulty>()?;
    registry.register::<Eisen>()?;
    registry.register::<InboxTaskStatus>()?;
    registry.register::<InboxTaskSource>()?;
    registry.register::<BigPlanStatus>()?;
    registry.register::<RecurringTaskDueAtDay>()?;
    registry.register::<RecurringTaskDueAtMonth>()?;
    registry.register::<RecurringTaskActionableFromDay>()?;
    registry.register::<RecurringTaskActionableFromMonth>()?;
    registry.register::<RecurringTaskSkipRule>()?;
    registry.register::<RecurringTaskGenParams>()?;

    registry.register::<WorkspaceFeature>()?;
    registry.register::<UserFeature>()?;
    registry.register::<WorkspaceFeatureFlags>()?;
    registry.register::<UserFeatureFlags>()?;

    registry.register::<ScheduleStreamColor>()?;
    registry.register::<ScheduleSource>()?;
    registry.register::<MetricUnit>()?;
    registry.register::<PersonRelationship>()?;
    registry.register::<NoteDomain>()?;
    registry.register::<TimeEventInDayNamespace>()?;
    registry.register::<TimeEventFullDaysNamespace>()?;
    registry.register::<TimePlanActivityTarget>()?;
    registry.register::<TimePlanActivityKind>()?;
    registry.register::<TimePlanActivityFeasibility>()?;
    registry.register::<JournalSource>()?;
    registry.register::<HomeTabTarget>()?;
    registry.register::<WidgetDimension>()?;
    registry.register::<WidgetType>()?;
    registry.register::<SyncTarget>()?;
    registry.register::<GcTarget>()?;

    registry.register::<crate::model::gamification::ScoreSource>()?;
    registry.register::<crate::model::run_log::EntitySummary>()?;
    registry.register::<crate::model::report::ReportPeriodResult>()?;
    registry.register::<crate::model::push_integration::PushGenerationExtraInfo>()?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::standard_registry;
    use crate::model::framework::{Realm, RealmCodecError, RealmThing};
    use crate::model::values::{PasswordPlain, RecurringTaskPeriod, TimeInDay};

    #[test]
    fn standard_registry_builds() {
        let registry = standard_registry().expect("no duplicate registrations");
        assert!(registry.is_registered("recurring_task_period"));
        assert!(registry.is_registered("password_plain"));
    }

    #[test]
    fn values_roundtrip_through_each_realm() {
        let registry = standard_registry().expect("registry");
        let time: TimeInDay = "09:30".parse().expect("time");
        for realm in [Realm::Database, Realm::Web, Realm::Cli, Realm::Search, Realm::EventStore] {
            let thing = registry.encode(&time, realm).expect("encode");
            let back: TimeInDay = registry.decode(&thing, realm).expect("decode");
            assert_eq!(back, time);
            let thing = registry.encode(&RecurringTaskPeriod::Weekly, realm).expect("encode");
            let back: RecurringTaskPeriod = registry.decode(&thing, realm).expect("decode");
            assert_eq!(back, RecurringTaskPeriod::Weekly);
        }
    }

    #[test]
    fn passwords_are_restricted_to_input_realms() {
        let registry = standard_registry().expect("registry");
        let password: PasswordPlain = "LongEnough1".parse().expect("password");
        let err = registry
            .encode(&password, Realm::Database)
            .expect_err("database realm is not allowed");
        assert!(matches!(err, RealmCodecError::RealmNotAllowed { .. }));
        assert!(registry
            .validate("password_plain", &RealmThing::String("LongEnough1".into()), Realm::Web)
            .is_ok());
        assert!(registry
            .validate("password_plain", &RealmThing::String("short".into()), Realm::Cli)
            .is_err());
    }
}
