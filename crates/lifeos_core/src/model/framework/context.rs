//! Invocation-scoped domain context and event frame builder.
//!
//! # Responsibility
//! - Carry the event source and action time used to stamp entities.
//! - Encode frame arguments into the event-store realm.
//!
//! # Invariants
//! - Every event created under one context shares its `action_timestamp`.
//! - Frame arguments pass through the realm codec registry, so secrets are redacted.

use crate::model::framework::base::Timestamp;
use crate::model::framework::enum_value::enum_value;
use crate::model::framework::realm::{Realm, RealmCodecRegistry, RealmThing, RealmValue};
use crate::model::framework::update_action::UpdateAction;
use log::warn;
use std::collections::BTreeMap;
use std::sync::Arc;

enum_value! {
    /// Who caused a mutation.
    pub enum EventSource("event_source") {
        Cli => "cli",
        Web => "web",
        Slack => "slack",
        Email => "email",
        Gen => "gen",
        Gc => "gc",
        Sync => "sync",
        System => "system",
    }
}

/// Named, realm-encoded arguments attached to an event.
pub type FrameArgs = BTreeMap<String, RealmThing>;

#[derive(Debug, Clone)]
pub struct DomainContext {
    pub source: EventSource,
    pub action_timestamp: Timestamp,
    codecs: Arc<RealmCodecRegistry>,
}

impl DomainContext {
    pub fn new(source: EventSource, action_timestamp: Timestamp, codecs: Arc<RealmCodecRegistry>) -> Self {
        Self {
            source,
            action_timestamp,
            codecs,
        }
    }

    pub fn codecs(&self) -> &RealmCodecRegistry {
        &self.codecs
    }

    /// Same codecs and time, different source.
    pub fn with_source(&self, source: EventSource) -> Self {
        Self {
            source,
            action_timestamp: self.action_timestamp,
            codecs: Arc::clone(&self.codecs),
        }
    }

    pub fn frame(&self) -> FrameBuilder<'_> {
        FrameBuilder {
            codecs: &self.codecs,
            args: FrameArgs::new(),
        }
    }
}

/// Accumulates frame arguments for one event.
pub struct FrameBuilder<'ctx> {
    codecs: &'ctx RealmCodecRegistry,
    args: FrameArgs,
}

impl FrameBuilder<'_> {
    pub fn arg<T: RealmValue>(mut self, name: &str, value: &T) -> Self {
        let encoded = self.encode(name, value);
        self.args.insert(name.to_string(), encoded);
        self
    }

    /// A value the registry refuses is recorded as a marker naming its type, never as `null`.
    fn encode<T: RealmValue>(&self, name: &str, value: &T) -> RealmThing {
        match self.codecs.encode(value, Realm::EventStore) {
            Ok(thing) => thing,
            Err(err) => {
                warn!(
                    "event=frame_arg_encode module=model status=error arg={} type={} error={}",
                    name,
                    T::TYPE_NAME,
                    err
                );
                serde_json::json!({ "unencodable": T::TYPE_NAME })
            }
        }
    }

    pub fn arg_opt<T: RealmValue>(self, name: &str, value: Option<&T>) -> Self {
        match value {
            Some(value) => self.arg(name, value),
            None => {
                let mut this = self;
                this.args.insert(name.to_string(), RealmThing::Null);
                this
            }
        }
    }

    /// Records the argument only when the action changes something.
    pub fn update<T: RealmValue>(self, name: &str, action: &UpdateAction<T>) -> Self {
        match action.value() {
            Some(value) => self.arg(name, value),
            None => self,
        }
    }

    /// Records an optional-field update only when it changes something.
    pub fn update_opt<T: RealmValue>(self, name: &str, action: &UpdateAction<Option<T>>) -> Self {
        match action.value() {
            Some(value) => self.arg_opt(name, value.as_ref()),
            None => self,
        }
    }

    pub fn arg_list<T: RealmValue>(mut self, name: &str, values: &[T]) -> Self {
        let encoded = values.iter().map(|value| self.encode(name, value)).collect();
        self.args.insert(name.to_string(), RealmThing::Array(encoded));
        self
    }

    pub fn finish(self) -> FrameArgs {
        self.args
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainContext, EventSource};
    use crate::model::framework::base::Timestamp;
    use crate::model::framework::event::ArchivalReason;
    use crate::model::framework::realm::{RealmCodecRegistry, RealmValue};
    use std::sync::Arc;

    fn ctx(codecs: RealmCodecRegistry) -> DomainContext {
        DomainContext::new(
            EventSource::Cli,
            "2024-06-01T08:00:00Z".parse::<Timestamp>().expect("timestamp"),
            Arc::new(codecs),
        )
    }

    #[test]
    fn unregistered_values_become_a_type_marker() {
        let args = ctx(RealmCodecRegistry::new())
            .frame()
            .arg("archival_reason", &ArchivalReason::User)
            .arg_list("reasons", &[ArchivalReason::Gc])
            .finish();
        let marker = serde_json::json!({ "unencodable": ArchivalReason::TYPE_NAME });
        assert_eq!(args["archival_reason"], marker);
        assert_eq!(args["reasons"], serde_json::json!([marker]));
    }

    #[test]
    fn registered_values_are_encoded() {
        let mut codecs = RealmCodecRegistry::new();
        codecs.register::<ArchivalReason>().expect("register");
        let args = ctx(codecs).frame().arg("archival_reason", &ArchivalReason::Gc).finish();
        assert_eq!(args["archival_reason"], serde_json::json!("gc"));
    }
}
