//! Entity/record framework and the realm codec layer.

pub mod base;
pub mod context;
pub mod entity;
pub mod enum_value;
pub mod errors;
pub mod event;
pub mod realm;
pub mod record;
pub mod update_action;

pub use base::{ADate, EntityId, EntityName, Timestamp};
pub use context::{DomainContext, EventSource, FrameArgs};
pub use entity::{
    CrownEntity, Entity, EntityStructure, IndexField, LinkDescriptor, LinkKind, RefResolver,
    TrunkEntity,
};
pub use errors::{InputValidationError, ValidationResult};
pub use event::{ArchivalReason, EntityEvent, EntityHeader, EventKind};
pub use realm::{Realm, RealmCodecError, RealmCodecRegistry, RealmThing, RealmValue};
pub use record::Record;
pub use update_action::UpdateAction;
