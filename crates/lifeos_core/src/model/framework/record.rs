//! Keyed, versionless aggregates.

use crate::model::framework::base::{EntityId, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// State stored under `(kind, parent, raw_key)`; never archived.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + 'static {
    const KIND: &'static str;

    fn parent_ref_id(&self) -> EntityId;

    /// Key unique under the parent; sortable when range queries are used.
    fn raw_key(&self) -> String;

    fn created_time(&self) -> Timestamp;

    fn last_modified_time(&self) -> Timestamp;
}
