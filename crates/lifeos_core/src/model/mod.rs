//! Domain model: values, entity framework and every concept's entities.
//!
//! # Responsibility
//! - Declare entities, records and their link graphs.
//! - Keep per-entity invariants inside `new_*` factories and update methods.
//!
//! # See also
//! - `repo` for persistence and `service` for cross-entity operations.

pub mod big_plan;
pub mod chore;
pub mod doc;
pub mod framework;
pub mod gamification;
pub mod habit;
pub mod home;
pub mod inbox_task;
pub mod journal;
pub mod metric;
pub mod note;
pub mod person;
pub mod project;
pub mod push_integration;
pub mod report;
pub mod run_log;
pub mod schedule;
pub mod smart_list;
pub mod time_event;
pub mod time_plan;
pub mod user;
pub mod vacation;
pub mod values;
pub mod working_mem;
pub mod workspace;
