//! Core domain kernel for LifeOS.
//! This crate is the single source of truth for business invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scheduler;
pub mod search;
pub mod service;
pub mod sync;
pub mod time;
pub mod use_case;

pub use auth::{AuthError, AuthToken, AuthTokenKind, AuthTokenStamper};
pub use config::{ConfigError, CoreConfig, Env};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::framework::{ADate, EntityId, EntityName, InputValidationError, Timestamp, UpdateAction};
pub use repo::{DomainStorageEngine, RepoError};
pub use search::{SearchHit, SearchQuery, SearchStorageEngine};
pub use service::{ServiceError, ServiceResult};
pub use time::{FixedTimeProvider, SystemTimeProvider, TimeProvider};
pub use use_case::{AppServices, ClientApp, Session, UseCaseError, UseCaseResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
