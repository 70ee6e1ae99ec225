//! Use-case pipeline: gates, units of work, audit and search publication.
//!
//! # Responsibility
//! - Declare every use case with its args, result and gates.
//! - Run each invocation through auth, gates, one unit of work, audit and
//!   search publication, in that order.
//!
//! # Invariants
//! - Gates are checked before any unit of work opens.
//! - Mutation invocations leave one audit row, success or failure.
//! - Search publication happens only after commit and never fails the invocation.
//!
//! # See also
//! - `service` for the operations use cases compose.

pub mod account;
pub mod app;
pub mod audit;
pub mod background;
pub mod big_plan;
pub mod descriptor;
pub mod engine;
pub mod guest;
pub mod habit;
pub mod inbox_task;
pub mod journal;
pub mod knowledge;
pub mod metric;
pub mod person;
pub mod planning;
pub mod project;
pub mod push;
pub mod schedule;
pub mod smart_list;

use crate::auth::AuthError;
use crate::db::DbError;
use crate::model::framework::{EntityId, InputValidationError};
use crate::repo::RepoError;
use crate::search::SearchError;
use crate::service::ServiceError;
use crate::sync::CalendarSyncError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::{AppBuildError, AppServices, AuditSubject, BackgroundRun, GuestCx, LoggedInCx, Session};
pub use audit::{InvocationResult, MutationUseCaseInvocationRecord, UseCaseStorageEngine};
pub use descriptor::{
    BackgroundMutation, ClientApp, GuestMutation, GuestReadonly, LoggedInAsync,
    LoggedInMutation, LoggedInReadonly, UseCase, UseCaseDescriptor, UseCaseKind,
};

pub type UseCaseResult<T> = Result<T, UseCaseError>;

/// Args of use cases that act on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefIdArgs {
    pub ref_id: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadArgs {
    pub ref_id: EntityId,
    #[serde(default)]
    pub allow_archived: bool,
}

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error(transparent)]
    InputValidation(#[from] InputValidationError),
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    EntityAlreadyExists(String),
    #[error("{0}")]
    InvariantViolation(String),
    #[error("feature `{0}` is not available")]
    FeatureUnavailable(String),
    #[error(transparent)]
    Authentication(#[from] AuthError),
    #[error("use case `{name}` is not allowed: {reason}")]
    UseCaseNotAllowed { name: &'static str, reason: String },
    #[error("external adapter failed: {0}")]
    ExternalAdapter(String),
    #[error("{0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl UseCaseError {
    /// Errors the caller caused through its arguments.
    pub fn is_input_class(&self) -> bool {
        matches!(self, Self::InputValidation(_) | Self::InvariantViolation(_))
    }

    /// Stable, content-free tag for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "input_validation",
            Self::EntityNotFound(_) => "entity_not_found",
            Self::EntityAlreadyExists(_) => "entity_already_exists",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::FeatureUnavailable(_) => "feature_unavailable",
            Self::Authentication(_) => "authentication",
            Self::UseCaseNotAllowed { .. } => "use_case_not_allowed",
            Self::ExternalAdapter(_) => "external_adapter",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage",
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InputValidation(InputValidationError::new(message))
    }
}

impl From<RepoError> for UseCaseError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InputValidation(err) => Self::InputValidation(err),
            RepoError::EntityNotFound { .. }
            | RepoError::TrunkNotFound { .. }
            | RepoError::RecordNotFound { .. } => Self::EntityNotFound(value.to_string()),
            RepoError::EntityAlreadyExists { .. } => Self::EntityAlreadyExists(value.to_string()),
            RepoError::VersionConflict { .. } => Self::Conflict(value.to_string()),
            RepoError::Db(_) | RepoError::InvalidData(_) => Self::Storage(value.to_string()),
        }
    }
}

impl From<ServiceError> for UseCaseError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Repo(err) => err.into(),
            ServiceError::InputValidation(err) => Self::InputValidation(err),
            ServiceError::InvariantViolation(message) => Self::InvariantViolation(message),
        }
    }
}

impl From<SearchError> for UseCaseError {
    fn from(value: SearchError) -> Self {
        match value {
            SearchError::InvalidQuery { .. } => Self::invalid(value.to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<CalendarSyncError> for UseCaseError {
    fn from(value: CalendarSyncError) -> Self {
        Self::ExternalAdapter(value.to_string())
    }
}

impl From<DbError> for UseCaseError {
    fn from(value: DbError) -> Self {
        Self::Storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::UseCaseError;
    use crate::model::framework::EntityId;
    use crate::repo::RepoError;
    use crate::service::ServiceError;

    #[test]
    fn invariant_violations_count_as_input_errors() {
        let err: UseCaseError = ServiceError::invariant("milestone date before actionable date").into();
        assert!(err.is_input_class());
        assert_eq!(err.code(), "invariant_violation");
    }

    #[test]
    fn repository_errors_map_onto_the_taxonomy() {
        let missing: UseCaseError = RepoError::EntityNotFound {
            kind: "big_plan".into(),
            ref_id: EntityId::from_raw(3),
        }
        .into();
        assert!(matches!(missing, UseCaseError::EntityNotFound(_)));
        let stale: UseCaseError = RepoError::VersionConflict {
            kind: "big_plan".into(),
            ref_id: EntityId::from_raw(3),
            expected: 2,
            actual: 3,
        }
        .into();
        assert_eq!(stale.code(), "conflict");
        assert!(!stale.is_input_class());
    }
}
