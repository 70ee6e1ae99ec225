//! Domain services: operations whose invariants span more than one entity.
//!
//! # Responsibility
//! - Orchestrate repository calls inside one unit of work.
//! - Mark every touched entity in the progress reporter.
//!
//! # Invariants
//! - Services never open or commit a unit of work; callers own the transaction.
//! - Services never publish to search; the pipeline flushes after commit.
//!
//! # See also
//! - `use_case` for the pipeline that opens units of work and flushes changes.

use crate::model::framework::{
    ArchivalReason, CrownEntity, DomainContext, EntityId, InputValidationError, TrunkEntity,
};
use crate::repo::{DomainUnitOfWork, RepoError, TrunkEntityRepository};
use thiserror::Error;

pub mod big_plan_service;
pub mod catalog;
pub mod chore_service;
pub mod doc_service;
pub mod gc_service;
pub mod gen_service;
pub mod habit_service;
pub mod home_service;
pub mod inbox_task_service;
pub mod journal_service;
pub mod metric_service;
pub mod note_service;
pub mod person_service;
pub mod progress;
pub mod project_service;
pub mod push_service;
pub mod report_service;
pub mod schedule_service;
pub mod score_service;
pub mod smart_list_service;
pub mod time_event_service;
pub mod time_plan_service;
pub mod traversal;
pub mod vacation_service;
pub mod working_mem_service;
pub mod workspace_service;

pub use catalog::EntityCatalog;
pub use progress::{ChangeKind, EntityChange, ProgressReporter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repo(RepoError),
    #[error(transparent)]
    InputValidation(#[from] InputValidationError),
    /// The operation would break an invariant spanning several entities.
    #[error("{0}")]
    InvariantViolation(String),
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InputValidation(err) => Self::InputValidation(err),
            other => Self::Repo(other),
        }
    }
}

impl ServiceError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}

/// Everything a service call needs from its invocation.
#[derive(Clone, Copy)]
pub struct ServiceScope<'a, 'conn> {
    pub uow: &'a DomainUnitOfWork<'conn>,
    pub ctx: &'a DomainContext,
    pub catalog: &'a EntityCatalog,
    pub reporter: &'a ProgressReporter,
}

impl<'a, 'conn> ServiceScope<'a, 'conn> {
    pub fn new(
        uow: &'a DomainUnitOfWork<'conn>,
        ctx: &'a DomainContext,
        catalog: &'a EntityCatalog,
        reporter: &'a ProgressReporter,
    ) -> Self {
        Self {
            uow,
            ctx,
            catalog,
            reporter,
        }
    }

    /// The `T` trunk of a workspace (or of whatever parent owns it).
    pub fn trunk<T: TrunkEntity>(&self, parent_ref_id: EntityId) -> ServiceResult<T> {
        Ok(self.uow.get_for::<T>().load_by_parent(parent_ref_id)?)
    }

    /// Archives a crown entity and its dependents with the user's reason.
    pub fn archive<E: CrownEntity>(&self, ref_id: EntityId) -> ServiceResult<usize> {
        self.archive_with_reason::<E>(ref_id, ArchivalReason::User)
    }

    pub fn archive_with_reason<E: CrownEntity>(
        &self,
        ref_id: EntityId,
        reason: ArchivalReason,
    ) -> ServiceResult<usize> {
        Ok(traversal::generic_crown_archiver::<E>(
            self.uow,
            self.catalog,
            self.ctx,
            ref_id,
            reason,
            self.reporter,
        )?)
    }

    /// Removes a crown entity and everything it owns.
    pub fn remove<E: CrownEntity>(&self, ref_id: EntityId) -> ServiceResult<usize> {
        Ok(traversal::generic_crown_remover::<E>(
            self.uow,
            self.catalog,
            ref_id,
            self.reporter,
        )?)
    }

    /// Same scope under a different domain context.
    pub fn with_ctx<'b>(&self, ctx: &'b DomainContext) -> ServiceScope<'b, 'conn>
    where
        'a: 'b,
    {
        ServiceScope {
            uow: self.uow,
            ctx,
            catalog: self.catalog,
            reporter: self.reporter,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory fixtures shared by service tests.

    use crate::db::{open_db_in_memory, Schema};
    use crate::model::framework::{DomainContext, EntityId, EventSource, Timestamp};
    use crate::model::user::User;
    use crate::model::values::{
        standard_registry, Timezone, UserFeatureFlags, WorkspaceFeatureFlags,
    };
    use crate::model::workspace::Workspace;
    use crate::repo::{DomainUnitOfWork, EntityRepository};
    use crate::service::workspace_service::init_workspace;
    use crate::service::ServiceScope;
    use rusqlite::Connection;
    use std::sync::Arc;

    pub fn domain_conn() -> Connection {
        open_db_in_memory(Schema::Domain).expect("in-memory domain db")
    }

    pub fn ctx_at(raw: &str) -> DomainContext {
        let codecs = standard_registry().expect("registry");
        DomainContext::new(
            EventSource::Cli,
            raw.parse::<Timestamp>().expect("timestamp"),
            Arc::new(codecs),
        )
    }

    pub fn uow(conn: &Connection) -> DomainUnitOfWork<'_> {
        DomainUnitOfWork::new(conn)
    }

    pub struct Seeded {
        pub user: User,
        pub workspace: Workspace,
        pub root_project_ref_id: EntityId,
    }

    /// A user plus a fully initialized workspace with every feature on.
    pub fn seeded_workspace(scope: ServiceScope<'_, '_>) -> Seeded {
        let user = scope
            .uow
            .get_for::<User>()
            .create(User::new_user(
                scope.ctx,
                "owner@example.com".parse().expect("email"),
                "Owner".parse().expect("name"),
                Timezone::utc(),
                UserFeatureFlags::default(),
            ))
            .expect("user");
        let workspace = scope
            .uow
            .get_for::<Workspace>()
            .create(Workspace::new_workspace(
                scope.ctx,
                "Home".parse().expect("name"),
                WorkspaceFeatureFlags::default(),
            ))
            .expect("workspace");
        let init = init_workspace(scope, &user, &workspace, "Life".parse().expect("name"))
            .expect("init workspace");
        Seeded {
            user,
            workspace,
            root_project_ref_id: init.root_project_ref_id,
        }
    }
}
