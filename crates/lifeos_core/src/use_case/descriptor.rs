//! Use-case declarations: kinds, gates and the traits each pipeline runs.

use crate::config::Env;
use crate::model::framework::enum_value::enum_value;
use crate::model::framework::EventSource;
use crate::model::user::User;
use crate::model::values::{UserFeature, WorkspaceFeature};
use crate::model::workspace::Workspace;
use crate::use_case::app::{AppServices, AuditSubject, GuestCx, LoggedInCx, Session};
use crate::use_case::{UseCaseError, UseCaseResult};
use async_trait::async_trait;
use serde::Serialize;

enum_value! {
    /// Front-end the kernel is serving.
    pub enum ClientApp("client_app") {
        Cli => "cli",
        Web => "web",
    }
}

impl ClientApp {
    pub fn event_source(self) -> EventSource {
        match self {
            Self::Cli => EventSource::Cli,
            Self::Web => EventSource::Web,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseCaseKind {
    GuestMutation,
    GuestReadonly,
    LoggedInMutation,
    LoggedInReadonly,
    BackgroundMutation,
    SysBackgroundMutation,
}

impl UseCaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GuestMutation => "guest_mutation",
            Self::GuestReadonly => "guest_readonly",
            Self::LoggedInMutation => "logged_in_mutation",
            Self::LoggedInReadonly => "logged_in_readonly",
            Self::BackgroundMutation => "background_mutation",
            Self::SysBackgroundMutation => "sys_background_mutation",
        }
    }

    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::GuestReadonly | Self::LoggedInReadonly)
    }
}

/// Name, kind and gates of one use case.
#[derive(Debug, Clone, Copy)]
pub struct UseCaseDescriptor {
    pub name: &'static str,
    pub kind: UseCaseKind,
    pub workspace_features: &'static [WorkspaceFeature],
    pub user_features: &'static [UserFeature],
    pub excluded_apps: &'static [ClientApp],
    pub excluded_envs: &'static [Env],
}

impl UseCaseDescriptor {
    pub const fn new(name: &'static str, kind: UseCaseKind) -> Self {
        Self {
            name,
            kind,
            workspace_features: &[],
            user_features: &[],
            excluded_apps: &[],
            excluded_envs: &[],
        }
    }

    pub const fn mutation(name: &'static str) -> Self {
        Self::new(name, UseCaseKind::LoggedInMutation)
    }

    pub const fn readonly(name: &'static str) -> Self {
        Self::new(name, UseCaseKind::LoggedInReadonly)
    }

    pub const fn requires(self, workspace_features: &'static [WorkspaceFeature]) -> Self {
        Self {
            workspace_features,
            ..self
        }
    }

    pub const fn requires_user(self, user_features: &'static [UserFeature]) -> Self {
        Self {
            user_features,
            ..self
        }
    }

    pub const fn excluding_apps(self, excluded_apps: &'static [ClientApp]) -> Self {
        Self {
            excluded_apps,
            ..self
        }
    }

    pub const fn excluding_envs(self, excluded_envs: &'static [Env]) -> Self {
        Self {
            excluded_envs,
            ..self
        }
    }

    /// App and environment exclusions.
    pub fn check_surface(&self, app: ClientApp, env: Env) -> UseCaseResult<()> {
        if self.excluded_apps.contains(&app) {
            return Err(UseCaseError::UseCaseNotAllowed {
                name: self.name,
                reason: format!("not available from {app}"),
            });
        }
        if self.excluded_envs.contains(&env) {
            return Err(UseCaseError::UseCaseNotAllowed {
                name: self.name,
                reason: format!("not available in {env}"),
            });
        }
        Ok(())
    }

    /// Feature scope against the resolved workspace and user.
    pub fn check_features(&self, workspace: &Workspace, user: &User) -> UseCaseResult<()> {
        if let Some(feature) = self
            .workspace_features
            .iter()
            .find(|feature| !workspace.is_feature_available(**feature))
        {
            return Err(UseCaseError::FeatureUnavailable(feature.to_string()));
        }
        if let Some(feature) = self
            .user_features
            .iter()
            .find(|feature| !user.feature_flags.is_enabled(**feature))
        {
            return Err(UseCaseError::FeatureUnavailable(feature.to_string()));
        }
        Ok(())
    }
}

/// Declares a unit-struct use case with its args, output and descriptor.
///
/// ```ignore
/// use_case! {
///     /// Doc comment.
///     VacationArchiveUseCase: RefIdArgs => usize,
///     UseCaseDescriptor::mutation("vacation_archive").requires(&[WorkspaceFeature::Vacations])
/// }
/// ```
macro_rules! use_case {
    (
        $(#[$meta:meta])*
        $name:ident : $args:ty => $output:ty, $descriptor:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::use_case::UseCase for $name {
            type Args = $args;
            type Output = $output;

            const DESCRIPTOR: $crate::use_case::UseCaseDescriptor = $descriptor;
        }
    };
}

pub(crate) use use_case;

/// Args and result of a use case, plus its declaration.
pub trait UseCase {
    type Args: Serialize;
    type Output;

    const DESCRIPTOR: UseCaseDescriptor;
}

/// Logged-in mutation run inside exactly one unit of work.
pub trait LoggedInMutation: UseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: Self::Args) -> UseCaseResult<Self::Output>;
}

/// Logged-in read run against one rolled-back snapshot.
pub trait LoggedInReadonly: UseCase {
    fn perform(&self, cx: &LoggedInCx<'_, '_>, args: Self::Args) -> UseCaseResult<Self::Output>;
}

/// Logged-in use case that opens its own units of work around async I/O.
///
/// Each unit of work opened through `AppServices::in_uow` publishes its own
/// search changes once it commits.
#[async_trait(?Send)]
pub trait LoggedInAsync: UseCase {
    async fn perform(
        &self,
        app: &AppServices,
        session: &Session,
        args: Self::Args,
    ) -> UseCaseResult<Self::Output>;
}

pub trait GuestMutation: UseCase {
    fn perform(&self, cx: &GuestCx<'_, '_>, args: Self::Args) -> UseCaseResult<Self::Output>;

    /// Who the audit row belongs to when the call created its own session.
    fn audit_subject(&self, _output: &Self::Output) -> Option<AuditSubject> {
        None
    }
}

pub trait GuestReadonly: UseCase {
    fn perform(&self, cx: &GuestCx<'_, '_>, args: Self::Args) -> UseCaseResult<Self::Output>;
}

/// Session-less mutation applied to every workspace in turn.
#[async_trait(?Send)]
pub trait BackgroundMutation: UseCase<Args = ()> {
    async fn perform_for_workspace(
        &self,
        app: &AppServices,
        session: &Session,
    ) -> UseCaseResult<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::{ClientApp, UseCaseDescriptor, UseCaseKind};
    use crate::config::Env;
    use crate::model::values::WorkspaceFeature;
    use crate::use_case::UseCaseError;

    #[test]
    fn surface_exclusions_refuse_the_call() {
        let descriptor = UseCaseDescriptor::new("test_helper_clear_all", UseCaseKind::LoggedInMutation)
            .excluding_envs(&[Env::Production])
            .excluding_apps(&[ClientApp::Web]);
        assert!(descriptor.check_surface(ClientApp::Cli, Env::Local).is_ok());
        assert!(matches!(
            descriptor.check_surface(ClientApp::Cli, Env::Production),
            Err(UseCaseError::UseCaseNotAllowed { .. })
        ));
        assert!(descriptor.check_surface(ClientApp::Web, Env::Local).is_err());
    }

    #[test]
    fn builders_keep_earlier_gates() {
        let descriptor = UseCaseDescriptor::new("vacation_update", UseCaseKind::LoggedInMutation)
            .requires(&[WorkspaceFeature::Vacations])
            .excluding_envs(&[Env::Production]);
        assert_eq!(descriptor.workspace_features, &[WorkspaceFeature::Vacations]);
        assert!(descriptor.kind.is_mutation());
    }
}
