//! Shared harness: in-memory app with a pinned clock and canned calendar feeds.

#![allow(dead_code)]

use async_trait::async_trait;
use lifeos_core::model::values::Url;
use lifeos_core::sync::{CalendarFetcher, CalendarSyncError};
use lifeos_core::use_case::guest::{RegisterArgs, RegisterResult, RegisterUseCase};
use lifeos_core::{AppServices, ClientApp, CoreConfig, FixedTimeProvider, Timestamp};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const EMAIL: &str = "a@b.c";
pub const PASSWORD: &str = "Correct-Horse-1";

pub struct FakeFetcher {
    pub feed: Option<String>,
}

#[async_trait(?Send)]
impl CalendarFetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, CalendarSyncError> {
        self.feed
            .clone()
            .ok_or_else(|| CalendarSyncError::Fetch(format!("unreachable {}", url.as_str())))
    }
}

pub struct Harness {
    pub app: AppServices,
    pub clock: Arc<FixedTimeProvider>,
    pub registered: RegisterResult,
}

pub fn at(raw: &str) -> Timestamp {
    raw.parse().expect("timestamp")
}

pub fn app_at(now: &str, feed: Option<String>) -> (AppServices, Arc<FixedTimeProvider>) {
    let clock = Arc::new(FixedTimeProvider::new(at(now)));
    let app = AppServices::with_parts(
        CoreConfig::for_tests(),
        ClientApp::Cli,
        clock.clone(),
        Box::new(FakeFetcher { feed }),
    )
    .expect("app");
    (app, clock)
}

pub fn register_args() -> RegisterArgs {
    RegisterArgs {
        user_email_address: EMAIL.parse().expect("email"),
        user_name: "Alex".parse().expect("name"),
        user_timezone: "UTC".parse().expect("timezone"),
        auth_password: PASSWORD.parse().expect("password"),
        auth_password_repeat: PASSWORD.parse().expect("password"),
        workspace_name: "Home".parse().expect("name"),
        workspace_root_project_name: "Life".parse().expect("name"),
        workspace_feature_flags: BTreeMap::new(),
        user_feature_flags: BTreeMap::new(),
    }
}

pub async fn registered_at(now: &str) -> Harness {
    registered_with_feed(now, None).await
}

pub async fn registered_with_feed(now: &str, feed: Option<String>) -> Harness {
    let (app, clock) = app_at(now, feed);
    let registered = app
        .execute_guest_mutation(&RegisterUseCase, None, register_args())
        .await
        .expect("register");
    Harness {
        app,
        clock,
        registered,
    }
}
