mod common;

use common::registered_at;
use lifeos_core::model::values::WorkspaceFeature;
use lifeos_core::use_case::account::{WorkspaceChangeFeatureFlagsArgs, WorkspaceChangeFeatureFlagsUseCase};
use lifeos_core::use_case::planning::{VacationCreateArgs, VacationCreateUseCase, VacationUpdateArgs, VacationUpdateUseCase};
use lifeos_core::use_case::InvocationResult;
use lifeos_core::{UpdateAction, UseCaseError};
use std::collections::BTreeMap;

#[tokio::test]
async fn disabled_feature_refuses_before_opening_a_unit_of_work() {
    let h = registered_at("2024-03-04T08:00:00Z").await;
    let token = &h.registered.auth_token;
    let vacation = h
        .app
        .execute_mutation(
            &VacationCreateUseCase,
            token,
            VacationCreateArgs {
                name: "Beach".parse().expect("name"),
                start_date: "2024-07-01".parse().expect("date"),
                end_date: "2024-07-10".parse().expect("date"),
            },
        )
        .await
        .expect("vacation");

    h.app
        .execute_mutation(
            &WorkspaceChangeFeatureFlagsUseCase,
            token,
            WorkspaceChangeFeatureFlagsArgs {
                feature_flags: BTreeMap::from([(WorkspaceFeature::Vacations, false)]),
            },
        )
        .await
        .expect("disable vacations");

    let opened_before = h.app.domain().uow_open_count();
    let err = h
        .app
        .execute_mutation(
            &VacationUpdateUseCase,
            token,
            VacationUpdateArgs {
                ref_id: vacation.header.ref_id,
                name: UpdateAction::change_to("Mountains".parse().expect("name")),
                start_date: UpdateAction::do_nothing(),
                end_date: UpdateAction::do_nothing(),
            },
        )
        .await
        .expect_err("gated");
    assert!(matches!(err, UseCaseError::FeatureUnavailable(_)));
    assert_eq!(h.app.domain().uow_open_count(), opened_before);

    let rows = h.app.audit().find_by_name("vacation_update").await.expect("audit");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].result, InvocationResult::Failure);
}

#[tokio::test]
async fn features_default_to_enabled_at_registration() {
    let h = registered_at("2024-03-04T08:00:00Z").await;
    let before = h.app.domain().uow_open_count();
    h.app
        .execute_mutation(
            &VacationCreateUseCase,
            &h.registered.auth_token,
            VacationCreateArgs {
                name: "Lake".parse().expect("name"),
                start_date: "2024-08-01".parse().expect("date"),
                end_date: "2024-08-03".parse().expect("date"),
            },
        )
        .await
        .expect("vacation");
    assert_eq!(h.app.domain().uow_open_count(), before + 1);
}
