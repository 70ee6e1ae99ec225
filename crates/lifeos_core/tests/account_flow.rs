mod common;

use common::{registered_at, register_args, EMAIL, PASSWORD};
use lifeos_core::model::framework::realm::SecretValue;
use lifeos_core::use_case::account::{ChangePasswordArgs, ChangePasswordUseCase};
use lifeos_core::use_case::guest::{
    LoadUserAndWorkspaceUseCase, LoginArgs, LoginUseCase, RegisterUseCase, ResetPasswordArgs,
    ResetPasswordUseCase,
};
use lifeos_core::{AuthError, UseCaseError};

fn login_args(password: &str) -> LoginArgs {
    LoginArgs {
        email_address: EMAIL.parse().expect("email"),
        password: password.parse().expect("password"),
    }
}

#[tokio::test]
async fn register_then_login_yields_a_working_session() {
    let h = registered_at("2024-03-04T08:00:00Z").await;

    let login = h
        .app
        .execute_guest_read(&LoginUseCase, None, login_args(PASSWORD))
        .await
        .expect("login");
    let loaded = h
        .app
        .execute_guest_read(&LoadUserAndWorkspaceUseCase, Some(&login.auth_token), ())
        .await
        .expect("load")
        .expect("session");
    assert_eq!(loaded.workspace.header.ref_id, h.registered.workspace_ref_id);

    let anonymous = h
        .app
        .execute_guest_read(&LoadUserAndWorkspaceUseCase, None, ())
        .await
        .expect("load");
    assert!(anonymous.is_none());
}

#[tokio::test]
async fn wrong_password_and_duplicate_email_are_rejected() {
    let h = registered_at("2024-03-04T08:00:00Z").await;

    let err = h
        .app
        .execute_guest_read(&LoginUseCase, None, login_args("Wrong-Password-9"))
        .await
        .expect_err("bad password");
    assert!(matches!(err, UseCaseError::Authentication(AuthError::BadCredentials)));

    let err = h
        .app
        .execute_guest_mutation(&RegisterUseCase, None, register_args())
        .await
        .expect_err("duplicate");
    assert!(matches!(err, UseCaseError::EntityAlreadyExists(_)));
}

#[tokio::test]
async fn reset_password_rotates_the_recovery_token_and_allows_change_password() {
    let h = registered_at("2024-03-04T08:00:00Z").await;
    let first_token = h.registered.recovery_token.clone();

    let reset = h
        .app
        .execute_guest_mutation(
            &ResetPasswordUseCase,
            None,
            ResetPasswordArgs {
                email_address: EMAIL.parse().expect("email"),
                recovery_token: first_token.clone(),
                new_password: "LongEnough1".parse().expect("password"),
                new_password_repeat: "LongEnough1".parse().expect("password"),
            },
        )
        .await
        .expect("reset");
    assert_ne!(reset.new_recovery_token.reveal(), first_token.reveal());

    let login = h
        .app
        .execute_guest_read(&LoginUseCase, None, login_args("LongEnough1"))
        .await
        .expect("login with the new password");
    h.app
        .execute_mutation(
            &ChangePasswordUseCase,
            &login.auth_token,
            ChangePasswordArgs {
                current_password: "LongEnough1".parse().expect("password"),
                new_password: "EvenLonger22".parse().expect("password"),
                new_password_repeat: "EvenLonger22".parse().expect("password"),
            },
        )
        .await
        .expect("change password");

    let err = h
        .app
        .execute_guest_mutation(
            &ResetPasswordUseCase,
            None,
            ResetPasswordArgs {
                email_address: EMAIL.parse().expect("email"),
                recovery_token: first_token,
                new_password: "Another-Pass3".parse().expect("password"),
                new_password_repeat: "Another-Pass3".parse().expect("password"),
            },
        )
        .await
        .expect_err("used token");
    assert!(matches!(err, UseCaseError::Authentication(_)));
}

#[tokio::test]
async fn audited_arguments_never_carry_plain_secrets() {
    let h = registered_at("2024-03-04T08:00:00Z").await;

    let rows = h.app.audit().find_by_name("register").await.expect("audit");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_ref_id, Some(h.registered.user_ref_id));
    assert!(!rows[0].args.contains(PASSWORD));
    assert!(rows[0].args.contains(EMAIL));

    // Logins are reads and leave no row.
    h.app
        .execute_guest_read(&LoginUseCase, None, login_args(PASSWORD))
        .await
        .expect("login");
    assert!(h.app.audit().find_by_name("login").await.expect("audit").is_empty());
}

#[tokio::test]
async fn expired_tokens_are_refused() {
    let h = registered_at("2024-03-04T08:00:00Z").await;
    let ttl_days = i64::from(h.app.config().auth_token_ttl_days);
    h.clock.advance_seconds((ttl_days + 1) * 86_400);

    let err = h
        .app
        .execute_mutation(
            &ChangePasswordUseCase,
            &h.registered.auth_token,
            ChangePasswordArgs {
                current_password: PASSWORD.parse().expect("password"),
                new_password: "LongEnough1".parse().expect("password"),
                new_password_repeat: "LongEnough1".parse().expect("password"),
            },
        )
        .await
        .expect_err("expired");
    assert!(matches!(err, UseCaseError::Authentication(_)));
}
