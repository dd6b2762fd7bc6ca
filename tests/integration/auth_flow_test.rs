//! End-to-end sign-in flows: confirmation gate, plain success, and the
//! two-factor branch.

mod common;

use common::*;
use gatehouse_auth::{validate_token, AuthConfig, TeamType};
use gatehouse_common::Error;
use gatehouse_identity::domain::events;
use gatehouse_identity::service::introspect::whoami;
use gatehouse_identity::{Credentials, SignInChannel, SignInOutcome, TwoFactorProvider};

fn credentials(identifier: &str, password: &str) -> Credentials {
    Credentials {
        identifier: identifier.to_string(),
        password: password.to_string(),
        device_id: None,
        channel: SignInChannel::Standard,
    }
}

// Scenario A: unconfirmed email + correct password -> confirmation
// required, no token issued.
#[tokio::test]
async fn unconfirmed_email_blocks_sign_in() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let u1 = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 3,
            email: "u1@example.test",
            username: "u-one",
            password: "correct-password",
            email_confirmed: false,
        },
    )
    .await;

    let outcome = env
        .signin
        .sign_in(credentials("u1@example.test", "correct-password"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SignInOutcome::EmailConfirmationRequired {
            email: u1.email.clone()
        }
    );
    // No token of any kind was issued
    assert_eq!(env.refresh.record_count(), 0);
    // The confirmation request went out
    assert!(env
        .events
        .last_event_named(events::EMAIL_CONFIRMATION_REQUESTED)
        .is_some());
}

// Scenario B: confirmed user, no 2FA -> package whose claims carry the
// hierarchy context and no two-factor marker.
#[tokio::test]
async fn plain_sign_in_issues_package() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let u2 = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 4,
            email: "u2@example.test",
            username: "u-two",
            password: "correct-password",
            email_confirmed: true,
        },
    )
    .await;

    let outcome = env
        .signin
        .sign_in(credentials("u2@example.test", "correct-password"))
        .await
        .unwrap();
    let SignInOutcome::Success(package) = outcome else {
        panic!("expected a token package");
    };

    let claims = validate_token(&package.access_token, &AuthConfig::hmac(JWT_SECRET)).unwrap();
    assert_eq!(claims.sub, u2.id.to_string());
    assert_eq!(claims.team_id, Some(u2.team_id));
    assert_eq!(claims.team_position, 4);
    assert_eq!(claims.two_factor_verified, None);
    assert!(package.refresh_token.is_some());
}

// Scenario C: SMS 2FA -> pending token, then verify -> package with the
// two-factor marker set.
#[tokio::test]
async fn sms_two_factor_roundtrip() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let u3 = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 5,
            email: "u3@example.test",
            username: "u-three",
            password: "correct-password",
            email_confirmed: true,
        },
    )
    .await;
    let mut u3 = env.users.get(u3.id).await.unwrap().unwrap();
    u3.phone_number = Some("+15550100123".to_string());
    u3.two_factor_enabled = true;
    u3.two_factor_provider = Some(TwoFactorProvider::Sms);
    env.users.update(&u3).await.unwrap();

    let outcome = env
        .signin
        .sign_in(credentials("u3@example.test", "correct-password"))
        .await
        .unwrap();
    let SignInOutcome::TwoFactorRequired {
        pending_token,
        provider,
    } = outcome
    else {
        panic!("expected a two-factor challenge");
    };
    assert_eq!(provider, TwoFactorProvider::Sms);

    let code = env.sms.last_code_for("+15550100123").unwrap();
    let package = env
        .two_factor
        .verify(&pending_token, &code, None, true)
        .await
        .unwrap();

    let claims = validate_token(&package.access_token, &AuthConfig::hmac(JWT_SECRET)).unwrap();
    assert_eq!(claims.two_factor_verified, Some(true));
}

#[tokio::test]
async fn resend_invalidates_previous_pending_token() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let user = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 5,
            email: "r@example.test",
            username: "resender",
            password: "correct-password",
            email_confirmed: true,
        },
    )
    .await;
    let mut user = env.users.get(user.id).await.unwrap().unwrap();
    user.phone_number = Some("+15550100999".to_string());
    user.two_factor_enabled = true;
    user.two_factor_provider = Some(TwoFactorProvider::Sms);
    env.users.update(&user).await.unwrap();

    let outcome = env
        .signin
        .sign_in(credentials("r@example.test", "correct-password"))
        .await
        .unwrap();
    let SignInOutcome::TwoFactorRequired { pending_token, .. } = outcome else {
        panic!("expected a two-factor challenge");
    };

    let replacement = env.two_factor.resend(&pending_token).await.unwrap();
    assert_ne!(replacement.pending_token, pending_token);

    // Old token (and its code) no longer verify
    let code = env.sms.last_code_for("+15550100999").unwrap();
    assert!(env
        .two_factor
        .verify(&pending_token, &code, None, false)
        .await
        .is_err());
    assert!(env
        .two_factor
        .verify(&replacement.pending_token, &code, None, false)
        .await
        .is_ok());
}

#[tokio::test]
async fn confirmation_token_completes_the_gate() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 3,
            email: "gate@example.test",
            username: "gated",
            password: "correct-password",
            email_confirmed: false,
        },
    )
    .await;

    let _ = env
        .signin
        .sign_in(credentials("gate@example.test", "correct-password"))
        .await
        .unwrap();
    let token = env
        .events
        .last_event_named(events::EMAIL_CONFIRMATION_REQUESTED)
        .unwrap()
        .payload["token"]
        .as_str()
        .unwrap()
        .to_string();

    env.signin.confirm_email(&token).await.unwrap();

    let outcome = env
        .signin
        .sign_in(credentials("gate@example.test", "correct-password"))
        .await
        .unwrap();
    assert!(matches!(outcome, SignInOutcome::Success(_)));
}

#[tokio::test]
async fn unknown_identifier_and_wrong_password_are_indistinguishable() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 3,
            email: "real@example.test",
            username: "real-user",
            password: "correct-password",
            email_confirmed: true,
        },
    )
    .await;

    let unknown = env
        .signin
        .sign_in(credentials("ghost@example.test", "x"))
        .await
        .unwrap_err();
    let wrong = env
        .signin
        .sign_in(credentials("real@example.test", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(unknown, Error::Unauthorized(_)));
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(unknown.error_code(), wrong.error_code());
}

// The issued access token round-trips through the validator and the
// introspection query.
#[tokio::test]
async fn access_token_resolves_back_to_scope() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Maintenance, 1, 10).await;
    let user = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 7,
            email: "who@example.test",
            username: "who-am-i",
            password: "correct-password",
            email_confirmed: true,
        },
    )
    .await;
    team.leader_id = Some(user.id);
    env.teams.update(&team).await.unwrap();

    let outcome = env
        .signin
        .sign_in(credentials("who@example.test", "correct-password"))
        .await
        .unwrap();
    let SignInOutcome::Success(package) = outcome else {
        panic!("expected a token package");
    };

    let principal = env
        .tokens
        .validator()
        .authenticate(&package.access_token)
        .unwrap();
    let view = whoami(&env.pipeline, principal).await.unwrap();

    assert_eq!(view.user.id, user.id);
    assert_eq!(view.team_type, TeamType::Maintenance);
    assert_eq!(view.position, 7);
    assert!(view.is_leader);
}
