//! Refresh-token lifecycle: rotation, replay hardening, the concurrency
//! guarantee, and the global feature flag.

mod common;

use common::*;
use gatehouse_auth::TeamType;
use gatehouse_common::{Config, Error};
use gatehouse_identity::domain::events;
use gatehouse_identity::{Credentials, SignInChannel, SignInOutcome};

async fn signed_in_refresh_token(env: &TestEnv) -> String {
    let mut team = seed_team(env, TeamType::Customer, 1, 10).await;
    seed_member(
        env,
        SeedMember {
            team: &mut team,
            position: 3,
            email: "rt@example.test",
            username: "rt-user",
            password: "correct-password",
            email_confirmed: true,
        },
    )
    .await;

    let outcome = env
        .signin
        .sign_in(Credentials {
            identifier: "rt@example.test".to_string(),
            password: "correct-password".to_string(),
            device_id: Some("device-1".to_string()),
            channel: SignInChannel::Standard,
        })
        .await
        .unwrap();
    let SignInOutcome::Success(package) = outcome else {
        panic!("expected a token package");
    };
    package.refresh_token.unwrap()
}

// Scenario E: r1 -> r2 by refresh; replaying r1 is rejected and never
// mints a second child.
#[tokio::test]
async fn reuse_of_rotated_token_is_rejected() {
    let env = env();
    let r1 = signed_in_refresh_token(&env).await;

    let refreshed = env.tokens.refresh(&r1).await.unwrap();
    let r2 = refreshed.refresh_token.unwrap();
    assert_ne!(r1, r2);

    let replay = env.tokens.refresh(&r1).await;
    assert!(matches!(replay, Err(Error::Conflict(_))));

    // Family revocation: the replay kills r2 as well
    assert!(env.tokens.refresh(&r2).await.is_err());
    assert!(env
        .events
        .event_names()
        .contains(&events::REFRESH_FAMILY_REVOKED.to_string()));
}

// Exactly one of two concurrent refresh calls with the same token value
// may succeed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refresh_has_one_winner() {
    let env = env();
    let r1 = signed_in_refresh_token(&env).await;

    let tokens_a = env.tokens.clone();
    let tokens_b = env.tokens.clone();
    let token_a = r1.clone();
    let token_b = r1.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move { tokens_a.refresh(&token_a).await }),
        tokio::spawn(async move { tokens_b.refresh(&token_b).await }),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one rotation may win: {a:?} / {b:?}");
}

#[tokio::test]
async fn refresh_disabled_flag_rejects_everything() {
    let mut config = Config::default();
    config.refresh_enabled = false;
    let env = env_with(config);

    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 3,
            email: "nd@example.test",
            username: "nd-user",
            password: "correct-password",
            email_confirmed: true,
        },
    )
    .await;

    let outcome = env
        .signin
        .sign_in(Credentials {
            identifier: "nd@example.test".to_string(),
            password: "correct-password".to_string(),
            device_id: None,
            channel: SignInChannel::Standard,
        })
        .await
        .unwrap();
    let SignInOutcome::Success(package) = outcome else {
        panic!("expected a token package");
    };
    // No refresh token when the feature is off
    assert!(package.refresh_token.is_none());

    // And every refresh call fails with the dedicated error
    assert!(matches!(
        env.tokens.refresh("whatever").await,
        Err(Error::Disabled(_))
    ));
}

#[tokio::test]
async fn unknown_token_is_generic_unauthorized() {
    let env = env();
    let result = env.tokens.refresh("never-issued-token").await;
    match result {
        Err(Error::Unauthorized(msg)) => {
            assert_eq!(msg, gatehouse_common::error::INVALID_CREDENTIALS)
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

// A second sign-in on the same device invalidates the first chain.
#[tokio::test]
async fn device_re_sign_in_supersedes_previous_chain() {
    let env = env();
    let r1 = signed_in_refresh_token(&env).await;

    let outcome = env
        .signin
        .sign_in(Credentials {
            identifier: "rt@example.test".to_string(),
            password: "correct-password".to_string(),
            device_id: Some("device-1".to_string()),
            channel: SignInChannel::Standard,
        })
        .await
        .unwrap();
    let SignInOutcome::Success(package) = outcome else {
        panic!("expected a token package");
    };
    let r2 = package.refresh_token.unwrap();

    assert!(env.tokens.refresh(&r1).await.is_err());
    assert!(env.tokens.refresh(&r2).await.is_ok());
}
