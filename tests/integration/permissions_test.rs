//! Hierarchy enforcement through the member-management commands.

mod common;

use common::*;
use gatehouse_auth::TeamType;
use gatehouse_common::Error;
use gatehouse_identity::domain::events;
use gatehouse_identity::service::members::{
    AddMemberRequest, ChangeLeaderRequest, ChangePositionRequest, ChangeTeamRangeRequest,
    DeleteMemberRequest, GetMemberRequest, RegisterRequest,
};
use serde_json::json;

fn add_request(team_id: uuid::Uuid, position: i32, tag: &str) -> AddMemberRequest {
    AddMemberRequest {
        team_id,
        email: format!("{tag}@example.test"),
        username: format!("u-{tag}"),
        position,
        password: None,
        phone_number: None,
    }
}

// Scenario D: a maintenance member at position 5 may not add a peer at 5
// but may add at 4.
#[tokio::test]
async fn add_member_requires_strict_outranking() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Maintenance, 1, 10).await;
    let actor = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 5,
            email: "actor@example.test",
            username: "actor",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let principal = principal_for(&actor, &team);

    let denied = env
        .members
        .add_member(principal.clone(), add_request(team.id, 5, "peer"))
        .await;
    assert!(matches!(denied, Err(Error::Forbidden)));

    let added = env
        .members
        .add_member(principal, add_request(team.id, 4, "junior"))
        .await
        .unwrap();
    let junior = env.users.get(added).await.unwrap().unwrap();
    assert_eq!(junior.position, 4);
    assert!(!junior.email_confirmed);
    assert!(env
        .events
        .event_names()
        .contains(&events::MEMBER_ADDED.to_string()));
}

// Two denial causes, one payload: the serialized error body must be
// byte-identical.
#[tokio::test]
async fn forbidden_payloads_do_not_vary_by_cause() {
    let env = env();
    let mut mntc = seed_team(&env, TeamType::Maintenance, 1, 10).await;
    let actor = seed_member(
        &env,
        SeedMember {
            team: &mut mntc,
            position: 5,
            email: "m@example.test",
            username: "m-actor",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;

    // Cause 1: rank violation by a maintenance actor
    let rank_denial = env
        .members
        .add_member(
            principal_for(&actor, &mntc),
            add_request(mntc.id, 7, "rank"),
        )
        .await
        .unwrap_err();

    // Cause 2: team-type floor violation by a customer outsider
    let mut customer = seed_team(&env, TeamType::Customer, 1, 10).await;
    let outsider = seed_member(
        &env,
        SeedMember {
            team: &mut customer,
            position: 9,
            email: "c@example.test",
            username: "c-actor",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let type_denial = env
        .members
        .add_member(
            principal_for(&outsider, &customer),
            add_request(mntc.id, 1, "type"),
        )
        .await
        .unwrap_err();

    let body = |e: &Error| {
        json!({
            "error": { "code": e.error_code(), "message": e.to_string() }
        })
        .to_string()
    };
    assert_eq!(body(&rank_denial), body(&type_denial));
}

#[tokio::test]
async fn delete_rules() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let leader = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 9,
            email: "lead@example.test",
            username: "lead",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let junior = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 2,
            email: "jr@example.test",
            username: "junior",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    team.leader_id = Some(leader.id);
    env.teams.update(&team).await.unwrap();
    let team = env.teams.get(team.id).await.unwrap().unwrap();

    // The leader cannot be removed while still leader, even by super
    let super_team = seed_team(&env, TeamType::Super, 1, 5).await;
    let mut super_team_mut = super_team.clone();
    let admin = seed_member(
        &env,
        SeedMember {
            team: &mut super_team_mut,
            position: 3,
            email: "root@example.test",
            username: "root",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let result = env
        .members
        .delete_member(
            principal_for(&admin, &super_team),
            DeleteMemberRequest { user_id: leader.id },
        )
        .await;
    assert!(matches!(result, Err(Error::Conflict(_))));

    // A junior cannot delete upward — and the denial is uniform
    let result = env
        .members
        .delete_member(
            principal_for(&junior, &team),
            DeleteMemberRequest { user_id: leader.id },
        )
        .await;
    assert!(matches!(result, Err(Error::Forbidden)));

    // The leader removes the junior
    env.members
        .delete_member(
            principal_for(&leader, &team),
            DeleteMemberRequest { user_id: junior.id },
        )
        .await
        .unwrap();
    assert!(env.users.get(junior.id).await.unwrap().is_none());
    assert!(env
        .events
        .event_names()
        .contains(&events::MEMBER_REMOVED.to_string()));
}

#[tokio::test]
async fn leadership_transfer() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let leader = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 8,
            email: "l@example.test",
            username: "leader",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let successor = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 6,
            email: "s@example.test",
            username: "successor",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    team.leader_id = Some(leader.id);
    env.teams.update(&team).await.unwrap();
    let team = env.teams.get(team.id).await.unwrap().unwrap();

    // A non-member candidate is a structural failure
    let result = env
        .members
        .change_leader(
            principal_for(&leader, &team),
            ChangeLeaderRequest {
                team_id: team.id,
                new_leader_id: uuid::Uuid::new_v4(),
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // A non-leader member may not transfer leadership
    let result = env
        .members
        .change_leader(
            principal_for(&successor, &team),
            ChangeLeaderRequest {
                team_id: team.id,
                new_leader_id: successor.id,
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Forbidden)));

    // The leader hands over
    env.members
        .change_leader(
            principal_for(&leader, &team),
            ChangeLeaderRequest {
                team_id: team.id,
                new_leader_id: successor.id,
            },
        )
        .await
        .unwrap();
    let team = env.teams.get(team.id).await.unwrap().unwrap();
    assert_eq!(team.leader_id, Some(successor.id));
    assert!(env
        .events
        .event_names()
        .contains(&events::LEADERSHIP_CHANGED.to_string()));
}

#[tokio::test]
async fn position_changes_stay_inside_range_and_rank() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let actor = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 7,
            email: "a@example.test",
            username: "actor-p",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let target = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 3,
            email: "t@example.test",
            username: "target-p",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let principal = principal_for(&actor, &team);

    // To the actor's own rank: denied
    let result = env
        .members
        .change_position(
            principal.clone(),
            ChangePositionRequest {
                user_id: target.id,
                new_position: 7,
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Forbidden)));

    // Outside the team range: structural
    let result = env
        .members
        .change_position(
            principal.clone(),
            ChangePositionRequest {
                user_id: target.id,
                new_position: 11,
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    env.members
        .change_position(
            principal,
            ChangePositionRequest {
                user_id: target.id,
                new_position: 5,
            },
        )
        .await
        .unwrap();
    assert_eq!(env.users.get(target.id).await.unwrap().unwrap().position, 5);
}

#[tokio::test]
async fn range_changes_must_cover_existing_members() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let leader = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 9,
            email: "rl@example.test",
            username: "range-lead",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let low = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 1,
            email: "low@example.test",
            username: "low-member",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    team.leader_id = Some(leader.id);
    env.teams.update(&team).await.unwrap();
    let team = env.teams.get(team.id).await.unwrap().unwrap();

    // The member at position 1 would fall out of 2..=10
    let result = env
        .members
        .change_team_range(
            principal_for(&leader, &team),
            ChangeTeamRangeRequest {
                team_id: team.id,
                new_min: 2,
                new_max: 10,
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // A non-leader member may not change the range
    let result = env
        .members
        .change_team_range(
            principal_for(&low, &team),
            ChangeTeamRangeRequest {
                team_id: team.id,
                new_min: 1,
                new_max: 12,
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Forbidden)));

    env.members
        .change_team_range(
            principal_for(&leader, &team),
            ChangeTeamRangeRequest {
                team_id: team.id,
                new_min: 1,
                new_max: 12,
            },
        )
        .await
        .unwrap();
    assert_eq!(env.teams.get(team.id).await.unwrap().unwrap().max_position, 12);
}

#[tokio::test]
async fn view_member_same_or_lower() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let actor = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 5,
            email: "v@example.test",
            username: "viewer",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let peer = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 5,
            email: "p@example.test",
            username: "peer-v",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let senior = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 8,
            email: "sr@example.test",
            username: "senior-v",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let principal = principal_for(&actor, &team);

    assert!(env
        .members
        .get_member(principal.clone(), GetMemberRequest { user_id: peer.id })
        .await
        .is_ok());
    assert!(matches!(
        env.members
            .get_member(principal, GetMemberRequest { user_id: senior.id })
            .await,
        Err(Error::Forbidden)
    ));
}

#[tokio::test]
async fn registration_creates_team_and_leader() {
    let env = env();
    let user_id = env
        .members
        .register(RegisterRequest {
            team_name: "Fresh Team".to_string(),
            email: "founder@example.test".to_string(),
            username: "founder".to_string(),
            password: "long-enough-password".to_string(),
            password_confirmation: "long-enough-password".to_string(),
            phone_number: None,
        })
        .await
        .unwrap();

    let user = env.users.get(user_id).await.unwrap().unwrap();
    assert!(!user.email_confirmed);

    let team = env.teams.get(user.team_id).await.unwrap().unwrap();
    assert_eq!(team.team_type, TeamType::Customer);
    assert_eq!(team.leader_id, Some(user.id));
    assert_eq!(user.position, team.max_position);

    // A confirmation request was published
    assert!(env
        .events
        .last_event_named(events::EMAIL_CONFIRMATION_REQUESTED)
        .is_some());

    // Mismatched confirmation is a specific structural failure
    let result = env
        .members
        .register(RegisterRequest {
            team_name: "Another".to_string(),
            email: "x@example.test".to_string(),
            username: "x-user".to_string(),
            password: "long-enough-password".to_string(),
            password_confirmation: "different-password".to_string(),
            phone_number: None,
        })
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn close_account_rules() {
    let env = env();
    let mut team = seed_team(&env, TeamType::Customer, 1, 10).await;
    let leader = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 9,
            email: "cl@example.test",
            username: "close-lead",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    let member = seed_member(
        &env,
        SeedMember {
            team: &mut team,
            position: 2,
            email: "cm@example.test",
            username: "close-member",
            password: "pw-password",
            email_confirmed: true,
        },
    )
    .await;
    team.leader_id = Some(leader.id);
    env.teams.update(&team).await.unwrap();
    let team = env.teams.get(team.id).await.unwrap().unwrap();

    // A leader with members must transfer leadership first
    let result = env.account.close_account(principal_for(&leader, &team)).await;
    assert!(matches!(result, Err(Error::Conflict(_))));

    // A plain member closes freely
    env.account
        .close_account(principal_for(&member, &team))
        .await
        .unwrap();
    assert!(env.users.get(member.id).await.unwrap().is_none());

    // Hand leadership off is unnecessary once alone: the last member
    // takes the customer team with them
    let team = env.teams.get(team.id).await.unwrap().unwrap();
    env.account
        .close_account(principal_for(&leader, &team))
        .await
        .unwrap();
    assert!(env.teams.get(team.id).await.unwrap().is_none());
    assert!(env
        .events
        .event_names()
        .contains(&events::ACCOUNT_CLOSED.to_string()));
}
