//! Shared harness for the integration tests
//!
//! Wires the full service graph over the in-memory stores and mock
//! collaborators, the way the hosting application would at startup.

// Each test target uses a different slice of the harness.
#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use gatehouse_auth::{AuthConfig, Principal, TeamType};
use gatehouse_common::{crypto, Config, TtlCache};
use gatehouse_events::mock::MockEventPublisher;
use gatehouse_identity::repository::{
    InMemoryRefreshTokenStore, InMemoryTeamStore, InMemoryTransactionManager, InMemoryUserStore,
};
pub use gatehouse_identity::repository::{TeamStore, UserStore};
use gatehouse_identity::service::account::AccountService;
use gatehouse_identity::service::members::MemberService;
use gatehouse_identity::{
    Pipeline, SignInService, Team, TokenService, TwoFactorProvider, TwoFactorService, User,
};
use gatehouse_otp::mock::MockOtpChannel;
use gatehouse_otp::ChannelRegistry;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestEnv {
    pub users: InMemoryUserStore,
    pub teams: InMemoryTeamStore,
    pub refresh: InMemoryRefreshTokenStore,
    pub tx: InMemoryTransactionManager,
    pub events: MockEventPublisher,
    pub sms: Arc<MockOtpChannel>,
    pub email_channel: Arc<MockOtpChannel>,
    pub pipeline: Pipeline,
    pub tokens: Arc<TokenService>,
    pub two_factor: Arc<TwoFactorService>,
    pub signin: Arc<SignInService>,
    pub members: MemberService,
    pub account: AccountService,
}

pub fn env() -> TestEnv {
    env_with(Config::default())
}

pub fn env_with(config: Config) -> TestEnv {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let users = InMemoryUserStore::new();
    let teams = InMemoryTeamStore::new();
    let refresh = InMemoryRefreshTokenStore::new();
    let tx = InMemoryTransactionManager::new();
    let events = MockEventPublisher::new();
    let sms = Arc::new(MockOtpChannel::new(TwoFactorProvider::Sms));
    let email_channel = Arc::new(MockOtpChannel::new(TwoFactorProvider::Email));
    let whatsapp = Arc::new(MockOtpChannel::new(TwoFactorProvider::WhatsApp));
    let confirmations = TtlCache::new();

    let registry = ChannelRegistry::new()
        .register(sms.clone())
        .register(email_channel.clone())
        .register(whatsapp);

    let pipeline = Pipeline::new(
        Arc::new(users.clone()),
        Arc::new(teams.clone()),
        Arc::new(tx.clone()),
    );

    let tokens = Arc::new(TokenService::new(
        config.clone(),
        AuthConfig::hmac(JWT_SECRET),
        Arc::new(refresh.clone()),
        Arc::new(users.clone()),
        Arc::new(teams.clone()),
        Arc::new(events.clone()),
    ));

    let two_factor = Arc::new(TwoFactorService::new(
        config.clone(),
        Arc::new(users.clone()),
        Arc::new(teams.clone()),
        tokens.clone(),
        Arc::new(events.clone()),
        registry,
        TtlCache::new(),
    ));

    let signin = Arc::new(SignInService::new(
        config,
        Arc::new(users.clone()),
        Arc::new(teams.clone()),
        tokens.clone(),
        two_factor.clone(),
        Arc::new(events.clone()),
        confirmations,
    ));

    let members = MemberService::new(
        pipeline.clone(),
        Arc::new(users.clone()),
        Arc::new(teams.clone()),
        Arc::new(refresh.clone()),
        Arc::new(events.clone()),
        signin.clone(),
    );

    let account = AccountService::new(
        pipeline.clone(),
        Arc::new(users.clone()),
        Arc::new(teams.clone()),
        Arc::new(refresh.clone()),
        Arc::new(events.clone()),
    );

    TestEnv {
        users,
        teams,
        refresh,
        tx,
        events,
        sms,
        email_channel,
        pipeline,
        tokens,
        two_factor,
        signin,
        members,
        account,
    }
}

pub async fn seed_team(env: &TestEnv, team_type: TeamType, min: i32, max: i32) -> Team {
    let name = match team_type {
        TeamType::Customer => format!("customer-{}", Uuid::new_v4()),
        TeamType::Maintenance => "maintenance".to_string(),
        TeamType::Super => "super".to_string(),
    };
    let team = Team::new(name, team_type, min, max).unwrap();
    env.teams.insert(team.clone()).await.unwrap();
    team
}

pub struct SeedMember<'a> {
    pub team: &'a mut Team,
    pub position: i32,
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub email_confirmed: bool,
}

pub async fn seed_member(env: &TestEnv, seed: SeedMember<'_>) -> User {
    let hash = crypto::hash_password(seed.password).unwrap();
    let mut user = User::new(
        seed.team.id,
        seed.position,
        seed.email,
        seed.username,
        Some(hash),
    )
    .unwrap();
    user.email_confirmed = seed.email_confirmed;

    env.users.insert(user.clone()).await.unwrap();
    seed.team.member_ids.insert(user.id);
    env.teams.update(seed.team).await.unwrap();
    user
}

/// Principal as the extractor would produce it from this user's claims.
pub fn principal_for(user: &User, team: &Team) -> Principal {
    Principal {
        user_id: Some(user.id),
        team_id: Some(team.id),
        team_position: user.position,
        email: Some(user.email.clone()),
        username: Some(user.username.clone()),
        is_authenticated: true,
        team_type: team.team_type,
        is_leader: team.leader_id == Some(user.id),
    }
}
