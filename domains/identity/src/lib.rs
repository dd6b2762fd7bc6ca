//! Gatehouse identity domain
//!
//! Users, teams, and the decision logic that gates everything else:
//! - Hierarchical permission engine (team type + position outranking)
//! - Request-context pipeline (principal → loads → validation → transaction)
//! - Sign-in state machine (credential → confirmation gate → 2FA → tokens)
//! - Token lifecycle (access tokens, rotating refresh tokens, pending
//!   two-factor tokens)

pub mod domain;
pub mod pipeline;
pub mod repository;
pub mod service;

pub use domain::entities::{
    JwtPackage, PendingTwoFactor, RefreshTokenRecord, Team, User,
};
pub use domain::permissions;
pub use domain::state::{SignInEvent, SignInState};
pub use gatehouse_auth::{Principal, TeamType};
pub use gatehouse_otp::TwoFactorProvider;
pub use pipeline::{AuthScope, Pipeline, Request, Rule};
pub use service::account::AccountService;
pub use service::introspect::{whoami, WhoamiView};
pub use service::members::MemberService;
pub use service::signin::{
    Credentials, ExternalClaims, OAuthVerifier, SignInChannel, SignInOutcome, SignInService,
};
pub use service::tokens::{ExtraClaims, TokenService};
pub use service::two_factor::{MfaChallenge, TwoFactorService};
