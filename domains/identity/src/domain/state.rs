//! Sign-in state machine
//!
//! Formal model of the sign-in flow. The service drives these transitions
//! in order; the machine makes the ordering a checked invariant rather
//! than a convention — in particular that the email-confirmation gate
//! runs before the password check, so an unconfirmed account can never
//! learn whether its password was correct.

use gatehouse_common::StateError;
use serde::{Deserialize, Serialize};

/// Sign-in states. Terminal states end the call; continuation happens
/// through re-invocation (password) or the resend/verify operations (2FA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInState {
    CredentialCheck,
    EmailConfirmationGate,
    PasswordCheck,
    TwoFactorBranch,
    /// Terminal: a pending two-factor token was issued
    TwoFactorChallenge,
    /// Terminal: a token package was issued
    TokenIssuance,
    /// Terminal: the account must confirm its email first
    ConfirmationRequired,
    /// Terminal: generic credential rejection
    Rejected,
}

/// Events that drive sign-in transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInEvent {
    IdentifierMatched,
    IdentifierUnknown,
    EmailUnconfirmed,
    EmailConfirmed,
    PasswordValid,
    PasswordInvalid,
    TwoFactorNeeded,
    TwoFactorSkipped,
}

impl SignInState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TwoFactorChallenge
                | Self::TokenIssuance
                | Self::ConfirmationRequired
                | Self::Rejected
        )
    }

    /// Apply an event, returning the next state or a transition error.
    pub fn apply(self, event: SignInEvent) -> Result<SignInState, StateError> {
        if self.is_terminal() {
            return Err(StateError::TerminalState(format!("{self:?}")));
        }

        let next = match (self, event) {
            (Self::CredentialCheck, SignInEvent::IdentifierMatched) => Self::EmailConfirmationGate,
            (Self::CredentialCheck, SignInEvent::IdentifierUnknown) => Self::Rejected,
            (Self::EmailConfirmationGate, SignInEvent::EmailUnconfirmed) => {
                Self::ConfirmationRequired
            }
            (Self::EmailConfirmationGate, SignInEvent::EmailConfirmed) => Self::PasswordCheck,
            (Self::PasswordCheck, SignInEvent::PasswordValid) => Self::TwoFactorBranch,
            (Self::PasswordCheck, SignInEvent::PasswordInvalid) => Self::Rejected,
            (Self::TwoFactorBranch, SignInEvent::TwoFactorNeeded) => Self::TwoFactorChallenge,
            (Self::TwoFactorBranch, SignInEvent::TwoFactorSkipped) => Self::TokenIssuance,
            (from, event) => {
                return Err(StateError::InvalidTransition {
                    from: format!("{from:?}"),
                    to: "?".to_string(),
                    event: format!("{event:?}"),
                })
            }
        };

        Ok(next)
    }
}
