//! Store collaborators for the identity domain
//!
//! Persistence mechanics live outside this system: the traits here are
//! the seams, and the in-memory implementations back tests and local
//! runs. Any real backend must honor the same contracts — in particular
//! the conditional-write semantics of refresh-token rotation.

pub mod refresh_tokens;
pub mod teams;
pub mod transactions;
pub mod users;

pub use refresh_tokens::{
    InMemoryRefreshTokenStore, RefreshTokenStore, RotationOutcome,
};
pub use teams::{InMemoryTeamStore, TeamStore};
pub use transactions::{InMemoryTransactionManager, Transaction, TransactionManager, TxStats};
pub use users::{InMemoryUserStore, UserStore};
