//! Shared utilities, configuration, and error handling for Gatehouse
//!
//! This crate provides common functionality used across the Gatehouse application:
//! - Configuration management following 12-factor principles
//! - Error taxonomy shared by every service and pipeline stage
//! - Crypto utilities (opaque tokens, password hashing, digests)
//! - TTL key-value cache for short-lived capability tokens

pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod state;

pub use cache::TtlCache;
pub use config::Config;
pub use crypto::{
    constant_time_eq, digest_token, generate_opaque_token, hash_password, verify_password,
};
pub use error::{Error, Result};
pub use state::StateError;
