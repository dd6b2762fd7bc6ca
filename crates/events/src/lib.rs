//! Gatehouse Event Publication
//!
//! Provides domain event publication with support for:
//! - A transport-agnostic `EventPublisher` trait (the bus itself is an
//!   external collaborator)
//! - A typed event envelope with JSON payloads
//! - Mock publisher for testing and development

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod mock;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Event serialization error: {0}")]
    Serialization(String),

    #[error("Event transport error: {0}")]
    Transport(String),
}

/// A domain event to publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            occurred_at: Utc::now(),
            payload,
        }
    }
}

/// Event publication trait for different transports.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: DomainEvent) -> Result<(), EventError>;
}
