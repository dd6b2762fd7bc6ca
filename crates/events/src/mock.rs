//! Mock Event Publisher Implementation
//!
//! Stores events in memory for test assertions.
//! Thread-safe via `Arc<Mutex<>>`.

use std::sync::{Arc, Mutex};

use crate::{DomainEvent, EventError, EventPublisher};

/// Mock publisher that records events for test assertions.
#[derive(Debug, Clone, Default)]
pub struct MockEventPublisher {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return all recorded events.
    pub fn recorded_events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .expect("events lock poisoned — prior test panicked")
            .clone()
    }

    /// Names of recorded events, in publication order.
    pub fn event_names(&self) -> Vec<String> {
        self.recorded_events().into_iter().map(|e| e.name).collect()
    }

    /// The most recent event with the given name.
    pub fn last_event_named(&self, name: &str) -> Option<DomainEvent> {
        self.recorded_events()
            .into_iter()
            .rev()
            .find(|e| e.name == name)
    }

    /// Clear all recorded events.
    pub fn reset(&self) {
        self.events
            .lock()
            .expect("events lock poisoned — prior test panicked")
            .clear();
    }
}

#[async_trait::async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), EventError> {
        tracing::debug!(event_name = %event.name, "Mock publisher: recording event");
        self.events
            .lock()
            .expect("events lock poisoned — prior test panicked")
            .push(event);
        Ok(())
    }
}
