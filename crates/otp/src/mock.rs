//! Mock OTP Channel Implementation
//!
//! Captures delivered codes in memory for testing without external
//! dependencies, and validates against the most recent code delivered to
//! an identity, honoring a fixed TTL the way a vendor verify API would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::{OtpChannel, OtpError, TwoFactorProvider};

/// A code captured by the mock channel
#[derive(Debug, Clone)]
pub struct SentCode {
    pub destination: String,
    pub code: String,
    pub sent_at: DateTime<Utc>,
}

/// Mock OTP channel for testing
#[derive(Clone)]
pub struct MockOtpChannel {
    provider: TwoFactorProvider,
    code_ttl: Duration,
    sent: Arc<Mutex<Vec<SentCode>>>,
    latest_by_destination: Arc<Mutex<HashMap<String, SentCode>>>,
    fail_delivery: Arc<Mutex<bool>>,
}

impl MockOtpChannel {
    pub fn new(provider: TwoFactorProvider) -> Self {
        Self {
            provider,
            code_ttl: Duration::seconds(300),
            sent: Arc::new(Mutex::new(Vec::new())),
            latest_by_destination: Arc::new(Mutex::new(HashMap::new())),
            fail_delivery: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    /// Make subsequent sends fail (for delivery-error tests).
    pub fn set_fail_delivery(&self, fail: bool) {
        *self.fail_delivery.lock().unwrap() = fail;
    }

    /// All codes captured so far.
    pub fn sent_codes(&self) -> Vec<SentCode> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recent code delivered to a destination.
    pub fn last_code_for(&self, destination: &str) -> Option<String> {
        self.latest_by_destination
            .lock()
            .unwrap()
            .get(destination)
            .map(|s| s.code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.latest_by_destination.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl OtpChannel for MockOtpChannel {
    fn provider(&self) -> TwoFactorProvider {
        self.provider
    }

    async fn send(&self, destination: &str, code: &str) -> Result<(), OtpError> {
        if *self.fail_delivery.lock().unwrap() {
            return Err(OtpError::Delivery(format!(
                "mock {} channel configured to fail",
                self.provider
            )));
        }

        tracing::debug!(provider = %self.provider, destination, "Mock channel capturing code");

        let record = SentCode {
            destination: destination.to_string(),
            code: code.to_string(),
            sent_at: Utc::now(),
        };

        self.sent.lock().unwrap().push(record.clone());
        self.latest_by_destination
            .lock()
            .unwrap()
            .insert(destination.to_string(), record);

        Ok(())
    }

    async fn validate(&self, identity: &str, code: &str) -> Result<bool, OtpError> {
        let latest = self.latest_by_destination.lock().unwrap();
        match latest.get(identity) {
            Some(sent) => {
                let live = Utc::now() - sent.sent_at < self.code_ttl;
                Ok(live && sent.code == code)
            }
            None => Ok(false),
        }
    }
}
