//! TOTP (RFC 6238) generation and verification
//!
//! Backs the AuthenticatorApp provider: codes are computed locally from a
//! shared base32 secret, there is no delivery step. Verification accepts
//! a rolling window of adjacent time steps to absorb clock drift.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;

use crate::OtpError;

type HmacSha1 = Hmac<Sha1>;

const SECRET_BYTES: usize = 20;

/// TOTP parameters. Defaults match the common authenticator apps:
/// 30-second step, 6 digits, one step of drift either way.
#[derive(Debug, Clone, Copy)]
pub struct TotpGenerator {
    pub step_secs: u64,
    pub digits: u32,
    pub window: i64,
}

impl Default for TotpGenerator {
    fn default() -> Self {
        Self {
            step_secs: 30,
            digits: 6,
            window: 1,
        }
    }
}

impl TotpGenerator {
    /// Compute the code for the step containing `at`.
    pub fn generate(&self, secret_base32: &str, at: DateTime<Utc>) -> Result<String, OtpError> {
        let counter = (at.timestamp().max(0) as u64) / self.step_secs;
        self.generate_at_counter(secret_base32, counter)
    }

    /// Verify a candidate code against the rolling window around `at`.
    pub fn verify(&self, secret_base32: &str, code: &str, at: DateTime<Utc>) -> bool {
        let counter = (at.timestamp().max(0) as u64) / self.step_secs;
        for offset in -self.window..=self.window {
            let candidate_counter = counter as i64 + offset;
            if candidate_counter < 0 {
                continue;
            }
            match self.generate_at_counter(secret_base32, candidate_counter as u64) {
                Ok(expected) if constant_time_eq(&expected, code) => return true,
                _ => continue,
            }
        }
        false
    }

    fn generate_at_counter(&self, secret_base32: &str, counter: u64) -> Result<String, OtpError> {
        let key = base32::decode(
            base32::Alphabet::Rfc4648 { padding: false },
            &secret_base32.to_ascii_uppercase(),
        )
        .ok_or_else(|| OtpError::Configuration("invalid base32 TOTP secret".to_string()))?;

        let mut mac = HmacSha1::new_from_slice(&key)
            .map_err(|_| OtpError::Configuration("empty TOTP secret".to_string()))?;
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        // RFC 4226 dynamic truncation
        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = ((digest[offset] & 0x7f) as u32) << 24
            | (digest[offset + 1] as u32) << 16
            | (digest[offset + 2] as u32) << 8
            | (digest[offset + 3] as u32);

        let code = binary % 10u32.pow(self.digits);
        Ok(format!("{code:0width$}", width = self.digits as usize))
    }
}

/// Mint a fresh base32 TOTP secret for enrollment.
pub fn generate_secret() -> String {
    let mut buf = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut buf);
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &buf)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
