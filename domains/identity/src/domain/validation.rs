//! Validation helpers and constants for identity operations

use gatehouse_common::{Error, Result};
use regex::Regex;

lazy_static::lazy_static! {
    /// Username validation regex
    /// Allows lowercase alphanumeric characters with hyphens and underscores
    /// No leading/trailing separators, minimum 3 characters
    pub static ref USERNAME_REGEX: Regex =
        Regex::new(r"^[a-z0-9]([a-z0-9_-]*[a-z0-9])?$").unwrap();

    /// E.164 phone number shape
    pub static ref PHONE_REGEX: Regex =
        Regex::new(r"^\+[1-9][0-9]{7,14}$").unwrap();
}

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;

/// Validate a username according to the rules
pub fn validate_username(username: &str) -> Result<()> {
    if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
        return Err(Error::Validation(format!(
            "Username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(Error::Validation(
            "Username may contain lowercase letters, digits, '-' and '_', \
             and must start and end with a letter or digit"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate a password and its confirmation together. Structural
/// failures carry specific messages; they are not authentication denials.
pub fn validate_password_pair(password: &str, confirmation: &str) -> Result<()> {
    if password.len() < PASSWORD_MIN {
        return Err(Error::Validation(format!(
            "Password must be at least {PASSWORD_MIN} characters"
        )));
    }
    if password != confirmation {
        return Err(Error::Validation(
            "Password confirmation does not match".to_string(),
        ));
    }
    Ok(())
}

/// Validate an E.164 phone number
pub fn validate_phone_number(phone: &str) -> Result<()> {
    if !PHONE_REGEX.is_match(phone) {
        return Err(Error::Validation(
            "Phone number must be in E.164 format, e.g. +15550100123".to_string(),
        ));
    }
    Ok(())
}
