//! User domain types and validation rules.
//!
//! Follows OWASP Authentication and Password Storage cheat sheets for the
//! password strength and email validation rules.

use chrono::{DateTime, Utc};
use nutrack_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated email address, lowercased so uniqueness is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one
    /// `@`, local part and domain are non-empty, domain contains at least
    /// one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// A user account as the identity anchor for role assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    /// Unique user identifier.
    pub id: UserId,
    /// Canonical (lowercased) email address.
    pub email: EmailAddress,
    /// Whether the account may authenticate and be authorized.
    pub is_active: bool,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Most recent successful login, if any.
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Minimum password length (NIST SP800-63B).
pub const PASSWORD_MIN_LENGTH: usize = 10;

/// Maximum password length to allow passphrases while protecting the hasher.
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password against OWASP and NIST rules.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    if is_common_password(password) {
        return Err(AppError::Validation(
            "this password is too common and has appeared in data breaches".to_owned(),
        ));
    }

    Ok(())
}

/// Checks whether a password appears in the embedded common passwords list.
fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|entry| *entry == lowered)
}

/// Top breached passwords (subset for fast embedded check).
static COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "12345678",
    "1234567890",
    "qwerty",
    "abc123",
    "iloveyou",
    "trustno1",
    "sunshine",
    "princess",
    "football",
    "superman",
    "qwerty123",
    "password1",
    "password123",
    "welcome",
    "letmein",
    "starwars",
    "passw0rd",
    "qwertyuiop",
    "whatever",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_is_accepted_and_lowercased() {
        let email = EmailAddress::new("USER@Example.COM");
        assert!(email.is_ok_and(|value| value.as_str() == "user@example.com"));
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("noatsign").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("user@nodot").is_err());
    }

    #[test]
    fn empty_email_is_rejected() {
        assert!(EmailAddress::new("").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn adequate_password_is_accepted() {
        assert!(validate_password("a-reasonable-passphrase").is_ok());
    }

    #[test]
    fn common_password_is_rejected() {
        assert!(validate_password("password123").is_err());
    }

    #[test]
    fn very_long_password_is_rejected() {
        let long = "a".repeat(PASSWORD_MAX_LENGTH + 1);
        assert!(validate_password(&long).is_err());
    }
}
