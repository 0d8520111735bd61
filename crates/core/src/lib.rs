//! Shared primitives for all Rust crates in Nutrack.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across Nutrack crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
///
/// Authentication failures (`Unauthorized`) and authorization failures
/// (`Forbidden`) are deliberately separate variants: the transport layer may
/// collapse them, but audit logging needs the distinction.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller presented no credential or an invalid one (expired, malformed,
    /// bad signature).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller holds a valid credential but lacks the required claim.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Actor attempted an operation on their own account that would reduce
    /// their own access.
    #[error("self-modification denied: {0}")]
    SelfModificationDenied(String),

    /// Operation would leave the system without any active administrator.
    #[error("last-admin protection: {0}")]
    LastAdminProtection(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn unauthorized_and_forbidden_render_distinct_messages() {
        let unauthorized = AppError::Unauthorized("no credential".to_owned());
        let forbidden = AppError::Forbidden("missing permission".to_owned());
        assert!(unauthorized.to_string().starts_with("unauthorized"));
        assert!(forbidden.to_string().starts_with("forbidden"));
    }

    #[test]
    fn error_messages_name_the_protected_invariant() {
        let error = AppError::LastAdminProtection(
            "at least one other active administrator must remain".to_owned(),
        );
        assert!(error.to_string().contains("last-admin protection"));
    }
}
