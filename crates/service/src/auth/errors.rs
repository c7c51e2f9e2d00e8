use thiserror::Error;

/// Reasons a session token is rejected. Never shown to callers verbatim.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("empty token")]
    EmptyToken,
    #[error("malformed token")]
    Malformed,
    #[error("signing algorithm mismatch")]
    AlgorithmMismatch,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Failures reported by the persistence port.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Business errors for account workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account not found")]
    NotFound,
    #[error("subject may not act on this account")]
    Forbidden,
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("store unavailable: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::DuplicateEmail => 1002,
            AuthError::NotFound => 1003,
            AuthError::InvalidCredentials => 1004,
            AuthError::Forbidden => 1005,
            AuthError::Token(_) => 1006,
            AuthError::Hash(_) => 1101,
            AuthError::Internal(_) => 1102,
            AuthError::Store(_) => 1200,
        }
    }

    /// Failures caused by this process or its dependencies rather than the caller.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Hash(_) | AuthError::Store(_) | AuthError::Internal(_))
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AuthError::NotFound,
            // The store's uniqueness constraint is the source of truth for duplicates.
            StoreError::UniqueViolation(_) => AuthError::DuplicateEmail,
            StoreError::Unavailable(msg) => AuthError::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_duplicate_email() {
        let e: AuthError = StoreError::UniqueViolation("ux_account_email".into()).into();
        assert!(matches!(e, AuthError::DuplicateEmail));
        assert_eq!(e.code(), 1002);
    }

    #[test]
    fn unavailable_is_internal() {
        let e: AuthError = StoreError::Unavailable("connection refused".into()).into();
        assert!(e.is_internal());
        assert!(!AuthError::InvalidCredentials.is_internal());
    }
}
