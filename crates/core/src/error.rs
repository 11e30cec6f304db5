//! Security error model.

use thiserror::Error;

/// Result type used across the authentication/authorization pipeline.
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Per-request pipeline failure.
///
/// Every variant maps to exactly one HTTP-equivalent status and one stable
/// machine-readable code, so transports never have to inspect messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// The token's expiry is at or before the current instant.
    #[error("token has expired")]
    ExpiredToken,

    /// The token could not be parsed as a well-formed signed token.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token parsed, but its signature did not verify.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token subject is unknown to the identity lookup.
    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    /// A protected operation was reached without an authenticated identity.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The identity lacks the authority the operation requires.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Anything else that went wrong inside the pipeline.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SecurityError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedToken(msg.into())
    }

    pub fn subject_not_found(subject: impl Into<String>) -> Self {
        Self::SubjectNotFound(subject.into())
    }

    pub fn permission_denied(requirement: impl Into<String>) -> Self {
        Self::PermissionDenied(requirement.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP-equivalent status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            Self::ExpiredToken
            | Self::MalformedToken(_)
            | Self::InvalidSignature
            | Self::SubjectNotFound(_)
            | Self::NotAuthenticated => 401,
            Self::PermissionDenied(_) => 403,
            Self::Internal(_) => 500,
        }
    }

    /// Stable error code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExpiredToken => "token_expired",
            Self::MalformedToken(_) => "token_malformed",
            Self::InvalidSignature => "token_invalid_signature",
            Self::SubjectNotFound(_) => "subject_not_found",
            Self::NotAuthenticated => "not_authenticated",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message that is safe to return to the caller.
    ///
    /// Internal failures are collapsed to a generic text; their detail is only
    /// ever logged.
    pub fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal error".to_string(),
            Self::SubjectNotFound(_) => "authentication failed".to_string(),
            other => other.to_string(),
        }
    }
}

/// Fatal startup error. A service must not start when one of these is raised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("signing secret must be at least {min} bytes (got {actual})")]
    WeakSecret { min: usize, actual: usize },

    #[error("invalid exclusion pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("operation '{0}' is registered more than once")]
    DuplicateOperation(String),

    #[error("operation '{0}' is not registered")]
    UnknownOperation(String),
}

impl ConfigError {
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}
