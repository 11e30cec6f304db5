//! Identity lookup collaborator.
//!
//! The pipeline never owns a user store. It asks an [`IdentityLookup`] for the
//! authorities of a verified subject and treats a slow answer as a failure.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use gatekeeper_core::{ConfigError, SecurityError};

use crate::authority::AuthoritySet;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("subject not found: {0}")]
    NotFound(String),

    #[error("identity lookup timed out after {0:?}")]
    TimedOut(Duration),

    #[error("identity lookup unavailable: {0}")]
    Unavailable(String),
}

impl From<LookupError> for SecurityError {
    fn from(value: LookupError) -> Self {
        match value {
            LookupError::NotFound(subject) => SecurityError::SubjectNotFound(subject),
            other => SecurityError::Internal(other.to_string()),
        }
    }
}

/// Resolves a subject to its granted authorities.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn lookup(&self, subject: &str) -> Result<AuthoritySet, LookupError>;
}

/// Run a lookup under a deadline. Elapsed time fails closed.
pub async fn lookup_with_timeout(
    lookup: &dyn IdentityLookup,
    subject: &str,
    timeout: Duration,
) -> Result<AuthoritySet, LookupError> {
    match tokio::time::timeout(timeout, lookup.lookup(subject)).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::TimedOut(timeout)),
    }
}

/// In-memory subject → authorities table, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityLookup {
    identities: HashMap<String, AuthoritySet>,
}

impl StaticIdentityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject<I, A>(mut self, subject: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<crate::Authority>,
    {
        self.identities
            .insert(subject.into(), authorities.into_iter().collect());
        self
    }

    /// Parse `{"alice": ["order:read", ...], ...}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let identities: HashMap<String, AuthoritySet> = serde_json::from_str(json)
            .map_err(|e| ConfigError::invalid_value("identities", e.to_string()))?;
        Ok(Self { identities })
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[async_trait]
impl IdentityLookup for StaticIdentityLookup {
    async fn lookup(&self, subject: &str) -> Result<AuthoritySet, LookupError> {
        self.identities
            .get(subject)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(subject.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StalledLookup;

    #[async_trait]
    impl IdentityLookup for StalledLookup {
        async fn lookup(&self, _subject: &str) -> Result<AuthoritySet, LookupError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(AuthoritySet::new())
        }
    }

    #[tokio::test]
    async fn known_subject_resolves_authorities() {
        let lookup = StaticIdentityLookup::new().with_subject("alice", ["order:read"]);
        let set = lookup.lookup("alice").await.unwrap();
        assert!(set.grants("order:read", true));
    }

    #[tokio::test]
    async fn unknown_subject_is_not_found() {
        let lookup = StaticIdentityLookup::new();
        let err = lookup.lookup("ghost").await.unwrap_err();
        assert_eq!(err, LookupError::NotFound("ghost".to_string()));
        assert_eq!(SecurityError::from(err).status(), 401);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_lookup_fails_closed() {
        let err = lookup_with_timeout(&StalledLookup, "alice", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::TimedOut(_)));
        assert_eq!(SecurityError::from(err).status(), 500);
    }

    #[test]
    fn loads_from_json() {
        let lookup =
            StaticIdentityLookup::from_json(r#"{"alice":["order:read","order:write"],"bob":[]}"#)
                .unwrap();
        assert_eq!(lookup.len(), 2);
        assert!(StaticIdentityLookup::from_json("[1,2]").is_err());
    }
}
