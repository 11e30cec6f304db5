use std::collections::BTreeMap;

use serde::Serialize;

use crate::authority::AuthoritySet;
use crate::claims::{Claims, extract_subject};

/// An authenticated identity: verified subject, resolved authorities and the
/// custom claims its token carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    subject: String,
    authorities: AuthoritySet,
    claims: BTreeMap<String, String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>, authorities: AuthoritySet) -> Self {
        Self {
            subject: subject.into(),
            authorities,
            claims: BTreeMap::new(),
        }
    }

    /// Build from verified token claims plus the looked-up authorities.
    pub fn from_claims(claims: &Claims, authorities: AuthoritySet) -> Self {
        Self {
            subject: extract_subject(claims).to_string(),
            authorities,
            claims: claims.string_claims(),
        }
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn authorities(&self) -> &AuthoritySet {
        &self.authorities
    }

    pub fn claims(&self) -> &BTreeMap<String, String> {
        &self.claims
    }

    pub fn claim(&self, key: &str) -> Option<&str> {
        self.claims.get(key).map(String::as_str)
    }
}
