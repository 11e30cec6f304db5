use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::TokenError;

/// Claim names the codec owns; callers cannot override them through custom claims.
pub const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

/// Claim set carried inside a token.
///
/// Timestamps travel as epoch milliseconds so expiry is compared at
/// millisecond resolution. Any non-reserved payload field lands in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject / identity the token asserts.
    pub sub: String,

    /// Issued-at instant.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub iat: DateTime<Utc>,

    /// Expiry instant (exclusive upper bound of validity).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub exp: DateTime<Utc>,

    /// Custom claims (user id, display name, account, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Claims {
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Custom claim rendered as a string. Non-string JSON values are rendered
    /// in their JSON form; `null` counts as absent.
    pub fn claim(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// All custom claims as strings.
    pub fn string_claims(&self) -> BTreeMap<String, String> {
        self.extra
            .keys()
            .filter_map(|k| self.claim(k).map(|v| (k.clone(), v)))
            .collect()
    }

    /// Expiry is inclusive: a token expiring exactly at `now` is expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now
    }
}

/// Return the subject asserted by a claim set.
pub fn extract_subject(claims: &Claims) -> &str {
    claims.subject()
}

/// Deterministically validate the time window of a claim set.
///
/// Signature verification happens before this in the codec; this only decides
/// whether verified claims are still live.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.sub.is_empty() {
        return Err(TokenError::Malformed("token carries an empty subject".to_string()));
    }
    if claims.is_expired(now) {
        return Err(TokenError::Expired);
    }
    Ok(())
}
