use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A permission string granted to an identity (e.g. `"order:read"`).
///
/// Authorities are opaque at this layer: no wildcard, hierarchy or prefix
/// semantics. Two authorities match only when their strings are equal, with
/// case folding decided by the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(Cow<'static, str>);

impl Authority {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a required permission string.
    pub fn matches(&self, required: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            self.as_str() == required
        } else {
            fold(self.as_str()).eq(fold(required))
        }
    }
}

fn fold(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

impl core::fmt::Display for Authority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Authority {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Authority {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Unordered set of authorities held by one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthoritySet(HashSet<Authority>);

impl AuthoritySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, authority: impl Into<Authority>) -> bool {
        self.0.insert(authority.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Authority> {
        self.0.iter()
    }

    /// True when at least one held authority equals `required`.
    pub fn grants(&self, required: &str, case_sensitive: bool) -> bool {
        self.0.iter().any(|a| a.matches(required, case_sensitive))
    }

    /// Authorities as sorted strings, for display and logging.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut out: Vec<String> = self.0.iter().map(|a| a.as_str().to_string()).collect();
        out.sort();
        out
    }
}

impl<A: Into<Authority>> FromIterator<A> for AuthoritySet {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
