//! Protected-operation registry.
//!
//! Each protected handler is registered once at startup with its declared
//! [`PermissionRequirement`]. The table is read-only afterwards and can be
//! serialised for inspection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use gatekeeper_core::ConfigError;

/// The authority a protected operation demands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum PermissionRequirement {
    /// Any authenticated identity may proceed.
    #[default]
    Authenticated,
    /// The identity must hold this exact authority.
    Authority(String),
}

impl PermissionRequirement {
    pub fn authority(name: impl Into<String>) -> Self {
        Self::Authority(name.into())
    }

    /// Parse a declared requirement.
    ///
    /// Accepted forms: `""`, `permit()` and `isAuthenticated()` (authenticated
    /// only), `hasAuthority('x')` / `hasAuthority("x")`, or a bare authority
    /// string such as `order:read`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "permit()" || raw == "isAuthenticated()" {
            return Ok(Self::Authenticated);
        }

        if let Some(inner) = raw
            .strip_prefix("hasAuthority(")
            .and_then(|s| s.strip_suffix(')'))
        {
            let name = unquote(inner.trim())
                .ok_or_else(|| invalid(raw, "authority must be a quoted string"))?;
            if name.trim().is_empty() {
                return Err(invalid(raw, "authority is empty"));
            }
            return Ok(Self::Authority(name.to_string()));
        }

        if raw.contains(['(', ')', '\'', '"']) || raw.contains(char::is_whitespace) {
            return Err(invalid(raw, "unsupported requirement expression"));
        }
        Ok(Self::Authority(raw.to_string()))
    }

    /// The required authority string, `None` when authentication suffices.
    pub fn required_authority(&self) -> Option<&str> {
        match self {
            Self::Authenticated => None,
            Self::Authority(name) => Some(name),
        }
    }
}

impl fmt::Display for PermissionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated => f.write_str("permit()"),
            Self::Authority(name) => f.write_str(name),
        }
    }
}

impl Serialize for PermissionRequirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn unquote(s: &str) -> Option<&str> {
    s.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

fn invalid(raw: &str, reason: &str) -> ConfigError {
    ConfigError::invalid_value(format!("requirement '{raw}'"), reason)
}

/// Policy descriptor for one protected operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationPolicy {
    pub operation: String,
    pub requirement: PermissionRequirement,
    /// Per-operation enforcement switch.
    pub enabled: bool,
    /// Optional activity description template, see [`crate::template`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperationPolicy {
    /// Operation that only needs an authenticated caller.
    pub fn authenticated(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            requirement: PermissionRequirement::Authenticated,
            enabled: true,
            description: None,
        }
    }

    /// Operation guarded by a declared requirement expression.
    pub fn requiring(operation: impl Into<String>, requirement: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            operation: operation.into(),
            requirement: PermissionRequirement::parse(requirement)?,
            enabled: true,
            description: None,
        })
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_description(mut self, template: impl Into<String>) -> Self {
        self.description = Some(template.into());
        self
    }
}

/// Table of every protected operation, keyed by operation name.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct OperationRegistry {
    operations: BTreeMap<String, OperationPolicy>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, policy: OperationPolicy) -> Result<(), ConfigError> {
        if self.operations.contains_key(&policy.operation) {
            return Err(ConfigError::DuplicateOperation(policy.operation));
        }
        tracing::debug!(
            operation = %policy.operation,
            requirement = %policy.requirement,
            enabled = policy.enabled,
            "registered protected operation"
        );
        self.operations.insert(policy.operation.clone(), policy);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, policy: OperationPolicy) -> Result<Self, ConfigError> {
        self.register(policy)?;
        Ok(self)
    }

    /// Fail-fast lookup.
    pub fn get(&self, operation: &str) -> Result<&OperationPolicy, ConfigError> {
        self.operations
            .get(operation)
            .ok_or_else(|| ConfigError::UnknownOperation(operation.to_string()))
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationPolicy> {
        self.operations.values()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
