//! Authorization policy engine.
//!
//! Pure decision logic: no IO and no transport types. The host hands in the
//! request path, the operation's declared requirement and whatever identity
//! authentication produced.

use std::fmt;

use gatekeeper_core::{ConfigError, SecurityConfig, SecurityError, SecurityResult};

use crate::identity::Identity;
use crate::pattern::PathMatcher;
use crate::registry::{OperationPolicy, PermissionRequirement};

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    NotAuthenticated,
    PermissionDenied(String),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => f.write_str("not authenticated"),
            Self::PermissionDenied(requirement) => write!(f, "permission denied: {requirement}"),
        }
    }
}

impl From<DenyReason> for SecurityError {
    fn from(value: DenyReason) -> Self {
        match value {
            DenyReason::NotAuthenticated => SecurityError::NotAuthenticated,
            DenyReason::PermissionDenied(requirement) => SecurityError::PermissionDenied(requirement),
        }
    }
}

/// Outcome of one authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> SecurityResult<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason.into()),
        }
    }
}

/// Evaluates declared requirements against an identity's authorities.
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    enabled: bool,
    case_sensitive: bool,
    exclusions: PathMatcher,
}

impl AuthorizationPolicy {
    /// Build from configuration. Malformed exclusion patterns are fatal.
    pub fn from_config(config: &SecurityConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: config.enabled,
            case_sensitive: config.case_sensitive,
            exclusions: PathMatcher::compile(&config.exclude_paths)?,
        })
    }

    pub fn new(enabled: bool, case_sensitive: bool, exclusions: PathMatcher) -> Self {
        Self {
            enabled,
            case_sensitive,
            exclusions,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclusions.matches(path)
    }

    /// Decide whether `identity` may reach an operation at `path` that
    /// declares `requirement`.
    ///
    /// Evaluation order: global switch, exclusion patterns, authentication,
    /// empty requirement, then authority equality.
    pub fn authorize(
        &self,
        path: &str,
        requirement: &PermissionRequirement,
        identity: Option<&Identity>,
    ) -> Decision {
        if !self.enabled {
            return Decision::Allow;
        }

        if let Some(pattern) = self.exclusions.find(path) {
            tracing::trace!(path, pattern = pattern.as_str(), "path excluded from authorization");
            return Decision::Allow;
        }

        let Some(identity) = identity else {
            tracing::debug!(path, "rejected unauthenticated request");
            return Decision::Deny(DenyReason::NotAuthenticated);
        };

        let Some(required) = requirement.required_authority() else {
            return Decision::Allow;
        };
        if required.is_empty() {
            return Decision::Allow;
        }

        if identity.authorities().grants(required, self.case_sensitive) {
            Decision::Allow
        } else {
            tracing::debug!(
                path,
                subject = identity.subject(),
                required,
                "missing required authority"
            );
            Decision::Deny(DenyReason::PermissionDenied(required.to_string()))
        }
    }

    /// Like [`authorize`](Self::authorize), honouring the operation's own
    /// enforcement switch.
    pub fn authorize_operation(
        &self,
        path: &str,
        operation: &OperationPolicy,
        identity: Option<&Identity>,
    ) -> Decision {
        if !operation.enabled {
            return Decision::Allow;
        }
        self.authorize(path, &operation.requirement, identity)
    }
}
