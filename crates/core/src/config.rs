//! Security configuration.
//!
//! Loaded once at startup and immutable afterwards. Everything downstream
//! (token codec, policy engine, middleware) borrows from a validated instance.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Minimum signing-secret length in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Longest accepted token lifetime (100 years). Keeps `now + ttl` well inside
/// the representable timestamp range.
pub const MAX_EXPIRATION_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

pub const DEFAULT_HEADER_NAME: &str = "Authorization";
pub const DEFAULT_HEADER_PREFIX: &str = "Bearer ";

fn default_enabled() -> bool {
    true
}

fn default_expiration_ms() -> u64 {
    24 * 60 * 60 * 1000
}

fn default_lookup_timeout_ms() -> u64 {
    2_000
}

/// Header contract used to carry the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenHeader {
    pub name: String,
    pub prefix: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            name: DEFAULT_HEADER_NAME.to_string(),
            prefix: DEFAULT_HEADER_PREFIX.to_string(),
        }
    }
}

impl TokenHeader {
    /// Extract the token from a raw header value.
    ///
    /// Returns `None` when the value does not start with the prefix or carries
    /// nothing after it; both cases mean "no token" rather than a bad token.
    pub fn extract<'a>(&self, value: &'a str) -> Option<&'a str> {
        if value.len() <= self.prefix.len() {
            return None;
        }
        value.strip_prefix(self.prefix.as_str())
    }
}

/// Process-wide security settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Global enforcement switch. When off, every operation is allowed.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Whether authority matching distinguishes case.
    #[serde(default)]
    pub case_sensitive: bool,

    /// Ant-style path patterns exempt from authorization.
    #[serde(default)]
    pub exclude_paths: Vec<String>,

    /// HMAC signing secret.
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    /// Lifetime of issued tokens, in milliseconds.
    #[serde(default = "default_expiration_ms")]
    pub jwt_expiration_ms: u64,

    #[serde(default)]
    pub header: TokenHeader,

    /// Upper bound on a single identity lookup, in milliseconds.
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

impl core::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("enabled", &self.enabled)
            .field("case_sensitive", &self.case_sensitive)
            .field("exclude_paths", &self.exclude_paths)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration_ms", &self.jwt_expiration_ms)
            .field("header", &self.header)
            .field("lookup_timeout_ms", &self.lookup_timeout_ms)
            .finish()
    }
}

impl SecurityConfig {
    /// Configuration with defaults for everything except the secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            enabled: default_enabled(),
            case_sensitive: false,
            exclude_paths: Vec::new(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration_ms: default_expiration_ms(),
            header: TokenHeader::default(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_exclude_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_expiration(mut self, ttl: Duration) -> Self {
        self.jwt_expiration_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.header = TokenHeader {
            name: name.into(),
            prefix: prefix.into(),
        };
        self
    }

    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.jwt_expiration_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Startup validation. Exclusion patterns are validated when compiled by
    /// the policy engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret {
                min: MIN_SECRET_BYTES,
                actual: self.jwt_secret.len(),
            });
        }
        if self.jwt_expiration_ms == 0 {
            return Err(ConfigError::invalid_value(
                "jwt_expiration_ms",
                "must be greater than zero",
            ));
        }
        if self.jwt_expiration_ms > MAX_EXPIRATION_MS {
            return Err(ConfigError::invalid_value(
                "jwt_expiration_ms",
                format!("must not exceed {MAX_EXPIRATION_MS}"),
            ));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "lookup_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.header.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("header.name", "must not be blank"));
        }
        if self.header.prefix.trim().is_empty() {
            return Err(ConfigError::invalid_value("header.prefix", "must not be blank"));
        }
        Ok(())
    }

    /// Build from `GATEKEEPER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test map, ...).
    ///
    /// Keys mirror [`SecurityConfig::from_env`]. Missing keys fall back to
    /// defaults; present but unparsable values are errors.
    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::new(get("GATEKEEPER_JWT_SECRET").unwrap_or_default());

        if let Some(v) = get("GATEKEEPER_ENABLED") {
            cfg.enabled = parse_bool("GATEKEEPER_ENABLED", &v)?;
        }
        if let Some(v) = get("GATEKEEPER_CASE_SENSITIVE") {
            cfg.case_sensitive = parse_bool("GATEKEEPER_CASE_SENSITIVE", &v)?;
        }
        if let Some(v) = get("GATEKEEPER_EXCLUDE_PATHS") {
            cfg.exclude_paths = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("GATEKEEPER_JWT_EXPIRATION_MS") {
            cfg.jwt_expiration_ms = parse_u64("GATEKEEPER_JWT_EXPIRATION_MS", &v)?;
        }
        if let Some(v) = get("GATEKEEPER_LOOKUP_TIMEOUT_MS") {
            cfg.lookup_timeout_ms = parse_u64("GATEKEEPER_LOOKUP_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("GATEKEEPER_HEADER_NAME") {
            cfg.header.name = v;
        }
        if let Some(v) = get("GATEKEEPER_HEADER_PREFIX") {
            cfg.header.prefix = v;
        }

        Ok(cfg)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid_value(
            key,
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::invalid_value(key, e.to_string()))
}
