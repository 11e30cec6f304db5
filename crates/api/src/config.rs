//! Process configuration for the HTTP host.

use std::path::PathBuf;

use gatekeeper_core::{ConfigError, SecurityConfig};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub security: SecurityConfig,
    pub bind_addr: String,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// JSON file of `{subject: [authorities]}` backing the identity lookup.
    pub identities_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn new(security: SecurityConfig) -> Self {
        Self {
            security,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            identities_file: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key → value source.
    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let security = SecurityConfig::from_source(&get)?;
        let mut config = Self::new(security);

        if let Some(addr) = get("GATEKEEPER_BIND_ADDR") {
            let addr = addr.trim();
            if addr.parse::<std::net::SocketAddr>().is_err() {
                return Err(ConfigError::invalid_value(
                    "GATEKEEPER_BIND_ADDR",
                    format!("'{addr}' is not a socket address"),
                ));
            }
            config.bind_addr = addr.to_string();
        }
        if let Some(filter) = get("GATEKEEPER_LOG").filter(|s| !s.trim().is_empty()) {
            config.log_filter = filter;
        }
        config.identities_file = get("GATEKEEPER_IDENTITIES_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}
