//! `gatekeeper-core`: shared building blocks for the security pipeline.
//!
//! This crate holds configuration and the error taxonomy only; it knows
//! nothing about tokens, HTTP, or identity storage.

pub mod config;
pub mod error;

pub use config::{MAX_EXPIRATION_MS, MIN_SECRET_BYTES, SecurityConfig, TokenHeader};
pub use error::{ConfigError, SecurityError, SecurityResult};
