//! HTTP application wiring (Axum router + security pipeline).
//!
//! Layout:
//! - `services.rs`: handler dependencies (codec, operation table, order book)
//! - `routes/`: HTTP routes + handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses
//!
//! Layer order, outermost first: outcome records, authentication, then the
//! per-route authorization guard.

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use gatekeeper_auth::{
    AuthorizationPolicy, IdentityLookup, OperationPolicy, OperationRegistry, TokenCodec,
};
use gatekeeper_core::{ConfigError, SecurityConfig};

use crate::audit::{self, AuditState, OutcomeSink};
use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Every protected operation this service exposes.
pub fn operations() -> Result<OperationRegistry, ConfigError> {
    OperationRegistry::new()
        .with(OperationPolicy::authenticated("whoami"))?
        .with(
            OperationPolicy::authenticated("token.refresh")
                .with_description("{subject} refreshed their token"),
        )?
        .with(
            OperationPolicy::requiring("orders.read", "hasAuthority('order:read')")?
                .with_description("{subject} read order {path}"),
        )?
        .with(
            OperationPolicy::requiring("orders.create", "hasAuthority('order:write')")?
                .with_description("{subject} ({user_id}) created an order: {outcome}"),
        )?
        .with(OperationPolicy::requiring(
            "operations.list",
            "hasAuthority('operations:read')",
        )?)
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Fails on any startup configuration problem: weak secret, malformed
/// exclusion pattern, bad header name, or a route naming an unregistered
/// operation.
pub fn build_app(
    config: &SecurityConfig,
    lookup: Arc<dyn IdentityLookup>,
    sink: Arc<dyn OutcomeSink>,
) -> Result<Router, ConfigError> {
    let codec = Arc::new(TokenCodec::from_config(config)?);
    let policy = Arc::new(AuthorizationPolicy::from_config(config)?);
    let registry = Arc::new(operations()?);

    let auth_state = AuthState::from_config(config, codec.clone(), lookup)?;
    let audit_state = AuditState {
        sink,
        registry: registry.clone(),
    };
    let services = Arc::new(services::AppServices::new(codec, registry.clone()));

    let app = Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router(&policy, &registry)?)
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            audit_state,
            audit::audit_middleware,
        ));

    tracing::info!(
        enabled = config.enabled,
        case_sensitive = config.case_sensitive,
        exclusions = config.exclude_paths.len(),
        operations = registry.len(),
        "security pipeline ready"
    );
    Ok(app)
}
