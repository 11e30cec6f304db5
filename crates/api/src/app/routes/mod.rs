use std::sync::Arc;

use axum::{
    Router,
    routing::{MethodRouter, get, post},
};

use gatekeeper_auth::{AuthorizationPolicy, OperationRegistry};
use gatekeeper_core::ConfigError;

use crate::authz::{self, GuardState};

pub mod operations;
pub mod orders;
pub mod system;
pub mod tokens;

/// Router for every guarded endpoint. Each route names the registered
/// operation whose policy it enforces.
pub fn router(
    policy: &Arc<AuthorizationPolicy>,
    registry: &OperationRegistry,
) -> Result<Router, ConfigError> {
    let guarded = |route: MethodRouter, operation: &str| -> Result<MethodRouter, ConfigError> {
        let guard = GuardState::new(policy.clone(), registry, operation)?;
        Ok(route.route_layer(axum::middleware::from_fn_with_state(
            guard,
            authz::authorize_operation,
        )))
    };

    Ok(Router::new()
        .route("/whoami", guarded(get(system::whoami), "whoami")?)
        .route("/token/refresh", guarded(post(tokens::refresh), "token.refresh")?)
        .route("/orders", guarded(post(orders::create_order), "orders.create")?)
        .route("/orders/:id", guarded(get(orders::get_order), "orders.read")?)
        .route(
            "/operations",
            guarded(get(operations::list_operations), "operations.list")?,
        ))
}
