//! API-side authorization guard for protected operations.
//!
//! Each protected route is wrapped in its own guard, keyed by the operation
//! name it was registered under. The guard runs after authentication and
//! before the handler.

use std::sync::Arc;

use axum::{extract::State, middleware::Next, response::Response};

use gatekeeper_auth::{AuthorizationPolicy, Identity, OperationPolicy, OperationRegistry};
use gatekeeper_core::ConfigError;

use crate::app::errors::security_error_to_response;

/// Operation a response was produced for, read back by the outcome layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTag(pub String);

#[derive(Debug, Clone)]
pub struct GuardState {
    policy: Arc<AuthorizationPolicy>,
    operation: Arc<OperationPolicy>,
}

impl GuardState {
    /// Resolve the operation's descriptor now so a typo fails at startup.
    pub fn new(
        policy: Arc<AuthorizationPolicy>,
        registry: &OperationRegistry,
        operation: &str,
    ) -> Result<Self, ConfigError> {
        let operation = Arc::new(registry.get(operation)?.clone());
        Ok(Self { policy, operation })
    }

    pub fn operation(&self) -> &OperationPolicy {
        &self.operation
    }
}

pub async fn authorize_operation(
    State(guard): State<GuardState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let decision = guard.policy.authorize_operation(
        req.uri().path(),
        &guard.operation,
        req.extensions().get::<Identity>(),
    );

    let mut response = match decision.into_result() {
        Ok(()) => next.run(req).await,
        Err(e) => security_error_to_response(e),
    };
    response
        .extensions_mut()
        .insert(OperationTag(guard.operation.operation.clone()));
    response
}
