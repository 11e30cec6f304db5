use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};

use gatekeeper_auth::{
    Identity, IdentityContext, IdentityLookup, TokenCodec, TokenError, lookup_with_timeout,
};
use gatekeeper_core::{ConfigError, SecurityConfig, SecurityError, SecurityResult, TokenHeader};

use crate::app::errors::security_error_to_response;

/// The raw token the caller authenticated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedToken(pub String);

#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<TokenCodec>,
    pub lookup: Arc<dyn IdentityLookup>,
    pub header: TokenHeader,
    pub lookup_timeout: Duration,
}

impl AuthState {
    pub fn from_config(
        config: &SecurityConfig,
        codec: Arc<TokenCodec>,
        lookup: Arc<dyn IdentityLookup>,
    ) -> Result<Self, ConfigError> {
        HeaderName::from_bytes(config.header.name.as_bytes())
            .map_err(|e| ConfigError::invalid_value("header.name", e.to_string()))?;
        Ok(Self {
            codec,
            lookup,
            header: config.header.clone(),
            lookup_timeout: config.lookup_timeout(),
        })
    }
}

/// Authenticate the request when it carries a token.
///
/// No token: the request proceeds unauthenticated and authorization decides.
/// Bad token or unknown subject: 401. Lookup failure: 500. The identity is
/// published into the request's [`IdentityContext`] only after every check
/// has passed. Runs whether or not enforcement is enabled; the enforcement
/// switch belongs to the authorization policy.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match IdentityContext::current() {
        Some(ctx) => authenticate(&state, ctx, req, next).await,
        None => {
            let ctx = IdentityContext::new();
            ctx.clone().scope(authenticate(&state, ctx, req, next)).await
        }
    }
}

async fn authenticate(
    state: &AuthState,
    ctx: IdentityContext,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_token(&state.header, req.headers()) {
        Ok(Some(token)) => token.to_string(),
        Ok(None) => return next.run(req).await,
        Err(e) => return security_error_to_response(e),
    };

    let identity = match resolve_identity(state, &token).await {
        Ok(identity) => identity,
        Err(e) => return security_error_to_response(e),
    };

    if let Err(e) = ctx.populate(identity.clone()) {
        return security_error_to_response(e);
    }
    tracing::debug!(subject = identity.subject(), "request authenticated");

    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(ctx);
    req.extensions_mut().insert(PresentedToken(token));

    next.run(req).await
}

async fn resolve_identity(state: &AuthState, token: &str) -> SecurityResult<Identity> {
    let claims = state.codec.verify(token).map_err(|e| {
        match &e {
            TokenError::InvalidSignature => tracing::warn!("token signature did not verify"),
            TokenError::Malformed(reason) => tracing::debug!(%reason, "malformed token"),
            TokenError::Expired => tracing::debug!("expired token"),
            TokenError::InvalidClaims(reason) => tracing::error!(%reason, "token claims rejected"),
        }
        SecurityError::from(e)
    })?;

    let authorities =
        lookup_with_timeout(state.lookup.as_ref(), claims.subject(), state.lookup_timeout)
            .await
            .map_err(|e| {
                tracing::debug!(subject = claims.subject(), error = %e, "identity lookup failed");
                SecurityError::from(e)
            })?;

    Ok(Identity::from_claims(&claims, authorities))
}

fn extract_token<'a>(header: &TokenHeader, headers: &'a HeaderMap) -> SecurityResult<Option<&'a str>> {
    let Some(value) = headers.get(header.name.as_str()) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| SecurityError::malformed("token header is not visible ASCII"))?;

    Ok(header
        .extract(value)
        .map(str::trim)
        .filter(|token| !token.is_empty()))
}
