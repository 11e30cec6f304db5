use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use gatekeeper_core::SecurityError;

use crate::app::dto::TokenResponse;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::middleware::PresentedToken;

/// Re-sign the caller's token with a fresh expiry.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    token: Option<Extension<PresentedToken>>,
) -> axum::response::Response {
    let Some(Extension(PresentedToken(token))) = token else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "no_token",
            "no token was presented with this request",
        );
    };

    match services.codec.refresh(&token) {
        Ok(token) => Json(TokenResponse {
            token,
            token_type: "Bearer",
            expires_in_ms: services.codec.ttl().num_milliseconds(),
        })
        .into_response(),
        Err(e) => errors::security_error_to_response(SecurityError::from(e)),
    }
}
