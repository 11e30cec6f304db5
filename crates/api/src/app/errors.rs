use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gatekeeper_core::SecurityError;

/// Pipeline rejection attached to the response, read back by the outcome layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection(pub SecurityError);

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Map a pipeline failure onto its client response.
///
/// Internal detail is logged here and never reaches the body.
pub fn security_error_to_response(err: SecurityError) -> axum::response::Response {
    if let SecurityError::Internal(detail) = &err {
        tracing::error!(error = %detail, "internal error in security pipeline");
    }

    let status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = json_error(status, err.code(), err.client_message());
    response.extensions_mut().insert(Rejection(err));
    response
}
