use axum::{Json, http::StatusCode, response::IntoResponse};

use gatekeeper_auth::IdentityContext;

use crate::app::dto::WhoAmIResponse;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami() -> impl IntoResponse {
    let ctx = IdentityContext::current().unwrap_or_default();
    Json(WhoAmIResponse {
        subject: ctx.subject(),
        user_id: ctx.user_id(),
        name: ctx.user_name(),
        account: ctx.account(),
        authorities: ctx.authorities().to_sorted_vec(),
    })
}
