use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use gatekeeper_auth::IdentityContext;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    if body.item.trim().is_empty() || body.quantity == 0 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "item must be non-empty and quantity positive",
        );
    }

    let created_by = IdentityContext::current()
        .and_then(|ctx| ctx.subject())
        .unwrap_or_else(|| "anonymous".to_string());
    let order = services.orders.create(body.item, body.quantity, created_by);
    tracing::info!(order_id = order.id, created_by = %order.created_by, "order created");

    (StatusCode::CREATED, Json(order)).into_response()
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: u64 = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };

    match services.orders.get(id) {
        Some(order) => Json(order).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}
