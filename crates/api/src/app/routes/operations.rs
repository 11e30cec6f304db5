use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use crate::app::services::AppServices;

/// Read-only view of the protected-operation table.
pub async fn list_operations(
    Extension(services): Extension<Arc<AppServices>>,
) -> impl IntoResponse {
    Json(services.registry.iter().cloned().collect::<Vec<_>>())
}
