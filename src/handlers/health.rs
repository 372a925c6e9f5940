use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Liveness probe with a database ping.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service health")),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = state.db.ping().await.is_ok();
    let status = if database_ok { "healthy" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "payflow-api",
        "database": database_ok,
    }))
}
