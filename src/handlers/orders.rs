use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::orders::{CreateOrderRequest, CreatedOrder, OrderResponse},
    ApiResponse, AppState,
};

/// Create a payment order and initiate checkout with the configured vendor.
#[utoipa::path(
    post,
    path = "/create-order",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created; data carries the checkout redirect URL"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 500, description = "Gateway call failed; order marked failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created: CreatedOrder = state.orders.create_order(request).await?;
    info!(order_id = %created.order_id, "Order created; returning checkout URL");
    Ok((StatusCode::OK, Json(ApiResponse::success(created))))
}

/// Fetch a persisted order. Amount is reported in major units.
#[utoipa::path(
    get,
    path = "/order/{id}",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order record"),
        (status = 400, description = "Malformed order id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = Uuid::parse_str(&id)
        .map_err(|_| ServiceError::BadRequest(format!("Invalid order id: {id}")))?;
    let order: OrderResponse = state.orders.get_order(order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}
