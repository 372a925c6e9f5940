//! OpenAPI documentation for the HTTP surface.

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PayFlow API",
        description = "Payment order backend: creates orders against PhonePe or Cashfree and finalizes them from gateway callbacks."
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::callback::payment_webhook,
        crate::handlers::health::health_check,
    ),
    components(schemas(
        crate::services::orders::CreateOrderRequest,
        crate::services::orders::CreatedOrder,
        crate::services::orders::OrderResponse,
        crate::entities::payment_order::OrderStatus,
        crate::errors::ErrorResponse,
        crate::errors::GatewayErrorReason,
    )),
    tags(
        (name = "Orders", description = "Order creation and lookup"),
        (name = "Payments", description = "Gateway callback and webhook intake"),
        (name = "Health", description = "Liveness and dependency checks"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`, serving the document at `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_includes_order_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/create-order"));
        assert!(json.contains("/order/{id}"));
        assert!(json.contains("/payment-webhook"));
    }
}
