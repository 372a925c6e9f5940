//! Integration tests for order creation against a mocked PhonePe vendor.

mod common;

use axum::http::Method;
use sea_orm::EntityTrait;
use common::{response_json, TestApp};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::{
    matchers::{header_exists, method, path},
    Mock, ResponseTemplate,
};

fn phonepe_pay_success() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "code": "PAYMENT_INITIATED",
        "data": {
            "instrumentResponse": {
                "redirectInfo": { "url": "https://pay.example/checkout/abc" }
            }
        }
    }))
}

#[tokio::test]
async fn create_order_persists_pending_row_and_returns_redirect_url() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .and(header_exists("X-VERIFY"))
        .respond_with(phonepe_pay_success())
        .expect(1)
        .mount(&app.mock_server)
        .await;

    let payload = json!({
        "name": "Asha Rao",
        "mobileNumber": "9876543210",
        "amount": "100.00",
        "email": "asha@example.com"
    });

    let response = app
        .request(Method::POST, "/create-order", Some(payload))
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(
        body["data"]["url"].as_str(),
        Some("https://pay.example/checkout/abc")
    );

    let order_id: Uuid = body["data"]["orderId"]
        .as_str()
        .expect("order id in response")
        .parse()
        .expect("order id is a uuid");

    let row = app.order_row(order_id).await.expect("order row persisted");
    assert_eq!(row.status, "pending");
    assert_eq!(row.amount_minor, 10_000);
    assert_eq!(row.customer_name, "Asha Rao");
    assert_eq!(row.email.as_deref(), Some("asha@example.com"));
    assert!(row.transaction_id.is_none());
}

#[tokio::test]
async fn fractional_amounts_round_half_away_from_zero() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .respond_with(phonepe_pay_success())
        .mount(&app.mock_server)
        .await;

    let payload = json!({
        "name": "Asha Rao",
        "mobileNumber": "9876543210",
        "amount": "10.005"
    });

    let response = app
        .request(Method::POST, "/create-order", Some(payload))
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let order_id: Uuid = body["data"]["orderId"].as_str().unwrap().parse().unwrap();
    let row = app.order_row(order_id).await.unwrap();
    assert_eq!(row.amount_minor, 1_001);
}

#[tokio::test]
async fn validation_failure_persists_nothing_and_never_calls_vendor() {
    let app = TestApp::new().await;

    // Zero vendor requests allowed.
    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .respond_with(phonepe_pay_success())
        .expect(0)
        .mount(&app.mock_server)
        .await;

    let payload = json!({
        "name": "",
        "mobileNumber": "9876543210",
        "amount": "100.00"
    });

    let response = app
        .request(Method::POST, "/create-order", Some(payload))
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Validation error"));
}

#[tokio::test]
async fn empty_body_fails_validation_not_deserialization() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .respond_with(phonepe_pay_success())
        .expect(0)
        .mount(&app.mock_server)
        .await;

    // No fields at all: defaults kick in and service validation rejects them.
    let response = app
        .request(Method::POST, "/create-order", Some(json!({})))
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Validation error"));
}

#[tokio::test]
async fn amount_below_one_rupee_is_rejected() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .respond_with(phonepe_pay_success())
        .expect(0)
        .mount(&app.mock_server)
        .await;

    let payload = json!({
        "name": "Asha Rao",
        "mobileNumber": "9876543210",
        "amount": "0.50"
    });

    let response = app
        .request(Method::POST, "/create-order", Some(payload))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn vendor_rejection_rolls_order_forward_to_failed() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.mock_server)
        .await;

    let payload = json!({
        "name": "Asha Rao",
        "mobileNumber": "9876543210",
        "amount": "100.00"
    });

    let response = app
        .request(Method::POST, "/create-order", Some(payload))
        .await;
    assert_eq!(response.status(), 500);

    let body = response_json(response).await;
    assert_eq!(body["details"].as_str(), Some("http_error"));

    // The pending row was written before the vendor call and then rolled
    // forward to failed, so a support-visible record exists.
    let orders = payflow_api::entities::payment_order::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, "failed");
}

#[tokio::test]
async fn vendor_timeout_rolls_order_forward_to_failed() {
    let app = TestApp::new().await;

    // Delay well past the client's 2s timeout so the request is abandoned.
    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .respond_with(phonepe_pay_success().set_delay(Duration::from_secs(5)))
        .expect(1)
        .mount(&app.mock_server)
        .await;

    let payload = json!({
        "name": "Asha Rao",
        "mobileNumber": "9876543210",
        "amount": "100.00"
    });

    let response = app
        .request(Method::POST, "/create-order", Some(payload))
        .await;
    assert_eq!(response.status(), 500);

    let body = response_json(response).await;
    assert_eq!(body["details"].as_str(), Some("timeout"));

    let orders = payflow_api::entities::payment_order::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, "failed");
}

#[tokio::test]
async fn malformed_vendor_response_is_a_gateway_error() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&app.mock_server)
        .await;

    let payload = json!({
        "name": "Asha Rao",
        "mobileNumber": "9876543210",
        "amount": "100.00"
    });

    let response = app
        .request(Method::POST, "/create-order", Some(payload))
        .await;
    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn get_order_returns_full_record() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path("/pg/v1/pay"))
        .respond_with(phonepe_pay_success())
        .mount(&app.mock_server)
        .await;

    let payload = json!({
        "name": "Asha Rao",
        "mobileNumber": "9876543210",
        "amount": "250.00",
        "service": "consultation"
    });

    let created = response_json(
        app.request(Method::POST, "/create-order", Some(payload))
            .await,
    )
    .await;
    let order_id = created["data"]["orderId"].as_str().unwrap();

    let response = app
        .request(Method::GET, &format!("/order/{order_id}"), None)
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["id"].as_str(), Some(order_id));
    assert_eq!(data["amount"].as_str(), Some("250.00"));
    assert_eq!(data["amountMinor"].as_i64(), Some(25_000));
    assert_eq!(data["status"].as_str(), Some("pending"));
    assert_eq!(data["service"].as_str(), Some("consultation"));
}

#[tokio::test]
async fn get_order_unknown_id_is_404_and_malformed_id_is_400() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            &format!("/order/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app.request(Method::GET, "/order/not-a-uuid", None).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn health_endpoint_reports_database_state() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(body["status"].as_str(), Some("healthy"));
    assert_eq!(body["service"].as_str(), Some("payflow-api"));
}
