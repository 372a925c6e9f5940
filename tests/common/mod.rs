use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use sea_orm::EntityTrait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

use payflow_api::{
    config::AppConfig,
    db,
    entities::payment_order,
    events::{self, EventSender},
    gateway::GatewayClient,
    services::orders::OrderService,
    AppState,
};

pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Harness spinning up the full router against an in-memory SQLite database,
/// with the payment vendor replaced by a wiremock server.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mock_server: MockServer,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// PhonePe-flavoured application with fresh database state.
    pub async fn new() -> Self {
        Self::with_provider("phonepe").await
    }

    pub async fn with_provider(provider: &str) -> Self {
        let mock_server = MockServer::start().await;

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single pooled connection keeps the in-memory database alive for
        // the lifetime of the test.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        cfg.gateway.provider = provider.to_string();
        cfg.gateway.merchant_id = "TESTMERCHANT".to_string();
        cfg.gateway.merchant_key = "test-merchant-key".to_string();
        cfg.gateway.webhook_secret = Some(TEST_WEBHOOK_SECRET.to_string());
        cfg.gateway.timeout_secs = 2;
        match provider {
            "cashfree" => {
                cfg.gateway.base_url = mock_server.uri();
                cfg.gateway.status_url = format!("{}/orders", mock_server.uri());
            }
            _ => {
                cfg.gateway.base_url = format!("{}/pg/v1/pay", mock_server.uri());
                cfg.gateway.status_url = format!("{}/pg/v1/status", mock_server.uri());
            }
        }

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway = GatewayClient::from_config(&cfg).expect("valid gateway config for tests");
        let orders = OrderService::new(
            db_arc.clone(),
            gateway.clone(),
            Some(Arc::new(event_sender)),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            orders,
            gateway,
        };

        let router = payflow_api::app_routes().with_state(state.clone());

        Self {
            router,
            state,
            mock_server,
            _event_task: event_task,
        }
    }

    /// Send a request against the router, optionally with a JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Raw request with explicit headers and body bytes; used for webhook
    /// deliveries where the signature is computed over the exact bytes sent.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(Body::from(body))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Fetch an order row straight from the database.
    pub async fn order_row(&self, id: Uuid) -> Option<payment_order::Model> {
        payment_order::Entity::find_by_id(id)
            .one(&*self.state.db)
            .await
            .expect("failed to query order row")
    }
}

/// Webhook signature as the vendor computes it: hex sha256 of body || secret.
pub fn webhook_signature(body: &[u8], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not valid json")
}
