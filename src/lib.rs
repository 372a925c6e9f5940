//! PayFlow API Library
//!
//! Backend for creating payment orders against a third-party gateway
//! (PhonePe or Cashfree), persisting order state, and finalizing orders from
//! the gateway's asynchronous callbacks.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub orders: services::orders::OrderService,
    pub gateway: gateway::GatewayClient,
}

// Common response wrapper. Failures never use this envelope; they go through
// `ServiceError::into_response` and its `ErrorResponse` body.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// All HTTP routes. Layers (trace, CORS, timeouts) are applied by the caller.
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "payflow-api up" }))
        .route("/health", get(handlers::health::health_check))
        .route("/create-order", post(handlers::orders::create_order))
        .route("/order/:id", get(handlers::orders::get_order))
        .route(
            "/payment-callback",
            get(handlers::callback::payment_callback).post(handlers::callback::payment_callback),
        )
        .route("/payment-webhook", post(handlers::callback::payment_webhook))
}
