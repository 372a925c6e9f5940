//! Vendor payment-gateway clients.
//!
//! Behavior differences between vendors are data, not copy-pasted files: one
//! `GatewayClient` tagged union dispatches to the PhonePe or Cashfree flavor
//! selected by configuration. Every vendor call is fire-once with a bounded
//! timeout; retries are an operator concern.

pub mod checksum;

mod cashfree;
mod phonepe;

pub use cashfree::CashfreeClient;
pub use phonepe::PhonePeClient;

use crate::{
    config::AppConfig,
    entities::payment_order,
    errors::{GatewayErrorReason, ServiceError},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Vendor-reported payment state, collapsed onto the three states the order
/// lifecycle understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentState {
    Pending,
    Success,
    Failed,
}

/// Result of a successful payment initiation.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    /// Hosted-checkout URL the browser is sent to.
    pub redirect_url: String,
    /// Vendor-side transaction identifier for this attempt.
    pub vendor_txn_id: String,
}

/// Result of a status re-verification call.
#[derive(Debug, Clone)]
pub struct StatusCheck {
    pub state: PaymentState,
    pub vendor_txn_id: Option<String>,
    pub payment_method: Option<String>,
}

/// The configured vendor client.
#[derive(Clone)]
pub enum GatewayClient {
    PhonePe(PhonePeClient),
    Cashfree(CashfreeClient),
}

impl GatewayClient {
    /// Builds the client selected by `gateway.provider`, with one shared HTTP
    /// client bounded by the configured timeout.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.gateway.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("failed to build HTTP client: {e}")))?;

        match cfg.gateway.provider.to_ascii_lowercase().as_str() {
            "phonepe" => Ok(Self::PhonePe(PhonePeClient::new(
                http,
                cfg.gateway.clone(),
                cfg.callback_url.clone(),
            ))),
            "cashfree" => Ok(Self::Cashfree(CashfreeClient::new(
                http,
                cfg.gateway.clone(),
                cfg.callback_url.clone(),
            ))),
            other => Err(ServiceError::InternalError(format!(
                "unsupported gateway provider: {other}"
            ))),
        }
    }

    /// Initiates a payment for a persisted order. At most one attempt; the
    /// caller decides what a failure means for the order record.
    pub async fn initiate(
        &self,
        order: &payment_order::Model,
    ) -> Result<PaymentSession, ServiceError> {
        match self {
            Self::PhonePe(client) => client.initiate(order).await,
            Self::Cashfree(client) => client.initiate(order).await,
        }
    }

    /// Re-verifies the payment outcome directly with the vendor. The callback
    /// payload's own status claim is never trusted.
    pub async fn check_status(&self, order_id: Uuid) -> Result<StatusCheck, ServiceError> {
        match self {
            Self::PhonePe(client) => client.check_status(order_id).await,
            Self::Cashfree(client) => client.check_status(order_id).await,
        }
    }

    /// Verifies an inbound webhook body against the configured secret.
    /// `SignatureError` means the payload must not be trusted and no state
    /// may be mutated.
    pub fn verify_webhook_signature(
        &self,
        body: &[u8],
        provided: &str,
    ) -> Result<(), ServiceError> {
        let secret = self
            .config()
            .webhook_secret
            .as_deref()
            .ok_or_else(|| {
                ServiceError::InternalError("webhook secret is not configured".to_string())
            })?;

        if checksum::verify_webhook(body, secret, provided) {
            Ok(())
        } else {
            Err(ServiceError::SignatureError)
        }
    }

    fn config(&self) -> &crate::config::GatewayConfig {
        match self {
            Self::PhonePe(client) => client.config(),
            Self::Cashfree(client) => client.config(),
        }
    }
}

/// Maps transport-level reqwest failures onto the gateway error taxonomy.
pub(crate) fn map_transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::gateway(GatewayErrorReason::Timeout)
    } else {
        ServiceError::gateway(GatewayErrorReason::HttpError)
    }
}
