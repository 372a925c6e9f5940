//! Cashfree PG client.
//!
//! Cashfree authenticates with client-id/secret headers instead of a body
//! checksum; webhook authenticity is verified separately against the raw body
//! (see `checksum::verify_webhook`). Amounts go over the wire in major units.

use serde_json::{json, Value};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{map_transport_error, PaymentSession, PaymentState, StatusCheck};
use crate::{
    config::GatewayConfig,
    entities::payment_order,
    errors::{GatewayErrorReason, ServiceError},
};

#[derive(Clone)]
pub struct CashfreeClient {
    http: reqwest::Client,
    cfg: GatewayConfig,
    callback_url: String,
}

impl CashfreeClient {
    pub fn new(http: reqwest::Client, cfg: GatewayConfig, callback_url: String) -> Self {
        Self {
            http,
            cfg,
            callback_url,
        }
    }

    pub(super) fn config(&self) -> &GatewayConfig {
        &self.cfg
    }

    fn orders_url(&self) -> String {
        format!("{}/orders", self.cfg.base_url.trim_end_matches('/'))
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, amount_minor = order.amount_minor))]
    pub async fn initiate(
        &self,
        order: &payment_order::Model,
    ) -> Result<PaymentSession, ServiceError> {
        // Cashfree takes the amount in major units with two decimals.
        let order_amount = order.amount_minor as f64 / 100.0;

        let mut customer = json!({
            "customer_id": order.id.to_string(),
            "customer_name": order.customer_name,
            "customer_phone": order.phone,
        });
        if let Some(email) = &order.email {
            customer["customer_email"] = json!(email);
        }

        let payload = json!({
            "order_id": order.id.to_string(),
            "order_amount": order_amount,
            "order_currency": "INR",
            "customer_details": customer,
            "order_meta": {
                "return_url": format!("{}?orderId={}", self.callback_url, order.id),
            },
        });

        let response = self
            .http
            .post(self.orders_url())
            .header("x-client-id", &self.cfg.merchant_id)
            .header("x-client-secret", &self.cfg.merchant_key)
            .header("x-api-version", &self.cfg.api_version)
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Cashfree order request rejected");
            return Err(ServiceError::gateway(GatewayErrorReason::HttpError));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|_| ServiceError::gateway(GatewayErrorReason::InvalidResponse))?;

        let session_id = value.get("payment_session_id").and_then(Value::as_str);
        let payment_link = value
            .get("payment_link")
            .and_then(Value::as_str)
            .or_else(|| value.pointer("/payments/url").and_then(Value::as_str));

        match (session_id, payment_link) {
            (Some(session), Some(link)) => Ok(PaymentSession {
                redirect_url: link.to_string(),
                vendor_txn_id: value
                    .get("cf_order_id")
                    .map(value_to_string)
                    .unwrap_or_else(|| session.to_string()),
            }),
            _ => {
                warn!("Cashfree order response missing payment session or link");
                Err(ServiceError::gateway(GatewayErrorReason::InvalidResponse))
            }
        }
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn check_status(&self, order_id: Uuid) -> Result<StatusCheck, ServiceError> {
        let url = format!("{}/{}", self.orders_url(), order_id);

        let response = self
            .http
            .get(url)
            .header("x-client-id", &self.cfg.merchant_id)
            .header("x-client-secret", &self.cfg.merchant_key)
            .header("x-api-version", &self.cfg.api_version)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Cashfree status request rejected");
            return Err(ServiceError::gateway(GatewayErrorReason::HttpError));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|_| ServiceError::gateway(GatewayErrorReason::InvalidResponse))?;

        let state = match value.get("order_status").and_then(Value::as_str) {
            Some("PAID") => PaymentState::Success,
            Some("ACTIVE") => PaymentState::Pending,
            Some(_) => PaymentState::Failed,
            None => {
                warn!("Cashfree status response missing order_status field");
                return Err(ServiceError::gateway(GatewayErrorReason::InvalidResponse));
            }
        };

        Ok(StatusCheck {
            state,
            vendor_txn_id: value.get("cf_order_id").map(value_to_string),
            payment_method: value
                .pointer("/payment_method")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Cashfree returns `cf_order_id` as a number in some API versions and a
/// string in others.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
