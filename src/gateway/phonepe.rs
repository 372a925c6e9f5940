//! PhonePe hosted pay-page client.
//!
//! Initiation posts `{"request": base64(payload)}` with an `X-VERIFY` checksum
//! over the same payload bytes; status checks are body-less GETs signed over
//! the status route path. The order's UUID is the merchant transaction id
//! end-to-end.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{checksum, map_transport_error, PaymentSession, PaymentState, StatusCheck};
use crate::{
    config::GatewayConfig,
    entities::payment_order,
    errors::{GatewayErrorReason, ServiceError},
};

/// Route path PhonePe expects inside the pay-request signature.
const PAY_ROUTE: &str = "/pg/v1/pay";
/// Route prefix for status-check signatures.
const STATUS_ROUTE_PREFIX: &str = "/pg/v1/status";

#[derive(Clone)]
pub struct PhonePeClient {
    http: reqwest::Client,
    cfg: GatewayConfig,
    callback_url: String,
}

impl PhonePeClient {
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

    #[instrument(skip(self, order), fields(order_id = %order.id, amount_minor = order.amount_minor))]
    pub async fn initiate(
        &self,
        order: &payment_order::Model,
    ) -> Result<PaymentSession, ServiceError> {
        let payload = json!({
            "merchantId": self.cfg.merchant_id,
            "merchantUserId": order.customer_name,
            "mobileNumber": order.phone,
            "amount": order.amount_minor,
            "merchantTransactionId": order.id.to_string(),
            "redirectUrl": format!("{}?orderId={}", self.callback_url, order.id),
            "redirectMode": "POST",
            "paymentInstrument": {
                "type": self.cfg.payment_instrument,
            },
        });

        // The signature covers exactly the bytes sent in the request field;
        // re-serializing differently would break the checksum.
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ServiceError::InternalError(format!("payload serialization: {e}")))?;
        let token = checksum::sign(&body, PAY_ROUTE, &self.cfg.merchant_key, self.cfg.key_index);

        let response = self
            .http
            .post(&self.cfg.base_url)
            .header("X-VERIFY", token)
            .header("accept", "application/json")
            .json(&json!({ "request": BASE64.encode(&body) }))
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "PhonePe pay request rejected");
            return Err(ServiceError::gateway(GatewayErrorReason::HttpError));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|_| ServiceError::gateway(GatewayErrorReason::InvalidResponse))?;

        let accepted = value.get("success").and_then(Value::as_bool).unwrap_or(false);
        let redirect_url = value
            .pointer("/data/instrumentResponse/redirectInfo/url")
            .and_then(Value::as_str);

        match (accepted, redirect_url) {
            (true, Some(url)) => Ok(PaymentSession {
                redirect_url: url.to_string(),
                vendor_txn_id: value
                    .pointer("/data/transactionId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| order.id.to_string()),
            }),
            _ => {
                warn!("PhonePe pay response missing success flag or redirect URL");
                Err(ServiceError::gateway(GatewayErrorReason::InvalidResponse))
            }
        }
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn check_status(&self, order_id: Uuid) -> Result<StatusCheck, ServiceError> {
        let route = format!(
            "{}/{}/{}",
            STATUS_ROUTE_PREFIX, self.cfg.merchant_id, order_id
        );
        let token = checksum::status_sign(&route, &self.cfg.merchant_key, self.cfg.key_index);
        let url = format!(
            "{}/{}/{}",
            self.cfg.status_url.trim_end_matches('/'),
            self.cfg.merchant_id,
            order_id
        );

        let response = self
            .http
            .get(url)
            .header("X-VERIFY", token)
            .header("X-MERCHANT-ID", &self.cfg.merchant_id)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "PhonePe status request rejected");
            return Err(ServiceError::gateway(GatewayErrorReason::HttpError));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|_| ServiceError::gateway(GatewayErrorReason::InvalidResponse))?;

        let state = match value.get("code").and_then(Value::as_str) {
            Some("PAYMENT_SUCCESS") => PaymentState::Success,
            Some("PAYMENT_PENDING") => PaymentState::Pending,
            Some(_) => PaymentState::Failed,
            None => {
                warn!("PhonePe status response missing code field");
                return Err(ServiceError::gateway(GatewayErrorReason::InvalidResponse));
            }
        };

        Ok(StatusCheck {
            state,
            vendor_txn_id: value
                .pointer("/data/transactionId")
                .and_then(Value::as_str)
                .map(str::to_string),
            payment_method: value
                .pointer("/data/paymentInstrument/type")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
