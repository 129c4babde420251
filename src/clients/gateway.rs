use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;

use super::rewrite_auth_error;

const SYSTEM: &str = "Payment gateway";

/// Payment intent created at the gateway. The id is all the flow keeps; the
/// capture widget and the verifier both correlate through it.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
}

/// Contract this flow relies on from the payment gateway: intent creation in
/// minor currency units, tagged with a receipt for operator correlation.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentIntent, ServiceError>;
}

/// HTTP client for a Razorpay-style orders API with key-id/key-secret
/// basic auth.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Serialize)]
struct CreateIntentBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

impl HttpGatewayClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGatewayClient {
    #[instrument(skip(self))]
    async fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        let body = CreateIntentBody {
            amount: amount_minor_units,
            currency,
            receipt,
        };

        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::UpstreamPayment {
                status: 502,
                message: format!("{} unreachable: {}", SYSTEM, e),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&raw)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/description")
                        .or_else(|| v.get("message"))
                        .and_then(|m| m.as_str())
                        .map(|s| s.to_string())
                })
                .unwrap_or(raw);
            warn!(status = status, message = %message, "payment intent creation failed");
            return Err(ServiceError::UpstreamPayment {
                status,
                message: rewrite_auth_error(SYSTEM, &message),
            });
        }

        let intent: PaymentIntent =
            response
                .json()
                .await
                .map_err(|e| ServiceError::UpstreamPayment {
                    status: 502,
                    message: format!("{} returned an unreadable intent: {}", SYSTEM, e),
                })?;

        info!(intent_id = %intent.id, amount = amount_minor_units, "created payment intent");
        Ok(intent)
    }
}
