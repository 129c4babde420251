use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{errors::ServiceError, services::intake::OrderRequest};

use super::rewrite_auth_error;

const SYSTEM: &str = "Commerce system";

/// Result of creating an order upstream. Only the fields this flow needs:
/// the opaque order id and the authoritative total the commerce system
/// computed from its own catalog. The total comes back as upstream sent it
/// (string or number); the checkout service owns interpreting it.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub id: i64,
    pub total: Option<String>,
}

/// Status transition written back after payment verification.
#[derive(Debug, Clone, Serialize)]
pub struct OrderUpdate {
    pub status: String,
    pub transaction_ref: String,
}

impl OrderUpdate {
    pub fn processing(transaction_ref: impl Into<String>) -> Self {
        Self {
            status: "processing".to_string(),
            transaction_ref: transaction_ref.into(),
        }
    }
}

/// Contract this flow relies on from the commerce system: order creation
/// with authoritative pricing, and an idempotent status update.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder, ServiceError>;
    async fn update_order(&self, order_id: i64, update: OrderUpdate) -> Result<(), ServiceError>;
}

/// HTTP client for a WooCommerce-style REST API with consumer-key basic auth.
#[derive(Debug, Clone)]
pub struct HttpCommerceClient {
    http: reqwest::Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    status: &'a str,
    set_paid: bool,
    billing: &'a crate::services::intake::Address,
    shipping: &'a crate::services::intake::Address,
    line_items: Vec<LineItemBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_note: Option<&'a str>,
}

/// Only product id and quantity go upstream. Client-side prices are never
/// sent: the commerce system prices the order from its own catalog, and the
/// payment amount is derived from that quote alone.
#[derive(Debug, Serialize)]
struct LineItemBody<'a> {
    product_id: &'a str,
    quantity: i32,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: i64,
    #[serde(default)]
    total: Option<Value>,
}

impl HttpCommerceClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    fn transport_error(e: reqwest::Error) -> ServiceError {
        ServiceError::UpstreamCommerce {
            status: 502,
            message: format!("{} unreachable: {}", SYSTEM, e),
        }
    }

    async fn failure_from_response(response: reqwest::Response) -> ServiceError {
        let status = response.status().as_u16();
        let raw = response.text().await.unwrap_or_default();
        let message = extract_message(&raw);
        warn!(status = status, message = %message, "commerce request failed");
        ServiceError::UpstreamCommerce {
            status,
            message: rewrite_auth_error(SYSTEM, &message),
        }
    }
}

/// Pulls a human-readable message out of an upstream error body, falling
/// back to the raw text.
fn extract_message(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| {
            if raw.is_empty() {
                "upstream returned no error detail".to_string()
            } else {
                raw.to_string()
            }
        })
}

#[async_trait]
impl CommerceApi for HttpCommerceClient {
    #[instrument(skip(self, request))]
    async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder, ServiceError> {
        let body = CreateOrderBody {
            status: "pending",
            set_paid: false,
            billing: &request.billing,
            shipping: &request.shipping,
            line_items: request
                .line_items
                .iter()
                .map(|li| LineItemBody {
                    product_id: &li.product_id,
                    quantity: li.quantity,
                })
                .collect(),
            customer_note: request.note.as_deref(),
        };

        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::failure_from_response(response).await);
        }

        let order: OrderBody = response.json().await.map_err(|e| {
            ServiceError::UpstreamCommerce {
                status: 502,
                message: format!("{} returned an unreadable order: {}", SYSTEM, e),
            }
        })?;

        info!(order_id = %order.id, "created pending commerce order");

        let total = order.total.map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        });

        Ok(CreatedOrder {
            id: order.id,
            total,
        })
    }

    #[instrument(skip(self, update))]
    async fn update_order(&self, order_id: i64, update: OrderUpdate) -> Result<(), ServiceError> {
        // The commerce system treats a repeated status write as a no-op, so
        // re-verifying the same confirmation is safe.
        let body = serde_json::json!({
            "status": update.status,
            "transaction_id": update.transaction_ref,
        });

        let response = self
            .http
            .put(format!("{}/orders/{}", self.base_url, order_id))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::UpstreamUpdate(format!("{} unreachable: {}", SYSTEM, e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let raw = response.text().await.unwrap_or_default();
            let message = rewrite_auth_error(SYSTEM, &extract_message(&raw));
            warn!(order_id = %order_id, status = status, "order status update failed");
            return Err(ServiceError::UpstreamUpdate(message));
        }

        info!(order_id = %order_id, status = %update.status, "order status updated");
        Ok(())
    }
}
