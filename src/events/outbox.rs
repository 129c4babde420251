//! Post-commit notification outbox.
//!
//! After the payment verifier transitions an order to `processing`, operators
//! may want an external system (CRM, messaging) to hear about it. The outbox
//! sends that webhook as a detached, best-effort call: it runs after the
//! primary transition has committed and its failure never rolls the
//! transition back or fails the request.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct NotificationOutbox {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl NotificationOutbox {
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            webhook_url,
        }
    }

    /// Fires the order-confirmed notification in a detached task.
    pub fn notify_order_confirmed(&self, order_id: i64, payment_id: &str) {
        let Some(url) = self.webhook_url.clone() else {
            debug!(order_id = %order_id, "notification webhook not configured; skipping");
            return;
        };

        let client = self.client.clone();
        let payment_id = payment_id.to_string();
        tokio::spawn(async move {
            let payload = json!({
                "event": "order.confirmed",
                "order_id": order_id,
                "payment_id": payment_id,
                "occurred_at": chrono::Utc::now().to_rfc3339(),
            });

            match client.post(&url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(order_id = %order_id, "order-confirmed notification delivered");
                }
                Ok(resp) => {
                    warn!(
                        order_id = %order_id,
                        status = %resp.status(),
                        "order-confirmed notification rejected by receiver"
                    );
                }
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "order-confirmed notification failed");
                }
            }
        });
    }
}
