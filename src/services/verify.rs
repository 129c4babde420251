use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    clients::{CommerceApi, OrderUpdate},
    errors::ServiceError,
    events::{outbox::NotificationOutbox, Event, EventSender},
    services::cart::CartStore,
};

type HmacSha256 = Hmac<Sha256>;

/// Signed confirmation handed back by the capture widget. All fields arrive
/// from the client and are checked for presence before anything else;
/// consumed exactly once per verification call.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub commerce_order_id: Option<i64>,
    /// Session whose cart is cleared after a successful verification.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerificationOutcome {
    pub commerce_order_id: i64,
    pub payment_id: String,
    pub order_status: String,
}

/// Payment verifier: the security boundary between the capture widget's
/// callback and the order of record.
///
/// Recomputes the HMAC-SHA256 signature over `intent_id|payment_id` with the
/// server-held gateway secret and, only on a match, transitions the commerce
/// order to `processing`. Verification is idempotent in effect but not
/// deduplicated; the commerce system's status update is assumed idempotent.
#[derive(Clone)]
pub struct PaymentVerifier {
    commerce: Arc<dyn CommerceApi>,
    cart_store: CartStore,
    outbox: NotificationOutbox,
    event_sender: EventSender,
    gateway_key_secret: String,
}

impl PaymentVerifier {
    pub fn new(
        commerce: Arc<dyn CommerceApi>,
        cart_store: CartStore,
        outbox: NotificationOutbox,
        event_sender: EventSender,
        gateway_key_secret: String,
    ) -> Self {
        Self {
            commerce,
            cart_store,
            outbox,
            event_sender,
            gateway_key_secret,
        }
    }

    #[instrument(skip(self, confirmation))]
    pub async fn verify(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<VerificationOutcome, ServiceError> {
        let intent_id = require(confirmation.payment_intent_id, "payment_intent_id")?;
        let payment_id = require(confirmation.payment_id, "payment_id")?;
        let signature = require(confirmation.signature, "signature")?;
        let order_id = confirmation
            .commerce_order_id
            .ok_or_else(|| ServiceError::MissingField("commerce_order_id".to_string()))?;

        let expected = sign(&self.gateway_key_secret, &intent_id, &payment_id);
        if !constant_time_eq(&expected, &signature) {
            // Fail closed: no order mutation, and the client-facing message
            // stays generic.
            warn!(order_id = %order_id, "payment signature mismatch");
            self.event_sender
                .send_or_log(Event::PaymentRejected { order_id })
                .await;
            return Err(ServiceError::InvalidSignature);
        }

        if let Err(e) = self
            .commerce
            .update_order(order_id, OrderUpdate::processing(payment_id.clone()))
            .await
        {
            // The payment is genuine but the order record does not reflect
            // it: a reconciliation gap needing manual operator follow-up.
            warn!(
                order_id = %order_id,
                payment_id = %payment_id,
                "payment verified but order status update failed"
            );
            return Err(e);
        }

        if let Some(session_id) = confirmation.session_id.as_deref() {
            self.cart_store.clear(session_id);
        }

        self.event_sender
            .send_or_log(Event::PaymentVerified {
                order_id,
                payment_id: payment_id.clone(),
            })
            .await;
        self.outbox.notify_order_confirmed(order_id, &payment_id);

        info!(order_id = %order_id, "order confirmed");

        Ok(VerificationOutcome {
            commerce_order_id: order_id,
            payment_id,
            order_status: "processing".to_string(),
        })
    }
}

fn require(value: Option<String>, field: &str) -> Result<String, ServiceError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ServiceError::MissingField(field.to_string()))
}

/// Hex-encoded HMAC-SHA256 over `intent_id + "|" + payment_id`.
pub fn sign(secret: &str, intent_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(intent_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
