use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod outbox;

/// Events emitted by the checkout flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartLineAdded {
        session_id: String,
        product_id: String,
        quantity: i32,
    },
    CartUpdated(String),
    CartCleared(String),

    // Checkout events
    CheckoutStarted {
        session_id: String,
        order_id: i64,
    },
    PaymentIntentCreated {
        order_id: i64,
        intent_id: String,
        amount_minor_units: i64,
    },
    CheckoutStalled {
        session_id: String,
        order_id: Option<i64>,
        reason: String,
    },

    // Payment events
    PaymentVerified {
        order_id: i64,
        payment_id: String,
    },
    PaymentRejected {
        order_id: i64,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is gone.
    /// Event delivery is never allowed to fail a request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event not delivered: {}", e);
        }
    }
}

/// Background consumer for the event channel. Records every event as a
/// structured log line; the outbox handles external delivery separately.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PaymentVerified {
                order_id,
                payment_id,
            } => {
                info!(order_id = %order_id, payment_id = %payment_id, "payment verified");
            }
            Event::PaymentRejected { order_id } => {
                warn!(order_id = %order_id, "payment confirmation rejected");
            }
            Event::CheckoutStalled {
                session_id,
                order_id,
                reason,
            } => {
                warn!(
                    session_id = %session_id,
                    order_id = ?order_id,
                    reason = %reason,
                    "checkout attempt stalled"
                );
            }
            other => {
                info!(event = ?other, "event");
            }
        }
    }
    info!("Event channel closed; processor exiting");
}
