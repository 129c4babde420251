use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    clients::{CommerceApi, PaymentGateway},
    errors::ServiceError,
    events::{Event, EventSender},
    services::intake::OrderRequest,
};

/// Everything the storefront needs to open the capture widget, plus the
/// commerce order id it will hand back at verification time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutInitiation {
    pub commerce_order_id: i64,
    pub payment_intent_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    /// Public gateway key for constructing the capture widget
    pub gateway_key_id: String,
}

/// Upstream order creator: turns a validated [`OrderRequest`] into a pending
/// commerce order with a matching payment intent. One exposed operation, two
/// sequential upstream writes.
#[derive(Clone)]
pub struct CheckoutService {
    commerce: Arc<dyn CommerceApi>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: EventSender,
    gateway_key_id: String,
    currency: String,
    minimum_charge_minor_units: i64,
}

impl CheckoutService {
    pub fn new(
        commerce: Arc<dyn CommerceApi>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
        gateway_key_id: String,
        currency: String,
        minimum_charge_minor_units: i64,
    ) -> Self {
        Self {
            commerce,
            gateway,
            event_sender,
            gateway_key_id,
            currency,
            minimum_charge_minor_units,
        }
    }

    /// Creates the pending commerce order, re-derives the payment amount
    /// from the order's authoritative total, and creates the matching
    /// payment intent at the gateway.
    ///
    /// The amount is always taken from the commerce system's quote, never
    /// from client input. If the gateway leg fails after the order was
    /// created, the pending order is left upstream for its expiry policy to
    /// collect; there is no rollback.
    #[instrument(skip(self, request), fields(session_id = %session_id))]
    pub async fn begin(
        &self,
        session_id: &str,
        request: OrderRequest,
    ) -> Result<CheckoutInitiation, ServiceError> {
        let order = match self.commerce.create_order(&request).await {
            Ok(order) => order,
            Err(e) => {
                self.stalled(session_id, None, &e).await;
                return Err(e);
            }
        };

        self.event_sender
            .send_or_log(Event::CheckoutStarted {
                session_id: session_id.to_string(),
                order_id: order.id,
            })
            .await;

        let total = parse_quoted_total(order.total.as_deref()).map_err(|e| {
            warn!(order_id = %order.id, error = %e, "commerce order carried an unusable total");
            e
        })?;

        let amount_minor_units = to_minor_units(total)?;
        if amount_minor_units < self.minimum_charge_minor_units {
            return Err(ServiceError::MinimumAmount(
                amount_minor_units,
                self.minimum_charge_minor_units,
            ));
        }

        // Receipt embeds the commerce order id so an operator can correlate
        // the two records without a database join.
        let receipt = format!("rcpt_order_{}", order.id);
        let intent = match self
            .gateway
            .create_payment_intent(amount_minor_units, &self.currency, &receipt)
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                // Known gap: the pending order is not rolled back here.
                warn!(
                    order_id = %order.id,
                    "payment intent creation failed after order creation; \
                     pending order left for upstream expiry"
                );
                self.stalled(session_id, Some(order.id), &e).await;
                return Err(e);
            }
        };

        self.event_sender
            .send_or_log(Event::PaymentIntentCreated {
                order_id: order.id,
                intent_id: intent.id.clone(),
                amount_minor_units,
            })
            .await;

        info!(
            order_id = %order.id,
            intent_id = %intent.id,
            amount = amount_minor_units,
            "checkout initiated"
        );

        Ok(CheckoutInitiation {
            commerce_order_id: order.id,
            payment_intent_id: intent.id,
            amount_minor_units,
            currency: self.currency.clone(),
            gateway_key_id: self.gateway_key_id.clone(),
        })
    }

    async fn stalled(&self, session_id: &str, order_id: Option<i64>, error: &ServiceError) {
        self.event_sender
            .send_or_log(Event::CheckoutStalled {
                session_id: session_id.to_string(),
                order_id,
                reason: error.to_string(),
            })
            .await;
    }
}

/// Parses the total quoted by the commerce system. A missing, non-numeric,
/// or non-positive total indicates a bug or tampering, never a retryable
/// condition.
fn parse_quoted_total(total: Option<&str>) -> Result<Decimal, ServiceError> {
    let raw = total
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::InvalidTotal("order total is missing".to_string()))?;

    let total: Decimal = raw
        .parse()
        .map_err(|_| ServiceError::InvalidTotal(format!("order total '{}' is not numeric", raw)))?;

    if total <= Decimal::ZERO {
        return Err(ServiceError::InvalidTotal(format!(
            "order total must be positive, got {}",
            total
        )));
    }

    Ok(total)
}

/// Converts a major-unit total to the gateway's minor currency unit
/// (multiply by 100, round to nearest integer, midpoints away from zero).
/// `Decimal::round` is midpoint-to-even and would round a half-paisa down.
fn to_minor_units(total: Decimal) -> Result<i64, ServiceError> {
    (total * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            ServiceError::InvalidTotal(format!("order total {} overflows the gateway amount", total))
        })
}
