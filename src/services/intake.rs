use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{errors::ServiceError, services::cart::Cart};

/// Postal address as submitted by the storefront and forwarded upstream.
/// Intake checks presence only; field formats (email included) are the
/// commerce system's call, like everything else about the order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Address {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// Street address (line 1)
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub country: String,
}

/// Checkout submission: the session whose cart becomes the order, plus the
/// address form state.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(length(min = 1))]
    pub session_id: String,
    pub billing: Address,
    /// When set, `shipping` must be provided and is used instead of billing.
    #[serde(default)]
    pub ship_to_different_address: bool,
    #[serde(default)]
    pub shipping: Option<Address>,
    #[serde(default)]
    pub note: Option<String>,
}

/// One order line as sent upstream. The unit price is carried for the local
/// record only; the commerce system prices the order itself.
#[derive(Debug, Clone, Serialize)]
pub struct RequestLineItem {
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Validated draft order, constructed at checkout time from the cart and
/// address form state. Transient: sent straight to the commerce system,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub billing: Address,
    pub shipping: Address,
    pub line_items: Vec<RequestLineItem>,
    pub note: Option<String>,
}

fn missing_billing_fields(address: &Address) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if address.first_name.trim().is_empty() {
        missing.push("first_name");
    }
    if address.email.trim().is_empty() {
        missing.push("email");
    }
    if address.phone.trim().is_empty() {
        missing.push("phone");
    }
    if address.address.trim().is_empty() {
        missing.push("address");
    }
    missing
}

fn missing_shipping_fields(address: &Address) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if address.first_name.trim().is_empty() {
        missing.push("first_name");
    }
    if address.address.trim().is_empty() {
        missing.push("address");
    }
    missing
}

/// Checks that a cart and address pair are checkout-eligible and produces
/// the draft order. Runs entirely locally: a failure here guarantees no
/// upstream call was made.
pub fn build_order_request(cart: &Cart, request: &CheckoutRequest) -> Result<OrderRequest, ServiceError> {
    if cart.is_empty() {
        return Err(ServiceError::ValidationError(
            "cart is empty; nothing to check out".to_string(),
        ));
    }

    let missing = missing_billing_fields(&request.billing);
    if !missing.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "billing address is missing required fields: {}",
            missing.join(", ")
        )));
    }

    let shipping = if request.ship_to_different_address {
        let shipping = request.shipping.clone().ok_or_else(|| {
            ServiceError::ValidationError(
                "shipping address is missing required fields: first_name, address".to_string(),
            )
        })?;
        let missing = missing_shipping_fields(&shipping);
        if !missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "shipping address is missing required fields: {}",
                missing.join(", ")
            )));
        }
        shipping
    } else {
        request.billing.clone()
    };

    let line_items = cart
        .lines
        .iter()
        .map(|line| RequestLineItem {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
        .collect();

    Ok(OrderRequest {
        billing: request.billing.clone(),
        shipping,
        line_items,
        note: request.note.clone(),
    })
}
