//! Clients for the two external systems this flow writes to: the commerce
//! system (order of record) and the payment gateway. Each is a trait so the
//! checkout and verification services can be exercised against test doubles.

pub mod commerce;
pub mod gateway;

pub use commerce::{CommerceApi, CreatedOrder, HttpCommerceClient, OrderUpdate};
pub use gateway::{HttpGatewayClient, PaymentGateway, PaymentIntent};

use once_cell::sync::Lazy;
use regex::Regex;

static AUTH_FAILURE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(authenticat|unauthori[sz]ed|forbidden|consumer[ _]?key|api[ _]?key|invalid key|signature mismatch|\b401\b)")
        .expect("auth failure pattern must compile")
});

/// Rewrites authentication-looking upstream errors into an operator-facing
/// configuration hint instead of exposing the raw message to the end user.
pub(crate) fn rewrite_auth_error(system: &str, message: &str) -> String {
    if AUTH_FAILURE_PATTERN.is_match(message) {
        format!(
            "{} rejected our credentials. This is a server configuration problem; \
             an operator needs to check the configured API keys.",
            system
        )
    } else {
        message.to_string()
    }
}
