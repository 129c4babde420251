use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};

use crate::{
    errors::{ApiError, ServiceError},
    handlers::common::{map_service_error, success_response},
    services::{attempt::CheckoutPhase, verify::PaymentConfirmation},
    AppState,
};

/// Creates the router for payment endpoints
pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/payments/verify", post(verify_payment))
}

/// Verify a payment confirmation from the capture widget.
///
/// Recomputes the signature server-side; only a byte-for-byte match
/// transitions the commerce order to `processing`.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = PaymentConfirmation,
    responses(
        (status = 200, description = "Payment verified; order is processing", body = crate::services::verify::VerificationOutcome),
        (status = 400, description = "Missing fields or verification failed", body = crate::errors::ErrorResponse),
        (status = 502, description = "Order status update failed after verification", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(confirmation): Json<PaymentConfirmation>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = confirmation.session_id.clone();

    if let Some(sid) = session_id.as_deref() {
        state.attempts.transition(sid, CheckoutPhase::Verifying, None);
    }

    match state.verifier.verify(confirmation).await {
        Ok(outcome) => {
            if let Some(sid) = session_id.as_deref() {
                state.attempts.transition(
                    sid,
                    CheckoutPhase::Confirmed,
                    Some(outcome.commerce_order_id),
                );
            }
            Ok(success_response(outcome))
        }
        Err(e) => {
            if let Some(sid) = session_id.as_deref() {
                let phase = match e {
                    ServiceError::InvalidSignature => CheckoutPhase::Rejected,
                    _ => CheckoutPhase::Stalled,
                };
                state.attempts.transition(sid, phase, None);
            }
            Err(map_service_error(e))
        }
    }
}
