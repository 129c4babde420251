use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::{
    errors::ApiError,
    handlers::common::{created_response, map_service_error, success_response, validate_input},
    services::{
        attempt::CheckoutPhase,
        intake::{self, CheckoutRequest},
    },
    AppState,
};

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(begin_checkout))
        .route("/checkout/:session_id/status", get(checkout_status))
}

/// Start checkout: validate the cart and addresses, create the pending
/// commerce order, and create the matching payment intent.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Checkout initiated; open the capture widget with the returned fields", body = crate::services::checkout::CheckoutInitiation),
        (status = 400, description = "Cart empty or addresses incomplete", body = crate::errors::ErrorResponse),
        (status = 422, description = "Commerce system quoted an unusable total", body = crate::errors::ErrorResponse),
        (status = 502, description = "Upstream system failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn begin_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let session_id = payload.session_id.clone();
    let cart = state.cart_store.get(&session_id);

    // Intake failures block before any network call and leave the attempt
    // in Draft.
    let order_request =
        intake::build_order_request(&cart, &payload).map_err(map_service_error)?;

    state
        .attempts
        .transition(&session_id, CheckoutPhase::PendingUpstream, None);

    match state.checkout.begin(&session_id, order_request).await {
        Ok(initiation) => {
            state.attempts.transition(
                &session_id,
                CheckoutPhase::AwaitingCapture,
                Some(initiation.commerce_order_id),
            );
            Ok(created_response(initiation))
        }
        Err(e) => {
            state
                .attempts
                .transition(&session_id, CheckoutPhase::Stalled, None);
            Err(map_service_error(e))
        }
    }
}

/// Report where the session's checkout attempt stands
#[utoipa::path(
    get,
    path = "/api/v1/checkout/{session_id}/status",
    params(("session_id" = String, Path, description = "Storefront session id")),
    responses((status = 200, description = "Current attempt phase", body = crate::services::attempt::Attempt)),
    tag = "Checkout"
)]
pub async fn checkout_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.attempts.get(&session_id)))
}
