use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    errors::ApiError,
    events::Event,
    handlers::common::{no_content_response, success_response},
    services::cart::AddLineInput,
    AppState,
};

/// Creates the router for cart endpoints
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/carts/:session_id", get(get_cart).delete(clear_cart))
        .route("/carts/:session_id/items", post(add_line))
        .route(
            "/carts/:session_id/items/:product_id",
            put(update_quantity).delete(remove_line),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

/// Fetch the session cart with derived totals
#[utoipa::path(
    get,
    path = "/api/v1/carts/{session_id}",
    params(("session_id" = String, Path, description = "Storefront session id")),
    responses((status = 200, description = "Cart snapshot", body = crate::services::cart::Cart)),
    tag = "Carts"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.cart_store.get(&session_id)))
}

/// Add a line to the cart (merges by product id)
#[utoipa::path(
    post,
    path = "/api/v1/carts/{session_id}/items",
    params(("session_id" = String, Path, description = "Storefront session id")),
    request_body = AddLineInput,
    responses((status = 200, description = "Updated cart", body = crate::services::cart::Cart)),
    tag = "Carts"
)]
pub async fn add_line(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<AddLineInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product_id = payload.product_id.clone();
    let quantity = payload.quantity;
    let cart = state.cart_store.add_line(&session_id, payload);

    state
        .event_sender
        .send_or_log(Event::CartLineAdded {
            session_id,
            product_id,
            quantity,
        })
        .await;

    Ok(success_response(cart))
}

/// Set a line's quantity; zero or less removes the line
#[utoipa::path(
    put,
    path = "/api/v1/carts/{session_id}/items/{product_id}",
    params(
        ("session_id" = String, Path, description = "Storefront session id"),
        ("product_id" = String, Path, description = "Product id of the line")
    ),
    request_body = UpdateQuantityRequest,
    responses((status = 200, description = "Updated cart", body = crate::services::cart::Cart)),
    tag = "Carts"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    Path((session_id, product_id)): Path<(String, String)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .cart_store
        .update_quantity(&session_id, &product_id, payload.quantity);

    state
        .event_sender
        .send_or_log(Event::CartUpdated(session_id))
        .await;

    Ok(success_response(cart))
}

/// Remove a line from the cart
#[utoipa::path(
    delete,
    path = "/api/v1/carts/{session_id}/items/{product_id}",
    params(
        ("session_id" = String, Path, description = "Storefront session id"),
        ("product_id" = String, Path, description = "Product id of the line")
    ),
    responses((status = 200, description = "Updated cart", body = crate::services::cart::Cart)),
    tag = "Carts"
)]
pub async fn remove_line(
    State(state): State<AppState>,
    Path((session_id, product_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state.cart_store.remove_line(&session_id, &product_id);

    state
        .event_sender
        .send_or_log(Event::CartUpdated(session_id))
        .await;

    Ok(success_response(cart))
}

/// Clear the session cart
#[utoipa::path(
    delete,
    path = "/api/v1/carts/{session_id}",
    params(("session_id" = String, Path, description = "Storefront session id")),
    responses((status = 204, description = "Cart cleared")),
    tag = "Carts"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.cart_store.clear(&session_id);

    state
        .event_sender
        .send_or_log(Event::CartCleared(session_id))
        .await;

    Ok(no_content_response())
}
