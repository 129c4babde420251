//! Veda Checkout API Library
//!
//! Orchestrates the order-payment reconciliation flow for a headless
//! storefront: session carts feed an order intake, which drives two
//! sequential upstream writes (commerce order, then payment intent); the
//! payment verifier confirms the signed capture callback before the order
//! is marked processing.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod clients;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod request_id;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderValue, middleware, routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use clients::{CommerceApi, PaymentGateway};
use events::{outbox::NotificationOutbox, EventSender};
use services::{
    attempt::AttemptTracker, cart::CartStore, checkout::CheckoutService, verify::PaymentVerifier,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub cart_store: CartStore,
    pub attempts: AttemptTracker,
    pub checkout: CheckoutService,
    pub verifier: PaymentVerifier,
    pub event_sender: EventSender,
}

/// Wires the service graph over the given upstream clients. The clients are
/// trait objects so tests can substitute doubles.
pub fn build_state(
    config: config::AppConfig,
    commerce: Arc<dyn CommerceApi>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: EventSender,
) -> AppState {
    let cart_store = CartStore::new();
    let attempts = AttemptTracker::new();
    let outbox = NotificationOutbox::new(
        config.notification_webhook_url.clone(),
        Duration::from_secs(config.upstream_timeout_secs),
    );

    let checkout = CheckoutService::new(
        commerce.clone(),
        gateway,
        event_sender.clone(),
        config.gateway_key_id.clone(),
        config.currency.clone(),
        config.minimum_charge_minor_units,
    );

    let verifier = PaymentVerifier::new(
        commerce,
        cart_store.clone(),
        outbox,
        event_sender.clone(),
        config.gateway_key_secret.clone(),
    );

    AppState {
        config,
        cart_store,
        attempts,
        checkout,
        verifier,
        event_sender,
    }
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    if config.cors_allow_any_origin || config.is_development() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|o| o.trim().parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Builds the application router with all routes and middleware
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(handlers::carts::cart_routes())
        .merge(handlers::checkout::checkout_routes())
        .merge(handlers::payments::payment_routes());

    Router::new()
        .route("/status", get(handlers::health::api_status))
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(middleware::from_fn(request_id::propagate_request_id))
        .layer(TraceLayer::new_for_http().make_span_with(request_id::RequestSpanMaker))
        .layer(cors_layer(&state.config))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
