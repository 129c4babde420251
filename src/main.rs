use std::{sync::Arc, time::Duration};

use tokio::{signal, sync::mpsc};
use tracing::info;

use veda_checkout as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Shared HTTP client for both upstream systems
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.upstream_timeout_secs))
        .build()?;

    let commerce = Arc::new(api::clients::HttpCommerceClient::new(
        http.clone(),
        cfg.commerce_base_url.clone(),
        cfg.commerce_consumer_key.clone(),
        cfg.commerce_consumer_secret.clone(),
    ));
    let gateway = Arc::new(api::clients::HttpGatewayClient::new(
        http,
        cfg.gateway_base_url.clone(),
        cfg.gateway_key_id.clone(),
        cfg.gateway_key_secret.clone(),
    ));

    let state = api::build_state(cfg.clone(), commerce, gateway, event_sender);
    tokio::spawn(evict_idle_sessions(
        state.cart_store.clone(),
        state.attempts.clone(),
        chrono::Duration::seconds(cfg.session_ttl_secs),
    ));
    let app = api::app(state);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("veda-checkout listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

/// Janitor: sweeps carts and checkout attempts that sat idle past the
/// configured TTL. Both stores are in-process, so without this they would
/// grow with every session id ever seen.
async fn evict_idle_sessions(
    carts: veda_checkout::services::cart::CartStore,
    attempts: veda_checkout::services::attempt::AttemptTracker,
    ttl: chrono::Duration,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(600));
    loop {
        interval.tick().await;
        let evicted_carts = carts.evict_idle(ttl);
        let evicted_attempts = attempts.evict_idle(ttl);
        if evicted_carts > 0 || evicted_attempts > 0 {
            info!(
                carts = evicted_carts,
                attempts = evicted_attempts,
                "evicted idle sessions"
            );
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c; shutting down"),
        _ = terminate => info!("Received SIGTERM; shutting down"),
    }
}
