//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use wayfare_core::{ResponseCache, ScheduledSweep};

/// Requests served at once; the store serializes statements anyway.
const MAX_CONCURRENT_REQUESTS: usize = 64;

/// Application state shared across handlers.
pub struct AppState {
    pub cache: ResponseCache,
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(cache: ResponseCache, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState { cache });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

/// Check every `check_every` whether a scheduled sweep is due and run it.
///
/// The first check happens immediately.
pub fn spawn_sweep_scheduler(cache: ResponseCache, check_every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(check_every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let cache = cache.clone();
            match tokio::task::spawn_blocking(move || cache.sweep_if_due()).await {
                Ok(Ok(ScheduledSweep::Performed { report, .. })) => {
                    info!(
                        deleted = report.deleted_count,
                        "Scheduled cache sweep performed"
                    );
                }
                Ok(Ok(ScheduledSweep::NotDue { next_due_in, .. })) => {
                    debug!(?next_due_in, "Scheduled cache sweep not due");
                }
                Ok(Err(e)) => warn!("Scheduled cache sweep failed: {}", e),
                Err(e) => error!("Scheduled cache sweep task panicked: {}", e),
            }
        }
    })
}
