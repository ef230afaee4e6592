//! HTTP server wiring: routes and the serve loop.

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::handlers;
use crate::state::Registry;

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Build the full API router.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/join", post(handlers::join::join))
        .route("/poll", get(handlers::poll::poll))
        .route("/send", post(handlers::send::send))
        .route("/edit", post(handlers::edit::edit))
        .route("/delete-message", post(handlers::delete_message::delete_message))
        .route("/pin", post(handlers::pin::pin))
        .route("/admin", post(handlers::admin::admin))
        .route("/leave", post(handlers::leave::leave))
        .route("/clear", post(handlers::clear::clear))
        .route("/rooms", get(handlers::rooms::rooms))
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}

/// Bind and run the HTTP server. This is the long-running foreground
/// task of the process.
pub async fn serve(addr: SocketAddr, registry: Arc<Registry>) -> anyhow::Result<()> {
    let app = router(registry);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "roomd HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
