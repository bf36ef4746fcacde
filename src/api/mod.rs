//! Liveness endpoint
//!
//! A minimal HTTP responder used only for uptime probing. It reports
//! process liveness, nothing about gateway or ticket state.

use axum::{Router, routing::get};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Body returned by the probe route
const ALIVE_BODY: &str = "Bot is alive!";

/// The liveness router: `GET /` returns a static body
#[must_use]
pub fn router() -> Router {
    Router::new().route("/", get(|| async { ALIVE_BODY }))
}

/// Bind and serve the liveness endpoint until the process exits
pub async fn serve(addr: SocketAddr) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "liveness endpoint listening");
    axum::serve(listener, router()).await
}
