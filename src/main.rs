//! LearnFlow · Study Plan Backend
//!
//! - Axum HTTP API
//! - Gemini text generation, split into study plan / flashcards / practice / motivation
//! - Anki deck export for generated flashcards
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   GEMINI_API_KEY         : required
//!   GEMINI_BASE_URL        : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL           : default "gemini-2.0-flash"
//!   ORACLE_TIMEOUT_SECS    : default 60
//!   PORT                   : u16 (default 8001)
//!   LEARNFLOW_CONFIG_PATH  : optional TOML config (see `config`)
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

mod config;
mod deck;
mod domain;
mod error;
mod gemini;
mod logic;
mod oracle;
mod prompt;
mod protocol;
mod routes;
mod splitter;
mod state;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env().map_err(|e| {
    error!(target: "learnflow", error = %e, "Refusing to start");
    e
  })?;

  let state = Arc::new(AppState::new(&settings)?);
  let app = build_router(state, &settings.static_dir);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "learnflow", %addr, static_dir = %settings.static_dir, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "learnflow", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "learnflow", "Shutdown signal received");
}
