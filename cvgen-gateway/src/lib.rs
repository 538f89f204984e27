//! CVGen Gateway - HTTP backend for the CV generator website.
//!
//! This crate provides the chat service behind the site's built-in AI
//! assistant:
//! - Per-session conversation memory with bounded history and idle eviction
//! - Chat orchestration over an abstract completion provider (OpenAI)
//! - JSON API (`/api/ping`, `/api/warm`, `/api/chat`) plus the static front-end
//! - Background eviction sweep and optional keep-alive self-ping
//!
//! ## Architecture
//!
//! ```text
//! Client → Gateway (validate → session memory → prompt) → OpenAI
//!                         ↓
//!                  Store the reply
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod chat;
pub mod provider;
pub mod routes;
pub mod session;
pub mod tasks;

pub use chat::{ChatOrchestrator, ChatOutcome, FALLBACK_REPLY};
pub use provider::{Completion, CompletionProvider, CompletionRequest, OpenAiProvider, ProviderError};
pub use routes::{build_router, AppState};
pub use session::{Role, SessionStore, Turn};
pub use tasks::BackgroundTasks;

use cvgen_common::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Start the gateway server; runs until SIGINT.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.server.bind.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let state = AppState::from_config(config)?;
    let tasks = BackgroundTasks::spawn(Arc::clone(state.store()), config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = build_router(state, &config.server.static_dir).layer(cors);

    tracing::info!("Starting CVGen Gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
