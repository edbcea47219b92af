use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::commands::{chat, health, tools, traces};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/agent/chat", post(chat::agent_chat))
        .route("/agent/tools", get(tools::list_tools))
        .route("/agent/tools/reload", post(tools::reload_tools))
        .route("/traces/list", get(traces::list_traces))
        .route("/traces/:trace_id", get(traces::get_trace))
        .route("/health", get(health::health));

    Router::new().nest("/api", api).with_state(state)
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
