use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fm_agent::config::AppConfig;
use fm_agent::server;
use fm_agent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::parse();
    info!(
        databricks_configured = config.databricks_configured(),
        model = %config.default_model,
        max_traces = config.max_traces,
        "starting agent service"
    );

    let state = AppState::from_config(config)?;
    server::serve(state).await
}
