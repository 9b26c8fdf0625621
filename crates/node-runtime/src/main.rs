//! Certen validator entry point.

use anyhow::Context;
use node_runtime::NodeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    info!(config = %config_path, "starting Certen validator");

    let config = NodeConfig::load(&config_path)
        .with_context(|| format!("cannot load configuration from {config_path}"))?;
    info!(
        validator = %config.validator.id,
        chains = config.chains.len(),
        peers = config.peers.len(),
        "configuration loaded"
    );

    node_runtime::run(config).await
}
