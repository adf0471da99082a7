//! Spike Data Cleaner - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.log_level, config.log_json).map_err(|err| anyhow::anyhow!(err))?;

    info!("=== Spike Data Cleaner v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Sanitizer threshold {} std devs, database {}",
        config.sanitizer.threshold, config.database_url
    );

    run_server(config).await
}
