//! CVGen Gateway - Main entry point.

use anyhow::Result;
use cvgen_common::config::Config;
use cvgen_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration; a missing API key refuses to start here
    let config = Config::load()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("CVGen Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Start the gateway server
    cvgen_gateway::start_server(&config).await
}
