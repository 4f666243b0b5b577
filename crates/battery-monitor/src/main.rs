//! EV Battery Monitor - Main Entry Point
//!
//! Usage: `battery-monitor [CONFIG_FILE]`

use battery_monitor::{init_logging, load_config, run};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== EV Battery Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref())?;
    info!(
        "Adapter {} at {} baud, polling {:?}",
        config.device, config.baud_rate, config.session.queries
    );

    run(config).await
}
