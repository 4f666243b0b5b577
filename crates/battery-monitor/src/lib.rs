//! EV Battery Monitor
//!
//! Opens the adapter, runs a battery polling session and prints every
//! surfaced telemetry report to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use obd_protocol::{MockTransport, SerialTransport, TelemetryReport, Transport};
use obd_session::{BatterySession, SessionConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "battery-monitor";

/// Prefix of environment overrides, e.g. `BATTERY_MONITOR__DEVICE`
pub const ENV_PREFIX: &str = "BATTERY_MONITOR";

const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Serial port device path (e.g. "/dev/rfcomm0" or "COM5")
    pub device: String,
    /// Baud rate for serial communication
    pub baud_rate: u32,
    /// Serial read timeout (ms)
    pub read_timeout_ms: u64,
    /// Replay the sample session instead of opening the device
    pub mock: bool,
    /// Print reports as JSON lines
    pub json: bool,
    /// Polling session settings
    pub session: SessionConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: "/dev/rfcomm0".to_string(),
            baud_rate: 115200,
            read_timeout_ms: 1000,
            mock: false,
            json: false,
            session: SessionConfig::default(),
        }
    }
}

/// Load configuration from an optional file and the environment
///
/// Without `path`, `battery-monitor.{toml,yaml,json}` is used if present.
pub fn load_config(path: Option<&str>) -> Result<MonitorConfig> {
    let file = config::File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(path.is_some());
    let env = config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("session.queries");

    config::Config::builder()
        .add_source(file)
        .add_source(env)
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

/// Initialize logging, honouring `RUST_LOG`
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Open the configured transport and monitor until done or interrupted
pub async fn run(config: MonitorConfig) -> Result<()> {
    if config.mock {
        info!("Mock mode: replaying the sample session");
        return monitor(MockTransport::sample_session(), config).await;
    }

    let transport = SerialTransport::open(
        &config.device,
        config.baud_rate,
        Duration::from_millis(config.read_timeout_ms),
    )
    .with_context(|| format!("Could not establish connection to the OBD2 adapter on {}", config.device))?;
    monitor(transport, config).await
}

async fn monitor<T: Transport>(transport: T, config: MonitorConfig) -> Result<()> {
    let mut session = BatterySession::new(transport, config.session);
    let (report_tx, mut report_rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY);

    let json = config.json;
    let printer = tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            match format_report(&report, json) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Could not format report: {}", e),
            }
        }
    });

    let outcome = tokio::select! {
        result = session.run(report_tx) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let result = match outcome {
        Some(result) => result,
        None => {
            info!("Interrupted, closing the adapter connection");
            session.close().await;
            Ok(())
        }
    };

    if let Err(e) = printer.await {
        warn!("Report printer stopped abnormally: {}", e);
    }
    result.context("Battery session ended with an error")
}

/// Render a report as a JSON line or as `query: FIELD=value, ...`
pub fn format_report(report: &TelemetryReport, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(report)?);
    }
    if report.record.is_empty() {
        Ok(format!("{}: no decodable data", report.query))
    } else {
        Ok(format!("{}: {}", report.query, report.record))
    }
}
