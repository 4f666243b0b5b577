//! Battery Telemetry Session Controller
//!
//! Configures an ELM327 adapter, then alternates the battery queries,
//! surfacing decoded telemetry over a channel until told to stop or the
//! adapter reports a bus fault.

mod config;
mod session;

pub use config::SessionConfig;
pub use session::{BatterySession, SessionState};
