//! Session configuration

use obd_protocol::{ObdProtocol, QueryId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a battery polling session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bus protocol selected on the adapter
    pub protocol: ObdProtocol,
    /// CAN address of the battery management ECU's responses
    pub receive_address: String,
    /// Wait between writing an AT command and reading its reply (ms)
    pub command_settle_ms: u64,
    /// Wait between writing a battery query and reading its reply (ms)
    pub query_settle_ms: u64,
    /// Pause between configuration commands (ms)
    pub init_gap_ms: u64,
    /// Pause between battery queries (ms)
    pub cycle_delay_ms: u64,
    /// Queries polled in turn
    pub queries: Vec<QueryId>,
    /// Stop after this many queries; poll forever when unset
    pub max_queries: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol: ObdProtocol::Can11bit500,
            receive_address: "7EC".to_string(),
            command_settle_ms: 200,
            query_settle_ms: 2000,
            init_gap_ms: 500,
            cycle_delay_ms: 2000,
            queries: QueryId::ALL.to_vec(),
            max_queries: None,
        }
    }
}

impl SessionConfig {
    /// Query each battery schema once, then stop
    pub fn single_pass() -> Self {
        Self {
            max_queries: Some(QueryId::ALL.len() as u64),
            ..Default::default()
        }
    }

    /// Wait after an AT command
    pub fn command_settle(&self) -> Duration {
        Duration::from_millis(self.command_settle_ms)
    }

    /// Wait after a battery query
    pub fn query_settle(&self) -> Duration {
        Duration::from_millis(self.query_settle_ms)
    }

    /// Pause between configuration commands
    pub fn init_gap(&self) -> Duration {
        Duration::from_millis(self.init_gap_ms)
    }

    /// Pause between battery queries
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }
}
