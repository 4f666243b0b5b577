//! Battery Polling Session

use crate::config::SessionConfig;
use obd_protocol::{
    classify, init_commands, ObdClient, ObdError, QueryId, ResponseStatus, TelemetryReport,
    Transport, LOW_POWER_COMMAND,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handed over, nothing sent yet
    Uninitialized,
    /// Sending the configuration commands
    Initializing,
    /// Adapter configured
    Ready,
    /// Battery queries in progress
    Polling,
    /// Transport released; terminal
    Disconnected,
}

/// Owns the adapter connection for its whole lifetime
pub struct BatterySession<T: Transport> {
    client: ObdClient<T>,
    config: SessionConfig,
    state: SessionState,
    queries_sent: u64,
}

impl<T: Transport> BatterySession<T> {
    /// Create a session over an opened transport
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            client: ObdClient::new(transport),
            config,
            state: SessionState::Uninitialized,
            queries_sent: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of battery queries sent so far
    pub fn queries_sent(&self) -> u64 {
        self.queries_sent
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        self.client.transport()
    }

    /// Send the adapter configuration commands in order
    ///
    /// The first bus fault aborts the session without sending the rest.
    pub async fn initialize(&mut self) -> Result<(), ObdError> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Disconnected => return Err(ObdError::NotConnected),
            _ => return Ok(()),
        }

        self.transition(SessionState::Initializing);
        let commands = init_commands(self.config.protocol, &self.config.receive_address);
        for command in &commands {
            let response = self.send(command, self.config.command_settle()).await?;
            if let ResponseStatus::Error(fault) = classify(&response) {
                error!("OBD2 error during initialization ({}): {}", command, response);
                self.close().await;
                return Err(ObdError::Bus(fault));
            }
            tokio::time::sleep(self.config.init_gap()).await;
        }

        self.transition(SessionState::Ready);
        info!("OBD adapter initialized with {} commands", commands.len());
        Ok(())
    }

    /// Send one battery query and decode its response
    ///
    /// Returns `None` when the vehicle had no data; the adapter is then told
    /// to enter low power mode. A payload that fails to decode yields a
    /// report with an empty record.
    pub async fn poll_once(&mut self, query: QueryId) -> Result<Option<TelemetryReport>, ObdError> {
        match self.state {
            SessionState::Ready | SessionState::Polling => {}
            SessionState::Disconnected => return Err(ObdError::NotConnected),
            _ => return Err(ObdError::NotInitialized),
        }
        self.transition(SessionState::Polling);

        let response = self.send(query.command(), self.config.query_settle()).await?;
        self.queries_sent += 1;

        match classify(&response) {
            ResponseStatus::Error(fault) => {
                error!("OBD2 error for query {}: {}", query, response);
                self.close().await;
                Err(ObdError::Bus(fault))
            }
            ResponseStatus::NoData => {
                warn!("No data for query {}, sending {} for low power mode", query, LOW_POWER_COMMAND);
                self.send(LOW_POWER_COMMAND, self.config.command_settle()).await?;
                Ok(None)
            }
            ResponseStatus::Ok => {
                let record = query.decode(&response).unwrap_or_else(|e| {
                    warn!("Failed to decode response to {}: {}", query, e);
                    Default::default()
                });
                debug!("Parsed {}: {}", query, record);
                Ok(Some(TelemetryReport::new(query, record)))
            }
        }
    }

    /// Configure the adapter, then poll the configured queries in turn
    ///
    /// Reports go to `report_tx` without blocking; a full channel drops the
    /// report. Polling ends after `max_queries`, when the receiver is gone,
    /// or on a fatal error. The transport is released on every exit path.
    pub async fn run(&mut self, report_tx: mpsc::Sender<TelemetryReport>) -> Result<(), ObdError> {
        let result = self.poll_loop(&report_tx).await;
        self.close().await;
        result
    }

    async fn poll_loop(&mut self, report_tx: &mpsc::Sender<TelemetryReport>) -> Result<(), ObdError> {
        self.initialize().await?;

        let queries = self.config.queries.clone();
        if queries.is_empty() {
            warn!("No queries configured");
            return Ok(());
        }
        info!("Starting battery polling: {:?}", queries);

        for query in queries.iter().copied().cycle() {
            if self.limit_reached() {
                break;
            }

            if let Some(report) = self.poll_once(query).await? {
                match report_tx.try_send(report) {
                    Ok(()) => {}
                    Err(TrySendError::Full(report)) => {
                        warn!("Report channel full, dropping {} report", report.query);
                    }
                    Err(TrySendError::Closed(_)) => {
                        info!("Report receiver dropped, stopping");
                        break;
                    }
                }
            }

            if !self.limit_reached() {
                tokio::time::sleep(self.config.cycle_delay()).await;
            }
        }

        info!("Battery polling stopped after {} queries", self.queries_sent);
        Ok(())
    }

    /// Release the transport; the session cannot be reused
    pub async fn close(&mut self) {
        if let Err(e) = self.client.disconnect().await {
            warn!("Error disconnecting: {}", e);
        }
        self.transition(SessionState::Disconnected);
    }

    async fn send(&mut self, command: &str, settle: Duration) -> Result<String, ObdError> {
        match self.client.send_command(command, settle).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!("Command {} failed: {}", command, e);
                self.close().await;
                Err(e)
            }
        }
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_queries
            .is_some_and(|max| self.queries_sent >= max)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
