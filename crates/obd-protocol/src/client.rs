//! OBD-II Client for ELM327 Adapters
//!
//! One outstanding command at a time: write, wait a fixed settle delay while
//! the adapter aggregates the CAN frames, then read whatever it buffered.

use crate::error::ObdError;
use crate::protocol::COMMAND_TERMINATOR;
use crate::transport::Transport;
use std::time::Duration;
use tracing::{debug, info};

/// OBD-II client for communicating with ELM327-compatible adapters
pub struct ObdClient<T: Transport> {
    transport: T,
}

impl<T: Transport> ObdClient<T> {
    /// Wrap an already opened transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send a command and return its whitespace-stripped response
    pub async fn send_command(&mut self, command: &str, settle: Duration) -> Result<String, ObdError> {
        debug!("Sending: {}", command);
        let framed = format!("{command}{COMMAND_TERMINATOR}");
        self.transport.write(framed.as_bytes()).await?;

        tokio::time::sleep(settle).await;

        let bytes = self.transport.read_available().await?;
        let text = String::from_utf8_lossy(&bytes);
        debug!("Received: {}", text.trim());
        Ok(text.chars().filter(|c| !c.is_whitespace()).collect())
    }

    /// Check if the transport is still open
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Release the transport
    pub async fn disconnect(&mut self) -> Result<(), ObdError> {
        if self.transport.is_open() {
            info!("Disconnecting OBD client");
            self.transport.close().await?;
        }
        Ok(())
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[tokio::test(start_paused = true)]
    async fn test_response_is_stripped() {
        let transport = MockTransport::new().respond("220105", "7EC24 C8 03 E8\r7EC25 4F\r\r>");
        let mut client = ObdClient::new(transport);
        let response = client
            .send_command("220105", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(response, "7EC24C803E87EC254F>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_elapses() {
        let mut client = ObdClient::new(MockTransport::new());
        let start = tokio::time::Instant::now();
        client
            .send_command("ATZ", Duration::from_millis(200))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mut client = ObdClient::new(MockTransport::new());
        assert!(client.is_connected());
        client.disconnect().await.unwrap();
        assert!(!client.is_connected());
        assert!(client.transport().is_closed());
        assert!(matches!(
            client.send_command("ATZ", Duration::ZERO).await,
            Err(ObdError::NotConnected)
        ));
    }
}
