//! Byte-Stream Transport to the Adapter
//!
//! `Transport` is the only seam to hardware. Two impls:
//! - `SerialTransport` wraps a `tokio_serial::SerialStream`
//! - `MockTransport` answers from a scripted command table

use crate::error::ObdError;
use crate::protocol::COMMAND_TERMINATOR;
use crate::sample;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

/// Byte-stream link to an ELM327-compatible adapter
#[async_trait]
pub trait Transport: Send {
    /// Write raw bytes to the adapter
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ObdError>;

    /// Read whatever the adapter has buffered, possibly nothing
    async fn read_available(&mut self) -> Result<Vec<u8>, ObdError>;

    /// Release the link; later writes fail with `NotConnected`
    async fn close(&mut self) -> Result<(), ObdError>;

    /// Whether the link is still usable
    fn is_open(&self) -> bool;
}

/// Serial port transport (USB, or Bluetooth SPP via `/dev/rfcomm*`)
pub struct SerialTransport {
    device: String,
    stream: Option<SerialStream>,
}

impl SerialTransport {
    /// Open a serial device
    ///
    /// # Arguments
    /// * `device` - Serial port device path (e.g. "/dev/rfcomm0" or "COM5")
    /// * `baud_rate` - Baud rate for serial communication
    /// * `timeout` - Read timeout of the underlying port
    pub fn open(device: &str, baud_rate: u32, timeout: Duration) -> Result<Self, ObdError> {
        let stream = tokio_serial::new(device, baud_rate)
            .timeout(timeout)
            .open_native_async()?;
        info!("Connected to OBD2 adapter on {} at {} baud", device, baud_rate);
        Ok(Self {
            device: device.to_string(),
            stream: Some(stream),
        })
    }

    fn stream(&mut self) -> Result<&mut SerialStream, ObdError> {
        self.stream.as_mut().ok_or(ObdError::NotConnected)
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ObdError> {
        let stream = self.stream()?;
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>, ObdError> {
        let stream = self.stream()?;
        let waiting = stream.bytes_to_read()? as usize;
        let mut buf = vec![0u8; waiting];
        let mut filled = 0;
        while filled < waiting {
            let n = stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    async fn close(&mut self) -> Result<(), ObdError> {
        if self.stream.take().is_some() {
            info!("Disconnected from OBD2 adapter on {}", self.device);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

/// Scripted transport for tests and dry runs
///
/// Each written command is looked up by its text (terminator removed). A
/// command may have a queue of responses; the last one repeats once the queue
/// runs down. Unknown commands answer with the adapter prompt.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: HashMap<String, VecDeque<String>>,
    pending: Vec<u8>,
    written: Vec<String>,
    closed: bool,
}

impl MockTransport {
    /// Transport that accepts every command with the adapter prompt
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport replaying the sample session: every AT command accepted,
    /// both battery queries answered with the sample responses
    pub fn sample_session() -> Self {
        Self::new()
            .respond("220105", sample::HEALTH_RESPONSE)
            .respond("220101", sample::STATUS_RESPONSE)
    }

    /// Queue a response for `command`
    pub fn respond(mut self, command: &str, response: &str) -> Self {
        self.responses
            .entry(command.to_string())
            .or_default()
            .push_back(response.to_string());
        self
    }

    /// Put a response ahead of those already queued for `command`
    pub fn respond_first(mut self, command: &str, response: &str) -> Self {
        self.responses
            .entry(command.to_string())
            .or_default()
            .push_front(response.to_string());
        self
    }

    /// Commands written so far, terminators removed
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn answer(&mut self, command: &str) -> String {
        match self.responses.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => "OK\r\r>".to_string(),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ObdError> {
        if self.closed {
            return Err(ObdError::NotConnected);
        }
        let text = String::from_utf8_lossy(bytes);
        let command = text.trim_end_matches(COMMAND_TERMINATOR).to_string();
        debug!("Mock transport received {}", command);
        let response = self.answer(&command);
        self.pending.extend_from_slice(response.as_bytes());
        self.written.push(command);
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>, ObdError> {
        if self.closed {
            return Err(ObdError::NotConnected);
        }
        Ok(std::mem::take(&mut self.pending))
    }

    async fn close(&mut self) -> Result<(), ObdError> {
        self.closed = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed
    }
}
