//! OBD-II Error Types

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal adapter-reported bus conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusFault {
    /// `CAN ERROR`
    CanError,
    /// `UNABLE TO CONNECT`
    UnableToConnect,
    /// `BUFFER FULL`
    BufferFull,
}

impl BusFault {
    /// The adapter token for this fault, with spaces removed
    pub fn token(&self) -> &'static str {
        match self {
            BusFault::CanError => "CANERROR",
            BusFault::UnableToConnect => "UNABLETOCONNECT",
            BusFault::BufferFull => "BUFFERFULL",
        }
    }
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BusFault::CanError => "CAN ERROR",
            BusFault::UnableToConnect => "UNABLE TO CONNECT",
            BusFault::BufferFull => "BUFFER FULL",
        };
        f.write_str(text)
    }
}

/// Errors that can occur while decoding a multi-frame response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A frame marker required by the schema is not in the response
    #[error("Frame marker {0} missing from response")]
    MissingMarker(&'static str),

    /// A frame that must carry data is empty
    #[error("Frame {0} carries no data")]
    EmptySegment(&'static str),

    /// A frame is too short for the requested byte
    #[error("Frame {marker} has no byte at offset {offset}")]
    SegmentTooShort { marker: &'static str, offset: usize },

    /// A byte position holds something other than two hex digits
    #[error("Frame {marker} has malformed hex {text:?} at offset {offset}")]
    MalformedHex {
        marker: &'static str,
        offset: usize,
        text: String,
    },
}

/// Errors that can occur during OBD-II communication
#[derive(Debug, Error)]
pub enum ObdError {
    /// Serial port or byte-stream failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Adapter reported a bus fault
    #[error("CAN bus error: {0}")]
    Bus(BusFault),

    /// Query returned no payload
    #[error("No data returned by the vehicle")]
    NoData,

    /// Payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport already released
    #[error("OBD adapter not connected")]
    NotConnected,

    /// Polling attempted before the adapter was configured
    #[error("OBD session not initialized")]
    NotInitialized,

    /// Query identifier without a decoding schema
    #[error("Unknown query identifier: {0}")]
    UnknownQuery(String),
}

impl ObdError {
    /// Whether this error ends the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ObdError::Transport(_) | ObdError::Bus(_) | ObdError::NotConnected
        )
    }
}

impl From<std::io::Error> for ObdError {
    fn from(err: std::io::Error) -> Self {
        ObdError::Transport(err.to_string())
    }
}

impl From<tokio_serial::Error> for ObdError {
    fn from(err: tokio_serial::Error) -> Self {
        ObdError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classes() {
        assert!(ObdError::Bus(BusFault::BufferFull).is_fatal());
        assert!(ObdError::Transport("port gone".into()).is_fatal());
        assert!(!ObdError::NoData.is_fatal());
        assert!(!ObdError::Decode(DecodeError::EmptySegment("7EC21")).is_fatal());
    }

    #[test]
    fn test_bus_fault_display() {
        let err = ObdError::Bus(BusFault::UnableToConnect);
        assert_eq!(err.to_string(), "CAN bus error: UNABLE TO CONNECT");
    }
}
