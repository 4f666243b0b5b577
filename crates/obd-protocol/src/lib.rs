//! OBD-II Battery Telemetry Protocol
//!
//! Talks to ELM327-compatible adapters over a byte-stream transport and
//! decodes the battery management ECU's multi-frame responses into typed
//! telemetry: classification of adapter responses, frame demultiplexing,
//! and the field decoders for the two battery queries.

mod classifier;
mod client;
mod error;
mod frame;
mod protocol;
pub mod sample;
mod schema;
mod telemetry;
mod transport;

pub use classifier::{classify, ResponseStatus};
pub use client::ObdClient;
pub use error::{BusFault, DecodeError, ObdError};
pub use frame::{demux, FinalFrame, FrameMarker, FrameSegment};
pub use protocol::{init_commands, ObdProtocol, COMMAND_TERMINATOR, LOW_POWER_COMMAND};
pub use schema::{health_frames, status_frames, QueryId};
pub use telemetry::{TelemetryField, TelemetryRecord, TelemetryReport};
pub use transport::{MockTransport, SerialTransport, Transport};
