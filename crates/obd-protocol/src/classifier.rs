//! Adapter Response Classification
//!
//! Sorts a raw adapter response into success, no-data or a fatal bus fault
//! before any decoding is attempted.

use crate::error::BusFault;

/// Token the adapter prints when the vehicle returned nothing
const NO_DATA_TOKEN: &str = "NODATA";

/// Fault tokens, checked in this order
const FAULTS: [BusFault; 3] = [
    BusFault::CanError,
    BusFault::UnableToConnect,
    BusFault::BufferFull,
];

/// Outcome of classifying one adapter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Anything that is neither a fault nor no-data
    Ok,
    /// The vehicle did not answer the query
    NoData,
    /// The adapter reported a fatal bus condition
    Error(BusFault),
}

/// Classify a raw response
///
/// Whitespace and letter case are ignored. Fault tokens take precedence over
/// the no-data token. A response classified `Ok` may still fail to decode.
pub fn classify(response: &str) -> ResponseStatus {
    let normalized: String = response
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if let Some(fault) = FAULTS.iter().find(|f| normalized.contains(f.token())) {
        return ResponseStatus::Error(*fault);
    }

    if normalized.contains(NO_DATA_TOKEN) {
        ResponseStatus::NoData
    } else {
        ResponseStatus::Ok
    }
}
