//! Sample adapter responses from a parked vehicle, spaces removed
//!
//! Replayed by `MockTransport::sample_session` and used throughout the tests.

/// `220105` response: 39.5 % displayed charge, 100 % health
pub const HEALTH_RESPONSE: &str = "7EC103E620105FFFBFF7EC21FC00000000000\
7EC2200000000000000\
7EC2300000000000000\
7EC24C803E8000000FF\
7EC254F000000000000\
7EC2600000000000000>";

/// `220101` response: 38 % BMS charge, 356.7 V, -1.0 A, not charging
pub const STATUS_RESPONSE: &str = "7EC103D6201FFFFFFFF\
7EC21FF4C0F0F0F0003\
7EC22FFF60DEF1E1C1D\
7EC231D1D1D1D1D1B24\
7EC24C632C60000922F\
7EC25000D0C0000A3B0\
7EC2600007A12000073\
7EC272C000000000000\
7EC2800000000000000>";

/// `220101` response with the given payloads for frames 1, 2, 6 and 7
#[cfg(test)]
pub(crate) fn status(b1: &str, b2: &str, b6: &str, b7: &str) -> String {
    format!(
        "7EC103D6201FFFFFFFF\
7EC21{b1}7EC22{b2}7EC231D1D1D1D1D1B24\
7EC24C632C60000922F7EC25000D0C0000A3B0\
7EC26{b6}7EC27{b7}7EC2800000000000000>"
    )
}
