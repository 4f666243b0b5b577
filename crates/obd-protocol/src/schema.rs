//! Battery Query Schemas
//!
//! Two UDS `ReadDataByIdentifier` queries against the battery management
//! ECU (responding on `7EC`), each with its own frame layout and scaling.

use crate::error::{DecodeError, ObdError};
use crate::frame::{demux, FinalFrame, FrameMarker, FrameSegment};
use crate::telemetry::{TelemetryField, TelemetryRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Query identifiers, each bound to one decoding schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QueryId {
    /// `220105`: displayed state of charge and state of health
    BatteryHealth,
    /// `220101`: full battery status
    BatteryStatus,
}

impl QueryId {
    /// Default polling order
    pub const ALL: [QueryId; 2] = [QueryId::BatteryHealth, QueryId::BatteryStatus];

    /// Command string sent to the adapter
    pub fn command(&self) -> &'static str {
        match self {
            QueryId::BatteryHealth => "220105",
            QueryId::BatteryStatus => "220101",
        }
    }

    /// Decode a raw response, reporting why a decode failed
    pub fn decode(&self, response: &str) -> Result<TelemetryRecord, DecodeError> {
        match self {
            QueryId::BatteryHealth => decode_battery_health(response),
            QueryId::BatteryStatus => decode_battery_status(response),
        }
    }

    /// Decode a raw response, yielding an empty record on any failure
    pub fn decode_lenient(&self, response: &str) -> TelemetryRecord {
        self.decode(response).unwrap_or_default()
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for QueryId {
    type Err = ObdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryId::ALL
            .into_iter()
            .find(|q| q.command().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ObdError::UnknownQuery(s.to_string()))
    }
}

impl TryFrom<String> for QueryId {
    type Error = ObdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QueryId> for String {
    fn from(value: QueryId) -> Self {
        value.command().to_string()
    }
}

/// Frame markers for `220105`
pub mod health_frames {
    use super::FrameMarker;

    pub const F4: FrameMarker = FrameMarker("7EC24");
    pub const F5: FrameMarker = FrameMarker("7EC25");
    pub const F6: FrameMarker = FrameMarker("7EC26");

    pub const ALL: [FrameMarker; 3] = [F4, F5, F6];
}

/// Frame markers for `220101`
pub mod status_frames {
    use super::FrameMarker;

    pub const B1: FrameMarker = FrameMarker("7EC21");
    pub const B2: FrameMarker = FrameMarker("7EC22");
    pub const B3: FrameMarker = FrameMarker("7EC23");
    pub const B4: FrameMarker = FrameMarker("7EC24");
    pub const B5: FrameMarker = FrameMarker("7EC25");
    pub const B6: FrameMarker = FrameMarker("7EC26");
    pub const B7: FrameMarker = FrameMarker("7EC27");
    pub const B8: FrameMarker = FrameMarker("7EC28");

    pub const ALL: [FrameMarker; 8] = [B1, B2, B3, B4, B5, B6, B7, B8];

    /// Width of the final frame, marker included
    pub const FINAL_WIDTH: usize = 18;
}

/// Charge port code for an AC connection
const NORMAL_PORT_CODE: &str = "03";

fn signed8(value: u8) -> i8 {
    value as i8
}

fn signed16(value: u32) -> i16 {
    value as u16 as i16
}

fn require_data(segment: &FrameSegment<'_>) -> Result<(), DecodeError> {
    if segment.is_empty() {
        Err(DecodeError::EmptySegment(segment.marker.as_str()))
    } else {
        Ok(())
    }
}

fn decode_battery_health(response: &str) -> Result<TelemetryRecord, DecodeError> {
    let segments = demux(response, &health_frames::ALL, FinalFrame::Closing)?;
    let (f4, f5) = (&segments[0], &segments[1]);
    require_data(f4)?;
    require_data(f5)?;

    let soc_display = f5.byte(0)? as f64 / 2.0;
    let soh = f4.uint_be(1, 2)? as f64 / 10.0;

    Ok([
        (TelemetryField::SocDisplay, soc_display),
        (TelemetryField::Soh, soh),
    ]
    .into_iter()
    .collect())
}

fn decode_battery_status(response: &str) -> Result<TelemetryRecord, DecodeError> {
    let segments = demux(
        response,
        &status_frames::ALL,
        FinalFrame::Window(status_frames::FINAL_WIDTH),
    )?;
    let [b1, b2, b3, b4, _, b6, b7, _] = segments.as_slice() else {
        return Err(DecodeError::MissingMarker(status_frames::B8.as_str()));
    };
    require_data(b1)?;
    require_data(b2)?;
    require_data(b4)?;

    let soc_bms = b1.byte(1)? as f64 / 2.0;
    let voltage = b2.uint_be(2, 2)? as f64 / 10.0;
    let current = signed16(b2.uint_be(0, 2)?) as f64 * 0.1;
    let max_temp = signed8(b2.byte(4)?);
    let min_temp = signed8(b2.byte(5)?);
    let inlet_temp = signed8(b3.byte(5)?);

    let charged = b6.uint_be(0, 4)? as f64 / 10.0;
    // Fourth byte of the discharged counter opens the next frame.
    let discharged =
        ((b6.uint_be(4, 3)? << 8) | b7.byte(0)? as u32) as f64 / 10.0;

    let charging_bits = b7.byte(5)?;
    let bit = |index: u32| (charging_bits >> (7 - index)) & 1 == 1;
    let charging = bit(4) && !bit(5);
    let plugged_in = bit(1);
    let normal_port = b1.byte_text(6)? == NORMAL_PORT_CODE;

    let aux_voltage = b4.byte(5)? as f64 / 10.0;

    let mut record = TelemetryRecord::new();
    record.insert(TelemetryField::SocBms, soc_bms);
    record.insert(TelemetryField::DcBatteryVoltage, voltage);
    record.insert(TelemetryField::Charging, flag(charging));
    record.insert(TelemetryField::NormalChargePort, flag(plugged_in && normal_port));
    record.insert(TelemetryField::RapidChargePort, flag(plugged_in && !normal_port));
    record.insert(TelemetryField::BatteryMinTemperature, min_temp as f64);
    record.insert(TelemetryField::BatteryMaxTemperature, max_temp as f64);
    record.insert(TelemetryField::BatteryInletTemperature, inlet_temp as f64);
    record.insert(TelemetryField::DcBatteryCurrent, current);
    record.insert(TelemetryField::CumulativeEnergyCharged, charged);
    record.insert(TelemetryField::CumulativeEnergyDischarged, discharged);
    record.insert(TelemetryField::AuxBatteryVoltage, aux_voltage);
    record.insert(TelemetryField::DcBatteryPower, current * voltage / 1000.0);
    Ok(record)
}

fn flag(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use crate::sample::{status, HEALTH_RESPONSE as HEALTH, STATUS_RESPONSE};
    use super::*;
    use proptest::prelude::*;

    fn assert_close(record: &TelemetryRecord, field: TelemetryField, expected: f64) {
        let value = record
            .get(field)
            .unwrap_or_else(|| panic!("{field} missing from {record:?}"));
        assert!(
            (value - expected).abs() < 1e-9,
            "{field}: expected {expected}, got {value}"
        );
    }

    #[test]
    fn test_query_id_parse() {
        assert_eq!("220105".parse::<QueryId>().unwrap(), QueryId::BatteryHealth);
        assert_eq!("220101".parse::<QueryId>().unwrap(), QueryId::BatteryStatus);
        assert!(matches!(
            "0100".parse::<QueryId>(),
            Err(ObdError::UnknownQuery(_))
        ));
        assert_eq!(QueryId::BatteryStatus.to_string(), "220101");
    }

    #[test]
    fn test_health_sample() {
        let record = QueryId::BatteryHealth.decode(HEALTH).unwrap();
        assert_eq!(record.len(), 2);
        assert_close(&record, TelemetryField::SocDisplay, 39.5);
        assert_close(&record, TelemetryField::Soh, 100.0);
    }

    #[test]
    fn test_health_empty_frame() {
        let response = "7EC24C803E87EC257EC26";
        assert_eq!(
            QueryId::BatteryHealth.decode(response),
            Err(DecodeError::EmptySegment("7EC25"))
        );
        assert!(QueryId::BatteryHealth.decode_lenient(response).is_empty());
    }

    #[test]
    fn test_health_missing_terminator() {
        let response = "7EC24C803E8000000FF7EC254F000000000000>";
        assert!(QueryId::BatteryHealth.decode_lenient(response).is_empty());
    }

    #[test]
    fn test_status_sample() {
        let record = QueryId::BatteryStatus.decode(STATUS_RESPONSE).unwrap();
        assert_eq!(record.len(), 13);
        assert_close(&record, TelemetryField::SocBms, 38.0);
        assert_close(&record, TelemetryField::DcBatteryVoltage, 356.7);
        assert_close(&record, TelemetryField::DcBatteryCurrent, -1.0);
        assert_close(&record, TelemetryField::DcBatteryPower, -0.3567);
        assert_close(&record, TelemetryField::BatteryMaxTemperature, 30.0);
        assert_close(&record, TelemetryField::BatteryMinTemperature, 28.0);
        assert_close(&record, TelemetryField::BatteryInletTemperature, 27.0);
        assert_close(&record, TelemetryField::CumulativeEnergyCharged, 3125.0);
        assert_close(&record, TelemetryField::CumulativeEnergyDischarged, 2948.4);
        assert_close(&record, TelemetryField::AuxBatteryVoltage, 14.6);
        assert_close(&record, TelemetryField::Charging, 0.0);
        assert_close(&record, TelemetryField::NormalChargePort, 0.0);
        assert_close(&record, TelemetryField::RapidChargePort, 0.0);
    }

    #[test]
    fn test_current_sign_extension() {
        let record = QueryId::BatteryStatus
            .decode(&status("FF4C0F0F0F0003", "FFFF0DEF1E1C1D", "00007A12000073", "2C000000000000"))
            .unwrap();
        assert_close(&record, TelemetryField::DcBatteryCurrent, -0.1);

        let record = QueryId::BatteryStatus
            .decode(&status("FF4C0F0F0F0003", "00010DEF1E1C1D", "00007A12000073", "2C000000000000"))
            .unwrap();
        assert_close(&record, TelemetryField::DcBatteryCurrent, 0.1);
    }

    #[test]
    fn test_temperature_sign_extension() {
        let record = QueryId::BatteryStatus
            .decode(&status("FF4C0F0F0F0003", "FFF60DEF9C1E1D", "00007A12000073", "2C000000000000"))
            .unwrap();
        assert_close(&record, TelemetryField::BatteryMaxTemperature, -100.0);
        assert_close(&record, TelemetryField::BatteryMinTemperature, 30.0);
    }

    #[test]
    fn test_inlet_temperature_sign_extension() {
        // B3 byte 5 = 0xF6
        let response = STATUS_RESPONSE.replace("7EC231D1D1D1D1D1B24", "7EC231D1D1D1D1DF624");
        let record = QueryId::BatteryStatus.decode(&response).unwrap();
        assert_close(&record, TelemetryField::BatteryInletTemperature, -10.0);
        assert_close(&record, TelemetryField::BatteryMaxTemperature, 30.0);
    }

    #[test]
    fn test_discharged_straddles_frames() {
        // B6 carries an extra trailing byte that must not be used.
        let record = QueryId::BatteryStatus
            .decode(&status("FF4C0F0F0F0003", "FFF60DEF1E1C1D", "0000000001020399", "04000000000000"))
            .unwrap();
        assert_close(
            &record,
            TelemetryField::CumulativeEnergyDischarged,
            0x0102_0304 as f64 / 10.0,
        );
    }

    #[test]
    fn test_normal_charging() {
        let record = QueryId::BatteryStatus
            .decode(&status("FF4C0F0F0F0003", "FFF60DEF1E1C1D", "00007A12000073", "2C000000004800"))
            .unwrap();
        assert_close(&record, TelemetryField::Charging, 1.0);
        assert_close(&record, TelemetryField::NormalChargePort, 1.0);
        assert_close(&record, TelemetryField::RapidChargePort, 0.0);
    }

    #[test]
    fn test_rapid_charging() {
        let record = QueryId::BatteryStatus
            .decode(&status("FF4C0F0F0F0004", "FFF60DEF1E1C1D", "00007A12000073", "2C00000000CC00"))
            .unwrap();
        // bit 5 set blocks the charging flag
        assert_close(&record, TelemetryField::Charging, 0.0);
        assert_close(&record, TelemetryField::NormalChargePort, 0.0);
        assert_close(&record, TelemetryField::RapidChargePort, 1.0);
    }

    #[test]
    fn test_status_malformed_hex_is_empty() {
        let response = status("FF4C0F0F0F0003", "FFF60DEF1EZZ1D", "00007A12000073", "2C000000000000");
        assert!(matches!(
            QueryId::BatteryStatus.decode(&response),
            Err(DecodeError::MalformedHex { marker: "7EC22", offset: 5, .. })
        ));
        assert!(QueryId::BatteryStatus.decode_lenient(&response).is_empty());
    }

    #[test]
    fn test_status_short_frame_is_empty() {
        let response = status("FF4C0F0F0F0003", "FFF60DEF1E1C1D", "00007A12000073", "2C0000");
        assert!(matches!(
            QueryId::BatteryStatus.decode(&response),
            Err(DecodeError::SegmentTooShort { marker: "7EC27", offset: 5 })
        ));
    }

    #[test]
    fn test_status_empty_required_frame() {
        let response = status("", "FFF60DEF1E1C1D", "00007A12000073", "2C000000000000");
        assert_eq!(
            QueryId::BatteryStatus.decode(&response),
            Err(DecodeError::EmptySegment("7EC21"))
        );
    }

    #[test]
    fn test_decode_is_idempotent() {
        let response = STATUS_RESPONSE;
        let first = QueryId::BatteryStatus.decode_lenient(response);
        let second = QueryId::BatteryStatus.decode_lenient(response);
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn missing_status_marker_yields_empty(idx in 0usize..8) {
            let marker = status_frames::ALL[idx].as_str();
            let response = STATUS_RESPONSE.replacen(marker, "", 1);
            prop_assert!(QueryId::BatteryStatus.decode_lenient(&response).is_empty());
        }

        #[test]
        fn missing_health_marker_yields_empty(idx in 0usize..3) {
            let marker = health_frames::ALL[idx].as_str();
            let response = HEALTH.replacen(marker, "", 1);
            prop_assert!(QueryId::BatteryHealth.decode_lenient(&response).is_empty());
        }

        #[test]
        fn health_round_trips_soc(soc in any::<u8>(), soh in any::<u16>()) {
            let response = format!("7EC24C8{soh:04X}000000FF7EC25{soc:02X}0000000000007EC26");
            let record = QueryId::BatteryHealth.decode(&response).unwrap();
            prop_assert_eq!(record.get(TelemetryField::SocDisplay), Some(soc as f64 / 2.0));
            prop_assert_eq!(record.get(TelemetryField::Soh), Some(soh as f64 / 10.0));
        }

        #[test]
        fn arbitrary_input_never_partial(response in "[0-9A-F7EC>]{0,200}") {
            let record = QueryId::BatteryStatus.decode_lenient(&response);
            prop_assert!(record.is_empty() || record.len() == 13);
        }
    }
}
