//! Battery Telemetry Records

use crate::schema::QueryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named battery telemetry values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryField {
    /// State of charge shown on the dashboard (%)
    SocDisplay,
    /// State of health (%)
    Soh,
    /// State of charge reported by the BMS (%)
    SocBms,
    /// High-voltage pack voltage (V)
    DcBatteryVoltage,
    /// High-voltage pack current, negative while charging (A)
    DcBatteryCurrent,
    /// Pack power, derived from voltage and current (kW)
    DcBatteryPower,
    /// Hottest module (°C)
    BatteryMaxTemperature,
    /// Coldest module (°C)
    BatteryMinTemperature,
    /// Coolant inlet (°C)
    BatteryInletTemperature,
    /// Lifetime energy into the pack (kWh)
    CumulativeEnergyCharged,
    /// Lifetime energy out of the pack (kWh)
    CumulativeEnergyDischarged,
    /// 1 while charging
    Charging,
    /// 1 while on an AC (normal) charge port
    NormalChargePort,
    /// 1 while on a DC (rapid) charge port
    RapidChargePort,
    /// 12 V auxiliary battery voltage (V)
    AuxBatteryVoltage,
}

impl TelemetryField {
    /// Wire name, as used in JSON output
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryField::SocDisplay => "SOC_DISPLAY",
            TelemetryField::Soh => "SOH",
            TelemetryField::SocBms => "SOC_BMS",
            TelemetryField::DcBatteryVoltage => "DC_BATTERY_VOLTAGE",
            TelemetryField::DcBatteryCurrent => "DC_BATTERY_CURRENT",
            TelemetryField::DcBatteryPower => "DC_BATTERY_POWER",
            TelemetryField::BatteryMaxTemperature => "BATTERY_MAX_TEMPERATURE",
            TelemetryField::BatteryMinTemperature => "BATTERY_MIN_TEMPERATURE",
            TelemetryField::BatteryInletTemperature => "BATTERY_INLET_TEMPERATURE",
            TelemetryField::CumulativeEnergyCharged => "CUMULATIVE_ENERGY_CHARGED",
            TelemetryField::CumulativeEnergyDischarged => "CUMULATIVE_ENERGY_DISCHARGED",
            TelemetryField::Charging => "CHARGING",
            TelemetryField::NormalChargePort => "NORMAL_CHARGE_PORT",
            TelemetryField::RapidChargePort => "RAPID_CHARGE_PORT",
            TelemetryField::AuxBatteryVoltage => "AUX_BATTERY_VOLTAGE",
        }
    }

    /// Unit suffix for display; empty for flags
    pub fn unit(&self) -> &'static str {
        match self {
            TelemetryField::SocDisplay | TelemetryField::Soh | TelemetryField::SocBms => "%",
            TelemetryField::DcBatteryVoltage | TelemetryField::AuxBatteryVoltage => "V",
            TelemetryField::DcBatteryCurrent => "A",
            TelemetryField::DcBatteryPower => "kW",
            TelemetryField::BatteryMaxTemperature
            | TelemetryField::BatteryMinTemperature
            | TelemetryField::BatteryInletTemperature => "°C",
            TelemetryField::CumulativeEnergyCharged
            | TelemetryField::CumulativeEnergyDischarged => "kWh",
            TelemetryField::Charging
            | TelemetryField::NormalChargePort
            | TelemetryField::RapidChargePort => "",
        }
    }
}

impl fmt::Display for TelemetryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded values for one query, always a schema's full set or empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord {
    fields: BTreeMap<TelemetryField, f64>,
}

impl TelemetryRecord {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `field`, if it was decoded
    pub fn get(&self, field: TelemetryField) -> Option<f64> {
        self.fields.get(&field).copied()
    }

    /// Number of decoded fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when nothing was decoded
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (TelemetryField, f64)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, *v))
    }

    pub(crate) fn insert(&mut self, field: TelemetryField, value: f64) {
        self.fields.insert(field, value);
    }
}

impl FromIterator<(TelemetryField, f64)> for TelemetryRecord {
    fn from_iter<I: IntoIterator<Item = (TelemetryField, f64)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}{}", field, value, field.unit())?;
        }
        Ok(())
    }
}

/// A record surfaced to consumers after one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReport {
    /// Query that produced the record
    pub query: QueryId,
    /// Timestamp when the response was read (Unix ms)
    pub timestamp_ms: u64,
    /// Decoded values
    pub record: TelemetryRecord,
}

impl TelemetryReport {
    /// Report stamped with the current time
    pub fn new(query: QueryId, record: TelemetryRecord) -> Self {
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            query,
            timestamp_ms,
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match() {
        for field in [
            TelemetryField::SocDisplay,
            TelemetryField::DcBatteryPower,
            TelemetryField::CumulativeEnergyDischarged,
        ] {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.name()));
        }
    }

    #[test]
    fn test_record_serializes_as_map() {
        let record: TelemetryRecord = [
            (TelemetryField::SocDisplay, 39.5),
            (TelemetryField::Soh, 100.0),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"SOC_DISPLAY":39.5,"SOH":100.0}"#);
    }

    #[test]
    fn test_display() {
        let record: TelemetryRecord = [(TelemetryField::SocBms, 38.0)].into_iter().collect();
        assert_eq!(record.to_string(), "SOC_BMS=38%");
    }

    #[test]
    fn test_iter_in_declaration_order() {
        let record: TelemetryRecord = [
            (TelemetryField::Charging, 1.0),
            (TelemetryField::BatteryInletTemperature, -10.0),
            (TelemetryField::SocDisplay, 39.5),
        ]
        .into_iter()
        .collect();
        let fields: Vec<_> = record.iter().map(|(field, _)| field).collect();
        assert_eq!(
            fields,
            [
                TelemetryField::SocDisplay,
                TelemetryField::BatteryInletTemperature,
                TelemetryField::Charging
            ]
        );
        assert_eq!(record.get(TelemetryField::Soh), None);
        assert_eq!(TelemetryField::BatteryInletTemperature.unit(), "°C");
        assert_eq!(TelemetryField::Charging.unit(), "");
    }
}
