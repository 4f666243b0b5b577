//! ELM327 Adapter Protocol and Configuration Commands

use serde::{Deserialize, Serialize};

/// Directive that puts the adapter into low power mode
pub const LOW_POWER_COMMAND: &str = "ATPC";

/// Terminator appended to every command
pub const COMMAND_TERMINATOR: &str = "\r";

/// ISO 15765-4 CAN variants the battery ECU can be reached on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObdProtocol {
    /// 11 bit ID, 500 kbaud
    #[default]
    Can11bit500,
    /// 29 bit ID, 500 kbaud
    Can29bit500,
    /// 11 bit ID, 250 kbaud
    Can11bit250,
    /// 29 bit ID, 250 kbaud
    Can29bit250,
}

impl ObdProtocol {
    /// ELM327 protocol select command
    pub fn select_command(&self) -> &'static str {
        match self {
            ObdProtocol::Can11bit500 => "ATSP6",
            ObdProtocol::Can29bit500 => "ATSP7",
            ObdProtocol::Can11bit250 => "ATSP8",
            ObdProtocol::Can29bit250 => "ATSP9",
        }
    }
}

/// Adapter configuration sequence sent once at session start
///
/// Headers must stay on and spaces off: frame markers are located by the
/// responding ECU address printed at the start of each frame.
pub fn init_commands(protocol: ObdProtocol, receive_address: &str) -> Vec<String> {
    let mut commands: Vec<String> = [
        "ATD",    // all settings to defaults
        "ATZ",    // reset
        "ATE0",   // echo off
        "ATL0",   // linefeeds off
        "ATS0",   // spaces off
        "ATH1",   // headers on
        "ATSTFF", // maximum response timeout
        "ATFE",   // forget events
    ]
    .into_iter()
    .map(String::from)
    .collect();

    commands.push(protocol.select_command().to_string());
    commands.push(format!("ATCRA{}", receive_address.to_ascii_uppercase()));
    commands
}
