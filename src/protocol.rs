//! Outbound command encoding.
//!
//! Every command becomes exactly one payload followed by CR LF. Payloads
//! are validated here so nothing malformed reaches the transport.

use crate::config::VOLUME_RAW_MAX;
use crate::error::{AvrError, Result};
use crate::framer::TERMINATOR;
use crate::types::ChannelCode;
use serde::{Deserialize, Serialize};

/// Highest input channel code the inventory is queried for
pub const MAX_CHANNEL_CODE: u8 = 59;

/// Transport controls, resolved against the active input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerCommand {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Repeat,
    Shuffle,
}

/// An outbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    PowerOn,
    PowerOff,
    VolumeUp,
    VolumeDown,
    /// Absolute raw volume, 0..=185
    SetVolumeRaw(u16),
    Mute(bool),
    SelectInput(ChannelCode),
    /// Bass in dB, -6..=6
    SetBass(i32),
    /// Treble in dB, -6..=6
    SetTreble(i32),
    Tone(bool),
    /// Speaker terminals, 0..=3
    Speakers(u8),
    /// Four-digit listening mode code
    ListeningMode(String),
    Player(PlayerCommand),
    /// Status query without the leading `?`
    Query(String),
    /// Pre-built payload
    Raw(String),
    /// Bare terminator used to check the link
    Probe,
}

impl Command {
    /// Query shorthand
    pub fn query(what: impl Into<String>) -> Self {
        Command::Query(what.into())
    }

    /// Payload without terminator.
    ///
    /// `active_input` is the channel code player commands are resolved
    /// against.
    pub fn payload(&self, active_input: Option<&str>) -> Result<String> {
        let payload = match self {
            Command::PowerOn => "PO".to_string(),
            Command::PowerOff => "PF".to_string(),
            Command::VolumeUp => "VU".to_string(),
            Command::VolumeDown => "VD".to_string(),
            Command::SetVolumeRaw(raw) => {
                if *raw > VOLUME_RAW_MAX {
                    return Err(AvrError::InvalidParameter(format!(
                        "volume {} above {}",
                        raw, VOLUME_RAW_MAX
                    )));
                }
                format!("{:03}VL", raw)
            }
            Command::Mute(true) => "MO".to_string(),
            Command::Mute(false) => "MF".to_string(),
            Command::SelectInput(code) => {
                if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(AvrError::InvalidParameter(format!(
                        "input code {:?} is not two digits",
                        code
                    )));
                }
                format!("{}FN", code)
            }
            Command::SetBass(db) => format!("{}BA", encode_tone(*db)?),
            Command::SetTreble(db) => format!("{}TR", encode_tone(*db)?),
            Command::Tone(on) => format!("{}TO", u8::from(*on)),
            Command::Speakers(n) => {
                if *n > 3 {
                    return Err(AvrError::InvalidParameter(format!("speakers {} above 3", n)));
                }
                format!("{}SPK", n)
            }
            Command::ListeningMode(code) => {
                if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(AvrError::InvalidParameter(format!(
                        "listening mode {:?} is not four digits",
                        code
                    )));
                }
                format!("{}SR", code)
            }
            Command::Player(cmd) => player_payload(*cmd, active_input)?.to_string(),
            Command::Query(what) => format!("?{}", what),
            Command::Raw(payload) => payload.clone(),
            Command::Probe => String::new(),
        };

        if payload.contains(['\r', '\n']) {
            return Err(AvrError::InvalidParameter(format!(
                "payload {:?} contains a line terminator",
                payload
            )));
        }
        Ok(payload)
    }

    /// Full wire line including terminator
    pub fn encode(&self, active_input: Option<&str>) -> Result<Vec<u8>> {
        let mut line = self.payload(active_input)?.into_bytes();
        line.extend_from_slice(TERMINATOR);
        Ok(line)
    }
}

/// dB -6..=6 to the receiver's `6 - dB` encoding
fn encode_tone(db: i32) -> Result<String> {
    if !(-6..=6).contains(&db) {
        return Err(AvrError::InvalidParameter(format!("tone {} dB outside -6..=6", db)));
    }
    Ok(format!("{:02}", 6 - db))
}

/// Player codes depend on which kind of source is active
fn player_payload(cmd: PlayerCommand, active_input: Option<&str>) -> Result<&'static str> {
    use PlayerCommand::*;

    let input = active_input
        .ok_or_else(|| AvrError::Unsupported("no active input known yet".to_string()))?;

    let payload = match input {
        // iPod/USB
        "17" => match cmd {
            Play => "00IP",
            Pause => "01IP",
            Stop => "02IP",
            Previous => "03IP",
            Next => "04IP",
            Repeat => "07IP",
            Shuffle => "08IP",
        },
        // network sources
        "38" | "40" | "41" | "44" | "45" | "53" => match cmd {
            Play => "10NW",
            Pause => "11NW",
            Previous => "12NW",
            Next => "13NW",
            Stop => "20NW",
            Repeat => "34NW",
            Shuffle => "35NW",
        },
        // tuner steps through presets
        "02" => match cmd {
            Next => "TPI",
            Previous => "TPD",
            other => {
                return Err(AvrError::Unsupported(format!("{:?} on tuner", other)));
            }
        },
        other => {
            return Err(AvrError::Unsupported(format!(
                "player commands on input {}",
                other
            )));
        }
    };
    Ok(payload)
}

/// Queries sent after connecting and after every reconnect
pub fn status_queries() -> Vec<Command> {
    let mut queries: Vec<Command> = [
        "P", "V", "M", "F", "BA", "TR", "TO", "S", "L", "SPK", "SSF", "RGD", "SSI", "SVB", "SUL",
        "STJ", "FR", "PR", "AP", "BP", "ZEP",
    ]
    .into_iter()
    .map(Command::query)
    .collect();

    queries.extend(inventory_queries());
    queries
}

/// Name queries for every input channel
pub fn inventory_queries() -> Vec<Command> {
    (0..=MAX_CHANNEL_CODE)
        .map(|code| Command::Query(format!("RGB{:02}", code)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(cmd: Command) -> String {
        String::from_utf8(cmd.encode(None).unwrap()).unwrap()
    }

    #[test]
    fn simple_commands() {
        assert_eq!(wire(Command::PowerOn), "PO\r\n");
        assert_eq!(wire(Command::Mute(true)), "MO\r\n");
        assert_eq!(wire(Command::SetVolumeRaw(81)), "081VL\r\n");
        assert_eq!(wire(Command::SelectInput("05".into())), "05FN\r\n");
        assert_eq!(wire(Command::query("V")), "?V\r\n");
        assert_eq!(wire(Command::Probe), "\r\n");
    }

    #[test]
    fn tone_encoding_mirrors_decoding() {
        assert_eq!(wire(Command::SetBass(4)), "02BA\r\n");
        assert_eq!(wire(Command::SetTreble(-6)), "12TR\r\n");
        assert!(Command::SetBass(7).encode(None).is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(Command::SetVolumeRaw(186).encode(None).is_err());
        assert!(Command::SelectInput("5".into()).encode(None).is_err());
        assert!(Command::Speakers(4).encode(None).is_err());
        assert!(Command::Raw("PO\r\nPF".into()).encode(None).is_err());
    }

    #[test]
    fn player_commands_follow_active_input() {
        let play = Command::Player(PlayerCommand::Play);
        assert_eq!(play.payload(Some("44")).unwrap(), "10NW");
        assert_eq!(play.payload(Some("17")).unwrap(), "00IP");
        assert_eq!(
            Command::Player(PlayerCommand::Next).payload(Some("02")).unwrap(),
            "TPI"
        );
        assert!(matches!(play.payload(Some("02")), Err(AvrError::Unsupported(_))));
        assert!(matches!(play.payload(Some("19")), Err(AvrError::Unsupported(_))));
        assert!(matches!(play.payload(None), Err(AvrError::Unsupported(_))));
    }

    #[test]
    fn status_refresh_covers_inventory() {
        let queries = status_queries();
        assert!(queries.contains(&Command::query("P")));
        assert!(queries.contains(&Command::query("RGB00")));
        assert!(queries.contains(&Command::query("RGB59")));
        assert_eq!(inventory_queries().len(), 60);
    }
}
