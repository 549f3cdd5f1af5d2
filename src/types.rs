use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-character input channel code, e.g. `"05"`
pub type ChannelCode = String;

/// Receiver output section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Zone {
    Primary,
    Zone2,
    Zone3,
    HdZone,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Zone::Primary => "primary",
            Zone::Zone2 => "zone2",
            Zone::Zone3 => "zone3",
            Zone::HdZone => "hdZone",
        };
        f.write_str(name)
    }
}

/// State of the transport link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Never opened
    #[default]
    Uninitialized,
    Closed,
    Opening,
    Open,
    Disconnected,
}

/// Power state reported by the receiver itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    #[default]
    Unknown,
    On,
    Off,
}

/// Externally visible device status, composed from link and power state
pub fn summary_status(link: LinkState, power: PowerState) -> &'static str {
    match (link, power) {
        (LinkState::Open, PowerState::On) => "on",
        (LinkState::Open, PowerState::Off) => "off",
        (LinkState::Open, PowerState::Unknown) => "opened",
        (LinkState::Uninitialized, _) => "uninitialized",
        (LinkState::Opening, _) => "opening",
        (LinkState::Closed, _) | (LinkState::Disconnected, _) => "disconnected",
    }
}

/// Which signal path a terminal assignment refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalKind {
    Digital,
    Hdmi,
    Component,
}

/// Tuner band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    Fm,
    Am,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Fm => "FM",
            Band::Am => "AM",
        }
    }
}

/// One entry of the input channel inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputChannel {
    /// Factory name, normalized
    pub name: Option<String>,

    /// User-assigned name, normalized
    pub alias: Option<String>,

    /// Raw reply line kept as a last-resort label
    pub raw: Option<String>,

    /// False once the receiver reports the input as skipped
    pub enabled: bool,

    /// Input level adjust in dB
    pub level_adjust_db: Option<f64>,

    /// Assigned digital audio terminal
    pub digital: Option<String>,

    /// Assigned HDMI terminal
    pub hdmi: Option<String>,

    /// Assigned component video terminal
    pub component: Option<String>,
}

impl Default for InputChannel {
    fn default() -> Self {
        Self {
            name: None,
            alias: None,
            raw: None,
            enabled: true,
            level_adjust_db: None,
            digital: None,
            hdmi: None,
            component: None,
        }
    }
}

impl InputChannel {
    /// Display label: alias, then factory name, then raw line
    pub fn label(&self) -> Option<&str> {
        self.alias
            .as_deref()
            .or(self.name.as_deref())
            .or(self.raw.as_deref())
    }

    /// Alias, then factory name. Never the stored raw line.
    pub fn assigned_name(&self) -> Option<&str> {
        self.alias.as_deref().or(self.name.as_deref())
    }
}

/// Network settings reported by the receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub dhcp: bool,
    pub ip: String,
    pub netmask: String,
    pub gateway: String,
    pub primary_dns: String,
    pub secondary_dns: String,
}

/// One published field update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    pub value: String,
}

/// A code decoded against one of the static lookup tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coded {
    pub code: String,
    pub name: Option<&'static str>,
}

impl Coded {
    /// Table name if known, otherwise the raw code
    pub fn value(&self) -> String {
        self.name.map(str::to_string).unwrap_or_else(|| self.code.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_status_composes_link_and_power() {
        assert_eq!(summary_status(LinkState::Open, PowerState::On), "on");
        assert_eq!(summary_status(LinkState::Open, PowerState::Off), "off");
        assert_eq!(summary_status(LinkState::Open, PowerState::Unknown), "opened");
        assert_eq!(summary_status(LinkState::Disconnected, PowerState::On), "disconnected");
        assert_eq!(summary_status(LinkState::Closed, PowerState::Unknown), "disconnected");
        assert_eq!(
            summary_status(LinkState::Uninitialized, PowerState::Unknown),
            "uninitialized"
        );
    }

    #[test]
    fn input_label_prefers_alias() {
        let mut input = InputChannel {
            name: Some("tvSat".into()),
            alias: Some("livingroom".into()),
            raw: Some("RGB051TV/SAT".into()),
            ..Default::default()
        };
        assert_eq!(input.label(), Some("livingroom"));
        input.alias = None;
        assert_eq!(input.label(), Some("tvSat"));
        input.name = None;
        assert_eq!(input.label(), Some("RGB051TV/SAT"));
        assert_eq!(input.assigned_name(), None);
        assert!(input.enabled);
    }

    #[test]
    fn coded_value_falls_back_to_code() {
        let known = Coded { code: "0001".into(), name: Some("STEREO (cyclic)") };
        let unknown = Coded { code: "9999".into(), name: None };
        assert_eq!(known.value(), "STEREO (cyclic)");
        assert_eq!(unknown.value(), "9999");
    }
}
