//! Inbound line classification.
//!
//! Every complete line is matched against an ordered rule list and turned
//! into exactly one [`Event`]. The first matching rule wins, so specific
//! patterns are listed before broader ones. Lines that match nothing become
//! [`Event::Unknown`]; a rule that matches but carries a code missing from
//! its lookup table still produces an event holding the raw code.

use crate::error::Result;
use crate::tables::{self, Table};
use crate::types::{Band, ChannelCode, Coded, NetworkInfo, PowerState, TerminalKind, Zone};
use regex::Regex;
use std::net::Ipv4Addr;

/// A decoded protocol line
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Raw master volume, 0..=185
    Volume(u16),

    /// Power report with the raw digit
    Power { code: String, state: PowerState },

    /// Active input channel
    Input(ChannelCode),

    /// Bass in dB, -6..=6 for in-range codes
    Bass(i32),

    /// Treble in dB, -6..=6 for in-range codes
    Treble(i32),

    /// A setting decoded against a static table
    Setting { reading: &'static str, value: Coded },

    /// Front panel display text
    Display(String),

    /// Input inventory reply
    InputName {
        code: ChannelCode,
        alias: bool,
        name: Option<String>,
        raw: String,
    },

    /// Input skip flag
    InputSkip { code: ChannelCode, enabled: bool },

    /// Input level adjust in dB
    InputLevel { code: ChannelCode, db: f64 },

    /// Terminal routing of an input
    Terminal {
        code: ChannelCode,
        kind: TerminalKind,
        terminal: Coded,
    },

    TunerFrequency { band: Band, frequency: String },

    /// Tuner preset, e.g. `A06`
    TunerPreset(String),

    /// Station name stored for a tuner preset
    TunerChannelName { preset: String, name: String },

    Network(NetworkInfo),

    MacAddress(String),

    SoftwareVersion(String),

    Model { model: String, detail: Option<String> },

    /// One line of the network player screen
    ScreenLine { line: u8, data_type: Coded, text: String },

    /// Error or busy reply
    DeviceError { code: String, explanation: &'static str },

    /// Line owned by another zone, passed through unmodified
    Zoned { zone: Zone, line: String },

    Unknown(String),
}

/// How a rule recognizes its lines
enum Matcher {
    /// Fixed prefix followed by exactly `width` ASCII digits
    Prefix { prefix: &'static str, width: usize },
    Pattern(Regex),
    Exact(&'static str),
}

impl Matcher {
    fn prefix(prefix: &'static str, width: usize) -> Self {
        Matcher::Prefix { prefix, width }
    }

    fn pattern(pattern: &str) -> Result<Self> {
        Ok(Matcher::Pattern(Regex::new(pattern)?))
    }

    /// Captured fields if the line matches
    fn fields<'l>(&self, line: &'l str) -> Option<Vec<&'l str>> {
        match self {
            Matcher::Prefix { prefix, width } => {
                let rest = line.strip_prefix(*prefix)?;
                (rest.len() == *width && rest.bytes().all(|b| b.is_ascii_digit())).then(|| vec![rest])
            }
            Matcher::Pattern(re) => {
                let caps = re.captures(line)?;
                Some(
                    caps.iter()
                        .skip(1)
                        .map(|m| m.map_or("", |m| m.as_str()))
                        .collect(),
                )
            }
            Matcher::Exact(token) => (line == *token).then(|| vec![line]),
        }
    }
}

/// How a rule turns its fields into an event
enum Decode {
    Fn(fn(&str, &[&str]) -> Event),
    Setting { reading: &'static str, table: Table },
    Zone(Zone),
}

impl Decode {
    fn apply(&self, line: &str, fields: &[&str]) -> Event {
        match self {
            Decode::Fn(f) => f(line, fields),
            Decode::Setting { reading, table } => {
                let code = fields.first().copied().unwrap_or_default();
                Event::Setting {
                    reading: *reading,
                    value: coded(*table, code),
                }
            }
            Decode::Zone(zone) => Event::Zoned {
                zone: *zone,
                line: line.to_string(),
            },
        }
    }
}

struct Rule {
    name: &'static str,
    matcher: Matcher,
    decode: Decode,
}

impl Rule {
    fn new(name: &'static str, matcher: Matcher, decode: fn(&str, &[&str]) -> Event) -> Self {
        Self {
            name,
            matcher,
            decode: Decode::Fn(decode),
        }
    }

    fn setting(prefix: &'static str, width: usize, reading: &'static str, table: Table) -> Self {
        Self {
            name: reading,
            matcher: Matcher::prefix(prefix, width),
            decode: Decode::Setting { reading, table },
        }
    }

    fn zone(zone: Zone, pattern: &str) -> Result<Self> {
        Ok(Self {
            name: "zone",
            matcher: Matcher::pattern(pattern)?,
            decode: Decode::Zone(zone),
        })
    }
}

/// Ordered rule set for inbound lines
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// Compile the rule set
    pub fn new() -> Result<Self> {
        let mut rules = vec![
            // Zone passthrough
            Rule::zone(Zone::Zone2, r"^(?:ZV\d{2}|Z2MUT\d|Z2F\d{2}|APR\d)$")?,
            Rule::zone(Zone::Zone3, r"^(?:YV\d{2}|Z3MUT\d|Z3F\d{2}|BPR\d)$")?,
            Rule::zone(Zone::HdZone, r"^(?:ZEP\d|ZEA\d{2}|HZV\d{2}|HZMUT\d)$")?,
        ];

        for (code, _) in tables::DEVICE_ERRORS {
            rules.push(Rule::new("deviceError", Matcher::Exact(*code), device_error));
        }

        rules.extend([
            Rule::new("volume", Matcher::prefix("VOL", 3), volume),
            Rule::new("power", Matcher::prefix("PWR", 1), power),
            Rule::new("input", Matcher::prefix("FN", 2), input),
            Rule::new("bass", Matcher::prefix("BA", 2), bass),
            Rule::new("treble", Matcher::prefix("TR", 2), treble),
            Rule::setting("MUT", 1, "mute", tables::MUTE),
            Rule::setting("TO", 1, "tone", tables::TONE),
            Rule::setting("SPK", 1, "speakers", tables::SPEAKERS),
            Rule::setting("SDA", 1, "signalSelect", tables::SIGNAL_SELECT),
            Rule::setting("MC", 1, "mcaccMemory", tables::MCACC_MEMORY),
            Rule::setting("IS", 1, "phaseControl", tables::PHASE_CONTROL),
            Rule::setting("HO", 1, "hdmiOut", tables::HDMI_OUT),
            Rule::setting("PQ", 1, "pqls", tables::PQLS),
            Rule::setting("ATA", 1, "soundRetriever", tables::ON_OFF),
            Rule::setting("STJ", 1, "networkStandby", tables::ON_OFF),
            Rule::setting("SR", 4, "listeningMode", tables::LISTENING_MODES),
            Rule::setting("SSF", 2, "speakerSystem", tables::SPEAKER_SYSTEMS),
            Rule::new("listeningModePlaying", Matcher::pattern(r"^LM([0-9A-Fa-f]{4})$")?, playing_mode),
            Rule::new("display", Matcher::pattern(r"^FL([0-9A-Fa-f]{2})((?:[0-9A-Fa-f]{2})*)$")?, display),
            Rule::new("inputName", Matcher::pattern(r"^RGB(\d{2})([01])(.*)$")?, input_name),
            Rule::new("inputSkip", Matcher::pattern(r"^SSC(\d{2})(\d{2})$")?, input_skip),
            Rule::new("inputLevel", Matcher::pattern(r"^ILA(\d{2})(\d{2})$")?, input_level),
            Rule::new("terminal", Matcher::pattern(r"^SS([DHV])(\d{2})(\d{2})$")?, terminal),
            Rule::new("tunerFrequency", Matcher::pattern(r"^FR([FA])(\d{3})(\d{2})$")?, tuner_frequency),
            Rule::new("tunerPreset", Matcher::pattern(r"^PR([A-G])(\d{2})$")?, tuner_preset),
            Rule::new("tunerChannelName", Matcher::pattern(r#"^TQ([A-G]\d{2})"(.{1,8})"$"#)?, tuner_channel_name),
            Rule::new(
                "network",
                Matcher::pattern(r"^SUL([01])(\d{12})(\d{12})(\d{12})(\d{12})(\d{12})")?,
                network,
            ),
            Rule::new("macAddress", Matcher::pattern(r"^SVB([0-9A-Fa-f]{12})$")?, mac_address),
            Rule::new("softwareVersion", Matcher::pattern(r#"^SSI"(.*)"$"#)?, software_version),
            Rule::new("model", Matcher::pattern(r"^RGD<(\d{3})><([^>]*)>$")?, model),
            Rule::new("screenLine", Matcher::pattern(r#"^GEP(\d{2})(\d)(\d{2})"(.*)"$"#)?, screen_line),
        ]);

        Ok(Self { rules })
    }

    /// Map one line to its event; never fails
    pub fn classify(&self, line: &str) -> Event {
        for rule in &self.rules {
            if let Some(fields) = rule.matcher.fields(line) {
                tracing::trace!(rule = rule.name, line, "line matched");
                return rule.decode.apply(line, &fields);
            }
        }
        Event::Unknown(line.to_string())
    }
}

/// Normalize an input name: non-alphanumerics split words, words are
/// title-cased and joined, and the first letter is lowered.
/// `"TV/SAT"` becomes `"tvSat"`.
pub fn normalize_name(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    let mut joined = String::with_capacity(spaced.len());
    for word in spaced.split_whitespace() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            joined.push(first.to_ascii_uppercase());
            joined.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }

    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn coded(table: Table, code: &str) -> Coded {
    Coded {
        code: code.to_string(),
        name: tables::lookup(table, code),
    }
}

fn field(fields: &[&str], index: usize) -> String {
    fields.get(index).copied().unwrap_or_default().to_string()
}

fn device_error(line: &str, _: &[&str]) -> Event {
    Event::DeviceError {
        code: line.to_string(),
        explanation: tables::lookup(tables::DEVICE_ERRORS, line).unwrap_or("unknown error"),
    }
}

fn volume(_: &str, f: &[&str]) -> Event {
    // three digits always fit
    Event::Volume(f[0].parse().unwrap_or_default())
}

fn power(_: &str, f: &[&str]) -> Event {
    let state = match f[0] {
        "0" => PowerState::On,
        "1" | "2" => PowerState::Off,
        _ => PowerState::Unknown,
    };
    Event::Power {
        code: f[0].to_string(),
        state,
    }
}

fn input(_: &str, f: &[&str]) -> Event {
    Event::Input(f[0].to_string())
}

/// The receiver encodes tone as `6 - dB`
fn tone_db(raw: &str) -> i32 {
    6 - raw.parse::<i32>().unwrap_or(6)
}

fn bass(_: &str, f: &[&str]) -> Event {
    Event::Bass(tone_db(f[0]))
}

fn treble(_: &str, f: &[&str]) -> Event {
    Event::Treble(tone_db(f[0]))
}

fn playing_mode(_: &str, f: &[&str]) -> Event {
    Event::Setting {
        reading: "listeningModePlaying",
        value: coded(tables::PLAYING_MODES, &f[0].to_ascii_lowercase()),
    }
}

fn display(_: &str, f: &[&str]) -> Event {
    let hex = f.get(1).copied().unwrap_or_default();
    let text: String = hex
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .filter_map(|pair| u8::from_str_radix(pair, 16).ok())
        .filter(|b| (0x20..=0x7e).contains(b))
        .map(char::from)
        .collect();
    Event::Display(text.trim().to_string())
}

fn input_name(line: &str, f: &[&str]) -> Event {
    let name = normalize_name(&field(f, 2));
    Event::InputName {
        code: field(f, 0),
        alias: f.get(1) == Some(&"1"),
        name: (!name.is_empty()).then_some(name),
        raw: line.to_string(),
    }
}

fn input_skip(_: &str, f: &[&str]) -> Event {
    Event::InputSkip {
        code: field(f, 0),
        enabled: f.get(1) != Some(&"01"),
    }
}

fn input_level(_: &str, f: &[&str]) -> Event {
    let raw: f64 = f.get(1).and_then(|v| v.parse().ok()).unwrap_or(24.0);
    Event::InputLevel {
        code: field(f, 0),
        db: raw / 2.0 - 12.0,
    }
}

fn terminal(_: &str, f: &[&str]) -> Event {
    let (kind, table) = match f[0] {
        "D" => (TerminalKind::Digital, tables::DIGITAL_TERMINALS),
        "H" => (TerminalKind::Hdmi, tables::HDMI_TERMINALS),
        _ => (TerminalKind::Component, tables::COMPONENT_TERMINALS),
    };
    Event::Terminal {
        code: field(f, 1),
        kind,
        terminal: coded(table, f.get(2).copied().unwrap_or_default()),
    }
}

fn tuner_frequency(_: &str, f: &[&str]) -> Event {
    let whole: u32 = f[1].parse().unwrap_or_default();
    if f[0] == "F" {
        Event::TunerFrequency {
            band: Band::Fm,
            frequency: format!("{}.{}", whole, f[2]),
        }
    } else {
        let khz: u32 = format!("{}{}", f[1], f[2]).parse().unwrap_or_default();
        Event::TunerFrequency {
            band: Band::Am,
            frequency: khz.to_string(),
        }
    }
}

fn tuner_preset(_: &str, f: &[&str]) -> Event {
    Event::TunerPreset(format!("{}{}", f[0], f[1]))
}

fn tuner_channel_name(_: &str, f: &[&str]) -> Event {
    Event::TunerChannelName {
        preset: field(f, 0),
        name: field(f, 1).trim().to_string(),
    }
}

/// Twelve digits, four zero-padded octets
fn ip_from_digits(digits: &str) -> String {
    let octets: Option<Vec<u8>> = digits
        .as_bytes()
        .chunks(3)
        .map(|c| std::str::from_utf8(c).ok()?.parse().ok())
        .collect();
    match octets.as_deref() {
        Some(&[a, b, c, d]) => Ipv4Addr::new(a, b, c, d).to_string(),
        _ => digits.to_string(),
    }
}

fn network(_: &str, f: &[&str]) -> Event {
    Event::Network(NetworkInfo {
        dhcp: f[0] == "1",
        ip: ip_from_digits(f[1]),
        netmask: ip_from_digits(f[2]),
        gateway: ip_from_digits(f[3]),
        primary_dns: ip_from_digits(f[4]),
        secondary_dns: ip_from_digits(f[5]),
    })
}

fn mac_address(_: &str, f: &[&str]) -> Event {
    let mac = f[0]
        .to_ascii_lowercase()
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect::<Vec<_>>()
        .join(":");
    Event::MacAddress(mac)
}

fn software_version(_: &str, f: &[&str]) -> Event {
    Event::SoftwareVersion(field(f, 0))
}

fn model(_: &str, f: &[&str]) -> Event {
    let text = field(f, 1);
    match text.split_once('/') {
        Some((model, detail)) => Event::Model {
            model: model.to_string(),
            detail: Some(detail.to_string()),
        },
        None => Event::Model {
            model: text,
            detail: None,
        },
    }
}

fn screen_line(_: &str, f: &[&str]) -> Event {
    Event::ScreenLine {
        line: f[0].parse().unwrap_or_default(),
        data_type: coded(tables::LINE_DATA_TYPES, f[2]),
        text: field(f, 3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> Event {
        Classifier::new().unwrap().classify(line)
    }

    // -----------------------------------------------------------------------
    // Fixed-prefix lines
    // -----------------------------------------------------------------------

    #[test]
    fn volume_and_power() {
        assert_eq!(classify("VOL121"), Event::Volume(121));
        assert_eq!(
            classify("PWR0"),
            Event::Power { code: "0".into(), state: PowerState::On }
        );
        assert_eq!(
            classify("PWR2"),
            Event::Power { code: "2".into(), state: PowerState::Off }
        );
        assert_eq!(
            classify("PWR7"),
            Event::Power { code: "7".into(), state: PowerState::Unknown }
        );
    }

    #[test]
    fn wrong_width_is_not_a_match() {
        assert_eq!(classify("VOL12"), Event::Unknown("VOL12".into()));
        assert_eq!(classify("FN5"), Event::Unknown("FN5".into()));
    }

    #[test]
    fn bass_and_treble_encoding() {
        assert_eq!(classify("BA02"), Event::Bass(4));
        assert_eq!(classify("BA06"), Event::Bass(0));
        assert_eq!(classify("BA12"), Event::Bass(-6));
        assert_eq!(classify("TR00"), Event::Treble(6));
    }

    #[test]
    fn settings_fall_back_to_raw_code() {
        assert_eq!(
            classify("MUT0"),
            Event::Setting {
                reading: "mute",
                value: Coded { code: "0".into(), name: Some("on") },
            }
        );
        assert_eq!(
            classify("SR0006"),
            Event::Setting {
                reading: "listeningMode",
                value: Coded { code: "0006".into(), name: Some("AUTO SURROUND") },
            }
        );
        assert_eq!(
            classify("SR9999"),
            Event::Setting {
                reading: "listeningMode",
                value: Coded { code: "9999".into(), name: None },
            }
        );
        assert_eq!(
            classify("LM010A"),
            Event::Setting {
                reading: "listeningModePlaying",
                value: Coded { code: "010a".into(), name: Some("XM HD Surround") },
            }
        );
    }

    // -----------------------------------------------------------------------
    // Regex lines
    // -----------------------------------------------------------------------

    #[test]
    fn input_inventory_names_are_normalized() {
        assert_eq!(
            classify("RGB050TV/SAT"),
            Event::InputName {
                code: "05".into(),
                alias: false,
                name: Some("tvSat".into()),
                raw: "RGB050TV/SAT".into(),
            }
        );
        match classify("RGB251 living  room ") {
            Event::InputName { code, alias, name, .. } => {
                assert_eq!(code, "25");
                assert!(alias);
                assert_eq!(name.as_deref(), Some("livingRoom"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match classify("RGB251---") {
            Event::InputName { name, .. } => assert_eq!(name, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn normalize_name_cases() {
        assert_eq!(normalize_name("BD"), "bd");
        assert_eq!(normalize_name("HDMI 1"), "hdmi1");
        assert_eq!(normalize_name("iPod/USB"), "ipodUsb");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn input_skip_level_and_terminals() {
        assert_eq!(
            classify("SSC0401"),
            Event::InputSkip { code: "04".into(), enabled: false }
        );
        assert_eq!(
            classify("SSC0400"),
            Event::InputSkip { code: "04".into(), enabled: true }
        );
        assert_eq!(
            classify("ILA1930"),
            Event::InputLevel { code: "19".into(), db: 3.0 }
        );
        assert_eq!(
            classify("SSH1902"),
            Event::Terminal {
                code: "19".into(),
                kind: TerminalKind::Hdmi,
                terminal: Coded { code: "02".into(), name: Some("hdmi2") },
            }
        );
    }

    #[test]
    fn tuner_lines() {
        assert_eq!(
            classify("FRF10110"),
            Event::TunerFrequency { band: Band::Fm, frequency: "101.10".into() }
        );
        assert_eq!(
            classify("FRF08750"),
            Event::TunerFrequency { band: Band::Fm, frequency: "87.50".into() }
        );
        assert_eq!(
            classify("FRA00981"),
            Event::TunerFrequency { band: Band::Am, frequency: "981".into() }
        );
        assert_eq!(classify("PRA06"), Event::TunerPreset("A06".into()));
        assert_eq!(
            classify(r#"TQA06"RADIO 1 ""#),
            Event::TunerChannelName { preset: "A06".into(), name: "RADIO 1".into() }
        );
    }

    #[test]
    fn network_block() {
        let line = "SUL1192168001010255255255000192168001001008008008008000000000000";
        assert_eq!(
            classify(line),
            Event::Network(NetworkInfo {
                dhcp: true,
                ip: "192.168.1.10".into(),
                netmask: "255.255.255.0".into(),
                gateway: "192.168.1.1".into(),
                primary_dns: "8.8.8.8".into(),
                secondary_dns: "0.0.0.0".into(),
            })
        );
    }

    #[test]
    fn identity_lines() {
        assert_eq!(
            classify("SVB00E036A1B2C3"),
            Event::MacAddress("00:e0:36:a1:b2:c3".into())
        );
        assert_eq!(
            classify(r#"SSI"1-020-120-012""#),
            Event::SoftwareVersion("1-020-120-012".into())
        );
        assert_eq!(
            classify("RGD<001><VSX-923/CYXESM>"),
            Event::Model { model: "VSX-923".into(), detail: Some("CYXESM".into()) }
        );
    }

    #[test]
    fn display_text_is_hex_decoded() {
        // "  STEREO" with a flag byte in front
        assert_eq!(
            classify("FL02202053544552454F"),
            Event::Display("STEREO".into())
        );
    }

    #[test]
    fn screen_lines_carry_data_type() {
        assert_eq!(
            classify(r#"GEP01021"Some Artist""#),
            Event::ScreenLine {
                line: 1,
                data_type: Coded { code: "21".into(), name: Some("currentArtist") },
                text: "Some Artist".into(),
            }
        );
    }

    // -----------------------------------------------------------------------
    // Errors, zones and catch-all
    // -----------------------------------------------------------------------

    #[test]
    fn device_errors() {
        assert_eq!(
            classify("E04"),
            Event::DeviceError { code: "E04".into(), explanation: "command error" }
        );
        assert_eq!(
            classify("B00"),
            Event::DeviceError { code: "B00".into(), explanation: "busy" }
        );
    }

    #[test]
    fn zone_lines_pass_through() {
        assert_eq!(
            classify("ZV45"),
            Event::Zoned { zone: Zone::Zone2, line: "ZV45".into() }
        );
        assert_eq!(
            classify("Z3MUT1"),
            Event::Zoned { zone: Zone::Zone3, line: "Z3MUT1".into() }
        );
        assert_eq!(
            classify("ZEP0"),
            Event::Zoned { zone: Zone::HdZone, line: "ZEP0".into() }
        );
    }

    #[test]
    fn unmatched_is_unknown() {
        assert_eq!(classify("XYZZY"), Event::Unknown("XYZZY".into()));
    }

    #[test]
    fn decoding_is_repeatable() {
        let classifier = Classifier::new().unwrap();
        for line in ["VOL100", "RGB051Cable", "FL02202053", "ZV10", "junk"] {
            assert_eq!(classifier.classify(line), classifier.classify(line));
        }
    }
}
