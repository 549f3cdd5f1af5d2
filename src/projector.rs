//! Applies decoded events to the device state.
//!
//! Updates are collected into a pending batch which the session hands to
//! the state publisher once the whole read has been processed.

use crate::classifier::Event;
use crate::config::{raw_to_db, raw_to_percent, SessionConfig};
use crate::protocol::Command;
use crate::state::DeviceState;
use crate::tables::NOW_PLAYING_READINGS;
use crate::types::{summary_status, InputChannel, LinkState, PowerState, Reading, TerminalKind};

/// Device state plus the updates not yet published
pub struct Projector {
    state: DeviceState,
    volume_ceiling: u16,
    verbosity: u8,
    pending: Vec<Reading>,
}

impl Projector {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            state: DeviceState::new(),
            volume_ceiling: config.volume_ceiling_raw(),
            verbosity: config.verbosity,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Effective volume ceiling on the raw scale
    pub fn volume_ceiling(&self) -> u16 {
        self.volume_ceiling
    }

    /// Take the updates collected since the last call
    pub fn take_batch(&mut self) -> Vec<Reading> {
        std::mem::take(&mut self.pending)
    }

    fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.state.readings.insert(name.to_string(), value.clone());
        self.pending.push(Reading {
            name: name.to_string(),
            value,
        });
    }

    fn publish_status(&mut self) {
        let status = summary_status(self.state.link, self.state.power);
        self.set("state", status);
    }

    /// Record a link transition and republish the summary status
    pub fn set_link(&mut self, link: LinkState) {
        if link != LinkState::Open {
            self.state.reset_transient();
        }
        self.state.link = link;
        self.publish_status();
    }

    /// Apply one event.
    ///
    /// `line` is the raw line the event was decoded from; it is the label of
    /// last resort for inputs. A returned command must be written right away.
    pub fn apply(&mut self, line: &str, event: Event) -> Option<Command> {
        match event {
            Event::Volume(raw) => return self.apply_volume(raw),
            Event::Power { code, state } => {
                self.state.power = state;
                match state {
                    PowerState::On => self.set("power", "on"),
                    PowerState::Off => self.set("power", "off"),
                    PowerState::Unknown => {
                        tracing::warn!(code = %code, "unknown power code");
                        self.set("power", code);
                    }
                }
                self.publish_status();
            }
            Event::Input(code) => self.apply_input(line, code),
            Event::Bass(db) => self.set("bass", db.to_string()),
            Event::Treble(db) => self.set("treble", db.to_string()),
            Event::Setting { reading, value } => {
                if value.name.is_none() {
                    tracing::info!(reading, code = %value.code, "unrecognized code, publishing raw value");
                }
                self.set(reading, value.value());
            }
            Event::Display(text) => {
                let current = self.state.reading("display").map(str::to_string);
                if let Some(previous) = current.filter(|prev| *prev != text) {
                    self.state.display_previous = Some(previous.clone());
                    self.set("displayPrevious", previous);
                }
                self.set("display", text);
            }
            Event::InputName {
                code,
                alias,
                name,
                raw,
            } => {
                let entry = self.state.input_mut(&code);
                entry.raw = Some(raw);
                match (alias, name) {
                    (true, name) => entry.alias = name,
                    (false, Some(name)) => entry.name = Some(name),
                    (false, None) => {}
                }
                tracing::debug!(code = %code, label = ?entry.label(), "input inventory");

                // the active input may just have received its label
                if self.state.active_input.as_deref() == Some(code.as_str()) {
                    if let Some(label) = self.state.input_label(&code).map(str::to_string) {
                        self.set("input", label);
                    }
                }
            }
            Event::InputSkip { code, enabled } => {
                self.inventory_entry(&code, line).enabled = enabled;
            }
            Event::InputLevel { code, db } => {
                self.inventory_entry(&code, line).level_adjust_db = Some(db);
            }
            Event::Terminal {
                code,
                kind,
                terminal,
            } => {
                let value = Some(terminal.value());
                let entry = self.inventory_entry(&code, line);
                match kind {
                    TerminalKind::Digital => entry.digital = value,
                    TerminalKind::Hdmi => entry.hdmi = value,
                    TerminalKind::Component => entry.component = value,
                }
            }
            Event::TunerFrequency { band, frequency } => {
                self.set("tunerFrequencyBand", band.as_str());
                self.set("tunerFrequency", frequency);
            }
            Event::TunerPreset(preset) => {
                let name = self.state.tuner_names.get(&preset).cloned();
                self.state.tuner_preset = Some(preset.clone());
                self.set("tunerPreset", preset);
                if let Some(name) = name {
                    self.set("tunerChannelName", name);
                }
            }
            Event::TunerChannelName { preset, name } => {
                if self.state.tuner_preset.as_deref() == Some(preset.as_str()) {
                    self.set("tunerChannelName", name.clone());
                }
                self.state.tuner_names.insert(preset, name);
            }
            Event::Network(info) => {
                self.set("networkDHCP", if info.dhcp { "on" } else { "off" });
                self.set("networkIP", info.ip);
                self.set("networkNetmask", info.netmask);
                self.set("networkGateway", info.gateway);
                self.set("networkDNS1", info.primary_dns);
                self.set("networkDNS2", info.secondary_dns);
            }
            Event::MacAddress(mac) => self.set("macAddress", mac),
            Event::SoftwareVersion(version) => self.set("softwareVersion", version),
            Event::Model { model, detail } => {
                self.set("model", model);
                if let Some(detail) = detail {
                    self.set("modelDetail", detail);
                }
            }
            Event::ScreenLine {
                line: number,
                data_type,
                text,
            } => {
                self.set(&format!("screenLine{:02}", number), text.clone());
                if let Some(reading) = data_type.name {
                    if NOW_PLAYING_READINGS.contains(&reading) {
                        self.set(reading, text);
                    }
                }
            }
            Event::DeviceError { code, explanation } => {
                tracing::warn!(code = %code, "receiver reported: {}", explanation);
            }
            Event::Zoned { zone, line } => {
                tracing::debug!(zone = %zone, line = %line, "zone line reached the projector, ignoring");
            }
            Event::Unknown(line) => {
                if self.verbosity >= 3 {
                    tracing::info!(line = %line, "unknown line");
                } else {
                    tracing::debug!(line = %line, "unknown line");
                }
            }
        }
        None
    }

    fn apply_volume(&mut self, raw: u16) -> Option<Command> {
        // integer percent is truncated, dB keeps its half steps
        self.set("volume", (raw_to_percent(raw) as u16).to_string());
        self.set("volumeStraight", raw_to_db(raw).to_string());
        self.set("volumeRaw", raw.to_string());

        if raw > self.volume_ceiling {
            tracing::warn!(
                reported = raw,
                ceiling = self.volume_ceiling,
                "volume above ceiling, correcting"
            );
            return Some(Command::SetVolumeRaw(self.volume_ceiling));
        }
        None
    }

    fn apply_input(&mut self, line: &str, code: String) {
        let label = self
            .state
            .input_label(&code)
            .unwrap_or(line)
            .to_string();
        self.state.active_input = Some(code.clone());
        self.set("input", label);
        self.set("inputCode", code);

        for reading in NOW_PLAYING_READINGS {
            let stale = self
                .state
                .reading(reading)
                .is_some_and(|value| !value.is_empty());
            if stale {
                self.set(reading, "");
            }
        }
    }

    /// Inventory entry that always carries at least the raw line
    fn inventory_entry(&mut self, code: &str, line: &str) -> &mut InputChannel {
        let entry = self.state.input_mut(code);
        if entry.raw.is_none() {
            entry.raw = Some(line.to_string());
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;

    fn project(projector: &mut Projector, lines: &[&str]) -> Vec<Command> {
        let classifier = Classifier::new().unwrap();
        lines
            .iter()
            .filter_map(|line| projector.apply(line, classifier.classify(line)))
            .collect()
    }

    fn reading<'a>(projector: &'a Projector, name: &str) -> Option<&'a str> {
        projector.state().reading(name)
    }

    #[test]
    fn volume_above_ceiling_is_corrected_once() {
        let config = SessionConfig {
            volume_limit_percent: 80.0,
            ..Default::default()
        };
        let mut projector = Projector::new(&config);

        // raw 178 is 96%
        let corrections = project(&mut projector, &["VOL178"]);
        assert_eq!(reading(&projector, "volume"), Some("96"));
        assert_eq!(reading(&projector, "volumeStraight"), Some("8.5"));
        assert_eq!(corrections, vec![Command::SetVolumeRaw(148)]);
    }

    #[test]
    fn volume_within_ceiling_is_left_alone() {
        let mut projector = Projector::new(&SessionConfig::default());
        let corrections = project(&mut projector, &["VOL178", "VOL185"]);
        assert!(corrections.is_empty());
        assert_eq!(reading(&projector, "volume"), Some("100"));
        assert_eq!(reading(&projector, "volumeStraight"), Some("12"));
    }

    #[test]
    fn input_label_resolution() {
        let mut projector = Projector::new(&SessionConfig::default());
        project(&mut projector, &["RGB050TV/SAT", "RGB051LIVINGROOM", "FN05"]);
        assert_eq!(reading(&projector, "input"), Some("livingroom"));
        assert_eq!(projector.state().active_input.as_deref(), Some("05"));

        let mut projector = Projector::new(&SessionConfig::default());
        project(&mut projector, &["RGB050TV/SAT", "FN05"]);
        assert_eq!(reading(&projector, "input"), Some("tvSat"));

        let mut projector = Projector::new(&SessionConfig::default());
        project(&mut projector, &["FN05"]);
        assert_eq!(reading(&projector, "input"), Some("FN05"));
        assert_eq!(reading(&projector, "inputCode"), Some("05"));
    }

    #[test]
    fn unnamed_input_is_labelled_by_its_change_line() {
        let mut projector = Projector::new(&SessionConfig::default());
        project(&mut projector, &["SSC1900", "SSD1901", "FN19"]);
        assert_eq!(reading(&projector, "input"), Some("FN19"));
        assert_eq!(
            projector.state().inputs["19"].raw.as_deref(),
            Some("SSC1900")
        );

        // a later factory name replaces the line label
        project(&mut projector, &["RGB190IPOD/USB"]);
        assert_eq!(reading(&projector, "input"), Some("ipodUsb"));
    }

    #[test]
    fn input_change_clears_now_playing() {
        let mut projector = Projector::new(&SessionConfig::default());
        projector.set("currentTitle", "Song");
        projector.set("currentArtist", "Band");
        projector.take_batch();

        project(&mut projector, &["FN44"]);
        assert_eq!(reading(&projector, "currentTitle"), Some(""));
        assert_eq!(reading(&projector, "currentArtist"), Some(""));

        let batch = projector.take_batch();
        assert!(batch.iter().any(|r| r.name == "currentTitle" && r.value.is_empty()));
        assert!(!batch.iter().any(|r| r.name == "currentAlbum"));
    }

    #[test]
    fn tone_readings() {
        let mut projector = Projector::new(&SessionConfig::default());
        project(&mut projector, &["BA02", "TR12"]);
        assert_eq!(reading(&projector, "bass"), Some("4"));
        assert_eq!(reading(&projector, "treble"), Some("-6"));
    }

    #[test]
    fn display_keeps_previous_text() {
        let mut projector = Projector::new(&SessionConfig::default());
        // "STEREO" then "MUTE ON"
        project(
            &mut projector,
            &["FL02202053544552454F", "FL0220204D555445204F4E"],
        );
        assert_eq!(reading(&projector, "display"), Some("MUTE ON"));
        assert_eq!(reading(&projector, "displayPrevious"), Some("STEREO"));

        // same text again leaves the previous text alone
        project(&mut projector, &["FL0220204D555445204F4E"]);
        assert_eq!(reading(&projector, "displayPrevious"), Some("STEREO"));
    }

    #[test]
    fn power_drives_summary_status() {
        let mut projector = Projector::new(&SessionConfig::default());
        projector.set_link(LinkState::Open);
        assert_eq!(reading(&projector, "state"), Some("opened"));

        project(&mut projector, &["PWR0"]);
        assert_eq!(reading(&projector, "power"), Some("on"));
        assert_eq!(reading(&projector, "state"), Some("on"));

        project(&mut projector, &["PWR1"]);
        assert_eq!(reading(&projector, "state"), Some("off"));

        projector.set_link(LinkState::Disconnected);
        assert_eq!(reading(&projector, "state"), Some("disconnected"));
        assert_eq!(projector.state().power, PowerState::Unknown);
    }

    #[test]
    fn inventory_entries_always_have_a_label() {
        let mut projector = Projector::new(&SessionConfig::default());
        project(&mut projector, &["SSC1903"]);
        let input = &projector.state().inputs["19"];
        assert!(input.label().is_some());
    }

    #[test]
    fn tuner_name_follows_preset() {
        let mut projector = Projector::new(&SessionConfig::default());
        project(&mut projector, &["TQA06\"RADIO 1 \"", "PRA06"]);
        assert_eq!(reading(&projector, "tunerPreset"), Some("A06"));
        assert_eq!(reading(&projector, "tunerChannelName"), Some("RADIO 1"));
    }

    #[test]
    fn same_line_twice_gives_same_updates() {
        let mut projector = Projector::new(&SessionConfig::default());
        project(&mut projector, &["SR0005"]);
        let first = projector.take_batch();
        project(&mut projector, &["SR0005"]);
        assert_eq!(projector.take_batch(), first);
    }
}
