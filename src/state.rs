use crate::types::{ChannelCode, InputChannel, LinkState, PowerState};
use serde::Serialize;
use std::collections::BTreeMap;

/// Mutable receiver state
///
/// Readings are the externally visible values; the remaining fields are
/// bookkeeping the projector needs to derive them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceState {
    /// Reading name to current value
    pub readings: BTreeMap<String, String>,

    /// Display text before the current one
    pub display_previous: Option<String>,

    /// Input inventory, filled as replies arrive
    pub inputs: BTreeMap<ChannelCode, InputChannel>,

    /// Tuner preset code to station name
    pub tuner_names: BTreeMap<String, String>,

    /// Tuner preset last reported
    pub tuner_preset: Option<String>,

    /// Channel code of the active input
    pub active_input: Option<ChannelCode>,

    pub link: LinkState,

    pub power: PowerState,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading(&self, name: &str) -> Option<&str> {
        self.readings.get(name).map(String::as_str)
    }

    /// Entry for a channel, created on first sight
    pub fn input_mut(&mut self, code: &str) -> &mut InputChannel {
        self.inputs.entry(code.to_string()).or_default()
    }

    /// Label for a channel: alias, then factory name
    pub fn input_label(&self, code: &str) -> Option<&str> {
        self.inputs.get(code).and_then(InputChannel::assigned_name)
    }

    /// Forget values that do not survive a reconnect.
    ///
    /// Inventory and tuner names are kept; they describe the receiver's
    /// configuration rather than what it is doing right now.
    pub fn reset_transient(&mut self) {
        self.display_previous = None;
        self.power = PowerState::Unknown;
        for key in crate::tables::NOW_PLAYING_READINGS {
            self.readings.remove(*key);
        }
        self.readings.remove("display");
        self.readings.remove("displayPrevious");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_inventory() {
        let mut state = DeviceState::new();
        state.input_mut("05").name = Some("tvSat".into());
        state.tuner_names.insert("A01".into(), "RADIO 1".into());
        state.readings.insert("currentTitle".into(), "Song".into());
        state.readings.insert("volume".into(), "40".into());
        state.display_previous = Some("OLD".into());
        state.power = PowerState::On;

        state.reset_transient();

        assert_eq!(state.input_label("05"), Some("tvSat"));
        assert_eq!(state.tuner_names.len(), 1);
        assert_eq!(state.reading("currentTitle"), None);
        assert_eq!(state.reading("volume"), Some("40"));
        assert_eq!(state.display_previous, None);
        assert_eq!(state.power, PowerState::Unknown);
    }

    #[test]
    fn new_inputs_default_to_enabled() {
        let mut state = DeviceState::new();
        assert!(state.input_mut("19").enabled);
        assert_eq!(state.input_label("19"), None);

        state.input_mut("19").raw = Some("SSC1900".into());
        assert_eq!(state.input_label("19"), None);
    }
}
