//! Static receiver vocabulary.
//!
//! Fixed-width codes the receiver reports mapped to readable names. These
//! tables are read-only; the only vocabulary learned at runtime is the tuner
//! station names, which live in the device state.

pub type Table = &'static [(&'static str, &'static str)];

/// Look up `code` in a table
pub fn lookup(table: Table, code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

/// Listening mode set (`SR`)
pub const LISTENING_MODES: Table = &[
    ("0001", "STEREO (cyclic)"),
    ("0009", "STEREO (direct set)"),
    ("0010", "STANDARD"),
    ("0011", "(2ch source)"),
    ("0012", "PRO LOGIC"),
    ("0013", "PRO LOGIC2 MOVIE"),
    ("0014", "PRO LOGIC2 MUSIC"),
    ("0015", "PRO LOGIC2 GAME"),
    ("0016", "Neo:6 CINEMA"),
    ("0017", "Neo:6 MUSIC"),
    ("0018", "PRO LOGIC2x MOVIE"),
    ("0019", "PRO LOGIC2x MUSIC"),
    ("0020", "PRO LOGIC2x GAME"),
    ("0028", "XM HD SURROUND"),
    ("0029", "NEURAL SURROUND"),
    ("0031", "PRO LOGIC2z HEIGHT"),
    ("0032", "WIDE SURROUND MOVIE"),
    ("0033", "WIDE SURROUND MUSIC"),
    ("0037", "Neo:X CINEMA"),
    ("0038", "Neo:X MUSIC"),
    ("0039", "Neo:X GAME"),
    ("0040", "NEURAL SURROUND+Neo:X CINEMA"),
    ("0041", "NEURAL SURROUND+Neo:X MUSIC"),
    ("0042", "NEURAL SURROUND+Neo:X GAME"),
    ("0003", "Front Stage Surround Advance Focus"),
    ("0004", "Front Stage Surround Advance Wide"),
    ("0005", "AUTO SURR/STREAM DIRECT (cyclic)"),
    ("0006", "AUTO SURROUND"),
    ("0007", "DIRECT"),
    ("0008", "PURE DIRECT"),
    ("0050", "THX (cyclic)"),
    ("0051", "PROLOGIC + THX CINEMA"),
    ("0052", "PL2 MOVIE + THX CINEMA"),
    ("0053", "Neo:6 CINEMA + THX CINEMA"),
    ("0054", "PL2x MOVIE + THX CINEMA"),
    ("0056", "THX CINEMA"),
    ("0057", "THX SURROUND EX"),
    ("0058", "PL2x MUSIC + THX MUSIC"),
    ("0069", "THX MUSIC"),
    ("0100", "ADVANCED SURROUND (cyclic)"),
    ("0101", "ACTION"),
    ("0102", "SCI-FI"),
    ("0103", "DRAMA"),
    ("0104", "ENTERTAINMENT SHOW"),
    ("0105", "MONO FILM"),
    ("0106", "EXPANDED THEATER"),
    ("0107", "CLASSICAL"),
    ("0109", "UNPLUGGED"),
    ("0110", "ROCK/POP"),
    ("0112", "EXTENDED STEREO"),
    ("0113", "PHONES SURROUND"),
    ("0116", "TV SURROUND"),
    ("0117", "SPORTS"),
    ("0118", "ADVANCED GAME"),
    ("0151", "Auto Level Control (A.L.C.)"),
    ("0152", "OPTIMUM SURROUND"),
    ("0153", "RETRIEVER AIR"),
];

/// Listening mode currently playing (`LM`), lower-case hex codes
pub const PLAYING_MODES: Table = &[
    ("0101", "[)(]PLIIx MOVIE"),
    ("0102", "[)(]PLII MOVIE"),
    ("0103", "[)(]PLIIx MUSIC"),
    ("0104", "[)(]PLII MUSIC"),
    ("0105", "[)(]PLIIx GAME"),
    ("0106", "[)(]PLII GAME"),
    ("0107", "[)(]PROLOGIC"),
    ("0108", "Neo:6 CINEMA"),
    ("0109", "Neo:6 MUSIC"),
    ("010a", "XM HD Surround"),
    ("010b", "NEURAL SURR"),
    ("010c", "2ch Straight Decode"),
    ("010d", "[)(]PLIIz HEIGHT"),
    ("010e", "WIDE SURR MOVIE"),
    ("010f", "WIDE SURR MUSIC"),
    ("0110", "STEREO"),
    ("0111", "Neo:X CINEMA"),
    ("0112", "Neo:X MUSIC"),
    ("0113", "Neo:X GAME"),
    ("0201", "ACTION"),
    ("0202", "DRAMA"),
    ("0203", "SCI-FI"),
    ("0204", "MONOFILM"),
    ("0205", "ENT.SHOW"),
    ("0206", "EXPANDED"),
    ("0207", "TV SURROUND"),
    ("0208", "ADVANCEDGAME"),
    ("0209", "SPORTS"),
    ("020a", "CLASSICAL"),
    ("020b", "ROCK/POP"),
    ("020c", "UNPLUGGED"),
    ("020d", "EXT.STEREO"),
    ("020e", "PHONES SURR."),
    ("020f", "FRONT STAGE SURROUND ADVANCE FOCUS"),
    ("0210", "FRONT STAGE SURROUND ADVANCE WIDE"),
    ("0211", "SOUND RETRIEVER AIR"),
    ("0301", "[)(]PLIIx MOVIE +THX"),
    ("0302", "[)(]PLII MOVIE +THX"),
    ("0303", "[)(]PL +THX CINEMA"),
    ("0304", "Neo:6 CINEMA +THX"),
    ("0305", "THX CINEMA"),
    ("0306", "[)(]PLIIx MUSIC +THX"),
    ("0307", "[)(]PLII MUSIC +THX"),
    ("0308", "[)(]PL +THX MUSIC"),
    ("0309", "Neo:6 MUSIC +THX"),
    ("030a", "THX MUSIC"),
    ("0401", "STEREO"),
    ("0402", "[)(]PLII MOVIE"),
    ("0403", "[)(]PLIIx MOVIE"),
    ("0405", "AUTO SURROUND Straight Decode"),
    ("0501", "STEREO"),
    ("0502", "[)(]PLII MOVIE"),
    ("0503", "[)(]PLIIx MOVIE"),
    ("0504", "Neo:6 CINEMA"),
    ("0505", "ALC Straight Decode"),
    ("0601", "STEREO"),
    ("0602", "[)(]PLII MOVIE"),
    ("0603", "[)(]PLIIx MOVIE"),
    ("0604", "Neo:6 CINEMA"),
    ("0605", "STREAM DIRECT NORMAL Straight Decode"),
    ("0701", "STREAM DIRECT PURE 2ch"),
    ("0702", "[)(]PLII MOVIE"),
    ("0703", "[)(]PLIIx MOVIE"),
    ("0704", "Neo:6 CINEMA"),
    ("0705", "STREAM DIRECT PURE Straight Decode"),
    ("0881", "OPTIMUM"),
    ("0e01", "HDMI THROUGH"),
    ("0f01", "MULTI CH IN"),
];

/// Speaker system configuration (`SSF`)
pub const SPEAKER_SYSTEMS: Table = &[
    ("00", "Normal(SB/FH)"),
    ("01", "Normal(SB/FW)"),
    ("02", "Speaker B"),
    ("03", "Front Bi-Amp"),
    ("04", "ZONE 2"),
    ("10", "9.1ch FH/FW"),
    ("11", "7.1ch + Speaker B"),
    ("12", "7.1ch Front Bi-Amp"),
    ("13", "7.1ch + ZONE2"),
    ("14", "7.1ch FH/FW + ZONE2"),
    ("15", "5.1ch Bi-Amp + ZONE2"),
    ("16", "5.1ch + ZONE 2+3"),
    ("17", "5.1ch + SP-B Bi-Amp"),
    ("18", "5.1ch F+Surr Bi-Amp"),
    ("19", "5.1ch F+C Bi-Amp"),
    ("20", "5.1ch C+Surr Bi-Amp"),
];

/// Data type of a network player screen line (`GEP`)
pub const LINE_DATA_TYPES: Table = &[
    ("00", "normal"),
    ("01", "directory"),
    ("02", "music"),
    ("03", "photo"),
    ("04", "video"),
    ("05", "nowPlaying"),
    ("20", "currentTitle"),
    ("21", "currentArtist"),
    ("22", "currentAlbum"),
    ("23", "time"),
    ("24", "currentGenre"),
    ("25", "chapterNumber"),
    ("26", "format"),
    ("27", "bitPerSample"),
    ("28", "samplingRate"),
    ("29", "bitrate"),
    ("31", "currentChannel"),
    ("32", "currentStation"),
];

/// Readings fed from screen lines; all are stale once the input changes
pub const NOW_PLAYING_READINGS: &[&str] = &[
    "currentTitle",
    "currentArtist",
    "currentAlbum",
    "time",
    "currentGenre",
    "chapterNumber",
    "format",
    "bitPerSample",
    "samplingRate",
    "bitrate",
    "currentChannel",
    "currentStation",
];

pub const DIGITAL_TERMINALS: Table = &[
    ("00", "noAssign"),
    ("01", "coax1"),
    ("02", "coax2"),
    ("03", "coax3"),
    ("04", "opt1"),
    ("05", "opt2"),
    ("06", "opt3"),
    ("10", "analog"),
];

pub const HDMI_TERMINALS: Table = &[
    ("00", "noAssign"),
    ("01", "hdmi1"),
    ("02", "hdmi2"),
    ("03", "hdmi3"),
    ("04", "hdmi4"),
    ("05", "hdmi5"),
    ("06", "hdmi6"),
    ("07", "hdmi7"),
    ("08", "hdmi8"),
    ("09", "mhl"),
];

pub const COMPONENT_TERMINALS: Table = &[
    ("00", "noAssign"),
    ("01", "component1"),
    ("02", "component2"),
    ("03", "component3"),
];

pub const SPEAKERS: Table = &[("0", "off"), ("1", "A"), ("2", "B"), ("3", "A+B")];

pub const SIGNAL_SELECT: Table = &[
    ("0", "auto"),
    ("1", "analog"),
    ("2", "digital"),
    ("3", "hdmi"),
    ("4", "cycle"),
];

pub const MUTE: Table = &[("0", "on"), ("1", "off")];

pub const TONE: Table = &[("0", "bypass"), ("1", "on")];

pub const ON_OFF: Table = &[("0", "off"), ("1", "on")];

pub const MCACC_MEMORY: Table = &[
    ("1", "M1"),
    ("2", "M2"),
    ("3", "M3"),
    ("4", "M4"),
    ("5", "M5"),
    ("6", "M6"),
];

pub const PHASE_CONTROL: Table = &[("0", "off"), ("1", "on"), ("2", "fullBandOn")];

pub const HDMI_OUT: Table = &[("0", "all"), ("1", "out1"), ("2", "out2"), ("3", "off")];

pub const PQLS: Table = &[("0", "off"), ("1", "auto")];

/// Error and busy replies with their meaning
pub const DEVICE_ERRORS: Table = &[
    ("E02", "not available now"),
    ("E03", "invalid command"),
    ("E04", "command error"),
    ("E05", "parameter out of range"),
    ("E06", "parameter error"),
    ("B00", "busy"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(lookup(LISTENING_MODES, "0006"), Some("AUTO SURROUND"));
        assert_eq!(lookup(PLAYING_MODES, "010a"), Some("XM HD Surround"));
        assert_eq!(lookup(SPEAKER_SYSTEMS, "99"), None);
    }

    #[test]
    fn tables_have_unique_codes() {
        for table in [LISTENING_MODES, PLAYING_MODES, SPEAKER_SYSTEMS, LINE_DATA_TYPES] {
            let mut codes: Vec<_> = table.iter().map(|(c, _)| *c).collect();
            let len = codes.len();
            codes.sort_unstable();
            codes.dedup();
            assert_eq!(codes.len(), len);
        }
    }

    #[test]
    fn now_playing_readings_are_screen_labels() {
        for reading in NOW_PLAYING_READINGS {
            assert!(LINE_DATA_TYPES.iter().any(|(_, label)| label == reading));
        }
    }
}
