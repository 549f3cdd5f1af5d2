use crate::error::{AvrError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Receiver raw volume range is 0..=185
pub const VOLUME_RAW_MAX: u16 = 185;

/// Session configuration
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Volume ceiling on the percentage scale (0..=100)
    pub volume_limit_percent: f64,

    /// Volume ceiling on the dB scale (-80..=12)
    pub volume_limit_db: f64,

    /// Actively probe the link when it goes quiet
    pub check_status: bool,

    /// Log verbosity, 0 (quiet) to 5 (trace raw lines)
    pub verbosity: u8,

    /// Silence tolerated before a probe is sent
    pub quiet_interval_secs: u64,

    /// Probe deadline after an outbound write
    pub write_window_secs: u64,

    /// How long a probe waits for any reply
    pub probe_timeout_secs: u64,

    /// Length of one idle read slice in the driver loop
    pub read_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            volume_limit_percent: 100.0,
            volume_limit_db: 12.0,
            check_status: true,
            verbosity: 3,
            quiet_interval_secs: 120,
            write_window_secs: 13,
            probe_timeout_secs: 2,
            read_timeout_ms: 100,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.volume_limit_percent) {
            return Err(AvrError::InvalidParameter(format!(
                "volume_limit_percent {} outside 0..=100",
                self.volume_limit_percent
            )));
        }
        if !(-80.0..=12.0).contains(&self.volume_limit_db) {
            return Err(AvrError::InvalidParameter(format!(
                "volume_limit_db {} outside -80..=12",
                self.volume_limit_db
            )));
        }
        if self.verbosity > 5 {
            return Err(AvrError::InvalidParameter(format!(
                "verbosity {} outside 0..=5",
                self.verbosity
            )));
        }
        if self.probe_timeout_secs == 0 || self.quiet_interval_secs == 0 {
            return Err(AvrError::InvalidParameter(
                "probe intervals must be non-zero".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(AvrError::InvalidParameter(
                "read_timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn quiet_interval(&self) -> Duration {
        Duration::from_secs(self.quiet_interval_secs)
    }

    pub fn write_window(&self) -> Duration {
        Duration::from_secs(self.write_window_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Effective volume ceiling as a raw receiver value.
    ///
    /// Both ceilings are normalized to the raw scale and the tighter one
    /// wins; on a tie the dB ceiling is used.
    pub fn volume_ceiling_raw(&self) -> u16 {
        let from_percent = percent_to_raw(self.volume_limit_percent);
        let from_db = db_to_raw(self.volume_limit_db);
        from_db.min(from_percent)
    }
}

/// Raw volume (0..=185) to the percentage scale
pub fn raw_to_percent(raw: u16) -> f64 {
    f64::from(raw) / 1.85
}

/// Raw volume (0..=185) to dB, 0.5 dB steps from -80.5
pub fn raw_to_db(raw: u16) -> f64 {
    f64::from(raw) / 2.0 - 80.5
}

pub fn percent_to_raw(percent: f64) -> u16 {
    (percent.clamp(0.0, 100.0) * 1.85).round() as u16
}

pub fn db_to_raw(db: f64) -> u16 {
    ((db + 80.5) * 2.0).round().clamp(0.0, f64::from(VOLUME_RAW_MAX)) as u16
}
