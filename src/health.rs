//! Link watchdog.
//!
//! At most one probe is outstanding. Every reschedule bumps a generation
//! counter and hands out a new [`ProbeToken`]; a timer carrying an older
//! token is ignored when it fires.

use crate::config::SessionConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Identifies one scheduled probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Health checking off, or nothing scheduled yet
    Idle,
    /// A probe is scheduled
    Watching,
    /// A probe is in flight
    Probing,
}

pub struct HealthSupervisor {
    enabled: bool,
    quiet_interval: Duration,
    write_window: Duration,
    probe_timeout: Duration,
    generation: u64,
    deadline: Option<Instant>,
    phase: Phase,
}

impl HealthSupervisor {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            enabled: config.check_status,
            quiet_interval: config.quiet_interval(),
            write_window: config.write_window(),
            probe_timeout: config.probe_timeout(),
            generation: 0,
            deadline: None,
            phase: Phase::Idle,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// When the current probe is due, with the token it must present
    pub fn deadline(&self) -> Option<(Instant, ProbeToken)> {
        match self.phase {
            Phase::Watching => self.deadline.map(|at| (at, ProbeToken(self.generation))),
            _ => None,
        }
    }

    fn schedule(&mut self, at: Instant) {
        self.generation += 1;
        self.deadline = Some(at);
        self.phase = Phase::Watching;
        tracing::trace!(generation = self.generation, "probe scheduled");
    }

    fn cancel(&mut self) {
        self.generation += 1;
        self.deadline = None;
        self.phase = Phase::Idle;
    }

    /// Start watching after the link comes up
    pub fn start(&mut self, now: Instant) {
        if self.enabled {
            self.schedule(now + self.quiet_interval);
        }
    }

    /// Stop watching; pending timers become stale
    pub fn stop(&mut self) {
        self.cancel();
    }

    /// Bytes arrived: push the probe a full quiet interval out
    pub fn on_traffic(&mut self, now: Instant) {
        if self.enabled && self.phase != Phase::Probing {
            self.schedule(now + self.quiet_interval);
        }
    }

    /// A line was written: silence after a write is suspicious sooner
    pub fn on_write(&mut self, now: Instant) {
        if !self.enabled || self.phase != Phase::Watching {
            return;
        }
        let tightened = now + self.write_window;
        if self.deadline.is_some_and(|at| at > tightened) {
            self.schedule(tightened);
        }
    }

    /// Claim the probe for `token`; false if the token is stale
    pub fn begin_probe(&mut self, token: ProbeToken) -> bool {
        if !self.enabled || self.phase != Phase::Watching || token.0 != self.generation {
            tracing::trace!(?token, generation = self.generation, "stale probe timer");
            return false;
        }
        self.phase = Phase::Probing;
        self.deadline = None;
        true
    }

    /// Probe finished, whatever the outcome
    pub fn finish_probe(&mut self, now: Instant) {
        if self.enabled {
            self.schedule(now + self.quiet_interval);
        } else {
            self.cancel();
        }
    }

    pub fn set_enabled(&mut self, enabled: bool, now: Instant) {
        match (self.enabled, enabled) {
            (false, true) => {
                self.enabled = true;
                self.schedule(now + self.quiet_interval);
            }
            (true, false) => {
                self.enabled = false;
                self.cancel();
            }
            _ => {}
        }
    }
}
