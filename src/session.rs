//! Protocol session.
//!
//! A [`Session`] owns the transport and everything between it and the
//! host: framing, classification, projection, zone routing and the link
//! watchdog. It never spawns or sleeps on its own. The driver task in
//! `connection` feeds it reads and timer expiries; every entry point takes
//! the current time so tests can drive it deterministically.

use crate::classifier::{Classifier, Event};
use crate::config::SessionConfig;
use crate::error::{AvrError, Result};
use crate::framer::{LineFramer, TERMINATOR};
use crate::health::{HealthSupervisor, Phase, ProbeToken};
use crate::projector::Projector;
use crate::protocol::{self, Command};
use crate::state::DeviceState;
use crate::subscription::StatePublisher;
use crate::transport::Transport;
use crate::types::LinkState;
use crate::zone::{ZoneRegistry, ZoneRouter};
use std::sync::Arc;
use tokio::time::Instant;

const READ_BUF: usize = 1024;

/// What a fired probe timer led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The token was superseded; nothing happened
    Stale,
    /// The receiver answered
    Alive,
    /// No answer; the link was reopened and status refreshed
    Reconnected,
    /// No answer and the link could not be reopened
    Failed,
}

pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    framer: LineFramer,
    classifier: Classifier,
    projector: Projector,
    router: ZoneRouter,
    health: HealthSupervisor,
    publisher: Box<dyn StatePublisher>,
}

impl<T: Transport> Session<T> {
    pub fn new(
        transport: T,
        config: SessionConfig,
        publisher: Box<dyn StatePublisher>,
        zones: Arc<dyn ZoneRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            framer: LineFramer::new(),
            classifier: Classifier::new()?,
            projector: Projector::new(&config),
            router: ZoneRouter::new(zones),
            health: HealthSupervisor::new(&config),
            transport,
            config,
            publisher,
        })
    }

    pub fn state(&self) -> &DeviceState {
        self.projector.state()
    }

    pub fn link(&self) -> LinkState {
        self.projector.state().link
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Bytes carried over to the next read
    pub fn pending_partial(&self) -> &[u8] {
        self.framer.partial()
    }

    /// Next probe and the token it must be fired with
    pub fn probe_deadline(&self) -> Option<(Instant, ProbeToken)> {
        self.health.deadline()
    }

    fn publish(&mut self) {
        let batch = self.projector.take_batch();
        if batch.is_empty() {
            return;
        }
        self.publisher.begin_batch();
        for reading in &batch {
            self.publisher.set_field(&reading.name, &reading.value);
        }
        self.publisher.end_batch();
    }

    fn set_link(&mut self, link: LinkState) {
        tracing::debug!(?link, "link state");
        self.projector.set_link(link);
        self.publish();
    }

    /// Open the link, refresh status and start the watchdog
    pub async fn open(&mut self, now: Instant) -> Result<()> {
        self.set_link(LinkState::Opening);
        match self.transport.open().await {
            Ok(()) => {
                tracing::info!("link opened");
                self.framer.reset();
                self.set_link(LinkState::Open);
                self.health.start(now);
                self.refresh_status(now).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to open link");
                self.set_link(LinkState::Disconnected);
                // the watchdog retries
                self.health.start(now);
                Err(e)
            }
        }
    }

    /// Close the link and stop watching it
    pub async fn close(&mut self) -> Result<()> {
        self.health.stop();
        let result = self.transport.close().await;
        self.framer.reset();
        self.set_link(LinkState::Closed);
        tracing::info!("link closed");
        result
    }

    /// Process one read event.
    ///
    /// All lines framed from `bytes` are applied and published as a single
    /// batch. Volume corrections are written after the batch.
    pub async fn handle_bytes(&mut self, bytes: &[u8], now: Instant) {
        if bytes.is_empty() {
            return;
        }
        self.health.on_traffic(now);
        if self.config.verbosity >= 5 {
            tracing::trace!(raw = %String::from_utf8_lossy(bytes).escape_debug(), "read");
        }

        let mut corrections = Vec::new();
        for line in self.framer.feed(bytes) {
            match self.classifier.classify(&line) {
                Event::Zoned { zone, line: raw } => {
                    self.router.route(zone, &raw);
                }
                event => {
                    if let Some(command) = self.projector.apply(&line, event) {
                        corrections.push(command);
                    }
                }
            }
        }
        self.publish();

        for command in corrections {
            if let Err(e) = self.send(command, now).await {
                tracing::warn!(error = %e, "failed to write correction");
            }
        }
    }

    /// Read once from the transport, waiting at most one read slice.
    ///
    /// Returns the number of bytes processed; a quiet link yields `Ok(0)`.
    pub async fn poll_read(&mut self, now: Instant) -> Result<usize> {
        if self.link() != LinkState::Open {
            return Err(AvrError::NotConnected);
        }

        let mut buf = [0u8; READ_BUF];
        let result = self.read_raw(&mut buf).await;
        self.on_read(result, &buf, now).await
    }

    /// Transport read only; dropping this future loses no data
    pub(crate) async fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.transport.read(buf, self.config.read_timeout()).await
    }

    /// Process the outcome of [`read_raw`](Self::read_raw)
    pub(crate) async fn on_read(
        &mut self,
        result: Result<usize>,
        buf: &[u8],
        now: Instant,
    ) -> Result<usize> {
        match result {
            Ok(0) => {
                self.link_down("peer closed the link", now).await;
                Err(AvrError::ConnectionClosed)
            }
            Ok(n) => {
                self.handle_bytes(&buf[..n], now).await;
                Ok(n)
            }
            Err(AvrError::Timeout) => Ok(0),
            Err(e) if e.is_link_down() => {
                self.link_down(&e.to_string(), now).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Encode and write one command
    pub async fn send(&mut self, command: Command, now: Instant) -> Result<()> {
        if self.link() != LinkState::Open {
            return Err(AvrError::NotConnected);
        }

        let bytes = command.encode(self.projector.state().active_input.as_deref())?;
        tracing::debug!(?command, "send");

        match self.transport.write(&bytes).await {
            Ok(()) => {
                self.health.on_write(now);
                Ok(())
            }
            Err(e) => {
                if e.is_link_down() {
                    self.link_down(&e.to_string(), now).await;
                }
                Err(e)
            }
        }
    }

    /// Query everything the receiver reports, inventory included
    pub async fn refresh_status(&mut self, now: Instant) -> Result<()> {
        tracing::info!("refreshing status");
        for query in protocol::status_queries() {
            self.send(query, now).await?;
        }
        Ok(())
    }

    pub fn set_health_check(&mut self, enabled: bool, now: Instant) {
        tracing::info!(enabled, "health check");
        self.health.set_enabled(enabled, now);
    }

    /// Run the probe scheduled under `token`
    pub async fn on_probe_timer(&mut self, token: ProbeToken, now: Instant) -> ProbeOutcome {
        if !self.health.begin_probe(token) {
            return ProbeOutcome::Stale;
        }

        let outcome = if self.link() == LinkState::Open && self.probe().await {
            ProbeOutcome::Alive
        } else {
            self.reconnect(now).await
        };

        self.health.finish_probe(now);
        tracing::debug!(?outcome, "probe finished");
        outcome
    }

    /// Write a bare terminator and wait for any reply
    async fn probe(&mut self) -> bool {
        tracing::debug!("probing link");
        if let Err(e) = self.transport.write(TERMINATOR).await {
            tracing::warn!(error = %e, "probe write failed");
            return false;
        }

        let mut buf = [0u8; READ_BUF];
        match self.transport.read(&mut buf, self.health.probe_timeout()).await {
            Ok(n) if n > 0 => {
                // keep the reply for the next regular read
                self.framer.absorb(&buf[..n]);
                true
            }
            Ok(_) => false,
            Err(AvrError::Timeout) => {
                tracing::warn!(timeout = ?self.health.probe_timeout(), "no reply to probe");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "probe read failed");
                false
            }
        }
    }

    /// One reopen attempt
    async fn reconnect(&mut self, now: Instant) -> ProbeOutcome {
        tracing::warn!("reconnecting");
        if let Err(e) = self.transport.close().await {
            tracing::debug!(error = %e, "close before reconnect failed");
        }
        self.framer.reset();
        self.set_link(LinkState::Opening);

        match self.transport.open().await {
            Ok(()) => {
                tracing::info!("link reopened");
                self.set_link(LinkState::Open);
                if let Err(e) = self.refresh_status(now).await {
                    tracing::warn!(error = %e, "status refresh after reconnect failed");
                }
                if self.link() == LinkState::Open {
                    ProbeOutcome::Reconnected
                } else {
                    ProbeOutcome::Failed
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "reconnect failed");
                self.set_link(LinkState::Disconnected);
                ProbeOutcome::Failed
            }
        }
    }

    async fn link_down(&mut self, reason: &str, now: Instant) {
        tracing::warn!(reason, "link down");
        if let Err(e) = self.transport.close().await {
            tracing::debug!(error = %e, "close after link loss failed");
        }
        self.framer.reset();
        self.set_link(LinkState::Disconnected);
        if self.health.phase() == Phase::Idle {
            self.health.start(now);
        }
    }
}
