use crate::config::{db_to_raw, percent_to_raw, SessionConfig};
use crate::connection::{spawn_driver, Driver, Request};
use crate::error::{AvrError, Result};
use crate::protocol::{Command, PlayerCommand};
use crate::session::Session;
use crate::state::DeviceState;
use crate::subscription::{BroadcastPublisher, StateReceiver, StateUpdate};
use crate::transport::Transport;
use crate::zone::ZoneDirectory;
use std::sync::Arc;
use tokio::sync::broadcast;

const STATE_CHANNEL_CAPACITY: usize = 100;

/// Client for a Pioneer-style AV receiver
///
/// The `AvrClient` owns a background task that keeps the link open, decodes
/// everything the receiver reports and reconnects when the link goes
/// silent. Commands are queued to that task; state changes arrive as
/// batches through [`subscribe_state`](AvrClient::subscribe_state).
pub struct AvrClient {
    driver: Driver,
    updates: broadcast::Sender<StateUpdate>,
    zones: ZoneDirectory,
    volume_ceiling: u16,
}

impl AvrClient {
    /// Start driving a receiver over `transport`
    ///
    /// The link is opened in the background; a failed first open is
    /// retried by the watchdog when health checking is enabled.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pioneer_avr::{AvrClient, SessionConfig};
    /// use pioneer_avr::transport::mock::MockTransport;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = AvrClient::spawn(MockTransport::new(), SessionConfig::default())?;
    ///     client.power(true).await?;
    ///     client.set_volume_db(-30.0).await?;
    ///     client.shutdown().await;
    ///     Ok(())
    /// }
    /// ```
    pub fn spawn<T: Transport + 'static>(transport: T, config: SessionConfig) -> Result<Self> {
        let zones = ZoneDirectory::new();
        let publisher = BroadcastPublisher::new(STATE_CHANNEL_CAPACITY);
        let updates = publisher.sender();
        let volume_ceiling = config.volume_ceiling_raw();

        let session = Session::new(
            transport,
            config,
            Box::new(publisher),
            Arc::new(zones.clone()),
        )?;

        Ok(Self {
            driver: spawn_driver(session),
            updates,
            zones,
            volume_ceiling,
        })
    }

    /// Write one command
    pub async fn send(&self, command: Command) -> Result<()> {
        self.driver
            .request(|reply| Request::Send { command, reply })
            .await?
    }

    /// Set the volume on the percentage scale, capped at the ceiling
    pub async fn set_volume_percent(&self, percent: f64) -> Result<()> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(AvrError::InvalidParameter(format!(
                "volume {}% outside 0..=100",
                percent
            )));
        }
        self.set_volume_raw(percent_to_raw(percent)).await
    }

    /// Set the volume in dB, capped at the ceiling
    pub async fn set_volume_db(&self, db: f64) -> Result<()> {
        if !(-80.5..=12.0).contains(&db) {
            return Err(AvrError::InvalidParameter(format!(
                "volume {} dB outside -80.5..=12",
                db
            )));
        }
        self.set_volume_raw(db_to_raw(db)).await
    }

    async fn set_volume_raw(&self, raw: u16) -> Result<()> {
        if raw > self.volume_ceiling {
            tracing::debug!(requested = raw, ceiling = self.volume_ceiling, "volume capped");
        }
        self.send(Command::SetVolumeRaw(raw.min(self.volume_ceiling)))
            .await
    }

    pub async fn power(&self, on: bool) -> Result<()> {
        let command = if on { Command::PowerOn } else { Command::PowerOff };
        self.send(command).await
    }

    pub async fn mute(&self, on: bool) -> Result<()> {
        self.send(Command::Mute(on)).await
    }

    /// Switch to the input with the given two-digit channel code
    pub async fn select_input(&self, code: &str) -> Result<()> {
        self.send(Command::SelectInput(code.to_string())).await
    }

    /// Transport control for the active input
    ///
    /// Fails with [`AvrError::Unsupported`] when the active input has no
    /// player.
    pub async fn player(&self, command: PlayerCommand) -> Result<()> {
        self.send(Command::Player(command)).await
    }

    /// Query the full status again
    pub async fn refresh(&self) -> Result<()> {
        self.driver.request(|reply| Request::Refresh { reply }).await?
    }

    pub async fn set_health_check(&self, enabled: bool) -> Result<()> {
        self.driver
            .request(|reply| Request::SetHealthCheck { enabled, reply })
            .await
    }

    /// Copy of the current device state
    pub async fn snapshot(&self) -> Result<DeviceState> {
        self.driver.request(|reply| Request::Snapshot { reply }).await
    }

    /// Subscribe to state updates
    ///
    /// Each update is the batch produced by one read. Multiple
    /// subscriptions can be active simultaneously.
    pub fn subscribe_state(&self) -> StateReceiver {
        StateReceiver::new(self.updates.subscribe())
    }

    /// Registry that receives lines for zone2, zone3 and hdZone
    pub fn zones(&self) -> &ZoneDirectory {
        &self.zones
    }

    /// Close the link and stop the driver task
    pub async fn shutdown(self) {
        self.driver.shutdown().await;
    }
}
