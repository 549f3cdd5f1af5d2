//! Rust library for driving Pioneer-style AV receivers
//!
//! The receiver speaks a line-oriented ASCII protocol over a serial port or
//! TCP socket. This library keeps a session with it:
//!
//! - Framing of the byte stream into CR LF terminated lines
//! - Decoding of volume, power, input, tone, tuner, network, display and
//!   now-playing reports into named readings
//! - Volume ceiling enforcement on every volume report
//! - Routing of zone2, zone3 and hdZone lines to registered consumers
//! - A link watchdog that probes a silent link and reconnects
//! - Batched state update subscriptions
//!
//! # Quick Start
//!
//! ```no_run
//! use pioneer_avr::{AvrClient, SessionConfig};
//! use pioneer_avr::transport::mock::MockTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // any Transport works; a TCP one is in demos/monitor.rs
//!     let config = SessionConfig::from_json_str(r#"{"volume_limit_db": -10}"#)?;
//!     let client = AvrClient::spawn(MockTransport::new(), config)?;
//!
//!     let mut updates = client.subscribe_state();
//!     client.power(true).await?;
//!     client.select_input("05").await?;
//!
//!     while let Ok(update) = updates.recv().await {
//!         for reading in &update.readings {
//!             println!("{} = {}", reading.name, reading.value);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Client**: [`AvrClient`], the async handle to the driver task
//! - **Session**: [`Session`], framing, decoding, projection and the watchdog
//!   driven by explicit read and timer events
//! - **Classifier**: ordered line rules producing [`Event`]s
//! - **Projector**: applies events to [`DeviceState`]
//! - **Zones**: [`ZoneRegistry`] and the channel-backed [`ZoneDirectory`]
//! - **Protocol**: outbound [`Command`] encoding
//! - **Transport**: the [`Transport`] trait the session talks through

mod classifier;
mod client;
mod config;
mod connection;
mod error;
mod framer;
mod health;
mod projector;
mod protocol;
mod session;
mod state;
mod subscription;
mod tables;
pub mod transport;
mod types;
mod zone;

// Public exports
pub use classifier::{normalize_name, Classifier, Event};
pub use client::AvrClient;
pub use config::{db_to_raw, percent_to_raw, raw_to_db, raw_to_percent, SessionConfig, VOLUME_RAW_MAX};
pub use error::{AvrError, Result};
pub use framer::LineFramer;
pub use health::{HealthSupervisor, Phase, ProbeToken};
pub use projector::Projector;
pub use protocol::{inventory_queries, status_queries, Command, PlayerCommand};
pub use session::{ProbeOutcome, Session};
pub use state::DeviceState;
pub use subscription::{BroadcastPublisher, StatePublisher, StateReceiver, StateUpdate};
pub use transport::Transport;
pub use types::{
    summary_status, Band, ChannelCode, Coded, InputChannel, LinkState, NetworkInfo, PowerState,
    Reading, TerminalKind, Zone,
};
pub use zone::{
    ConsumerId, ProvisioningRequest, Routed, ZoneConsumer, ZoneDirectory, ZoneLine, ZoneRegistry,
    ZoneRouter,
};
