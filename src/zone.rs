//! Routing of lines that belong to a non-primary zone.
//!
//! Zone lines are never decoded here. The router asks the registry for a
//! consumer, requests provisioning when there is none, and forwards the
//! raw line either way.

use crate::error::Result;
use crate::types::Zone;
use regex::Regex;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Identifier of a registered zone consumer
pub type ConsumerId = Uuid;

/// Directory of zone consumers the session forwards to
pub trait ZoneRegistry: Send + Sync {
    /// First consumer registered for `zone`
    fn lookup(&self, zone: Zone) -> Option<ConsumerId>;

    /// Ask whoever provisions consumers to create one for `zone`.
    /// Must not block.
    fn request_provisioning(&self, zone: Zone);

    /// Hand the raw line to interested consumers; returns how many got it
    fn forward(&self, zone: Zone, line: &str) -> usize;
}

/// A raw line forwarded to a zone consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneLine {
    pub zone: Zone,
    pub line: String,
}

/// Announcement that a zone has traffic but no consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub id: Uuid,
    pub zone: Zone,
}

/// Outcome of routing one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routed {
    pub provisioning_requested: bool,
    pub delivered: usize,
}

/// Session-side half: decides when to provision and always forwards
pub struct ZoneRouter {
    registry: Arc<dyn ZoneRegistry>,
}

impl ZoneRouter {
    pub fn new(registry: Arc<dyn ZoneRegistry>) -> Self {
        Self { registry }
    }

    pub fn route(&self, zone: Zone, line: &str) -> Routed {
        let provisioning_requested = self.registry.lookup(zone).is_none();
        if provisioning_requested {
            tracing::info!(zone = %zone, "no consumer for zone, requesting one");
            self.registry.request_provisioning(zone);
        }

        let delivered = self.registry.forward(zone, line);
        tracing::debug!(zone = %zone, line = %line, delivered, "zone line forwarded");

        Routed {
            provisioning_requested,
            delivered,
        }
    }
}

struct Consumer {
    id: ConsumerId,
    zone: Zone,
    criteria: Regex,
    tx: mpsc::UnboundedSender<ZoneLine>,
}

/// In-process zone registry backed by channels.
///
/// Consumers register for a zone with a regex their lines must match and
/// receive them on an unbounded channel. Provisioning requests go out on a
/// broadcast channel. Cloning shares the same directory.
#[derive(Clone)]
pub struct ZoneDirectory {
    consumers: Arc<Mutex<Vec<Consumer>>>,
    provisioning_tx: broadcast::Sender<ProvisioningRequest>,
}

impl ZoneDirectory {
    pub fn new() -> Self {
        let (provisioning_tx, _) = broadcast::channel(16);
        Self {
            consumers: Arc::new(Mutex::new(Vec::new())),
            provisioning_tx,
        }
    }

    fn consumers(&self) -> MutexGuard<'_, Vec<Consumer>> {
        self.consumers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a consumer for `zone` interested in lines matching `criteria`
    pub fn register(&self, zone: Zone, criteria: &str) -> Result<ZoneConsumer> {
        let criteria = Regex::new(criteria)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        self.consumers().push(Consumer {
            id,
            zone,
            criteria,
            tx,
        });
        tracing::debug!(zone = %zone, %id, "zone consumer registered");

        Ok(ZoneConsumer { id, zone, rx })
    }

    pub fn unregister(&self, id: ConsumerId) {
        self.consumers().retain(|c| c.id != id);
    }

    /// Provisioning requests issued from now on
    pub fn subscribe_provisioning(&self) -> broadcast::Receiver<ProvisioningRequest> {
        self.provisioning_tx.subscribe()
    }
}

impl Default for ZoneDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneRegistry for ZoneDirectory {
    fn lookup(&self, zone: Zone) -> Option<ConsumerId> {
        self.consumers()
            .iter()
            .find(|c| c.zone == zone && !c.tx.is_closed())
            .map(|c| c.id)
    }

    fn request_provisioning(&self, zone: Zone) {
        // nobody listening is fine
        let _ = self.provisioning_tx.send(ProvisioningRequest {
            id: Uuid::new_v4(),
            zone,
        });
    }

    fn forward(&self, zone: Zone, line: &str) -> usize {
        let mut consumers = self.consumers();
        consumers.retain(|c| !c.tx.is_closed());

        consumers
            .iter()
            .filter(|c| c.zone == zone && c.criteria.is_match(line))
            .filter(|c| {
                c.tx.send(ZoneLine {
                    zone,
                    line: line.to_string(),
                })
                .is_ok()
            })
            .count()
    }
}

/// Receiving end of a zone registration
pub struct ZoneConsumer {
    pub id: ConsumerId,
    pub zone: Zone,
    rx: mpsc::UnboundedReceiver<ZoneLine>,
}

impl ZoneConsumer {
    /// Next forwarded line, `None` once the directory is gone
    pub async fn recv(&mut self) -> Option<ZoneLine> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ZoneLine> {
        self.rx.try_recv().ok()
    }
}
