use crate::error::{AvrError, Result};
use crate::types::Reading;
use tokio::sync::broadcast;

/// Host side of state publication.
///
/// The session calls `begin_batch`, then `set_field` for every update made
/// while processing one read, then `end_batch`. Observers must not see a
/// half-applied batch.
pub trait StatePublisher: Send {
    fn begin_batch(&mut self);
    fn set_field(&mut self, name: &str, value: &str);
    fn end_batch(&mut self);
}

/// One batch of reading updates, in the order they were made
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub readings: Vec<Reading>,
}

impl StateUpdate {
    /// Last value set for `name` within this batch
    pub fn get(&self, name: &str) -> Option<&str> {
        self.readings
            .iter()
            .rev()
            .find(|r| r.name == name)
            .map(|r| r.value.as_str())
    }
}

/// Publishes each finished batch on a broadcast channel
pub struct BroadcastPublisher {
    tx: broadcast::Sender<StateUpdate>,
    current: Option<StateUpdate>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, current: None }
    }

    pub fn subscribe(&self) -> StateReceiver {
        StateReceiver::new(self.tx.subscribe())
    }

    /// Sender handle, for subscribing after the publisher has been moved
    pub fn sender(&self) -> broadcast::Sender<StateUpdate> {
        self.tx.clone()
    }
}

impl StatePublisher for BroadcastPublisher {
    fn begin_batch(&mut self) {
        if self.current.is_some() {
            tracing::warn!("batch started while another was open, discarding it");
        }
        self.current = Some(StateUpdate::default());
    }

    fn set_field(&mut self, name: &str, value: &str) {
        let reading = Reading {
            name: name.to_string(),
            value: value.to_string(),
        };
        match self.current.as_mut() {
            Some(batch) => batch.readings.push(reading),
            // outside a batch: publish on its own
            None => {
                let _ = self.tx.send(StateUpdate {
                    readings: vec![reading],
                });
            }
        }
    }

    fn end_batch(&mut self) {
        if let Some(batch) = self.current.take() {
            if !batch.readings.is_empty() {
                // no subscribers is fine
                let _ = self.tx.send(batch);
            }
        }
    }
}

/// Receiver for state updates
pub struct StateReceiver {
    rx: broadcast::Receiver<StateUpdate>,
}

impl StateReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<StateUpdate>) -> Self {
        Self { rx }
    }

    /// Receive the next batch
    ///
    /// Fails with [`AvrError::ConnectionClosed`] once the driver is gone.
    pub async fn recv(&mut self) -> Result<StateUpdate> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => AvrError::ConnectionClosed,
            broadcast::error::RecvError::Lagged(n) => {
                AvrError::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Try to receive a batch without blocking
    ///
    /// Returns `None` if no batch is available.
    pub fn try_recv(&mut self) -> Result<Option<StateUpdate>> {
        match self.rx.try_recv() {
            Ok(update) => Ok(Some(update)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(AvrError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(AvrError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_visible_only_when_ended() {
        let mut publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.begin_batch();
        publisher.set_field("volume", "40");
        publisher.set_field("volume", "41");
        assert_eq!(rx.try_recv().unwrap(), None);

        publisher.end_batch();
        let update = rx.try_recv().unwrap().unwrap();
        assert_eq!(update.readings.len(), 2);
        assert_eq!(update.get("volume"), Some("41"));
    }

    #[test]
    fn empty_batch_is_not_sent() {
        let mut publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();
        publisher.begin_batch();
        publisher.end_batch();
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn closed_publisher_ends_receivers() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();
        drop(publisher);
        assert!(matches!(rx.try_recv(), Err(AvrError::ConnectionClosed)));
    }
}
