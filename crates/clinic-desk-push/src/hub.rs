//! In-process fan-out of push events.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::event::PushEvent;

/// Default number of buffered events per subscriber.
pub const DEFAULT_CAPACITY: usize = 64;

/// Broadcast hub that transports publish into and views subscribe to.
#[derive(Debug, Clone)]
pub struct PushHub {
    sender: broadcast::Sender<PushEvent>,
}

impl PushHub {
    /// Create a hub buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to every live subscription. Returns how many received it.
    pub fn publish(&self, event: PushEvent) -> usize {
        tracing::debug!(event = event.name(), "push event published");
        self.sender.send(event).unwrap_or(0)
    }

    /// Listen for one event kind. Dropping the subscription unregisters it.
    pub fn subscribe(&self, event: PushEvent) -> Subscription {
        Subscription {
            event,
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A registered listener for a single event kind.
#[derive(Debug)]
pub struct Subscription {
    event: PushEvent,
    receiver: broadcast::Receiver<PushEvent>,
}

impl Subscription {
    /// The event kind this subscription listens for.
    pub fn event(&self) -> &PushEvent {
        &self.event
    }

    /// Wait for the next matching event.
    ///
    /// Returns `None` once every hub handle is gone. A lagging subscriber may have missed
    /// matching events, so a lag is reported as an occurrence.
    pub async fn recv(&mut self) -> Option<()> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event == self.event => return Some(()),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, event = self.event.name(), "push subscriber lagged");
                    return Some(());
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
