//! Subscriber registry and event fan-out

use crate::packet::Packet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Predicate deciding whether a subscriber receives a given packet
pub type EventFilter = Arc<dyn Fn(&Packet) -> bool + Send + Sync>;

/// Stable key for one registered subscriber, assigned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

struct Subscriber {
    sender: mpsc::UnboundedSender<Arc<Packet>>,
    filter: EventFilter,
}

/// Event listeners keyed by assigned id. Delivery is fire-and-forget; a
/// subscriber whose receiver has gone away is pruned on the next dispatch.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: u64,
    subscribers: HashMap<SubscriberId, Subscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        sender: mpsc::UnboundedSender<Arc<Packet>>,
        filter: EventFilter,
    ) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, Subscriber { sender, filter });
        debug!(%id, total = self.subscribers.len(), "subscriber registered");
        id
    }

    pub fn remove(&mut self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!(%id, total = self.subscribers.len(), "subscriber removed");
        }
        removed
    }

    /// Deliver `packet` to every live subscriber whose filter accepts it.
    /// Dead subscribers are removed whether or not the filter matched.
    pub fn dispatch(&mut self, packet: &Arc<Packet>) {
        self.subscribers.retain(|id, subscriber| {
            if subscriber.sender.is_closed() {
                debug!(%id, "pruning dead subscriber");
                return false;
            }
            if (subscriber.filter)(packet) && subscriber.sender.send(packet.clone()).is_err() {
                debug!(%id, "pruning subscriber, receiver dropped mid-send");
                return false;
            }
            true
        });
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
