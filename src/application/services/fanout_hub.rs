//! Fan-out Hub
//!
//! Delivers every appended message and presence transition to every live
//! subscription, in the order the events were published.
//!
//! A single `tokio::sync::broadcast` channel carries the events. Its ring
//! buffer bounds how far each subscriber may fall behind: a subscriber that
//! lags past the capacity loses the overflowed events and receives a
//! [`Delivery::Resync`] instead, without slowing anyone else down.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{Message, Participant, PresenceRecord};
use crate::infrastructure::metrics::HUB_RESYNCS_TOTAL;

/// An event published through the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    Message(Message),
    Presence(PresenceRecord),
}

/// A published event with its position in the hub's total order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEnvelope {
    pub seq: u64,
    pub event: HubEvent,
}

/// What a subscription yields.
#[derive(Debug, Clone)]
pub enum Delivery {
    Event(Arc<HubEnvelope>),
    /// The subscriber fell behind and `missed` events were dropped for it.
    Resync { missed: u64 },
}

/// The broadcast hub. Store in an `Arc` and share between producers and
/// gateway sessions.
pub struct FanoutHub {
    sender: broadcast::Sender<Arc<HubEnvelope>>,
    /// Held across sequence assignment and send so that concurrent
    /// publishers cannot interleave.
    next_seq: Mutex<u64>,
    subscriptions: Arc<DashMap<Uuid, Participant>>,
}

impl FanoutHub {
    /// Create a hub buffering at most `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_seq: Mutex::new(0),
            subscriptions: Arc::new(DashMap::new()),
        }
    }

    /// Publish an event to every current subscription and return its
    /// sequence number.
    pub fn publish(&self, event: HubEvent) -> u64 {
        let mut next_seq = self.next_seq.lock();
        *next_seq += 1;
        let envelope = Arc::new(HubEnvelope {
            seq: *next_seq,
            event,
        });

        // send() only fails when nobody is subscribed
        let receivers = self.sender.send(envelope).unwrap_or(0);
        tracing::trace!(seq = *next_seq, receivers, "Hub event published");
        *next_seq
    }

    /// Register a subscription for `identity`. It only sees events
    /// published after this call, and unregisters itself when dropped.
    pub fn subscribe(&self, identity: Participant) -> Subscription {
        let id = Uuid::new_v4();
        let receiver = self.sender.subscribe();
        self.subscriptions.insert(id, identity.clone());

        tracing::debug!(subscription_id = %id, identity = %identity, "Subscription registered");

        Subscription {
            id,
            identity,
            receiver,
            subscriptions: self.subscriptions.clone(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Number of live subscriptions owned by `identity`.
    pub fn subscriptions_for(&self, identity: &Participant) -> usize {
        self.subscriptions
            .iter()
            .filter(|entry| entry.value() == identity)
            .count()
    }
}

/// One gateway's live interest in the hub stream.
pub struct Subscription {
    id: Uuid,
    identity: Participant,
    receiver: broadcast::Receiver<Arc<HubEnvelope>>,
    subscriptions: Arc<DashMap<Uuid, Participant>>,
}

impl Subscription {
    /// Wait for the next delivery. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        match self.receiver.recv().await {
            Ok(envelope) => Some(Delivery::Event(envelope)),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                HUB_RESYNCS_TOTAL.inc();
                tracing::warn!(
                    subscription_id = %self.id,
                    identity = %self.identity,
                    missed,
                    "Subscriber lagged, resync required"
                );
                Some(Delivery::Resync { missed })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.subscriptions.remove(&self.id);
        tracing::debug!(subscription_id = %self.id, identity = %self.identity, "Subscription dropped");
    }
}
