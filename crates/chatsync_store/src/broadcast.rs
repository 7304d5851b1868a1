//! The state feed: publish/subscribe plumbing between the store and
//! collection providers.
//!
//! Delivery runs over channels, so publishing never executes consumer
//! code. The store calls [`StateFeed::publish`] inside its commit
//! section, which is what gives listeners states in production order
//! with at most one delivery per produced state.

use crate::state::State;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// A registered listener's handle.
///
/// `initial` is the state current at registration time, returned
/// synchronously so the caller never misses the window between
/// registering and the first push. Subsequent states arrive on
/// `receiver` in production order.
#[derive(Debug)]
pub struct Subscription {
    /// Token for [`unsubscribe`](crate::Store::unregister).
    pub id: SubscriptionId,
    /// The state at registration time.
    pub initial: State,
    /// Pushed states, in production order.
    pub receiver: Receiver<State>,
}

/// Distributes produced states to registered listeners.
///
/// Not internally synchronized: the store owns the feed inside its
/// commit section, which serializes subscribe, unsubscribe, and publish
/// against state production.
#[derive(Debug, Default)]
pub struct StateFeed {
    senders: Vec<(SubscriptionId, Sender<State>)>,
}

impl StateFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener, handing it `current` as its initial state.
    pub fn subscribe(&mut self, current: State) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let id = SubscriptionId::new();
        self.senders.push((id, tx));
        Subscription {
            id,
            initial: current,
            receiver: rx,
        }
    }

    /// Removes a listener. Unknown or already-removed IDs are a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.senders.retain(|(sid, _)| *sid != id);
    }

    /// Delivers `state` to every registered listener, pruning listeners
    /// whose receiver has been dropped.
    pub fn publish(&mut self, state: &State) {
        self.senders
            .retain(|(_, tx)| tx.send(state.clone()).is_ok());
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_returns_current_state() {
        let mut feed = StateFeed::new();
        let sub = feed.subscribe(State::initial());
        assert_eq!(sub.initial.revision(), 0);
        assert_eq!(feed.subscriber_count(), 1);
    }

    #[test]
    fn publish_reaches_all_subscribers() {
        let mut feed = StateFeed::new();
        let a = feed.subscribe(State::initial());
        let b = feed.subscribe(State::initial());

        feed.publish(&State::initial());
        assert_eq!(a.receiver.recv().unwrap().revision(), 0);
        assert_eq!(b.receiver.recv().unwrap().revision(), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut feed = StateFeed::new();
        let sub = feed.subscribe(State::initial());

        feed.unsubscribe(sub.id);
        feed.unsubscribe(sub.id);
        assert_eq!(feed.subscriber_count(), 0);

        feed.publish(&State::initial());
        assert!(sub.receiver.try_recv().is_err());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut feed = StateFeed::new();
        let sub = feed.subscribe(State::initial());
        drop(sub.receiver);

        feed.publish(&State::initial());
        assert_eq!(feed.subscriber_count(), 0);
    }
}
