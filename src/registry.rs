//! In-memory subscription registry.
//!
//! [`SubscriptionRegistry`] is the single mutable source of truth for the
//! subscription set during process lifetime. Every mutating operation runs
//! under one async mutex spanning both the in-memory change and the store
//! save, so memory and disk never diverge and concurrent mutations cannot
//! lose an update. Refresh passes iterate a [`snapshot`](SubscriptionRegistry::snapshot)
//! instead of holding the lock, so a slow fetch never blocks a subscribe.
//!
//! Save failures are logged and the in-memory state stays authoritative
//! until the next successful save; see the crate docs for the durability
//! trade-off this implies.

use crate::store::SubscriptionStore;
use crate::subscription::Subscription;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Mutex-guarded subscription set with write-through persistence.
pub struct SubscriptionRegistry {
    subscriptions: Mutex<Vec<Subscription>>,
    store: SubscriptionStore,
}

impl SubscriptionRegistry {
    /// Open the registry over a store, loading any persisted subscriptions.
    ///
    /// A corrupt state file is logged and the registry starts empty; it is
    /// never a startup failure.
    pub fn open(store: SubscriptionStore) -> Self {
        let subscriptions = match store.load() {
            Ok(subs) => {
                info!(count = subs.len(), "subscription registry loaded");
                subs
            }
            Err(e) => {
                warn!("cannot load subscription state, starting empty: {e}");
                Vec::new()
            }
        };

        Self {
            subscriptions: Mutex::new(subscriptions),
            store,
        }
    }

    /// Subscribe `destination` to `producer_id`.
    ///
    /// Creates the subscription (watermark 0) on first subscribe, otherwise
    /// adds the destination to the existing record. Idempotent: repeating an
    /// existing (producer, destination) pair changes nothing.
    pub async fn add(&self, producer_id: &str, destination: &str) {
        let mut subs = self.subscriptions.lock().await;

        let changed = match subs.iter_mut().find(|s| s.producer_id == producer_id) {
            Some(sub) => sub.destinations.insert(destination.to_owned()),
            None => {
                subs.push(Subscription::new(producer_id, destination));
                true
            }
        };

        if changed {
            info!(producer_id, destination, "subscription added");
            self.persist(&subs);
        } else {
            debug!(producer_id, destination, "subscription already present");
        }
    }

    /// Unsubscribe `destination` from `producer_id`.
    ///
    /// Deletes the whole record when its last destination goes away.
    /// Returns whether `producer_id` was found at all, regardless of whether
    /// the destination was actually subscribed.
    pub async fn remove(&self, producer_id: &str, destination: &str) -> bool {
        let mut subs = self.subscriptions.lock().await;

        let Some(idx) = subs.iter().position(|s| s.producer_id == producer_id) else {
            debug!(producer_id, "unsubscribe for unknown producer");
            return false;
        };

        let removed = subs[idx].destinations.remove(destination);
        let emptied = subs[idx].destinations.is_empty();
        if emptied {
            subs.remove(idx);
        }

        if removed {
            info!(producer_id, destination, emptied, "subscription removed");
            self.persist(&subs);
        }
        true
    }

    /// Advance the producer's watermark to `max(current, candidate)`.
    ///
    /// Persists only when the watermark actually moved. Returns whether the
    /// producer was found. Never decreases the watermark, whatever the
    /// candidate.
    pub async fn advance_watermark(&self, producer_id: &str, candidate: u64) -> bool {
        let mut subs = self.subscriptions.lock().await;

        let Some(sub) = subs.iter_mut().find(|s| s.producer_id == producer_id) else {
            // Raced with an unsubscribe-to-empty during a pass; nothing to do.
            debug!(producer_id, candidate, "watermark advance for unknown producer");
            return false;
        };

        if candidate > sub.watermark {
            debug!(
                producer_id,
                from = sub.watermark,
                to = candidate,
                "watermark advanced"
            );
            sub.watermark = candidate;
            self.persist(&subs);
        }
        true
    }

    /// Immutable copy of the subscription set, safe to iterate while
    /// mutations continue on the live registry.
    pub async fn snapshot(&self) -> Vec<Subscription> {
        self.subscriptions.lock().await.clone()
    }

    /// Number of live subscriptions.
    pub async fn len(&self) -> usize {
        self.subscriptions.lock().await.len()
    }

    /// Whether no producer is currently watched.
    pub async fn is_empty(&self) -> bool {
        self.subscriptions.lock().await.is_empty()
    }

    /// Persist under the caller-held lock. A failed save keeps memory
    /// authoritative; the next successful save converges.
    fn persist(&self, subs: &[Subscription]) {
        if let Err(e) = self.store.save(subs) {
            error!("cannot persist subscription state: {e}");
        }
    }
}
