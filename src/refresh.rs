//! Refresh engine: one end-to-end pass over the subscription set.
//!
//! The engine owns no schedule of its own. Given a snapshot of the registry
//! it fetches each producer's latest items through the injected
//! [`ContentFetcher`], computes what is new relative to the persisted
//! watermark, advances the watermark, and pushes notifications through the
//! injected [`Notifier`]. Each producer is processed independently: a fetch
//! failure skips that producer for the pass, a delivery failure skips that
//! one (destination, payload) pair, and neither aborts anything else.
//!
//! Watermark advance happens before delivery and is never reverted, so the
//! overall guarantee is at-least-once with duplicate suppression: a failed
//! delivery may permanently miss an item for one destination, but no
//! destination is ever re-notified for items already confirmed seen.

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::registry::SubscriptionRegistry;
use crate::subscription::{ContentItem, NotifyPayload, Subscription};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of recent items requested per producer per pass.
pub const DEFAULT_FETCH_LIMIT: usize = 10;

/// Default cap on items notified per producer per pass.
pub const DEFAULT_NOTIFY_CAP: usize = 5;

/// Content source contract. Retry and backoff are the implementor's
/// business; the engine calls once per producer per pass.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch up to `limit` most-recent items for a producer, in any order.
    async fn latest(&self, producer_id: &str, limit: usize) -> anyhow::Result<Vec<ContentItem>>;
}

/// Notification sink contract. One call per (destination × payload) pair.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a payload to one destination.
    async fn deliver(&self, destination: &str, payload: &NotifyPayload) -> anyhow::Result<()>;
}

/// Outcome counters for one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Subscriptions processed (snapshot size).
    pub producers: usize,
    /// Producers that had at least one new item.
    pub producers_with_news: usize,
    /// Item notifications attempted (after capping, before delivery errors).
    pub items_notified: usize,
    /// Producers skipped because their fetch failed.
    pub fetch_failures: usize,
    /// Individual deliveries that failed.
    pub delivery_failures: usize,
}

/// Runs refresh passes against injected fetch/notify collaborators.
pub struct RefreshEngine {
    registry: Arc<SubscriptionRegistry>,
    fetcher: Arc<dyn ContentFetcher>,
    notifier: Arc<dyn Notifier>,
    fetch_limit: usize,
    notify_cap: usize,
}

impl RefreshEngine {
    /// Engine over a registry and its collaborators, with default limits.
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        fetcher: Arc<dyn ContentFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            notifier,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            notify_cap: DEFAULT_NOTIFY_CAP,
        }
    }

    /// Engine with limits taken from a [`WatchConfig`].
    pub fn with_config(
        registry: Arc<SubscriptionRegistry>,
        fetcher: Arc<dyn ContentFetcher>,
        notifier: Arc<dyn Notifier>,
        config: &WatchConfig,
    ) -> Self {
        Self::new(registry, fetcher, notifier)
            .with_fetch_limit(config.fetch_limit)
            .with_notify_cap(config.notify_cap)
    }

    /// Override how many recent items are requested per producer.
    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit.max(1);
        self
    }

    /// Override the per-producer notification cap.
    pub fn with_notify_cap(mut self, cap: usize) -> Self {
        self.notify_cap = cap.max(1);
        self
    }

    /// Registry this engine feeds watermark updates into.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Run one refresh pass over the current registry snapshot.
    pub async fn run_pass(&self) -> PassSummary {
        let snapshot = self.registry.snapshot().await;
        if snapshot.is_empty() {
            debug!("no subscriptions, skipping refresh pass");
            return PassSummary::default();
        }

        let mut summary = PassSummary {
            producers: snapshot.len(),
            ..PassSummary::default()
        };

        for sub in &snapshot {
            self.refresh_one(sub, &mut summary).await;
        }

        info!(
            producers = summary.producers,
            with_news = summary.producers_with_news,
            items = summary.items_notified,
            fetch_failures = summary.fetch_failures,
            delivery_failures = summary.delivery_failures,
            "refresh pass finished"
        );
        summary
    }

    /// Refresh a single subscription. Never propagates collaborator errors.
    async fn refresh_one(&self, sub: &Subscription, summary: &mut PassSummary) {
        let items = match self.fetcher.latest(&sub.producer_id, self.fetch_limit).await {
            Ok(items) => items,
            Err(e) => {
                let err = WatchError::Fetch {
                    producer_id: sub.producer_id.clone(),
                    message: format!("{e:#}"),
                };
                warn!("{err}, skipping producer this pass");
                summary.fetch_failures += 1;
                return;
            }
        };

        let (new_items, max_seen) = split_new_items(sub.watermark, items, self.notify_cap);

        // Advance before delivery, even when everything new got capped away:
        // confirmed-seen must survive delivery failures.
        if max_seen > sub.watermark {
            self.registry
                .advance_watermark(&sub.producer_id, max_seen)
                .await;
        }

        if new_items.is_empty() {
            debug!(producer_id = %sub.producer_id, "no new items");
            return;
        }

        summary.producers_with_news += 1;
        summary.items_notified += new_items.len();
        info!(
            producer_id = %sub.producer_id,
            count = new_items.len(),
            "new items found"
        );

        let announce = NotifyPayload::Summary {
            producer_id: sub.producer_id.clone(),
            count: new_items.len(),
        };
        summary.delivery_failures += self.deliver_to_all(&sub.destinations, &announce).await;

        for item in new_items {
            let payload = NotifyPayload::Item {
                producer_id: sub.producer_id.clone(),
                item,
            };
            summary.delivery_failures += self.deliver_to_all(&sub.destinations, &payload).await;
        }
    }

    /// Deliver one payload to every destination; returns the failure count.
    async fn deliver_to_all(
        &self,
        destinations: &std::collections::BTreeSet<String>,
        payload: &NotifyPayload,
    ) -> usize {
        let mut failures = 0;
        for destination in destinations {
            if let Err(e) = self.notifier.deliver(destination, payload).await {
                let err = WatchError::Delivery {
                    destination: destination.clone(),
                    message: format!("{e:#}"),
                };
                warn!("{err}");
                failures += 1;
            }
        }
        failures
    }
}

/// Split fetched items into the new-since-watermark delta.
///
/// Sorts descending by id, then scans: every id above the watermark is
/// collected (up to `cap`, most-recent-first) and folded into `max_seen`;
/// the scan stops at the first id at or below the watermark. Returns the
/// capped new items in descending-id order plus `max_seen`, which is at
/// least the watermark itself.
fn split_new_items(
    watermark: u64,
    mut items: Vec<ContentItem>,
    cap: usize,
) -> (Vec<ContentItem>, u64) {
    items.sort_unstable_by(|a, b| b.item_id.cmp(&a.item_id));

    let mut max_seen = watermark;
    let mut new_items = Vec::new();
    for item in items {
        if item.item_id <= watermark {
            break;
        }
        max_seen = max_seen.max(item.item_id);
        new_items.push(item);
    }

    new_items.truncate(cap);
    (new_items, max_seen)
}
