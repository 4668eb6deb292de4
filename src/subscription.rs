//! Subscription data model.
//!
//! A [`Subscription`] records one watched producer: the highest content-item
//! id already delivered for it (the watermark) and the set of destinations
//! that want to hear about new items. Content items themselves are supplied
//! by the fetch collaborator; this crate never inspects their metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One watched producer and where its notifications go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Opaque producer identifier, unique across live subscriptions.
    pub producer_id: String,
    /// Highest item id already delivered for this producer.
    ///
    /// Monotone non-decreasing for the subscription's lifetime. A new
    /// subscription starts at 0 (nothing seen yet).
    #[serde(default)]
    pub watermark: u64,
    /// Destinations notified about this producer's new items. Never empty
    /// for a stored subscription; remove-to-empty deletes the record.
    pub destinations: BTreeSet<String>,
}

impl Subscription {
    /// Create a fresh subscription for `producer_id` with a single
    /// destination and an unseen (zero) watermark.
    pub fn new(producer_id: impl Into<String>, destination: impl Into<String>) -> Self {
        let mut destinations = BTreeSet::new();
        destinations.insert(destination.into());
        Self {
            producer_id: producer_id.into(),
            watermark: 0,
            destinations,
        }
    }
}

/// A content item reported by the fetch collaborator.
///
/// `metadata` is opaque display data (title, URL, thumbnail reference, ...)
/// passed through to the notify call unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Strictly comparable item identifier.
    pub item_id: u64,
    /// Opaque display metadata, forwarded as-is.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ContentItem {
    /// Item with no metadata, mostly useful in tests.
    pub fn bare(item_id: u64) -> Self {
        Self {
            item_id,
            metadata: serde_json::Value::Null,
        }
    }
}

/// What the notify collaborator is asked to deliver.
///
/// The engine issues one call per (destination × payload) pair: a
/// [`NotifyPayload::Summary`] first, then one [`NotifyPayload::Item`] per new
/// item in descending item-id order.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyPayload {
    /// Short textual heads-up: producer and how many new items follow.
    Summary {
        /// Producer the new items belong to.
        producer_id: String,
        /// Number of item payloads that will follow.
        count: usize,
    },
    /// A single new item reference.
    Item {
        /// Producer the item belongs to.
        producer_id: String,
        /// The item, metadata untouched.
        item: ContentItem,
    },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn new_subscription_starts_unseen() {
        let sub = Subscription::new("artist-1", "group-a");
        assert_eq!(sub.producer_id, "artist-1");
        assert_eq!(sub.watermark, 0);
        assert_eq!(sub.destinations.len(), 1);
        assert!(sub.destinations.contains("group-a"));
    }

    #[test]
    fn subscription_serde_round_trip() {
        let mut sub = Subscription::new("artist-1", "group-a");
        sub.destinations.insert("group-b".to_owned());
        sub.watermark = 42;

        let json = serde_json::to_string(&sub).unwrap();
        let restored: Subscription = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, sub);
    }

    #[test]
    fn subscription_missing_watermark_defaults_to_zero() {
        let json = r#"{"producer_id":"p","destinations":["g"]}"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.watermark, 0);
    }

    #[test]
    fn content_item_metadata_passes_through() {
        let item = ContentItem {
            item_id: 7,
            metadata: serde_json::json!({"title": "untitled", "pages": 3}),
        };
        let json = serde_json::to_string(&item).unwrap();
        let restored: ContentItem = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.metadata["title"], "untitled");
        assert_eq!(restored.metadata["pages"], 3);
    }
}
