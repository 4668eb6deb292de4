//! Vigil: subscription-refresh scheduler.
//!
//! Watches a set of producers (e.g. artist accounts) for new content and
//! notifies subscribed destinations (e.g. chat groups) about items that
//! appeared since the last confirmed delivery.
//!
//! # Architecture
//!
//! Four layers, leaves first:
//! - **Store** ([`store`]): the subscription set as one JSON file, written
//!   temp-then-rename so a crash never corrupts it.
//! - **Registry** ([`registry`]): the in-memory source of truth; every
//!   mutation runs under one lock spanning the change and its persist.
//! - **Refresh engine** ([`refresh`]): one pass = snapshot the registry,
//!   fetch each producer's latest items, deliver the new-since-watermark
//!   delta, feed the watermark back.
//! - **Scheduler** ([`scheduler`]): a background tokio task driving passes
//!   on an interval, plus a manual trigger; passes are serialized.
//!
//! Fetching content and rendering notifications are collaborator concerns
//! behind the [`refresh::ContentFetcher`] and [`refresh::Notifier`] traits.
//! Delivery is at-least-once with duplicate suppression via the per-producer
//! watermark: a failed delivery is logged and dropped, never retried, and
//! never rolls the watermark back.

pub mod config;
pub mod error;
pub mod refresh;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod subscription;

pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use refresh::{ContentFetcher, Notifier, PassSummary, RefreshEngine};
pub use registry::SubscriptionRegistry;
pub use scheduler::RefreshScheduler;
pub use store::SubscriptionStore;
pub use subscription::{ContentItem, NotifyPayload, Subscription};
