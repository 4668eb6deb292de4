//! Configuration types for the subscription watcher.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for the subscription-refresh scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between timer-driven refresh passes.
    pub refresh_interval_secs: u64,
    /// Most-recent items requested per producer per pass.
    ///
    /// Must cover everything a pass could notify; keep it at or above
    /// `notify_cap`.
    pub fetch_limit: usize,
    /// Cap on items notified per producer per pass. Bounds notification
    /// volume after long downtime; the watermark still advances past
    /// suppressed items.
    pub notify_cap: usize,
    /// Subscription state file (None = per-user default path).
    pub storage_file: Option<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5 * 3600,
            fetch_limit: 10,
            notify_cap: 5,
            storage_file: None,
        }
    }
}

impl WatchConfig {
    /// Refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let cfg = WatchConfig::default();
        assert_eq!(cfg.refresh_interval_secs, 5 * 3600);
        assert_eq!(cfg.fetch_limit, 10);
        assert_eq!(cfg.notify_cap, 5);
        assert!(cfg.storage_file.is_none());
        assert!(cfg.fetch_limit >= cfg.notify_cap);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let cfg: WatchConfig = serde_json::from_str(r#"{"refresh_interval_secs": 90}"#).unwrap();
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(90));
        assert_eq!(cfg.notify_cap, 5);
    }
}
