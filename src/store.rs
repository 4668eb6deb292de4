//! Durable subscription storage.
//!
//! [`SubscriptionStore`] serializes the full subscription set to a single
//! JSON file and loads it back on startup. It carries no policy beyond
//! load/save: the registry decides when to persist and how to react to
//! failures.
//!
//! Saves go through a sibling temp file followed by a rename, so a crash
//! mid-write never leaves a half-written state file behind.

use crate::error::{Result, WatchError};
use crate::subscription::Subscription;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persisted file schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    /// Schema version.
    #[serde(default = "default_state_version")]
    version: u8,
    /// When the file was last written.
    #[serde(default)]
    last_saved: Option<DateTime<Utc>>,
    /// The full subscription set.
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

fn default_state_version() -> u8 {
    1
}

/// File-backed store for the subscription set.
#[derive(Debug, Clone)]
pub struct SubscriptionStore {
    path: PathBuf,
}

impl SubscriptionStore {
    /// Store backed by the given file path. The parent directory is created
    /// on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by the default per-user state path, when one can be
    /// determined.
    pub fn at_default_path() -> Option<Self> {
        Self::default_state_path().map(Self::new)
    }

    /// Store at the configured path, falling back to the default path.
    pub fn from_config(config: &crate::config::WatchConfig) -> Option<Self> {
        config
            .storage_file
            .clone()
            .map(Self::new)
            .or_else(Self::at_default_path)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted subscription set.
    ///
    /// A missing file is a first run and yields an empty set. An unreadable
    /// or unparseable file yields [`WatchError::CorruptState`]; callers are
    /// expected to log it and start empty rather than crash.
    pub fn load(&self) -> Result<Vec<Subscription>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no subscription state file, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(WatchError::Io(e)),
        };

        let state: StoreState = serde_json::from_slice(&bytes)
            .map_err(|e| WatchError::CorruptState(format!("cannot parse state: {e}")))?;

        debug!(
            count = state.subscriptions.len(),
            path = %self.path.display(),
            "loaded subscription state"
        );
        Ok(state.subscriptions)
    }

    /// Persist the full subscription set.
    ///
    /// Writes to `<path>.tmp` first and renames into place so readers never
    /// observe a partial file.
    pub fn save(&self, subscriptions: &[Subscription]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WatchError::Store(format!("cannot create state dir: {e}")))?;
        }

        let state = StoreState {
            version: default_state_version(),
            last_saved: Some(Utc::now()),
            subscriptions: subscriptions.to_vec(),
        };

        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| WatchError::Store(format!("cannot serialize state: {e}")))?;

        let tmp = self.temp_path();
        std::fs::write(&tmp, json)
            .map_err(|e| WatchError::Store(format!("cannot write temp state: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| WatchError::Store(format!("cannot replace state file: {e}")))?;

        debug!(count = subscriptions.len(), "subscription state saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map_or_else(
            || std::ffi::OsString::from("subscriptions.json"),
            std::ffi::OsString::from,
        );
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Default path for the subscription state file.
    pub fn default_state_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("LOCALAPPDATA")
                .map(|d| PathBuf::from(d).join("vigil").join("subscriptions.json"))
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("HOME").map(|h| {
                PathBuf::from(h)
                    .join(".config")
                    .join("vigil")
                    .join("subscriptions.json")
            })
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::subscription::Subscription;

    fn sample_set() -> Vec<Subscription> {
        let mut a = Subscription::new("artist-1", "group-a");
        a.watermark = 105;
        a.destinations.insert("group-b".to_owned());
        let b = Subscription::new("artist-2", "group-a");
        vec![a, b]
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SubscriptionStore::new(dir.path().join("subscriptions.json"));
        let subs = store.load().expect("load");
        assert!(subs.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SubscriptionStore::new(dir.path().join("subscriptions.json"));

        let original = sample_set();
        store.save(&original).expect("save");
        let restored = store.load().expect("load");

        assert_eq!(restored, original);
    }

    #[test]
    fn save_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SubscriptionStore::new(dir.path().join("nested").join("subscriptions.json"));
        store.save(&sample_set()).expect("save");
        assert!(store.path().exists());
    }

    #[test]
    fn corrupt_file_is_reported_not_swallowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("subscriptions.json");
        std::fs::write(&path, "{ this is not json").expect("write garbage");

        let store = SubscriptionStore::new(path);
        let err = store.load().expect_err("corrupt file must fail");
        assert!(matches!(err, WatchError::CorruptState(_)));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SubscriptionStore::new(dir.path().join("subscriptions.json"));
        store.save(&sample_set()).expect("save");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn from_config_prefers_explicit_path() {
        let cfg = crate::config::WatchConfig {
            storage_file: Some(PathBuf::from("/tmp/vigil-test/subscriptions.json")),
            ..Default::default()
        };
        let store = SubscriptionStore::from_config(&cfg).expect("store");
        assert_eq!(
            store.path(),
            Path::new("/tmp/vigil-test/subscriptions.json")
        );
    }

    #[test]
    fn save_overwrites_previous_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SubscriptionStore::new(dir.path().join("subscriptions.json"));

        store.save(&sample_set()).expect("first save");
        let just_one = vec![Subscription::new("artist-3", "group-z")];
        store.save(&just_one).expect("second save");

        let restored = store.load().expect("load");
        assert_eq!(restored, just_one);
    }
}
