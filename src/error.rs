//! Error types for the subscription watcher.

/// Top-level error type for the subscription-refresh system.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Persisted subscription state exists but cannot be parsed.
    #[error("corrupt state: {0}")]
    CorruptState(String),

    /// Store serialization or persistence error.
    #[error("store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Content fetch collaborator failed for a producer.
    #[error("fetch error for '{producer_id}': {message}")]
    Fetch {
        /// Producer whose fetch failed.
        producer_id: String,
        /// Collaborator-reported failure detail.
        message: String,
    },

    /// Notification delivery to a destination failed.
    #[error("delivery error to '{destination}': {message}")]
    Delivery {
        /// Destination the delivery was addressed to.
        destination: String,
        /// Collaborator-reported failure detail.
        message: String,
    },
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WatchError>;
