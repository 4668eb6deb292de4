//! Refresh scheduler loop.
//!
//! [`RefreshScheduler`] drives the [`RefreshEngine`](crate::refresh::RefreshEngine)
//! on a fixed cadence from one background tokio task, and exposes a manual
//! trigger for on-demand passes. Timer-driven and manual passes serialize
//! through a shared pass gate, so two passes never run concurrently.
//!
//! `stop()` cancels the timer wait promptly but never a pass mid-flight: an
//! in-progress pass always runs to completion before the task exits.

use crate::refresh::{PassSummary, RefreshEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Periodic + on-demand driver for refresh passes.
pub struct RefreshScheduler {
    engine: Arc<RefreshEngine>,
    /// Serializes passes across the timer task and manual triggers.
    pass_gate: Arc<tokio::sync::Mutex<()>>,
    worker: Option<Worker>,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Scheduler over an engine. The engine carries the fetch/notify wiring,
    /// so a constructed scheduler is always startable.
    pub fn new(engine: Arc<RefreshEngine>) -> Self {
        Self {
            engine,
            pass_gate: Arc::new(tokio::sync::Mutex::new(())),
            worker: None,
        }
    }

    /// Whether the timer loop is currently running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Start the timer loop: wait `interval`, run a pass, repeat.
    ///
    /// Returns `false` when already running. Each pass finishes before the
    /// next wait begins, so the timer never overlaps its own passes.
    pub fn start(&mut self, interval: Duration) -> bool {
        if self.worker.is_some() {
            warn!("refresh scheduler already running");
            return false;
        }

        let engine = Arc::clone(&self.engine);
        let gate = Arc::clone(&self.pass_gate);
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "refresh scheduler started");
            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => {
                        info!("refresh scheduler cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let _pass = gate.lock().await;
                        engine.run_pass().await;
                    }
                }
            }
        });

        self.worker = Some(Worker { cancel, handle });
        true
    }

    /// Run one refresh pass now, independent of the timer's wait phase.
    ///
    /// Serialized against timer-driven passes via the pass gate; not
    /// cancellable once started.
    pub async fn trigger_manual_refresh(&self) -> PassSummary {
        info!("manual refresh triggered");
        let _pass = self.pass_gate.lock().await;
        self.engine.run_pass().await
    }

    /// Stop the timer loop.
    ///
    /// Cancels the pending wait and awaits the background task, which lets
    /// any in-flight pass finish first. Returns `false` when not running.
    pub async fn stop(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            warn!("refresh scheduler not running");
            return false;
        };

        worker.cancel.cancel();
        if let Err(e) = worker.handle.await {
            warn!("refresh scheduler task ended abnormally: {e}");
        }
        info!("refresh scheduler stopped");
        true
    }
}
