//! Clipboard polling
//!
//! `ClipboardMonitor` drives a host-provided `ClipboardReader` on a fixed
//! cadence and hands new content to the `HistoryStore`. The reader's change
//! counter is checked first; the payload is only read when it moved, so an
//! idle pasteboard costs one integer read per tick.
//!
//! Captures are delivered one at a time from a single task, each poll running
//! on the blocking pool and awaited before the next tick. The store's
//! head-equality dedup is the backstop for readers whose counter moves
//! without the content changing.

use crate::interface::ClipboardReader;
use crate::store::HistoryStore;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Global fallback Tokio runtime for when the monitor is started outside any
/// runtime context (UniFFI callers never provide one). Never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("clipshelf-monitor")
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// Tracks the reader's change counter between polls
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_change_count: Option<i64>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `current` and report whether it differs from the last value.
    /// The first observation always counts as a change.
    pub fn observe(&mut self, current: i64) -> bool {
        let changed = self.last_change_count != Some(current);
        if changed {
            debug!(old_count = self.last_change_count, new_count = current, "Clipboard change detected");
        }
        self.last_change_count = Some(current);
        changed
    }
}

struct Poller {
    store: Arc<HistoryStore>,
    reader: Arc<dyn ClipboardReader>,
    detector: Mutex<ChangeDetector>,
}

impl Poller {
    fn poll(&self) -> bool {
        let count = self.reader.change_count();
        if !self.detector.lock().observe(count) {
            return false;
        }
        match self.reader.read() {
            Some(content) => {
                self.store.insert_captured(content);
                true
            }
            None => false,
        }
    }

    async fn run(self: Arc<Self>, interval: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    // Captures write to disk; keep that off the async workers
                    let poller = self.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || poller.poll()).await {
                        warn!(error = %e, "Clipboard poll task failed");
                    }
                }
            }
        }
        debug!("Clipboard monitor stopped");
    }
}

#[derive(uniffi::Object)]
pub struct ClipboardMonitor {
    poller: Arc<Poller>,
    interval: Duration,
    token: Mutex<Option<CancellationToken>>,
}

#[uniffi::export]
impl ClipboardMonitor {
    /// Polls at the store's configured `poll_interval_ms`
    #[uniffi::constructor]
    pub fn new(store: Arc<HistoryStore>, reader: Arc<dyn ClipboardReader>) -> Self {
        let interval = store.settings().poll_interval();
        Self {
            poller: Arc::new(Poller {
                store,
                reader,
                detector: Mutex::new(ChangeDetector::new()),
            }),
            interval,
            token: Mutex::new(None),
        }
    }

    /// Start polling. No-op if already running.
    pub fn start(&self) {
        let mut slot = self.token.lock();
        if slot.is_some() {
            return;
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        info!(interval_ms = self.interval.as_millis() as u64, "Clipboard monitor started");
        runtime_handle().spawn(self.poller.clone().run(self.interval, token));
    }

    pub fn stop(&self) {
        if let Some(token) = self.token.lock().take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.lock().is_some()
    }

    /// Run one poll on the calling thread, for hosts that drive their own
    /// timer. Returns true if content was handed to the store.
    pub fn poll_once(&self) -> bool {
        self.poller.poll()
    }
}

impl Drop for ClipboardMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
