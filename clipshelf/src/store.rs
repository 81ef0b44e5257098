//! HistoryStore - Main API for Swift interop
//!
//! Owns the pinned and ephemeral collections and is the only thing that
//! mutates them. Every mutation is followed by a synchronous write of the
//! collections it touched and an observer notification.
//!
//! Concurrency Model:
//! - FFI calls may arrive on any host thread, and `ClipboardMonitor` captures
//!   arrive on a tokio worker. All of them go through one mutex.
//! - Writes happen while the lock is held, so saves to the same file land in
//!   program order.
//! - The clipboard sink and observer are called after the lock is released;
//!   a sink that synchronously re-enters the store cannot deadlock it.
//!
//! Durability is best effort: a failed write is logged and the in-memory
//! state stays authoritative for the running process.

use crate::history::{Changes, History};
use crate::interface::{
    CaptureKind, ClipboardSink, Content, ContentFilter, HistoryObserver, HistorySnapshot, Item,
};
use crate::persistence::Storage;
use crate::session::{BootSessionId, BootSessionOracle, SystemBootSession};
use crate::settings::Settings;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct State {
    history: History,
    settings: Settings,
}

#[derive(uniffi::Object)]
pub struct HistoryStore {
    state: Mutex<State>,
    storage: Storage,
    session: BootSessionId,
    sink: Arc<dyn ClipboardSink>,
    observer: RwLock<Option<Arc<dyn HistoryObserver>>>,
}

// Internal implementation (not exported via FFI)
impl HistoryStore {
    /// Load both collections from `storage` and build a store around them.
    ///
    /// The boot session is read once here and held for the store's lifetime.
    pub fn open(
        storage: Storage,
        settings: Settings,
        sink: Arc<dyn ClipboardSink>,
        oracle: &dyn BootSessionOracle,
    ) -> Self {
        let session = oracle.current();
        let pinned = storage.load_pinned();
        let ephemeral = storage.load_ephemeral(session);

        let (history, trimmed) = History::from_loaded(
            pinned,
            ephemeral,
            settings.max_pinned(),
            settings.max_ephemeral(),
        );

        let store = Self {
            state: Mutex::new(State { history, settings }),
            storage,
            session,
            sink,
            observer: RwLock::new(None),
        };

        if trimmed.any() {
            info!(pinned = trimmed.pinned, ephemeral = trimmed.ephemeral, "Trimmed loaded history to capacity");
            let state = store.state.lock();
            store.persist(&state.history, trimmed);
        }

        store
    }

    pub fn session(&self) -> BootSessionId {
        self.session
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run one mutation under the lock, persist what changed, then notify
    fn apply(&self, op: impl FnOnce(&mut State) -> Changes) -> HistorySnapshot {
        let (snapshot, changes) = {
            let mut state = self.state.lock();
            let changes = op(&mut state);
            self.persist(&state.history, changes);
            (state.history.snapshot(), changes)
        };
        if changes.any() {
            self.notify(&snapshot);
        }
        snapshot
    }

    fn persist(&self, history: &History, changes: Changes) {
        if changes.pinned {
            if let Err(e) = self.storage.save_pinned(history.pinned()) {
                warn!(path = %self.storage.pinned_path().display(), error = %e, "Failed to save pinned items");
            }
        }
        if changes.ephemeral {
            if let Err(e) = self.storage.save_ephemeral(self.session, history.ephemeral()) {
                warn!(path = %self.storage.ephemeral_path().display(), error = %e, "Failed to save ephemeral items");
            }
        }
    }

    fn notify(&self, snapshot: &HistorySnapshot) {
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer.history_changed(snapshot.clone());
        }
    }
}

// FFI-exported constructor (must be in standalone impl block)
#[uniffi::export]
impl HistoryStore {
    /// Create a store persisting to `pinned.json` and `history.json` inside
    /// `data_dir`, keyed to the current boot session.
    #[uniffi::constructor]
    pub fn new(data_dir: String, settings: Settings, sink: Arc<dyn ClipboardSink>) -> Self {
        let storage = Storage::in_dir(&PathBuf::from(data_dir));
        Self::open(storage, settings, sink, &SystemBootSession)
    }
}

#[uniffi::export]
impl HistoryStore {
    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> HistorySnapshot {
        self.state.lock().history.snapshot()
    }

    pub fn pinned(&self) -> Vec<Item> {
        self.state.lock().history.pinned().to_vec()
    }

    pub fn ephemeral(&self) -> Vec<Item> {
        self.state.lock().history.ephemeral().to_vec()
    }

    pub fn settings(&self) -> Settings {
        self.state.lock().settings.clone()
    }

    /// Presentation view: both collections filtered by a case-insensitive
    /// substring and content type. Stored order is untouched.
    pub fn filtered(&self, query: String, filter: ContentFilter) -> HistorySnapshot {
        let query = query.trim();
        let keep = |items: &[Item]| -> Vec<Item> {
            items
                .iter()
                .filter(|i| filter.matches(&i.content) && i.content.matches_query(query))
                .cloned()
                .collect()
        };
        let state = self.state.lock();
        HistorySnapshot {
            pinned: keep(state.history.pinned()),
            ephemeral: keep(state.history.ephemeral()),
        }
    }

    /// Combined size of the history files in bytes
    pub fn storage_size(&self) -> u64 {
        self.storage.size_bytes()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Capture
    // ─────────────────────────────────────────────────────────────────────────────

    /// Record content reported by the change source
    pub fn insert_captured(&self, content: Content) -> HistorySnapshot {
        self.apply(|state| state.history.insert_captured(content))
    }

    /// Record a raw `(kind, payload)` capture event. Text that is not valid
    /// UTF-8 is dropped.
    pub fn handle_event(&self, kind: CaptureKind, payload: Vec<u8>) -> HistorySnapshot {
        match Content::from_event(kind, payload) {
            Some(content) => self.insert_captured(content),
            None => {
                warn!(?kind, "Dropping capture event with undecodable payload");
                self.snapshot()
            }
        }
    }

    /// Put `item`'s content back on the clipboard. If the item is in
    /// ephemeral it moves to the head under a new id.
    pub fn restore_to_buffer(&self, item: Item) -> HistorySnapshot {
        let snapshot = self.apply(|state| state.history.restore(&item));
        self.sink.write_content(item.content);
        snapshot
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Pin / Unpin
    // ─────────────────────────────────────────────────────────────────────────────

    /// Pin an item. Silently ignored when pinned is full or already holds
    /// equal content.
    pub fn pin(&self, item: Item) -> HistorySnapshot {
        self.apply(|state| state.history.pin(&item))
    }

    pub fn unpin(&self, item: Item) -> HistorySnapshot {
        self.apply(|state| state.history.unpin(&item))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Delete Operations
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn delete_ephemeral(&self, item: Item) -> HistorySnapshot {
        self.apply(|state| state.history.delete_ephemeral(&item))
    }

    pub fn delete_pinned(&self, item: Item) -> HistorySnapshot {
        self.apply(|state| state.history.delete_pinned(&item))
    }

    pub fn clear_ephemeral(&self) -> HistorySnapshot {
        self.apply(|state| state.history.clear_ephemeral())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Ordering / Settings
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn reorder_pinned(&self, from_index: u32, to_index: u32) -> HistorySnapshot {
        self.apply(|state| {
            state
                .history
                .reorder_pinned(from_index as usize, to_index as usize)
        })
    }

    /// Update capacities, trimming either collection from the tail if needed
    pub fn set_limits(&self, max_pinned: u32, max_ephemeral: u32) -> HistorySnapshot {
        self.apply(|state| {
            state.settings.max_pinned_count = max_pinned;
            state.settings.max_ephemeral_count = max_ephemeral;
            state
                .history
                .set_limits(state.settings.max_pinned(), state.settings.max_ephemeral())
        })
    }

    pub fn set_clear_on_quit(&self, clear_on_quit: bool) {
        self.state.lock().settings.clear_on_quit = clear_on_quit;
    }

    /// Host quit hook: clears ephemeral history when `clear_on_quit` is set
    pub fn on_quit(&self) {
        let clear = self.state.lock().settings.clear_on_quit;
        if clear {
            debug!("Clearing ephemeral history on quit");
            self.clear_ephemeral();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn set_observer(&self, observer: Arc<dyn HistoryObserver>) {
        *self.observer.write() = Some(observer);
    }

    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FixedBootSession;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{tempdir, TempDir};

    const SESSION: BootSessionId = BootSessionId(100);

    #[derive(Default)]
    struct RecordingSink {
        written: Mutex<Vec<Content>>,
    }

    impl ClipboardSink for RecordingSink {
        fn write_content(&self, content: Content) {
            self.written.lock().push(content);
        }
    }

    #[derive(Default)]
    struct CountingObserver {
        calls: AtomicUsize,
    }

    impl HistoryObserver for CountingObserver {
        fn history_changed(&self, _snapshot: HistorySnapshot) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn open_in(dir: &TempDir, settings: Settings) -> (HistoryStore, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let store = HistoryStore::open(
            Storage::in_dir(dir.path()),
            settings,
            sink.clone(),
            &FixedBootSession(SESSION),
        );
        (store, sink)
    }

    fn texts(items: &[Item]) -> Vec<&str> {
        items.iter().filter_map(|i| i.content.as_text()).collect()
    }

    #[test]
    fn test_store_creation() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        assert_eq!(store.snapshot(), HistorySnapshot::default());
        assert_eq!(store.session(), SESSION);
        assert_eq!(store.storage_size(), 0);
    }

    #[test]
    fn test_insert_persists_immediately() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        store.insert_captured(Content::text("a"));
        store.insert_captured(Content::text("a"));
        store.insert_captured(Content::text("b"));

        let (reopened, _) = open_in(&dir, Settings::default());
        assert_eq!(texts(&reopened.ephemeral()), vec!["b", "a"]);
        assert_eq!(reopened.ephemeral(), store.ephemeral());
    }

    #[test]
    fn test_pin_persists_both_collections() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        let snapshot = store.insert_captured(Content::text("keep"));
        store.pin(snapshot.ephemeral[0].clone());

        let (reopened, _) = open_in(&dir, Settings::default());
        assert_eq!(texts(&reopened.pinned()), vec!["keep"]);
        assert!(reopened.ephemeral().is_empty());
    }

    #[test]
    fn test_pinned_survives_new_boot_session() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        store.insert_captured(Content::text("temp"));
        store.pin(Item::new(Content::text("fav")));

        let rebooted = HistoryStore::open(
            Storage::in_dir(dir.path()),
            Settings::default(),
            Arc::new(RecordingSink::default()),
            &FixedBootSession(BootSessionId(101)),
        );
        assert_eq!(texts(&rebooted.pinned()), vec!["fav"]);
        assert!(rebooted.ephemeral().is_empty());
        assert!(!rebooted.storage().ephemeral_path().exists());
    }

    #[test]
    fn test_restore_writes_sink_and_moves_to_head() {
        let dir = tempdir().unwrap();
        let (store, sink) = open_in(&dir, Settings::default());
        store.insert_captured(Content::text("a"));
        let snapshot = store.insert_captured(Content::text("b"));
        let older = snapshot.ephemeral[1].clone();

        let after = store.restore_to_buffer(older.clone());
        assert_eq!(texts(&after.ephemeral), vec!["a", "b"]);
        assert_ne!(after.ephemeral[0].id, older.id);
        assert_eq!(*sink.written.lock(), vec![Content::text("a")]);
    }

    #[test]
    fn test_restore_pinned_item_only_writes_sink() {
        let dir = tempdir().unwrap();
        let (store, sink) = open_in(&dir, Settings::default());
        let snapshot = store.pin(Item::new(Content::text("fav")));
        let pinned = snapshot.pinned[0].clone();

        let after = store.restore_to_buffer(pinned.clone());
        assert_eq!(after.pinned[0].id, pinned.id);
        assert!(after.ephemeral.is_empty());
        assert_eq!(*sink.written.lock(), vec![Content::text("fav")]);
    }

    #[test]
    fn test_handle_event() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        store.handle_event(CaptureKind::Text, b"hello".to_vec());
        store.handle_event(CaptureKind::Text, vec![0xC3, 0x28]);
        store.handle_event(CaptureKind::Image, vec![1, 2, 3]);

        let ephemeral = store.ephemeral();
        assert_eq!(ephemeral.len(), 2);
        assert_eq!(ephemeral[0].content, Content::image(vec![1, 2, 3]));
        assert_eq!(ephemeral[1].content, Content::text("hello"));
    }

    #[test]
    fn test_pin_scenario_capacity_one() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            max_pinned_count: 1,
            ..Settings::default()
        };
        let (store, _) = open_in(&dir, settings);
        store.pin(Item::new(Content::text("x")));
        let snapshot = store.pin(Item::new(Content::text("y")));
        assert_eq!(texts(&snapshot.pinned), vec!["x"]);
    }

    #[test]
    fn test_set_limits_updates_settings_and_trims() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        for value in ["a", "b", "c"] {
            store.insert_captured(Content::text(value));
        }
        let snapshot = store.set_limits(5, 1);
        assert_eq!(texts(&snapshot.ephemeral), vec!["c"]);
        assert_eq!(store.settings().max_ephemeral_count, 1);
        assert_eq!(store.settings().max_pinned_count, 5);

        let (reopened, _) = open_in(&dir, Settings::default());
        assert_eq!(texts(&reopened.ephemeral()), vec!["c"]);
    }

    #[test]
    fn test_open_trims_to_configured_capacity() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        for value in ["a", "b", "c"] {
            store.insert_captured(Content::text(value));
        }
        drop(store);

        let small = Settings {
            max_ephemeral_count: 2,
            ..Settings::default()
        };
        let (reopened, _) = open_in(&dir, small);
        assert_eq!(texts(&reopened.ephemeral()), vec!["c", "b"]);

        let (again, _) = open_in(&dir, Settings::default());
        assert_eq!(texts(&again.ephemeral()), vec!["c", "b"]);
    }

    #[test]
    fn test_set_limits_updates_settings_and_caps_together() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        let store = Arc::new(store);

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for round in 0..200u32 {
                    store.set_limits(5, 2 + round % 3);
                }
            })
        };
        for _ in 0..200 {
            let state = store.state.lock();
            assert_eq!(state.history.max_ephemeral(), state.settings.max_ephemeral());
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_concurrent_mutations_stay_bounded_and_persist_in_order() {
        const MAX_EPHEMERAL: usize = 8;
        let dir = tempdir().unwrap();
        let settings = Settings {
            max_pinned_count: 3,
            max_ephemeral_count: MAX_EPHEMERAL as u32,
            ..Settings::default()
        };
        let (store, _) = open_in(&dir, settings.clone());
        let store = Arc::new(store);

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for n in 0..50 {
                        let snapshot = store.insert_captured(Content::text(format!("{}-{}", worker, n)));
                        assert!(snapshot.ephemeral.len() <= MAX_EPHEMERAL);
                        let Some(head) = snapshot.ephemeral.first().cloned() else {
                            continue;
                        };
                        let snapshot = match n % 5 {
                            0 => store.pin(head),
                            1 => store.delete_ephemeral(head),
                            2 => match snapshot.pinned.first().cloned() {
                                Some(pinned) => store.unpin(pinned),
                                None => store.snapshot(),
                            },
                            _ => store.snapshot(),
                        };
                        assert!(snapshot.ephemeral.len() <= MAX_EPHEMERAL);
                        assert!(snapshot.pinned.len() <= 3);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let final_state = store.snapshot();
        assert!(final_state.ephemeral.len() <= MAX_EPHEMERAL);

        let (reopened, _) = open_in(&dir, settings);
        assert_eq!(reopened.ephemeral(), final_state.ephemeral);
        assert_eq!(reopened.pinned(), final_state.pinned);
    }

    #[test]
    fn test_on_quit_respects_flag() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        store.insert_captured(Content::text("a"));
        store.on_quit();
        assert_eq!(store.ephemeral().len(), 1);

        store.set_clear_on_quit(true);
        store.on_quit();
        assert!(store.ephemeral().is_empty());

        let (reopened, _) = open_in(&dir, Settings::default());
        assert!(reopened.ephemeral().is_empty());
    }

    #[test]
    fn test_observer_notified_only_on_change() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        let observer = Arc::new(CountingObserver::default());
        store.set_observer(observer.clone());

        store.insert_captured(Content::text("a"));
        store.insert_captured(Content::text("a"));
        store.delete_pinned(Item::new(Content::text("missing")));
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);

        store.clear_observer();
        store.insert_captured(Content::text("b"));
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filtered_view_does_not_mutate() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        store.insert_captured(Content::text("Hello World"));
        store.insert_captured(Content::image(vec![1]));
        store.insert_captured(Content::text("goodbye"));
        store.pin(Item::new(Content::text("hello pinned")));
        let before = store.snapshot();

        let view = store.filtered("HELLO".to_string(), ContentFilter::All);
        assert_eq!(texts(&view.ephemeral), vec!["Hello World"]);
        assert_eq!(texts(&view.pinned), vec!["hello pinned"]);

        let images = store.filtered(String::new(), ContentFilter::Images);
        assert_eq!(images.ephemeral.len(), 1);
        assert!(images.pinned.is_empty());

        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_reorder_pinned_persists() {
        let dir = tempdir().unwrap();
        let (store, _) = open_in(&dir, Settings::default());
        for value in ["c", "b", "a"] {
            store.pin(Item::new(Content::text(value)));
        }
        store.reorder_pinned(2, 0);
        store.reorder_pinned(9, 0);

        let (reopened, _) = open_in(&dir, Settings::default());
        assert_eq!(texts(&reopened.pinned()), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let dir = tempdir().unwrap();
        // A directory where the pinned file should be makes every save fail
        let blocked = dir.path().join("pinned.json");
        std::fs::create_dir_all(blocked.join("occupied")).unwrap();

        let (store, _) = open_in(&dir, Settings::default());
        let snapshot = store.pin(Item::new(Content::text("x")));
        assert_eq!(texts(&snapshot.pinned), vec!["x"]);
        assert_eq!(texts(&store.pinned()), vec!["x"]);
    }
}
