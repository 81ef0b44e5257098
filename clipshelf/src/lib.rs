//! ClipShelf Core - clipboard history engine
//!
//! Keeps two bounded collections of captured snippets: a session-scoped
//! ephemeral history and a durable pinned list. Handles head-of-list dedup,
//! tail trimming, pin/unpin transfers, and JSON persistence with legacy
//! migration and boot-session invalidation.
//!
//! Types are exported via UniFFI proc-macros (#[derive(uniffi::Record/Enum/Object)]).

pub mod history;
pub mod interface;
pub mod models;
pub mod monitor;
pub mod persistence;
pub mod session;
pub mod settings;
mod store;

pub use interface::*;
pub use monitor::ClipboardMonitor;
pub use settings::Settings;
pub use store::HistoryStore;

uniffi::setup_scaffolding!("clipshelf");
