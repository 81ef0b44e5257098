//! In-memory history rules
//!
//! Two ordered collections, most recent first:
//! - `pinned`: user-curated favorites, bounded by `max_pinned`
//! - `ephemeral`: capture history for the current boot session, bounded by
//!   `max_ephemeral`
//!
//! Every mutation returns a [`Changes`] describing which collections need to
//! be persisted. Trimming always removes from the tail. Policy rejections
//! (pin at capacity, pin of already-pinned content) are silent no-ops.

use crate::interface::{Content, HistorySnapshot, Item};

/// Which collections a mutation touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub pinned: bool,
    pub ephemeral: bool,
}

impl Changes {
    pub const NONE: Changes = Changes { pinned: false, ephemeral: false };
    pub const PINNED: Changes = Changes { pinned: true, ephemeral: false };
    pub const EPHEMERAL: Changes = Changes { pinned: false, ephemeral: true };
    pub const BOTH: Changes = Changes { pinned: true, ephemeral: true };

    pub fn any(&self) -> bool {
        self.pinned || self.ephemeral
    }
}

#[derive(Debug, Clone, Default)]
pub struct History {
    pinned: Vec<Item>,
    ephemeral: Vec<Item>,
    max_pinned: usize,
    max_ephemeral: usize,
}

impl History {
    pub fn new(max_pinned: usize, max_ephemeral: usize) -> Self {
        Self {
            pinned: Vec::new(),
            ephemeral: Vec::new(),
            max_pinned,
            max_ephemeral,
        }
    }

    /// Build from loaded collections, trimming anything over capacity.
    /// Returns the changes the trim made so the caller can re-persist.
    pub fn from_loaded(
        pinned: Vec<Item>,
        ephemeral: Vec<Item>,
        max_pinned: usize,
        max_ephemeral: usize,
    ) -> (Self, Changes) {
        let mut history = Self {
            pinned,
            ephemeral,
            max_pinned,
            max_ephemeral,
        };
        let changes = Changes {
            pinned: history.trim_pinned(),
            ephemeral: history.trim_ephemeral(),
        };
        (history, changes)
    }

    pub fn pinned(&self) -> &[Item] {
        &self.pinned
    }

    pub fn ephemeral(&self) -> &[Item] {
        &self.ephemeral
    }

    pub fn max_ephemeral(&self) -> usize {
        self.max_ephemeral
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            pinned: self.pinned.clone(),
            ephemeral: self.ephemeral.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capture
    // ─────────────────────────────────────────────────────────────────────────

    /// Record newly captured content at the head of ephemeral.
    ///
    /// Content equal to the current head is dropped. Never touches pinned.
    pub fn insert_captured(&mut self, content: Content) -> Changes {
        if self.ephemeral.first().is_some_and(|head| head.content == content) {
            return Changes::NONE;
        }
        self.ephemeral.insert(0, Item::new(content));
        self.trim_ephemeral();
        Changes::EPHEMERAL
    }

    /// Move an ephemeral item to the head under a new identity.
    ///
    /// Items not in ephemeral (e.g. pinned ones) are left where they are.
    pub fn restore(&mut self, item: &Item) -> Changes {
        let Some(position) = self.ephemeral.iter().position(|i| i == item) else {
            return Changes::NONE;
        };
        let existing = self.ephemeral.remove(position);
        self.push_ephemeral_head(existing.renewed());
        Changes::EPHEMERAL
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transfers
    // ─────────────────────────────────────────────────────────────────────────

    pub fn pin(&mut self, item: &Item) -> Changes {
        if self.pinned.len() >= self.max_pinned {
            tracing::debug!(max = self.max_pinned, "Pin rejected: pinned collection full");
            return Changes::NONE;
        }
        if self.pinned.iter().any(|p| p.content == item.content) {
            tracing::debug!("Pin rejected: content already pinned");
            return Changes::NONE;
        }
        let removed = remove_by_id(&mut self.ephemeral, item);
        self.pinned.insert(0, item.renewed());
        Changes {
            pinned: true,
            ephemeral: removed,
        }
    }

    /// Move a pinned item back to the head of ephemeral, then trim.
    /// With a saturated or zero ephemeral cap the item can be evicted at once.
    pub fn unpin(&mut self, item: &Item) -> Changes {
        if !remove_by_id(&mut self.pinned, item) {
            return Changes::NONE;
        }
        self.push_ephemeral_head(item.renewed());
        Changes::BOTH
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deletion
    // ─────────────────────────────────────────────────────────────────────────

    pub fn delete_ephemeral(&mut self, item: &Item) -> Changes {
        if remove_by_id(&mut self.ephemeral, item) {
            Changes::EPHEMERAL
        } else {
            Changes::NONE
        }
    }

    pub fn delete_pinned(&mut self, item: &Item) -> Changes {
        if remove_by_id(&mut self.pinned, item) {
            Changes::PINNED
        } else {
            Changes::NONE
        }
    }

    /// Always reports a change so callers persist the (possibly already
    /// empty) collection.
    pub fn clear_ephemeral(&mut self) -> Changes {
        self.ephemeral.clear();
        Changes::EPHEMERAL
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ordering and limits
    // ─────────────────────────────────────────────────────────────────────────

    /// Move a pinned item from one position to another. Out-of-range indices
    /// are ignored.
    pub fn reorder_pinned(&mut self, from: usize, to: usize) -> Changes {
        let len = self.pinned.len();
        if from >= len || to >= len {
            return Changes::NONE;
        }
        if from == to {
            return Changes::NONE;
        }
        let item = self.pinned.remove(from);
        self.pinned.insert(to, item);
        Changes::PINNED
    }

    pub fn set_limits(&mut self, max_pinned: usize, max_ephemeral: usize) -> Changes {
        self.max_pinned = max_pinned;
        self.max_ephemeral = max_ephemeral;
        Changes {
            pinned: self.trim_pinned(),
            ephemeral: self.trim_ephemeral(),
        }
    }

    /// Prepend a transferred item. An equal head is replaced rather than
    /// left adjacent to it.
    fn push_ephemeral_head(&mut self, item: Item) {
        if self.ephemeral.first().is_some_and(|head| head.content == item.content) {
            self.ephemeral.remove(0);
        }
        self.ephemeral.insert(0, item);
        self.trim_ephemeral();
    }

    fn trim_ephemeral(&mut self) -> bool {
        trim_tail(&mut self.ephemeral, self.max_ephemeral)
    }

    fn trim_pinned(&mut self) -> bool {
        trim_tail(&mut self.pinned, self.max_pinned)
    }
}

fn remove_by_id(items: &mut Vec<Item>, item: &Item) -> bool {
    match items.iter().position(|i| i == item) {
        Some(position) => {
            items.remove(position);
            true
        }
        None => false,
    }
}

fn trim_tail(items: &mut Vec<Item>, max: usize) -> bool {
    if items.len() <= max {
        return false;
    }
    tracing::debug!(evicted = items.len() - max, max, "Trimming collection tail");
    items.truncate(max);
    true
}
