//! Listener registry — ordered subscriber collection with stable-identity
//! removal.
//!
//! Entries are keyed by a uuid assigned at registration, so removing one
//! listener can never affect another regardless of how many registrations
//! or removals happened in between (no index reuse).

use uuid::Uuid;

use lmk_schemas::LinkPayload;

/// A registered payload handler. Runs inside the serial executor; handlers
/// must hand long work off to their own concurrency context.
pub(crate) type ListenerFn = Box<dyn Fn(LinkPayload) + Send + 'static>;

pub(crate) struct ListenerRegistry {
    /// Entries in registration order.
    entries: Vec<(Uuid, ListenerFn)>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, id: Uuid, handler: ListenerFn) {
        self.entries.push((id, handler));
    }

    /// Remove the entry with the given identity. Returns `false` when it was
    /// already gone (double-unsubscribe is harmless).
    pub(crate) fn remove(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() < before
    }

    /// Invoke every currently-registered handler exactly once, in
    /// registration order.
    pub(crate) fn notify_all(&self, payload: &LinkPayload) {
        for (_, handler) in &self.entries {
            handler(payload.clone());
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
