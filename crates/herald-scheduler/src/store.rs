//! Durable subscriber registry — a JSON array of chat ids on disk.
//! The file is rewritten in full on every mutation; the last successful
//! save is authoritative.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use herald_core::error::{HeraldError, Result};
use herald_core::types::{RecipientId, SubscribeOutcome, UnsubscribeOutcome};

/// File-backed set of subscribed recipients.
pub struct SubscriberStore {
    path: PathBuf,
    subscribers: HashSet<RecipientId>,
}

impl SubscriberStore {
    /// Open the store, loading whatever the file currently holds.
    /// A missing or unreadable file is the "no subscribers yet" state,
    /// not an error.
    pub fn open(path: &Path) -> Self {
        let subscribers = read_file(path);
        tracing::info!(
            "Loaded {} subscriber(s) from {}",
            subscribers.len(),
            path.display()
        );
        Self {
            path: path.to_path_buf(),
            subscribers,
        }
    }

    /// Re-read the file into the live set. Picks up subscriptions persisted
    /// since the last load, including external edits to the file.
    pub fn reload(&mut self) {
        self.subscribers = read_file(&self.path);
    }

    /// Persist the full current set, overwriting the file.
    pub fn save(&self) -> Result<()> {
        let mut ids: Vec<RecipientId> = self.subscribers.iter().copied().collect();
        ids.sort_unstable();
        let json = serde_json::to_string_pretty(&ids)
            .map_err(|e| HeraldError::Store(format!("Serialize error: {e}")))?;
        std::fs::write(&self.path, &json)
            .map_err(|e| HeraldError::Store(format!("Write error: {e}")))?;
        tracing::debug!("Saved {} subscriber(s) to {}", ids.len(), self.path.display());
        Ok(())
    }

    /// Add a recipient. Persists on change, idempotent. A failed save keeps
    /// the in-memory addition; the next successful save reconverges the file.
    pub fn subscribe(&mut self, id: RecipientId) -> SubscribeOutcome {
        if !self.subscribers.insert(id) {
            return SubscribeOutcome::AlreadySubscribed;
        }
        self.persist();
        SubscribeOutcome::Added
    }

    /// Remove a recipient. Persists on change, idempotent.
    pub fn unsubscribe(&mut self, id: RecipientId) -> UnsubscribeOutcome {
        if !self.subscribers.remove(&id) {
            return UnsubscribeOutcome::NotSubscribed;
        }
        self.persist();
        UnsubscribeOutcome::Removed
    }

    /// Copy of the current member ids, for snapshot-then-iterate callers.
    pub fn snapshot(&self) -> Vec<RecipientId> {
        self.subscribers.iter().copied().collect()
    }

    pub fn count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!("Failed to save subscriptions: {e}");
        }
    }
}

fn read_file(path: &Path) -> HashSet<RecipientId> {
    if !path.exists() {
        return HashSet::new();
    }
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str::<Vec<RecipientId>>(&json) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!("Failed to parse {}: {e}", path.display());
                HashSet::new()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read {}: {e}", path.display());
            HashSet::new()
        }
    }
}
