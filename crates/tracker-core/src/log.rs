//! # log
//!
//! why: manage the ordered collection of site events that the session replicates
//! relations: entries are carried by message.rs, mutated through replica.rs
//! what: EventKind, LogEntry, LogStore with add/remove/replace_all

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Display category of a log entry. Carries no behavioral difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A containment breach reported via the keypad.
    Breach,
    /// A canned site event (riot, escape attempt, insurgency).
    Event,
}

/// A single timestamped entry in the site log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Opaque unique identifier, stable for the entry's lifetime.
    /// The sole key used for removal.
    pub id: String,
    /// Display category.
    pub kind: EventKind,
    /// Display string, e.g. "SCP-042 BREACH".
    pub content: String,
    /// Creation time. Serialized as an ISO-8601 string on the wire.
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Create a new entry stamped with the current time and a fresh id.
    pub fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            id: entry_id(),
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Generate a short random entry id (lowercase alphanumeric).
fn entry_id() -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

/// Ordered collection of log entries, newest first.
///
/// Only ever mutated from one logical authority at a time, so there is
/// no internal concurrency control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogStore {
    entries: Vec<LogEntry>,
}

impl LogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend an entry. No deduplication is performed.
    pub fn add(&mut self, entry: LogEntry) {
        self.entries.insert(0, entry);
    }

    /// Remove any entry whose id matches. A no-op when the id is absent.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|entry| entry.id != id);
    }

    /// Wholesale replacement, used only when accepting an authoritative
    /// snapshot from the host.
    pub fn replace_all(&mut self, entries: Vec<LogEntry>) {
        self.entries = entries;
    }

    /// The entries in display order (newest first).
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_prepends() {
        let mut store = LogStore::new();
        store.add(LogEntry::new(EventKind::Event, "first"));
        store.add(LogEntry::new(EventKind::Event, "second"));

        assert_eq!(store.entries()[0].content, "second");
        assert_eq!(store.entries()[1].content, "first");
    }

    #[test]
    fn remove_missing_id_is_noop() {
        let mut store = LogStore::new();
        store.add(LogEntry::new(EventKind::Breach, "SCP-042 BREACH"));

        store.remove("no-such-id");

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn entry_ids_are_fresh() {
        let a = LogEntry::new(EventKind::Event, "a");
        let b = LogEntry::new(EventKind::Event, "b");
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 8);
    }
}
