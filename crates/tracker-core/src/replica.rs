//! # replica
//!
//! why: decide how local intents and remote messages mutate the log, per role
//! relations: owns log.rs's store, speaks message.rs; driven by tracker-net's event loop
//! what: Role, LinkState, Intent, Replica replication state machine

use serde::{Deserialize, Serialize};

use crate::log::{LogEntry, LogStore};
use crate::message::Message;

/// Who this process is within a session. Fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// No transport; the local store is the only copy.
    Offline,
    /// Holds the authoritative store and accepts client connections.
    Host,
    /// Connects to a host and mirrors its state.
    Client,
}

/// Connection lifecycle as seen by the presentation layer.
///
/// `Offline` sessions never leave `Disconnected`. A client moves
/// `Connecting → Connected` on handshake success and falls back to
/// `Disconnected` on failure. `Closed` is terminal; there is no
/// automatic reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// A locally originated mutation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Add(LogEntry),
    Remove(String),
}

/// The replication controller: one per session, owning the log store.
///
/// All mutation flows through this struct inline — network callbacks
/// never reach into shared state. Callers apply the returned [`Message`]
/// to the wire (broadcast for a host, forward-to-host for a client).
#[derive(Debug)]
pub struct Replica {
    role: Role,
    store: LogStore,
}

impl Replica {
    /// Create a replica with an empty store.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            store: LogStore::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Current visible log, newest first. For a client this is the
    /// mirror of the last accepted snapshot.
    pub fn logs(&self) -> &[LogEntry] {
        self.store.entries()
    }

    /// A full-state snapshot message. The host sends this to every
    /// newly opened peer connection so late joiners start consistent
    /// rather than empty.
    pub fn snapshot(&self) -> Message {
        Message::SyncLogs {
            logs: self.store.entries().to_vec(),
        }
    }

    /// Route a local intent according to role.
    ///
    /// Returns the message to put on the wire, if any:
    /// - Offline: mutate directly, nothing to send.
    /// - Host: mutate, then broadcast a full snapshot to every peer.
    /// - Client: do NOT mutate — forward the intent to the host. Local
    ///   state only changes when an authoritative snapshot comes back.
    pub fn handle_intent(&mut self, intent: Intent) -> Option<Message> {
        match self.role {
            Role::Offline => {
                self.apply(intent);
                None
            }
            Role::Host => {
                self.apply(intent);
                Some(self.snapshot())
            }
            Role::Client => Some(match intent {
                Intent::Add(log) => Message::AddLog { log },
                Intent::Remove(id) => Message::RemoveLog { id },
            }),
        }
    }

    /// Host-side handling of a message received from a client.
    ///
    /// `ADD_LOG`/`REMOVE_LOG` mutate the authoritative store and yield
    /// a fresh snapshot to broadcast to all peers, the originator
    /// included. A `SYNC_LOGS` from a client is not acted upon —
    /// clients are not authoritative.
    pub fn handle_from_client(&mut self, msg: Message) -> Option<Message> {
        if self.role != Role::Host {
            return None;
        }
        match msg {
            Message::AddLog { log } => {
                self.store.add(log);
                Some(self.snapshot())
            }
            Message::RemoveLog { id } => {
                self.store.remove(&id);
                Some(self.snapshot())
            }
            Message::SyncLogs { .. } => None,
        }
    }

    /// Client-side handling of a message received from the host.
    ///
    /// `SYNC_LOGS` unconditionally replaces local state. Anything else
    /// is never sent by a well-behaved host and is ignored. Returns
    /// whether the visible state was replaced.
    pub fn handle_from_host(&mut self, msg: Message) -> bool {
        if self.role != Role::Client {
            return false;
        }
        match msg {
            Message::SyncLogs { logs } => {
                self.store.replace_all(logs);
                true
            }
            Message::AddLog { .. } | Message::RemoveLog { .. } => false,
        }
    }

    fn apply(&mut self, intent: Intent) {
        match intent {
            Intent::Add(entry) => self.store.add(entry),
            Intent::Remove(id) => self.store.remove(&id),
        }
    }
}
