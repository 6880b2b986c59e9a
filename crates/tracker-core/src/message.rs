//! # message
//!
//! why: define the wire schema exchanged between host and clients
//! relations: produced/consumed by replica.rs, framed by tracker-net
//! what: SYNC_LOGS, ADD_LOG, REMOVE_LOG messages with validating decode

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::log::LogEntry;

/// Protocol messages exchanged over the peer-to-peer data channel.
///
/// Serialized as internally tagged JSON:
/// `{"type": "SYNC_LOGS", "logs": [...]}` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Full replacement snapshot of the host's log. Host → client only.
    #[serde(rename = "SYNC_LOGS")]
    SyncLogs { logs: Vec<LogEntry> },

    /// Request to prepend an entry. Client → host only.
    #[serde(rename = "ADD_LOG")]
    AddLog { log: LogEntry },

    /// Request to remove the entry with the given id. Client → host only.
    #[serde(rename = "REMOVE_LOG")]
    RemoveLog { id: String },
}

/// Errors produced while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload was not a valid message of the schema above.
    /// Malformed network input is rejected here instead of being
    /// applied unchecked.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Message {
    /// Encode as a JSON payload.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode and validate a JSON payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
