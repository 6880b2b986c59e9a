//! # tracker-core
//!
//! why: implement the host-authoritative log replication protocol in pure, portable rust
//! relations: used by tracker-net for the wire loop, console for the intent surface
//! what: log entry model and store, wire messages, replication state machine, session codes, breach keypad

pub mod keypad;
pub mod log;
pub mod message;
pub mod replica;
pub mod session;

pub use keypad::{BreachKeypad, QuickAction};
pub use log::{EventKind, LogEntry, LogStore};
pub use message::{Message, ProtocolError};
pub use replica::{Intent, LinkState, Replica, Role};
pub use session::Session;
