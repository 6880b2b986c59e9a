//! Session handle: the intent API every user action funnels through.
//!
//! A handle fronts one session event loop (offline, host or client).
//! Intents go in over a command channel; the authoritative local view
//! comes back on a watch channel and lifecycle notifications on a
//! broadcast channel. The handle never touches the log store itself.

use std::net::SocketAddr;

use tokio::sync::{broadcast, mpsc, watch};
use tracker_core::{Intent, LinkState, LogEntry, Replica, Role, Session};

use crate::error::NetError;
use crate::{client, host, rendezvous_addr};

/// Lifecycle notifications surfaced to the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The connection state machine moved.
    LinkChanged(LinkState),
    /// A client completed the handshake (host side).
    PeerJoined { addr: SocketAddr },
    /// A client connection went away (host side).
    PeerLeft { addr: SocketAddr },
    /// A user-visible failure notification. The session itself stays up.
    Fault(String),
}

/// Requests from the handle into the session event loop.
pub(crate) enum Command {
    Intent(Intent),
    Close,
}

const CHANNEL_CAPACITY: usize = 64;

/// Handle to a running session.
///
/// Cheap to clone would be nice but unnecessary: the console owns one.
#[derive(Debug)]
pub struct SessionHandle {
    role: Role,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
    logs: watch::Receiver<Vec<LogEntry>>,
    link: watch::Receiver<LinkState>,
    local_addr: Option<SocketAddr>,
}

impl SessionHandle {
    /// Start an offline session: no transport is created and the link
    /// never leaves `Disconnected`. Intents mutate the local store
    /// directly.
    pub fn offline() -> Self {
        let (commands, mut cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (log_tx, logs) = watch::channel(Vec::new());
        let (link_tx, link) = watch::channel(LinkState::Disconnected);

        tokio::spawn(async move {
            // Held so the link watch stays live; offline never moves.
            let _link_tx = link_tx;
            let mut replica = Replica::new(Role::Offline);
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    Command::Intent(intent) => {
                        replica.handle_intent(intent);
                        let _ = log_tx.send(replica.logs().to_vec());
                    }
                    Command::Close => break,
                }
            }
        });

        Self {
            role: Role::Offline,
            commands,
            events,
            logs,
            link,
            local_addr: None,
        }
    }

    /// Open a listening endpoint for the session's code and become the
    /// authoritative host. `bind` overrides the derived rendezvous
    /// address (pass port 0 to let the OS choose, e.g. in tests).
    pub async fn host(session: &Session, bind: Option<SocketAddr>) -> Result<Self, NetError> {
        if session.role != Role::Host {
            return Err(NetError::InvalidSession("not a host session"));
        }
        let rendezvous = session
            .rendezvous()
            .ok_or(NetError::InvalidSession("host session requires a code"))?;
        let bind = bind.unwrap_or_else(|| rendezvous_addr(&rendezvous));

        let (commands, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (log_tx, logs) = watch::channel(Vec::new());
        let (link_tx, link) = watch::channel(LinkState::Disconnected);

        let local_addr =
            host::start(rendezvous, bind, cmd_rx, events.clone(), log_tx, link_tx).await?;

        Ok(Self {
            role: Role::Host,
            commands,
            events,
            logs,
            link,
            local_addr: Some(local_addr),
        })
    }

    /// Connect to the host a session code rendezvouses with and hold a
    /// mirror of its state. `host_addr` overrides the derived address.
    ///
    /// Returns an error — the user-visible "could not connect"
    /// notification — when the host is unreachable or rejects the
    /// handshake; the session then never left `Disconnected`.
    pub async fn client(
        session: &Session,
        host_addr: Option<SocketAddr>,
    ) -> Result<Self, NetError> {
        if session.role != Role::Client {
            return Err(NetError::InvalidSession("not a client session"));
        }
        let rendezvous = session
            .rendezvous()
            .ok_or(NetError::InvalidSession("client session requires a code"))?;
        let addr = host_addr.unwrap_or_else(|| rendezvous_addr(&rendezvous));

        let (commands, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (log_tx, logs) = watch::channel(Vec::new());
        let (link_tx, link) = watch::channel(LinkState::Disconnected);

        client::start(rendezvous, addr, cmd_rx, events.clone(), log_tx, link_tx).await?;

        Ok(Self {
            role: Role::Client,
            commands,
            events,
            logs,
            link,
            local_addr: None,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The host's bound listening address, when this is a host session.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Submit an add intent. Routing is role-dependent; see
    /// [`Replica::handle_intent`](tracker_core::Replica::handle_intent).
    pub async fn add(&self, entry: LogEntry) -> Result<(), NetError> {
        self.send(Command::Intent(Intent::Add(entry))).await
    }

    /// Submit a remove intent for the entry with the given id.
    pub async fn remove(&self, id: impl Into<String>) -> Result<(), NetError> {
        self.send(Command::Intent(Intent::Remove(id.into()))).await
    }

    /// Subscribe to lifecycle events. Only events emitted after the
    /// subscription are observed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Watch the authoritative local view of the log (newest first).
    pub fn logs(&self) -> watch::Receiver<Vec<LogEntry>> {
        self.logs.clone()
    }

    /// Watch the link state machine. A host shows `Connected` while
    /// listening; a client moves `Connecting → Connected` during
    /// establishment and `Closed` when the session ends or the host
    /// goes away. Offline sessions stay `Disconnected`.
    pub fn link(&self) -> watch::Receiver<LinkState> {
        self.link.clone()
    }

    /// Tear down the session: the transport endpoint closes, pending
    /// connection attempts are abandoned, peers are dropped.
    pub async fn close(&self) {
        let _ = self.commands.send(Command::Close).await;
    }

    async fn send(&self, cmd: Command) -> Result<(), NetError> {
        self.commands.send(cmd).await.map_err(|_| NetError::Closed)
    }
}
