//! Host endpoint: listening socket, peer registry, authoritative loop.
//!
//! The accept loop admits any peer that presents the right rendezvous
//! identifier. Each admitted peer gets a reader task and a writer
//! task; both talk to the single event loop that owns the [`Replica`].
//! Mutations therefore serialize through one queue regardless of how
//! many peers are connected, and every broadcast carries a complete
//! snapshot.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracker_core::{LinkState, LogEntry, Message, Replica, Role};

use crate::codec::{self, Hello, HelloAck};
use crate::error::NetError;
use crate::handle::{Command, SessionEvent};

const CHANNEL_CAPACITY: usize = 64;

/// Backoff after a failed accept, so a persistent listener error
/// (fd exhaustion, say) does not spin the accept task.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Internal traffic from peer tasks into the event loop.
enum HostMsg {
    PeerOpened {
        peer: u64,
        addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
    },
    FromPeer {
        msg: Message,
    },
    PeerClosed {
        peer: u64,
        addr: SocketAddr,
    },
}

struct PeerLink {
    addr: SocketAddr,
    outbound: mpsc::Sender<Message>,
}

/// Bind the listening endpoint and spawn the host tasks.
/// Returns the bound address (relevant when binding port 0).
pub(crate) async fn start(
    rendezvous: String,
    bind: SocketAddr,
    cmd_rx: mpsc::Receiver<Command>,
    events: broadcast::Sender<SessionEvent>,
    log_tx: watch::Sender<Vec<LogEntry>>,
    link_tx: watch::Sender<LinkState>,
) -> Result<SocketAddr, NetError> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|source| NetError::Bind { addr: bind, source })?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, %rendezvous, "hosting session");
    let _ = link_tx.send(LinkState::Connected);

    let (internal_tx, internal_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let accept_task = tokio::spawn(accept_loop(listener, rendezvous, internal_tx));
    tokio::spawn(event_loop(
        cmd_rx,
        internal_rx,
        events,
        log_tx,
        link_tx,
        accept_task,
    ));

    Ok(local_addr)
}

async fn accept_loop(
    listener: TcpListener,
    rendezvous: String,
    to_loop: mpsc::Sender<HostMsg>,
) {
    let mut next_peer: u64 = 0;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let peer = next_peer;
                next_peer += 1;
                tokio::spawn(serve_peer(
                    stream,
                    addr,
                    peer,
                    rendezvous.clone(),
                    to_loop.clone(),
                ));
            }
            Err(e) => {
                warn!("accept failed: {e}");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

/// Handshake one inbound connection, then pump its frames into the
/// event loop until the peer goes away.
async fn serve_peer(
    mut stream: TcpStream,
    addr: SocketAddr,
    peer: u64,
    rendezvous: String,
    to_loop: mpsc::Sender<HostMsg>,
) {
    let hello: Hello = match codec::read_frame(&mut stream).await {
        Ok(hello) => hello,
        Err(e) => {
            warn!(%addr, "handshake failed: {e}");
            return;
        }
    };
    let ok = hello.rendezvous == rendezvous;
    if codec::write_frame(&mut stream, &HelloAck { ok }).await.is_err() {
        return;
    }
    if !ok {
        warn!(%addr, presented = %hello.rendezvous, "rejected peer: rendezvous mismatch");
        return;
    }

    let (read_half, write_half) = stream.into_split();
    let (outbound, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    if to_loop
        .send(HostMsg::PeerOpened { peer, addr, outbound })
        .await
        .is_err()
    {
        return; // session already closed
    }
    tokio::spawn(write_peer(write_half, outbound_rx, addr));

    read_peer(read_half, addr, &to_loop).await;
    let _ = to_loop.send(HostMsg::PeerClosed { peer, addr }).await;
}

async fn read_peer(mut reader: OwnedReadHalf, addr: SocketAddr, to_loop: &mpsc::Sender<HostMsg>) {
    loop {
        match codec::read_raw(&mut reader).await {
            Ok(payload) => match Message::decode(&payload) {
                Ok(msg) => {
                    if to_loop.send(HostMsg::FromPeer { msg }).await.is_err() {
                        break;
                    }
                }
                // Validated and rejected, never applied.
                Err(e) => warn!(%addr, "ignoring malformed message: {e}"),
            },
            Err(e) => {
                debug!(%addr, "peer read ended: {e}");
                break;
            }
        }
    }
}

async fn write_peer(
    mut writer: OwnedWriteHalf,
    mut outbound_rx: mpsc::Receiver<Message>,
    addr: SocketAddr,
) {
    while let Some(msg) = outbound_rx.recv().await {
        let payload = match msg.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to encode outbound message: {e}");
                continue;
            }
        };
        if let Err(e) = codec::write_raw(&mut writer, &payload).await {
            debug!(%addr, "peer write ended: {e}");
            break;
        }
    }
}

/// The single task that owns the authoritative [`Replica`].
async fn event_loop(
    mut cmd_rx: mpsc::Receiver<Command>,
    mut internal_rx: mpsc::Receiver<HostMsg>,
    events: broadcast::Sender<SessionEvent>,
    log_tx: watch::Sender<Vec<LogEntry>>,
    link_tx: watch::Sender<LinkState>,
    accept_task: JoinHandle<()>,
) {
    let mut replica = Replica::new(Role::Host);
    let mut peers: HashMap<u64, PeerLink> = HashMap::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Intent(intent)) => {
                    let snapshot = replica.handle_intent(intent);
                    let _ = log_tx.send(replica.logs().to_vec());
                    if let Some(msg) = snapshot {
                        broadcast_snapshot(&mut peers, &events, &msg);
                    }
                }
                Some(Command::Close) | None => break,
            },
            internal = internal_rx.recv() => match internal {
                Some(HostMsg::PeerOpened { peer, addr, outbound }) => {
                    // Bootstrap: the new peer starts from the current
                    // state instead of empty. The queue is fresh, so
                    // try_send can only fail if the writer already died.
                    if outbound.try_send(replica.snapshot()).is_ok() {
                        peers.insert(peer, PeerLink { addr, outbound });
                        info!(%addr, "peer connected");
                        let _ = events.send(SessionEvent::PeerJoined { addr });
                    }
                }
                Some(HostMsg::FromPeer { msg }) => {
                    if let Some(snapshot) = replica.handle_from_client(msg) {
                        let _ = log_tx.send(replica.logs().to_vec());
                        broadcast_snapshot(&mut peers, &events, &snapshot);
                    }
                }
                Some(HostMsg::PeerClosed { peer, addr }) => {
                    if peers.remove(&peer).is_some() {
                        info!(%addr, "peer disconnected");
                        let _ = events.send(SessionEvent::PeerLeft { addr });
                    }
                }
                None => break,
            },
        }
    }

    accept_task.abort();
    peers.clear();
    let _ = link_tx.send(LinkState::Closed);
    let _ = events.send(SessionEvent::LinkChanged(LinkState::Closed));
}

/// Queue a snapshot to every connected peer without blocking the event
/// loop. A peer whose queue is full has stopped draining its socket
/// and would stall everyone else, so it is dropped like a closed one.
fn broadcast_snapshot(
    peers: &mut HashMap<u64, PeerLink>,
    events: &broadcast::Sender<SessionEvent>,
    msg: &Message,
) {
    peers.retain(|_, link| match link.outbound.try_send(msg.clone()) {
        Ok(()) => true,
        Err(_) => {
            warn!(addr = %link.addr, "dropping unresponsive peer");
            let _ = events.send(SessionEvent::PeerLeft { addr: link.addr });
            false
        }
    });
}
