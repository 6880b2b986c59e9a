//! Client endpoint: connect, handshake, mirror the host's state.
//!
//! The client never mutates its local view from user intents. Add and
//! remove requests are forwarded to the host; the view changes only
//! when a snapshot arrives back. A lost host is reported as a fault
//! and the session stays up read-only.

use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};
use tracker_core::{LinkState, LogEntry, Message, Replica, Role};

use crate::codec::{self, Hello, HelloAck};
use crate::error::NetError;
use crate::handle::{Command, SessionEvent};

const CHANNEL_CAPACITY: usize = 64;

/// Connect to the host at `addr`, run the handshake, and spawn the
/// mirror loop. Fails fast when the host is unreachable or the
/// rendezvous identifiers do not match; the caller turns that into the
/// user-visible connection notification.
pub(crate) async fn start(
    rendezvous: String,
    addr: SocketAddr,
    cmd_rx: mpsc::Receiver<Command>,
    events: broadcast::Sender<SessionEvent>,
    log_tx: watch::Sender<Vec<LogEntry>>,
    link_tx: watch::Sender<LinkState>,
) -> Result<(), NetError> {
    let _ = link_tx.send(LinkState::Connecting);
    let stream = match connect_and_handshake(&rendezvous, addr).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = link_tx.send(LinkState::Disconnected);
            return Err(e);
        }
    };
    let _ = link_tx.send(LinkState::Connected);
    info!(%addr, %rendezvous, "joined session");

    let (read_half, write_half) = stream.into_split();
    let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(read_host(read_half, addr, inbound_tx));
    tokio::spawn(event_loop(
        cmd_rx, inbound_rx, write_half, events, log_tx, link_tx,
    ));

    Ok(())
}

async fn connect_and_handshake(rendezvous: &str, addr: SocketAddr) -> Result<TcpStream, NetError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|source| NetError::Connect { addr, source })?;

    codec::write_frame(&mut stream, &Hello { rendezvous: rendezvous.to_owned() }).await?;
    let ack: HelloAck = codec::read_frame(&mut stream).await?;
    if !ack.ok {
        return Err(NetError::HandshakeRejected);
    }
    Ok(stream)
}

async fn read_host(mut reader: OwnedReadHalf, addr: SocketAddr, inbound_tx: mpsc::Sender<Message>) {
    loop {
        match codec::read_raw(&mut reader).await {
            Ok(payload) => match Message::decode(&payload) {
                Ok(msg) => {
                    if inbound_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                // Validated and rejected, never applied.
                Err(e) => warn!(%addr, "ignoring malformed message: {e}"),
            },
            Err(e) => {
                debug!(%addr, "host read ended: {e}");
                break;
            }
        }
    }
}

/// The single task that owns the mirror [`Replica`].
///
/// When the host goes away the loop keeps serving the last known view
/// until the user closes the session.
async fn event_loop(
    mut cmd_rx: mpsc::Receiver<Command>,
    mut inbound_rx: mpsc::Receiver<Message>,
    mut writer: OwnedWriteHalf,
    events: broadcast::Sender<SessionEvent>,
    log_tx: watch::Sender<Vec<LogEntry>>,
    link_tx: watch::Sender<LinkState>,
) {
    let mut replica = Replica::new(Role::Client);
    let mut connected = true;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Intent(intent)) => {
                    let forward = replica.handle_intent(intent);
                    let Some(msg) = forward else { continue };
                    if !connected {
                        let _ = events.send(SessionEvent::Fault(
                            "Not connected: request dropped".into(),
                        ));
                        continue;
                    }
                    if let Err(e) = send_to_host(&mut writer, &msg).await {
                        warn!("forward to host failed: {e}");
                        let _ = events.send(SessionEvent::Fault(
                            "Not connected: request dropped".into(),
                        ));
                    }
                }
                Some(Command::Close) | None => break,
            },
            inbound = inbound_rx.recv(), if connected => match inbound {
                Some(msg) => {
                    if replica.handle_from_host(msg) {
                        let _ = log_tx.send(replica.logs().to_vec());
                    }
                }
                None => {
                    connected = false;
                    let _ = link_tx.send(LinkState::Closed);
                    let _ = events.send(SessionEvent::Fault("Host disconnected".into()));
                    let _ = events.send(SessionEvent::LinkChanged(LinkState::Closed));
                }
            },
        }
    }

    let _ = link_tx.send(LinkState::Closed);
    let _ = events.send(SessionEvent::LinkChanged(LinkState::Closed));
}

async fn send_to_host(writer: &mut OwnedWriteHalf, msg: &Message) -> Result<(), NetError> {
    let payload = match msg.encode() {
        Ok(payload) => payload,
        Err(e) => {
            warn!("failed to encode outbound message: {e}");
            return Ok(());
        }
    };
    codec::write_raw(writer, &payload).await
}
