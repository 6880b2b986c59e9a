//! Error types for transport operations.

use std::net::SocketAddr;

/// Errors that can occur while establishing or using a session transport.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Could not bind the host's listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Could not reach a host at the rendezvous address.
    #[error("could not connect to host at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The host refused the handshake (the session codes do not match).
    #[error("host rejected the session handshake")]
    HandshakeRejected,

    /// The peer answered the handshake with something unexpected.
    #[error("unexpected handshake reply")]
    HandshakeProtocol,

    /// A frame exceeded the size cap.
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// A handshake frame failed to decode.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Underlying stream error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The session was asked for work after its event loop ended.
    #[error("session closed")]
    Closed,

    /// The session's role or code does not fit the requested endpoint.
    #[error("invalid session: {0}")]
    InvalidSession(&'static str),
}
