//! Frame codec and session handshake.
//!
//! Every frame on the wire is a 4-byte big-endian length prefix
//! followed by a JSON payload. The first exchange on a new connection
//! is [`Hello`]/[`HelloAck`]: the client presents the rendezvous
//! identifier it derived from the session code, and the host accepts
//! only an exact match — the session-code equivalent of deriving a
//! transport ALPN from a shared secret. Protocol messages flow only
//! after an accepted handshake.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::NetError;

/// Maximum frame size: 1 MiB. Snapshots of a session log are tiny;
/// anything near this cap is garbage or abuse.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Client's opening frame.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Hello {
    pub rendezvous: String,
}

/// Host's handshake verdict.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HelloAck {
    pub ok: bool,
}

/// Write one length-prefixed JSON frame.
pub(crate) async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(value)?;
    write_raw(writer, &payload).await
}

/// Write one length-prefixed frame from pre-encoded bytes.
pub(crate) async fn write_raw<W>(writer: &mut W, payload: &[u8]) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_SIZE {
        return Err(NetError::FrameTooLarge(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame and decode it as `T`. Used for handshake frames,
/// where a decode failure is fatal to the connection.
pub(crate) async fn read_frame<R, T>(reader: &mut R) -> Result<T, NetError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = read_raw(reader).await?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Read one frame's raw payload. Protocol messages are decoded by the
/// caller through [`Message::decode`](tracker_core::Message::decode)
/// so that a malformed payload can be logged and skipped without
/// dropping the connection.
pub(crate) async fn read_raw<R>(reader: &mut R) -> Result<Vec<u8>, NetError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(NetError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
