//! Actor-per-connection read/write pipeline.
//!
//! Each accepted socket is split into a reader half driven here and a
//! writer task fed over an mpsc channel, so any part of the system can
//! queue bytes for a client without touching the socket. The first read
//! classifies the connection (WebSocket upgrade vs plain lines) and the
//! matching read loop runs until peer close, transport error, QUIT, or
//! idle eviction cancels it.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::conn::{Outbound, OutboundSender};
use crate::error::SessionError;
use crate::state::AppState;
use crate::ws::{frame, handshake};

/// Per-read buffer size, shared by classification and both read loops.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Run one connection to completion. Registers it on entry and guarantees
/// both tables exclude it again before returning.
pub async fn run_connection(stream: TcpStream, state: AppState) {
    let peer = stream.peer_addr().ok();
    let (mut reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let id = state.handle.register(tx.clone(), cancel.clone());

    tracing::info!(
        conn_id = %id,
        peer = ?peer,
        connections = state.handle.connection_count(),
        "connection accepted"
    );

    let writer_handle = tokio::spawn(writer_task(writer, rx));

    match read_pipeline(&mut reader, id, &tx, &state, &cancel).await {
        Ok(()) => tracing::info!(conn_id = %id, "connection closed"),
        Err(err) => tracing::warn!(conn_id = %id, error = %err, "connection terminated"),
    }

    // Peer-close and transport-error exits land here with the entry still
    // registered; QUIT and eviction have already removed it.
    state.handle.disconnect(id);

    // Dropping our sender lets the writer drain the queue and finish.
    drop(tx);
    let _ = writer_handle.await;
}

/// Writer task: forwards queued bytes to the socket until the channel
/// closes, a write fails, or a shutdown marker is reached.
async fn writer_task(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(message) = rx.recv().await {
        match message {
            Outbound::Data(bytes) => {
                if writer.write_all(&bytes).await.is_err() {
                    break;
                }
            }
            Outbound::Shutdown => {
                let _ = writer.shutdown().await;
                break;
            }
        }
    }
}

/// First read, protocol classification, then the protocol's read loop.
async fn read_pipeline(
    reader: &mut OwnedReadHalf,
    id: Uuid,
    tx: &OutboundSender,
    state: &AppState,
    cancel: &CancellationToken,
) -> Result<(), SessionError> {
    let mut buf = [0u8; READ_BUFFER_SIZE];

    let n = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(()),
        result = reader.read(&mut buf) => result?,
    };
    if n == 0 {
        return Ok(());
    }
    state.handle.touch(id);

    if handshake::is_upgrade_request(&buf[..n]) {
        let response = handshake::upgrade_response(&buf[..n]).ok_or(SessionError::Handshake {
            reason: "missing Sec-WebSocket-Key",
        })?;
        tx.send(Outbound::Data(response.into_bytes()))
            .map_err(|_| SessionError::Handshake {
                reason: "writer gone before 101 response",
            })?;
        state.handle.mark_websocket(id);
        tracing::debug!(conn_id = %id, "websocket handshake complete");
        websocket_loop(reader, id, state, cancel, &mut buf).await
    } else {
        // The classifying read already consumed command bytes; dispatch
        // them before waiting for more.
        let mut pending = buf[..n].to_vec();
        dispatch_lines(&mut pending, id, state);
        plain_loop(reader, id, state, cancel, &mut buf, pending).await
    }
}

/// Framed read loop: one client frame per read.
async fn websocket_loop(
    reader: &mut OwnedReadHalf,
    id: Uuid,
    state: &AppState,
    cancel: &CancellationToken,
    buf: &mut [u8; READ_BUFFER_SIZE],
) -> Result<(), SessionError> {
    loop {
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            result = reader.read(buf) => result?,
        };
        if n == 0 {
            return Ok(());
        }
        state.handle.touch(id);

        let inbound = frame::decode(&buf[..n]);
        if inbound.close {
            tracing::debug!(conn_id = %id, "close frame received");
            state.handle.disconnect(id);
            return Ok(());
        }
        let line = inbound.text.trim();
        if !line.is_empty() {
            dispatch_line(line, id, state);
        }
    }
}

/// Line read loop with a carry buffer for commands split across reads.
async fn plain_loop(
    reader: &mut OwnedReadHalf,
    id: Uuid,
    state: &AppState,
    cancel: &CancellationToken,
    buf: &mut [u8; READ_BUFFER_SIZE],
    mut pending: Vec<u8>,
) -> Result<(), SessionError> {
    loop {
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            result = reader.read(buf) => result?,
        };
        if n == 0 {
            return Ok(());
        }
        state.handle.touch(id);

        pending.extend_from_slice(&buf[..n]);
        dispatch_lines(&mut pending, id, state);
    }
}

/// Drain every complete LF-terminated line from `pending` and dispatch
/// them in byte order, leaving any trailing partial line in place.
fn dispatch_lines(pending: &mut Vec<u8>, id: Uuid, state: &AppState) {
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let line_bytes: Vec<u8> = pending.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line_bytes);
        let line = line.trim();
        if !line.is_empty() {
            dispatch_line(line, id, state);
        }
        // A QUIT in this batch removed the connection; later lines from
        // the same read are moot.
        if !state.handle.is_connected(id) {
            return;
        }
    }
}

/// Record the line in the transcript and route it to its handler.
fn dispatch_line(line: &str, id: Uuid, state: &AppState) {
    state.transcript.record(line);
    let mut parts = line.splitn(2, ' ');
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();
    state.commands.dispatch(name, id, arg, &state.handle);
}
