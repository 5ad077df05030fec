//! Error types for the per-connection session path.
//!
//! Frame-level malformations are deliberately not represented here: the
//! codec yields empty text for those and dispatch skips them, leaving the
//! connection up. Only conditions that end a session become errors.

use thiserror::Error;

/// Fatal to a single connection, never to the accept loop.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("websocket handshake rejected: {reason}")]
    Handshake { reason: &'static str },
}
