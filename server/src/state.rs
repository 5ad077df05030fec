//! Shared application state handed to every connection actor.

use std::sync::Arc;

use crate::commands::CommandRegistry;
use crate::conn::ServerHandle;
use crate::transcript::TranscriptSink;

/// Cheap-clone bundle of the server-owned registries.
///
/// The command registry is populated once in `main` and immutable behind
/// the `Arc`; the connection and nickname tables live inside the handle.
#[derive(Clone)]
pub struct AppState {
    pub handle: ServerHandle,
    pub commands: Arc<CommandRegistry>,
    pub transcript: TranscriptSink,
}

impl AppState {
    pub fn new(
        handle: ServerHandle,
        commands: CommandRegistry,
        transcript: TranscriptSink,
    ) -> Self {
        Self {
            handle,
            commands: Arc::new(commands),
            transcript,
        }
    }
}
