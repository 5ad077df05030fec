//! Command dispatch.
//!
//! Commands are looked up case-insensitively by their leading token; the
//! remainder of the line, if any, is handed to the handler verbatim.
//! The registry is populated once at startup and immutable afterwards.

pub mod builtin;

use std::collections::HashMap;

use uuid::Uuid;

use crate::conn::ServerHandle;

/// A chat command handler. Handlers borrow the server capability for the
/// duration of one dispatch and must not retain it.
pub trait Command: Send + Sync {
    fn execute(&self, conn_id: Uuid, arg: Option<&str>, server: &ServerHandle);
}

/// Uppercased command name → handler.
pub struct CommandRegistry {
    handlers: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in NICK, MSG and QUIT
    /// handlers.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("NICK", Box::new(builtin::Nick));
        registry.register("MSG", Box::new(builtin::Msg));
        registry.register("QUIT", Box::new(builtin::Quit));
        registry
    }

    pub fn register(&mut self, name: &str, handler: Box<dyn Command>) {
        self.handlers.insert(name.to_ascii_uppercase(), handler);
    }

    /// Route a decoded line to its handler; unknown names get a private
    /// `Unknown command` reply and leave the connection open.
    pub fn dispatch(&self, name: &str, conn_id: Uuid, arg: Option<&str>, server: &ServerHandle) {
        match self.handlers.get(&name.to_ascii_uppercase()) {
            Some(handler) => handler.execute(conn_id, arg, server),
            None => {
                tracing::debug!(conn_id = %conn_id, command = %name, "unknown command");
                server.send(conn_id, "Unknown command");
            }
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
