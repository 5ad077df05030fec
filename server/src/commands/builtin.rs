//! The built-in command handlers: NICK, MSG and QUIT.

use uuid::Uuid;

use crate::commands::Command;
use crate::conn::{ServerHandle, DEFAULT_NICK};

/// `NICK [nickname]` — record the caller's nickname and confirm privately.
/// Without an argument the nickname resets to the default.
pub struct Nick;

impl Command for Nick {
    fn execute(&self, conn_id: Uuid, arg: Option<&str>, server: &ServerHandle) {
        let nick = arg.unwrap_or(DEFAULT_NICK);
        server.set_nick(conn_id, nick);
        server.send(conn_id, &format!("Your nickname is now {nick}"));
    }
}

/// `MSG [text]` — broadcast `<nick>: <text>` to every live connection,
/// the caller included.
pub struct Msg;

impl Command for Msg {
    fn execute(&self, conn_id: Uuid, arg: Option<&str>, server: &ServerHandle) {
        let nick = server.get_nick(conn_id);
        let payload = arg.unwrap_or("(empty)");
        server.broadcast(&format!("{nick}: {payload}"));
    }
}

/// `QUIT` — say goodbye, then disconnect the caller. The farewell is
/// queued ahead of the shutdown marker so it reaches the wire.
pub struct Quit;

impl Command for Quit {
    fn execute(&self, conn_id: Uuid, _arg: Option<&str>, server: &ServerHandle) {
        server.send(conn_id, "Goodbye!");
        server.disconnect(conn_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::Outbound;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
    use tokio_util::sync::CancellationToken;

    fn registered(handle: &ServerHandle) -> (Uuid, UnboundedReceiver<Outbound>) {
        let (tx, rx) = unbounded_channel();
        (handle.register(tx, CancellationToken::new()), rx)
    }

    fn queued_text(rx: &mut UnboundedReceiver<Outbound>) -> String {
        match rx.try_recv().expect("expected a reply") {
            Outbound::Data(bytes) => String::from_utf8(bytes).unwrap(),
            Outbound::Shutdown => panic!("unexpected shutdown"),
        }
    }

    #[tokio::test]
    async fn nick_without_argument_resets_to_default() {
        let handle = ServerHandle::new();
        let (id, mut rx) = registered(&handle);

        Nick.execute(id, Some("alice"), &handle);
        assert_eq!(queued_text(&mut rx), "Your nickname is now alice\n");

        Nick.execute(id, None, &handle);
        assert_eq!(queued_text(&mut rx), "Your nickname is now Anonymous\n");
        assert_eq!(handle.get_nick(id), DEFAULT_NICK);
    }

    #[tokio::test]
    async fn nick_argument_is_taken_verbatim() {
        let handle = ServerHandle::new();
        let (id, mut rx) = registered(&handle);

        // Everything after the first space belongs to the argument.
        Nick.execute(id, Some("spaced out name"), &handle);
        assert_eq!(handle.get_nick(id), "spaced out name");
        assert_eq!(queued_text(&mut rx), "Your nickname is now spaced out name\n");
    }

    #[tokio::test]
    async fn msg_broadcasts_with_the_senders_nick() {
        let handle = ServerHandle::new();
        let (alice, mut alice_rx) = registered(&handle);
        let (_bob, mut bob_rx) = registered(&handle);
        handle.set_nick(alice, "alice");

        Msg.execute(alice, Some("hi there"), &handle);

        assert_eq!(queued_text(&mut alice_rx), "alice: hi there\n");
        assert_eq!(queued_text(&mut bob_rx), "alice: hi there\n");
    }

    #[tokio::test]
    async fn msg_without_argument_sends_the_empty_placeholder() {
        let handle = ServerHandle::new();
        let (id, mut rx) = registered(&handle);

        Msg.execute(id, None, &handle);
        assert_eq!(queued_text(&mut rx), "Anonymous: (empty)\n");
    }

    #[tokio::test]
    async fn quit_queues_goodbye_before_shutdown() {
        let handle = ServerHandle::new();
        let (id, mut rx) = registered(&handle);

        Quit.execute(id, None, &handle);

        assert_eq!(queued_text(&mut rx), "Goodbye!\n");
        match rx.try_recv().unwrap() {
            Outbound::Shutdown => {}
            other => panic!("expected shutdown, got {other:?}"),
        }
        assert!(!handle.is_connected(id));
    }
}
