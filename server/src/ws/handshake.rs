//! First-read classification and the RFC 6455 opening handshake.
//!
//! A new connection's first read decides its protocol for good: an HTTP
//! upgrade request (starts with `GET `) switches it to WebSocket via the
//! 101 response built here; anything else stays on the plain line
//! protocol and the already-read bytes are dispatched as command lines.

use base64::Engine;

use crate::ws::sha1::Sha1;

/// Magic GUID appended to the client key before hashing (RFC 6455 §1.3).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const KEY_HEADER: &str = "Sec-WebSocket-Key:";

/// True if the first read of a connection looks like an HTTP upgrade
/// request rather than a plain command line.
pub fn is_upgrade_request(first_read: &[u8]) -> bool {
    first_read.starts_with(b"GET ")
}

/// `base64(SHA1(client_key || WS_GUID))` for the `Sec-WebSocket-Accept`
/// response header.
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Build the `101 Switching Protocols` response for an upgrade request.
///
/// Returns `None` when the request carries no `Sec-WebSocket-Key` header,
/// in which case the caller must disconnect without installing a read
/// path.
pub fn upgrade_response(request: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(request);
    let key = text
        .lines()
        .find_map(|line| line.strip_prefix(KEY_HEADER))
        .map(str::trim)?;

    Some(format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        accept_key(key)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REQUEST: &str = "GET /chat HTTP/1.1\r\n\
         Host: server.example.com\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n";

    #[test]
    fn rfc_sample_accept_key() {
        // RFC 6455 §1.3 worked example.
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn classifies_upgrade_vs_plain() {
        assert!(is_upgrade_request(SAMPLE_REQUEST.as_bytes()));
        assert!(!is_upgrade_request(b"NICK alice\n"));
        assert!(!is_upgrade_request(b""));
    }

    #[test]
    fn builds_exact_response() {
        let response = upgrade_response(SAMPLE_REQUEST.as_bytes()).unwrap();
        assert_eq!(
            response,
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
             \r\n"
        );
    }

    #[test]
    fn missing_key_is_rejected() {
        let request = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        assert!(upgrade_response(request).is_none());
    }

    #[test]
    fn key_value_is_trimmed() {
        let request = b"GET / HTTP/1.1\r\nSec-WebSocket-Key:   dGhlIHNhbXBsZSBub25jZQ==  \r\n\r\n";
        let response = upgrade_response(request).unwrap();
        assert!(response.contains("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
    }
}
