//! WebSocket data-frame codec (RFC 6455 subset).
//!
//! Inbound: single masked client frames, 7-bit or 16-bit payload lengths.
//! Outbound: unmasked text frames. Fragmentation, ping/pong handling and
//! 64-bit payload lengths are not supported; a malformed inbound frame
//! decodes to empty text so the dispatch layer can skip it without tearing
//! the connection down.

const OPCODE_CLOSE: u8 = 0x8;

/// Result of decoding one inbound client frame.
///
/// `text` is empty for malformed frames (unmasked, truncated, 64-bit
/// length, invalid UTF-8) and for close frames. `close` is set only for a
/// well-formed close frame and tells the connection manager to disconnect.
#[derive(Debug, PartialEq, Eq)]
pub struct InboundFrame {
    pub text: String,
    pub close: bool,
}

impl InboundFrame {
    fn empty() -> Self {
        Self {
            text: String::new(),
            close: false,
        }
    }

    fn closed() -> Self {
        Self {
            text: String::new(),
            close: true,
        }
    }
}

/// Decode a single client frame. FIN and RSV are ignored; every opcode
/// other than close is treated as text.
pub fn decode(raw: &[u8]) -> InboundFrame {
    if raw.len() < 2 {
        return InboundFrame::empty();
    }

    let opcode = raw[0] & 0x0F;

    // Clients must mask; an unmasked frame is malformed.
    if raw[1] & 0x80 == 0 {
        return InboundFrame::empty();
    }

    let len7 = (raw[1] & 0x7F) as usize;
    let (payload_len, mut pos) = match len7 {
        126 => {
            if raw.len() < 4 {
                return InboundFrame::empty();
            }
            (u16::from_be_bytes([raw[2], raw[3]]) as usize, 4)
        }
        // 64-bit payload lengths are unsupported.
        127 => return InboundFrame::empty(),
        n => (n, 2),
    };

    if raw.len() < pos + 4 {
        return InboundFrame::empty();
    }
    let mask = [raw[pos], raw[pos + 1], raw[pos + 2], raw[pos + 3]];
    pos += 4;

    if raw.len() < pos + payload_len {
        return InboundFrame::empty();
    }
    let mut payload = raw[pos..pos + payload_len].to_vec();
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }

    if opcode == OPCODE_CLOSE {
        return InboundFrame::closed();
    }

    match String::from_utf8(payload) {
        Ok(text) => InboundFrame { text, close: false },
        Err(_) => InboundFrame::empty(),
    }
}

/// Encode an unmasked server→client text frame.
pub fn encode_text(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let n = bytes.len();

    let mut frame = Vec::with_capacity(n + 10);
    frame.push(0x81);
    if n <= 125 {
        frame.push(n as u8);
    } else if n <= 65535 {
        frame.push(126);
        frame.extend_from_slice(&(n as u16).to_be_bytes());
    } else {
        frame.push(127);
        frame.extend_from_slice(&(n as u64).to_be_bytes());
    }
    frame.extend_from_slice(bytes);
    frame
}
