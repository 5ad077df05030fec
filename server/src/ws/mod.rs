//! WebSocket support: first-read handshake, the data-frame codec, and the
//! SHA-1 digest the accept-key derivation needs.

pub mod frame;
pub mod handshake;
pub mod sha1;
