//! Security layer for the RTS protocol.
//!
//! - X25519 key pairs and PIN-bound session key derivation
//! - XChaCha20-Poly1305 AEAD
//! - Per-direction nonce counters
//! - The encrypted channel that owns keys and counters after the handshake

pub mod aead;
mod channel;
mod keys;
mod nonce;

pub use channel::EncryptedChannel;
pub use keys::{KeyPair, RemoteIdentity, SessionKey, SessionKeys};
pub use nonce::{Nonce, NonceState};
