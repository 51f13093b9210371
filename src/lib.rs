//! # RTS Protocol
//!
//! Client side of the RTS pairing protocol spoken by Vector robots over BLE.
//!
//! The client pairs with a robot by confirming a PIN shown on its face, then
//! issues Wi-Fi, status, firmware update and log download operations over an
//! encrypted channel:
//!
//! - **Pairing**: X25519 key exchange bound to the PIN with BLAKE2b, followed
//!   by a challenge round trip
//! - **Reconnection**: previously authenticated sessions skip the PIN step
//! - **Encryption**: XChaCha20-Poly1305 with per-direction nonce counters
//! - **Requests**: every request gets its own completion handle
//! - **Transfers**: chunked log download and firmware update progress
//!
//! ## Feature Flags
//!
//! - `client` (default): async [`client::RtsClient`] driving a connection from a tokio task
//! - `json-store` (default): [`store::JsonSessionStore`] persisted with serde
//!
//! ## Modules
//!
//! - [`core`]: constants, error types and the boundary traits
//! - [`crypto`]: key pairs, session key derivation, AEAD and nonces
//! - [`message`]: the RTS wire codec
//! - [`connection`]: handshake, dispatch and request correlation
//! - [`store`]: session store implementations
//! - [`client`]: async client handle (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use rts_protocol::prelude::*;
//! use rts_protocol::store::MemorySessionStore;
//!
//! // The bearer: frames written to the robot's characteristic
//! struct Ble {
//!     outbox: Vec<Vec<u8>>,
//!     sessions: SessionCache,
//! }
//!
//! impl Transport for Ble {
//!     fn send(&mut self, frame: Vec<u8>) {
//!         self.outbox.push(frame);
//!     }
//!
//!     fn try_disconnect(&mut self) {}
//!
//!     fn unsubscribe(&mut self) {}
//!
//!     fn sessions(&mut self) -> &mut SessionCache {
//!         &mut self.sessions
//!     }
//! }
//!
//! let ble = Ble {
//!     outbox: Vec::new(),
//!     sessions: SessionCache::new(),
//! };
//! let mut connection = Connection::new(ble, MemorySessionStore::new(), ConnectionConfig::default());
//! connection
//!     .events()
//!     .ready_for_pin
//!     .subscribe(|_| println!("Enter the PIN shown on the robot"));
//!
//! // Frames read from the bearer go to `connection.receive(&frame)`.
//! assert_eq!(connection.state(), HandshakeState::Idle);
//! assert!(!connection.is_encrypted());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Security layer
pub mod crypto;

// Wire codec
pub mod message;

// Protocol engine
pub mod connection;

// Session stores (JSON store feature-gated inside)
pub mod store;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits, constants and errors
    pub use crate::core::*;

    // Crypto types
    pub use crate::crypto::{EncryptedChannel, KeyPair, RemoteIdentity, SessionKey, SessionKeys};

    // Messages
    pub use crate::message::{Decoded, RtsMessage, decode_frame};

    // Connection engine
    pub use crate::connection::{
        Connection, ConnectionConfig, ConnectionConfigBuilder, ConnectionEvents, HandshakeState,
        LogArtifact, Operation, Reply, ResponseHandle, SessionCache,
    };

    // Client types (when enabled)
    #[cfg(feature = "client")]
    pub use crate::client::{ClientError, RtsClient};
}

// Re-export commonly used items at crate root
pub use connection::{Connection, ConnectionConfig, HandshakeState};
pub use core::{ConnectionError, RequestError, SessionStore, Transport};
pub use message::RtsMessage;

#[cfg(feature = "client")]
pub use client::{ClientError, RtsClient};
