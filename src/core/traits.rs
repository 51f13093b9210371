//! Boundary traits for the collaborators the engine does not own.
//!
//! The engine only ever talks to the bearer and to persistent storage
//! through these traits, so tests drive it with in-memory doubles.

use super::error::StoreError;
use crate::connection::SessionCache;
use crate::crypto::{KeyPair, RemoteIdentity, SessionKeys};

/// The byte-frame bearer (a BLE characteristic pair in practice).
///
/// The transport knows nothing about encryption or message semantics.
/// Inbound frames are handed to [`Connection::receive`](crate::connection::Connection::receive)
/// by whoever owns the bearer.
pub trait Transport {
    /// Queue one outbound frame.
    fn send(&mut self, frame: Vec<u8>);

    /// Ask the bearer to drop the link. Best effort.
    fn try_disconnect(&mut self);

    /// Stop delivering inbound frames to this connection.
    fn unsubscribe(&mut self);

    /// Sessions authenticated earlier on this bearer, keyed by peer identity.
    ///
    /// The cache outlives individual connections.
    fn sessions(&mut self) -> &mut SessionCache;
}

/// Persistent storage of previously established sessions.
pub trait SessionStore {
    /// Keys saved for `peer`, if any.
    fn get_session(&self, peer: &RemoteIdentity) -> Option<SessionKeys>;

    /// The local long-term key pair advertised on reconnection.
    fn keys(&self) -> KeyPair;

    /// Forget the session saved for `peer`.
    fn delete_session(&mut self, peer: &RemoteIdentity);

    /// Flush pending changes.
    fn save(&mut self) -> Result<(), StoreError>;
}
