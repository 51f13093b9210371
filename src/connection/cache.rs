//! In-memory cache of sessions authenticated on this bearer.

use std::collections::HashMap;

use crate::crypto::{KeyPair, RemoteIdentity, SessionKeys};

/// Keys and local key pair of one authenticated session.
#[derive(Debug, Clone)]
pub struct CachedSession {
    /// Per-direction session keys.
    pub keys: SessionKeys,
    /// Local key pair used when the session was created.
    pub key_pair: KeyPair,
}

/// Sessions keyed by the stringified peer public key.
#[derive(Debug, Default)]
pub struct SessionCache {
    sessions: HashMap<String, CachedSession>,
}

impl SessionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session cached for `peer`.
    pub fn get(&self, peer: &RemoteIdentity) -> Option<&CachedSession> {
        self.sessions.get(&peer.to_string())
    }

    /// Cache (or replace) the session for `peer`.
    pub fn insert(&mut self, peer: &RemoteIdentity, session: CachedSession) {
        self.sessions.insert(peer.to_string(), session);
    }

    /// Drop the session for `peer`.
    pub fn remove(&mut self, peer: &RemoteIdentity) -> Option<CachedSession> {
        self.sessions.remove(&peer.to_string())
    }

    /// Number of cached sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Nothing cached.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
