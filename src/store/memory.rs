//! In-memory session store.

use std::collections::HashMap;

use crate::core::{SessionStore, StoreError};
use crate::crypto::{KeyPair, RemoteIdentity, SessionKeys};

/// Sessions kept for the lifetime of the process.
#[derive(Debug)]
pub struct MemorySessionStore {
    key_pair: KeyPair,
    sessions: HashMap<RemoteIdentity, SessionKeys>,
}

impl MemorySessionStore {
    /// Empty store with a freshly generated key pair.
    pub fn new() -> Self {
        Self::with_keys(KeyPair::generate())
    }

    /// Empty store advertising `key_pair`.
    pub fn with_keys(key_pair: KeyPair) -> Self {
        Self {
            key_pair,
            sessions: HashMap::new(),
        }
    }

    /// Remember the keys of an authenticated session.
    pub fn insert_session(&mut self, peer: RemoteIdentity, keys: SessionKeys) {
        self.sessions.insert(peer, keys);
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// No stored sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn get_session(&self, peer: &RemoteIdentity) -> Option<SessionKeys> {
        self.sessions.get(peer).cloned()
    }

    fn keys(&self) -> KeyPair {
        self.key_pair.clone()
    }

    fn delete_session(&mut self, peer: &RemoteIdentity) {
        self.sessions.remove(peer);
    }

    fn save(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
