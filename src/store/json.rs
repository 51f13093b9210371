//! Session store persisted as a JSON file.
//!
//! Layout:
//!
//! ```json
//! {
//!   "version": 1,
//!   "private_key": "<hex>",
//!   "sessions": { "<peer public key hex>": { "tx": "<hex>", "rx": "<hex>" } }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{PRIVATE_KEY_SIZE, SESSION_KEY_SIZE, SessionStore, StoreError};
use crate::crypto::{KeyPair, RemoteIdentity, SessionKeys};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreData {
    version: u32,
    private_key: String,
    #[serde(default)]
    sessions: BTreeMap<String, StoredSession>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    tx: String,
    rx: String,
}

/// Sessions and the local key pair, backed by a JSON file.
///
/// Changes stay in memory until [`SessionStore::save`].
#[derive(Debug)]
pub struct JsonSessionStore {
    path: PathBuf,
    key_pair: KeyPair,
    sessions: HashMap<RemoteIdentity, SessionKeys>,
}

impl JsonSessionStore {
    /// Load the store at `path`.
    ///
    /// A missing file yields an empty store with a fresh key pair; the file is
    /// only created by the first save.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "session store not found, starting empty");
            return Ok(Self {
                path,
                key_pair: KeyPair::generate(),
                sessions: HashMap::new(),
            });
        }

        let contents = fs::read_to_string(&path)?;
        let data: StoreData = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if data.version != STORE_VERSION {
            return Err(StoreError::Serialization(format!(
                "unsupported store version {}",
                data.version
            )));
        }

        let key_pair = KeyPair::from_private(decode_key::<PRIVATE_KEY_SIZE>(&data.private_key)?);
        let mut sessions = HashMap::with_capacity(data.sessions.len());
        for (peer, session) in data.sessions {
            let peer = RemoteIdentity::from_hex(&peer)
                .ok_or_else(|| StoreError::InvalidKey(format!("peer {peer}")))?;
            let keys = SessionKeys::from_stored(
                decode_key::<SESSION_KEY_SIZE>(&session.tx)?,
                decode_key::<SESSION_KEY_SIZE>(&session.rx)?,
            );
            sessions.insert(peer, keys);
        }

        tracing::info!(path = %path.display(), sessions = sessions.len(), "session store loaded");
        Ok(Self {
            path,
            key_pair,
            sessions,
        })
    }

    /// File backing this store.
    pub fn path(&self) -> &Path {
        &self.path
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

    fn to_data(&self) -> StoreData {
        StoreData {
            version: STORE_VERSION,
            private_key: hex::encode(self.key_pair.private_key()),
            sessions: self
                .sessions
                .iter()
                .map(|(peer, keys)| {
                    let session = StoredSession {
                        tx: hex::encode(keys.encrypt.as_bytes()),
                        rx: hex::encode(keys.decrypt.as_bytes()),
                    };
                    (peer.to_string(), session)
                })
                .collect(),
        }
    }
}

impl SessionStore for JsonSessionStore {
    fn get_session(&self, peer: &RemoteIdentity) -> Option<SessionKeys> {
        self.sessions.get(peer).cloned()
    }

    fn keys(&self) -> KeyPair {
        self.key_pair.clone()
    }

    fn delete_session(&mut self, peer: &RemoteIdentity) {
        if self.sessions.remove(peer).is_some() {
            tracing::debug!(%peer, "session deleted");
        }
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(&self.to_data())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // Atomic replace: write a temp file, then rename.
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), sessions = self.sessions.len(), "session store saved");
        Ok(())
    }
}

fn decode_key<const N: usize>(encoded: &str) -> Result<[u8; N], StoreError> {
    let bytes = hex::decode(encoded).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        StoreError::InvalidKey(format!("expected {N} bytes, got {}", bytes.len()))
    })
}
