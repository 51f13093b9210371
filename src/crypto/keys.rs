//! X25519 key material and session key derivation.
//!
//! First-time pairing derives the per-direction keys in two steps:
//!
//! ```text
//! q          = X25519(local_private, peer_public)
//! rx || tx   = BLAKE2b-512(q || local_public || peer_public)
//! decrypt    = BLAKE2b-256(rx, key = pin)
//! encrypt    = BLAKE2b-256(tx, key = pin)
//! ```
//!
//! The first step matches libsodium's `crypto_kx_client_session_keys`, the
//! second binds the result to the PIN shown on the device.

use std::fmt;

use blake2::{Blake2b512, Digest};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::core::{CryptoError, MAX_PIN_SIZE, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, SESSION_KEY_SIZE};

/// An X25519 keypair.
///
/// The private key is zeroized on drop for security.
#[derive(Clone)]
pub struct KeyPair {
    private: [u8; PRIVATE_KEY_SIZE],
    public: [u8; PUBLIC_KEY_SIZE],
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self {
            private: secret.to_bytes(),
            public: public.to_bytes(),
        }
    }

    /// Rebuild a keypair from a stored private key.
    pub fn from_private(private: [u8; PRIVATE_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(private);
        let public = PublicKey::from(&secret);
        Self {
            private,
            public: public.to_bytes(),
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public
    }

    /// Get the private key.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn private_key(&self) -> &[u8; PRIVATE_KEY_SIZE] {
        &self.private
    }

    /// Client-side key exchange with the peer, returning `(rx, tx)`.
    pub fn client_session_keys(
        &self,
        peer_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> ([u8; SESSION_KEY_SIZE], [u8; SESSION_KEY_SIZE]) {
        let secret = StaticSecret::from(self.private);
        let shared = secret.diffie_hellman(&PublicKey::from(*peer_public));

        let mut hasher = Blake2b512::new();
        hasher.update(shared.as_bytes());
        hasher.update(self.public);
        hasher.update(peer_public);
        let mut digest = hasher.finalize();

        let mut rx = [0u8; SESSION_KEY_SIZE];
        let mut tx = [0u8; SESSION_KEY_SIZE];
        rx.copy_from_slice(&digest[..SESSION_KEY_SIZE]);
        tx.copy_from_slice(&digest[SESSION_KEY_SIZE..]);
        digest.as_mut_slice().zeroize();

        (rx, tx)
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex_preview(&self.public))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// The peer's long-term public key, captured from its connection request.
///
/// Used as the lookup key into the session store and the session cache.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteIdentity([u8; PUBLIC_KEY_SIZE]);

impl RemoteIdentity {
    /// Wrap a raw public key.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw public key.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Parse a hex-encoded public key.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let key: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().ok()?;
        Some(Self(key))
    }
}

impl fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteIdentity({})", hex_preview(&self.0))
    }
}

/// A symmetric key for one direction of the channel.
///
/// Zeroized on drop for security.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    key: [u8; SESSION_KEY_SIZE],
}

impl SessionKey {
    /// Create a new session key from bytes.
    pub fn from_bytes(key: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// The pair of per-direction keys for an established session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKeys {
    /// Seals frames we send.
    pub encrypt: SessionKey,
    /// Opens frames we receive.
    pub decrypt: SessionKey,
}

impl SessionKeys {
    /// Build from a stored `{tx, rx}` pair.
    pub fn from_stored(tx: [u8; SESSION_KEY_SIZE], rx: [u8; SESSION_KEY_SIZE]) -> Self {
        Self {
            encrypt: SessionKey::from_bytes(tx),
            decrypt: SessionKey::from_bytes(rx),
        }
    }

    /// Derive fresh keys for a first-time pairing.
    ///
    /// Deterministic for fixed inputs.
    pub fn derive(
        local: &KeyPair,
        peer_public: &[u8; PUBLIC_KEY_SIZE],
        pin: &str,
    ) -> Result<Self, CryptoError> {
        let pin = pin.as_bytes();
        if pin.is_empty() || pin.len() > MAX_PIN_SIZE {
            return Err(CryptoError::InvalidPin(pin.len()));
        }

        let (mut rx, mut tx) = local.client_session_keys(peer_public);
        let decrypt = pin_hash(&rx, pin)?;
        let encrypt = pin_hash(&tx, pin)?;
        rx.zeroize();
        tx.zeroize();

        Ok(Self {
            encrypt: SessionKey::from_bytes(encrypt),
            decrypt: SessionKey::from_bytes(decrypt),
        })
    }
}

/// BLAKE2b-256 of `shared`, keyed with the PIN.
fn pin_hash(shared: &[u8], pin: &[u8]) -> Result<[u8; SESSION_KEY_SIZE], CryptoError> {
    use blake2::Blake2bMac;
    use blake2::digest::{Mac, consts::U32};

    let mut mac = <Blake2bMac<U32> as Mac>::new_from_slice(pin)
        .map_err(|_| CryptoError::InvalidPin(pin.len()))?;
    mac.update(shared);

    let mut out = [0u8; SESSION_KEY_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn hex_preview(bytes: &[u8]) -> String {
    if bytes.len() <= 8 {
        hex::encode(bytes)
    } else {
        format!("{}...", hex::encode(&bytes[..4]))
    }
}
