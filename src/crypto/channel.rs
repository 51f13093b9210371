//! The encrypted channel.
//!
//! Owns the session keys and both nonce counters once the handshake has
//! installed them. A counter advances only after its cipher operation
//! succeeds; a failed open leaves the decrypt counter untouched.

use super::{NonceState, SessionKeys, aead};
use crate::core::CryptoError;

/// Wraps outgoing and unwraps incoming frames for one connection.
#[derive(Debug, Default)]
pub struct EncryptedChannel {
    keys: Option<SessionKeys>,
    nonces: Option<NonceState>,
    encrypted: bool,
}

impl EncryptedChannel {
    /// Create an inactive channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the session keys (fresh or restored).
    pub fn install_keys(&mut self, keys: SessionKeys) {
        self.keys = Some(keys);
    }

    /// Install the counters seeded by the nonce message.
    pub fn install_nonces(&mut self, nonces: NonceState) {
        self.nonces = Some(nonces);
    }

    /// Start sealing outbound and opening inbound frames.
    pub fn activate(&mut self) -> Result<(), CryptoError> {
        if self.keys.is_none() {
            return Err(CryptoError::ChannelNotReady("no session keys"));
        }
        if self.nonces.is_none() {
            return Err(CryptoError::ChannelNotReady("no nonces"));
        }
        self.encrypted = true;
        Ok(())
    }

    /// Stop encrypting (keys and counters are dropped).
    pub fn reset(&mut self) {
        self.keys = None;
        self.nonces = None;
        self.encrypted = false;
    }

    /// Whether frames are currently sealed.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// The installed session keys.
    pub fn keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }

    /// The current counters.
    pub fn nonces(&self) -> Option<&NonceState> {
        self.nonces.as_ref()
    }

    /// Seal a plaintext frame with the current encrypt counter, then advance it.
    pub fn wrap(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (keys, nonces) = self.active()?;
        let ciphertext = aead::seal(&keys.encrypt, nonces.encrypt.as_bytes(), plaintext)?;
        nonces.encrypt.increment();
        Ok(ciphertext)
    }

    /// Open a ciphertext frame with the current decrypt counter, then advance it.
    pub fn unwrap(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (keys, nonces) = self.active()?;
        let plaintext = aead::open(&keys.decrypt, nonces.decrypt.as_bytes(), ciphertext)?;
        nonces.decrypt.increment();
        Ok(plaintext)
    }

    fn active(&mut self) -> Result<(&SessionKeys, &mut NonceState), CryptoError> {
        if !self.encrypted {
            return Err(CryptoError::ChannelNotReady("channel not encrypted"));
        }
        match (self.keys.as_ref(), self.nonces.as_mut()) {
            (Some(keys), Some(nonces)) => Ok((keys, nonces)),
            _ => Err(CryptoError::ChannelNotReady("missing keys or nonces")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AEAD_NONCE_SIZE, SESSION_KEY_SIZE};
    use crate::crypto::{Nonce, SessionKey};

    fn keys(a: u8, b: u8) -> SessionKeys {
        SessionKeys {
            encrypt: SessionKey::from_bytes([a; SESSION_KEY_SIZE]),
            decrypt: SessionKey::from_bytes([b; SESSION_KEY_SIZE]),
        }
    }

    /// A client channel and the device-side mirror of it.
    fn channel_pair() -> (EncryptedChannel, EncryptedChannel) {
        let to_device = [0x10; AEAD_NONCE_SIZE];
        let to_client = [0x20; AEAD_NONCE_SIZE];

        let mut client = EncryptedChannel::new();
        client.install_keys(keys(0x01, 0x02));
        client.install_nonces(NonceState::from_seeds(to_device, to_client));
        client.activate().unwrap();

        let mut device = EncryptedChannel::new();
        device.install_keys(keys(0x02, 0x01));
        device.install_nonces(NonceState {
            encrypt: Nonce::from_bytes(to_client),
            decrypt: Nonce::from_bytes(to_device),
        });
        device.activate().unwrap();

        (client, device)
    }

    #[test]
    fn test_inactive_channel_refuses() {
        let mut channel = EncryptedChannel::new();
        assert!(matches!(
            channel.wrap(b"x"),
            Err(CryptoError::ChannelNotReady(_))
        ));
        assert!(matches!(
            channel.activate(),
            Err(CryptoError::ChannelNotReady(_))
        ));
    }

    #[test]
    fn test_wrap_unwrap_many() {
        let (mut client, mut device) = channel_pair();

        for i in 0..50u8 {
            let msg = vec![i; i as usize];
            let sealed = client.wrap(&msg).unwrap();
            assert_eq!(device.unwrap(&sealed).unwrap(), msg);

            let reply = device.wrap(&msg).unwrap();
            assert_eq!(client.unwrap(&reply).unwrap(), msg);
        }
    }

    #[test]
    fn test_counters_advance_by_one() {
        let (mut client, _device) = channel_pair();
        let mut expected = *client.nonces().unwrap();

        for _ in 0..3 {
            client.wrap(b"ping").unwrap();
            expected.encrypt.increment();
            assert_eq!(client.nonces().unwrap(), &expected);
        }
    }

    #[test]
    fn test_same_plaintext_never_repeats_ciphertext() {
        let (mut client, _device) = channel_pair();
        let a = client.wrap(b"status").unwrap();
        let b = client.wrap(b"status").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_failed_unwrap_keeps_counter() {
        let (mut client, mut device) = channel_pair();
        let before = *client.nonces().unwrap();

        let mut sealed = device.wrap(b"status").unwrap();
        sealed[0] ^= 0xff;

        assert_eq!(client.unwrap(&sealed), Err(CryptoError::DecryptionFailed));
        assert_eq!(client.nonces().unwrap(), &before);
    }

    #[test]
    fn test_out_of_order_frame_fails() {
        let (mut client, mut device) = channel_pair();

        let first = device.wrap(b"one").unwrap();
        let second = device.wrap(b"two").unwrap();

        assert!(client.unwrap(&second).is_err());
        assert_eq!(client.unwrap(&first).unwrap(), b"one");
        assert_eq!(client.unwrap(&second).unwrap(), b"two");
    }
}
