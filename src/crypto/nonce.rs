//! Per-direction nonce counters.
//!
//! The device seeds both counters in its nonce message. Each counter is a
//! 24-byte little-endian integer advanced by one after every successful
//! cipher operation in its direction, so a (key, nonce) pair is never
//! reused.

use crate::core::AEAD_NONCE_SIZE;

/// A 24-byte little-endian counter used directly as the AEAD nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; AEAD_NONCE_SIZE]);

impl Nonce {
    /// Seed a counter from raw bytes.
    pub fn from_bytes(bytes: [u8; AEAD_NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; AEAD_NONCE_SIZE] {
        &self.0
    }

    /// Add one, carrying across bytes (wraps at 2^192).
    pub fn increment(&mut self) {
        for byte in self.0.iter_mut() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                return;
            }
        }
    }
}

/// Counters for both directions of the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NonceState {
    /// Counter for frames we seal.
    pub encrypt: Nonce,
    /// Counter for frames we open.
    pub decrypt: Nonce,
}

impl NonceState {
    /// Build from the seeds in a nonce message.
    ///
    /// The device-bound seed drives our encrypt counter, the
    /// client-bound seed our decrypt counter.
    pub fn from_seeds(
        to_device: [u8; AEAD_NONCE_SIZE],
        to_client: [u8; AEAD_NONCE_SIZE],
    ) -> Self {
        Self {
            encrypt: Nonce::from_bytes(to_device),
            decrypt: Nonce::from_bytes(to_client),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_simple() {
        let mut nonce = Nonce::from_bytes([0; AEAD_NONCE_SIZE]);
        nonce.increment();

        let mut expected = [0u8; AEAD_NONCE_SIZE];
        expected[0] = 1;
        assert_eq!(nonce.as_bytes(), &expected);
    }

    #[test]
    fn test_increment_carries() {
        let mut seed = [0u8; AEAD_NONCE_SIZE];
        seed[0] = 0xff;
        seed[1] = 0xff;
        let mut nonce = Nonce::from_bytes(seed);
        nonce.increment();

        let mut expected = [0u8; AEAD_NONCE_SIZE];
        expected[2] = 1;
        assert_eq!(nonce.as_bytes(), &expected);
    }

    #[test]
    fn test_increment_wraps() {
        let mut nonce = Nonce::from_bytes([0xff; AEAD_NONCE_SIZE]);
        nonce.increment();
        assert_eq!(nonce.as_bytes(), &[0u8; AEAD_NONCE_SIZE]);
    }

    #[test]
    fn test_from_seeds_direction() {
        let state = NonceState::from_seeds([1; AEAD_NONCE_SIZE], [2; AEAD_NONCE_SIZE]);
        assert_eq!(state.encrypt.as_bytes(), &[1; AEAD_NONCE_SIZE]);
        assert_eq!(state.decrypt.as_bytes(), &[2; AEAD_NONCE_SIZE]);
    }
}
