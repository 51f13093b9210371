//! XChaCha20-Poly1305 AEAD encryption
//!
//! Every post-handshake frame is sealed whole, with no associated data.
//! The 24-byte nonce is the current per-direction counter.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};

use super::SessionKey;
use crate::core::{AEAD_NONCE_SIZE, AEAD_TAG_SIZE, CryptoError};

/// Encrypt plaintext using XChaCha20-Poly1305.
///
/// # Returns
/// Ciphertext with appended 16-byte Poly1305 tag
pub fn seal(
    key: &SessionKey,
    nonce: &[u8; AEAD_NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let xnonce = XNonce::from_slice(nonce);

    cipher
        .encrypt(xnonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt ciphertext using XChaCha20-Poly1305.
///
/// Returns `DecryptionFailed` if the tag does not verify.
pub fn open(
    key: &SessionKey,
    nonce: &[u8; AEAD_NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < AEAD_TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let xnonce = XNonce::from_slice(nonce);

    cipher
        .decrypt(xnonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SESSION_KEY_SIZE;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let nonce = [0x01; AEAD_NONCE_SIZE];
        let plaintext = b"wifi-scan";

        let ciphertext = seal(&key, &nonce, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + AEAD_TAG_SIZE);

        let decrypted = open(&key, &nonce, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_open_wrong_key_fails() {
        let key1 = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let key2 = SessionKey::from_bytes([0x43; SESSION_KEY_SIZE]);
        let nonce = [0x01; AEAD_NONCE_SIZE];

        let ciphertext = seal(&key1, &nonce, b"secret").unwrap();
        assert_eq!(
            open(&key2, &nonce, &ciphertext),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_open_wrong_nonce_fails() {
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let ciphertext = seal(&key, &[0x01; AEAD_NONCE_SIZE], b"secret").unwrap();

        assert_eq!(
            open(&key, &[0x02; AEAD_NONCE_SIZE], &ciphertext),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_open_truncated_fails() {
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let nonce = [0x01; AEAD_NONCE_SIZE];

        assert_eq!(
            open(&key, &nonce, &[0u8; AEAD_TAG_SIZE - 1]),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_empty_plaintext() {
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let nonce = [0x01; AEAD_NONCE_SIZE];

        let ciphertext = seal(&key, &nonce, b"").unwrap();
        assert_eq!(ciphertext.len(), AEAD_TAG_SIZE);
        assert!(open(&key, &nonce, &ciphertext).unwrap().is_empty());
    }
}
