//! Error types for the RTS protocol engine.

use thiserror::Error;

use crate::message::RtsMessage;

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (invalid tag, desynchronized nonce or wrong key).
    #[error("AEAD decryption failed (invalid tag or corrupted)")]
    DecryptionFailed,

    /// PIN is empty or does not fit in a BLAKE2b key.
    #[error("PIN must be 1 to 64 bytes, got {0}")]
    InvalidPin(usize),

    /// The channel has no installed keys or nonces yet.
    #[error("channel not ready: {0}")]
    ChannelNotReady(&'static str),
}

/// Wire encoding/decoding errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Input data is shorter than required.
    #[error("message too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// A string field was not valid UTF-8.
    #[error("invalid utf-8 in {0}")]
    InvalidUtf8(&'static str),

    /// A field does not fit its length prefix.
    #[error("field {field} too long: {len} bytes")]
    FieldTooLong {
        /// Field name.
        field: &'static str,
        /// Actual length.
        len: usize,
    },

    /// The encoded envelope would be read as the 5-byte handshake frame.
    #[error("a {0}-byte envelope would read as a handshake frame")]
    AbortLength(usize),
}

/// Session store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error while loading or saving.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file could not be parsed or written.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored key had the wrong shape.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Why a pending request did not produce a reply.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    /// The device answered with a nack or a failure status.
    #[error("request rejected by peer")]
    Rejected(Box<RtsMessage>),

    /// The connection was cleaned up before a reply arrived.
    #[error("connection closed before a reply arrived")]
    ConnectionClosed,
}

/// Top-level connection errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Malformed frame.
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// Session store error.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    /// An operation needs state the handshake has not reached.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The connection has been cleaned up.
    #[error("connection closed")]
    Closed,
}
