//! Protocol constants for the RTS pairing protocol.
//!
//! Sizes, tags and status codes are fixed by the device firmware and
//! MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Poly1305 authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// XChaCha20 nonce size.
pub const AEAD_NONCE_SIZE: usize = 24;

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 private key size.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Symmetric session key size (one per direction).
pub const SESSION_KEY_SIZE: usize = 32;

/// Maximum PIN length in bytes (BLAKE2b key limit).
pub const MAX_PIN_SIZE: usize = 64;

// =============================================================================
// ENVELOPE
// =============================================================================

/// Outer `ExternalComms` tag for RTS connection traffic.
pub const EXTERNAL_COMMS_RTS_CONNECTION: u8 = 0x01;

/// RTS connection version used for every outbound envelope.
pub const RTS_CONNECTION_V2: u8 = 0x02;

/// Highest RTS connection version accepted inbound.
pub const RTS_CONNECTION_MAX: u8 = 0x05;

/// Length of the raw handshake frame that signals an abort.
pub const ABORT_FRAME_SIZE: usize = 5;

/// First byte of the raw handshake frame that signals an abort.
pub const ABORT_FRAME_TAG: u8 = 0x01;

// =============================================================================
// MESSAGE TAGS (RTS connection v2)
// =============================================================================

/// Peer asks to connect, carrying its public key.
pub const TAG_CONN_REQUEST: u8 = 1;
/// Our answer to a connection request.
pub const TAG_CONN_RESPONSE: u8 = 2;
/// Nonce seeds for both directions.
pub const TAG_NONCE_MESSAGE: u8 = 3;
/// Challenge number (answered with number + 1).
pub const TAG_CHALLENGE_MESSAGE: u8 = 4;
/// Peer accepted our challenge answer.
pub const TAG_CHALLENGE_SUCCESS: u8 = 5;
/// Wi-Fi connect request.
pub const TAG_WIFI_CONNECT_REQUEST: u8 = 6;
/// Wi-Fi connect response.
pub const TAG_WIFI_CONNECT_RESPONSE: u8 = 7;
/// Wi-Fi IP request.
pub const TAG_WIFI_IP_REQUEST: u8 = 8;
/// Wi-Fi IP response.
pub const TAG_WIFI_IP_RESPONSE: u8 = 9;
/// Status request.
pub const TAG_STATUS_REQUEST: u8 = 10;
/// Status response.
pub const TAG_STATUS_RESPONSE: u8 = 11;
/// Wi-Fi scan request.
pub const TAG_WIFI_SCAN_REQUEST: u8 = 12;
/// Wi-Fi scan response.
pub const TAG_WIFI_SCAN_RESPONSE: u8 = 13;
/// OTA update request.
pub const TAG_OTA_UPDATE_REQUEST: u8 = 14;
/// OTA update status.
pub const TAG_OTA_UPDATE_RESPONSE: u8 = 15;
/// Cancel an in-progress pairing.
pub const TAG_CANCEL_PAIRING: u8 = 16;
/// Acknowledgment of a handshake message.
pub const TAG_ACK: u8 = 18;
/// Wi-Fi access point request.
pub const TAG_WIFI_AP_REQUEST: u8 = 19;
/// Wi-Fi access point response.
pub const TAG_WIFI_AP_RESPONSE: u8 = 20;
/// OTA cancel request.
pub const TAG_OTA_CANCEL_REQUEST: u8 = 23;
/// Log request.
pub const TAG_LOG_REQUEST: u8 = 24;
/// Log acknowledgment (transfer id + exit code).
pub const TAG_LOG_RESPONSE: u8 = 25;
/// One chunk of a file transfer.
pub const TAG_FILE_DOWNLOAD: u8 = 26;
/// Wi-Fi forget request.
pub const TAG_WIFI_FORGET_REQUEST: u8 = 27;
/// Wi-Fi forget response.
pub const TAG_WIFI_FORGET_RESPONSE: u8 = 28;
/// Generic failure / nack.
pub const TAG_RESPONSE: u8 = 29;

// =============================================================================
// STATUS CODES
// =============================================================================

/// OTA status: the device is still cancelling.
pub const OTA_STATUS_CANCELLING: u8 = 2;

/// OTA status: the update completed.
pub const OTA_STATUS_COMPLETED: u8 = 3;

/// OTA status values at or above this are failures.
pub const OTA_STATUS_FAILURE_THRESHOLD: u8 = 5;

/// Log acknowledgment exit code meaning the transfer starts.
pub const LOG_EXIT_SUCCESS: u8 = 0;

/// Auth type used when an SSID was never seen in a scan (WPA2-PSK).
pub const WIFI_AUTH_WPA2_PSK: u8 = 6;

/// SSID sentinel that forgets every stored network.
pub const WIFI_FORGET_ALL: &str = "!all";

// =============================================================================
// TIMING
// =============================================================================

/// A first-time pairing is cancelled if no nonce message arrives in time.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default deadline for status queries.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Default Wi-Fi connect timeout sent to the device.
pub const DEFAULT_WIFI_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// NOTICES
// =============================================================================

/// Printed when pairing is cancelled (timeout or peer abort).
pub const PAIRING_FAILED_NOTICE: &str =
    "Pairing failed. Double press robot button and try again. You may need to do 'ble-clear'.";

/// Default prefix for downloaded log artifacts.
pub const DEFAULT_LOG_FILE_PREFIX: &str = "vector-logs";

/// Extension of downloaded log artifacts.
pub const LOG_FILE_EXTENSION: &str = "tar.bz2";
