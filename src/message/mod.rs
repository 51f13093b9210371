//! RTS wire messages.
//!
//! Every frame (after decryption, once the channel is encrypted) is an
//! envelope:
//!
//! ```text
//! +0  ExternalComms tag (1 byte, RTS connection = 0x01)
//! +1  RTS connection version (1 byte, 2..=5 accepted, 2 sent)
//! +2  Message tag (1 byte)
//! +3  Payload (message specific, little-endian)
//! ```
//!
//! A raw 5-byte frame starting with `0x01` is a version handshake from the
//! device and means it abandoned the session; [`decode_frame`] recognises it
//! before attempting envelope decoding.

mod codec;
mod types;

use codec::{Reader, Writer};
use types::Payload;

pub use types::{
    ChallengeMessage, ConnRequest, ConnResponse, ConnType, FileDownload, GenericResponse,
    LogRequest, LogResponse, NonceMessage, OtaUpdateResponse, StatusResponse, WifiAccessPointResponse,
    WifiConnectRequest, WifiConnectResponse, WifiForgetRequest, WifiForgetResponse, WifiIpResponse,
    WifiScanResponse, WifiScanResult,
};

use crate::core::*;

/// A decoded RTS v2 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtsMessage {
    /// Device asks to connect.
    ConnRequest(ConnRequest),
    /// Client answers a connection request.
    ConnResponse(ConnResponse),
    /// Nonce seeds.
    NonceMessage(NonceMessage),
    /// Challenge (device to client) or answer (client to device).
    ChallengeMessage(ChallengeMessage),
    /// Device accepted the challenge answer.
    ChallengeSuccess,
    /// Acknowledges the handshake message with the given tag.
    Ack {
        /// Tag of the acknowledged message.
        acked_tag: u8,
    },
    /// Abandon the pairing.
    CancelPairing,
    /// Wi-Fi scan request.
    WifiScanRequest,
    /// Wi-Fi scan response.
    WifiScanResponse(WifiScanResponse),
    /// Wi-Fi connect request.
    WifiConnectRequest(WifiConnectRequest),
    /// Wi-Fi connect response.
    WifiConnectResponse(WifiConnectResponse),
    /// Wi-Fi forget request.
    WifiForgetRequest(WifiForgetRequest),
    /// Wi-Fi forget response.
    WifiForgetResponse(WifiForgetResponse),
    /// Toggle access point mode.
    WifiAccessPointRequest {
        /// Enable or disable.
        enable: bool,
    },
    /// Access point response.
    WifiAccessPointResponse(WifiAccessPointResponse),
    /// Wi-Fi IP request.
    WifiIpRequest,
    /// Wi-Fi IP response.
    WifiIpResponse(WifiIpResponse),
    /// Status request.
    StatusRequest,
    /// Status response.
    StatusResponse(StatusResponse),
    /// Start a firmware update.
    OtaUpdateRequest {
        /// Firmware URL.
        url: String,
    },
    /// Cancel a firmware update.
    OtaCancelRequest,
    /// Firmware update status.
    OtaUpdateResponse(OtaUpdateResponse),
    /// Request logs.
    LogRequest(LogRequest),
    /// Log transfer acknowledgment.
    LogResponse(LogResponse),
    /// File transfer chunk.
    FileDownload(FileDownload),
    /// Generic failure.
    Response(GenericResponse),
}

impl RtsMessage {
    /// The message tag on the wire.
    pub fn tag(&self) -> u8 {
        match self {
            RtsMessage::ConnRequest(_) => TAG_CONN_REQUEST,
            RtsMessage::ConnResponse(_) => TAG_CONN_RESPONSE,
            RtsMessage::NonceMessage(_) => TAG_NONCE_MESSAGE,
            RtsMessage::ChallengeMessage(_) => TAG_CHALLENGE_MESSAGE,
            RtsMessage::ChallengeSuccess => TAG_CHALLENGE_SUCCESS,
            RtsMessage::Ack { .. } => TAG_ACK,
            RtsMessage::CancelPairing => TAG_CANCEL_PAIRING,
            RtsMessage::WifiScanRequest => TAG_WIFI_SCAN_REQUEST,
            RtsMessage::WifiScanResponse(_) => TAG_WIFI_SCAN_RESPONSE,
            RtsMessage::WifiConnectRequest(_) => TAG_WIFI_CONNECT_REQUEST,
            RtsMessage::WifiConnectResponse(_) => TAG_WIFI_CONNECT_RESPONSE,
            RtsMessage::WifiForgetRequest(_) => TAG_WIFI_FORGET_REQUEST,
            RtsMessage::WifiForgetResponse(_) => TAG_WIFI_FORGET_RESPONSE,
            RtsMessage::WifiAccessPointRequest { .. } => TAG_WIFI_AP_REQUEST,
            RtsMessage::WifiAccessPointResponse(_) => TAG_WIFI_AP_RESPONSE,
            RtsMessage::WifiIpRequest => TAG_WIFI_IP_REQUEST,
            RtsMessage::WifiIpResponse(_) => TAG_WIFI_IP_RESPONSE,
            RtsMessage::StatusRequest => TAG_STATUS_REQUEST,
            RtsMessage::StatusResponse(_) => TAG_STATUS_RESPONSE,
            RtsMessage::OtaUpdateRequest { .. } => TAG_OTA_UPDATE_REQUEST,
            RtsMessage::OtaCancelRequest => TAG_OTA_CANCEL_REQUEST,
            RtsMessage::OtaUpdateResponse(_) => TAG_OTA_UPDATE_RESPONSE,
            RtsMessage::LogRequest(_) => TAG_LOG_REQUEST,
            RtsMessage::LogResponse(_) => TAG_LOG_RESPONSE,
            RtsMessage::FileDownload(_) => TAG_FILE_DOWNLOAD,
            RtsMessage::Response(_) => TAG_RESPONSE,
        }
    }

    /// Encode as a complete v2 envelope.
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        let mut w = Writer::new();
        w.u8(EXTERNAL_COMMS_RTS_CONNECTION);
        w.u8(RTS_CONNECTION_V2);
        w.u8(self.tag());

        match self {
            RtsMessage::ConnRequest(m) => m.encode(&mut w)?,
            RtsMessage::ConnResponse(m) => m.encode(&mut w)?,
            RtsMessage::NonceMessage(m) => m.encode(&mut w)?,
            RtsMessage::ChallengeMessage(m) => m.encode(&mut w)?,
            RtsMessage::Ack { acked_tag } => w.u8(*acked_tag),
            RtsMessage::WifiScanResponse(m) => m.encode(&mut w)?,
            RtsMessage::WifiConnectRequest(m) => m.encode(&mut w)?,
            RtsMessage::WifiConnectResponse(m) => m.encode(&mut w)?,
            RtsMessage::WifiForgetRequest(m) => m.encode(&mut w)?,
            RtsMessage::WifiForgetResponse(m) => m.encode(&mut w)?,
            RtsMessage::WifiAccessPointRequest { enable } => w.bool(*enable),
            RtsMessage::WifiAccessPointResponse(m) => m.encode(&mut w)?,
            RtsMessage::WifiIpResponse(m) => m.encode(&mut w)?,
            RtsMessage::StatusResponse(m) => m.encode(&mut w)?,
            RtsMessage::OtaUpdateRequest { url } => w.str("url", url)?,
            RtsMessage::OtaUpdateResponse(m) => m.encode(&mut w)?,
            RtsMessage::LogRequest(m) => m.encode(&mut w)?,
            RtsMessage::LogResponse(m) => m.encode(&mut w)?,
            RtsMessage::FileDownload(m) => m.encode(&mut w)?,
            RtsMessage::Response(m) => m.encode(&mut w)?,
            RtsMessage::ChallengeSuccess
            | RtsMessage::CancelPairing
            | RtsMessage::WifiScanRequest
            | RtsMessage::WifiIpRequest
            | RtsMessage::StatusRequest
            | RtsMessage::OtaCancelRequest => {}
        }

        let bytes = w.into_bytes();
        if bytes.len() == ABORT_FRAME_SIZE {
            return Err(MessageError::AbortLength(bytes.len()));
        }
        Ok(bytes)
    }
}

/// What an inbound frame turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The raw handshake frame; the device abandoned the session.
    Abort,
    /// A message this client understands.
    Message(RtsMessage),
    /// Unrecognised envelope, version or tag. Dropped by the dispatcher.
    Unknown {
        /// Outer tag.
        comms_tag: u8,
        /// RTS version byte (0 if absent).
        version: u8,
        /// Message tag (0 if absent).
        tag: u8,
    },
}

/// Whether `data` is the raw 5-byte handshake frame.
pub fn is_abort_frame(data: &[u8]) -> bool {
    data.len() == ABORT_FRAME_SIZE && data[0] == ABORT_FRAME_TAG
}

/// Decode one plaintext frame.
pub fn decode_frame(data: &[u8]) -> Result<Decoded, MessageError> {
    if is_abort_frame(data) {
        return Ok(Decoded::Abort);
    }

    let mut r = Reader::new(data);
    let comms_tag = r.u8()?;
    if comms_tag != EXTERNAL_COMMS_RTS_CONNECTION {
        return Ok(Decoded::Unknown {
            comms_tag,
            version: 0,
            tag: 0,
        });
    }

    let version = r.u8()?;
    if !(RTS_CONNECTION_V2..=RTS_CONNECTION_MAX).contains(&version) {
        return Ok(Decoded::Unknown {
            comms_tag,
            version,
            tag: 0,
        });
    }

    let tag = r.u8()?;
    let msg = match tag {
        TAG_CONN_REQUEST => RtsMessage::ConnRequest(ConnRequest::decode(&mut r)?),
        TAG_CONN_RESPONSE => RtsMessage::ConnResponse(ConnResponse::decode(&mut r)?),
        TAG_NONCE_MESSAGE => RtsMessage::NonceMessage(NonceMessage::decode(&mut r)?),
        TAG_CHALLENGE_MESSAGE => RtsMessage::ChallengeMessage(ChallengeMessage::decode(&mut r)?),
        TAG_CHALLENGE_SUCCESS => RtsMessage::ChallengeSuccess,
        TAG_ACK => RtsMessage::Ack { acked_tag: r.u8()? },
        TAG_CANCEL_PAIRING => RtsMessage::CancelPairing,
        TAG_WIFI_SCAN_REQUEST => RtsMessage::WifiScanRequest,
        TAG_WIFI_SCAN_RESPONSE => RtsMessage::WifiScanResponse(WifiScanResponse::decode(&mut r)?),
        TAG_WIFI_CONNECT_REQUEST => {
            RtsMessage::WifiConnectRequest(WifiConnectRequest::decode(&mut r)?)
        }
        TAG_WIFI_CONNECT_RESPONSE => {
            RtsMessage::WifiConnectResponse(WifiConnectResponse::decode(&mut r)?)
        }
        TAG_WIFI_FORGET_REQUEST => RtsMessage::WifiForgetRequest(WifiForgetRequest::decode(&mut r)?),
        TAG_WIFI_FORGET_RESPONSE => {
            RtsMessage::WifiForgetResponse(WifiForgetResponse::decode(&mut r)?)
        }
        TAG_WIFI_AP_REQUEST => RtsMessage::WifiAccessPointRequest { enable: r.bool()? },
        TAG_WIFI_AP_RESPONSE => {
            RtsMessage::WifiAccessPointResponse(WifiAccessPointResponse::decode(&mut r)?)
        }
        TAG_WIFI_IP_REQUEST => RtsMessage::WifiIpRequest,
        TAG_WIFI_IP_RESPONSE => RtsMessage::WifiIpResponse(WifiIpResponse::decode(&mut r)?),
        TAG_STATUS_REQUEST => RtsMessage::StatusRequest,
        TAG_STATUS_RESPONSE => RtsMessage::StatusResponse(StatusResponse::decode(&mut r)?),
        TAG_OTA_UPDATE_REQUEST => RtsMessage::OtaUpdateRequest { url: r.str("url")? },
        TAG_OTA_CANCEL_REQUEST => RtsMessage::OtaCancelRequest,
        TAG_OTA_UPDATE_RESPONSE => {
            RtsMessage::OtaUpdateResponse(OtaUpdateResponse::decode(&mut r)?)
        }
        TAG_LOG_REQUEST => RtsMessage::LogRequest(LogRequest::decode(&mut r)?),
        TAG_LOG_RESPONSE => RtsMessage::LogResponse(LogResponse::decode(&mut r)?),
        TAG_FILE_DOWNLOAD => RtsMessage::FileDownload(FileDownload::decode(&mut r)?),
        TAG_RESPONSE => RtsMessage::Response(GenericResponse::decode(&mut r)?),
        _ => {
            return Ok(Decoded::Unknown {
                comms_tag,
                version,
                tag,
            });
        }
    };

    Ok(Decoded::Message(msg))
}
