//! Payload types carried inside the RTS envelope.

use super::codec::{Reader, Writer};
use crate::core::{AEAD_NONCE_SIZE, MessageError, PUBLIC_KEY_SIZE};

/// Encoding of a single payload body (everything after the message tag).
pub(crate) trait Payload: Sized {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError>;
    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError>;
}

/// How the client answers a connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnType {
    /// No stored session; a PIN exchange follows.
    FirstTimePair,
    /// Resuming with cached keys.
    Reconnection,
}

impl ConnType {
    fn as_byte(self) -> u8 {
        match self {
            ConnType::FirstTimePair => 0,
            ConnType::Reconnection => 1,
        }
    }

    fn from_byte(b: u8) -> Self {
        if b == 1 {
            ConnType::Reconnection
        } else {
            ConnType::FirstTimePair
        }
    }
}

/// Device asks to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnRequest {
    /// Device long-term public key.
    pub public_key: [u8; PUBLIC_KEY_SIZE],
}

impl Payload for ConnRequest {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.fixed(&self.public_key);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            public_key: r.fixed()?,
        })
    }
}

/// Our answer to [`ConnRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnResponse {
    /// Pairing or resumption.
    pub conn_type: ConnType,
    /// Our public key.
    pub public_key: [u8; PUBLIC_KEY_SIZE],
}

impl Payload for ConnResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.u8(self.conn_type.as_byte());
        w.fixed(&self.public_key);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            conn_type: ConnType::from_byte(r.u8()?),
            public_key: r.fixed()?,
        })
    }
}

/// Nonce seeds for both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceMessage {
    /// Seed for frames we send to the device.
    pub to_device_nonce: [u8; AEAD_NONCE_SIZE],
    /// Seed for frames the device sends to us.
    pub to_client_nonce: [u8; AEAD_NONCE_SIZE],
}

impl Payload for NonceMessage {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.fixed(&self.to_device_nonce);
        w.fixed(&self.to_client_nonce);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            to_device_nonce: r.fixed()?,
            to_client_nonce: r.fixed()?,
        })
    }
}

/// Liveness challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeMessage {
    /// Challenge number; answered with `number + 1`.
    pub number: u32,
}

impl Payload for ChallengeMessage {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.u32(self.number);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self { number: r.u32()? })
    }
}

/// One network from a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiScanResult {
    /// Auth type reported by the device.
    pub auth_type: u8,
    /// Signal strength (bars).
    pub signal_strength: u8,
    /// Hex-encoded SSID.
    pub ssid_hex: String,
    /// Hidden network.
    pub hidden: bool,
}

/// Networks visible to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiScanResponse {
    /// Device status code.
    pub status_code: u8,
    /// Visible networks.
    pub results: Vec<WifiScanResult>,
}

impl Payload for WifiScanResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.u8(self.status_code);
        w.count("scan_results", self.results.len())?;
        for result in &self.results {
            w.u8(result.auth_type);
            w.u8(result.signal_strength);
            w.str("ssid_hex", &result.ssid_hex)?;
            w.bool(result.hidden);
        }
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        let status_code = r.u8()?;
        let n = r.count()?;
        let mut results = Vec::with_capacity(n);
        for _ in 0..n {
            results.push(WifiScanResult {
                auth_type: r.u8()?,
                signal_strength: r.u8()?,
                ssid_hex: r.str("ssid_hex")?,
                hidden: r.bool()?,
            });
        }
        Ok(Self {
            status_code,
            results,
        })
    }
}

/// Join a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiConnectRequest {
    /// Hex-encoded SSID.
    pub ssid_hex: String,
    /// Network password.
    pub password: String,
    /// Seconds the device may spend connecting.
    pub timeout: u8,
    /// Auth type.
    pub auth_type: u8,
    /// Hidden network.
    pub hidden: bool,
}

impl Payload for WifiConnectRequest {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.str("ssid_hex", &self.ssid_hex)?;
        w.str("password", &self.password)?;
        w.u8(self.timeout);
        w.u8(self.auth_type);
        w.bool(self.hidden);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            ssid_hex: r.str("ssid_hex")?,
            password: r.str("password")?,
            timeout: r.u8()?,
            auth_type: r.u8()?,
            hidden: r.bool()?,
        })
    }
}

/// Result of a connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiConnectResponse {
    /// Hex-encoded SSID.
    pub ssid_hex: String,
    /// Wi-Fi state after the attempt.
    pub wifi_state: u8,
    /// Connect result code.
    pub connect_result: u8,
}

impl Payload for WifiConnectResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.str("ssid_hex", &self.ssid_hex)?;
        w.u8(self.wifi_state);
        w.u8(self.connect_result);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            ssid_hex: r.str("ssid_hex")?,
            wifi_state: r.u8()?,
            connect_result: r.u8()?,
        })
    }
}

/// Forget one network, or all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiForgetRequest {
    /// Forget every stored network.
    pub delete_all: bool,
    /// Hex-encoded SSID (empty with `delete_all`).
    pub ssid_hex: String,
}

impl Payload for WifiForgetRequest {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.bool(self.delete_all);
        w.str("ssid_hex", &self.ssid_hex)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            delete_all: r.bool()?,
            ssid_hex: r.str("ssid_hex")?,
        })
    }
}

/// Result of a forget request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiForgetResponse {
    /// Whether anything was removed.
    pub did_delete: bool,
    /// Hex-encoded SSID.
    pub ssid_hex: String,
}

impl Payload for WifiForgetResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.bool(self.did_delete);
        w.str("ssid_hex", &self.ssid_hex)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            did_delete: r.bool()?,
            ssid_hex: r.str("ssid_hex")?,
        })
    }
}

/// Result of toggling access point mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiAccessPointResponse {
    /// Access point now enabled.
    pub enabled: bool,
    /// Access point SSID.
    pub ssid: String,
    /// Access point password.
    pub password: String,
}

impl Payload for WifiAccessPointResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.bool(self.enabled);
        w.str("ssid", &self.ssid)?;
        w.str("password", &self.password)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            enabled: r.bool()?,
            ssid: r.str("ssid")?,
            password: r.str("password")?,
        })
    }
}

/// Device addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiIpResponse {
    /// `ipv4` is meaningful.
    pub has_ipv4: bool,
    /// `ipv6` is meaningful.
    pub has_ipv6: bool,
    /// IPv4 address.
    pub ipv4: [u8; 4],
    /// IPv6 address.
    pub ipv6: [u8; 16],
}

impl WifiIpResponse {
    /// The addresses the device reported as present.
    pub fn addresses(&self) -> Vec<std::net::IpAddr> {
        let mut out = Vec::new();
        if self.has_ipv4 {
            out.push(std::net::Ipv4Addr::from(self.ipv4).into());
        }
        if self.has_ipv6 {
            out.push(std::net::Ipv6Addr::from(self.ipv6).into());
        }
        out
    }
}

impl Payload for WifiIpResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.bool(self.has_ipv4);
        w.bool(self.has_ipv6);
        w.fixed(&self.ipv4);
        w.fixed(&self.ipv6);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            has_ipv4: r.bool()?,
            has_ipv6: r.bool()?,
            ipv4: r.fixed()?,
            ipv6: r.fixed()?,
        })
    }
}

/// Device status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// Hex-encoded SSID of the current network.
    pub ssid_hex: String,
    /// Wi-Fi state.
    pub wifi_state: u8,
    /// Access point mode on.
    pub access_point: bool,
    /// BLE state.
    pub ble_state: u8,
    /// Battery state.
    pub battery_state: u8,
    /// Firmware version.
    pub version: String,
    /// An OTA is running.
    pub ota_in_progress: bool,
    /// Device has an owner account.
    pub has_owner: bool,
}

impl Payload for StatusResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.str("ssid_hex", &self.ssid_hex)?;
        w.u8(self.wifi_state);
        w.bool(self.access_point);
        w.u8(self.ble_state);
        w.u8(self.battery_state);
        w.str("version", &self.version)?;
        w.bool(self.ota_in_progress);
        w.bool(self.has_owner);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            ssid_hex: r.str("ssid_hex")?,
            wifi_state: r.u8()?,
            access_point: r.bool()?,
            ble_state: r.u8()?,
            battery_state: r.u8()?,
            version: r.str("version")?,
            ota_in_progress: r.bool()?,
            has_owner: r.bool()?,
        })
    }
}

/// Firmware update status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtaUpdateResponse {
    /// Status code (see `OTA_STATUS_*`).
    pub status: u8,
    /// Bytes processed so far.
    pub current: u64,
    /// Bytes expected in total.
    pub expected: u64,
}

impl Payload for OtaUpdateResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.u8(self.status);
        w.u64(self.current);
        w.u64(self.expected);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            status: r.u8()?,
            current: r.u64()?,
            expected: r.u64()?,
        })
    }
}

/// Ask the device for its logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRequest {
    /// Log mode.
    pub mode: u8,
    /// Log name filters (empty for everything).
    pub filter: Vec<String>,
}

impl Payload for LogRequest {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.u8(self.mode);
        w.count("filter", self.filter.len())?;
        for name in &self.filter {
            w.str("filter", name)?;
        }
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        let mode = r.u8()?;
        let n = r.count()?;
        let mut filter = Vec::with_capacity(n);
        for _ in 0..n {
            filter.push(r.str("filter")?);
        }
        Ok(Self { mode, filter })
    }
}

/// Acknowledgment of a log request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogResponse {
    /// Zero when the transfer starts.
    pub exit_code: u8,
    /// Transfer id the chunks will carry.
    pub file_id: u32,
}

impl Payload for LogResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.u8(self.exit_code);
        w.u32(self.file_id);
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            exit_code: r.u8()?,
            file_id: r.u32()?,
        })
    }
}

/// One chunk of a file transfer. Chunks are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDownload {
    /// Device status code.
    pub status: u8,
    /// Transfer id.
    pub file_id: u32,
    /// Index of this chunk.
    pub packet_number: u32,
    /// Total chunks in the transfer.
    pub packet_total: u32,
    /// Chunk bytes.
    pub chunk: Vec<u8>,
}

impl Payload for FileDownload {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.u8(self.status);
        w.u32(self.file_id);
        w.u32(self.packet_number);
        w.u32(self.packet_total);
        w.blob("chunk", &self.chunk)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            status: r.u8()?,
            file_id: r.u32()?,
            packet_number: r.u32()?,
            packet_total: r.u32()?,
            chunk: r.blob()?,
        })
    }
}

/// Generic failure response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericResponse {
    /// Failure code.
    pub code: u8,
    /// Human-readable reason.
    pub text: String,
}

impl Payload for GenericResponse {
    fn encode(&self, w: &mut Writer) -> Result<(), MessageError> {
        w.u8(self.code);
        w.str("text", &self.text)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            code: r.u8()?,
            text: r.str("text")?,
        })
    }
}
