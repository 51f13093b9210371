//! The per-peer connection object.
//!
//! `Connection<T, S>` owns all mutable protocol state for one peer: the
//! encrypted channel, the handshake state, the pending-request table, the
//! log reassembler and the last OTA status. Frames are fed in one at a time
//! through [`Connection::receive`]; requests return a [`ResponseHandle`]
//! that settles when the matching response arrives.

use std::time::Duration;

use tokio::time::Instant;

use super::handshake::HandshakeState;
use super::progress::ProgressMonitor;
use super::transfer::LogTransfer;
use super::{ConnectionConfig, ConnectionEvents, Operation, PendingRequests, ResponseHandle};
use crate::core::*;
use crate::crypto::{EncryptedChannel, KeyPair, RemoteIdentity};
use crate::message::{
    LogRequest, OtaUpdateResponse, RtsMessage, WifiConnectRequest, WifiForgetRequest,
    WifiScanResult,
};

/// Client side of one RTS connection.
pub struct Connection<T: Transport, S: SessionStore> {
    pub(super) transport: T,
    pub(super) store: S,
    pub(super) config: ConnectionConfig,
    pub(super) channel: EncryptedChannel,
    pub(super) state: HandshakeState,
    pub(super) first_time_pair: bool,
    pub(super) keys_authorized: bool,
    pub(super) local_keys: Option<KeyPair>,
    pub(super) remote: Option<RemoteIdentity>,
    pub(super) handshake_deadline: Option<Instant>,
    pub(super) pending: PendingRequests,
    pub(super) transfer: LogTransfer,
    pub(super) progress: ProgressMonitor,
    pub(super) wifi_scan_results: Vec<WifiScanResult>,
    pub(super) has_progress_bar: bool,
    pub(super) events: ConnectionEvents,
    pub(super) closed: bool,
}

impl<T: Transport, S: SessionStore> Connection<T, S> {
    /// Create a connection waiting for the peer's connection request.
    pub fn new(transport: T, store: S, config: ConnectionConfig) -> Self {
        Self {
            transport,
            store,
            config,
            channel: EncryptedChannel::new(),
            state: HandshakeState::Idle,
            first_time_pair: true,
            keys_authorized: false,
            local_keys: None,
            remote: None,
            handshake_deadline: None,
            pending: PendingRequests::new(),
            transfer: LogTransfer::new(),
            progress: ProgressMonitor::new(),
            wifi_scan_results: Vec::new(),
            has_progress_bar: false,
            events: ConnectionEvents::default(),
            closed: false,
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Whether frames are sealed.
    pub fn is_encrypted(&self) -> bool {
        self.channel.is_encrypted()
    }

    /// Whether the peer confirmed the challenge.
    pub fn keys_authorized(&self) -> bool {
        self.keys_authorized
    }

    /// Whether this connection is a first-time pairing.
    pub fn is_first_time_pair(&self) -> bool {
        self.first_time_pair
    }

    /// The peer identity, once its connection request arrived.
    pub fn remote(&self) -> Option<&RemoteIdentity> {
        self.remote.as_ref()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Observer registrations.
    pub fn events(&mut self) -> &mut ConnectionEvents {
        &mut self.events
    }

    /// The bearer.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The session store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of outstanding requests.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Whether [`cleanup`](Self::cleanup) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Last firmware update status.
    pub fn update_progress(&self) -> Option<OtaUpdateResponse> {
        self.progress.last()
    }

    /// Results of the last successful Wi-Fi scan.
    pub fn wifi_scan_results(&self) -> &[WifiScanResult] {
        &self.wifi_scan_results
    }

    /// Scan for Wi-Fi networks.
    pub fn wifi_scan(&mut self) -> Result<ResponseHandle, ConnectionError> {
        self.request(Operation::WifiScan, RtsMessage::WifiScanRequest)
    }

    /// Join `ssid`.
    ///
    /// Without an explicit `auth_type` the auth type of the remembered scan
    /// result for `ssid` is used, falling back to WPA2-PSK. Without a
    /// `timeout` the configured Wi-Fi timeout is sent.
    pub fn wifi_connect(
        &mut self,
        ssid: &str,
        password: &str,
        auth_type: Option<u8>,
        timeout: Option<Duration>,
    ) -> Result<ResponseHandle, ConnectionError> {
        let ssid_hex = hex::encode(ssid);
        let auth_type = auth_type
            .or_else(|| {
                self.wifi_scan_results
                    .iter()
                    .find(|r| r.ssid_hex.eq_ignore_ascii_case(&ssid_hex))
                    .map(|r| r.auth_type)
            })
            .unwrap_or(WIFI_AUTH_WPA2_PSK);
        let timeout = timeout.unwrap_or(self.config.wifi_timeout).as_secs();

        let request = WifiConnectRequest {
            ssid_hex,
            password: password.to_string(),
            timeout: u8::try_from(timeout).unwrap_or(u8::MAX),
            auth_type,
            hidden: false,
        };
        self.request(Operation::WifiConnect, RtsMessage::WifiConnectRequest(request))
    }

    /// Forget `ssid`, or every network for `"!all"`.
    pub fn wifi_forget(&mut self, ssid: &str) -> Result<ResponseHandle, ConnectionError> {
        let delete_all = ssid == WIFI_FORGET_ALL;
        let request = WifiForgetRequest {
            delete_all,
            ssid_hex: if delete_all {
                String::new()
            } else {
                hex::encode(ssid)
            },
        };
        self.request(Operation::WifiForget, RtsMessage::WifiForgetRequest(request))
    }

    /// Enable or disable access point mode.
    pub fn wifi_access_point(&mut self, enable: bool) -> Result<ResponseHandle, ConnectionError> {
        self.request(
            Operation::WifiAccessPoint,
            RtsMessage::WifiAccessPointRequest { enable },
        )
    }

    /// Query the device's addresses.
    pub fn wifi_ip(&mut self) -> Result<ResponseHandle, ConnectionError> {
        self.request(Operation::WifiIp, RtsMessage::WifiIpRequest)
    }

    /// Query the device status.
    pub fn status(&mut self) -> Result<ResponseHandle, ConnectionError> {
        self.request(Operation::Status, RtsMessage::StatusRequest)
    }

    /// Start a firmware update from `url`.
    ///
    /// Settles on the completed status, is rejected on a failure status.
    pub fn update_start(&mut self, url: &str) -> Result<ResponseHandle, ConnectionError> {
        let handle = self.request(
            Operation::UpdateStart,
            RtsMessage::OtaUpdateRequest {
                url: url.to_string(),
            },
        )?;
        self.start_progress_bar(&format!("Updating robot with OTA from {url}"));
        Ok(handle)
    }

    /// Cancel a running firmware update.
    pub fn update_cancel(&mut self) -> Result<ResponseHandle, ConnectionError> {
        self.request(Operation::UpdateCancel, RtsMessage::OtaCancelRequest)
    }

    /// Download the device logs.
    ///
    /// The reply carries the reassembled archive.
    pub fn logs(&mut self) -> Result<ResponseHandle, ConnectionError> {
        let handle = self.request(Operation::Logs, RtsMessage::LogRequest(LogRequest::default()))?;
        self.start_progress_bar("Downloading logs...");
        Ok(handle)
    }

    /// Tell the device to abandon pairing. No response is expected.
    pub fn cancel_pairing(&mut self) -> Result<(), ConnectionError> {
        self.ensure_open()?;
        tracing::info!("cancelling pairing");
        self.send(&RtsMessage::CancelPairing)
    }

    /// Stop receiving and fail every outstanding request.
    ///
    /// Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.handshake_deadline = None;
        self.transport.unsubscribe();
        self.pending.close_all();
        tracing::debug!("connection cleaned up");
    }

    pub(super) fn ensure_open(&self) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }

    /// Encode, seal if encrypted, and hand to the bearer.
    pub(super) fn send(&mut self, message: &RtsMessage) -> Result<(), ConnectionError> {
        let mut frame = message.encode()?;
        if self.channel.is_encrypted() {
            frame = self.channel.wrap(&frame)?;
        }
        tracing::trace!(tag = message.tag(), len = frame.len(), "sending frame");
        self.transport.send(frame);
        Ok(())
    }

    fn request(
        &mut self,
        operation: Operation,
        message: RtsMessage,
    ) -> Result<ResponseHandle, ConnectionError> {
        self.ensure_open()?;
        if !self.channel.is_encrypted() {
            return Err(ConnectionError::InvalidState("channel not encrypted"));
        }

        let handle = self.pending.register(operation);
        if let Err(err) = self.send(&message) {
            self.pending.discard(handle.id());
            return Err(err);
        }
        Ok(handle)
    }

    fn start_progress_bar(&mut self, notice: &str) {
        self.has_progress_bar = true;
        self.events.print.publish(notice);
        self.events.progress_bar_created.publish(&());
    }
}

impl<T: Transport, S: SessionStore> std::fmt::Debug for Connection<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("encrypted", &self.channel.is_encrypted())
            .field("first_time_pair", &self.first_time_pair)
            .field("keys_authorized", &self.keys_authorized)
            .field("remote", &self.remote)
            .field("pending", &self.pending.len())
            .field("closed", &self.closed)
            .finish()
    }
}
