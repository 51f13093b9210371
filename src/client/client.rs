//! High-level async RTS client.
//!
//! [`RtsClient`] is a cloneable handle to a driver task that owns the
//! [`Connection`]. Inbound bearer frames and commands reach the task over
//! `mpsc` channels; each command answers over a `oneshot`.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::driver::{self, Command, Request};
use crate::connection::{Connection, LogArtifact, ResponseHandle};
use crate::core::{ConnectionError, RequestError, SessionStore, Transport};
use crate::message::{
    OtaUpdateResponse, RtsMessage, StatusResponse, WifiAccessPointResponse, WifiConnectResponse,
    WifiForgetResponse, WifiIpResponse, WifiScanResponse,
};

/// Errors that can occur in the RTS client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection refused the command.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The device rejected the request or the connection closed first.
    #[error("request failed: {0}")]
    Request(#[from] RequestError),

    /// The driver task has stopped.
    #[error("client disconnected")]
    Disconnected,

    /// The request settled with a message of the wrong kind.
    #[error("unexpected response with tag {0}")]
    UnexpectedResponse(u8),
}

/// Handle to a running connection.
#[derive(Debug, Clone)]
pub struct RtsClient {
    frames: mpsc::Sender<Vec<u8>>,
    commands: mpsc::Sender<Command>,
    status_timeout: Duration,
}

impl RtsClient {
    /// Move `connection` into a driver task.
    ///
    /// Observers must be registered on the connection before it is spawned.
    pub fn spawn<T, S>(connection: Connection<T, S>) -> (Self, JoinHandle<()>)
    where
        T: Transport + Send + 'static,
        S: SessionStore + Send + 'static,
    {
        // The config field is public, so zero can bypass the builder.
        let capacity = connection.config().channel_capacity.max(1);
        let status_timeout = connection.config().status_timeout;
        let (frames_tx, frames_rx) = mpsc::channel(capacity);
        let (commands_tx, commands_rx) = mpsc::channel(capacity);

        let task = tokio::spawn(driver::run(connection, frames_rx, commands_rx));
        let client = Self {
            frames: frames_tx,
            commands: commands_tx,
            status_timeout,
        };
        (client, task)
    }

    /// Hand one frame received from the bearer to the connection.
    pub async fn deliver(&self, frame: Vec<u8>) -> Result<(), ClientError> {
        self.frames
            .send(frame)
            .await
            .map_err(|_| ClientError::Disconnected)
    }

    /// Supply the PIN shown by the device.
    pub async fn enter_pin(&self, pin: impl Into<String>) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(Command::EnterPin {
            pin: pin.into(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| ClientError::Disconnected)??)
    }

    /// Scan for Wi-Fi networks.
    pub async fn wifi_scan(&self) -> Result<WifiScanResponse, ClientError> {
        match self.request(Request::WifiScan).await?.await?.message {
            RtsMessage::WifiScanResponse(response) => Ok(response),
            other => Err(ClientError::UnexpectedResponse(other.tag())),
        }
    }

    /// Join a Wi-Fi network.
    pub async fn wifi_connect(
        &self,
        ssid: impl Into<String>,
        password: impl Into<String>,
        auth_type: Option<u8>,
        timeout: Option<Duration>,
    ) -> Result<WifiConnectResponse, ClientError> {
        let request = Request::WifiConnect {
            ssid: ssid.into(),
            password: password.into(),
            auth_type,
            timeout,
        };
        match self.request(request).await?.await?.message {
            RtsMessage::WifiConnectResponse(response) => Ok(response),
            other => Err(ClientError::UnexpectedResponse(other.tag())),
        }
    }

    /// Forget a network, or all of them for `"!all"`.
    pub async fn wifi_forget(&self, ssid: impl Into<String>) -> Result<WifiForgetResponse, ClientError> {
        let request = Request::WifiForget { ssid: ssid.into() };
        match self.request(request).await?.await?.message {
            RtsMessage::WifiForgetResponse(response) => Ok(response),
            other => Err(ClientError::UnexpectedResponse(other.tag())),
        }
    }

    /// Enable or disable access point mode.
    pub async fn wifi_access_point(&self, enable: bool) -> Result<WifiAccessPointResponse, ClientError> {
        match self.request(Request::WifiAccessPoint { enable }).await?.await?.message {
            RtsMessage::WifiAccessPointResponse(response) => Ok(response),
            other => Err(ClientError::UnexpectedResponse(other.tag())),
        }
    }

    /// Query the device's addresses.
    pub async fn wifi_ip(&self) -> Result<WifiIpResponse, ClientError> {
        match self.request(Request::WifiIp).await?.await?.message {
            RtsMessage::WifiIpResponse(response) => Ok(response),
            other => Err(ClientError::UnexpectedResponse(other.tag())),
        }
    }

    /// Query the device status; `None` if it did not answer in time.
    pub async fn status(&self) -> Result<Option<StatusResponse>, ClientError> {
        let handle = self.request(Request::Status).await?;
        let Some(reply) = handle.with_deadline(self.status_timeout).await? else {
            tracing::debug!("status request timed out");
            return Ok(None);
        };
        match reply.message {
            RtsMessage::StatusResponse(response) => Ok(Some(response)),
            other => Err(ClientError::UnexpectedResponse(other.tag())),
        }
    }

    /// Run a firmware update to completion.
    pub async fn update_start(&self, url: impl Into<String>) -> Result<OtaUpdateResponse, ClientError> {
        let request = Request::UpdateStart { url: url.into() };
        match self.request(request).await?.await?.message {
            RtsMessage::OtaUpdateResponse(response) => Ok(response),
            other => Err(ClientError::UnexpectedResponse(other.tag())),
        }
    }

    /// Cancel a running firmware update.
    pub async fn update_cancel(&self) -> Result<OtaUpdateResponse, ClientError> {
        match self.request(Request::UpdateCancel).await?.await?.message {
            RtsMessage::OtaUpdateResponse(response) => Ok(response),
            other => Err(ClientError::UnexpectedResponse(other.tag())),
        }
    }

    /// Download the device logs.
    pub async fn logs(&self) -> Result<LogArtifact, ClientError> {
        let reply = self.request(Request::Logs).await?.await?;
        reply
            .artifact
            .ok_or(ClientError::UnexpectedResponse(reply.message.tag()))
    }

    /// Last firmware update status seen.
    pub async fn ota_progress(&self) -> Result<Option<OtaUpdateResponse>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(Command::UpdateProgress { reply }).await?;
        rx.await.map_err(|_| ClientError::Disconnected)
    }

    /// Tell the device to abandon pairing.
    pub async fn cancel_pairing(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(Command::CancelPairing { reply }).await?;
        Ok(rx.await.map_err(|_| ClientError::Disconnected)??)
    }

    /// Stop the driver task. Outstanding requests fail with `ConnectionClosed`.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.call(Command::Shutdown).await
    }

    async fn request(&self, request: Request) -> Result<ResponseHandle, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(Command::Request { request, reply }).await?;
        Ok(rx.await.map_err(|_| ClientError::Disconnected)??)
    }

    async fn call(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::*;
    use crate::connection::{ConnectionConfig, ConnectionConfigBuilder};
    use crate::core::PAIRING_FAILED_NOTICE;
    use crate::message::{FileDownload, LogResponse};

    async fn next_frame(log: &TransportLog) -> Vec<u8> {
        loop {
            if log.sent_count() > 0 {
                return log.next_sent();
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_pairing_through_client() {
        let (mut conn, log) = connection();
        let recorder = EventRecorder::attach(conn.events());
        let mut device = Device::new();
        let (client, task) = RtsClient::spawn(conn);

        client.deliver(device.conn_request()).await.unwrap();
        let RtsMessage::ConnResponse(response) = device.read(&next_frame(&log).await) else {
            panic!("expected a connection response");
        };
        client.deliver(device.nonce_message()).await.unwrap();
        client.enter_pin(PIN).await.unwrap();
        device.read(&next_frame(&log).await);
        device.pair(&response.public_key, PIN);

        client
            .deliver(device.write(&RtsMessage::ChallengeSuccess))
            .await
            .unwrap();
        client.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(recorder.ready_for_pin(), 1);
        assert_eq!(recorder.authenticated(), 1);
        assert_eq!(log.unsubscribes(), 1);
    }

    #[tokio::test]
    async fn test_logs_through_client() {
        let (conn, log, mut device) = paired_connection();
        let (client, task) = RtsClient::spawn(conn);

        let download = tokio::spawn({
            let client = client.clone();
            async move { client.logs().await }
        });
        assert!(matches!(
            device.read(&next_frame(&log).await),
            RtsMessage::LogRequest(_)
        ));

        let ack = RtsMessage::LogResponse(LogResponse {
            exit_code: 0,
            file_id: 5,
        });
        client.deliver(device.write(&ack)).await.unwrap();
        for (index, bytes) in [(1, b"ab"), (2, b"cd")] {
            let chunk = RtsMessage::FileDownload(FileDownload {
                status: 0,
                file_id: 5,
                packet_number: index,
                packet_total: 2,
                chunk: bytes.to_vec(),
            });
            client.deliver(device.write(&chunk)).await.unwrap();
        }

        let artifact = download.await.unwrap().unwrap();
        assert_eq!(artifact.bytes, b"abcd".to_vec());

        client.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_times_out() {
        let (conn, _log, _device) = paired_connection();
        let (client, _task) = RtsClient::spawn(conn);

        assert!(client.status().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_enforces_handshake_deadline() {
        let (transport, log) = MockTransport::new();
        let config = ConnectionConfigBuilder::new()
            .handshake_timeout(Duration::from_secs(3))
            .build();
        let mut conn = Connection::new(transport, RecordingStore::new(), config);
        let recorder = EventRecorder::attach(conn.events());
        let device = Device::new();
        let (client, task) = RtsClient::spawn(conn);

        client.deliver(device.conn_request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(log.disconnects(), 1);
        assert_eq!(recorder.prints(), vec![PAIRING_FAILED_NOTICE.to_string()]);
        assert!(matches!(
            client.enter_pin(PIN).await,
            Err(ClientError::Connection(ConnectionError::InvalidState(_)))
        ));

        drop(client);
        task.await.unwrap();
        assert_eq!(log.unsubscribes(), 1);
    }

    #[tokio::test]
    async fn test_zero_channel_capacity() {
        let (transport, log) = MockTransport::new();
        let config = ConnectionConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        let conn = Connection::new(transport, RecordingStore::new(), config);
        let mut device = Device::new();
        let (client, task) = RtsClient::spawn(conn);

        client.deliver(device.conn_request()).await.unwrap();
        assert!(matches!(
            device.read(&next_frame(&log).await),
            RtsMessage::ConnResponse(_)
        ));

        client.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_fails_outstanding_requests() {
        let (conn, log, _device) = paired_connection();
        let (client, task) = RtsClient::spawn(conn);

        let scan = tokio::spawn({
            let client = client.clone();
            async move { client.wifi_scan().await }
        });
        next_frame(&log).await;

        client.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(matches!(
            scan.await.unwrap(),
            Err(ClientError::Request(RequestError::ConnectionClosed))
        ));
        assert!(matches!(client.wifi_ip().await, Err(ClientError::Disconnected)));
    }
}
