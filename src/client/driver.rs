//! The task that owns a connection.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::connection::{Connection, ResponseHandle};
use crate::core::{ConnectionError, SessionStore, Transport};
use crate::message::OtaUpdateResponse;

/// Operations that expect a response from the device.
#[derive(Debug)]
pub(crate) enum Request {
    WifiScan,
    WifiConnect {
        ssid: String,
        password: String,
        auth_type: Option<u8>,
        timeout: Option<Duration>,
    },
    WifiForget {
        ssid: String,
    },
    WifiAccessPoint {
        enable: bool,
    },
    WifiIp,
    Status,
    UpdateStart {
        url: String,
    },
    UpdateCancel,
    Logs,
}

#[derive(Debug)]
pub(crate) enum Command {
    EnterPin {
        pin: String,
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    },
    Request {
        request: Request,
        reply: oneshot::Sender<Result<ResponseHandle, ConnectionError>>,
    },
    CancelPairing {
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    },
    UpdateProgress {
        reply: oneshot::Sender<Option<OtaUpdateResponse>>,
    },
    Shutdown,
}

/// Serve frames, commands and the handshake deadline until shut down.
///
/// Frames take priority over commands so that a command sent after a frame
/// sees that frame's effect.
pub(crate) async fn run<T, S>(
    mut connection: Connection<T, S>,
    mut frames: mpsc::Receiver<Vec<u8>>,
    mut commands: mpsc::Receiver<Command>,
) where
    T: Transport,
    S: SessionStore,
{
    tracing::debug!("connection driver started");

    loop {
        let deadline = connection.handshake_deadline();

        tokio::select! {
            biased;

            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                if let Err(err) = connection.receive(&frame) {
                    tracing::warn!(%err, "inbound frame rejected");
                }
            }

            command = commands.recv() => {
                match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => execute(&mut connection, command),
                }
            }

            _ = sleep_until(deadline) => {
                connection.poll_timeout(Instant::now());
            }
        }
    }

    connection.cleanup();
    tracing::debug!("connection driver stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn execute<T: Transport, S: SessionStore>(connection: &mut Connection<T, S>, command: Command) {
    // A dropped reply receiver means the caller gave up.
    match command {
        Command::EnterPin { pin, reply } => {
            let _ = reply.send(connection.enter_pin(&pin));
        }
        Command::Request { request, reply } => {
            let _ = reply.send(issue(connection, request));
        }
        Command::CancelPairing { reply } => {
            let _ = reply.send(connection.cancel_pairing());
        }
        Command::UpdateProgress { reply } => {
            let _ = reply.send(connection.update_progress());
        }
        Command::Shutdown => {}
    }
}

fn issue<T: Transport, S: SessionStore>(
    connection: &mut Connection<T, S>,
    request: Request,
) -> Result<ResponseHandle, ConnectionError> {
    match request {
        Request::WifiScan => connection.wifi_scan(),
        Request::WifiConnect {
            ssid,
            password,
            auth_type,
            timeout,
        } => connection.wifi_connect(&ssid, &password, auth_type, timeout),
        Request::WifiForget { ssid } => connection.wifi_forget(&ssid),
        Request::WifiAccessPoint { enable } => connection.wifi_access_point(enable),
        Request::WifiIp => connection.wifi_ip(),
        Request::Status => connection.status(),
        Request::UpdateStart { url } => connection.update_start(&url),
        Request::UpdateCancel => connection.update_cancel(),
        Request::Logs => connection.logs(),
    }
}
