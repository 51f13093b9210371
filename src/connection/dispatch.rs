//! Inbound frame processing.

use chrono::Utc;

use super::progress::{UpdateOutcome, cancel_settled, classify_start};
use super::transfer::{ChunkOutcome, artifact_name};
use super::{Connection, LogArtifact, Operation, Reply};
use crate::core::*;
use crate::message::{
    Decoded, FileDownload, LogResponse, OtaUpdateResponse, RtsMessage, decode_frame, is_abort_frame,
};

impl<T: Transport, S: SessionStore> Connection<T, S> {
    /// Process one inbound frame from the bearer.
    ///
    /// Errors are reported per frame and never close the connection. A
    /// frame that fails to decrypt leaves the decrypt counter untouched and
    /// forgets the stored session for the peer. The raw handshake frame is
    /// never encrypted and aborts the session in any state.
    pub fn receive(&mut self, frame: &[u8]) -> Result<(), ConnectionError> {
        self.ensure_open()?;

        if self.channel.is_encrypted() && is_abort_frame(frame) {
            tracing::info!("device sent a raw handshake frame, aborting");
            self.cancel_connection();
            return Ok(());
        }

        let opened;
        let plaintext = if self.channel.is_encrypted() {
            opened = match self.channel.unwrap(frame) {
                Ok(plaintext) => plaintext,
                Err(err) => {
                    self.forget_session();
                    return Err(err.into());
                }
            };
            opened.as_slice()
        } else {
            frame
        };

        let decoded = match decode_frame(plaintext) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(%err, len = plaintext.len(), "dropping malformed frame");
                return Err(err.into());
            }
        };

        match decoded {
            Decoded::Abort => {
                tracing::info!("device sent a handshake frame, aborting");
                self.cancel_connection();
                Ok(())
            }
            Decoded::Unknown {
                comms_tag,
                version,
                tag,
            } => {
                tracing::debug!(comms_tag, version, tag, "dropping unknown frame");
                Ok(())
            }
            Decoded::Message(message) => self.dispatch(message),
        }
    }

    fn dispatch(&mut self, message: RtsMessage) -> Result<(), ConnectionError> {
        match message {
            RtsMessage::ConnRequest(request) => self.on_conn_request(request)?,
            RtsMessage::NonceMessage(nonce) => self.on_nonce(nonce)?,
            RtsMessage::ChallengeMessage(challenge) => self.on_challenge(challenge)?,
            RtsMessage::ChallengeSuccess => self.on_challenge_success()?,

            RtsMessage::WifiScanResponse(ref response) => {
                self.wifi_scan_results = response.results.clone();
                self.resolve(Operation::WifiScan, message);
            }
            RtsMessage::WifiConnectResponse(_) => self.resolve(Operation::WifiConnect, message),
            RtsMessage::WifiForgetResponse(_) => self.resolve(Operation::WifiForget, message),
            RtsMessage::WifiAccessPointResponse(_) => {
                self.resolve(Operation::WifiAccessPoint, message)
            }
            RtsMessage::WifiIpResponse(_) => self.resolve(Operation::WifiIp, message),
            RtsMessage::StatusResponse(_) => self.resolve(Operation::Status, message),

            RtsMessage::OtaUpdateResponse(status) => self.on_update_status(status),
            RtsMessage::LogResponse(ack) => self.on_log_response(ack),
            RtsMessage::FileDownload(chunk) => self.on_file_chunk(chunk),
            RtsMessage::Response(_) => self.on_nack(message),

            other => tracing::debug!(tag = other.tag(), "ignoring unexpected message"),
        }
        Ok(())
    }

    fn resolve(&mut self, operation: Operation, message: RtsMessage) {
        self.settle(operation, Ok(Reply::message(message)));
    }

    fn reject(&mut self, operation: Operation, message: RtsMessage) {
        self.settle(operation, Err(RequestError::Rejected(Box::new(message))));
    }

    fn settle(&mut self, operation: Operation, result: Result<Reply, RequestError>) {
        if self.pending.settle_next(operation, result) {
            self.close_progress_bar(operation);
        }
    }

    fn close_progress_bar(&mut self, operation: Operation) {
        if matches!(operation, Operation::UpdateStart | Operation::Logs) {
            self.has_progress_bar = false;
        }
    }

    /// A nack rejects whichever request was issued last.
    fn on_nack(&mut self, message: RtsMessage) {
        let Some((id, operation)) = self.pending.awaiting() else {
            tracing::debug!("nack with nothing pending");
            return;
        };
        tracing::warn!(%operation, "request rejected by device");
        self.pending
            .settle(id, Err(RequestError::Rejected(Box::new(message))));
        self.close_progress_bar(operation);
    }

    fn on_update_status(&mut self, status: OtaUpdateResponse) {
        self.progress.record(status);
        self.events.update_progress.publish(&status);
        if self.has_progress_bar {
            self.events
                .progress_bar_updated
                .publish(&(status.current, status.expected));
        }

        let message = RtsMessage::OtaUpdateResponse(status);
        if self.pending.is_pending(Operation::UpdateCancel) {
            if cancel_settled(status.status) {
                self.resolve(Operation::UpdateCancel, message);
            }
        } else if self.pending.is_pending(Operation::UpdateStart) {
            match classify_start(status.status) {
                UpdateOutcome::Completed => self.resolve(Operation::UpdateStart, message),
                UpdateOutcome::Failed => {
                    tracing::warn!(status = status.status, "firmware update failed");
                    self.reject(Operation::UpdateStart, message);
                }
                UpdateOutcome::InProgress => {}
            }
        }
    }

    fn on_log_response(&mut self, ack: LogResponse) {
        if ack.exit_code == LOG_EXIT_SUCCESS {
            tracing::debug!(file_id = ack.file_id, "log transfer started");
            self.transfer.start(ack.file_id);
        } else {
            tracing::warn!(exit_code = ack.exit_code, "device refused log transfer");
            self.reject(Operation::Logs, RtsMessage::LogResponse(ack));
        }
    }

    fn on_file_chunk(&mut self, chunk: FileDownload) {
        let (index, total, bytes) = match self.transfer.accept(&chunk) {
            ChunkOutcome::Ignored => return,
            ChunkOutcome::Progress { index, total } => (index, total, None),
            ChunkOutcome::Complete {
                index,
                total,
                bytes,
            } => (index, total, Some(bytes)),
        };

        self.events.log_progress.publish(&chunk);
        if self.has_progress_bar {
            self.events
                .progress_bar_updated
                .publish(&(u64::from(index), u64::from(total)));
        }

        let Some(bytes) = bytes else {
            return;
        };
        let artifact = LogArtifact {
            file_name: artifact_name(&self.config.log_file_prefix, Utc::now()),
            bytes,
        };
        tracing::info!(file = %artifact.file_name, len = artifact.bytes.len(), "logs downloaded");
        self.events.logs_downloaded.publish(&artifact);

        let reply = Reply {
            message: RtsMessage::FileDownload(chunk),
            artifact: Some(artifact),
        };
        self.settle(Operation::Logs, Ok(reply));
    }

    /// Drop every trace of the peer's session after a failed decryption.
    fn forget_session(&mut self) {
        let Some(peer) = self.remote else {
            tracing::warn!("decryption failed before the peer was known");
            return;
        };
        tracing::warn!(%peer, "decryption failed, forgetting session");

        self.store.delete_session(&peer);
        if let Err(err) = self.store.save() {
            tracing::warn!(%err, "failed to save session store");
        }
        self.transport.sessions().remove(&peer);
    }
}
