//! Connection handshake.
//!
//! ```text
//! Idle --ConnRequest--> AwaitingNonce
//!   first-time pair:  --Nonce--> AwaitingPin --enter_pin--> AwaitingChallenge
//!                     --Challenge--> AwaitingChallengeSuccess
//!   reconnection:     --Nonce--> AwaitingChallengeSuccess
//! AwaitingChallengeSuccess --ChallengeSuccess--> Authenticated
//!
//! abort frame / handshake timeout (any state) --> Cancelled
//! ```
//!
//! ConnResponse and the nonce acknowledgment travel in plaintext; the
//! channel is activated right after the acknowledgment is sent.

use tokio::time::Instant;

use super::{CachedSession, Connection};
use crate::core::*;
use crate::crypto::{KeyPair, NonceState, RemoteIdentity, SessionKeys};
use crate::message::{ChallengeMessage, ConnRequest, ConnResponse, ConnType, NonceMessage, RtsMessage};

/// Progress of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No connection request yet.
    Idle,
    /// Connection response sent; waiting for the nonce seeds.
    AwaitingNonce,
    /// First-time pairing is blocked on the user's PIN.
    AwaitingPin,
    /// Channel encrypted; waiting for the device challenge.
    AwaitingChallenge,
    /// Waiting for the device to confirm.
    AwaitingChallengeSuccess,
    /// The device confirmed the session.
    Authenticated,
    /// Pairing failed or was abandoned by the device.
    Cancelled,
}

impl<T: Transport, S: SessionStore> Connection<T, S> {
    /// Supply the PIN shown by the device.
    ///
    /// Only valid after the ready-for-PIN event. A PIN that cannot key the
    /// hash is rejected and the connection keeps waiting for another.
    pub fn enter_pin(&mut self, pin: &str) -> Result<(), ConnectionError> {
        self.ensure_open()?;
        if self.state != HandshakeState::AwaitingPin {
            return Err(ConnectionError::InvalidState("not waiting for a PIN"));
        }
        let (Some(local), Some(peer)) = (self.local_keys.as_ref(), self.remote) else {
            return Err(ConnectionError::InvalidState("no key exchange in progress"));
        };

        let keys = SessionKeys::derive(local, peer.as_bytes(), pin)?;
        self.channel.install_keys(keys);
        self.send(&RtsMessage::Ack {
            acked_tag: TAG_NONCE_MESSAGE,
        })?;
        self.channel.activate()?;
        self.state = HandshakeState::AwaitingChallenge;

        tracing::info!(%peer, "PIN accepted, channel encrypted");
        Ok(())
    }

    /// Deadline for the nonce message of a first-time pairing.
    pub fn handshake_deadline(&self) -> Option<Instant> {
        self.handshake_deadline
    }

    /// Cancel the pairing if the handshake deadline passed by `now`.
    ///
    /// Returns whether the connection was cancelled.
    pub fn poll_timeout(&mut self, now: Instant) -> bool {
        match self.handshake_deadline {
            Some(deadline) if now >= deadline => {
                tracing::warn!("no nonce message before the handshake deadline");
                self.cancel_connection();
                true
            }
            _ => false,
        }
    }

    pub(super) fn on_conn_request(&mut self, request: ConnRequest) -> Result<(), ConnectionError> {
        let peer = RemoteIdentity::from_bytes(request.public_key);
        self.remote = Some(peer);
        self.channel.reset();
        self.keys_authorized = false;
        self.handshake_deadline = None;

        let (key_pair, conn_type) = if let Some(keys) = self.store.get_session(&peer) {
            tracing::info!(%peer, "reconnecting with stored session");
            self.channel.install_keys(keys);
            (self.store.keys(), ConnType::Reconnection)
        } else if let Some(cached) = self.transport.sessions().get(&peer).cloned() {
            tracing::info!(%peer, "reconnecting with cached session");
            self.channel.install_keys(cached.keys);
            (cached.key_pair, ConnType::Reconnection)
        } else {
            tracing::info!(%peer, "first-time pairing");
            self.handshake_deadline = Some(Instant::now() + self.config.handshake_timeout);
            (KeyPair::generate(), ConnType::FirstTimePair)
        };

        let response = ConnResponse {
            conn_type,
            public_key: *key_pair.public_key(),
        };
        self.first_time_pair = conn_type == ConnType::FirstTimePair;
        self.local_keys = Some(key_pair);
        self.state = HandshakeState::AwaitingNonce;

        self.send(&RtsMessage::ConnResponse(response))
    }

    pub(super) fn on_nonce(&mut self, nonce: NonceMessage) -> Result<(), ConnectionError> {
        if self.state != HandshakeState::AwaitingNonce {
            tracing::debug!(state = ?self.state, "ignoring nonce message");
            return Ok(());
        }

        self.handshake_deadline = None;
        self.channel.install_nonces(NonceState::from_seeds(
            nonce.to_device_nonce,
            nonce.to_client_nonce,
        ));

        if !self.first_time_pair {
            self.send(&RtsMessage::Ack {
                acked_tag: TAG_NONCE_MESSAGE,
            })?;
            self.channel.activate()?;
            self.state = HandshakeState::AwaitingChallengeSuccess;
            return Ok(());
        }

        self.state = HandshakeState::AwaitingPin;
        tracing::info!("waiting for PIN");
        self.events.ready_for_pin.publish(&());
        Ok(())
    }

    pub(super) fn on_challenge(&mut self, challenge: ChallengeMessage) -> Result<(), ConnectionError> {
        if !self.channel.is_encrypted() {
            tracing::debug!("ignoring challenge on plaintext channel");
            return Ok(());
        }

        self.send(&RtsMessage::ChallengeMessage(ChallengeMessage {
            number: challenge.number.wrapping_add(1),
        }))?;
        if self.state == HandshakeState::AwaitingChallenge {
            self.state = HandshakeState::AwaitingChallengeSuccess;
        }
        Ok(())
    }

    pub(super) fn on_challenge_success(&mut self) -> Result<(), ConnectionError> {
        if !self.channel.is_encrypted() {
            tracing::debug!("ignoring challenge success on plaintext channel");
            return Ok(());
        }
        let (Some(peer), Some(keys), Some(key_pair)) = (
            self.remote,
            self.channel.keys().cloned(),
            self.local_keys.clone(),
        ) else {
            return Err(ConnectionError::InvalidState("no session to authorize"));
        };

        self.keys_authorized = true;
        self.transport
            .sessions()
            .insert(&peer, CachedSession { keys, key_pair });
        self.state = HandshakeState::Authenticated;

        tracing::info!(%peer, "connection authenticated");
        self.events.authenticated.publish(&());
        Ok(())
    }

    /// Abandon the pairing: notify, drop the link, signal completion.
    pub(super) fn cancel_connection(&mut self) {
        if self.state == HandshakeState::Cancelled {
            return;
        }
        tracing::info!(state = ?self.state, "pairing cancelled");

        self.state = HandshakeState::Cancelled;
        self.handshake_deadline = None;
        self.channel.reset();
        self.pending.close_all();
        self.has_progress_bar = false;

        self.events.print.publish(PAIRING_FAILED_NOTICE);
        self.transport.try_disconnect();
        self.events.command_done.publish(&());
    }
}
