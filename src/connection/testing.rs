//! Test doubles: a recording bearer, a recording store and a simulated device.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use blake2::digest::{Mac, consts::U32};
use blake2::{Blake2b512, Blake2bMac, Digest};
use x25519_dalek::{PublicKey, StaticSecret};

use super::{Connection, ConnectionEvents, LogArtifact, SessionCache};
use crate::core::*;
use crate::crypto::{EncryptedChannel, KeyPair, NonceState, RemoteIdentity, SessionKey, SessionKeys};
use crate::message::{ConnRequest, Decoded, NonceMessage, RtsMessage, decode_frame};

pub(crate) const PIN: &str = "123456";

const DEVICE_PRIVATE: [u8; 32] = [0x22; 32];
const TO_DEVICE_SEED: [u8; AEAD_NONCE_SIZE] = [0x0a; AEAD_NONCE_SIZE];
const TO_CLIENT_SEED: [u8; AEAD_NONCE_SIZE] = [0xf0; AEAD_NONCE_SIZE];

#[derive(Debug, Default)]
struct TransportRecord {
    sent: VecDeque<Vec<u8>>,
    disconnects: usize,
    unsubscribes: usize,
}

/// Shared view of everything a [`MockTransport`] was asked to do.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransportLog(Arc<Mutex<TransportRecord>>);

impl TransportLog {
    /// Oldest frame not yet taken.
    pub(crate) fn next_sent(&self) -> Vec<u8> {
        self.0
            .lock()
            .unwrap()
            .sent
            .pop_front()
            .expect("no frame was sent")
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.0.lock().unwrap().sent.len()
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.0.lock().unwrap().disconnects
    }

    pub(crate) fn unsubscribes(&self) -> usize {
        self.0.lock().unwrap().unsubscribes
    }
}

#[derive(Debug)]
pub(crate) struct MockTransport {
    log: TransportLog,
    sessions: SessionCache,
}

impl MockTransport {
    pub(crate) fn new() -> (Self, TransportLog) {
        Self::with_sessions(SessionCache::new())
    }

    pub(crate) fn with_sessions(sessions: SessionCache) -> (Self, TransportLog) {
        let log = TransportLog::default();
        (
            Self {
                log: log.clone(),
                sessions,
            },
            log,
        )
    }

    pub(crate) fn cached(&self, peer: &RemoteIdentity) -> bool {
        self.sessions.get(peer).is_some()
    }

    pub(crate) fn take_sessions(&mut self) -> SessionCache {
        std::mem::take(&mut self.sessions)
    }
}

impl Transport for MockTransport {
    fn send(&mut self, frame: Vec<u8>) {
        self.log.0.lock().unwrap().sent.push_back(frame);
    }

    fn try_disconnect(&mut self) {
        self.log.0.lock().unwrap().disconnects += 1;
    }

    fn unsubscribe(&mut self) {
        self.log.0.lock().unwrap().unsubscribes += 1;
    }

    fn sessions(&mut self) -> &mut SessionCache {
        &mut self.sessions
    }
}

/// Session store that counts deletions and saves.
#[derive(Debug)]
pub(crate) struct RecordingStore {
    sessions: HashMap<RemoteIdentity, SessionKeys>,
    key_pair: KeyPair,
    deleted: usize,
    saves: usize,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            key_pair: KeyPair::from_private([0x11; 32]),
            deleted: 0,
            saves: 0,
        }
    }

    pub(crate) fn with_session(peer: RemoteIdentity, keys: SessionKeys, key_pair: KeyPair) -> Self {
        let mut store = Self::new();
        store.sessions.insert(peer, keys);
        store.key_pair = key_pair;
        store
    }

    pub(crate) fn deleted(&self) -> usize {
        self.deleted
    }

    pub(crate) fn saves(&self) -> usize {
        self.saves
    }
}

impl SessionStore for RecordingStore {
    fn get_session(&self, peer: &RemoteIdentity) -> Option<SessionKeys> {
        self.sessions.get(peer).cloned()
    }

    fn keys(&self) -> KeyPair {
        self.key_pair.clone()
    }

    fn delete_session(&mut self, peer: &RemoteIdentity) {
        self.deleted += 1;
        self.sessions.remove(peer);
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recorded {
    prints: Vec<String>,
    authenticated: usize,
    ready_for_pin: usize,
    command_done: usize,
    bars_created: usize,
    bar_updates: Vec<(u64, u64)>,
    updates: Vec<u8>,
    log_chunks: Vec<(u32, u32)>,
    artifacts: Vec<LogArtifact>,
}

/// Subscribes to every event and keeps what it saw.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventRecorder(Arc<Mutex<Recorded>>);

impl EventRecorder {
    pub(crate) fn attach(events: &mut ConnectionEvents) -> Self {
        let recorder = Self::default();

        let r = recorder.0.clone();
        events.print.subscribe(move |s: &str| r.lock().unwrap().prints.push(s.to_string()));
        let r = recorder.0.clone();
        events.authenticated.subscribe(move |_: &()| r.lock().unwrap().authenticated += 1);
        let r = recorder.0.clone();
        events.ready_for_pin.subscribe(move |_: &()| r.lock().unwrap().ready_for_pin += 1);
        let r = recorder.0.clone();
        events.command_done.subscribe(move |_: &()| r.lock().unwrap().command_done += 1);
        let r = recorder.0.clone();
        events
            .progress_bar_created
            .subscribe(move |_: &()| r.lock().unwrap().bars_created += 1);
        let r = recorder.0.clone();
        events
            .progress_bar_updated
            .subscribe(move |p: &(u64, u64)| r.lock().unwrap().bar_updates.push(*p));
        let r = recorder.0.clone();
        events
            .update_progress
            .subscribe(move |s| r.lock().unwrap().updates.push(s.status));
        let r = recorder.0.clone();
        events.log_progress.subscribe(move |c| {
            r.lock()
                .unwrap()
                .log_chunks
                .push((c.packet_number, c.packet_total))
        });
        let r = recorder.0.clone();
        events
            .logs_downloaded
            .subscribe(move |a| r.lock().unwrap().artifacts.push(a.clone()));

        recorder
    }

    pub(crate) fn prints(&self) -> Vec<String> {
        self.0.lock().unwrap().prints.clone()
    }

    pub(crate) fn authenticated(&self) -> usize {
        self.0.lock().unwrap().authenticated
    }

    pub(crate) fn ready_for_pin(&self) -> usize {
        self.0.lock().unwrap().ready_for_pin
    }

    pub(crate) fn command_done(&self) -> usize {
        self.0.lock().unwrap().command_done
    }

    pub(crate) fn bars_created(&self) -> usize {
        self.0.lock().unwrap().bars_created
    }

    pub(crate) fn bar_updates(&self) -> Vec<(u64, u64)> {
        self.0.lock().unwrap().bar_updates.clone()
    }

    pub(crate) fn updates(&self) -> Vec<u8> {
        self.0.lock().unwrap().updates.clone()
    }

    pub(crate) fn log_chunks(&self) -> Vec<(u32, u32)> {
        self.0.lock().unwrap().log_chunks.clone()
    }

    pub(crate) fn artifacts(&self) -> Vec<LogArtifact> {
        self.0.lock().unwrap().artifacts.clone()
    }
}

/// The robot side of the protocol, derived independently of the client code.
pub(crate) struct Device {
    key_pair: KeyPair,
    channel: EncryptedChannel,
    keys: Option<SessionKeys>,
}

impl Device {
    pub(crate) fn new() -> Self {
        Self {
            key_pair: KeyPair::from_private(DEVICE_PRIVATE),
            channel: EncryptedChannel::new(),
            keys: None,
        }
    }

    /// Same identity and keys, fresh link.
    pub(crate) fn restart(self) -> Self {
        Self {
            channel: EncryptedChannel::new(),
            ..self
        }
    }

    pub(crate) fn public_key(&self) -> [u8; 32] {
        *self.key_pair.public_key()
    }

    pub(crate) fn identity(&self) -> RemoteIdentity {
        RemoteIdentity::from_bytes(self.public_key())
    }

    pub(crate) fn conn_request(&self) -> Vec<u8> {
        RtsMessage::ConnRequest(ConnRequest {
            public_key: self.public_key(),
        })
        .encode()
        .unwrap()
    }

    pub(crate) fn nonce_message(&self) -> Vec<u8> {
        RtsMessage::NonceMessage(NonceMessage {
            to_device_nonce: TO_DEVICE_SEED,
            to_client_nonce: TO_CLIENT_SEED,
        })
        .encode()
        .unwrap()
    }

    /// Server-side key exchange with the client's key, bound to `pin`.
    pub(crate) fn pair(&mut self, client_public: &[u8; 32], pin: &str) {
        let secret = StaticSecret::from(DEVICE_PRIVATE);
        let shared = secret.diffie_hellman(&PublicKey::from(*client_public));

        let mut hasher = Blake2b512::new();
        hasher.update(shared.as_bytes());
        hasher.update(client_public);
        hasher.update(self.key_pair.public_key());
        let digest = hasher.finalize();

        // Server tx is the first half, rx the second
        let keys = SessionKeys {
            encrypt: SessionKey::from_bytes(keyed_hash(&digest[..32], pin)),
            decrypt: SessionKey::from_bytes(keyed_hash(&digest[32..], pin)),
        };
        self.activate(keys);
    }

    /// Resume with the mirror of the client's stored keys.
    pub(crate) fn resume(&mut self, client: &SessionKeys) {
        self.activate(SessionKeys {
            encrypt: client.decrypt.clone(),
            decrypt: client.encrypt.clone(),
        });
    }

    /// Resume with the keys of the last pairing.
    pub(crate) fn resume_paired(&mut self) {
        let keys = self.keys.clone().expect("device was never paired");
        self.activate(keys);
    }

    fn activate(&mut self, keys: SessionKeys) {
        self.keys = Some(keys.clone());
        self.channel = EncryptedChannel::new();
        self.channel.install_keys(keys);
        self.channel
            .install_nonces(NonceState::from_seeds(TO_CLIENT_SEED, TO_DEVICE_SEED));
        self.channel.activate().unwrap();
    }

    /// Decode a frame the client sent.
    pub(crate) fn read(&mut self, frame: &[u8]) -> RtsMessage {
        let plaintext = if self.channel.is_encrypted() {
            self.channel.unwrap(frame).unwrap()
        } else {
            frame.to_vec()
        };
        match decode_frame(&plaintext).unwrap() {
            Decoded::Message(message) => message,
            other => panic!("client sent {other:?}"),
        }
    }

    /// Encode (and seal, once paired) a message for the client.
    pub(crate) fn write(&mut self, message: &RtsMessage) -> Vec<u8> {
        let bytes = message.encode().unwrap();
        self.seal(&bytes)
    }

    pub(crate) fn seal(&mut self, plaintext: &[u8]) -> Vec<u8> {
        if self.channel.is_encrypted() {
            self.channel.wrap(plaintext).unwrap()
        } else {
            plaintext.to_vec()
        }
    }
}

fn keyed_hash(data: &[u8], pin: &str) -> [u8; 32] {
    let mut mac = <Blake2bMac<U32> as Mac>::new_from_slice(pin.as_bytes()).unwrap();
    mac.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

pub(crate) type TestConnection = Connection<MockTransport, RecordingStore>;

/// A fresh connection with no stored sessions.
pub(crate) fn connection() -> (TestConnection, TransportLog) {
    let (transport, log) = MockTransport::new();
    (
        Connection::new(transport, RecordingStore::new(), Default::default()),
        log,
    )
}

/// Run a complete first-time pairing against `device`.
pub(crate) fn pair(conn: &mut TestConnection, log: &TransportLog, device: &mut Device) {
    conn.receive(&device.conn_request()).unwrap();
    let RtsMessage::ConnResponse(response) = device.read(&log.next_sent()) else {
        panic!("expected a connection response");
    };

    conn.receive(&device.nonce_message()).unwrap();
    conn.enter_pin(PIN).unwrap();
    device.read(&log.next_sent());
    device.pair(&response.public_key, PIN);

    conn.receive(&device.write(&RtsMessage::ChallengeMessage(
        crate::message::ChallengeMessage { number: 7 },
    )))
    .unwrap();
    device.read(&log.next_sent());
    conn.receive(&device.write(&RtsMessage::ChallengeSuccess))
        .unwrap();
    assert!(conn.keys_authorized());
}

/// A connection that completed first-time pairing.
pub(crate) fn paired_connection() -> (TestConnection, TransportLog, Device) {
    let (mut conn, log) = connection();
    let mut device = Device::new();
    pair(&mut conn, &log, &mut device);
    (conn, log, device)
}
