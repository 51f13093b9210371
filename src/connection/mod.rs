//! RTS connection engine.
//!
//! - Handshake state machine (first-time pairing and reconnection)
//! - Inbound dispatch through the encrypted channel
//! - Request correlation with per-request ids
//! - Log transfer reassembly and OTA progress tracking
//! - Observer lists and the per-bearer session cache

mod cache;
mod config;
#[allow(clippy::module_inception)]
mod connection;
mod dispatch;
mod events;
mod handshake;
mod pending;
mod progress;
mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CachedSession, SessionCache};
pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::Connection;
pub use events::{ConnectionEvents, LogArtifact, Observers};
pub use handshake::HandshakeState;
pub use pending::{Operation, PendingRequests, Reply, RequestId, ResponseHandle};
pub use progress::{ProgressMonitor, UpdateOutcome, cancel_settled, classify_start};
pub use transfer::{ChunkOutcome, LogTransfer, artifact_name};
