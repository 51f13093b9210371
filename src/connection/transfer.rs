//! Chunked log transfer reassembly.
//!
//! A successful log acknowledgment adopts a transfer id and clears the
//! buffer. Chunks for any other id are ignored. Chunks are appended in
//! arrival order; the device is assumed to send them in order.

use chrono::{DateTime, Utc};

use crate::core::LOG_FILE_EXTENSION;
use crate::message::FileDownload;

/// What a chunk did to the active transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Not part of the active transfer.
    Ignored,
    /// Appended; more chunks follow.
    Progress {
        /// Index of this chunk (1-based).
        index: u32,
        /// Total chunk count.
        total: u32,
    },
    /// Appended and final.
    Complete {
        /// Index of this chunk.
        index: u32,
        /// Total chunk count.
        total: u32,
        /// The reassembled payload.
        bytes: Vec<u8>,
    },
}

/// Accumulator of the active log transfer.
#[derive(Debug, Default)]
pub struct LogTransfer {
    file_id: Option<u32>,
    buffer: Vec<u8>,
    expected: u32,
}

impl LogTransfer {
    /// Create an idle reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt `file_id` and clear any partial payload.
    pub fn start(&mut self, file_id: u32) {
        self.file_id = Some(file_id);
        self.buffer.clear();
        self.expected = 0;
    }

    /// The active transfer id.
    pub fn file_id(&self) -> Option<u32> {
        self.file_id
    }

    /// Chunk count announced by the last accepted chunk.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Bytes accumulated so far.
    pub fn received(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one chunk.
    pub fn accept(&mut self, chunk: &FileDownload) -> ChunkOutcome {
        if self.file_id != Some(chunk.file_id) {
            tracing::debug!(
                file_id = chunk.file_id,
                active = ?self.file_id,
                "ignoring chunk for inactive transfer"
            );
            return ChunkOutcome::Ignored;
        }

        self.buffer.extend_from_slice(&chunk.chunk);
        self.expected = chunk.packet_total;

        if chunk.packet_number == chunk.packet_total {
            self.file_id = None;
            self.expected = 0;
            ChunkOutcome::Complete {
                index: chunk.packet_number,
                total: chunk.packet_total,
                bytes: std::mem::take(&mut self.buffer),
            }
        } else {
            ChunkOutcome::Progress {
                index: chunk.packet_number,
                total: chunk.packet_total,
            }
        }
    }
}

/// Artifact name `<prefix>-YYYY-MM-DD-HH-MM-SS.tar.bz2` for `at`.
pub fn artifact_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}-{}.{LOG_FILE_EXTENSION}", at.format("%Y-%m-%d-%H-%M-%S"))
}
