//! Firmware update status interpretation.

use crate::core::{OTA_STATUS_CANCELLING, OTA_STATUS_COMPLETED, OTA_STATUS_FAILURE_THRESHOLD};
use crate::message::OtaUpdateResponse;

/// Where a status code leaves a pending update-start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Not terminal.
    InProgress,
    /// The update finished.
    Completed,
    /// The update failed.
    Failed,
}

/// Classify a status for an outstanding update-start.
pub fn classify_start(status: u8) -> UpdateOutcome {
    match status {
        OTA_STATUS_COMPLETED => UpdateOutcome::Completed,
        s if s >= OTA_STATUS_FAILURE_THRESHOLD => UpdateOutcome::Failed,
        _ => UpdateOutcome::InProgress,
    }
}

/// Whether a status ends an outstanding update-cancel.
pub fn cancel_settled(status: u8) -> bool {
    status != OTA_STATUS_CANCELLING
}

/// Last firmware update status seen on this connection.
#[derive(Debug, Default)]
pub struct ProgressMonitor {
    last: Option<OtaUpdateResponse>,
}

impl ProgressMonitor {
    /// Create an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the last status.
    pub fn record(&mut self, status: OtaUpdateResponse) {
        self.last = Some(status);
    }

    /// The last status, kept after the update ends.
    pub fn last(&self) -> Option<OtaUpdateResponse> {
        self.last
    }
}
