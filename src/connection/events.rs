//! Observer lists.
//!
//! Each event kind keeps its own list of callbacks, invoked in
//! registration order every time the event fires.

use std::fmt;

use crate::message::{FileDownload, OtaUpdateResponse};

/// A downloaded log archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogArtifact {
    /// Timestamped file name.
    pub file_name: String,
    /// Concatenated chunk bytes.
    pub bytes: Vec<u8>,
}

/// Subscribers to one event kind.
pub struct Observers<T: ?Sized> {
    callbacks: Vec<Box<dyn FnMut(&T) + Send>>,
}

impl<T: ?Sized> Observers<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Register a callback.
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// Invoke every callback with `value`.
    pub fn publish(&mut self, value: &T) {
        for callback in self.callbacks.iter_mut() {
            callback(value);
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// No callbacks registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<T: ?Sized> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observers({})", self.callbacks.len())
    }
}

/// Every observable event of a connection.
#[derive(Debug, Default)]
pub struct ConnectionEvents {
    /// The challenge succeeded; the session is authenticated.
    pub authenticated: Observers<()>,
    /// A PIN must be entered to continue pairing.
    pub ready_for_pin: Observers<()>,
    /// Any firmware update status.
    pub update_progress: Observers<OtaUpdateResponse>,
    /// An accepted log chunk.
    pub log_progress: Observers<FileDownload>,
    /// A log archive finished downloading.
    pub logs_downloaded: Observers<LogArtifact>,
    /// A user-facing notice.
    pub print: Observers<str>,
    /// The current command finished (pairing cancelled).
    pub command_done: Observers<()>,
    /// A long-running command started reporting progress.
    pub progress_bar_created: Observers<()>,
    /// Progress as `(current, total)`.
    pub progress_bar_updated: Observers<(u64, u64)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_publish_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers: Observers<u32> = Observers::new();

        for id in 0..3 {
            let seen = seen.clone();
            observers.subscribe(move |v: &u32| seen.lock().unwrap().push((id, *v)));
        }
        observers.publish(&7);
        observers.publish(&8);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, 7), (1, 7), (2, 7), (0, 8), (1, 8), (2, 8)]
        );
    }

    #[test]
    fn test_unsized_payload() {
        let seen = Arc::new(Mutex::new(String::new()));
        let mut print: Observers<str> = Observers::new();
        let sink = seen.clone();
        print.subscribe(move |s: &str| sink.lock().unwrap().push_str(s));

        print.publish("Downloading logs...");
        assert_eq!(*seen.lock().unwrap(), "Downloading logs...");
        assert_eq!(print.len(), 1);
    }
}
