//! Request/response correlation.
//!
//! Responses on the wire carry no request id, only a message tag. Each
//! request still gets a unique [`RequestId`]; a response for an operation
//! settles the oldest outstanding request of that operation, so two
//! requests with the same name never orphan each other.
//!
//! A request whose handle was dropped (for example after
//! [`ResponseHandle::with_deadline`] gave up) is abandoned: it is skipped and
//! pruned instead of taking the next response.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;

use super::LogArtifact;
use crate::core::RequestError;
use crate::message::RtsMessage;

/// Operations that expect exactly one terminal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Scan for networks.
    WifiScan,
    /// Join a network.
    WifiConnect,
    /// Forget a network.
    WifiForget,
    /// Toggle access point mode.
    WifiAccessPoint,
    /// Query addresses.
    WifiIp,
    /// Query device status.
    Status,
    /// Start a firmware update.
    UpdateStart,
    /// Cancel a firmware update.
    UpdateCancel,
    /// Download logs.
    Logs,
}

impl Operation {
    /// The operation name used in logs and notices.
    pub fn name(self) -> &'static str {
        match self {
            Operation::WifiScan => "wifi-scan",
            Operation::WifiConnect => "wifi-connect",
            Operation::WifiForget => "wifi-forget",
            Operation::WifiAccessPoint => "wifi-ap",
            Operation::WifiIp => "wifi-ip",
            Operation::Status => "status",
            Operation::UpdateStart => "ota-start",
            Operation::UpdateCancel => "ota-cancel",
            Operation::Logs => "logs",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unique id of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Raw id value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A settled request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// The terminal response message.
    pub message: RtsMessage,
    /// The downloaded archive, for `logs`.
    pub artifact: Option<LogArtifact>,
}

impl Reply {
    /// A reply that is just a message.
    pub fn message(message: RtsMessage) -> Self {
        Self {
            message,
            artifact: None,
        }
    }
}

type Completion = oneshot::Sender<Result<Reply, RequestError>>;

/// Future side of a pending request.
#[derive(Debug)]
pub struct ResponseHandle {
    id: RequestId,
    operation: Operation,
    rx: oneshot::Receiver<Result<Reply, RequestError>>,
}

impl ResponseHandle {
    /// Id of the request.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Operation of the request.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Wait at most `deadline`; `Ok(None)` means the request timed out.
    ///
    /// A reply arriving after the deadline is discarded.
    pub async fn with_deadline(self, deadline: Duration) -> Result<Option<Reply>, RequestError> {
        match tokio::time::timeout(deadline, self).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}

impl Future for ResponseHandle {
    type Output = Result<Reply, RequestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(RequestError::ConnectionClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Outstanding requests of one connection.
#[derive(Debug, Default)]
pub struct PendingRequests {
    next_id: u64,
    slots: HashMap<RequestId, (Operation, Completion)>,
    queues: HashMap<Operation, VecDeque<RequestId>>,
}

impl PendingRequests {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request for `operation`.
    pub fn register(&mut self, operation: Operation) -> ResponseHandle {
        self.prune();
        self.next_id += 1;
        let id = RequestId(self.next_id);
        let (tx, rx) = oneshot::channel();

        self.slots.insert(id, (operation, tx));
        self.queues.entry(operation).or_default().push_back(id);
        tracing::debug!(request = id.get(), %operation, "request registered");

        ResponseHandle { id, operation, rx }
    }

    /// The most recently issued request that is still outstanding.
    pub fn awaiting(&self) -> Option<(RequestId, Operation)> {
        self.slots
            .iter()
            .filter(|(_, (_, tx))| !tx.is_closed())
            .max_by_key(|(id, _)| **id)
            .map(|(id, (op, _))| (*id, *op))
    }

    /// Whether any request for `operation` is outstanding.
    pub fn is_pending(&self, operation: Operation) -> bool {
        self.queues
            .get(&operation)
            .is_some_and(|q| q.iter().any(|id| self.is_live(*id)))
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.slots.values().filter(|(_, tx)| !tx.is_closed()).count()
    }

    /// Nothing outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Settle the oldest live request of `operation`. Returns false if none was pending.
    pub fn settle_next(&mut self, operation: Operation, result: Result<Reply, RequestError>) -> bool {
        while let Some(id) = self.queues.get_mut(&operation).and_then(VecDeque::pop_front) {
            if self.is_live(id) {
                return self.complete(id, result);
            }
            if self.slots.remove(&id).is_some() {
                tracing::debug!(request = id.get(), %operation, "abandoned request skipped");
            }
        }
        tracing::debug!(%operation, "no pending request for response");
        false
    }

    /// Settle a specific request. Returns false if it was not pending.
    pub fn settle(&mut self, id: RequestId, result: Result<Reply, RequestError>) -> bool {
        if let Some(op) = self.slots.get(&id).map(|(op, _)| *op) {
            self.unqueue(op, id);
        }
        self.complete(id, result)
    }

    /// Drop a request without notifying its caller.
    pub fn discard(&mut self, id: RequestId) {
        if let Some((op, _)) = self.slots.remove(&id) {
            self.unqueue(op, id);
        }
    }

    /// Drop every request; waiting callers see `ConnectionClosed`.
    pub fn close_all(&mut self) {
        self.slots.clear();
        self.queues.clear();
    }

    fn is_live(&self, id: RequestId) -> bool {
        self.slots.get(&id).is_some_and(|(_, tx)| !tx.is_closed())
    }

    /// Forget requests whose caller stopped waiting.
    fn prune(&mut self) {
        self.slots.retain(|id, (operation, tx)| {
            let live = !tx.is_closed();
            if !live {
                tracing::debug!(request = id.get(), %operation, "abandoned request pruned");
            }
            live
        });
        let slots = &self.slots;
        for queue in self.queues.values_mut() {
            queue.retain(|id| slots.contains_key(id));
        }
    }

    fn unqueue(&mut self, operation: Operation, id: RequestId) {
        if let Some(queue) = self.queues.get_mut(&operation) {
            queue.retain(|queued| *queued != id);
        }
    }

    fn complete(&mut self, id: RequestId, result: Result<Reply, RequestError>) -> bool {
        let Some((operation, tx)) = self.slots.remove(&id) else {
            return false;
        };
        tracing::debug!(request = id.get(), %operation, ok = result.is_ok(), "request settled");
        // Receiver may have been dropped since the liveness check.
        let _ = tx.send(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{GenericResponse, LogResponse};

    fn nack() -> RtsMessage {
        RtsMessage::Response(GenericResponse {
            code: 1,
            text: "no".into(),
        })
    }

    #[tokio::test]
    async fn test_settle_resolves_handle() {
        let mut pending = PendingRequests::new();
        let handle = pending.register(Operation::Status);

        assert!(pending.settle_next(Operation::Status, Ok(Reply::message(RtsMessage::StatusRequest))));
        assert!(pending.is_empty());
        assert_eq!(handle.await.unwrap().message, RtsMessage::StatusRequest);
    }

    #[tokio::test]
    async fn test_same_operation_twice_is_fifo() {
        let mut pending = PendingRequests::new();
        let first = pending.register(Operation::WifiScan);
        let second = pending.register(Operation::WifiScan);
        assert_ne!(first.id(), second.id());

        pending.settle_next(Operation::WifiScan, Ok(Reply::message(RtsMessage::WifiScanRequest)));
        pending.settle_next(Operation::WifiScan, Err(RequestError::Rejected(Box::new(nack()))));

        assert!(first.await.is_ok());
        assert!(matches!(second.await, Err(RequestError::Rejected(_))));
    }

    #[test]
    fn test_awaiting_is_most_recent_outstanding() {
        let mut pending = PendingRequests::new();
        let status = pending.register(Operation::Status);
        let logs = pending.register(Operation::Logs);

        assert_eq!(pending.awaiting(), Some((logs.id(), Operation::Logs)));
        pending.settle(logs.id(), Err(RequestError::ConnectionClosed));
        assert_eq!(pending.awaiting(), Some((status.id(), Operation::Status)));
        assert!(!pending.is_pending(Operation::Logs));
    }

    #[test]
    fn test_settle_without_pending() {
        let mut pending = PendingRequests::new();
        assert!(!pending.settle_next(
            Operation::Logs,
            Ok(Reply::message(RtsMessage::LogResponse(LogResponse {
                exit_code: 0,
                file_id: 1
            })))
        ));
    }

    #[tokio::test]
    async fn test_close_all_reports_closed() {
        let mut pending = PendingRequests::new();
        let handle = pending.register(Operation::WifiIp);
        pending.close_all();
        pending.close_all();

        assert_eq!(handle.await, Err(RequestError::ConnectionClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_sentinel() {
        let mut pending = PendingRequests::new();
        let handle = pending.register(Operation::Status);

        let result = handle.with_deadline(Duration::from_secs(5)).await;
        assert_eq!(result, Ok(None));

        // The abandoned request no longer counts and a late reply goes nowhere
        assert!(pending.is_empty());
        assert!(!pending.is_pending(Operation::Status));
        assert!(!pending.settle_next(Operation::Status, Ok(Reply::message(RtsMessage::StatusRequest))));
        assert!(pending.slots.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_request_does_not_take_next_reply() {
        let mut pending = PendingRequests::new();
        let first = pending.register(Operation::Status);
        assert_eq!(first.with_deadline(Duration::from_secs(5)).await, Ok(None));

        let second = pending.register(Operation::Status);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.awaiting(), Some((second.id(), Operation::Status)));

        assert!(pending.settle_next(Operation::Status, Ok(Reply::message(RtsMessage::StatusRequest))));
        assert_eq!(second.await.unwrap().message, RtsMessage::StatusRequest);
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn test_dropped_handle_ignored_by_nack_target() {
        let mut pending = PendingRequests::new();
        let status = pending.register(Operation::Status);
        let logs = pending.register(Operation::Logs);
        drop(logs);

        assert_eq!(pending.awaiting(), Some((status.id(), Operation::Status)));
        assert!(!pending.is_pending(Operation::Logs));
    }
}
