//! Outbound control protocol: request-id generation, the correlation table,
//! and the typed wrappers over each outbound subtype.
//!
//! [`ControlClient`] is the only thing that writes `control_request` frames.
//! Every call follows the same shape: allocate a `request_id`, register a
//! [`oneshot`] completion slot in the [`CorrelationTable`], write the frame via
//! the [`crate::transport::Transport`], then await the slot. [`CorrelationTable`]
//! guarantees every registered slot eventually receives exactly one of
//! {value, error, cancelled, connection-closed}.

use crate::transport::Transport;
use crate::types::{ControlRequestPayload, ControlResponsePayload};
use crate::{Error, Result};
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

/// Generates `request_id` values of the form `req_<monotonic>_<random hex>`.
///
/// The monotonic counter guarantees uniqueness within a process even if the
/// random suffix were to collide; the random suffix (drawn from the crate's
/// existing `rand` dependency) avoids a predictable sequence being echoed back
/// by a misbehaving CLI.
#[derive(Default)]
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let suffix: String = {
            let mut rng = rand::thread_rng();
            (0..8)
                .map(|_| {
                    let n = rng.gen_range(0..16);
                    std::char::from_digit(n, 16).unwrap()
                })
                .collect()
        };
        format!("req_{seq}_{suffix}")
    }
}

/// The outcome delivered to a pending control request's awaiter.
type Completion = Result<Option<Value>>;

/// Mutex-protected map of `request_id -> completion slot`.
#[derive(Default)]
pub struct CorrelationTable {
    pending: Mutex<HashMap<String, oneshot::Sender<Completion>>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new slot for `request_id`, returning the receiving half.
    pub async fn register(&self, request_id: String) -> oneshot::Receiver<Completion> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id, tx);
        rx
    }

    /// Remove and drop the slot for `request_id` without completing it
    /// (used when the caller cancels before a response arrives).
    pub async fn remove(&self, request_id: &str) {
        self.pending.lock().await.remove(request_id);
    }

    /// Complete the slot named by `response.request_id()`, if still pending.
    /// Returns `true` if a slot was found.
    pub async fn complete(&self, response: ControlResponsePayload) -> bool {
        let request_id = response.request_id().to_string();
        let sender = self.pending.lock().await.remove(&request_id);
        match sender {
            Some(sender) => {
                let outcome = match response {
                    ControlResponsePayload::Success { response, .. } => Ok(response),
                    ControlResponsePayload::Error { error, .. } => Err(Error::cli(error)),
                };
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Drain every pending slot with [`Error::ConnectionClosed`].
    pub async fn shutdown(&self) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(Error::ConnectionClosed));
        }
    }

    #[cfg(test)]
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Outbound control client: builds `control_request` frames, correlates their
/// responses, and exposes one typed method per subtype.
pub struct ControlClient {
    transport: Arc<dyn Transport>,
    table: Arc<CorrelationTable>,
    ids: RequestIdGenerator,
}

impl ControlClient {
    pub fn new(transport: Arc<dyn Transport>, table: Arc<CorrelationTable>) -> Self {
        Self {
            transport,
            table,
            ids: RequestIdGenerator::new(),
        }
    }

    /// Send `payload`, await its correlated response, honouring `cancellation`.
    /// Returns the `response` value carried by a success reply (may be
    /// `null`/absent).
    pub async fn call(
        &self,
        payload: ControlRequestPayload,
        cancellation: &CancellationToken,
    ) -> Result<Option<Value>> {
        let request_id = self.ids.next();
        let rx = self.table.register(request_id.clone()).await;

        let frame = serde_json::json!({
            "type": "control_request",
            "request_id": request_id,
            "request": payload,
        });

        if let Err(err) = self.transport.write(&frame).await {
            self.table.remove(&request_id).await;
            return Err(err);
        }

        tokio::select! {
            outcome = rx => {
                match outcome {
                    Ok(completion) => completion,
                    Err(_) => Err(Error::ConnectionClosed),
                }
            }
            () = cancellation.cancelled() => {
                self.table.remove(&request_id).await;
                Err(Error::Cancelled)
            }
        }
    }

    pub fn request_id_generator(&self) -> &RequestIdGenerator {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;
    use serde_json::json;

    #[test]
    fn test_request_id_generator_produces_prefixed_unique_ids() {
        let gen = RequestIdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert_ne!(a, b);
        assert!(a.starts_with("req_0_"));
        assert!(b.starts_with("req_1_"));
    }

    #[tokio::test]
    async fn test_request_id_generator_is_unique_under_concurrency() {
        let gen = Arc::new(RequestIdGenerator::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let gen = gen.clone();
            handles.push(tokio::spawn(async move { gen.next() }));
        }
        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn test_correlation_table_completes_success() {
        let table = CorrelationTable::new();
        let rx = table.register("req_0_aaaaaaaa".to_string()).await;

        let completed = table
            .complete(ControlResponsePayload::Success {
                request_id: "req_0_aaaaaaaa".to_string(),
                response: Some(json!({"ok": true})),
            })
            .await;
        assert!(completed);

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.unwrap(), Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_correlation_table_completes_error() {
        let table = CorrelationTable::new();
        let rx = table.register("req_0_bbbbbbbb".to_string()).await;

        table
            .complete(ControlResponsePayload::Error {
                request_id: "req_0_bbbbbbbb".to_string(),
                error: "boom".to_string(),
            })
            .await;

        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Err(Error::Cli(_))));
    }

    #[tokio::test]
    async fn test_correlation_table_unknown_request_id_returns_false() {
        let table = CorrelationTable::new();
        let completed = table
            .complete(ControlResponsePayload::Success {
                request_id: "nope".to_string(),
                response: None,
            })
            .await;
        assert!(!completed);
    }

    #[tokio::test]
    async fn test_correlation_table_shutdown_drains_pending() {
        let table = CorrelationTable::new();
        let rx = table.register("req_0_cccccccc".to_string()).await;
        table.shutdown().await;
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Err(Error::ConnectionClosed)));
        assert_eq!(table.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_control_client_call_round_trip() {
        let (transport, _inbound_tx, mut outbound_rx) = InMemoryTransport::pair();
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let table = Arc::new(CorrelationTable::new());
        let client = ControlClient::new(transport.clone(), table.clone());

        let cancellation = CancellationToken::new();
        let call = tokio::spawn({
            let table = table.clone();
            async move {
                let client = ControlClient::new(transport, table);
                client
                    .call(ControlRequestPayload::Interrupt, &cancellation)
                    .await
            }
        });

        let outbound = outbound_rx.recv().await.unwrap();
        let request_id = outbound["request_id"].as_str().unwrap().to_string();
        assert_eq!(outbound["request"]["subtype"], "interrupt");

        table
            .complete(ControlResponsePayload::Success {
                request_id,
                response: None,
            })
            .await;

        let result = call.await.unwrap();
        assert!(result.is_ok());
        let _ = client;
    }

    #[tokio::test]
    async fn test_control_client_call_cancelled() {
        let (transport, _inbound_tx, _outbound_rx) = InMemoryTransport::pair();
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let table = Arc::new(CorrelationTable::new());
        let client = ControlClient::new(transport, table.clone());

        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let result = client
            .call(ControlRequestPayload::Interrupt, &cancellation)
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(table.pending_count().await, 0);
    }
}
