//! A small in-process [`Client`] with a pluggable pipeline.
//!
//! Used by the `devtap-demo` binary to drive real traffic through the
//! exchange without a GraphQL server.  Operations are pushed into an
//! unbounded channel that feeds the installed pipeline; a router task fans
//! results back out to whoever executed the operation, matched by key.
//!
//! The terminal stage ([`MemoryClient::fetch_exchange`]) answers every
//! non-teardown operation with the configured [`Responder`] and reports a
//! `fetchRequest` debug event through the client's debug source, the way a
//! real fetch stage would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{stream, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use devtap_core::{
    protocol::messages::now_millis, DebugEvent, DebugEventType, GraphQLRequest, Operation,
    OperationContext, OperationKey, OperationKind, OperationMeta, OperationResult,
};

use crate::application::client::{Client, DebugSink, ExchangeIo, OperationStream, ResultStream};

/// Produces the result for one operation.
pub type Responder = Arc<dyn Fn(&Operation) -> OperationResult + Send + Sync>;

type Subscribers = HashMap<OperationKey, Vec<mpsc::UnboundedSender<OperationResult>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory client.
pub struct MemoryClient {
    url: String,
    responder: Responder,
    operations: Mutex<Option<mpsc::UnboundedSender<Operation>>>,
    subscribers: Arc<Mutex<Subscribers>>,
    debug_sinks: Arc<Mutex<Vec<Arc<DebugSink>>>>,
}

impl MemoryClient {
    pub fn new(url: impl Into<String>, responder: Responder) -> Arc<Self> {
        Arc::new(Self {
            url: url.into(),
            responder,
            operations: Mutex::new(None),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            debug_sinks: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// The terminal pipeline stage: answers operations with the responder.
    pub fn fetch_exchange(&self) -> ExchangeIo {
        let responder = Arc::clone(&self.responder);
        let sinks = Arc::clone(&self.debug_sinks);
        Box::new(move |operations: OperationStream| {
            operations
                .filter(|op| std::future::ready(!op.is_teardown()))
                .map(move |op| {
                    let event = DebugEvent {
                        source: "fetchExchange".to_string(),
                        ..DebugEvent::new(
                            DebugEventType::Custom("fetchRequest".to_string()),
                            "A fetch request is being executed.",
                            op.clone(),
                            Some(json!({ "url": op.context.url })),
                        )
                    };
                    let current = lock(&sinks).clone();
                    for sink in current {
                        sink(event.clone());
                    }
                    responder(&op)
                })
                .boxed()
        })
    }

    /// Starts routing operations through `pipeline`.
    ///
    /// Must be called from within a tokio runtime.  Calling it again
    /// replaces the previous pipeline.
    pub fn start(&self, pipeline: ExchangeIo) {
        let (tx, rx) = mpsc::unbounded_channel::<Operation>();
        let operations = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|op| (op, rx))
        })
        .boxed();
        let mut results = pipeline(operations);

        let subscribers = Arc::clone(&self.subscribers);
        tokio::spawn(async move {
            while let Some(result) = results.next().await {
                let key = result.operation.key;
                let mut routes = lock(&subscribers);
                match routes.get_mut(&key) {
                    Some(senders) => {
                        senders.retain(|tx| tx.send(result.clone()).is_ok());
                        if senders.is_empty() {
                            routes.remove(&key);
                        }
                    }
                    None => trace!(%key, "result without a subscriber"),
                }
            }
            debug!("client pipeline ended");
        });

        *lock(&self.operations) = Some(tx);
    }

    /// Convenience for issuing `query` on behalf of `source`.
    pub fn issue(&self, kind: OperationKind, query: &str, source: &str) -> ResultStream {
        let operation = self.create_request_operation(
            kind,
            GraphQLRequest::new(query),
            OperationMeta::with_source(source),
        );
        self.execute_request_operation(operation)
    }

    fn push(&self, operation: Operation) {
        match lock(&self.operations).as_ref() {
            Some(tx) => {
                let _ = tx.send(operation);
            }
            None => warn!("client pipeline not started; dropping operation {}", operation.key),
        }
    }
}

/// Sends a teardown for its operation when the result stream is dropped.
struct TeardownOnDrop {
    operation: Operation,
    operations: Option<mpsc::UnboundedSender<Operation>>,
}

impl Drop for TeardownOnDrop {
    fn drop(&mut self) {
        if let Some(tx) = &self.operations {
            let _ = tx.send(self.operation.to_teardown());
        }
    }
}

impl Client for MemoryClient {
    fn url(&self) -> &str {
        &self.url
    }

    fn create_request_operation(
        &self,
        kind: OperationKind,
        request: GraphQLRequest,
        meta: OperationMeta,
    ) -> Operation {
        let mut context = OperationContext::new(self.url.clone());
        context.meta = meta;
        context.meta.started_at.get_or_insert_with(now_millis);
        Operation::new(kind, request, context)
    }

    fn execute_request_operation(&self, operation: Operation) -> ResultStream {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers)
            .entry(operation.key)
            .or_default()
            .push(tx);

        let guard = TeardownOnDrop {
            operation: operation.clone(),
            operations: lock(&self.operations).clone(),
        };
        self.push(operation);

        stream::unfold((rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|result| (result, (rx, guard)))
        })
        .boxed()
    }

    fn subscribe_to_debug_target(&self, sink: DebugSink) {
        lock(&self.debug_sinks).push(Arc::new(sink));
    }
}
