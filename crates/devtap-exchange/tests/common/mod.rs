//! Shared fixtures for the devtap-exchange integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{stream, StreamExt};
use serde_json::json;

use devtap_core::{
    DebugEvent, GraphQLRequest, Operation, OperationContext, OperationKind, OperationMeta,
    OperationResult,
};
use devtap_exchange::application::client::DebugSink;
use devtap_exchange::{Client, ExchangeIo, OperationStream, ResultStream};

pub const CLIENT_URL: &str = "http://localhost:4000/graphql";

/// A client that records what the exchange asks of it.
///
/// `execute_request_operation` does not run a pipeline; it records the
/// operation and answers with one canned success result.
#[derive(Default)]
pub struct RecordingClient {
    created: Mutex<Vec<Operation>>,
    executed: Mutex<Vec<Operation>>,
    sinks: Mutex<Vec<Arc<DebugSink>>>,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> Vec<Operation> {
        self.created.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn executed(&self) -> Vec<Operation> {
        self.executed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Reports `event` the way another pipeline stage would.
    pub fn report(&self, event: DebugEvent) {
        let sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for sink in sinks {
            sink(event.clone());
        }
    }
}

impl Client for RecordingClient {
    fn url(&self) -> &str {
        CLIENT_URL
    }

    fn create_request_operation(
        &self,
        kind: OperationKind,
        request: GraphQLRequest,
        meta: OperationMeta,
    ) -> Operation {
        let mut context = OperationContext::new(CLIENT_URL);
        context.meta = meta;
        let operation = Operation::new(kind, request, context);
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation.clone());
        operation
    }

    fn execute_request_operation(&self, operation: Operation) -> ResultStream {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation.clone());
        let result = OperationResult::success(operation, json!({ "canned": true }));
        stream::iter(vec![result]).boxed()
    }

    fn subscribe_to_debug_target(&self, sink: DebugSink) {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(sink));
    }
}

/// Builds an operation of `kind` for `query` with the given source.
pub fn operation(kind: OperationKind, query: &str, source: Option<&str>) -> Operation {
    let mut context = OperationContext::new(CLIENT_URL);
    context.meta = match source {
        Some(source) => OperationMeta::with_source(source),
        None => OperationMeta::default(),
    };
    Operation::new(kind, GraphQLRequest::new(query), context)
}

/// A terminal stage that answers every non-teardown operation with
/// `{"echo": <query>}`.
pub fn echo_forward() -> ExchangeIo {
    Box::new(|operations: OperationStream| {
        operations
            .filter(|op| std::future::ready(!op.is_teardown()))
            .map(|op| {
                let data = json!({ "echo": op.query });
                OperationResult::success(op, data)
            })
            .boxed()
    })
}

/// Runs `ops` through `pipeline` and collects every result.
pub async fn drive(pipeline: ExchangeIo, ops: Vec<Operation>) -> Vec<OperationResult> {
    pipeline(stream::iter(ops).boxed()).collect().await
}
