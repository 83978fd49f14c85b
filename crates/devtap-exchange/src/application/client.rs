//! Ports to the host GraphQL client.
//!
//! The exchange never reimplements the client.  It consumes it through the
//! [`Client`] trait (operation factory, execution, and the debug-event
//! source other pipeline stages report into) and through [`SourceNamer`],
//! which names the code location that issued an operation.
//!
//! # Pipeline shape
//!
//! A client pipeline is a chain of exchanges.  Each one receives a stream of
//! operations and returns a stream of results, delegating to the next stage
//! through a `forward` function of the same shape:
//!
//! ```text
//! ops ──► [devtools tap] ──► forward(ops) ──► results ──► [devtools tap] ──► downstream
//! ```

use futures_util::stream::BoxStream;

use devtap_core::{DebugEvent, GraphQLRequest, Operation, OperationKind, OperationMeta, OperationResult};

/// Stream of operations entering a pipeline stage.
pub type OperationStream = BoxStream<'static, Operation>;

/// Stream of results leaving a pipeline stage.
pub type ResultStream = BoxStream<'static, OperationResult>;

/// One pipeline stage: turns an operation stream into a result stream.
///
/// `forward` (the next stage) and the value returned by
/// [`DevtoolsExchange::install`](crate::application::exchange::DevtoolsExchange::install)
/// both have this type.
pub type ExchangeIo = Box<dyn FnOnce(OperationStream) -> ResultStream + Send>;

/// Callback receiving events from the client's debug source.
pub type DebugSink = Box<dyn Fn(DebugEvent) + Send + Sync>;

/// The host client, as seen by the exchange.
pub trait Client: Send + Sync + 'static {
    /// Endpoint the client talks to.
    fn url(&self) -> &str;

    /// Builds an operation of `kind` for `request`, with `meta` merged into
    /// the context the client would normally create.
    fn create_request_operation(
        &self,
        kind: OperationKind,
        request: GraphQLRequest,
        meta: OperationMeta,
    ) -> Operation;

    /// Issues `operation` through the full pipeline (including the tap) and
    /// returns its result stream.  Dropping the stream tears the operation
    /// down.
    fn execute_request_operation(&self, operation: Operation) -> ResultStream;

    /// Registers `sink` to receive every debug event other pipeline stages
    /// report.  The subscription lasts for the client's lifetime.
    fn subscribe_to_debug_target(&self, sink: DebugSink);
}

/// Names the code location (component, call site) that issued an operation.
pub trait SourceNamer: Send + Sync {
    fn source_component(&self) -> String;
}

/// Name reported when no better heuristic is available.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// A [`SourceNamer`] that always answers [`UNKNOWN_SOURCE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownSource;

impl SourceNamer for UnknownSource {
    fn source_component(&self) -> String {
        UNKNOWN_SOURCE.to_string()
    }
}

impl<F> SourceNamer for F
where
    F: Fn() -> String + Send + Sync,
{
    fn source_component(&self) -> String {
        self()
    }
}
