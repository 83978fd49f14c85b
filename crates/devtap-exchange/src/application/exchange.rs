//! The devtools exchange: a pipeline stage that reports every operation and
//! result to the inspector without changing them.
//!
//! # Lifecycle
//!
//! 1. Build a [`DevtoolsExchange`] around a messenger (or
//!    [`DevtoolsExchange::disabled`]).
//! 2. Keep a [`InstrumentationHandle`] from [`DevtoolsExchange::handle`] if
//!    you want to disconnect later.
//! 3. [`install`](DevtoolsExchange::install) it into the client pipeline.
//!    This consumes the exchange, so the handshake happens exactly once.
//!
//! # Tap semantics
//!
//! For each operation, an `execution` (or `teardown`) event is sent before
//! the operation is passed to `forward`.  For each result `forward` yields,
//! an `error` (or `update`) event is sent before the result continues
//! downstream.  Both taps are plain `map`s, so values are never delayed,
//! dropped, reordered or duplicated.
//!
//! Operations the inspector asked for pass through the tap like any other
//! traffic.  They are told apart by `meta.source == "Devtools"`.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::json;
use tracing::{debug, info};

use devtap_core::{
    to_transmittable, DebugEvent, DebugEventType, Operation, OperationResult, OutgoingMessage,
};

use crate::application::client::{
    Client, ExchangeIo, OperationStream, SourceNamer, UnknownSource,
};
use crate::application::dispatch::{Dispatcher, EXCHANGE_VERSION};
use crate::application::messenger::Messenger;
use crate::application::status::{InstrumentationHandle, InstrumentationStatus};

const EXECUTION_MESSAGE: &str = "The client has started an operation.";
const TEARDOWN_MESSAGE: &str = "The operation has been torn down.";
const UPDATE_MESSAGE: &str = "The operation has returned a result.";
const ERROR_MESSAGE: &str = "The operation has returned an error.";

/// A not-yet-installed devtools exchange.
pub struct DevtoolsExchange {
    messenger: Option<Arc<dyn Messenger>>,
    namer: Arc<dyn SourceNamer>,
    status: InstrumentationStatus,
}

impl DevtoolsExchange {
    /// An exchange that reports through `messenger`.
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            messenger: Some(messenger),
            namer: Arc::new(UnknownSource),
            status: InstrumentationStatus::new(),
        }
    }

    /// An exchange that installs as a pure pass-through.
    pub fn disabled() -> Self {
        Self {
            messenger: None,
            namer: Arc::new(UnknownSource),
            status: InstrumentationStatus::new(),
        }
    }

    /// An exchange over `messenger` if there is one, disabled otherwise.
    pub fn from_messenger(messenger: Option<Arc<dyn Messenger>>) -> Self {
        match messenger {
            Some(m) => Self::new(m),
            None => Self::disabled(),
        }
    }

    /// Replaces the heuristic that names an operation's issuing component.
    pub fn with_source_namer(mut self, namer: impl SourceNamer + 'static) -> Self {
        self.namer = Arc::new(namer);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.messenger.is_some()
    }

    /// A handle that outlives installation, for status queries and
    /// disconnecting.
    pub fn handle(&self) -> InstrumentationHandle {
        InstrumentationHandle::new(self.status.clone(), self.messenger.clone())
    }

    /// Installs the exchange in front of `forward`.
    ///
    /// When enabled this sends `init`, subscribes to the client's debug
    /// source, registers the command dispatcher and marks the status active
    /// before returning the tapped pipeline stage.  When disabled `forward`
    /// is returned unchanged.
    pub fn install<C: Client>(self, client: Arc<C>, forward: ExchangeIo) -> ExchangeIo {
        let Some(messenger) = self.messenger else {
            debug!("devtools exchange disabled; installing pass-through");
            return forward;
        };

        messenger.send_message(&OutgoingMessage::Init {
            version: Some(EXCHANGE_VERSION.to_string()),
        });

        let tap = Arc::new(Tap {
            messenger: Arc::clone(&messenger),
            namer: self.namer,
            status: self.status.clone(),
        });

        let relay = Arc::clone(&tap);
        client.subscribe_to_debug_target(Box::new(move |event| relay.emit(event)));

        let dispatcher = Dispatcher::new(
            Arc::clone(&client),
            Arc::clone(&messenger),
            self.status.clone(),
        );
        messenger.add_message_listener(Box::new(move |message| dispatcher.dispatch(message)));

        self.status.mark_active(client.url());
        info!(client_url = client.url(), "devtools exchange installed");

        Box::new(move |operations: OperationStream| {
            let before = Arc::clone(&tap);
            let operations = operations.map(move |op| before.on_operation(op)).boxed();
            forward(operations).map(move |result| tap.on_result(result)).boxed()
        })
    }
}

impl std::fmt::Debug for DevtoolsExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevtoolsExchange")
            .field("enabled", &self.is_enabled())
            .field("status", &self.status)
            .finish()
    }
}

/// State shared by both taps of one installed exchange.
struct Tap {
    messenger: Arc<dyn Messenger>,
    namer: Arc<dyn SourceNamer>,
    status: InstrumentationStatus,
}

impl Tap {
    fn on_operation(&self, mut operation: Operation) -> Operation {
        if !self.status.is_active() {
            return operation;
        }
        if operation.context.meta.source.is_none() {
            operation.context.meta.source = Some(self.namer.source_component());
        }

        let event = if operation.is_teardown() {
            DebugEvent::new(DebugEventType::Teardown, TEARDOWN_MESSAGE, operation.clone(), None)
        } else {
            let data = json!({ "sourceComponent": operation.source() });
            DebugEvent::new(DebugEventType::Execution, EXECUTION_MESSAGE, operation.clone(), Some(data))
        };
        self.send(event);
        operation
    }

    fn on_result(&self, result: OperationResult) -> OperationResult {
        if !self.status.is_active() {
            return result;
        }

        let event = match &result.error {
            Some(err) => DebugEvent::new(
                DebugEventType::Error,
                ERROR_MESSAGE,
                result.operation.clone(),
                Some(json!({ "value": to_transmittable(err) })),
            ),
            None => DebugEvent::new(
                DebugEventType::Update,
                UPDATE_MESSAGE,
                result.operation.clone(),
                Some(json!({ "value": to_transmittable(&result.data) })),
            ),
        };
        self.send(event);
        result
    }

    /// Relays an event from the client's debug source unchanged.
    fn emit(&self, event: DebugEvent) {
        if self.status.is_active() {
            self.send(event);
        }
    }

    fn send(&self, event: DebugEvent) {
        self.messenger.send_message(&OutgoingMessage::debug(event));
    }
}
