//! Wire messages exchanged with an external inspector.
//!
//! Every message is a JSON object with a `"type"` field that identifies the
//! variant; all other fields sit in the same object:
//!
//! ```json
//! {"type":"init","version":"0.1.0"}
//! {"type":"request","query":"query { todos { id } }"}
//! {"type":"debug","data":{"type":"execution","message":"...","operation":{...},"source":"devtoolsExchange","timestamp":1700000000000}}
//! ```
//!
//! The two directions are separate enums so it is a compile-time error to send
//! an inspector command from the exchange, or the other way around.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::operation::Operation;

/// `source` of every debug event the exchange itself constructs.
pub const EXCHANGE_SOURCE: &str = "devtoolsExchange";

/// Provenance marker placed in `meta.source` of operations the inspector
/// asked the exchange to execute.
pub const INSPECTOR_SOURCE: &str = "Devtools";

/// Outer envelope tag on window messages posted by the exchange.
pub const BROWSER_OUTGOING_TAG: &str = "urql-devtools-exchange";

/// Outer envelope tag on window messages the exchange accepts.
pub const BROWSER_INCOMING_TAG: &str = "urql-devtools-exchange-in";

// ── Debug events ──────────────────────────────────────────────────────────────

/// Discriminant of a [`DebugEvent`].
///
/// The four named kinds are produced by the tap.  Other pipeline stages may
/// report their own event kinds through the client's debug source; those are
/// preserved verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DebugEventType {
    /// An operation was handed to the pipeline.
    Execution,
    /// An operation was cancelled.
    Teardown,
    /// A result with data came back.
    Update,
    /// A result with an error came back.
    Error,
    Custom(String),
}

impl DebugEventType {
    pub fn as_str(&self) -> &str {
        match self {
            DebugEventType::Execution => "execution",
            DebugEventType::Teardown => "teardown",
            DebugEventType::Update => "update",
            DebugEventType::Error => "error",
            DebugEventType::Custom(name) => name,
        }
    }
}

impl fmt::Display for DebugEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DebugEventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "execution" => DebugEventType::Execution,
            "teardown" => DebugEventType::Teardown,
            "update" => DebugEventType::Update,
            "error" => DebugEventType::Error,
            _ => DebugEventType::Custom(s),
        }
    }
}

impl From<&str> for DebugEventType {
    fn from(s: &str) -> Self {
        DebugEventType::from(s.to_string())
    }
}

impl From<DebugEventType> for String {
    fn from(kind: DebugEventType) -> Self {
        match kind {
            DebugEventType::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

/// Structured description of one observed pipeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEvent {
    #[serde(rename = "type")]
    pub kind: DebugEventType,
    /// Human-readable summary.
    pub message: String,
    /// The operation the event is about.  Events relayed from other
    /// pipeline stages may not concern a single operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    /// Kind-specific payload (`sourceComponent`, `value`, ...).
    ///
    /// `None` means the field is absent; `Some(Value::Null)` is an explicit
    /// `"data": null` and survives a round trip as such.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
    pub source: String,
    /// Capture time, Unix epoch milliseconds.
    pub timestamp: u64,
}

/// Maps a present field to `Some`, including a literal `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl DebugEvent {
    /// Creates an event about `operation`, stamped with the exchange source
    /// and the current time.
    pub fn new(
        kind: DebugEventType,
        message: impl Into<String>,
        operation: Operation,
        data: Option<Value>,
    ) -> Self {
        Self {
            operation: Some(operation),
            ..Self::detached(kind, message, data)
        }
    }

    /// Creates an event that is not about any particular operation.
    pub fn detached(kind: DebugEventType, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            data,
            source: EXCHANGE_SOURCE.to_string(),
            timestamp: now_millis(),
        }
    }

    /// Replaces the capture time.
    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Exchange → inspector ──────────────────────────────────────────────────────

/// Messages the exchange sends to the inspector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutgoingMessage {
    /// Announces that the client is instrumented.
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    /// Answer to a version query.
    DeclareVersion { version: String },
    /// Answer to the inspector's `connection-init`.
    ConnectionAcknowledge { version: String },
    /// One observed pipeline event.
    Debug { data: DebugEvent },
    /// The exchange is going away.
    Disconnect,
}

impl OutgoingMessage {
    /// Wraps a debug event.
    pub fn debug(event: DebugEvent) -> Self {
        OutgoingMessage::Debug { data: event }
    }

    /// The `"type"` discriminant as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutgoingMessage::Init { .. } => "init",
            OutgoingMessage::DeclareVersion { .. } => "declare-version",
            OutgoingMessage::ConnectionAcknowledge { .. } => "connection-acknowledge",
            OutgoingMessage::Debug { .. } => "debug",
            OutgoingMessage::Disconnect => "disconnect",
        }
    }
}

// ── Inspector → exchange ──────────────────────────────────────────────────────

/// Commands the inspector sends to the exchange.
///
/// Any `"type"` outside the known set decodes to [`IncomingMessage::Unknown`]
/// rather than failing, so new inspector commands never break an older
/// exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IncomingMessage {
    /// Execute `query` through the client.
    #[serde(alias = "execute-query")]
    Request { query: String },
    /// Ask which exchange version is running.
    #[serde(alias = "get-version")]
    ExchangeVersionRequest,
    /// Inspector side of the connection handshake.
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl IncomingMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            IncomingMessage::Request { .. } => "request",
            IncomingMessage::ExchangeVersionRequest => "exchange-version-request",
            IncomingMessage::ConnectionInit { .. } => "connection-init",
            IncomingMessage::Unknown => "unknown",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
