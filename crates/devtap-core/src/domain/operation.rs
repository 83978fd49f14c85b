//! Operations and results flowing through a client pipeline.
//!
//! These types describe what the host client hands to the exchange.  The
//! client owns them; the exchange only reads them and, for operations,
//! augments the [`OperationMeta`] bag with provenance.
//!
//! Field names serialize in camelCase because the inspector on the other end
//! of the wire is usually a JavaScript program.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::fingerprint::{fingerprint, OperationKey};

/// What an operation asks the client to do.
///
/// `Teardown` is reserved: it does not fetch anything, it cancels the
/// previously issued operation with the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    Teardown,
}

impl OperationKind {
    /// Wire name of the kind (`"query"`, `"teardown"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
            OperationKind::Teardown => "teardown",
        }
    }
}

/// A query document plus its variables and fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    pub key: OperationKey,
    pub query: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub variables: Value,
}

impl GraphQLRequest {
    /// Creates a request without variables, keyed by the fingerprint of
    /// `query`'s exact text.
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            key: fingerprint(&query),
            query,
            variables: Value::Null,
        }
    }

    /// Attaches variables.  The key is left unchanged.
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }
}

/// Wire names of the named [`OperationMeta`] fields.  They can never be
/// stored as extra entries.
pub const RESERVED_META_KEYS: [&str; 2] = ["source", "startedAt"];

/// Returned when an extra meta entry would shadow a named field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is a named meta field and cannot be stored as an extra entry")]
pub struct ReservedMetaKey(pub String);

/// Mutable metadata bag attached to every operation.
///
/// `source` records which code location issued the operation, `started_at`
/// is an optional epoch-millisecond timestamp, and any other origin markers
/// a pipeline stage wants to add go into the extra entries.  Extra entries
/// are flattened next to the named fields on the wire, so the map is only
/// reachable through [`insert_extra`](Self::insert_extra), which refuses
/// the named keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl OperationMeta {
    /// A metadata bag carrying only a provenance `source`.
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Stores an extra entry, returning the value it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ReservedMetaKey`] for any of [`RESERVED_META_KEYS`]; set
    /// the named field instead.
    pub fn insert_extra(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, ReservedMetaKey> {
        let key = key.into();
        if RESERVED_META_KEYS.contains(&key.as_str()) {
            return Err(ReservedMetaKey(key));
        }
        Ok(self.extra.insert(key, value))
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn remove_extra(&mut self, key: &str) -> Option<Value> {
        self.extra.remove(key)
    }

    /// All extra entries, in key order.
    pub fn extras(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.extra.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Per-operation context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationContext {
    /// Endpoint the client sends this operation to.
    pub url: String,
    #[serde(default)]
    pub meta: OperationMeta,
}

impl OperationContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            meta: OperationMeta::default(),
        }
    }
}

/// A client-issued request descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub key: OperationKey,
    pub kind: OperationKind,
    pub query: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub variables: Value,
    pub context: OperationContext,
}

impl Operation {
    /// Builds an operation of `kind` from a request.
    pub fn new(kind: OperationKind, request: GraphQLRequest, context: OperationContext) -> Self {
        Self {
            key: request.key,
            kind,
            query: request.query,
            variables: request.variables,
            context,
        }
    }

    /// `true` if this operation cancels an earlier one.
    pub fn is_teardown(&self) -> bool {
        self.kind == OperationKind::Teardown
    }

    /// Returns a teardown operation for the same key.
    pub fn to_teardown(&self) -> Self {
        Self {
            kind: OperationKind::Teardown,
            ..self.clone()
        }
    }

    /// Provenance recorded in the metadata bag, if any.
    pub fn source(&self) -> Option<&str> {
        self.context.meta.source.as_deref()
    }
}

/// Error half of an [`OperationResult`].
///
/// Combines a transport-level failure and any GraphQL errors the server
/// returned.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct CombinedError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_error: Option<String>,
    #[serde(default, rename = "graphQLErrors", skip_serializing_if = "Vec::is_empty")]
    pub graphql_errors: Vec<Value>,
}

impl CombinedError {
    /// A transport failure.
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message: format!("[Network] {message}"),
            network_error: Some(message),
            graphql_errors: Vec::new(),
        }
    }

    /// One or more GraphQL errors reported by the server.
    pub fn graphql(errors: Vec<Value>) -> Self {
        let message = errors
            .iter()
            .map(|e| {
                let text = e.get("message").and_then(Value::as_str).unwrap_or("unknown error");
                format!("[GraphQL] {text}")
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            message,
            network_error: None,
            graphql_errors: errors,
        }
    }
}

/// Outcome the client produced for one operation.
///
/// When `error` is set the result is classified as an error even if `data`
/// is also present (partial results).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CombinedError>,
}

impl OperationResult {
    pub fn success(operation: Operation, data: Value) -> Self {
        Self {
            operation,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(operation: Operation, error: CombinedError) -> Self {
        Self {
            operation,
            data: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
