//! Executes query text sent by the inspector.
//!
//! The inspector can ask the exchange to run an arbitrary document.  The
//! resulting operation goes through the client's normal pipeline, so its
//! execution and result are reported by the tap like any other traffic;
//! the executor itself only keeps the first result alive long enough for the
//! request to complete.

use std::sync::{Arc, OnceLock};

use futures_util::StreamExt;
use regex::Regex;
use tracing::{debug, trace};

use devtap_core::{
    protocol::messages::INSPECTOR_SOURCE, GraphQLRequest, Operation, OperationKind, OperationMeta,
};

use crate::application::client::Client;
use crate::runtime::spawn_detached;

/// `mutation` keyword at a statement boundary.
const MUTATION_PATTERN: &str = r"(^|\W)+mutation\W";

fn mutation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MUTATION_PATTERN).expect("mutation pattern is valid"))
}

/// Classifies query text.
///
/// Anything that is not a mutation is run as a query; subscriptions cannot
/// be started from the inspector.
pub fn classify_query(query: &str) -> OperationKind {
    if mutation_regex().is_match(query) {
        OperationKind::Mutation
    } else {
        OperationKind::Query
    }
}

/// Issues `query` against `client` and returns the created operation.
///
/// The operation is keyed by the fingerprint of the exact text and carries
/// `meta.source = "Devtools"`.  Only the first result is awaited, on a
/// detached task; the stream is dropped afterwards.  There is no timeout and
/// no retry.
pub fn execute_query<C: Client + ?Sized>(client: &Arc<C>, query: &str) -> Operation {
    let kind = classify_query(query);
    let request = GraphQLRequest::new(query);
    let operation =
        client.create_request_operation(kind, request, OperationMeta::with_source(INSPECTOR_SOURCE));

    debug!(key = %operation.key, kind = kind.as_str(), "executing inspector request");

    let mut results = client.execute_request_operation(operation.clone());
    let key = operation.key;
    spawn_detached(async move {
        match results.next().await {
            Some(result) => trace!(%key, is_error = result.is_error(), "inspector request settled"),
            None => trace!(%key, "inspector request ended without a result"),
        }
    });

    operation
}
