//! # devtap-core
//!
//! Shared library for devtap containing the operation data model, the wire
//! messages exchanged with an external inspector, and the JSON codec.
//!
//! This crate is used by the exchange (the pipeline tap installed into a
//! GraphQL client) and by anything that wants to speak the inspector
//! protocol.  It has zero dependencies on async runtimes, sockets, or
//! browser APIs.
//!
//! # Architecture overview
//!
//! - **`domain`** – The values that flow through a client pipeline:
//!   [`Operation`], [`OperationResult`], and the metadata bag the exchange
//!   augments.  Also holds the deterministic query [`fingerprint`].
//!
//! - **`protocol`** – How those values travel to the inspector.  Every
//!   message is a JSON object with a string `"type"` discriminant; the
//!   closed sets of outgoing and incoming shapes live in
//!   [`protocol::messages`], and [`protocol::codec`] turns them into text
//!   frames with a total, placeholder-substituting serializer.

pub mod domain;
pub mod protocol;

pub use domain::fingerprint::{fingerprint, OperationKey};
pub use domain::operation::{
    CombinedError, GraphQLRequest, Operation, OperationContext, OperationKind, OperationMeta,
    OperationResult, ReservedMetaKey, RESERVED_META_KEYS,
};
pub use protocol::codec::{decode_incoming, encode_message, to_transmittable, CodecError};
pub use protocol::messages::{DebugEvent, DebugEventType, IncomingMessage, OutgoingMessage};
