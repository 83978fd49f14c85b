//! Integration tests for the devtap-core JSON codec.
//!
//! These tests verify that every wire message survives an encode/decode round
//! trip through the public API unchanged, and that debug envelopes built from
//! realistic operations keep their shape on the wire.

use devtap_core::{
    encode_message, fingerprint,
    protocol::{decode_incoming, decode_outgoing, messages::EXCHANGE_SOURCE},
    to_transmittable, CombinedError, DebugEvent, DebugEventType, GraphQLRequest, IncomingMessage,
    Operation, OperationContext, OperationKind, OperationMeta, OutgoingMessage,
};
use serde_json::json;

/// Encodes an outgoing message and decodes it again.
fn roundtrip(msg: &OutgoingMessage) -> OutgoingMessage {
    let text = encode_message(msg).expect("encode must succeed");
    decode_outgoing(&text).expect("decode must succeed")
}

fn todo_operation() -> Operation {
    let mut context = OperationContext::new("http://localhost:4000/graphql");
    context.meta = OperationMeta::with_source("TodoList");
    context.meta.insert_extra("cacheOutcome", json!("miss")).unwrap();
    Operation::new(
        OperationKind::Query,
        GraphQLRequest::new("query { todos { id } }").with_variables(json!({ "first": 10 })),
        context,
    )
}

#[test]
fn test_roundtrip_init_with_version() {
    let original = OutgoingMessage::Init {
        version: Some("0.1.0".into()),
    };
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_init_without_version() {
    let original = OutgoingMessage::Init { version: None };
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_declare_version() {
    let original = OutgoingMessage::DeclareVersion {
        version: "2.0.0".into(),
    };
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_connection_acknowledge() {
    let original = OutgoingMessage::ConnectionAcknowledge {
        version: "0.1.0".into(),
    };
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_disconnect() {
    assert_eq!(OutgoingMessage::Disconnect, roundtrip(&OutgoingMessage::Disconnect));
}

#[test]
fn test_roundtrip_execution_debug_event() {
    let original = OutgoingMessage::debug(
        DebugEvent::new(
            DebugEventType::Execution,
            "The client has started an operation.",
            todo_operation(),
            Some(json!({ "sourceComponent": "TodoList" })),
        )
        .at(1_700_000_000_000),
    );
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_error_debug_event_with_combined_error() {
    let error = CombinedError::graphql(vec![json!({ "message": "not allowed", "path": ["todos"] })]);
    let original = OutgoingMessage::debug(DebugEvent::new(
        DebugEventType::Error,
        "The operation returned an error.",
        todo_operation(),
        Some(json!({ "value": to_transmittable(&error) })),
    ));
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_custom_debug_event() {
    let mut event = DebugEvent::new(
        DebugEventType::Custom("cacheHit".into()),
        "served from cache",
        todo_operation(),
        None,
    );
    event.source = "cacheExchange".into();
    let original = OutgoingMessage::debug(event);
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_debug_event_with_null_payload() {
    let original = OutgoingMessage::debug(
        DebugEvent::new(
            DebugEventType::Custom("cacheMiss".into()),
            "nothing cached",
            todo_operation(),
            Some(serde_json::Value::Null),
        )
        .at(7),
    );
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_debug_event_without_operation() {
    let mut event = DebugEvent::detached(
        DebugEventType::Custom("cacheCleared".into()),
        "the cache was reset",
        Some(json!({ "entries": 12 })),
    );
    event.source = "cacheExchange".into();
    let original = OutgoingMessage::debug(event);
    assert_eq!(original, roundtrip(&original));
}

#[test]
fn test_roundtrip_operation_with_extra_meta_entries() {
    // Arrange
    let mut operation = todo_operation();
    operation.context.meta.started_at = Some(1_700_000_000_000);
    operation
        .context
        .meta
        .insert_extra("requestPolicy", json!("cache-and-network"))
        .unwrap();
    assert!(operation.context.meta.insert_extra("source", json!("FromExtra")).is_err());
    assert!(operation.context.meta.insert_extra("startedAt", json!("yesterday")).is_err());
    let original = OutgoingMessage::debug(
        DebugEvent::new(DebugEventType::Execution, "started", operation, None).at(3),
    );

    // Act
    let text = encode_message(&original).unwrap();

    // Assert
    assert_eq!(text.matches("\"source\"").count(), 2, "frame: {text}");
    assert_eq!(original, decode_outgoing(&text).unwrap());
}

#[test]
fn test_roundtrip_all_incoming_messages() {
    let messages = [
        IncomingMessage::Request {
            query: "mutation { addTodo { id } }".into(),
        },
        IncomingMessage::ExchangeVersionRequest,
        IncomingMessage::ConnectionInit {
            version: Some("1".into()),
        },
        IncomingMessage::ConnectionInit { version: None },
    ];
    for original in messages {
        let text = serde_json::to_string(&original).unwrap();
        assert_eq!(original, decode_incoming(&text).unwrap(), "frame: {text}");
    }
}

#[test]
fn test_debug_envelope_wire_shape() {
    // Arrange
    let msg = OutgoingMessage::debug(
        DebugEvent::new(
            DebugEventType::Update,
            "The operation returned a result.",
            todo_operation(),
            Some(json!({ "value": { "todos": [] } })),
        )
        .at(42),
    );

    // Act
    let value: serde_json::Value =
        serde_json::from_str(&encode_message(&msg).unwrap()).unwrap();

    // Assert
    assert_eq!(value["type"], "debug");
    assert_eq!(value["data"]["type"], "update");
    assert_eq!(value["data"]["source"], EXCHANGE_SOURCE);
    assert_eq!(value["data"]["timestamp"], 42);
    assert_eq!(value["data"]["data"]["value"], json!({ "todos": [] }));
    assert_eq!(value["data"]["operation"]["kind"], "query");
    assert_eq!(
        value["data"]["operation"]["key"],
        json!(fingerprint("query { todos { id } }").value())
    );
    assert_eq!(value["data"]["operation"]["context"]["meta"]["source"], "TodoList");
    assert_eq!(value["data"]["operation"]["context"]["meta"]["cacheOutcome"], "miss");
}
