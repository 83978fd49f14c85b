//! JSON codec for inspector messages.
//!
//! Wire format: one JSON object per frame, UTF-8 text, no outer framing.
//!
//! # Serialization policy
//!
//! Debug payloads embed values the exchange does not control (result data,
//! errors).  [`to_transmittable`] is the total serializer used for them:
//!
//! - values that serialize cleanly are passed through unchanged;
//! - non-finite floats (`NaN`, `±inf`) become `null`;
//! - a value whose `Serialize` impl fails (non-string map keys, a custom impl
//!   that refuses, ...) is replaced by the string
//!   `"[unserializable: <reason>]"`.
//!
//! A placeholder never aborts the enclosing message, so one bad payload can't
//! take down the tap.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::{IncomingMessage, OutgoingMessage};

/// Prefix of the placeholder substituted for values that fail to serialize.
pub const UNSERIALIZABLE_PLACEHOLDER: &str = "[unserializable";

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The outgoing message could not be turned into JSON text.
    #[error("failed to encode {kind} message: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The frame is not a JSON object with a string `"type"` field, or its
    /// fields do not match the variant.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The frame carried no text.
    #[error("empty frame")]
    Empty,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Converts any serializable value into a transmittable JSON value.
///
/// Never fails; see the module docs for the substitution policy.
///
/// # Examples
///
/// ```rust
/// use devtap_core::to_transmittable;
/// use serde_json::json;
///
/// assert_eq!(to_transmittable(&f64::NAN), json!(null));
/// assert_eq!(to_transmittable(&vec![1, 2]), json!([1, 2]));
/// ```
pub fn to_transmittable<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("{UNSERIALIZABLE_PLACEHOLDER}: {e}]")))
}

/// Encodes an outgoing message as a JSON value (used by window messaging,
/// which posts structured data rather than text).
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_value(message: &OutgoingMessage) -> Result<Value, CodecError> {
    serde_json::to_value(message).map_err(|source| CodecError::Encode {
        kind: message.type_name(),
        source,
    })
}

/// Encodes an outgoing message as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use devtap_core::{encode_message, OutgoingMessage};
///
/// let text = encode_message(&OutgoingMessage::Disconnect).unwrap();
/// assert_eq!(text, r#"{"type":"disconnect"}"#);
/// ```
pub fn encode_message(message: &OutgoingMessage) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(|source| CodecError::Encode {
        kind: message.type_name(),
        source,
    })
}

/// Decodes one inbound text frame.
///
/// Unrecognised `"type"` values decode to [`IncomingMessage::Unknown`];
/// anything that is not a tagged JSON object is an error.
///
/// # Errors
///
/// Returns [`CodecError::Empty`] for blank frames and
/// [`CodecError::Malformed`] for invalid JSON.
pub fn decode_incoming(text: &str) -> Result<IncomingMessage, CodecError> {
    if text.trim().is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_str(text)?)
}

/// Decodes an inbound message that arrived as structured data.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the value is not a tagged object.
pub fn decode_incoming_value(value: Value) -> Result<IncomingMessage, CodecError> {
    Ok(serde_json::from_value(value)?)
}

/// Decodes a frame produced by [`encode_message`].  Inspectors use this; the
/// exchange never reads its own messages.
///
/// # Errors
///
/// Returns [`CodecError`] if the frame is empty or malformed.
pub fn decode_outgoing(text: &str) -> Result<OutgoingMessage, CodecError> {
    if text.trim().is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_str(text)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
