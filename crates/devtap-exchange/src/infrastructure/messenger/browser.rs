//! Window-messaging transport for exchanges running in a browser page.
//!
//! The page and the devtools extension share the window's `message` channel
//! with anything else on the page, so both directions use an envelope:
//!
//! ```json
//! {"type":"urql-devtools-exchange","message":{"type":"init","version":"0.1.0"}}
//! {"type":"urql-devtools-exchange-in","message":{"type":"request","query":"..."}}
//! ```
//!
//! Outgoing envelopes are posted to the page's own origin, never `*`.
//! Inbound events are accepted only when the browser marks them trusted and
//! the envelope carries the inbound tag; everything else on the channel is
//! ignored without error.

use devtap_core::{
    protocol::{
        codec::{decode_incoming_value, encode_value},
        messages::{BROWSER_INCOMING_TAG, BROWSER_OUTGOING_TAG},
    },
    OutgoingMessage,
};
use serde_json::{json, Value};
use tracing::{debug, error, trace};

use crate::application::messenger::{MessageListener, Messenger};

/// One `message` event as seen on the window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    pub data: Value,
    /// `true` if the browser generated the event (not a synthetic
    /// `dispatchEvent` from page script).
    pub is_trusted: bool,
}

/// Handler for raw window `message` events.
pub type WindowHandler = Box<dyn Fn(WindowMessage) + Send + Sync>;

/// The host window's message channel.
pub trait WindowChannel: Send + Sync {
    /// The page's origin, or `None` if there is no window.
    fn origin(&self) -> Option<String>;

    /// `window.postMessage(data, target_origin)`.
    fn post_message(&self, data: Value, target_origin: &str);

    /// `window.addEventListener("message", handler)`.
    fn add_message_handler(&self, handler: WindowHandler);
}

/// Messenger over a [`WindowChannel`].
pub struct BrowserMessenger<W> {
    window: W,
}

impl<W: WindowChannel> BrowserMessenger<W> {
    pub fn new(window: W) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &W {
        &self.window
    }
}

/// Extracts the inner message from an inbound window event, or `None` if
/// the event is not ours.
fn unwrap_envelope(event: WindowMessage) -> Option<Value> {
    if !event.is_trusted {
        return None;
    }
    let Value::Object(mut envelope) = event.data else {
        return None;
    };
    if envelope.get("type").and_then(Value::as_str) != Some(BROWSER_INCOMING_TAG) {
        return None;
    }
    Some(envelope.remove("message").unwrap_or(Value::Null))
}

impl<W: WindowChannel> Messenger for BrowserMessenger<W> {
    fn send_message(&self, message: &OutgoingMessage) {
        let Some(origin) = self.window.origin() else {
            trace!("no window origin; dropping {} message", message.type_name());
            return;
        };
        let payload = match encode_value(message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("{e}");
                return;
            }
        };
        let envelope = json!({ "type": BROWSER_OUTGOING_TAG, "message": payload });
        self.window.post_message(envelope, &origin);
    }

    fn add_message_listener(&self, listener: MessageListener) {
        self.window.add_message_handler(Box::new(move |event| {
            let Some(inner) = unwrap_envelope(event) else {
                return;
            };
            match decode_incoming_value(inner) {
                Ok(message) => listener(message),
                Err(e) => debug!("ignoring inbound window message: {e}"),
            }
        }));
    }
}
