//! [`WindowChannel`] backed by the real browser window (`wasm32-unknown-unknown`).
//!
//! Values cross the JS boundary as JSON text, parsed and stringified with
//! the page's own `JSON` object, so the extension receives plain structured
//! data exactly as a JavaScript exchange would post it.

use js_sys::JSON;
use serde_json::Value;
use tracing::debug;
use wasm_bindgen::{prelude::*, JsCast};

use crate::infrastructure::messenger::browser::{WindowChannel, WindowHandler, WindowMessage};

/// The page's `window`.
///
/// Holds no JS handles itself; each call looks the window up again, which
/// keeps the type `Send + Sync` as the [`WindowChannel`] contract requires.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebWindow;

impl WebWindow {
    /// `Some` when running in a page with a `window`.
    pub fn detect() -> Option<Self> {
        web_sys::window().map(|_| WebWindow)
    }
}

fn to_js(value: &Value) -> Option<JsValue> {
    let text = serde_json::to_string(value).ok()?;
    JSON::parse(&text).ok()
}

fn from_js(value: &JsValue) -> Value {
    JSON::stringify(value)
        .ok()
        .and_then(|s| s.as_string())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null)
}

impl WindowChannel for WebWindow {
    fn origin(&self) -> Option<String> {
        web_sys::window()?.location().origin().ok()
    }

    fn post_message(&self, data: Value, target_origin: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(js_data) = to_js(&data) else {
            debug!("could not convert outgoing window message to a JS value");
            return;
        };
        if let Err(e) = window.post_message(&js_data, target_origin) {
            debug!("window.postMessage failed: {e:?}");
        }
    }

    fn add_message_handler(&self, handler: WindowHandler) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let callback = Closure::wrap(Box::new(move |event: web_sys::MessageEvent| {
            handler(WindowMessage {
                data: from_js(&event.data()),
                is_trusted: event.is_trusted(),
            });
        }) as Box<dyn FnMut(web_sys::MessageEvent)>);

        if let Err(e) =
            window.add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
        {
            debug!("could not register window message listener: {e:?}");
        }

        // Listeners live as long as the page.
        callback.forget();
    }
}
