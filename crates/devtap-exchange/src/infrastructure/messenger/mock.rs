//! Recording test doubles for the transport layer.
//!
//! [`MockMessenger`] stands in for a real inspector connection: every sent
//! message is pushed into a `Mutex<Vec<...>>` so tests can assert on exactly
//! what was sent and in which order, and [`MockMessenger::deliver`] plays an
//! inbound message to the registered listeners.
//!
//! [`MockWindowChannel`] does the same one level lower, for the browser
//! messenger's window channel.
//!
//! ```ignore
//! let messenger = Arc::new(MockMessenger::new());
//! let pipeline = DevtoolsExchange::new(messenger.clone()).install(client, forward);
//!
//! assert_eq!(messenger.sent_types(), vec!["init"]);
//! messenger.deliver(IncomingMessage::ExchangeVersionRequest);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use devtap_core::{IncomingMessage, OutgoingMessage};
use serde_json::Value;

use crate::application::messenger::{MessageListener, Messenger};
use crate::infrastructure::messenger::browser::{WindowChannel, WindowHandler, WindowMessage};

/// A messenger that records sends and lets tests inject inbound messages.
#[derive(Default)]
pub struct MockMessenger {
    sent: Mutex<Vec<OutgoingMessage>>,
    listeners: Mutex<Vec<Arc<MessageListener>>>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message sent so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The `"type"` of every message sent so far.
    pub fn sent_types(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(OutgoingMessage::type_name)
            .collect()
    }

    /// Forgets recorded sends.  Listeners are kept.
    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Invokes every registered listener with `message`.
    pub fn deliver(&self, message: IncomingMessage) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for listener in listeners {
            listener(message.clone());
        }
    }
}

impl Messenger for MockMessenger {
    fn send_message(&self, message: &OutgoingMessage) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
    }

    fn add_message_listener(&self, listener: MessageListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }
}

/// A window channel that records posts and lets tests fire window events.
pub struct MockWindowChannel {
    origin: String,
    posted: Mutex<Vec<(Value, String)>>,
    handlers: Mutex<Vec<Arc<WindowHandler>>>,
}

impl MockWindowChannel {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            posted: Mutex::new(Vec::new()),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Every `(data, target_origin)` pair posted so far.
    pub fn posted(&self) -> Vec<(Value, String)> {
        self.posted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Dispatches a window `message` event to every handler.
    pub fn fire(&self, data: Value, is_trusted: bool) {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for handler in handlers {
            handler(WindowMessage {
                data: data.clone(),
                is_trusted,
            });
        }
    }
}

impl WindowChannel for MockWindowChannel {
    fn origin(&self) -> Option<String> {
        Some(self.origin.clone())
    }

    fn post_message(&self, data: Value, target_origin: &str) {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((data, target_origin.to_string()));
    }

    fn add_message_handler(&self, handler: WindowHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }
}
