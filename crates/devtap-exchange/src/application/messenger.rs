//! The transport port the exchange talks through.
//!
//! Concrete messengers (window messaging, the reconnecting socket, the test
//! mock) live in `infrastructure::messenger`.  Everything above this trait
//! only knows the two operations below.

use devtap_core::{IncomingMessage, OutgoingMessage};

/// Callback invoked once per valid inbound message.
pub type MessageListener = Box<dyn Fn(IncomingMessage) + Send + Sync>;

/// Bidirectional, lossy channel to an external inspector.
pub trait Messenger: Send + Sync {
    /// Sends `message` if the channel is open, otherwise drops it.
    ///
    /// Never blocks and never buffers; there is no delivery guarantee.
    fn send_message(&self, message: &OutgoingMessage);

    /// Registers `listener`.  Registrations are additive and live as long as
    /// the messenger.
    fn add_message_listener(&self, listener: MessageListener);
}
