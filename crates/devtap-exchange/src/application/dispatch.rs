//! Routing of inspector commands.
//!
//! Every [`IncomingMessage`] variant is matched exhaustively, so adding a new
//! command to the protocol fails to compile until it is handled here.
//!
//! Commands are only answered while the exchange is active.  Once the
//! instrumentation handle disconnects, inbound messages are dropped.

use std::sync::Arc;

use devtap_core::{IncomingMessage, OutgoingMessage};
use tracing::{debug, trace};

use crate::application::client::Client;
use crate::application::executor::execute_query;
use crate::application::messenger::Messenger;
use crate::application::status::InstrumentationStatus;

/// Version string reported in handshake and version replies.
pub const EXCHANGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Handles inspector commands for one installed exchange.
pub struct Dispatcher<C: ?Sized> {
    client: Arc<C>,
    messenger: Arc<dyn Messenger>,
    status: InstrumentationStatus,
}

impl<C: Client + ?Sized> Dispatcher<C> {
    pub fn new(
        client: Arc<C>,
        messenger: Arc<dyn Messenger>,
        status: InstrumentationStatus,
    ) -> Self {
        Self {
            client,
            messenger,
            status,
        }
    }

    /// Reacts to one inbound message.
    pub fn dispatch(&self, message: IncomingMessage) {
        if !self.status.is_active() {
            trace!("exchange inactive; dropping {} command", message.type_name());
            return;
        }
        match message {
            IncomingMessage::Request { query } => {
                execute_query(&self.client, &query);
            }
            IncomingMessage::ExchangeVersionRequest => {
                self.messenger.send_message(&OutgoingMessage::DeclareVersion {
                    version: EXCHANGE_VERSION.to_string(),
                });
            }
            IncomingMessage::ConnectionInit { version } => {
                debug!(
                    inspector_version = version.as_deref().unwrap_or("unknown"),
                    "inspector connected"
                );
                self.messenger.send_message(&OutgoingMessage::ConnectionAcknowledge {
                    version: EXCHANGE_VERSION.to_string(),
                });
            }
            IncomingMessage::Unknown => {
                trace!("ignoring unrecognised inspector command");
            }
        }
    }
}
