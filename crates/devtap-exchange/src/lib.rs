//! devtap-exchange library entry point.
//!
//! # What does the exchange do?
//!
//! A GraphQL client processes requests through a pipeline of *exchanges*.
//! The devtools exchange sits in that pipeline and reports everything that
//! passes through it to an external inspector (a browser extension panel or
//! a standalone desktop app):
//!
//! 1. On installation it announces itself with an `init` message.
//! 2. Every operation is reported as an `execution` (or `teardown`) event
//!    before it moves on; every result as an `update` (or `error`) event.
//! 3. The inspector can ask for the exchange version, complete a handshake,
//!    or have the exchange run a query through the client.
//!
//! Values are never modified apart from filling in `meta.source`, and the
//! exchange installs as a pure pass-through when instrumentation is disabled
//! or the host has no usable transport.
//!
//! ```ignore
//! let config = load_config(None)?;
//! let exchange = devtools_exchange(&config).with_source_namer(|| "TodoList".to_string());
//! let handle = exchange.handle();
//! let pipeline = exchange.install(client.clone(), fetch_exchange);
//! // ...
//! handle.disconnect();
//! ```

/// Application layer: the tap, dispatch, executor, and ports.
pub mod application;

/// Domain layer: exchange configuration.
pub mod domain;

/// Infrastructure layer: messengers, config loading, in-memory client.
pub mod infrastructure;

/// Host runtime probing and detached spawning.
pub mod runtime;

pub use application::client::{Client, ExchangeIo, OperationStream, ResultStream, SourceNamer};
pub use application::exchange::DevtoolsExchange;
pub use application::messenger::{MessageListener, Messenger};
pub use application::status::{InstrumentationHandle, InstrumentationStatus};
pub use domain::config::{ExchangeConfig, TransportKind};
pub use infrastructure::config_loader::{load_config, ConfigError};
pub use infrastructure::messenger::{select_messenger, TransportError};

/// Builds an exchange from `config`, selecting the messenger for the
/// current host.  Falls back to a pass-through exchange when disabled or
/// when no transport is viable.
pub fn devtools_exchange(config: &ExchangeConfig) -> DevtoolsExchange {
    DevtoolsExchange::from_messenger(select_messenger(config))
}
