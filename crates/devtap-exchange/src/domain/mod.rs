//! Domain types owned by the exchange crate.
//!
//! The operation model and wire messages live in `devtap_core`; this module
//! only adds what is specific to running an exchange, currently its
//! configuration.

pub mod config;

pub use config::{ExchangeConfig, TransportKind};
