//! Infrastructure layer for the exchange.
//!
//! Contains the adapters behind the application ports: concrete messengers,
//! configuration loading, and an in-memory client for the demo binary.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `devtap_core`, but MUST NOT be imported by the `application` or domain
//! layers.
//!
//! # Sub-modules
//!
//! - **`messenger`** – window messaging, the reconnecting WebSocket, and the
//!   recording mocks, plus transport selection.
//! - **`config_loader`** – TOML file and `DEVTAP_*` environment loading.
//! - **`memory_client`** – a [`Client`](crate::application::client::Client)
//!   that answers operations in-process (native targets only).

pub mod config_loader;
pub mod messenger;

#[cfg(not(target_arch = "wasm32"))]
pub mod memory_client;
