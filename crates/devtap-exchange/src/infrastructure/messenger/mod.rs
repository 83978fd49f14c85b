//! Concrete [`Messenger`] implementations and transport selection.
//!
//! - **`browser`** – window messaging over a [`browser::WindowChannel`].
//! - **`web`** – the real browser window (`wasm32-unknown-unknown` only).
//! - **`native`** – the reconnecting WebSocket (native targets only).
//! - **`socket`** – the connector seam under `native`.
//! - **`mock`** – recording doubles for tests.
//!
//! [`select_messenger`] picks one from the configuration and the detected
//! host runtime.  It is consulted once, when the exchange is built.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::messenger::Messenger;
use crate::domain::config::{ExchangeConfig, TransportKind};
use crate::runtime::{probe_host, HostRuntime};

pub mod browser;
pub mod mock;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;
#[cfg(not(target_arch = "wasm32"))]
pub mod socket;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod web;

/// Errors raised while setting up a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The native transport needs a tokio runtime and none is running.
    #[error("no async runtime available for the inspector socket")]
    NoRuntime,

    /// The requested transport cannot run on this host.
    #[error("{transport} transport is not available on a {host} host")]
    Unsupported {
        transport: TransportKind,
        host: HostRuntime,
    },

    /// Opening the inspector socket failed.
    #[error("failed to connect to inspector at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Builds the messenger `config` asks for on the current host.
///
/// # Errors
///
/// Returns [`TransportError::Unsupported`] when the requested transport
/// cannot run here, or [`TransportError::NoRuntime`] from the native
/// messenger.
pub fn build_messenger(config: &ExchangeConfig) -> Result<Arc<dyn Messenger>, TransportError> {
    let host = probe_host();
    let unsupported = || TransportError::Unsupported {
        transport: config.transport,
        host,
    };

    match (config.transport, host) {
        #[cfg(not(target_arch = "wasm32"))]
        (TransportKind::Auto | TransportKind::Native, HostRuntime::Native) => {
            let messenger = native::NativeMessenger::connect(config)?;
            Ok(Arc::new(messenger))
        }
        #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
        (TransportKind::Auto | TransportKind::Browser, HostRuntime::Browser) => {
            let window = web::WebWindow::detect().ok_or_else(unsupported)?;
            Ok(Arc::new(browser::BrowserMessenger::new(window)))
        }
        _ => Err(unsupported()),
    }
}

/// Like [`build_messenger`], but returns `None` (pass-through) when
/// instrumentation is disabled or no transport is viable.
pub fn select_messenger(config: &ExchangeConfig) -> Option<Arc<dyn Messenger>> {
    if !config.enabled {
        info!("devtools instrumentation disabled by configuration");
        return None;
    }
    match build_messenger(config) {
        Ok(messenger) => Some(messenger),
        Err(e) => {
            warn!("devtools instrumentation unavailable: {e}");
            None
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    fn enabled(transport: TransportKind) -> ExchangeConfig {
        ExchangeConfig {
            enabled: true,
            transport,
            endpoint: "ws://127.0.0.1:9".into(),
            ..ExchangeConfig::default()
        }
    }

    #[test]
    fn test_disabled_config_selects_nothing() {
        let cfg = ExchangeConfig {
            enabled: false,
            ..ExchangeConfig::default()
        };
        assert!(select_messenger(&cfg).is_none());
    }

    #[test]
    fn test_headless_host_is_unsupported() {
        let err = build_messenger(&enabled(TransportKind::Auto)).err().unwrap();
        assert!(matches!(
            err,
            TransportError::Unsupported {
                host: HostRuntime::Headless,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_browser_transport_on_native_host_is_unsupported() {
        let err = build_messenger(&enabled(TransportKind::Browser)).err().unwrap();
        assert_eq!(err.to_string(), "browser transport is not available on a native host");
        assert!(select_messenger(&enabled(TransportKind::Browser)).is_none());
    }

    #[tokio::test]
    async fn test_auto_on_native_host_builds_socket_messenger() {
        assert!(select_messenger(&enabled(TransportKind::Auto)).is_some());
    }
}
