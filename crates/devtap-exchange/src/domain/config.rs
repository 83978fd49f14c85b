//! Exchange configuration.
//!
//! Every field has a serde default so a partial TOML file (or none at all)
//! still yields a usable configuration:
//!
//! ```toml
//! enabled = true
//! endpoint = "ws://localhost:7700"
//! reconnect_interval_ms = 500
//! transport = "auto"
//! ```
//!
//! Environment overrides are applied on top by [`ExchangeConfig::apply_env`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default inspector endpoint for the native socket transport.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:7700";

/// Default fixed delay between a dropped socket and the next connect attempt.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 500;

/// Environment variable that turns instrumentation off when set to a truthy value.
pub const ENV_DISABLED: &str = "DEVTAP_DISABLED";
/// Environment variable that overrides [`ExchangeConfig::endpoint`].
pub const ENV_ENDPOINT: &str = "DEVTAP_ENDPOINT";
/// Environment variable that overrides [`ExchangeConfig::reconnect_interval_ms`].
pub const ENV_RECONNECT_MS: &str = "DEVTAP_RECONNECT_MS";
/// Environment variable that overrides [`ExchangeConfig::transport`].
pub const ENV_TRANSPORT: &str = "DEVTAP_TRANSPORT";

/// Which messenger the exchange should talk through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Window messaging when running in a browser, the socket otherwise.
    #[default]
    Auto,
    /// Always the reconnecting WebSocket.
    Native,
    /// Always window messaging.
    Browser,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Auto => "auto",
            TransportKind::Native => "native",
            TransportKind::Browser => "browser",
        }
    }

    /// Parses the lowercase name used in config files and the environment.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(TransportKind::Auto),
            "native" | "socket" => Some(TransportKind::Native),
            "browser" | "window" => Some(TransportKind::Browser),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for one exchange instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// When `false` the exchange is a pure pass-through.  Defaults to `true`
    /// in debug builds and `false` in release builds.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// WebSocket URL of the inspector (native transport only).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Reconnect backoff in milliseconds.  Constant, not exponential.
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default)]
    pub transport: TransportKind,
}

fn default_enabled() -> bool {
    cfg!(debug_assertions)
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_reconnect_interval_ms() -> u64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            transport: TransportKind::default(),
        }
    }
}

impl ExchangeConfig {
    /// Reconnect backoff as a [`Duration`].
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Applies `DEVTAP_*` overrides read through `lookup`.
    ///
    /// Taking a lookup function instead of reading `std::env` directly keeps
    /// this testable without mutating the process environment.  Values that
    /// fail to parse are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DISABLED) {
            match parse_flag(&value) {
                Some(disabled) => self.enabled = !disabled,
                None => warn!("ignoring {ENV_DISABLED}={value:?}: expected a boolean"),
            }
        }
        if let Some(value) = lookup(ENV_ENDPOINT) {
            if value.trim().is_empty() {
                warn!("ignoring empty {ENV_ENDPOINT}");
            } else {
                self.endpoint = value;
            }
        }
        if let Some(value) = lookup(ENV_RECONNECT_MS) {
            match value.trim().parse::<u64>() {
                Ok(ms) => self.reconnect_interval_ms = ms,
                Err(e) => warn!("ignoring {ENV_RECONNECT_MS}={value:?}: {e}"),
            }
        }
        if let Some(value) = lookup(ENV_TRANSPORT) {
            match TransportKind::parse(&value) {
                Some(kind) => self.transport = kind,
                None => warn!("ignoring {ENV_TRANSPORT}={value:?}: expected auto, native or browser"),
            }
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
