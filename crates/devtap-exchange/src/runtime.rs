//! Host runtime detection and detached task spawning.
//!
//! The exchange runs either natively on a tokio runtime or in a browser on
//! `wasm32-unknown-unknown`.  This module hides the difference from the
//! application layer: [`probe_host`] is consulted once when a messenger is
//! selected, and [`spawn_detached`] hands fire-and-forget work to whichever
//! executor is present.

use std::fmt;
use std::future::Future;

use tracing::warn;

/// What the current process can offer a messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRuntime {
    /// A browser page with a `window`.
    Browser,
    /// A native process with a reachable tokio runtime.
    Native,
    /// Neither; instrumentation cannot run.
    Headless,
}

impl HostRuntime {
    pub fn as_str(self) -> &'static str {
        match self {
            HostRuntime::Browser => "browser",
            HostRuntime::Native => "native",
            HostRuntime::Headless => "headless",
        }
    }
}

impl fmt::Display for HostRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects the host runtime.
#[cfg(not(target_arch = "wasm32"))]
pub fn probe_host() -> HostRuntime {
    match tokio::runtime::Handle::try_current() {
        Ok(_) => HostRuntime::Native,
        Err(_) => HostRuntime::Headless,
    }
}

/// Detects the host runtime.
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub fn probe_host() -> HostRuntime {
    match web_sys::window() {
        Some(_) => HostRuntime::Browser,
        None => HostRuntime::Headless,
    }
}

/// Detects the host runtime.
#[cfg(all(target_arch = "wasm32", not(target_os = "unknown")))]
pub fn probe_host() -> HostRuntime {
    HostRuntime::Headless
}

/// Runs `task` in the background without awaiting it.
///
/// Returns `false` (and drops the task) when no executor is available.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_detached<F>(task: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
            true
        }
        Err(e) => {
            warn!("no tokio runtime to run a background task: {e}");
            false
        }
    }
}

/// Runs `task` in the background without awaiting it.
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub fn spawn_detached<F>(task: F) -> bool
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(task);
    true
}

/// Runs `task` in the background without awaiting it.
#[cfg(all(target_arch = "wasm32", not(target_os = "unknown")))]
pub fn spawn_detached<F>(task: F) -> bool
where
    F: Future<Output = ()> + 'static,
{
    drop(task);
    warn!("no executor on this target to run a background task");
    false
}
