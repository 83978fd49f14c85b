//! Instrumentation status service.
//!
//! Answers "is a devtools exchange active, and for which client?" for any
//! component that holds a clone.  One status object is created per exchange
//! and shared by cloning; there is no process-wide flag.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};

use devtap_core::OutgoingMessage;
use tracing::info;

use crate::application::messenger::Messenger;

#[derive(Debug, Default)]
struct StatusInner {
    active: AtomicBool,
    client_url: OnceLock<String>,
}

/// Shared view of one exchange's instrumentation state.
#[derive(Debug, Clone, Default)]
pub struct InstrumentationStatus {
    inner: Arc<StatusInner>,
}

impl InstrumentationStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` between installation and disconnect.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// URL of the instrumented client, once installed.
    pub fn client_url(&self) -> Option<&str> {
        self.inner.client_url.get().map(String::as_str)
    }

    pub(crate) fn mark_active(&self, client_url: &str) {
        // An exchange is installed at most once, so a second URL never arrives.
        let _ = self.inner.client_url.set(client_url.to_string());
        self.inner.active.store(true, Ordering::Release);
    }

    /// Clears the active flag and reports whether it was set.
    pub(crate) fn mark_inactive(&self) -> bool {
        self.inner.active.swap(false, Ordering::AcqRel)
    }
}

/// Control handle returned by
/// [`DevtoolsExchange::handle`](crate::application::exchange::DevtoolsExchange::handle).
#[derive(Clone)]
pub struct InstrumentationHandle {
    status: InstrumentationStatus,
    messenger: Option<Arc<dyn Messenger>>,
}

impl InstrumentationHandle {
    pub(crate) fn new(status: InstrumentationStatus, messenger: Option<Arc<dyn Messenger>>) -> Self {
        Self { status, messenger }
    }

    pub fn status(&self) -> &InstrumentationStatus {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Tells the inspector the exchange is going away and stops all taps.
    ///
    /// Values keep flowing through the pipeline untouched afterwards.
    /// Calling this more than once, or before installation, sends nothing.
    pub fn disconnect(&self) {
        if !self.status.mark_inactive() {
            return;
        }
        if let Some(messenger) = &self.messenger {
            messenger.send_message(&OutgoingMessage::Disconnect);
        }
        info!(
            client_url = self.status.client_url().unwrap_or_default(),
            "devtools instrumentation disconnected"
        );
    }
}

impl std::fmt::Debug for InstrumentationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentationHandle")
            .field("status", &self.status)
            .field("has_messenger", &self.messenger.is_some())
            .finish()
    }
}
