//! Reconnecting WebSocket transport for native hosts.
//!
//! # State machine
//!
//! ```text
//!            connect ok                close / error
//! Connecting ──────────► Open ──────────────────────► Retrying
//!     ▲  │ connect failed                                 │
//!     │  └────────────────────────────────────────────────┤
//!     │                 backoff elapsed                   │
//!     └───────────────────────────────────────────────────┘
//! ```
//!
//! - The backoff is a fixed delay (500 ms by default), not exponential.
//! - At most one reconnect timer is pending.  The timer handle is held in
//!   `reconnect_timer`; a close and an error arriving back to back find it
//!   set and do not schedule a second one.  The handle is cleared when the
//!   next attempt begins.
//! - A connect attempt that has not finished after the backoff (or 5 s,
//!   whichever is longer) counts as failed.
//! - Every attempt gets a new generation number.  Events from a connection
//!   whose generation is no longer current are ignored, so a late `Closed`
//!   from a dead socket cannot knock over its replacement.
//! - Sends while not `Open` are dropped.  Nothing is buffered.
//! - Inbound frames are decoded as [`IncomingMessage`]s.  Empty frames are
//!   skipped; a frame that fails to decode is logged and dropped without
//!   touching the connection.
//!
//! Locks are `std::sync` and are never held across an `.await` or while
//! listeners run.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError, RwLock,
};
use std::time::Duration;

use devtap_core::{
    protocol::codec::{decode_incoming, encode_message, CodecError},
    IncomingMessage, OutgoingMessage,
};
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::application::messenger::{MessageListener, Messenger};
use crate::domain::config::ExchangeConfig;
use crate::infrastructure::messenger::socket::{
    SocketConnection, SocketConnector, SocketEvent, TungsteniteConnector,
};
use crate::infrastructure::messenger::TransportError;

/// Connection state of a [`NativeMessenger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Retrying,
}

/// Messenger over a persistent, self-healing WebSocket.
#[derive(Clone)]
pub struct NativeMessenger {
    inner: Arc<Inner>,
}

struct Inner {
    endpoint: String,
    backoff: Duration,
    connector: Arc<dyn SocketConnector>,
    runtime: Handle,
    state: Mutex<ConnectionState>,
    generation: AtomicU64,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    reconnect_timer: Mutex<Option<JoinHandle<()>>>,
    listeners: RwLock<Vec<Arc<MessageListener>>>,
}

/// Lower bound on how long one connect attempt may take.
const MIN_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NativeMessenger {
    /// Starts connecting to `config.endpoint` with `tokio-tungstenite`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NoRuntime`] when called outside a tokio
    /// runtime.
    pub fn connect(config: &ExchangeConfig) -> Result<Self, TransportError> {
        Self::with_connector(
            config.endpoint.clone(),
            config.reconnect_interval(),
            Arc::new(TungsteniteConnector),
        )
    }

    /// Starts connecting through an arbitrary [`SocketConnector`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NoRuntime`] when called outside a tokio
    /// runtime.
    pub fn with_connector(
        endpoint: impl Into<String>,
        backoff: Duration,
        connector: Arc<dyn SocketConnector>,
    ) -> Result<Self, TransportError> {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let inner = Arc::new(Inner {
            endpoint: endpoint.into(),
            backoff,
            connector,
            runtime,
            state: Mutex::new(ConnectionState::Connecting),
            generation: AtomicU64::new(0),
            outbound: Mutex::new(None),
            reconnect_timer: Mutex::new(None),
            listeners: RwLock::new(Vec::new()),
        });
        inner.start_attempt();
        Ok(Self { inner })
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.inner.state)
    }

    /// `true` while a reconnect timer is pending.
    pub fn has_pending_reconnect(&self) -> bool {
        lock(&self.inner.reconnect_timer).is_some()
    }
}

impl Messenger for NativeMessenger {
    fn send_message(&self, message: &OutgoingMessage) {
        let outbound = lock(&self.inner.outbound);
        let Some(tx) = outbound.as_ref() else {
            trace!("inspector socket not open; dropping {} message", message.type_name());
            return;
        };
        match encode_message(message) {
            Ok(text) => {
                // A closed writer means the socket just died; the reader
                // will report it.
                let _ = tx.send(text);
            }
            Err(e) => error!("{e}"),
        }
    }

    fn add_message_listener(&self, listener: MessageListener) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }
}

impl std::fmt::Debug for NativeMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMessenger")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// `Retrying → Connecting` (or the initial attempt).
    fn start_attempt(self: &Arc<Self>) {
        let generation = {
            let mut timer = lock(&self.reconnect_timer);
            // The bump and the clear happen under the timer lock, so a loss
            // report from the previous connection either finds the timer
            // still set or finds its generation stale.  Dropping a
            // JoinHandle detaches the task rather than aborting it.
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            timer.take();
            generation
        };
        *lock(&self.outbound) = None;
        *lock(&self.state) = ConnectionState::Connecting;

        let this = Arc::clone(self);
        self.runtime.spawn(async move { this.run_connection(generation).await });
    }

    async fn run_connection(self: Arc<Self>, generation: u64) {
        debug!(endpoint = %self.endpoint, generation, "connecting to inspector");
        let limit = self.backoff.max(MIN_CONNECT_TIMEOUT);
        let attempt = self.connector.connect(&self.endpoint);
        let connection = match tokio::time::timeout(limit, attempt).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                debug!("{e}");
                self.on_connection_lost(generation);
                return;
            }
            Err(_) => {
                warn!(endpoint = %self.endpoint, "inspector connect timed out after {limit:?}");
                self.on_connection_lost(generation);
                return;
            }
        };

        let SocketConnection { outbound, mut events } = connection;
        if !self.is_current(generation) {
            return;
        }
        *lock(&self.outbound) = Some(outbound);
        *lock(&self.state) = ConnectionState::Open;
        info!(endpoint = %self.endpoint, "connected to inspector");

        let mut failed = false;
        while let Some(event) = events.recv().await {
            match event {
                SocketEvent::Frame(text) => {
                    if !failed && self.is_current(generation) {
                        self.handle_frame(&text);
                    }
                }
                SocketEvent::Error(reason) => {
                    warn!("inspector socket error: {reason}");
                    failed = true;
                    self.on_connection_lost(generation);
                }
                SocketEvent::Closed => {
                    debug!("inspector socket closed");
                    self.on_connection_lost(generation);
                    return;
                }
            }
        }
        // Event channel ended without a terminal event.
        self.on_connection_lost(generation);
    }

    fn handle_frame(&self, text: &str) {
        let message = match decode_incoming(text) {
            Ok(message) => message,
            Err(CodecError::Empty) => return,
            Err(e) => {
                warn!("dropping inspector frame: {e}");
                return;
            }
        };
        self.notify(message);
    }

    fn notify(&self, message: IncomingMessage) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(message.clone());
        }
    }

    /// `Open → Retrying` (or a failed connect).
    ///
    /// The generation check and the timer slot are read under the same
    /// lock [`start_attempt`](Self::start_attempt) takes, so at most one
    /// reconnect timer is ever pending.
    fn on_connection_lost(self: &Arc<Self>, generation: u64) {
        let mut timer = lock(&self.reconnect_timer);
        if !self.is_current(generation) {
            trace!(generation, "ignoring event from a superseded connection");
            return;
        }
        *lock(&self.outbound) = None;
        *lock(&self.state) = ConnectionState::Retrying;
        if timer.is_some() {
            trace!("reconnect already scheduled");
            return;
        }

        debug!("reconnecting to inspector in {:?}", self.backoff);
        let this = Arc::clone(self);
        let backoff = self.backoff;
        *timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(backoff).await;
            this.start_attempt();
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    use async_trait::async_trait;
    use serde_json::Value;

    const BACKOFF: Duration = Duration::from_millis(500);

    /// Far end of one scripted connection.
    struct Peer {
        events: mpsc::UnboundedSender<SocketEvent>,
        written: mpsc::UnboundedReceiver<String>,
    }

    /// Connector that hands out in-memory connections the test drives.
    #[derive(Default)]
    struct ScriptedConnector {
        attempts: AtomicUsize,
        refuse: AtomicBool,
        hang: AtomicBool,
        peers: Mutex<Vec<Peer>>,
    }

    impl ScriptedConnector {
        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        fn push_event(&self, peer: usize, event: SocketEvent) {
            let _ = self.peers.lock().unwrap()[peer].events.send(event);
        }

        fn written(&self, peer: usize) -> Vec<String> {
            let mut peers = self.peers.lock().unwrap();
            let mut out = Vec::new();
            while let Ok(text) = peers[peer].written.try_recv() {
                out.push(text);
            }
            out
        }
    }

    #[async_trait]
    impl SocketConnector for ScriptedConnector {
        async fn connect(&self, endpoint: &str) -> Result<SocketConnection, TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.refuse.load(Ordering::SeqCst) {
                return Err(TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source: "connection refused".into(),
                });
            }
            let (outbound, written) = mpsc::unbounded_channel();
            let (events_tx, events) = mpsc::unbounded_channel();
            self.peers.lock().unwrap().push(Peer {
                events: events_tx,
                written,
            });
            Ok(SocketConnection { outbound, events })
        }
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn messenger(connector: &Arc<ScriptedConnector>) -> NativeMessenger {
        NativeMessenger::with_connector("ws://inspector.test", BACKOFF, connector.clone())
            .expect("inside a runtime")
    }

    fn recording_listener(messenger: &NativeMessenger) -> Arc<Mutex<Vec<IncomingMessage>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        messenger.add_message_listener(Box::new(move |m| sink.lock().unwrap().push(m)));
        seen
    }

    #[test]
    fn test_outside_runtime_is_an_error() {
        let result = NativeMessenger::with_connector(
            "ws://inspector.test",
            BACKOFF,
            Arc::new(ScriptedConnector::default()),
        );
        assert!(matches!(result, Err(TransportError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_and_sends_json_text() {
        // Arrange
        let connector = Arc::new(ScriptedConnector::default());
        let messenger = messenger(&connector);
        assert_eq!(messenger.state(), ConnectionState::Connecting);
        settle().await;

        // Act
        messenger.send_message(&OutgoingMessage::Disconnect);

        // Assert
        assert_eq!(messenger.state(), ConnectionState::Open);
        assert_eq!(connector.written(0), vec![r#"{"type":"disconnect"}"#.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_not_open_is_dropped() {
        let connector = Arc::new(ScriptedConnector::default());
        connector.refuse.store(true, Ordering::SeqCst);
        let messenger = messenger(&connector);
        settle().await;

        messenger.send_message(&OutgoingMessage::Disconnect);

        assert_eq!(messenger.state(), ConnectionState::Retrying);
        assert!(connector.peers.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_and_error_schedule_a_single_reconnect() {
        // Arrange
        let connector = Arc::new(ScriptedConnector::default());
        let messenger = messenger(&connector);
        settle().await;

        // Act: error and close back to back.
        connector.push_event(0, SocketEvent::Error("reset by peer".into()));
        connector.push_event(0, SocketEvent::Closed);
        settle().await;

        // Assert
        assert_eq!(messenger.state(), ConnectionState::Retrying);
        assert!(messenger.has_pending_reconnect());
        assert_eq!(connector.attempts(), 1);

        tokio::time::sleep(BACKOFF + Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(connector.attempts(), 2);
        assert_eq!(messenger.state(), ConnectionState::Open);
        assert!(!messenger.has_pending_reconnect());

        // No second timer was left behind.
        tokio::time::sleep(BACKOFF * 4).await;
        settle().await;
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_close_from_old_connection_is_ignored() {
        let connector = Arc::new(ScriptedConnector::default());
        let messenger = messenger(&connector);
        settle().await;

        connector.push_event(0, SocketEvent::Error("timeout".into()));
        tokio::time::sleep(BACKOFF + Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(messenger.state(), ConnectionState::Open);

        connector.push_event(0, SocketEvent::Closed);
        settle().await;

        assert_eq!(messenger.state(), ConnectionState::Open);
        assert!(!messenger.has_pending_reconnect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loss_report_after_next_attempt_began_schedules_nothing() {
        // Arrange
        let connector = Arc::new(ScriptedConnector::default());
        let messenger = messenger(&connector);
        settle().await;
        let first = messenger.inner.generation.load(Ordering::SeqCst);
        connector.push_event(0, SocketEvent::Error("reset by peer".into()));
        tokio::time::sleep(BACKOFF + Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(messenger.state(), ConnectionState::Open);

        // Act: the drained event channel of the first connection reports late.
        messenger.inner.on_connection_lost(first);

        // Assert
        assert!(!messenger.has_pending_reconnect());
        assert_eq!(messenger.state(), ConnectionState::Open);
        tokio::time::sleep(BACKOFF * 4).await;
        settle().await;
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_connect_times_out_and_retries() {
        // Arrange
        let connector = Arc::new(ScriptedConnector::default());
        connector.hang.store(true, Ordering::SeqCst);
        let messenger = messenger(&connector);
        settle().await;
        assert_eq!(messenger.state(), ConnectionState::Connecting);

        // Act
        tokio::time::sleep(MIN_CONNECT_TIMEOUT + Duration::from_millis(10)).await;
        settle().await;

        // Assert
        assert_eq!(messenger.state(), ConnectionState::Retrying);
        assert!(messenger.has_pending_reconnect());

        connector.hang.store(false, Ordering::SeqCst);
        tokio::time::sleep(BACKOFF + Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(connector.attempts(), 2);
        assert_eq!(messenger.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_retrying_while_refused() {
        let connector = Arc::new(ScriptedConnector::default());
        connector.refuse.store(true, Ordering::SeqCst);
        let messenger = messenger(&connector);
        settle().await;
        assert_eq!(connector.attempts(), 1);

        tokio::time::sleep(BACKOFF * 3 + Duration::from_millis(50)).await;
        settle().await;

        assert!(connector.attempts() >= 3);
        assert_eq!(messenger.state(), ConnectionState::Retrying);

        // The endpoint comes up.
        connector.refuse.store(false, Ordering::SeqCst);
        tokio::time::sleep(BACKOFF + Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(messenger.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_reach_every_listener() {
        let connector = Arc::new(ScriptedConnector::default());
        let messenger = messenger(&connector);
        let first = recording_listener(&messenger);
        let second = recording_listener(&messenger);
        settle().await;

        connector.push_event(
            0,
            SocketEvent::Frame(r#"{"type":"exchange-version-request"}"#.into()),
        );
        settle().await;

        assert_eq!(*first.lock().unwrap(), vec![IncomingMessage::ExchangeVersionRequest]);
        assert_eq!(*second.lock().unwrap(), vec![IncomingMessage::ExchangeVersionRequest]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_and_empty_frames_are_dropped_without_closing() {
        // Arrange
        let connector = Arc::new(ScriptedConnector::default());
        let messenger = messenger(&connector);
        let seen = recording_listener(&messenger);
        settle().await;

        // Act
        connector.push_event(0, SocketEvent::Frame("{not json".into()));
        connector.push_event(0, SocketEvent::Frame(String::new()));
        connector.push_event(0, SocketEvent::Frame(r#"{"query":"untagged"}"#.into()));
        connector.push_event(
            0,
            SocketEvent::Frame(r#"{"type":"request","query":"query { a }"}"#.into()),
        );
        settle().await;

        // Assert
        assert_eq!(messenger.state(), ConnectionState::Open);
        assert_eq!(connector.attempts(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![IncomingMessage::Request {
                query: "query { a }".into()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_after_error_are_not_delivered() {
        let connector = Arc::new(ScriptedConnector::default());
        let messenger = messenger(&connector);
        let seen = recording_listener(&messenger);
        settle().await;

        connector.push_event(0, SocketEvent::Error("broken pipe".into()));
        connector.push_event(0, SocketEvent::Frame(r#"{"type":"get-version"}"#.into()));
        settle().await;

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sent_frames_are_valid_json() {
        let connector = Arc::new(ScriptedConnector::default());
        let messenger = messenger(&connector);
        settle().await;

        messenger.send_message(&OutgoingMessage::Init {
            version: Some("0.1.0".into()),
        });

        let written = connector.written(0);
        let value: Value = serde_json::from_str(&written[0]).unwrap();
        assert_eq!(value["type"], "init");
    }
}
