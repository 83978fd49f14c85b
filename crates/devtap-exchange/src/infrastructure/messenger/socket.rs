//! WebSocket plumbing under the native messenger.
//!
//! [`SocketConnector`] is the seam between the reconnect state machine in
//! `native.rs` and the network.  A connection is reduced to two channels:
//!
//! - `outbound`: text frames to write.  Dropping the sender closes the socket.
//! - `events`: inbound frames, then exactly one terminal `Closed` or `Error`.
//!
//! The production [`TungsteniteConnector`] runs two tasks per connection, a
//! writer draining `outbound` into the socket sink and a reader pumping the
//! socket stream into `events`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, warn};

use crate::infrastructure::messenger::TransportError;

/// What an open connection reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// One inbound text frame.
    Frame(String),
    /// The peer closed the connection.
    Closed,
    /// The connection failed.
    Error(String),
}

/// An open connection, as channels.
#[derive(Debug)]
pub struct SocketConnection {
    pub outbound: mpsc::UnboundedSender<String>,
    pub events: mpsc::UnboundedReceiver<SocketEvent>,
}

/// Opens connections to an inspector endpoint.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<SocketConnection, TransportError>;
}

/// [`SocketConnector`] over `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn connect(&self, endpoint: &str) -> Result<SocketConnection, TransportError> {
        let (stream, _response) =
            connect_async(endpoint)
                .await
                .map_err(|source| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source: Box::new(source),
                })?;
        let (mut sink, mut source) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<SocketEvent>();

        // ── Writer ────────────────────────────────────────────────────────────
        let writer_events = events_tx.clone();
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                    let _ = writer_events.send(SocketEvent::Error(e.to_string()));
                    return;
                }
            }
            // Every sender is gone: the messenger moved on to another connection.
            let _ = sink.close().await;
        });

        // ── Reader ────────────────────────────────────────────────────────────
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        let _ = events_tx.send(SocketEvent::Error(e.to_string()));
                        return;
                    }
                };
                match frame {
                    WsMessage::Text(text) => {
                        if events_tx.send(SocketEvent::Frame(text.to_string())).is_err() {
                            return;
                        }
                    }
                    WsMessage::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            if events_tx.send(SocketEvent::Frame(text)).is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("dropping non-UTF-8 binary frame: {e}"),
                    },
                    WsMessage::Close(_) => {
                        debug!("inspector sent a close frame");
                        break;
                    }
                    // Ping/pong replies are handled by tungstenite.
                    WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
                }
            }
            let _ = events_tx.send(SocketEvent::Closed);
        });

        Ok(SocketConnection {
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}
