//! WebSocket client and event loop.
//!
//! [`WsTransport::open`] spawns a tokio task that performs the handshake and
//! then runs the event loop for the lifetime of the connection.
//!
//! # Event Loop
//!
//! The task handles:
//!
//! - Incoming text frames from the remote end
//! - Outgoing frames queued through [`WsHandle::send`]
//! - Shutdown requested through [`WsHandle::close`]
//!
//! Whatever ends the loop, the task emits exactly one `Closed` event as its
//! last act.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use crate::config::DEFAULT_CONNECT_TIMEOUT;
use crate::error::Error;
use crate::identifiers::ConnectionId;

use super::{EventSink, Transport, TransportEvent, TransportHandle};

// ============================================================================
// Types
// ============================================================================

/// Lifecycle phase shared between a handle and its event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Handshake in progress.
    Connecting,
    /// Ready for sends.
    Open,
    /// Shutdown requested.
    Closing,
    /// Event loop finished.
    Closed,
}

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a text frame.
    Send(String),
    /// Close the connection.
    Shutdown,
}

// ============================================================================
// WsTransport
// ============================================================================

/// WebSocket [`Transport`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy)]
pub struct WsTransport {
    /// Handshake timeout.
    connect_timeout: Duration,
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl WsTransport {
    /// Creates a transport with the given handshake timeout.
    #[inline]
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Returns the handshake timeout.
    #[inline]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Transport for WsTransport {
    type Handle = WsHandle;

    fn open(&self, endpoint: &str, id: ConnectionId, sink: EventSink) -> WsHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let phase = Arc::new(Mutex::new(Phase::Connecting));

        debug!(connection = %id, endpoint, "Opening WebSocket");

        tokio::spawn(run_connection(
            endpoint.to_string(),
            self.connect_timeout,
            id,
            command_rx,
            Arc::clone(&phase),
            sink,
        ));

        WsHandle {
            id,
            command_tx,
            phase,
        }
    }
}

// ============================================================================
// WsHandle
// ============================================================================

/// Handle to a WebSocket connection.
///
/// Cheap to clone; all clones control the same connection.
#[derive(Clone)]
pub struct WsHandle {
    /// Connection ID.
    id: ConnectionId,
    /// Channel to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Shared lifecycle phase.
    phase: Arc<Mutex<Phase>>,
}

impl TransportHandle for WsHandle {
    #[inline]
    fn id(&self) -> ConnectionId {
        self.id
    }

    #[inline]
    fn is_ready(&self) -> bool {
        *self.phase.lock() == Phase::Open
    }

    fn send(&self, frame: String) {
        if !self.is_ready() {
            trace!(connection = %self.id, "Dropping frame, connection not ready");
            return;
        }
        let _ = self.command_tx.send(ConnectionCommand::Send(frame));
    }

    fn close(&self) {
        {
            let mut phase = self.phase.lock();
            if matches!(*phase, Phase::Closing | Phase::Closed) {
                return;
            }
            *phase = Phase::Closing;
        }
        debug!(connection = %self.id, "Close requested");
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Connects, then pumps frames until the connection ends.
async fn run_connection(
    endpoint: String,
    connect_timeout: Duration,
    id: ConnectionId,
    mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    phase: Arc<Mutex<Phase>>,
    sink: EventSink,
) {
    let handshake = timeout(connect_timeout, connect_async(endpoint.as_str()));

    let ws_stream = tokio::select! {
        result = handshake => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                warn!(connection = %id, error = %e, "WebSocket handshake failed");
                sink(id, TransportEvent::Error(Error::connection(e.to_string()).to_string()));
                finish(id, &phase, &sink, None, String::new());
                return;
            }
            Err(_) => {
                let err = Error::connection_timeout(connect_timeout.as_millis() as u64);
                warn!(connection = %id, error = %err, "WebSocket handshake timed out");
                sink(id, TransportEvent::Error(err.to_string()));
                finish(id, &phase, &sink, None, String::new());
                return;
            }
        },

        () = wait_for_shutdown(&mut command_rx) => {
            debug!(connection = %id, "Shutdown before handshake completed");
            finish(id, &phase, &sink, None, String::new());
            return;
        }
    };

    let opened = {
        let mut phase = phase.lock();
        if *phase == Phase::Connecting {
            *phase = Phase::Open;
            true
        } else {
            false
        }
    };

    let (mut ws_write, mut ws_read) = ws_stream.split();

    if !opened {
        debug!(connection = %id, "Closed during handshake");
        let _ = ws_write.close().await;
        finish(id, &phase, &sink, None, String::new());
        return;
    }

    info!(connection = %id, endpoint = %endpoint, "WebSocket connection established");
    sink(id, TransportEvent::Opened);

    let mut close_code = None;
    let mut close_reason = String::new();

    loop {
        tokio::select! {
            // Incoming frames from the remote end
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(connection = %id, len = text.len(), "Frame received");
                        sink(id, TransportEvent::Message(text.as_str().to_owned()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        if let Some(frame) = frame {
                            close_code = Some(u16::from(frame.code));
                            close_reason = frame.reason.as_str().to_owned();
                        }
                        debug!(connection = %id, code = ?close_code, "WebSocket closed by remote");
                        // Flushes the queued close reply
                        let _ = ws_write.close().await;
                        break;
                    }

                    Some(Err(e)) => {
                        error!(connection = %id, error = %e, "WebSocket error");
                        sink(id, TransportEvent::Error(Error::from(e).to_string()));
                        break;
                    }

                    None => {
                        debug!(connection = %id, "WebSocket stream ended");
                        break;
                    }

                    // Binary, Ping, Pong and raw frames carry nothing for us
                    _ => {}
                }
            }

            // Commands from handles
            command = command_rx.recv() => {
                match command {
                    Some(ConnectionCommand::Send(frame)) => {
                        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                            warn!(connection = %id, error = %e, "Failed to send frame");
                            sink(id, TransportEvent::Error(Error::from(e).to_string()));
                            break;
                        }
                        trace!(connection = %id, "Frame sent");
                    }

                    Some(ConnectionCommand::Shutdown) => {
                        debug!(connection = %id, "Shutdown command received");
                        let _ = ws_write.close().await;
                        break;
                    }

                    None => {
                        debug!(connection = %id, "All handles dropped");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    finish(id, &phase, &sink, close_code, close_reason);
}

/// Resolves once a shutdown is requested or every handle is gone.
async fn wait_for_shutdown(command_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>) {
    loop {
        match command_rx.recv().await {
            Some(ConnectionCommand::Shutdown) | None => return,
            Some(ConnectionCommand::Send(_)) => {}
        }
    }
}

/// Marks the connection closed and emits the final `Closed` event.
fn finish(
    id: ConnectionId,
    phase: &Arc<Mutex<Phase>>,
    sink: &EventSink,
    code: Option<u16>,
    reason: String,
) {
    *phase.lock() = Phase::Closed;
    sink(id, TransportEvent::Closed { code, reason });
    debug!(connection = %id, "Event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{Ipv4Addr, SocketAddr};

    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Utf8Bytes;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    const WAIT: Duration = Duration::from_secs(5);

    type Events = mpsc::UnboundedReceiver<(ConnectionId, TransportEvent)>;

    fn channel_sink() -> (EventSink, Events) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: EventSink = Box::new(move |id, event| {
            let _ = tx.send((id, event));
        });
        (sink, rx)
    }

    async fn next_event(events: &mut Events) -> (ConnectionId, TransportEvent) {
        timeout(WAIT, events.recv())
            .await
            .expect("event should arrive")
            .expect("sink should stay alive")
    }

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .expect("bind should succeed");
        let port = listener.local_addr().unwrap().port();
        (listener, format!("ws://127.0.0.1:{port}"))
    }

    #[tokio::test]
    async fn test_open_exchange_and_local_close() {
        let (listener, url) = bind().await;

        let (received_tx, received_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text("text=hello".to_string().into()))
                .await
                .unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = received_tx.send(text.as_str().to_owned());
            }
            // Stay connected until the client closes
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (sink, mut events) = channel_sink();
        let id = ConnectionId::generate();
        let handle = WsTransport::default().open(&url, id, sink);
        assert_eq!(handle.id(), id);

        assert_eq!(next_event(&mut events).await, (id, TransportEvent::Opened));
        assert!(handle.is_ready());

        assert_eq!(
            next_event(&mut events).await,
            (id, TransportEvent::Message("text=hello".into()))
        );

        handle.send("{\"command\":\"updateImage\"}".to_string());
        let received = timeout(WAIT, received_rx).await.unwrap().unwrap();
        assert_eq!(received, "{\"command\":\"updateImage\"}");

        handle.close();
        handle.close();
        assert!(!handle.is_ready());

        let (_, event) = next_event(&mut events).await;
        assert!(matches!(event, TransportEvent::Closed { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_error_then_closed() {
        let (listener, url) = bind().await;
        drop(listener);

        let (sink, mut events) = channel_sink();
        let handle = WsTransport::default().open(&url, ConnectionId::generate(), sink);

        let (_, first) = next_event(&mut events).await;
        assert!(matches!(first, TransportEvent::Error(_)));
        let (_, second) = next_event(&mut events).await;
        assert!(matches!(second, TransportEvent::Closed { code: None, .. }));

        assert!(!handle.is_ready());
        handle.send("ignored".to_string());
        handle.close();
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        // Accepts TCP but never answers the upgrade request
        let (listener, url) = bind().await;
        let _server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let (sink, mut events) = channel_sink();
        let _handle = WsTransport::new(Duration::from_millis(100)).open(
            &url,
            ConnectionId::generate(),
            sink,
        );

        let (_, first) = next_event(&mut events).await;
        assert_eq!(
            first,
            TransportEvent::Error("Connection timeout after 100ms".into())
        );
        let (_, second) = next_event(&mut events).await;
        assert!(matches!(second, TransportEvent::Closed { .. }));
    }

    #[tokio::test]
    async fn test_remote_close_carries_code() {
        let (listener, url) = bind().await;

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: Utf8Bytes::from_static("bye"),
                }))
                .await;
            let acknowledged = matches!(ws.next().await, Some(Ok(Message::Close(_))));
            let _ = reply_tx.send(acknowledged);
        });

        let (sink, mut events) = channel_sink();
        let handle = WsTransport::default().open(&url, ConnectionId::generate(), sink);

        assert_eq!(next_event(&mut events).await.1, TransportEvent::Opened);
        assert_eq!(
            next_event(&mut events).await.1,
            TransportEvent::Closed {
                code: Some(1000),
                reason: "bye".into()
            }
        );
        assert!(!handle.is_ready());

        let acknowledged = timeout(WAIT, reply_rx).await.unwrap().unwrap();
        assert!(acknowledged, "close handshake should complete");
    }

    #[tokio::test]
    async fn test_send_before_open_is_dropped() {
        let (listener, url) = bind().await;

        let (sink, _events) = channel_sink();
        let handle = WsTransport::default().open(&url, ConnectionId::generate(), sink);

        assert!(!handle.is_ready());
        handle.send("too early".to_string());
        handle.close();
        drop(listener);
    }
}
