//! Bridge state machine and event loop.
//!
//! # Transitions
//!
//! | Event | From | To |
//! |-------|------|----|
//! | `Connect` | Disconnected | Connecting |
//! | transport `Opened` | Connecting | Connected |
//! | `Disconnect` | Connecting, Connected | Disconnected |
//! | transport `Closed` | Connecting, Connected | Disconnected |
//! | transport `Error` | any | unchanged (a `Closed` follows) |
//! | transport `Message` | any | unchanged |
//!
//! Transport and host callbacks never touch bridge state directly; they
//! post a [`BridgeEvent`] to the bridge's channel and [`Bridge::run`] applies
//! them one at a time.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::{BridgeOptions, parse_endpoint};
use crate::error::{Error, Result};
use crate::host::{Host, Notification, NotificationListener};
use crate::identifiers::ConnectionId;
use crate::protocol::{Base64Encoder, PayloadEncoder, ServerMessage};
use crate::status::{MenuLabel, StatusReporter};
use crate::subscription::SubscriptionManager;
use crate::transport::{EventSink, Transport, TransportEvent, TransportHandle, WsTransport};

use super::{ConnectionState, MessageHistory};

// ============================================================================
// Constants
// ============================================================================

/// Menu item ID of the connect/disconnect toggle.
pub const CONNECT_MENU_ID: &str = "connect";

// ============================================================================
// BridgeEvent
// ============================================================================

/// Everything the bridge reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// Connect to the given endpoint (ignored unless disconnected).
    Connect(String),
    /// Disconnect (reports when already disconnected).
    Disconnect,
    /// Connect if disconnected, otherwise disconnect.
    Toggle,
    /// Replace the endpoint used by `Toggle`.
    SetEndpoint(String),
    /// Host flyout menu item invoked.
    Menu(String),
    /// Event from a transport handle.
    Transport {
        /// Handle that produced the event.
        connection: ConnectionId,
        /// What happened.
        event: TransportEvent,
    },
    /// Host document-change notification.
    Notification(Notification),
    /// Tear down and stop the event loop.
    Shutdown,
}

// ============================================================================
// BridgeController
// ============================================================================

/// Cloneable entry point for operator actions and host callbacks.
#[derive(Debug, Clone)]
pub struct BridgeController {
    events_tx: mpsc::UnboundedSender<BridgeEvent>,
}

impl BridgeController {
    /// Posts a raw event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeStopped`] if the bridge has been dropped.
    pub fn send(&self, event: BridgeEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .map_err(|_| Error::BridgeStopped)
    }

    /// Requests a connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeStopped`] if the bridge has been dropped.
    pub fn connect(&self, endpoint: impl Into<String>) -> Result<()> {
        self.send(BridgeEvent::Connect(endpoint.into()))
    }

    /// Requests a disconnect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeStopped`] if the bridge has been dropped.
    pub fn disconnect(&self) -> Result<()> {
        self.send(BridgeEvent::Disconnect)
    }

    /// Presses the connect/disconnect toggle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeStopped`] if the bridge has been dropped.
    pub fn toggle(&self) -> Result<()> {
        self.send(BridgeEvent::Toggle)
    }

    /// Updates the endpoint used by the toggle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeStopped`] if the bridge has been dropped.
    pub fn set_endpoint(&self, endpoint: impl Into<String>) -> Result<()> {
        self.send(BridgeEvent::SetEndpoint(endpoint.into()))
    }

    /// Forwards a host menu invocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeStopped`] if the bridge has been dropped.
    pub fn invoke_menu(&self, id: impl Into<String>) -> Result<()> {
        self.send(BridgeEvent::Menu(id.into()))
    }

    /// Stops the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeStopped`] if the bridge has been dropped.
    pub fn shutdown(&self) -> Result<()> {
        self.send(BridgeEvent::Shutdown)
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Connection state machine.
///
/// Owns at most one transport handle and the host subscription. The handle
/// is present iff the state is not `Disconnected`; the subscription is
/// active iff the state is `Connected`.
pub struct Bridge<T: Transport> {
    transport: T,
    reporter: Arc<dyn StatusReporter>,
    /// Mirror state into the host menu.
    menu_enabled: bool,
    /// Endpoint used by `Toggle`.
    endpoint: String,
    state: ConnectionState,
    handle: Option<T::Handle>,
    subscriptions: SubscriptionManager,
    history: MessageHistory,
    /// Used by transport sinks and host listeners; never keeps the loop alive.
    events_tx: mpsc::WeakUnboundedSender<BridgeEvent>,
    /// Strong sender held until `run` starts, so controllers can be handed out.
    keepalive: Option<mpsc::UnboundedSender<BridgeEvent>>,
    events_rx: mpsc::UnboundedReceiver<BridgeEvent>,
}

impl Bridge<WsTransport> {
    /// Creates a bridge using the WebSocket transport.
    #[must_use]
    pub fn websocket(
        options: BridgeOptions,
        host: Arc<dyn Host>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        let transport = WsTransport::new(options.connect_timeout);
        Self::new(options, transport, host, reporter)
    }
}

impl<T: Transport> Bridge<T> {
    /// Creates a bridge with the default base64 payload encoder.
    #[must_use]
    pub fn new(
        options: BridgeOptions,
        transport: T,
        host: Arc<dyn Host>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self::with_encoder(options, transport, host, reporter, Arc::new(Base64Encoder))
    }

    /// Creates a bridge with a custom payload encoder.
    #[must_use]
    pub fn with_encoder(
        options: BridgeOptions,
        transport: T,
        host: Arc<dyn Host>,
        reporter: Arc<dyn StatusReporter>,
        encoder: Arc<dyn PayloadEncoder>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let menu_enabled = host.capabilities().has_menu_panel;

        debug!(
            encoder = encoder.name(),
            menu_enabled,
            history = options.history_capacity,
            "Bridge created"
        );

        Self {
            transport,
            subscriptions: SubscriptionManager::new(host, encoder, Arc::clone(&reporter)),
            reporter,
            menu_enabled,
            endpoint: options.endpoint,
            state: ConnectionState::Disconnected,
            handle: None,
            history: MessageHistory::new(options.history_capacity),
            events_tx: events_tx.downgrade(),
            keepalive: Some(events_tx),
            events_rx,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns a controller that posts events to this bridge.
    #[must_use]
    pub fn controller(&self) -> BridgeController {
        // `run` consumes the bridge, so the keepalive is always present here
        let events_tx = self
            .keepalive
            .clone()
            .unwrap_or_else(|| mpsc::unbounded_channel().0);
        BridgeController { events_tx }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Endpoint used by the toggle.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// ID of the current transport handle.
    #[inline]
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.handle.as_ref().map(|handle| handle.id())
    }

    /// `true` while a transport handle is held.
    #[inline]
    #[must_use]
    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// `true` while the host listener is registered.
    #[inline]
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscriptions.is_active()
    }

    /// Received frames.
    #[inline]
    #[must_use]
    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    // ========================================================================
    // Event Loop
    // ========================================================================

    /// Processes events until [`BridgeEvent::Shutdown`] or until every
    /// [`BridgeController`] has been dropped.
    ///
    /// Either way the connection is torn down before returning.
    pub async fn run(mut self) {
        info!("Bridge event loop started");
        self.keepalive = None;

        while let Some(event) = self.events_rx.recv().await {
            let stop = matches!(event, BridgeEvent::Shutdown);
            self.handle_event(event).await;
            if stop {
                break;
            }
        }

        if self.handle.is_some() {
            debug!("Controllers gone, tearing down");
            self.teardown().await;
        }
        self.subscriptions.settle().await;
        info!("Bridge event loop stopped");
    }

    /// Handles every event already queued, without waiting for more.
    ///
    /// Returns the number of events handled. Useful when the bridge is
    /// driven from an existing loop instead of [`run`](Self::run).
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Waits for in-flight layer pushes to finish.
    pub async fn settle(&mut self) {
        self.subscriptions.settle().await;
    }

    /// Applies one event.
    pub async fn handle_event(&mut self, event: BridgeEvent) {
        trace!(state = %self.state, ?event, "Handling event");

        match event {
            BridgeEvent::Connect(endpoint) => self.connect(&endpoint),
            BridgeEvent::Disconnect => self.disconnect().await,
            BridgeEvent::Toggle => self.toggle().await,
            BridgeEvent::SetEndpoint(endpoint) => {
                self.endpoint = endpoint.trim().to_string();
                debug!(endpoint = %self.endpoint, "Endpoint updated");
            }
            BridgeEvent::Menu(id) => self.invoke_menu(&id).await,
            BridgeEvent::Transport { connection, event } => {
                self.on_transport_event(connection, event).await;
            }
            BridgeEvent::Notification(notification) => self.on_notification(&notification),
            BridgeEvent::Shutdown => {
                if self.handle.is_some() {
                    self.teardown().await;
                }
            }
        }

        debug_assert_eq!(self.state.has_handle(), self.handle.is_some());
    }

    // ========================================================================
    // Operator Actions
    // ========================================================================

    fn connect(&mut self, endpoint: &str) {
        if self.handle.is_some() {
            debug!(state = %self.state, "Connect ignored, connection already in progress");
            return;
        }

        let endpoint = endpoint.trim();
        if let Err(e) = parse_endpoint(endpoint) {
            warn!(error = %e, "Rejected endpoint");
            self.report(&format!("Error: {e}"));
            return;
        }

        let id = ConnectionId::generate();
        let handle = self.transport.open(endpoint, id, self.transport_sink());
        self.handle = Some(handle);
        self.set_state(ConnectionState::Connecting);

        info!(connection = %id, endpoint, "Connecting");
    }

    async fn disconnect(&mut self) {
        if self.handle.is_none() {
            self.report("Already disconnected.");
            return;
        }
        self.teardown().await;
    }

    async fn toggle(&mut self) {
        if self.handle.is_some() {
            self.disconnect().await;
        } else {
            let endpoint = self.endpoint.clone();
            self.connect(&endpoint);
        }
    }

    async fn invoke_menu(&mut self, id: &str) {
        match id {
            CONNECT_MENU_ID => self.toggle().await,
            other => debug!(menu = other, "Unknown menu item"),
        }
    }

    // ========================================================================
    // Transport Events
    // ========================================================================

    async fn on_transport_event(&mut self, connection: ConnectionId, event: TransportEvent) {
        if self.connection_id() != Some(connection) {
            debug!(%connection, ?event, "Ignoring event from stale connection");
            return;
        }

        match event {
            TransportEvent::Opened => self.on_opened().await,
            TransportEvent::Message(frame) => self.on_message(frame),
            TransportEvent::Error(message) => {
                warn!(%connection, error = %message, "Transport error");
                self.report(&format!("Error: {message}"));
            }
            TransportEvent::Closed { code, reason } => {
                debug!(%connection, ?code, %reason, "Transport closed");
                self.teardown().await;
            }
        }
    }

    async fn on_opened(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!(state = %self.state, "Unexpected open");
            return;
        }

        let listener = self.notification_listener();
        if let Err(e) = self.subscriptions.subscribe(listener) {
            warn!(error = %e, "Subscribe failed");
            self.report(&format!("Error: {e}"));
            self.teardown().await;
            return;
        }

        self.set_state(ConnectionState::Connected);
        self.set_menu_label(MenuLabel::Disconnect);
        self.report("Connected");
        info!(connection = ?self.connection_id(), "Connected");
    }

    fn on_message(&mut self, frame: String) {
        let message = ServerMessage::decode(&frame);
        if let ServerMessage::Unknown { command } = &message {
            debug!(%command, "Unknown command from server");
        }
        self.history.push(frame);
        self.report(&message.display_text());
    }

    // ========================================================================
    // Host Events
    // ========================================================================

    fn on_notification(&mut self, notification: &Notification) {
        match (self.state, self.handle.as_ref()) {
            (ConnectionState::Connected, Some(handle)) => {
                self.subscriptions.dispatch(notification, handle);
            }
            _ => trace!(kind = %notification.kind, "Notification while not connected"),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Closes the transport, waits for the unsubscribe, then drops the
    /// handle.
    async fn teardown(&mut self) {
        if let Some(handle) = self.handle.as_ref() {
            handle.close();
        }
        self.subscriptions.unsubscribe().await;

        if let Some(handle) = self.handle.take() {
            info!(connection = %handle.id(), "Disconnected");
        }
        self.set_state(ConnectionState::Disconnected);
        self.set_menu_label(MenuLabel::Connect);
        self.report("Disconnected");
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.reporter.set_connection_indicator(state);
    }

    fn set_menu_label(&self, label: MenuLabel) {
        if self.menu_enabled {
            self.reporter.set_menu_label(label);
        }
    }

    fn report(&self, text: &str) {
        self.reporter.set_status_text(text);
    }

    fn transport_sink(&self) -> EventSink {
        let events_tx = self.events_tx.clone();
        Box::new(move |connection, event| {
            if let Some(events_tx) = events_tx.upgrade() {
                let _ = events_tx.send(BridgeEvent::Transport { connection, event });
            }
        })
    }

    fn notification_listener(&self) -> NotificationListener {
        let events_tx = self.events_tx.clone();
        Arc::new(move |notification| {
            if let Some(events_tx) = events_tx.upgrade() {
                let _ = events_tx.send(BridgeEvent::Notification(notification));
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
