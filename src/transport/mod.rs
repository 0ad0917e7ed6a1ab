//! WebSocket transport layer.
//!
//! This module owns the single bidirectional connection between the bridge
//! and the external process.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Bridge (Rust)  │                              │  External       │
//! │                 │         WebSocket            │  process        │
//! │  WsTransport    │─────────────────────────────►│                 │
//! │  → WsHandle     │      endpoint (ws://...)     │  WebSocket      │
//! │                 │◄─────────────────────────────│  Server         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Contract
//!
//! - [`Transport::open`] never blocks; failures arrive as events.
//! - [`TransportHandle::send`] is a silent no-op unless the handle is ready.
//! - [`TransportHandle::close`] is idempotent.
//! - Each handle emits exactly one [`TransportEvent::Opened`] (on success)
//!   and exactly one [`TransportEvent::Closed`]. An
//!   [`TransportEvent::Error`] is always followed by `Closed`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket client and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket client and event loop.
pub mod connection;

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::ConnectionId;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{WsHandle, WsTransport};

// ============================================================================
// TransportEvent
// ============================================================================

/// Something that happened on a transport handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Opened,
    /// Text frame received.
    Message(String),
    /// Failure; a `Closed` event follows.
    Error(String),
    /// Connection terminated, whatever the cause.
    Closed {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason (may be empty).
        reason: String,
    },
}

impl TransportEvent {
    /// `Closed` without a code or reason.
    #[inline]
    #[must_use]
    pub fn closed() -> Self {
        Self::Closed {
            code: None,
            reason: String::new(),
        }
    }
}

/// Receives every event a handle emits, tagged with the handle's ID.
pub type EventSink = Box<dyn Fn(ConnectionId, TransportEvent) + Send + Sync>;

// ============================================================================
// Traits
// ============================================================================

/// Factory for transport handles.
pub trait Transport: Send {
    /// Handle type produced by [`open`](Self::open).
    type Handle: TransportHandle;

    /// Starts connecting to `endpoint` and returns immediately.
    ///
    /// All outcomes are reported through `sink`.
    fn open(&self, endpoint: &str, id: ConnectionId, sink: EventSink) -> Self::Handle;
}

/// Live reference to one connection.
///
/// Clones refer to the same connection.
pub trait TransportHandle: Clone + Send + Sync + 'static {
    /// ID given at `open`.
    fn id(&self) -> ConnectionId;

    /// `true` between `Opened` and the start of shutdown.
    fn is_ready(&self) -> bool;

    /// Queues a text frame; dropped silently if not ready.
    fn send(&self, frame: String);

    /// Requests shutdown; repeated calls are no-ops.
    fn close(&self);
}
