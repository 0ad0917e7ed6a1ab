//! Layer Bridge - stream image-editor layers to an external process.
//!
//! This library connects a host image-editing application to an external
//! process over a single WebSocket connection. While connected, every
//! change to the active layer is pushed as an image (and mask) update, and
//! the remote side's short textual replies are surfaced as status text.
//!
//! # Architecture
//!
//! - **Host (editor)**: Exposes layers and document-change notifications
//!   through the [`Host`] trait
//! - **Bridge (Rust)**: Connection state machine, one event at a time
//! - **Remote (external process)**: WebSocket server consuming updates
//!
//! Key design principles:
//!
//! - One [`Bridge`] owns at most one connection and one host subscription
//! - Transport and host callbacks post events; only the bridge mutates state
//! - Failures never escape; they become status text
//! - Events from a superseded connection are ignored
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use layer_bridge::{Bridge, BridgeOptions, MemoryHost, Result, TracingReporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let host = Arc::new(MemoryHost::new());
//!     let options = BridgeOptions::new().with_endpoint("ws://localhost:8080");
//!
//!     let bridge = Bridge::websocket(options, host, Arc::new(TracingReporter));
//!     let controller = bridge.controller();
//!     let task = tokio::spawn(bridge.run());
//!
//!     controller.toggle()?;
//!     controller.shutdown()?;
//!     let _ = task.await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | State machine: [`Bridge`], [`BridgeController`], [`ConnectionState`] |
//! | [`config`] | [`BridgeOptions`] and endpoint validation |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | [`Host`] trait and the in-memory [`MemoryHost`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Update frames and inbound control lines |
//! | [`status`] | [`StatusReporter`] trait and implementations |
//! | [`subscription`] | Host notification subscription |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Connection state machine.
///
/// - [`Bridge`] - Event loop owning the connection
/// - [`BridgeController`] - Cloneable entry point for actions
pub mod bridge;

/// Bridge configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Host application collaborator.
pub mod host;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// WebSocket protocol message types.
///
/// Outbound update frames and inbound `command=args` lines.
pub mod protocol;

/// Status reporting.
pub mod status;

/// Host notification subscription.
pub mod subscription;

/// WebSocket transport layer.
///
/// Client connection and event loop, behind the [`transport::Transport`] trait.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Bridge, BridgeController, BridgeEvent, ConnectionState, MessageHistory};

// Configuration
pub use config::BridgeOptions;

// Error types
pub use error::{Error, Result};

// Host types
pub use host::{
    Bounds, Capabilities, Host, LayerInfo, MemoryHost, Notification, NotificationKind,
    PixelPayload, RasterKind,
};

// Identifier types
pub use identifiers::{ConnectionId, LayerId, ListenerId};

// Protocol types
pub use protocol::{Base64Encoder, PayloadEncoder, ServerMessage};

// Status types
pub use status::{MenuLabel, StatusBoard, StatusReporter, TracingReporter};

// Transport types
pub use transport::{TransportEvent, WsTransport};
