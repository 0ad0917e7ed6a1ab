//! Connection state machine.
//!
//! The [`Bridge`] owns the transport handle and the subscription manager and
//! processes every external event through one handler, in arrival order.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | State machine and event loop |
//! | [`BridgeController`] | Cloneable sender for operator and host events |
//! | [`BridgeEvent`] | Everything the bridge reacts to |
//! | [`ConnectionState`] | `Disconnected` / `Connecting` / `Connected` |
//! | [`MessageHistory`] | Bounded record of received frames |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use layer_bridge::{Bridge, BridgeOptions, MemoryHost, StatusBoard};
//!
//! # async fn example() -> layer_bridge::Result<()> {
//! let host = Arc::new(MemoryHost::new());
//! let status = Arc::new(StatusBoard::new());
//! let options = BridgeOptions::new().with_endpoint("ws://localhost:8080");
//!
//! let bridge = Bridge::websocket(options, host, status.clone());
//! let controller = bridge.controller();
//! tokio::spawn(bridge.run());
//!
//! controller.toggle()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Bridge state machine and event loop.
pub mod core;

/// Bounded message history.
pub mod history;

/// Connection state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Bridge, BridgeController, BridgeEvent};
pub use history::MessageHistory;
pub use state::ConnectionState;
