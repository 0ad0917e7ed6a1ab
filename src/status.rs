//! Status reporting collaborator.
//!
//! The bridge pushes every user-visible change through [`StatusReporter`]:
//! a single line of status text (the latest one replaces the previous), the
//! connection indicator, and the flyout menu label.
//!
//! Two implementations ship with the crate:
//!
//! - [`TracingReporter`] logs updates through `tracing`
//! - [`StatusBoard`] keeps a snapshot for UIs that poll

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::RwLock;
use tracing::info;

use crate::bridge::ConnectionState;

// ============================================================================
// MenuLabel
// ============================================================================

/// Label of the connect/disconnect menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuLabel {
    /// Shown while disconnected.
    #[default]
    Connect,
    /// Shown while connected.
    Disconnect,
}

impl MenuLabel {
    /// Label text.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::Disconnect => "Disconnect",
        }
    }
}

impl fmt::Display for MenuLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// StatusReporter
// ============================================================================

/// UI surface that displays bridge status.
pub trait StatusReporter: Send + Sync {
    /// Replaces the status line.
    fn set_status_text(&self, text: &str);

    /// Updates the connection indicator.
    fn set_connection_indicator(&self, state: ConnectionState);

    /// Updates the flyout menu label.
    fn set_menu_label(&self, label: MenuLabel);
}

// ============================================================================
// TracingReporter
// ============================================================================

/// Reporter that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn set_status_text(&self, text: &str) {
        info!(status = text, "Status");
    }

    fn set_connection_indicator(&self, state: ConnectionState) {
        info!(%state, "Connection indicator");
    }

    fn set_menu_label(&self, label: MenuLabel) {
        info!(%label, "Menu label");
    }
}

// ============================================================================
// StatusBoard
// ============================================================================

/// Point-in-time copy of a [`StatusBoard`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    /// Latest status line.
    pub text: String,
    /// Latest indicator state.
    pub state: ConnectionState,
    /// Latest menu label.
    pub menu_label: MenuLabel,
}

/// Reporter that remembers the latest value of each field.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: RwLock<StatusSnapshot>,
}

impl StatusBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current values.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().clone()
    }

    /// Latest status line.
    #[must_use]
    pub fn text(&self) -> String {
        self.inner.read().text.clone()
    }
}

impl StatusReporter for StatusBoard {
    fn set_status_text(&self, text: &str) {
        self.inner.write().text = text.to_string();
    }

    fn set_connection_indicator(&self, state: ConnectionState) {
        self.inner.write().state = state;
    }

    fn set_menu_label(&self, label: MenuLabel) {
        self.inner.write().menu_label = label;
    }
}

// ============================================================================
// Tests
// ============================================================================
