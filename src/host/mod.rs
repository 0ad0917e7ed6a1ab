//! Host application collaborator.
//!
//! The bridge consumes the host's document model through the [`Host`]
//! trait: it asks for the active layer, pulls pixel and mask rasters, and
//! registers for document-change notifications. It never owns or mutates
//! host state.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `memory` | Scriptable in-memory host |

// ============================================================================
// Submodules
// ============================================================================

/// In-memory host implementation.
pub mod memory;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::identifiers::{LayerId, ListenerId};

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryHost, RasterKind};

// ============================================================================
// Capabilities
// ============================================================================

/// What the hosting surface supports.
///
/// The panel and plain-window integrations share one core and differ only
/// in these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Host exposes a flyout menu whose label mirrors the connection state.
    pub has_menu_panel: bool,
    /// Host emits fine-grained layer/mask change notifications.
    pub has_imaging_api: bool,
}

impl Capabilities {
    /// Dockable panel with menu and imaging API.
    #[inline]
    #[must_use]
    pub const fn panel() -> Self {
        Self {
            has_menu_panel: true,
            has_imaging_api: true,
        }
    }

    /// Plain window: no menu, coarse history notifications only.
    #[inline]
    #[must_use]
    pub const fn plain_window() -> Self {
        Self {
            has_menu_panel: false,
            has_imaging_api: false,
        }
    }

    /// Notification kinds worth subscribing to on this host.
    #[must_use]
    pub fn notification_filter(&self) -> Vec<NotificationKind> {
        if self.has_imaging_api {
            vec![
                NotificationKind::CurrentLayerChanged,
                NotificationKind::CurrentMaskChanged,
            ]
        } else {
            vec![
                NotificationKind::HistoryStateChanged,
                NotificationKind::Set,
                NotificationKind::Make,
            ]
        }
    }
}

// ============================================================================
// Bounds
// ============================================================================

/// Pixel rectangle in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Bounds {
    /// Creates a rectangle from its edges.
    #[inline]
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width, clamped to zero.
    #[inline]
    #[must_use]
    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left).max(0)
    }

    /// Height, clamped to zero.
    #[inline]
    #[must_use]
    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top).max(0)
    }

    /// Rectangle at the origin with this rectangle's size.
    ///
    /// Layer reads are always requested relative to the layer itself.
    #[inline]
    #[must_use]
    pub fn at_origin(&self) -> Self {
        Self::new(0, 0, self.width(), self.height())
    }
}

// ============================================================================
// LayerInfo
// ============================================================================

/// Active layer as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    /// Host layer ID.
    pub id: LayerId,
    /// Display name.
    pub name: String,
    /// Layer bounds in document coordinates.
    pub bounds: Bounds,
    /// Whether the layer carries a user mask.
    pub user_mask_enabled: bool,
}

// ============================================================================
// PixelPayload
// ============================================================================

/// Raster returned by a host pixel or mask read.
///
/// `fields` carries whatever descriptive metadata the host attaches
/// (dimensions, component count, colour space); it is forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelPayload {
    /// Host metadata forwarded in the outbound frame.
    pub fields: Map<String, Value>,
    /// Raw pixel bytes.
    pub bytes: Vec<u8>,
}

impl PixelPayload {
    /// Creates a payload with no metadata.
    #[inline]
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            fields: Map::new(),
            bytes,
        }
    }

    /// Adds a metadata field.
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Kind of host document-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Active layer pixels changed.
    CurrentLayerChanged,
    /// Active layer mask changed.
    CurrentMaskChanged,
    /// Undo history advanced.
    HistoryStateChanged,
    /// A property was set.
    Set,
    /// Something was created.
    Make,
    /// Any other host event.
    Other(String),
}

impl NotificationKind {
    /// Host event name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CurrentLayerChanged => "currentLayerChanged",
            Self::CurrentMaskChanged => "currentMaskChanged",
            Self::HistoryStateChanged => "historyStateChanged",
            Self::Set => "set",
            Self::Make => "make",
            Self::Other(name) => name,
        }
    }

    /// Maps a host event name to a kind.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "currentLayerChanged" => Self::CurrentLayerChanged,
            "currentMaskChanged" => Self::CurrentMaskChanged,
            "historyStateChanged" => Self::HistoryStateChanged,
            "set" => Self::Set,
            "make" => Self::Make,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document-change notification delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// What changed.
    pub kind: NotificationKind,
}

impl Notification {
    /// Creates a notification of the given kind.
    #[inline]
    #[must_use]
    pub fn new(kind: NotificationKind) -> Self {
        Self { kind }
    }
}

/// Callback the host invokes for each matching notification.
pub type NotificationListener = Arc<dyn Fn(Notification) + Send + Sync>;

// ============================================================================
// Host
// ============================================================================

/// Host application API consumed by the bridge.
#[async_trait]
pub trait Host: Send + Sync {
    /// Integration capabilities of this host.
    fn capabilities(&self) -> Capabilities;

    /// Returns the active layer of the active document.
    async fn active_layer(&self) -> Result<LayerInfo>;

    /// Reads layer pixels within `bounds`.
    async fn pixels(&self, layer: &LayerId, bounds: Bounds) -> Result<PixelPayload>;

    /// Reads the layer's user mask within `bounds`.
    async fn layer_mask(&self, layer: &LayerId, bounds: Bounds) -> Result<PixelPayload>;

    /// Registers `listener` for the given notification kinds.
    fn add_notification_listener(
        &self,
        kinds: &[NotificationKind],
        listener: NotificationListener,
    ) -> Result<ListenerId>;

    /// Removes a listener previously returned by
    /// [`add_notification_listener`](Self::add_notification_listener).
    fn remove_notification_listener(&self, kinds: &[NotificationKind], id: ListenerId)
    -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
