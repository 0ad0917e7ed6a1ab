//! Scriptable in-memory host.
//!
//! [`MemoryHost`] holds a single active layer with optional mask and a
//! listener registry. Calling [`MemoryHost::notify`] fans a notification out
//! to every listener whose filter contains its kind, the same way a real
//! host's notifier would.
//!
//! # Example
//!
//! ```
//! use layer_bridge::host::{Bounds, MemoryHost, PixelPayload};
//!
//! let host = MemoryHost::new();
//! host.set_layer("1", "Layer 1", Bounds::new(0, 0, 2, 2), PixelPayload::new(vec![0; 16]));
//! assert_eq!(host.listener_count(), 0);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{LayerId, ListenerId};

use super::{
    Bounds, Capabilities, Host, LayerInfo, Notification, NotificationKind, NotificationListener,
    PixelPayload,
};

// ============================================================================
// Types
// ============================================================================

/// Stored layer content.
#[derive(Debug, Clone)]
struct MemoryLayer {
    info: LayerInfo,
    pixels: PixelPayload,
    mask: Option<PixelPayload>,
}

/// Which raster a host read returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterKind {
    /// Layer pixels.
    Pixels,
    /// User mask.
    Mask,
}

/// Registered listener with its filter.
struct ListenerEntry {
    kinds: Vec<NotificationKind>,
    listener: NotificationListener,
}

// ============================================================================
// MemoryHost
// ============================================================================

/// In-memory [`Host`] implementation.
pub struct MemoryHost {
    capabilities: Capabilities,
    layer: Mutex<Option<MemoryLayer>>,
    listeners: Mutex<FxHashMap<ListenerId, ListenerEntry>>,
    next_listener: AtomicU64,
    fetch_error: Mutex<Option<String>>,
    /// Successful raster reads, oldest first.
    reads: Mutex<Vec<(RasterKind, Bounds)>>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Creates an empty host with panel capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::panel())
    }

    /// Creates an empty host with the given capabilities.
    #[must_use]
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            layer: Mutex::new(None),
            listeners: Mutex::new(FxHashMap::default()),
            next_listener: AtomicU64::new(1),
            fetch_error: Mutex::new(None),
            reads: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the active layer (without a mask).
    pub fn set_layer(
        &self,
        id: impl Into<LayerId>,
        name: impl Into<String>,
        bounds: Bounds,
        pixels: PixelPayload,
    ) {
        *self.layer.lock() = Some(MemoryLayer {
            info: LayerInfo {
                id: id.into(),
                name: name.into(),
                bounds,
                user_mask_enabled: false,
            },
            pixels,
            mask: None,
        });
    }

    /// Attaches a user mask to the active layer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Host`] if there is no active layer.
    pub fn set_mask(&self, mask: PixelPayload) -> Result<()> {
        let mut guard = self.layer.lock();
        let layer = guard
            .as_mut()
            .ok_or_else(|| Error::host("no active layer"))?;
        layer.info.user_mask_enabled = true;
        layer.mask = Some(mask);
        Ok(())
    }

    /// Removes the active layer.
    pub fn clear_layer(&self) {
        *self.layer.lock() = None;
    }

    /// Makes every subsequent fetch fail with `message` until cleared.
    pub fn set_fetch_error(&self, message: Option<String>) {
        *self.fetch_error.lock() = message;
    }

    /// Raster reads served so far, with the bounds each was asked for.
    #[must_use]
    pub fn reads(&self) -> Vec<(RasterKind, Bounds)> {
        self.reads.lock().clone()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Delivers a notification to every listener whose filter matches.
    ///
    /// Returns how many listeners were invoked.
    pub fn notify(&self, notification: Notification) -> usize {
        let targets: Vec<NotificationListener> = self
            .listeners
            .lock()
            .values()
            .filter(|entry| entry.kinds.contains(&notification.kind))
            .map(|entry| entry.listener.clone())
            .collect();

        trace!(kind = %notification.kind, listeners = targets.len(), "Host notification");

        for listener in &targets {
            listener(notification.clone());
        }
        targets.len()
    }

    fn check_fetch(&self) -> Result<()> {
        match self.fetch_error.lock().as_ref() {
            Some(message) => Err(Error::host(message.clone())),
            None => Ok(()),
        }
    }

    fn find_layer(&self, id: &LayerId) -> Result<MemoryLayer> {
        match self.layer.lock().as_ref() {
            Some(layer) if &layer.info.id == id => Ok(layer.clone()),
            _ => Err(Error::host(format!("layer {id} not found"))),
        }
    }
}

// ============================================================================
// Host Implementation
// ============================================================================

#[async_trait]
impl Host for MemoryHost {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn active_layer(&self) -> Result<LayerInfo> {
        self.check_fetch()?;
        self.layer
            .lock()
            .as_ref()
            .map(|layer| layer.info.clone())
            .ok_or_else(|| Error::host("no active layer"))
    }

    async fn pixels(&self, layer: &LayerId, bounds: Bounds) -> Result<PixelPayload> {
        self.check_fetch()?;
        let stored = self.find_layer(layer)?;
        debug!(layer = %layer, ?bounds, "Reading layer pixels");
        self.reads.lock().push((RasterKind::Pixels, bounds));
        Ok(stored.pixels)
    }

    async fn layer_mask(&self, layer: &LayerId, bounds: Bounds) -> Result<PixelPayload> {
        self.check_fetch()?;
        let stored = self.find_layer(layer)?;
        debug!(layer = %layer, ?bounds, "Reading layer mask");
        let mask = stored
            .mask
            .ok_or_else(|| Error::host(format!("layer {layer} has no user mask")))?;
        self.reads.lock().push((RasterKind::Mask, bounds));
        Ok(mask)
    }

    fn add_notification_listener(
        &self,
        kinds: &[NotificationKind],
        listener: NotificationListener,
    ) -> Result<ListenerId> {
        let id = ListenerId::new(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(
            id,
            ListenerEntry {
                kinds: kinds.to_vec(),
                listener,
            },
        );
        debug!(listener = %id, ?kinds, "Listener added");
        Ok(id)
    }

    fn remove_notification_listener(
        &self,
        _kinds: &[NotificationKind],
        id: ListenerId,
    ) -> Result<()> {
        if self.listeners.lock().remove(&id).is_some() {
            debug!(listener = %id, "Listener removed");
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
