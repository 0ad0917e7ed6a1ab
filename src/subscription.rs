//! Host notification subscription.
//!
//! While the bridge is connected, [`SubscriptionManager`] keeps exactly one
//! listener registered with the host. Each qualifying notification spawns a
//! fetch-and-send task that reads the active layer (and its mask, if any)
//! and pushes one update frame per raster through the transport.
//!
//! Fetches run on their own tasks so a slow host read never holds up
//! transport events. A fetch that finishes after the connection started
//! closing simply skips its sends.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::host::{Host, Notification, NotificationKind, NotificationListener};
use crate::identifiers::ListenerId;
use crate::protocol::{OutboundUpdate, PayloadEncoder, UpdateKind};
use crate::status::StatusReporter;
use crate::transport::TransportHandle;

// ============================================================================
// SubscriptionManager
// ============================================================================

/// Owns the host listener and in-flight fetch tasks.
pub struct SubscriptionManager {
    host: Arc<dyn Host>,
    encoder: Arc<dyn PayloadEncoder>,
    reporter: Arc<dyn StatusReporter>,
    /// Notification kinds registered with the host.
    filter: Vec<NotificationKind>,
    /// Listener registered with the host, if subscribed.
    active: Option<ListenerId>,
    in_flight: JoinSet<()>,
}

impl SubscriptionManager {
    /// Creates an inactive manager. The filter follows the host's
    /// capabilities.
    #[must_use]
    pub fn new(
        host: Arc<dyn Host>,
        encoder: Arc<dyn PayloadEncoder>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        let filter = host.capabilities().notification_filter();
        Self {
            host,
            encoder,
            reporter,
            filter,
            active: None,
            in_flight: JoinSet::new(),
        }
    }

    /// Notification kinds this manager listens for.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &[NotificationKind] {
        &self.filter
    }

    /// `true` while a listener is registered.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Number of fetch tasks not yet reaped.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Registers `listener` with the host.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadySubscribed`] if a listener is already registered
    /// - [`Error::Host`] if the host rejects the registration
    pub fn subscribe(&mut self, listener: NotificationListener) -> Result<()> {
        if self.active.is_some() {
            return Err(Error::AlreadySubscribed);
        }

        let id = self.host.add_notification_listener(&self.filter, listener)?;
        debug!(listener = %id, filter = ?self.filter, "Subscribed to host notifications");
        self.active = Some(id);
        Ok(())
    }

    /// Returns `true` if `notification` should trigger a push.
    #[must_use]
    pub fn qualifies(&self, notification: &Notification) -> bool {
        self.active.is_some() && self.filter.contains(&notification.kind)
    }

    /// Spawns a fetch-and-send task for a qualifying notification.
    ///
    /// Returns `false` if the notification was ignored.
    pub fn dispatch<H: TransportHandle>(&mut self, notification: &Notification, handle: &H) -> bool {
        while self.in_flight.try_join_next().is_some() {}

        if !self.qualifies(notification) {
            trace!(kind = %notification.kind, "Ignoring notification");
            return false;
        }

        let host = Arc::clone(&self.host);
        let encoder = Arc::clone(&self.encoder);
        let reporter = Arc::clone(&self.reporter);
        let handle = handle.clone();
        let kind = notification.kind.clone();

        self.in_flight.spawn(async move {
            match push_active_layer(host.as_ref(), encoder.as_ref(), &handle).await {
                Ok(sent) => debug!(%kind, sent, "Layer update pushed"),
                Err(e) => {
                    warn!(%kind, error = %e, "Layer update failed");
                    reporter.set_status_text(&format!("Error: {e}"));
                }
            }
        });
        true
    }

    /// Waits for every in-flight fetch to finish.
    pub async fn settle(&mut self) {
        while self.in_flight.join_next().await.is_some() {}
    }

    /// Aborts in-flight fetches and removes the listener.
    ///
    /// Safe to call when not subscribed.
    pub async fn unsubscribe(&mut self) {
        self.in_flight.abort_all();
        while self.in_flight.join_next().await.is_some() {}

        let Some(id) = self.active.take() else {
            trace!("Unsubscribe without active listener");
            return;
        };

        match self.host.remove_notification_listener(&self.filter, id) {
            Ok(()) => debug!(listener = %id, "Unsubscribed from host notifications"),
            Err(e) => warn!(listener = %id, error = %e, "Failed to remove host listener"),
        }
    }
}

// ============================================================================
// Fetch And Send
// ============================================================================

/// Reads the active layer and sends its image (and mask, if enabled).
///
/// Reads are bounded to the layer's own size at the origin. Returns the
/// number of frames handed to the transport.
///
/// # Errors
///
/// Propagates host read failures and frame serialization failures.
pub async fn push_active_layer<H: TransportHandle>(
    host: &dyn Host,
    encoder: &dyn PayloadEncoder,
    handle: &H,
) -> Result<usize> {
    let layer = host.active_layer().await?;
    let bounds = layer.bounds.at_origin();

    let pixels = host.pixels(&layer.id, bounds).await?;
    let image = OutboundUpdate::new(
        layer.id.clone(),
        &layer.name,
        UpdateKind::Image,
        bounds,
        pixels,
        encoder,
    );
    let mut sent = send_update(handle, &image)?;

    if layer.user_mask_enabled {
        let mask_pixels = host.layer_mask(&layer.id, bounds).await?;
        let mask = OutboundUpdate::new(
            layer.id.clone(),
            &layer.name,
            UpdateKind::Mask,
            bounds,
            mask_pixels,
            encoder,
        );
        sent += send_update(handle, &mask)?;
    }

    Ok(sent)
}

/// Encodes and sends one update; skipped if the handle is not ready.
fn send_update<H: TransportHandle>(handle: &H, update: &OutboundUpdate) -> Result<usize> {
    if !handle.is_ready() {
        trace!(layer = %update.layer_id, kind = ?update.kind, "Skipping send, transport not ready");
        return Ok(0);
    }

    handle.send(update.encode()?);
    Ok(1)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, from_str};

    use crate::host::{Bounds, Capabilities, MemoryHost, PixelPayload, RasterKind};
    use crate::identifiers::ConnectionId;
    use crate::protocol::Base64Encoder;
    use crate::testing::{MockHandle, RecordingReporter};

    fn setup(host: Arc<MemoryHost>) -> (SubscriptionManager, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        let manager = SubscriptionManager::new(host, Arc::new(Base64Encoder), reporter.clone());
        (manager, reporter)
    }

    fn layer_host() -> Arc<MemoryHost> {
        let host = Arc::new(MemoryHost::new());
        host.set_layer(
            "3",
            "Layer 1",
            Bounds::new(40, 40, 44, 42),
            PixelPayload::new(vec![1, 2, 3, 4]).with_field("width", 4),
        );
        host
    }

    fn noop_listener() -> NotificationListener {
        Arc::new(|_| {})
    }

    fn changed() -> Notification {
        Notification::new(NotificationKind::CurrentLayerChanged)
    }

    #[test]
    fn test_subscribe_registers_one_listener() {
        let host = layer_host();
        let (mut manager, _) = setup(host.clone());

        manager.subscribe(noop_listener()).unwrap();
        assert!(manager.is_active());
        assert_eq!(host.listener_count(), 1);

        let err = manager.subscribe(noop_listener()).unwrap_err();
        assert!(matches!(err, Error::AlreadySubscribed));
        assert_eq!(host.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let host = layer_host();
        let (mut manager, _) = setup(host.clone());

        manager.unsubscribe().await;
        manager.subscribe(noop_listener()).unwrap();
        manager.unsubscribe().await;
        manager.unsubscribe().await;

        assert!(!manager.is_active());
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn test_filter_follows_capabilities() {
        let host = Arc::new(MemoryHost::with_capabilities(Capabilities::plain_window()));
        let (manager, _) = setup(host);
        assert_eq!(
            manager.filter(),
            &[
                NotificationKind::HistoryStateChanged,
                NotificationKind::Set,
                NotificationKind::Make
            ]
        );
    }

    #[tokio::test]
    async fn test_layer_without_mask_sends_image_only() {
        let (mut manager, _) = setup(layer_host());
        let handle = MockHandle::ready(ConnectionId::generate());

        manager.subscribe(noop_listener()).unwrap();
        assert!(manager.dispatch(&changed(), &handle));
        manager.settle().await;

        let sent = handle.sent();
        assert_eq!(sent.len(), 1);
        let frame: Value = from_str(&sent[0]).unwrap();
        assert_eq!(frame["command"], "updateImage");
        assert_eq!(frame["data"]["layerName"], "Layer 1");
        assert_eq!(frame["data"]["data"], "AQIDBA==");
        assert_eq!(frame["data"]["width"], 4);
    }

    #[tokio::test]
    async fn test_layer_with_mask_sends_image_then_mask() {
        let host = layer_host();
        host.set_mask(PixelPayload::new(vec![255])).unwrap();
        let (mut manager, _) = setup(host);
        let handle = MockHandle::ready(ConnectionId::generate());

        manager.subscribe(noop_listener()).unwrap();
        manager.dispatch(&changed(), &handle);
        manager.settle().await;

        let commands: Vec<String> = handle
            .sent()
            .iter()
            .map(|s| from_str::<Value>(s).unwrap()["command"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(commands, vec!["updateImage", "updateMask"]);
    }

    #[tokio::test]
    async fn test_non_qualifying_notification_is_ignored() {
        let (mut manager, _) = setup(layer_host());
        let handle = MockHandle::ready(ConnectionId::generate());

        manager.subscribe(noop_listener()).unwrap();
        assert!(!manager.dispatch(&Notification::new(NotificationKind::Make), &handle));
        manager.settle().await;
        assert!(handle.sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_without_subscription_is_ignored() {
        let (mut manager, _) = setup(layer_host());
        let handle = MockHandle::ready(ConnectionId::generate());

        assert!(!manager.dispatch(&changed(), &handle));
        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_reported_and_subscription_kept() {
        let host = layer_host();
        host.set_fetch_error(Some("document locked".into()));
        let (mut manager, reporter) = setup(host);
        let handle = MockHandle::ready(ConnectionId::generate());

        manager.subscribe(noop_listener()).unwrap();
        manager.dispatch(&changed(), &handle);
        manager.settle().await;

        assert!(handle.sent().is_empty());
        assert_eq!(
            reporter.last_status().as_deref(),
            Some("Error: Host error: document locked")
        );
        assert!(manager.is_active());
    }

    #[tokio::test]
    async fn test_send_skipped_when_transport_not_ready() {
        let (mut manager, reporter) = setup(layer_host());
        let handle = MockHandle::new(ConnectionId::generate());

        manager.subscribe(noop_listener()).unwrap();
        manager.dispatch(&changed(), &handle);
        manager.settle().await;

        assert!(handle.sent().is_empty());
        assert!(reporter.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_push_reads_at_layer_origin() {
        let host = layer_host();
        host.set_mask(PixelPayload::new(vec![255])).unwrap();
        let handle = MockHandle::ready(ConnectionId::generate());

        let sent = push_active_layer(host.as_ref(), &Base64Encoder, &handle)
            .await
            .unwrap();
        assert_eq!(sent, 2);

        // Layer sits at (40, 40, 44, 42); reads are relative to the layer
        assert_eq!(
            host.reads(),
            vec![
                (RasterKind::Pixels, Bounds::new(0, 0, 4, 2)),
                (RasterKind::Mask, Bounds::new(0, 0, 4, 2)),
            ]
        );
    }
}
