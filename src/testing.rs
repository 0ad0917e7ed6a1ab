//! Test doubles shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::bridge::ConnectionState;
use crate::identifiers::ConnectionId;
use crate::status::{MenuLabel, StatusReporter};
use crate::transport::{EventSink, Transport, TransportEvent, TransportHandle};

// ============================================================================
// MockHandle
// ============================================================================

#[derive(Clone)]
pub(crate) struct MockHandle {
    id: ConnectionId,
    ready: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockHandle {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            ready: Arc::new(AtomicBool::new(false)),
            closes: Arc::new(AtomicUsize::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn ready(id: ConnectionId) -> Self {
        let handle = Self::new(id);
        handle.set_ready(true);
        handle
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl TransportHandle for MockHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn send(&self, frame: String) {
        if self.is_ready() {
            self.sent.lock().push(frame);
        }
    }

    fn close(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// MockTransport
// ============================================================================

/// Records every `open` and keeps the sink so tests can emit events.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    opened: Arc<Mutex<Vec<(String, MockHandle)>>>,
    sinks: Arc<Mutex<Vec<EventSink>>>,
}

impl MockTransport {
    pub(crate) fn endpoints(&self) -> Vec<String> {
        self.opened.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    pub(crate) fn last_handle(&self) -> MockHandle {
        self.opened
            .lock()
            .last()
            .map(|(_, h)| h.clone())
            .expect("transport was never opened")
    }

    /// Emits `event` through the sink of the most recent `open`.
    pub(crate) fn emit(&self, event: TransportEvent) {
        let handle = self.last_handle();
        if event == TransportEvent::Opened {
            handle.set_ready(true);
        }
        let sinks = self.sinks.lock();
        let sink = sinks.last().expect("transport was never opened");
        sink(handle.id(), event);
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn open(&self, endpoint: &str, id: ConnectionId, sink: EventSink) -> MockHandle {
        let handle = MockHandle::new(id);
        self.opened
            .lock()
            .push((endpoint.to_string(), handle.clone()));
        self.sinks.lock().push(sink);
        handle
    }
}

// ============================================================================
// RecordingReporter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Report {
    Status(String),
    Indicator(ConnectionState),
    Menu(MenuLabel),
}

#[derive(Default)]
pub(crate) struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub(crate) fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub(crate) fn statuses(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Status(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }

    pub(crate) fn menu_labels(&self) -> Vec<MenuLabel> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Menu(label) => Some(*label),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl StatusReporter for RecordingReporter {
    fn set_status_text(&self, text: &str) {
        self.reports.lock().push(Report::Status(text.to_string()));
    }

    fn set_connection_indicator(&self, state: ConnectionState) {
        self.reports.lock().push(Report::Indicator(state));
    }

    fn set_menu_label(&self, label: MenuLabel) {
        self.reports.lock().push(Report::Menu(label));
    }
}
