//! Bounded record of received frames.
//!
//! Kept for diagnostics only; nothing in the protocol reads it.

use std::collections::VecDeque;

/// Ring buffer of raw inbound frames, oldest first.
#[derive(Debug, Clone, Default)]
pub struct MessageHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl MessageHistory {
    /// Creates a history holding at most `capacity` frames.
    ///
    /// A capacity of zero records nothing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends a frame, evicting the oldest when full.
    pub fn push(&mut self, frame: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(frame.into());
    }

    /// Maximum number of frames kept.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of frames kept.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent frame.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    /// Frames from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut history = MessageHistory::new(2);
        history.push("a");
        history.push("b");
        history.push("c");

        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(history.latest(), Some("c"));
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut history = MessageHistory::new(0);
        history.push("a");
        assert!(history.is_empty());
        assert_eq!(history.latest(), None);
    }

    #[test]
    fn test_clear() {
        let mut history = MessageHistory::new(4);
        history.push("a");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 4);
    }
}
