//! Connection state.

use std::fmt;

/// Lifecycle state of the bridge's single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport handle.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake done and host subscription active.
    Connected,
}

impl ConnectionState {
    /// Human-readable name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        }
    }

    /// `true` unless disconnected.
    #[inline]
    #[must_use]
    pub const fn has_handle(self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_has_handle() {
        assert!(!ConnectionState::Disconnected.has_handle());
        assert!(ConnectionState::Connecting.has_handle());
        assert!(ConnectionState::Connected.has_handle());
    }
}
