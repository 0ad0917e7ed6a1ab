//! Bridge configuration.
//!
//! The only operator-facing input is the endpoint URI. The remaining knobs
//! have defaults and exist for embedding and tests.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use layer_bridge::BridgeOptions;
//!
//! let options = BridgeOptions::new()
//!     .with_endpoint("ws://localhost:8080")
//!     .with_connect_timeout(Duration::from_secs(5));
//!
//! assert_eq!(options.endpoint, "ws://localhost:8080");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of inbound frames kept in the message history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

// ============================================================================
// BridgeOptions
// ============================================================================

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Endpoint URI used by the connect toggle.
    pub endpoint: String,

    /// Maximum time allowed for the WebSocket handshake.
    pub connect_timeout: Duration,

    /// Ring buffer size for received frames (0 disables history).
    pub history_capacity: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeOptions {
    /// Creates options with default settings and no endpoint.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            endpoint: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Sets the endpoint. Surrounding whitespace is trimmed.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl AsRef<str>) -> Self {
        self.endpoint = endpoint.as_ref().trim().to_string();
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the message history capacity.
    #[inline]
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Parses an endpoint and checks it is a WebSocket URL.
///
/// # Errors
///
/// Returns [`Error::InvalidEndpoint`] if the string is empty, unparsable, or
/// uses a scheme other than `ws`/`wss`.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_endpoint(endpoint, "endpoint is empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| Error::invalid_endpoint(trimmed, e.to_string()))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(Error::invalid_endpoint(
            trimmed,
            format!("unsupported scheme '{other}', expected ws or wss"),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
