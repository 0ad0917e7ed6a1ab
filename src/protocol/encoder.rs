//! Pixel payload text encoders.
//!
//! Outbound frames are text, so raw raster bytes are converted with an
//! injected [`PayloadEncoder`]. [`Base64Encoder`] is the default.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;

// ============================================================================
// PayloadEncoder
// ============================================================================

/// Converts raw pixel bytes into a text-safe string.
pub trait PayloadEncoder: Send + Sync {
    /// Encodes `bytes`.
    fn encode(&self, bytes: &[u8]) -> String;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

// ============================================================================
// Base64Encoder
// ============================================================================

/// Standard-alphabet, padded base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Encoder;

impl PayloadEncoder for Base64Encoder {
    #[inline]
    fn encode(&self, bytes: &[u8]) -> String {
        Base64Standard.encode(bytes)
    }

    fn name(&self) -> &'static str {
        "base64"
    }
}

// ============================================================================
// Tests
// ============================================================================
