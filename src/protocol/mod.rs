//! WebSocket protocol message types.
//!
//! This module defines the wire format between the bridge and the external
//! process.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Format |
//! |---------|-----------|--------|
//! | `updateImage` | Bridge → Remote | JSON object |
//! | `updateMask` | Bridge → Remote | JSON object |
//! | `text` / `err` / other | Remote → Bridge | `command=arg...` text line |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `encoder` | Pixel payload text encoders |
//! | `inbound` | Inbound control line decoding |
//! | `outbound` | Layer/mask update frames |

// ============================================================================
// Submodules
// ============================================================================

/// Pixel payload text encoders.
pub mod encoder;

/// Inbound control line decoding.
pub mod inbound;

/// Layer and mask update frames.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use encoder::{Base64Encoder, PayloadEncoder};
pub use inbound::{InboundMessage, ServerMessage};
pub use outbound::{OutboundUpdate, UpdateCommand, UpdateFrame, UpdateKind};
