//! Layer and mask update frames.
//!
//! One frame is produced per raster read. The frame is a JSON object:
//!
//! ```json
//! {
//!   "command": "updateImage",
//!   "data": {
//!     "...": "host payload fields",
//!     "layerName": "Layer 1",
//!     "data": "<text-encoded raster>"
//!   }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, to_string};

use crate::error::Result;
use crate::host::{Bounds, PixelPayload};
use crate::identifiers::LayerId;

use super::PayloadEncoder;

// ============================================================================
// Constants
// ============================================================================

/// Key holding the layer name inside `data`.
const LAYER_NAME_KEY: &str = "layerName";

/// Key holding the encoded raster inside `data`.
const ENCODED_KEY: &str = "data";

// ============================================================================
// UpdateKind / UpdateCommand
// ============================================================================

/// Which raster an update carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// Layer pixels.
    Image,
    /// Layer user mask.
    Mask,
}

impl UpdateKind {
    /// Wire command for this kind.
    #[inline]
    #[must_use]
    pub const fn command(self) -> UpdateCommand {
        match self {
            Self::Image => UpdateCommand::UpdateImage,
            Self::Mask => UpdateCommand::UpdateMask,
        }
    }
}

/// Outbound command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateCommand {
    /// `updateImage`
    UpdateImage,
    /// `updateMask`
    UpdateMask,
}

// ============================================================================
// OutboundUpdate
// ============================================================================

/// A single raster ready to be sent.
///
/// Built per qualifying host notification and dropped right after it is
/// handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundUpdate {
    /// Host layer ID.
    pub layer_id: LayerId,
    /// Layer display name.
    pub layer_name: String,
    /// Image or mask.
    pub kind: UpdateKind,
    /// Region that was read, relative to the layer.
    pub bounds: Bounds,
    /// Raster as returned by the host.
    pub payload: PixelPayload,
    /// Text encoding of `payload.bytes`.
    pub encoded: String,
}

impl OutboundUpdate {
    /// Builds an update, encoding the payload with `encoder`.
    #[must_use]
    pub fn new(
        layer_id: LayerId,
        layer_name: impl Into<String>,
        kind: UpdateKind,
        bounds: Bounds,
        payload: PixelPayload,
        encoder: &dyn PayloadEncoder,
    ) -> Self {
        let encoded = encoder.encode(&payload.bytes);
        Self {
            layer_id,
            layer_name: layer_name.into(),
            kind,
            bounds,
            payload,
            encoded,
        }
    }

    /// Converts into the wire frame.
    #[must_use]
    pub fn to_frame(&self) -> UpdateFrame {
        let mut data = self.payload.fields.clone();
        data.insert(
            LAYER_NAME_KEY.to_string(),
            Value::String(self.layer_name.clone()),
        );
        data.insert(ENCODED_KEY.to_string(), Value::String(self.encoded.clone()));

        UpdateFrame {
            command: self.kind.command(),
            data,
        }
    }

    /// Serializes the wire frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if a host field cannot be
    /// serialized.
    pub fn encode(&self) -> Result<String> {
        Ok(to_string(&self.to_frame())?)
    }
}

// ============================================================================
// UpdateFrame
// ============================================================================

/// Wire form of an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateFrame {
    /// `updateImage` or `updateMask`.
    pub command: UpdateCommand,
    /// Host fields plus `layerName` and `data`.
    pub data: Map<String, Value>,
}

impl UpdateFrame {
    /// Layer name carried in `data`.
    #[must_use]
    pub fn layer_name(&self) -> Option<&str> {
        self.data.get(LAYER_NAME_KEY).and_then(Value::as_str)
    }

    /// Encoded raster carried in `data`.
    #[must_use]
    pub fn encoded(&self) -> Option<&str> {
        self.data.get(ENCODED_KEY).and_then(Value::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================
