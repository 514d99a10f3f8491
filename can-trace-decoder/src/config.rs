//! Layout document configuration
//!
//! A layout document describes one kind of packet: which channel it is sent
//! on, which payload lengths are plausible, the byte order of length/count
//! prefixes, and the field layout itself. It is usually written as JSON:
//!
//! ```json
//! {
//!     "cob": "1FA",
//!     "endianess": "BIG",
//!     "min_length": 3,
//!     "max_length": 1024,
//!     "decode": [ { "type": "FIXED", "length": 1, "name": "CODE" } ]
//! }
//! ```
//!
//! Loading a document either yields a validated [`LayoutDocument`] or a
//! [`ConfigError`]; a malformed document should stop the caller before any
//! frame is processed.

use crate::layout::{validate_layout, LayoutField};
use crate::types::{ChannelId, CompleteMessage, ConfigError};
use serde::{Deserialize, Serialize};

/// Byte order of multi-byte length and count prefixes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Most significant byte first
    #[default]
    #[serde(rename = "BIG", alias = "big")]
    Big,
    /// Least significant byte first
    #[serde(rename = "LITTLE", alias = "little", alias = "SMALL", alias = "small")]
    Little,
}

/// Packet description: filters plus field layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    /// Only decode messages from this channel (None = every channel)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cob: Option<ChannelId>,

    /// Byte order for length/count prefixes
    #[serde(default, rename = "endianess", alias = "endianness")]
    pub byte_order: ByteOrder,

    /// Minimum payload length in bytes (0 = no bound)
    #[serde(default)]
    pub min_length: usize,

    /// Maximum payload length in bytes (0 = no bound)
    #[serde(default)]
    pub max_length: usize,

    /// Field layout
    pub decode: Vec<LayoutField>,
}

impl LayoutDocument {
    /// Create a document with no filters and big-endian prefixes
    pub fn new(decode: Vec<LayoutField>) -> Self {
        Self {
            cob: None,
            byte_order: ByteOrder::default(),
            min_length: 0,
            max_length: 0,
            decode,
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let document: LayoutDocument = serde_json::from_str(json)?;
        document.validate()?;
        log::info!(
            "Layout loaded: cob={} fields={} depth={}",
            document
                .cob
                .as_ref()
                .map(ChannelId::as_str)
                .unwrap_or("*"),
            document.decode.len(),
            crate::layout::max_depth(&document.decode)
        );
        Ok(document)
    }

    /// Build and validate a document from an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let document: LayoutDocument = serde_json::from_value(value)?;
        document.validate()?;
        Ok(document)
    }

    /// Check the layout tree and the length bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length > 0 && self.max_length > 0 && self.min_length > self.max_length {
            return Err(ConfigError::InvalidLengthBounds {
                min: self.min_length,
                max: self.max_length,
            });
        }
        validate_layout(&self.decode)
    }

    /// Builder method: restrict decoding to one channel
    pub fn with_cob(mut self, cob: ChannelId) -> Self {
        self.cob = Some(cob);
        self
    }

    /// Builder method: set payload length bounds (0 disables a bound)
    pub fn with_length_bounds(mut self, min_length: usize, max_length: usize) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    /// Builder method: set prefix byte order
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Check if frames from a channel should be processed
    pub fn should_process_channel(&self, channel: &ChannelId) -> bool {
        match &self.cob {
            Some(cob) => cob == channel,
            None => true,
        }
    }

    /// Check if a payload length is within the configured bounds
    pub fn should_process_length(&self, len: usize) -> bool {
        let above_min = self.min_length == 0 || len >= self.min_length;
        let below_max = self.max_length == 0 || len <= self.max_length;
        above_min && below_max
    }

    /// Check if a complete message should be handed to the layout decoder
    pub fn accepts(&self, message: &CompleteMessage) -> bool {
        self.should_process_channel(&message.channel) && self.should_process_length(message.len())
    }
}
