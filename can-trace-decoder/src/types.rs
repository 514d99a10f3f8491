//! Core types for the CAN trace decoder library
//!
//! This module defines the values that flow between the reassembler, the
//! layout decoder and the caller: raw frames in, complete messages and named
//! field maps out, plus the error taxonomy shared by all stages.

use crate::transport::SegmentKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Number of data bytes in a classic CAN frame
pub const MAX_FRAME_LEN: usize = 8;

/// CAN communication object identifier (COB id)
///
/// A non-empty hex token such as `"1FA"` or `"cb3"`. Parsing is
/// case-insensitive and the stored form is always uppercase, so two ids that
/// differ only in case compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    /// Parse and canonicalize a channel id
    pub fn parse(text: &str) -> std::result::Result<Self, ProtocolError> {
        let trimmed = text.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ProtocolError::InvalidChannelId(text.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Canonical (uppercase) text of the id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for ChannelId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChannelId {
    type Error = ProtocolError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

/// Raw CAN frame as handed over by the log reader
///
/// The timestamp is carried through untouched; the decoder never parses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Timestamp text from the log line
    pub timestamp: String,
    /// Channel (COB id) the frame was seen on
    pub channel: ChannelId,
    /// Frame data bytes (0-8)
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame from already-parsed parts
    pub fn new(timestamp: impl Into<String>, channel: ChannelId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: timestamp.into(),
            channel,
            data: data.into(),
        }
    }

    /// Create a frame from the textual columns of a log line
    ///
    /// ```
    /// use can_trace_decoder::Frame;
    ///
    /// let frame = Frame::from_hex("00:30:06.866", "184", "00 06 00 16 75 EE 00 3C").unwrap();
    /// assert_eq!(frame.channel.as_str(), "184");
    /// assert_eq!(frame.dlc(), 8);
    /// ```
    pub fn from_hex(
        timestamp: impl Into<String>,
        channel: &str,
        data_hex: &str,
    ) -> std::result::Result<Self, ProtocolError> {
        let channel = ChannelId::parse(channel)?;
        let data = crate::bits::parse_hex(data_hex)?;
        Ok(Self::new(timestamp, channel, data))
    }

    /// Data length code - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// A fully reassembled application message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteMessage {
    /// Timestamp of the terminating segment
    pub timestamp: String,
    /// Timestamp of the first segment (same as `timestamp` for single segments)
    pub started_at: String,
    /// Channel the message was reassembled on
    pub channel: ChannelId,
    /// Message number carried by the first (or single) segment
    pub message_number: u8,
    /// Reassembled payload
    pub payload: Vec<u8>,
    /// Total length announced by the first segment (None for single segments)
    pub declared_length: Option<u16>,
    /// Number of frames that made up this message
    pub segment_count: usize,
}

impl CompleteMessage {
    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload as uppercase hex text
    pub fn payload_hex(&self) -> String {
        crate::bits::to_hex(&self.payload)
    }

    /// True when the first segment announced a length different from what arrived
    pub fn has_length_mismatch(&self) -> bool {
        self.declared_length
            .is_some_and(|declared| usize::from(declared) != self.payload.len())
    }

    /// One-line record: `time ; cob ; msg number ; len ; payload`
    pub fn summary_line(&self) -> String {
        format!(
            "{:<14} ; {:<4} ; {:<6} ; {:<6} ; {}",
            self.started_at,
            self.channel,
            self.message_number,
            self.len(),
            self.payload_hex()
        )
    }
}

/// Named field values produced by one layout decode pass
///
/// Entries keep the order in which the layout walk produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFields {
    entries: Vec<(String, Vec<u8>)>,
}

impl DecodedFields {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: String, value: Vec<u8>) {
        self.entries.push((name, value));
    }

    /// Raw bytes of a field
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Field value as uppercase hex text
    pub fn get_hex(&self, name: &str) -> Option<String> {
        self.get(name).map(crate::bits::to_hex)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(qualified name, raw bytes)` in decode order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Iterate over `(qualified name, hex text)` in decode order
    pub fn iter_hex(&self) -> impl Iterator<Item = (&str, String)> {
        self.iter().map(|(n, v)| (n, crate::bits::to_hex(v)))
    }

    /// Qualified field names in decode order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Render the "Values:" block, one right-aligned name per line
    pub fn render(&self) -> String {
        let mut out = String::from("Values:\n");
        for (name, value) in self.iter_hex() {
            out.push_str(&format!("{:>25} - {}\n", name, value));
        }
        out
    }
}

/// Output of the trace decoding pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// A message that passed the layout filter and decoded cleanly
    Message {
        message: CompleteMessage,
        fields: DecodedFields,
    },

    /// A complete message rejected by the length filter
    Skipped { message: CompleteMessage },
}

impl DecodedEvent {
    /// The underlying complete message
    pub fn message(&self) -> &CompleteMessage {
        match self {
            DecodedEvent::Message { message, .. } => message,
            DecodedEvent::Skipped { message } => message,
        }
    }

    /// Decoded fields, if the message was decoded
    pub fn fields(&self) -> Option<&DecodedFields> {
        match self {
            DecodedEvent::Message { fields, .. } => Some(fields),
            DecodedEvent::Skipped { .. } => None,
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.message().timestamp
    }

    pub fn channel(&self) -> &ChannelId {
        &self.message().channel
    }
}

/// Recoverable, per-frame reassembly errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty frame on channel {0}")]
    EmptyFrame(ChannelId),

    #[error("Frame on channel {channel} has {len} data bytes (max 8)")]
    OversizedFrame { channel: ChannelId, len: usize },

    #[error("Invalid command specifier {cs:03b} on channel {channel}")]
    InvalidCommandSpecifier { channel: ChannelId, cs: u8 },

    #[error("{kind} segment on channel {channel} declares {byte_count} bytes (max {max})")]
    ByteCountOutOfRange {
        channel: ChannelId,
        kind: SegmentKind,
        byte_count: u8,
        max: u8,
    },

    #[error("{kind} segment on channel {channel} without a first segment, discarded")]
    MissingFirstSegment { channel: ChannelId, kind: SegmentKind },

    #[error(
        "Message {message_number} on channel {channel} was incomplete ({received} bytes), \
         discarded and replaced by a new one"
    )]
    IncompleteMessageDiscarded {
        channel: ChannelId,
        message_number: u8,
        received: usize,
    },

    #[error("Invalid channel id: {0:?}")]
    InvalidChannelId(String),

    #[error("Invalid hex payload: {0}")]
    InvalidHex(String),
}

/// Recoverable, per-message layout decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(
        "Field '{field}' needs {needed} bytes at offset {offset} but only {available} remain"
    )]
    OutOfBounds {
        field: String,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Field '{field}' has a {width}-byte count prefix (max 8)")]
    PrefixTooWide { field: String, width: usize },

    #[error("Block '{field}' consumes no bytes per repetition")]
    EmptyRepetition { field: String },
}

/// Fatal layout configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse layout document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Layout has no fields")]
    EmptyLayout,

    #[error("Field #{index} in {scope} has an empty name")]
    EmptyName { scope: String, index: usize },

    #[error("Field '{name}' has zero length")]
    ZeroLength { name: String },

    #[error("Duplicate field name '{name}' in {scope}")]
    DuplicateName { name: String, scope: String },

    #[error("Block '{name}' has no subfields")]
    EmptyBlock { name: String },

    #[error("min_length {min} is greater than max_length {max}")]
    InvalidLengthBounds { min: usize, max: usize },
}

/// Errors that can occur anywhere in the decoder
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to decode message {message_number} on channel {channel}: {source}")]
    MessageDecode {
        channel: ChannelId,
        message_number: u8,
        #[source]
        source: DecodeError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DecoderError {
    /// True for errors after which processing can go on with the next frame
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DecoderError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(payload: Vec<u8>, declared: Option<u16>) -> CompleteMessage {
        CompleteMessage {
            timestamp: "00:30:06.866".to_string(),
            started_at: "00:30:06.866".to_string(),
            channel: ChannelId::parse("184").unwrap(),
            message_number: 6,
            payload,
            declared_length: declared,
            segment_count: 4,
        }
    }

    #[test]
    fn test_channel_id_canonical_form() {
        let lower = ChannelId::parse("cb3").unwrap();
        let upper: ChannelId = "CB3".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.as_str(), "CB3");
        assert_eq!(ChannelId::parse(" 1fa ").unwrap().to_string(), "1FA");
    }

    #[test]
    fn test_channel_id_honors_width() {
        let id = ChannelId::parse("184").unwrap();
        assert_eq!(format!("[{:<5}]", id), "[184  ]");
        assert_eq!(format!("[{:>5}]", id), "[  184]");
    }

    #[test]
    fn test_channel_id_rejects_non_hex() {
        assert!(ChannelId::parse("").is_err());
        assert!(ChannelId::parse("1G0").is_err());
        assert!(ChannelId::parse("0x1FA").is_err());
    }

    #[test]
    fn test_channel_id_serde() {
        let id: ChannelId = serde_json::from_str("\"1fa\"").unwrap();
        assert_eq!(id.as_str(), "1FA");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1FA\"");
        assert!(serde_json::from_str::<ChannelId>("\"zz\"").is_err());
    }

    #[test]
    fn test_frame_from_hex() {
        let frame = Frame::from_hex("t", "208", "54CB3CFFFEFFFFFF").unwrap();
        assert_eq!(frame.data[0], 0x54);
        assert_eq!(frame.dlc(), 8);
        assert!(Frame::from_hex("t", "208", "54C").is_err());
    }

    #[test]
    fn test_complete_message_summary_line() {
        let msg = message(vec![0x75, 0xEE], Some(2));
        assert_eq!(msg.len(), 2);
        assert_eq!(msg.summary_line(), "00:30:06.866   ; 184  ; 6      ; 2      ; 75EE");
        assert!(!msg.has_length_mismatch());
    }

    #[test]
    fn test_complete_message_length_mismatch() {
        assert!(message(vec![0x01], Some(2)).has_length_mismatch());
        assert!(!message(vec![0x01], None).has_length_mismatch());
    }

    #[test]
    fn test_decoded_fields_order_and_render() {
        let mut fields = DecodedFields::new();
        fields.insert("CODE".to_string(), vec![0x02]);
        fields.insert("LEN".to_string(), vec![0x00, 0x22]);

        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["CODE", "LEN"]);
        assert_eq!(fields.get_hex("LEN").as_deref(), Some("0022"));
        assert_eq!(fields.get("MISSING"), None);
        assert_eq!(
            fields.render(),
            format!("Values:\n{:>25} - 02\n{:>25} - 0022\n", "CODE", "LEN")
        );
    }

    #[test]
    fn test_error_recoverability() {
        let protocol: DecoderError = ProtocolError::InvalidHex("x".into()).into();
        assert!(protocol.is_recoverable());
        let config: DecoderError = ConfigError::EmptyLayout.into();
        assert!(!config.is_recoverable());
    }
}
