//! CAN Trace Decoder Library
//!
//! Rebuilds application messages that were split across several raw 8-byte
//! CAN frames, then slices each message payload into named fields following
//! a declarative layout.
//!
//! # Architecture
//!
//! Two independent components do the real work:
//! - [`SegmentReassembler`] - per-channel state machine that turns
//!   first/middle/end/single segments into [`CompleteMessage`]s
//! - [`LayoutDecoder`] - pure interpreter that walks a payload along a tree
//!   of FIXED / DYNAMIC / BLOCK fields and yields [`DecodedFields`]
//!
//! [`TraceDecoder`] wires the two together behind a [`LayoutDocument`].
//!
//! The library does NOT:
//! - Tokenize log files (callers build [`Frame`]s from whatever they read)
//! - Open or locate configuration files
//! - Format reports
//!
//! # Example Usage
//!
//! ```
//! use can_trace_decoder::{Frame, TraceDecoder};
//!
//! let layout = r#"{
//!     "cob": "1FA",
//!     "decode": [
//!         { "type": "FIXED", "length": 1, "name": "CODE" },
//!         { "type": "DYNAMIC", "length": 1, "name": "TIME" }
//!     ]
//! }"#;
//! let mut decoder = TraceDecoder::from_json_str(layout).unwrap();
//!
//! let frames = vec![
//!     Frame::from_hex("00:30:33.020", "1FA", "00 7B 00 06 02 04 11 22").unwrap(),
//!     Frame::from_hex("00:30:33.025", "1FA", "42 33 44 00 00 00 00 00").unwrap(),
//! ];
//!
//! for event in decoder.decode_frames(frames) {
//!     match event {
//!         Ok(decoded) => {
//!             let fields = decoded.fields().unwrap();
//!             assert_eq!(fields.get_hex("TIME").as_deref(), Some("11223344"));
//!         }
//!         Err(e) => eprintln!("Decode error: {}", e),
//!     }
//! }
//! ```

// Public modules
pub mod bits;
pub mod config;
pub mod decoder;
pub mod layout;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use config::{ByteOrder, LayoutDocument};
pub use decoder::{DecodingIterator, TraceDecoder};
pub use layout::{decode_payload, LayoutDecoder, LayoutField};
pub use transport::{
    PartialMessage, ReassemblerStats, SegmentHeader, SegmentKind, SegmentReassembler,
};
pub use types::{
    ChannelId, CompleteMessage, ConfigError, DecodeError, DecodedEvent, DecodedFields,
    DecoderError, Frame, ProtocolError, Result,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: a fresh reassembler has seen nothing
        let reassembler = SegmentReassembler::new();
        let stats = reassembler.stats();
        assert_eq!(stats.frames, 0);
        assert_eq!(stats.in_flight, 0);
        assert!(!VERSION.is_empty());
    }
}
