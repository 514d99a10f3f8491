//! Segmented message transport
//!
//! Reassembles application messages that were split across several 8-byte
//! CAN frames. Byte 0 of every frame carries the segment header:
//!
//! ```text
//! byte 0      xxx-----    CS  command specifier (000 first, 001 middle, 010 end, 011 single)
//!             ---xx---    SN  serial number of the segment (cyclic)
//!             -----xxx    VB  valid data bytes in an end/single segment
//! ```
//!
//! | Segment | Byte 1         | Bytes 2..3        | Data carried      |
//! |---------|----------------|-------------------|-------------------|
//! | first   | message number | total length (BE) | bytes 4..8        |
//! | middle  | data           | data              | bytes 1..8        |
//! | end     | data           | data              | bytes 1..1+VB     |
//! | single  | message number | data              | bytes 2..2+VB     |

pub mod header;
pub mod reassembler;

pub use header::{SegmentHeader, SegmentKind};
pub use reassembler::{PartialMessage, ReassemblerStats, SegmentReassembler};
