//! Segment header (byte 0 of every frame)

use crate::bits::bit_field;
use std::fmt;

/// Role of a frame in message reassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Opens a multi-segment message
    First,
    /// Carries a full 7-byte chunk of a multi-segment message
    Middle,
    /// Closes a multi-segment message
    End,
    /// Carries a whole message on its own
    Single,
}

impl SegmentKind {
    /// Map a 3-bit command specifier to a segment kind
    pub fn from_command_specifier(cs: u8) -> Option<Self> {
        match cs {
            0b000 => Some(SegmentKind::First),
            0b001 => Some(SegmentKind::Middle),
            0b010 => Some(SegmentKind::End),
            0b011 => Some(SegmentKind::Single),
            _ => None,
        }
    }

    pub fn command_specifier(self) -> u8 {
        match self {
            SegmentKind::First => 0b000,
            SegmentKind::Middle => 0b001,
            SegmentKind::End => 0b010,
            SegmentKind::Single => 0b011,
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::First => write!(f, "First"),
            SegmentKind::Middle => write!(f, "Middle"),
            SegmentKind::End => write!(f, "End"),
            SegmentKind::Single => write!(f, "Single"),
        }
    }
}

/// Decoded fields of a segment's first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Top 3 bits
    pub command_specifier: u8,
    /// Next 2 bits, cyclic 0-3. Carried for diagnostics only.
    pub serial_number: u8,
    /// Low 3 bits, valid data bytes in end/single segments
    pub byte_count: u8,
}

impl SegmentHeader {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            command_specifier: bit_field(byte, 5, 3),
            serial_number: bit_field(byte, 3, 2),
            byte_count: bit_field(byte, 0, 3),
        }
    }

    /// Pack the header back into a byte (fields are masked to their widths)
    pub fn to_byte(&self) -> u8 {
        ((self.command_specifier & 0b111) << 5)
            | ((self.serial_number & 0b11) << 3)
            | (self.byte_count & 0b111)
    }

    /// Segment kind, or `None` for command specifiers 4-7
    pub fn kind(&self) -> Option<SegmentKind> {
        SegmentKind::from_command_specifier(self.command_specifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_segment_header() {
        // 0x54 = 010 10 100
        let header = SegmentHeader::from_byte(0x54);
        assert_eq!(header.command_specifier, 0b010);
        assert_eq!(header.serial_number, 0b10);
        assert_eq!(header.byte_count, 4);
        assert_eq!(header.kind(), Some(SegmentKind::End));
    }

    #[test]
    fn test_known_trace_headers() {
        assert_eq!(SegmentHeader::from_byte(0x00).kind(), Some(SegmentKind::First));
        assert_eq!(SegmentHeader::from_byte(0x28).kind(), Some(SegmentKind::Middle));
        assert_eq!(SegmentHeader::from_byte(0x28).serial_number, 1);
        assert_eq!(SegmentHeader::from_byte(0x66).kind(), Some(SegmentKind::Single));
        assert_eq!(SegmentHeader::from_byte(0x66).byte_count, 6);
    }

    #[test]
    fn test_invalid_command_specifiers() {
        for cs in 4u8..8 {
            let header = SegmentHeader::from_byte(cs << 5);
            assert_eq!(header.kind(), None);
        }
    }

    #[test]
    fn test_to_byte_masks_fields() {
        let header = SegmentHeader {
            command_specifier: 0b1010,
            serial_number: 0b111,
            byte_count: 0b1011,
        };
        assert_eq!(header.to_byte(), 0b010_11_011);
    }

    #[test]
    fn test_kind_command_specifier_mapping() {
        for kind in [
            SegmentKind::First,
            SegmentKind::Middle,
            SegmentKind::End,
            SegmentKind::Single,
        ] {
            assert_eq!(
                SegmentKind::from_command_specifier(kind.command_specifier()),
                Some(kind)
            );
        }
    }
}
