//! Bit and byte helpers shared by the reassembler and the layout decoder
//!
//! Everything here is a pure function over byte slices. Multi-byte reads go
//! through `byteorder` so that the same code path handles big- and
//! little-endian length prefixes of any width from 1 to 8 bytes.

use crate::config::ByteOrder;
use crate::types::ProtocolError;
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

/// Widest unsigned prefix that fits in a `u64`
pub const MAX_UINT_WIDTH: usize = 8;

/// Extract `width` bits of `byte`, starting `shift` bits above the LSB
///
/// ```
/// use can_trace_decoder::bits::bit_field;
///
/// // 0x54 = 010 10 100
/// assert_eq!(bit_field(0x54, 5, 3), 0b010);
/// assert_eq!(bit_field(0x54, 3, 2), 0b10);
/// assert_eq!(bit_field(0x54, 0, 3), 0b100);
/// ```
pub fn bit_field(byte: u8, shift: u8, width: u8) -> u8 {
    let mask = ((1u16 << width) - 1) as u8;
    (byte >> shift) & mask
}

/// Read an unsigned integer spanning all of `bytes`
///
/// An empty slice reads as zero. Returns `None` when the slice is wider
/// than [`MAX_UINT_WIDTH`].
pub fn read_uint(bytes: &[u8], order: ByteOrder) -> Option<u64> {
    match bytes.len() {
        0 => Some(0),
        n if n > MAX_UINT_WIDTH => None,
        n => Some(match order {
            ByteOrder::Big => BigEndian::read_uint(bytes, n),
            ByteOrder::Little => LittleEndian::read_uint(bytes, n),
        }),
    }
}

/// Read a big-endian `u16` from the first two bytes of `bytes`
///
/// Callers guarantee at least two bytes.
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    BigEndian::read_u16(bytes)
}

/// Parse hex text into bytes
///
/// Whitespace between digits is ignored, so both `"54 CB 3C"` and `"54cb3c"`
/// are accepted.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, ProtocolError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|e| ProtocolError::InvalidHex(format!("{:?}: {}", text, e)))
}

/// Render bytes as uppercase hex text without separators
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}
