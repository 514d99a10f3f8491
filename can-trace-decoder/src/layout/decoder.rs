//! Layout interpreter
//!
//! Walks a payload once, left to right, following a [`LayoutField`] tree.
//! A single cursor is threaded through the whole recursive walk; block
//! repetitions continue where the previous one stopped.
//!
//! Qualified names are built by prefixing: a field `TILT_X` inside the
//! second repetition of block `GROUP` becomes `GROUP_2_TILT_X`, and each
//! further nesting level adds its own `<block>_<index>_` segment.

use super::field::{min_encoded_len, LayoutField};
use crate::bits::{read_uint, MAX_UINT_WIDTH};
use crate::config::ByteOrder;
use crate::types::{DecodeError, DecodedFields};

/// Decode `payload` with big-endian prefixes
pub fn decode_payload(payload: &[u8], layout: &[LayoutField]) -> Result<DecodedFields, DecodeError> {
    LayoutDecoder::default().decode(payload, layout)
}

/// Stateless layout decoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutDecoder {
    byte_order: ByteOrder,
}

impl LayoutDecoder {
    /// Create a decoder reading length/count prefixes in `byte_order`
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Decode a payload into named fields
    ///
    /// Fails without returning anything partial if any read would run past
    /// the end of the payload.
    ///
    /// ```
    /// use can_trace_decoder::{LayoutDecoder, LayoutField};
    ///
    /// let layout = vec![LayoutField::fixed(1, "CODE"), LayoutField::dynamic(1, "TIME")];
    /// let fields = LayoutDecoder::default()
    ///     .decode(&[0x02, 0x02, 0xBE, 0xEF], &layout)
    ///     .unwrap();
    /// assert_eq!(fields.get_hex("TIME").as_deref(), Some("BEEF"));
    /// ```
    pub fn decode(&self, payload: &[u8], layout: &[LayoutField]) -> Result<DecodedFields, DecodeError> {
        let mut cursor = Cursor {
            payload,
            offset: 0,
            byte_order: self.byte_order,
        };
        let mut fields = DecodedFields::new();

        decode_level(&mut cursor, layout, "", &mut fields)?;

        if cursor.remaining() > 0 {
            log::trace!(
                "{} trailing bytes left after decoding {} fields",
                cursor.remaining(),
                fields.len()
            );
        }
        Ok(fields)
    }
}

fn decode_level(
    cursor: &mut Cursor<'_>,
    layout: &[LayoutField],
    prefix: &str,
    out: &mut DecodedFields,
) -> Result<(), DecodeError> {
    for field in layout {
        let qualified = format!("{}{}", prefix, field.name());

        match field {
            LayoutField::Fixed { length, .. } => {
                let value = cursor.take(*length, &qualified)?;
                out.insert(qualified, value.to_vec());
            }
            LayoutField::Dynamic { length, .. } => {
                let size = cursor.read_count(*length, &qualified)?;
                let size = usize::try_from(size).unwrap_or(usize::MAX);
                let value = cursor.take(size, &qualified)?;
                out.insert(qualified, value.to_vec());
            }
            LayoutField::Block { length, subfields, .. } => {
                // A repetition must advance the cursor or the count is unbounded work
                let per_repetition = min_encoded_len(subfields) as u64;
                if per_repetition == 0 {
                    return Err(DecodeError::EmptyRepetition { field: qualified });
                }

                let count = cursor.read_count(*length, &qualified)?;

                // Fail fast on counts the remaining payload cannot possibly hold
                let needed = count.saturating_mul(per_repetition);
                if needed > cursor.remaining() as u64 {
                    return Err(cursor.out_of_bounds(
                        &qualified,
                        usize::try_from(needed).unwrap_or(usize::MAX),
                    ));
                }

                for index in 1..=count {
                    let nested = format!("{}_{}_", qualified, index);
                    decode_level(cursor, subfields, &nested, out)?;
                }
            }
        }
    }

    Ok(())
}

/// Read position over a payload
struct Cursor<'a> {
    payload: &'a [u8],
    offset: usize,
    byte_order: ByteOrder,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.payload.len() - self.offset
    }

    fn take(&mut self, size: usize, field: &str) -> Result<&'a [u8], DecodeError> {
        if size > self.remaining() {
            return Err(self.out_of_bounds(field, size));
        }
        let payload = self.payload;
        let bytes = &payload[self.offset..self.offset + size];
        self.offset += size;
        Ok(bytes)
    }

    fn read_count(&mut self, width: usize, field: &str) -> Result<u64, DecodeError> {
        if width > MAX_UINT_WIDTH {
            return Err(DecodeError::PrefixTooWide {
                field: field.to_string(),
                width,
            });
        }
        let order = self.byte_order;
        let bytes = self.take(width, field)?;
        // Width is bounded above, so the read cannot fail
        Ok(read_uint(bytes, order).unwrap_or_default())
    }

    fn out_of_bounds(&self, field: &str, needed: usize) -> DecodeError {
        DecodeError::OutOfBounds {
            field: field.to_string(),
            offset: self.offset,
            needed,
            available: self.remaining(),
        }
    }
}
