//! Trace decoding pipeline
//!
//! [`TraceDecoder`] is the entry point for callers that want named fields
//! out of a raw frame stream. It owns a [`SegmentReassembler`], applies the
//! [`LayoutDocument`] filters and runs the [`LayoutDecoder`] on every
//! message that gets through.

use crate::config::LayoutDocument;
use crate::layout::LayoutDecoder;
use crate::transport::{PartialMessage, ReassemblerStats, SegmentReassembler};
use crate::types::{CompleteMessage, DecodedEvent, DecoderError, Frame, Result};

/// Reassembles frames and decodes the resulting messages
#[derive(Debug)]
pub struct TraceDecoder {
    document: LayoutDocument,
    reassembler: SegmentReassembler,
    layout_decoder: LayoutDecoder,
}

impl TraceDecoder {
    /// Create a decoder for one layout document
    ///
    /// The document is validated first; an invalid layout is a
    /// [`DecoderError::Config`].
    ///
    /// # Example
    /// ```
    /// use can_trace_decoder::{Frame, LayoutDocument, LayoutField, TraceDecoder};
    ///
    /// let document = LayoutDocument::new(vec![LayoutField::fixed(1, "CODE")]);
    /// let mut decoder = TraceDecoder::new(document).unwrap();
    ///
    /// let frame = Frame::from_hex("t0", "1FA", "62 01 02 03 00 00 00 00").unwrap();
    /// let event = decoder.process_frame(&frame).unwrap().unwrap();
    /// assert_eq!(event.fields().unwrap().get_hex("CODE").as_deref(), Some("02"));
    /// ```
    pub fn new(document: LayoutDocument) -> Result<Self> {
        document.validate()?;
        log::info!(
            "Decoding {} top-level fields{}",
            document.decode.len(),
            document
                .cob
                .as_ref()
                .map_or(String::new(), |cob| format!(" on channel {}", cob))
        );

        let layout_decoder = LayoutDecoder::new(document.byte_order);
        Ok(Self {
            document,
            reassembler: SegmentReassembler::new(),
            layout_decoder,
        })
    }

    /// Load a JSON layout document and create a decoder for it
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::new(LayoutDocument::from_json_str(json)?)
    }

    pub fn document(&self) -> &LayoutDocument {
        &self.document
    }

    pub fn reassembler(&self) -> &SegmentReassembler {
        &self.reassembler
    }

    /// Reassembly counters so far
    pub fn stats(&self) -> ReassemblerStats {
        self.reassembler.stats()
    }

    /// Process a single frame
    ///
    /// Frames from channels other than the document's `cob` are ignored.
    /// Returns an event once a frame completes a message.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<Option<DecodedEvent>> {
        if !self.document.should_process_channel(&frame.channel) {
            log::trace!("Ignoring frame on channel {}", frame.channel);
            return Ok(None);
        }

        match self.reassembler.submit(frame)? {
            Some(message) => self.decode_message(message).map(Some),
            None => Ok(None),
        }
    }

    /// Filter and decode one complete message
    pub fn decode_message(&self, message: CompleteMessage) -> Result<DecodedEvent> {
        if !self.document.accepts(&message) {
            log::debug!(
                "Skipping message {} on channel {} ({} bytes outside {}..{})",
                message.message_number,
                message.channel,
                message.len(),
                self.document.min_length,
                self.document.max_length
            );
            return Ok(DecodedEvent::Skipped { message });
        }

        match self.layout_decoder.decode(&message.payload, &self.document.decode) {
            Ok(fields) => {
                log::debug!(
                    "Decoded {} fields from message {} on channel {}",
                    fields.len(),
                    message.message_number,
                    message.channel
                );
                Ok(DecodedEvent::Message { message, fields })
            }
            Err(source) => Err(DecoderError::MessageDecode {
                channel: message.channel,
                message_number: message.message_number,
                source,
            }),
        }
    }

    /// Decode a stream of frames lazily
    ///
    /// Errors are yielded in place and iteration continues with the next
    /// frame.
    pub fn decode_frames<I>(&mut self, frames: I) -> DecodingIterator<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Frame>,
    {
        DecodingIterator {
            frames: frames.into_iter(),
            decoder: self,
        }
    }

    /// Consume the decoder and return messages that never completed
    pub fn finish(self) -> Vec<PartialMessage> {
        let stats = self.reassembler.stats();
        log::info!(
            "Trace finished: {} frames, {} messages, {} protocol errors",
            stats.frames,
            stats.completed,
            stats.protocol_errors
        );
        self.reassembler.finish()
    }
}

/// Iterator that turns frames into decoded events
///
/// Frames that start or extend a message produce nothing; the iterator
/// keeps pulling until a frame completes a message or fails.
pub struct DecodingIterator<'a, I>
where
    I: Iterator<Item = Frame>,
{
    frames: I,
    decoder: &'a mut TraceDecoder,
}

impl<'a, I> Iterator for DecodingIterator<'a, I>
where
    I: Iterator<Item = Frame>,
{
    type Item = Result<DecodedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        for frame in self.frames.by_ref() {
            match self.decoder.process_frame(&frame) {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
