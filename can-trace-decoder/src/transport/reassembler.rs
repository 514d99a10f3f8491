//! Per-channel segment reassembly
//!
//! The reassembler is an eager state machine driven one frame at a time.
//! It keeps at most one partially assembled message per channel and hands a
//! [`CompleteMessage`] back as soon as the terminating segment arrives.
//! Frames must be submitted in the order they were captured; there is no
//! reordering buffer.

use super::header::{SegmentHeader, SegmentKind};
use crate::bits::read_u16_be;
use crate::types::{ChannelId, CompleteMessage, Frame, ProtocolError, MAX_FRAME_LEN};
use std::collections::HashMap;

/// Data bytes a single segment can carry (bytes 2..8)
const MAX_SINGLE_BYTES: u8 = 6;

/// A message whose end segment has not arrived yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMessage {
    /// Channel the message belongs to
    pub channel: ChannelId,
    /// Timestamp of the first segment
    pub started_at: String,
    /// Message number from the first segment
    pub message_number: u8,
    /// Total length announced by the first segment
    pub declared_length: u16,
    /// Bytes accumulated so far
    pub payload: Vec<u8>,
    /// Frames consumed so far
    pub segment_count: usize,
}

impl PartialMessage {
    fn complete(self, timestamp: String) -> CompleteMessage {
        CompleteMessage {
            timestamp,
            started_at: self.started_at,
            channel: self.channel,
            message_number: self.message_number,
            payload: self.payload,
            declared_length: Some(self.declared_length),
            segment_count: self.segment_count,
        }
    }
}

/// Counters describing what a reassembler has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblerStats {
    /// Frames submitted
    pub frames: usize,
    /// Complete messages emitted
    pub completed: usize,
    /// Frames rejected with a protocol error
    pub protocol_errors: usize,
    /// In-progress messages dropped (replaced by a new first segment or abandoned)
    pub discarded_messages: usize,
    /// Channels currently holding a partial message
    pub in_flight: usize,
}

/// Reassembles segmented messages, one in-progress buffer per channel
#[derive(Debug, Default)]
pub struct SegmentReassembler {
    in_progress: HashMap<ChannelId, PartialMessage>,
    stats: ReassemblerStats,
}

impl SegmentReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame
    ///
    /// Returns `Ok(Some(_))` when the frame completes a message, `Ok(None)`
    /// when it only started or extended one, and `Err(_)` when the frame
    /// violates the protocol. Errors never poison the reassembler: the next
    /// frame is processed normally.
    ///
    /// A first segment arriving while a message is already in progress on
    /// the same channel replaces it; the new message is kept and the loss
    /// of the old one is reported as
    /// [`ProtocolError::IncompleteMessageDiscarded`].
    ///
    /// ```
    /// use can_trace_decoder::{Frame, SegmentReassembler};
    ///
    /// let mut reassembler = SegmentReassembler::new();
    /// let frame = Frame::from_hex("12:00:00", "301", "63 E2 00 00 E2 00 00 00").unwrap();
    /// let message = reassembler.submit(&frame).unwrap().unwrap();
    /// assert_eq!(message.message_number, 0xE2);
    /// assert_eq!(message.payload, vec![0x00, 0x00, 0xE2]);
    /// ```
    pub fn submit(&mut self, frame: &Frame) -> Result<Option<CompleteMessage>, ProtocolError> {
        self.stats.frames += 1;

        let result = self.process(frame);
        match &result {
            Ok(Some(message)) => {
                self.stats.completed += 1;
                log::debug!(
                    "Message {} complete on channel {} ({} bytes, {} segments)",
                    message.message_number,
                    message.channel,
                    message.len(),
                    message.segment_count
                );
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.protocol_errors += 1;
                log::warn!("{}", e);
            }
        }
        self.stats.in_flight = self.in_progress.len();

        result
    }

    /// Feed one frame given as loose parts
    pub fn submit_raw(
        &mut self,
        timestamp: &str,
        channel: &ChannelId,
        data: &[u8],
    ) -> Result<Option<CompleteMessage>, ProtocolError> {
        self.submit(&Frame::new(timestamp, channel.clone(), data))
    }

    fn process(&mut self, frame: &Frame) -> Result<Option<CompleteMessage>, ProtocolError> {
        let data = frame.data.as_slice();
        if data.is_empty() {
            return Err(ProtocolError::EmptyFrame(frame.channel.clone()));
        }
        if data.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::OversizedFrame {
                channel: frame.channel.clone(),
                len: data.len(),
            });
        }

        // Short frames are zero-padded like the capture tools do
        let mut raw = [0u8; MAX_FRAME_LEN];
        raw[..data.len()].copy_from_slice(data);

        let header = SegmentHeader::from_byte(raw[0]);
        log::trace!(
            "{} {} CS={:03b} SN={:02b} VB={}",
            frame.timestamp,
            frame.channel,
            header.command_specifier,
            header.serial_number,
            header.byte_count
        );

        match header.kind() {
            Some(SegmentKind::First) => self.first_segment(frame, &raw),
            Some(SegmentKind::Middle) => self.middle_segment(frame, &raw),
            Some(SegmentKind::End) => self.end_segment(frame, &raw, header.byte_count),
            Some(SegmentKind::Single) => single_segment(frame, &raw, header.byte_count),
            None => Err(ProtocolError::InvalidCommandSpecifier {
                channel: frame.channel.clone(),
                cs: header.command_specifier,
            }),
        }
    }

    fn first_segment(
        &mut self,
        frame: &Frame,
        raw: &[u8; MAX_FRAME_LEN],
    ) -> Result<Option<CompleteMessage>, ProtocolError> {
        let message = PartialMessage {
            channel: frame.channel.clone(),
            started_at: frame.timestamp.clone(),
            message_number: raw[1],
            declared_length: read_u16_be(&raw[2..4]),
            payload: raw[4..].to_vec(),
            segment_count: 1,
        };

        match self.in_progress.insert(frame.channel.clone(), message) {
            Some(previous) => {
                self.stats.discarded_messages += 1;
                Err(ProtocolError::IncompleteMessageDiscarded {
                    channel: previous.channel,
                    message_number: previous.message_number,
                    received: previous.payload.len(),
                })
            }
            None => Ok(None),
        }
    }

    fn middle_segment(
        &mut self,
        frame: &Frame,
        raw: &[u8; MAX_FRAME_LEN],
    ) -> Result<Option<CompleteMessage>, ProtocolError> {
        let message = self.in_progress.get_mut(&frame.channel).ok_or_else(|| {
            ProtocolError::MissingFirstSegment {
                channel: frame.channel.clone(),
                kind: SegmentKind::Middle,
            }
        })?;

        message.payload.extend_from_slice(&raw[1..]);
        message.segment_count += 1;
        Ok(None)
    }

    fn end_segment(
        &mut self,
        frame: &Frame,
        raw: &[u8; MAX_FRAME_LEN],
        byte_count: u8,
    ) -> Result<Option<CompleteMessage>, ProtocolError> {
        let mut message = self.in_progress.remove(&frame.channel).ok_or_else(|| {
            ProtocolError::MissingFirstSegment {
                channel: frame.channel.clone(),
                kind: SegmentKind::End,
            }
        })?;

        // A 3-bit count never reaches past byte 7
        let end = 1 + usize::from(byte_count);
        message.payload.extend_from_slice(&raw[1..end]);
        message.segment_count += 1;

        let complete = message.complete(frame.timestamp.clone());
        if complete.has_length_mismatch() {
            log::warn!(
                "Message {} on channel {} declared {} bytes but {} were reassembled",
                complete.message_number,
                complete.channel,
                complete.declared_length.unwrap_or_default(),
                complete.len()
            );
        }

        Ok(Some(complete))
    }

    /// Channels that currently hold a partial message, sorted
    pub fn in_flight_channels(&self) -> Vec<&ChannelId> {
        let mut channels: Vec<_> = self.in_progress.keys().collect();
        channels.sort();
        channels
    }

    /// Peek at the partial message of a channel
    pub fn partial(&self, channel: &ChannelId) -> Option<&PartialMessage> {
        self.in_progress.get(channel)
    }

    /// Drop the partial message of one channel
    pub fn abandon(&mut self, channel: &ChannelId) -> Option<PartialMessage> {
        let dropped = self.in_progress.remove(channel);
        if dropped.is_some() {
            self.stats.discarded_messages += 1;
            self.stats.in_flight = self.in_progress.len();
        }
        dropped
    }

    /// Counters so far
    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }

    /// Consume the reassembler and return every message left incomplete
    ///
    /// The returned messages are sorted by channel.
    pub fn finish(self) -> Vec<PartialMessage> {
        let mut leftovers: Vec<_> = self.in_progress.into_values().collect();
        leftovers.sort_by(|a, b| a.channel.cmp(&b.channel));

        for message in &leftovers {
            log::warn!(
                "Message {} on channel {} never completed ({} of {} bytes)",
                message.message_number,
                message.channel,
                message.payload.len(),
                message.declared_length
            );
        }

        leftovers
    }
}

fn single_segment(
    frame: &Frame,
    raw: &[u8; MAX_FRAME_LEN],
    byte_count: u8,
) -> Result<Option<CompleteMessage>, ProtocolError> {
    if byte_count > MAX_SINGLE_BYTES {
        return Err(ProtocolError::ByteCountOutOfRange {
            channel: frame.channel.clone(),
            kind: SegmentKind::Single,
            byte_count,
            max: MAX_SINGLE_BYTES,
        });
    }

    let end = 2 + usize::from(byte_count);
    Ok(Some(CompleteMessage {
        timestamp: frame.timestamp.clone(),
        started_at: frame.timestamp.clone(),
        channel: frame.channel.clone(),
        message_number: raw[1],
        payload: raw[2..end].to_vec(),
        declared_length: None,
        segment_count: 1,
    }))
}
