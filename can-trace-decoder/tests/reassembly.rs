// Reassembly behavior over realistic frame sequences
use can_trace_decoder::{
    ChannelId, Frame, ProtocolError, SegmentHeader, SegmentKind, SegmentReassembler,
};
use proptest::prelude::*;

/// Frames captured from a MiniMon trace: (time, cob, data)
const TRACE: &[(&str, &str, &str)] = &[
    ("00:30:06.866", "184", "00 06 00 16 75 EE 00 3C"),
    ("00:30:06.866", "184", "28 84 00 00 00 00 00 00"),
    ("00:30:06.866", "184", "30 00 00 00 00 00 00 00"),
    ("00:30:06.866", "184", "5C 00 00 00 00 00 00 00"),
    ("00:30:06.867", "300", "00 09 00 07 20 03 00 00"),
    ("00:30:06.867", "300", "4B 01 83 49 00 00 00 00"),
    ("00:30:06.882", "374", "00 01 00 1A 02 C9 08 0A"),
    ("00:30:06.883", "374", "28 02 02 02 02 02 02 00"),
    ("00:30:06.883", "374", "30 00 02 02 02 00 00 1C"),
    ("00:30:06.883", "374", "38 02 1F 00 00 00 00 00"),
    ("00:30:06.883", "374", "41 00 00 00 00 00 00 00"),
];

fn frame(channel: &str, data: &[u8]) -> Frame {
    Frame::new("00:00:00.000", ChannelId::parse(channel).unwrap(), data)
}

#[test]
fn test_minimon_trace() {
    let mut reassembler = SegmentReassembler::new();
    let mut messages = Vec::new();

    for (time, cob, data) in TRACE {
        let frame = Frame::from_hex(*time, cob, data).unwrap();
        if let Some(message) = reassembler.submit(&frame).unwrap() {
            messages.push(message);
        }
    }

    assert_eq!(messages.len(), 3);

    assert_eq!(messages[0].channel.as_str(), "184");
    assert_eq!(messages[0].message_number, 6);
    assert_eq!(
        messages[0].payload_hex(),
        "75EE003C840000000000000000000000000000000000"
    );
    assert_eq!(messages[0].len(), 0x16);
    assert_eq!(messages[0].segment_count, 4);

    assert_eq!(messages[1].message_number, 9);
    assert_eq!(messages[1].payload_hex(), "20030000018349");
    assert_eq!(messages[1].len(), 7);

    assert_eq!(messages[2].message_number, 1);
    assert_eq!(messages[2].len(), 0x1A);
    assert_eq!(messages[2].timestamp, "00:30:06.883");
    assert_eq!(messages[2].started_at, "00:30:06.882");

    assert!(messages.iter().all(|m| !m.has_length_mismatch()));

    let stats = reassembler.stats();
    assert_eq!(stats.frames, TRACE.len());
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.protocol_errors, 0);
    assert!(reassembler.finish().is_empty());
}

#[test]
fn test_end_segment_0x54_on_cb3() {
    assert_eq!(header_byte(SegmentKind::End, 2, 4), 0x54);

    let mut reassembler = SegmentReassembler::new();
    reassembler
        .submit(&frame("CB3", &[0x00, 0x11, 0x00, 0x08, 0xA0, 0xA1, 0xA2, 0xA3]))
        .unwrap();

    let message = reassembler
        .submit(&frame("cb3", &[0x54, 0xCB, 0x3C, 0xFF, 0xFE, 0xFF, 0xFF, 0xFF]))
        .unwrap()
        .unwrap();

    assert_eq!(message.channel.as_str(), "CB3");
    assert_eq!(
        message.payload,
        vec![0xA0, 0xA1, 0xA2, 0xA3, 0xCB, 0x3C, 0xFF, 0xFE]
    );
}

#[test]
fn test_orphan_segments_then_recovery() {
    let mut reassembler = SegmentReassembler::new();

    let middle = reassembler.submit(&frame("208", &[0x20, 1, 2, 3, 4, 5, 6, 7]));
    assert!(matches!(
        middle,
        Err(ProtocolError::MissingFirstSegment { kind: SegmentKind::Middle, .. })
    ));

    let end = reassembler.submit(&frame("208", &[0x43, 1, 2, 3, 0, 0, 0, 0]));
    assert!(matches!(
        end,
        Err(ProtocolError::MissingFirstSegment { kind: SegmentKind::End, .. })
    ));
    assert_eq!(reassembler.stats().protocol_errors, 2);
    assert_eq!(reassembler.stats().completed, 0);

    reassembler.submit(&frame("208", &[0x00, 0x05, 0x00, 0x05, 9, 9, 9, 9])).unwrap();
    let message = reassembler.submit(&frame("208", &[0x49, 8])).unwrap().unwrap();
    assert_eq!(message.payload, vec![9, 9, 9, 9, 8]);
}

#[test]
fn test_declared_length_mismatch_still_emits() {
    let mut reassembler = SegmentReassembler::new();
    reassembler.submit(&frame("184", &[0x00, 0x01, 0x00, 0x20, 1, 2, 3, 4])).unwrap();
    let message = reassembler.submit(&frame("184", &[0x40])).unwrap().unwrap();

    assert_eq!(message.declared_length, Some(0x20));
    assert_eq!(message.len(), 4);
    assert!(message.has_length_mismatch());
}

#[test]
fn test_independent_reassemblers_do_not_share_state() {
    let mut a = SegmentReassembler::new();
    let mut b = SegmentReassembler::new();

    a.submit(&frame("184", &[0x00, 0x01, 0x00, 0x05, 1, 2, 3, 4])).unwrap();
    assert!(b.submit(&frame("184", &[0x41, 5])).is_err());
    assert!(a.submit(&frame("184", &[0x41, 5])).unwrap().is_some());
}

fn header_byte(kind: SegmentKind, serial_number: u8, byte_count: u8) -> u8 {
    SegmentHeader {
        command_specifier: kind.command_specifier(),
        serial_number,
        byte_count,
    }
    .to_byte()
}

fn segment_frames(message_number: u8, chunks: &[[u8; 7]], tail: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();

    let mut first = vec![header_byte(SegmentKind::First, 0, 0), message_number, 0x00, 0x00];
    first.extend_from_slice(&[0xF0, 0xF1, 0xF2, 0xF3]);
    frames.push(first);

    for (i, chunk) in chunks.iter().enumerate() {
        let serial = ((i + 1) % 4) as u8;
        let mut middle = vec![header_byte(SegmentKind::Middle, serial, 0)];
        middle.extend_from_slice(chunk);
        frames.push(middle);
    }

    let serial = ((chunks.len() + 1) % 4) as u8;
    let mut end = vec![header_byte(SegmentKind::End, serial, tail.len() as u8)];
    end.extend_from_slice(tail);
    end.resize(8, 0xEE);
    frames.push(end);

    frames
}

proptest! {
    #[test]
    fn prop_payload_is_concatenation_of_segments(
        message_number in any::<u8>(),
        chunks in prop::collection::vec(any::<[u8; 7]>(), 0..8),
        tail in prop::collection::vec(any::<u8>(), 0..=6),
    ) {
        let mut reassembler = SegmentReassembler::new();
        let frames = segment_frames(message_number, &chunks, &tail);
        let (last, leading) = frames.split_last().unwrap();

        for data in leading {
            prop_assert_eq!(reassembler.submit(&frame("1FA", data)), Ok(None));
        }
        let message = reassembler.submit(&frame("1FA", last)).unwrap().unwrap();

        let mut expected = vec![0xF0, 0xF1, 0xF2, 0xF3];
        for chunk in &chunks {
            expected.extend_from_slice(chunk);
        }
        expected.extend_from_slice(&tail);

        prop_assert_eq!(message.message_number, message_number);
        prop_assert_eq!(message.payload, expected);
        prop_assert_eq!(message.segment_count, chunks.len() + 2);
        prop_assert!(reassembler.in_flight_channels().is_empty());
    }

    #[test]
    fn prop_single_segment_payload(
        message_number in any::<u8>(),
        data in prop::collection::vec(any::<u8>(), 0..=6),
    ) {
        let mut raw = vec![
            header_byte(SegmentKind::Single, 0, data.len() as u8),
            message_number,
        ];
        raw.extend_from_slice(&data);
        raw.resize(8, 0xAB);

        let mut reassembler = SegmentReassembler::new();
        let message = reassembler.submit(&frame("301", &raw)).unwrap().unwrap();

        prop_assert_eq!(message.len(), data.len());
        prop_assert_eq!(&message.payload[..], &raw[2..2 + data.len()]);
        prop_assert_eq!(reassembler.stats().in_flight, 0);
    }
}
