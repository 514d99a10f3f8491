//! Decode a short captured trace with the odometry packet layout
//!
//! Frames are embedded below as `(time, cob, data)` rows, the shape a log
//! reader hands to the decoder. Run with `RUST_LOG=debug` to see
//! per-message logging.
//!
//! Usage:
//!   cargo run --example decode_trace

use anyhow::{Context, Result};
use can_trace_decoder::{DecodedEvent, Frame, LayoutDocument, SegmentReassembler, TraceDecoder};

const LAYOUT_JSON: &str = r#"{
    "cob" : "1FA",
    "endianess" : "BIG",
    "min_length" : 3,
    "max_length" : 1024,
    "decode" : [
        { "type" : "FIXED", "length" : 1, "name" : "CODE" },
        { "type" : "FIXED", "length" : 2, "name" : "LEN" },
        { "type" : "DYNAMIC", "length" : 1, "name" : "TIME" },
        { "type" : "BLOCK", "length" : 1, "name" : "GROUP",
          "subfields" : [
            { "type" : "FIXED", "length" : 2, "name" : "POSITION" },
            { "type" : "FIXED", "length" : 1, "name" : "TILT_X" },
            { "type" : "FIXED", "length" : 1, "name" : "TILT_Y" }
          ] }
    ]
}"#;

const TRACE: &[(&str, &str, &str)] = &[
    ("00:30:06.866", "184", "00 06 00 16 75 EE 00 3C"),
    ("00:30:06.866", "184", "28 84 00 00 00 00 00 00"),
    ("00:30:06.866", "184", "30 00 00 00 00 00 00 00"),
    ("00:30:06.866", "184", "5C 00 00 00 00 00 00 00"),
    ("00:30:06.867", "300", "00 09 00 07 20 03 00 00"),
    ("00:30:06.867", "300", "4B 01 83 49 00 00 00 00"),
    ("00:30:33.020", "1FA", "00 7B 00 11 02 00 22 04"),
    ("00:30:33.022", "1FA", "28 11 22 33 44 02 00 0A"),
    ("00:30:33.025", "1FA", "56 17 19 00 0D 21 23 00"),
    ("00:30:33.031", "1FA", "62 7C 01 02 00 00 00 00"),
    ("00:30:33.040", "1FA", "00 7D 00 30 02 00 30 08"),
];

fn load_frames() -> Result<Vec<Frame>> {
    TRACE
        .iter()
        .map(|(time, cob, data)| {
            Frame::from_hex(*time, cob, data)
                .with_context(|| format!("Bad trace row: {} {} {}", time, cob, data))
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let frames = load_frames()?;

    println!("=== REASSEMBLED MESSAGES ===");
    let mut reassembler = SegmentReassembler::new();
    for frame in &frames {
        match reassembler.submit(frame) {
            Ok(Some(message)) => println!("{}", message.summary_line()),
            Ok(None) => {}
            Err(e) => eprintln!("ERR: {}", e),
        }
    }
    for partial in reassembler.finish() {
        println!(
            "(incomplete) {} message {}: {} of {} bytes",
            partial.channel,
            partial.message_number,
            partial.payload.len(),
            partial.declared_length
        );
    }

    let document = LayoutDocument::from_json_str(LAYOUT_JSON).context("Invalid layout document")?;
    println!("\n=== DECODED PACKETS (COB {}) ===", document.cob.as_ref().map_or("*", |c| c.as_str()));

    let mut decoder = TraceDecoder::new(document).context("Unusable layout document")?;
    let mut decoded = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for event in decoder.decode_frames(frames) {
        match event {
            Ok(DecodedEvent::Message { message, fields }) => {
                decoded += 1;
                println!("Packet: {} ({}) {}", message.timestamp, message.channel, message.payload_hex());
                println!("{}", fields.render());
            }
            Ok(DecodedEvent::Skipped { message }) => {
                skipped += 1;
                println!("Skipped: {}", message.summary_line());
            }
            Err(e) => {
                failed += 1;
                eprintln!("ERR: {}", e);
            }
        }
    }

    let stats = decoder.stats();
    let leftovers = decoder.finish();

    println!("=== DECODING SUMMARY ===");
    println!("Frames reassembled: {}", stats.frames);
    println!("Messages completed: {}", stats.completed);
    println!("Packets decoded: {}", decoded);
    println!("Packets skipped: {}", skipped);
    println!("Errors: {}", failed);
    println!("Incomplete at end: {}", leftovers.len());

    Ok(())
}
