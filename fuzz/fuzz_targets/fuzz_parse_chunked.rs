//! Fuzzes multi-report reassembly, batch and streaming.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_parse_chunked
#![no_main]
use libfuzzer_sys::fuzz_target;
use mooer_hid_protocol::{AssemblyStatus, ChunkAssembler, HID_REPORT_SIZE, parse_chunked_frames};

fuzz_target!(|data: &[u8]| {
    let reports: Vec<&[u8]> = data.chunks(HID_REPORT_SIZE).collect();
    let batch = parse_chunked_frames(&reports);

    // The streaming assembler must agree with the batch parser.
    let mut assembler = ChunkAssembler::new();
    let mut streamed = None;
    for report in &reports {
        match assembler.push(report) {
            AssemblyStatus::NeedMore => {}
            AssemblyStatus::Complete(frame) => {
                streamed = Some(frame);
                break;
            }
            AssemblyStatus::Invalid => break,
        }
    }
    if let Some(frame) = streamed {
        assert_eq!(batch.as_ref(), Some(&frame));
    }
});
