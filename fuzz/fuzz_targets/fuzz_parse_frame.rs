//! Fuzzes single-report frame parsing and typed response decoding.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_parse_frame
#![no_main]
use libfuzzer_sys::fuzz_target;
use mooer_hid_protocol::{parse_frame, parse_response};

fuzz_target!(|data: &[u8]| {
    // Must never panic on arbitrary bytes.
    if let Some(frame) = parse_frame(data) {
        let _ = parse_response(frame);
    }
});
