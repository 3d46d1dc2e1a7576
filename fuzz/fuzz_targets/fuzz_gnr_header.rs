//! Fuzzes `.gnr` header parsing and payload extraction.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_gnr_header
#![no_main]
use libfuzzer_sys::fuzz_target;
use mooer_hid_protocol::{ir_payload, parse_gnr_header};

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = parse_gnr_header(data) {
        assert!(header.info.len() <= data.len());
        let _ = header.is_truncated(data.len());
    }
    let _ = ir_payload(data);
});
