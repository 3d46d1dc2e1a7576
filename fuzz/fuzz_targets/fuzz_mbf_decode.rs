//! Fuzzes `.mbf` backup decoding.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_mbf_decode
#![no_main]
use libfuzzer_sys::fuzz_target;
use mooer_hid_protocol::decode_mbf;

fuzz_target!(|data: &[u8]| {
    if let Ok(backup) = decode_mbf(data) {
        assert!(backup.presets.len() <= 199);
        let _ = backup.populated().count();
    }
});
