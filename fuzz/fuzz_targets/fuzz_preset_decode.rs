//! Fuzzes the preset record codec and `.mo` container.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_preset_decode
#![no_main]
use libfuzzer_sys::fuzz_target;
use mooer_hid_protocol::{ModuleKind, Preset, decode_mo};

fuzz_target!(|data: &[u8]| {
    let preset = Preset::from_bytes(data);
    for kind in ModuleKind::ALL {
        let _ = preset.module(kind).to_bytes();
    }

    // Decoding the encoded record is stable.
    let bytes = preset.to_bytes();
    let again = Preset::from_bytes(&bytes);
    assert_eq!(again.to_bytes(), bytes);

    let _ = decode_mo(data);
});
