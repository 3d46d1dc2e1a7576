//! File containers that embed the preset record.
//!
//! Each container has a pure byte-buffer codec (`encode_*` / `decode_*` /
//! `parse_*`) and thin path wrappers (`export_*` / `import_*`) on top.

pub mod gnr;
pub mod mbf;
pub mod mo;

use std::path::Path;

use crate::error::{FormatError, FormatResult};

pub use gnr::{GNR_MAGIC, GnrHeader, ir_payload, load_ir_file, parse_gnr_header};
pub use mbf::{MBF_FILE_SIZE, MBF_PRESET_COUNT, MbfBackup, MbfHeader, decode_mbf, encode_mbf};
pub use mo::{MO_FILE_SIZE, MO_PRESET_OFFSET, decode_mo, encode_mo};

pub(crate) fn read_file(path: &Path) -> FormatResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_file(path: &Path, data: &[u8]) -> FormatResult<()> {
    std::fs::write(path, data).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Fixed-width ASCII field, NUL-padded. Non-ASCII characters become `?`.
pub(crate) fn ascii_field<const N: usize>(text: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let bytes = text
        .chars()
        .map(|c| u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(b'?'));
    for (dst, src) in field.iter_mut().zip(bytes) {
        *dst = src;
    }
    field
}

/// Read a NUL-terminated ASCII field.
pub(crate) fn field_text(field: &[u8]) -> String {
    field
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii() { char::from(b) } else { '\u{FFFD}' })
        .collect()
}
