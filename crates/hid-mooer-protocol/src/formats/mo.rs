//! `.mo` single-preset file: 2048 bytes, preset record at `0x200`.

use std::path::Path;

use tracing::debug;

use super::{read_file, write_file};
use crate::error::{FormatError, FormatResult};
use crate::preset::{PRESET_SIZE, Preset};

pub const MO_FILE_SIZE: usize = 0x800;
pub const MO_PRESET_OFFSET: usize = 0x200;

/// Smallest file [`decode_mo`] accepts.
pub const MO_MIN_SIZE: usize = MO_PRESET_OFFSET + PRESET_SIZE;

/// Build the full file image. Everything outside the preset is zero.
pub fn encode_mo(preset: &Preset) -> Vec<u8> {
    let mut file = vec![0u8; MO_FILE_SIZE];
    for (dst, src) in file
        .iter_mut()
        .skip(MO_PRESET_OFFSET)
        .zip(preset.to_bytes())
    {
        *dst = src;
    }
    file
}

pub fn decode_mo(data: &[u8]) -> FormatResult<Preset> {
    let record = data
        .get(MO_PRESET_OFFSET..MO_MIN_SIZE)
        .ok_or(FormatError::TooSmall {
            format: "MO",
            actual: data.len(),
            required: MO_MIN_SIZE,
        })?;
    Ok(Preset::from_bytes(record))
}

pub fn export_mo(preset: &Preset, path: &Path) -> FormatResult<()> {
    debug!(path = %path.display(), name = %preset.name, "exporting .mo");
    write_file(path, &encode_mo(preset))
}

pub fn import_mo(path: &Path) -> FormatResult<Preset> {
    let data = read_file(path)?;
    debug!(path = %path.display(), len = data.len(), "importing .mo");
    decode_mo(&data)
}
