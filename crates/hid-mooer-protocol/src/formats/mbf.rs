//! `.mbf` full-device backup.
//!
//! A 44-byte header (8-byte manufacturer, 32-byte model name, 4 version
//! bytes) followed by 199 entries of `0x222` bytes. Each entry is a preset
//! record plus 34 reserved zero bytes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ascii_field, field_text, read_file, write_file};
use crate::error::{FormatError, FormatResult};
use crate::preset::{PRESET_SIZE, Preset};

pub const MBF_MANUFACTURER_LEN: usize = 8;
pub const MBF_MODEL_NAME_LEN: usize = 32;
pub const MBF_VERSION_LEN: usize = 4;
pub const MBF_HEADER_SIZE: usize = MBF_MANUFACTURER_LEN + MBF_MODEL_NAME_LEN + MBF_VERSION_LEN;
pub const MBF_ENTRY_SIZE: usize = 0x222;
pub const MBF_PRESET_COUNT: usize = 199;
pub const MBF_FILE_SIZE: usize = MBF_HEADER_SIZE + MBF_PRESET_COUNT * MBF_ENTRY_SIZE;

pub const DEFAULT_MANUFACTURER: &str = "MOOER";
pub const DEFAULT_MODEL_NAME: &str = "GE150 Pro Li";
pub const DEFAULT_VERSION: [u8; MBF_VERSION_LEN] = [1, 0, 0, 0];

/// Backup file header. The version bytes are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbfHeader {
    pub manufacturer: String,
    pub model_name: String,
    pub version: [u8; MBF_VERSION_LEN],
}

impl Default for MbfHeader {
    fn default() -> Self {
        Self {
            manufacturer: DEFAULT_MANUFACTURER.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            version: DEFAULT_VERSION,
        }
    }
}

impl MbfHeader {
    pub fn to_bytes(&self) -> [u8; MBF_HEADER_SIZE] {
        let mut out = [0u8; MBF_HEADER_SIZE];
        let fields = ascii_field::<MBF_MANUFACTURER_LEN>(&self.manufacturer)
            .into_iter()
            .chain(ascii_field::<MBF_MODEL_NAME_LEN>(&self.model_name))
            .chain(self.version);
        for (dst, src) in out.iter_mut().zip(fields) {
            *dst = src;
        }
        out
    }

    /// Decode a header; `None` if `data` is shorter than [`MBF_HEADER_SIZE`].
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let manufacturer = data.get(..MBF_MANUFACTURER_LEN)?;
        let model = data.get(MBF_MANUFACTURER_LEN..MBF_MANUFACTURER_LEN + MBF_MODEL_NAME_LEN)?;
        let &[v0, v1, v2, v3] = data.get(MBF_HEADER_SIZE - MBF_VERSION_LEN..MBF_HEADER_SIZE)?
        else {
            return None;
        };
        Some(Self {
            manufacturer: field_text(manufacturer),
            model_name: field_text(model),
            version: [v0, v1, v2, v3],
        })
    }
}

/// Decoded backup: the header plus every complete entry, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbfBackup {
    pub header: MbfHeader,
    pub presets: Vec<Preset>,
}

impl MbfBackup {
    /// `(slot, preset)` pairs for slots that hold a preset.
    pub fn populated(&self) -> impl Iterator<Item = (usize, &Preset)> {
        self.presets
            .iter()
            .enumerate()
            .filter(|(_, preset)| !preset.is_empty())
    }
}

/// Build a full backup image. Slots beyond `presets.len()` are zero-filled.
pub fn encode_mbf(header: &MbfHeader, presets: &[Preset]) -> FormatResult<Vec<u8>> {
    if presets.len() > MBF_PRESET_COUNT {
        return Err(FormatError::TooManyPresets {
            count: presets.len(),
            max: MBF_PRESET_COUNT,
        });
    }
    let mut file = Vec::with_capacity(MBF_FILE_SIZE);
    file.extend_from_slice(&header.to_bytes());
    for slot in 0..MBF_PRESET_COUNT {
        let mut entry = [0u8; MBF_ENTRY_SIZE];
        if let Some(preset) = presets.get(slot) {
            for (dst, src) in entry.iter_mut().zip(preset.to_bytes()) {
                *dst = src;
            }
        }
        file.extend_from_slice(&entry);
    }
    Ok(file)
}

/// Decode a backup image. A file that stops mid-entry yields the entries
/// before the cut.
pub fn decode_mbf(data: &[u8]) -> FormatResult<MbfBackup> {
    let header = MbfHeader::from_bytes(data).ok_or(FormatError::TooSmall {
        format: "MBF",
        actual: data.len(),
        required: MBF_HEADER_SIZE,
    })?;

    let entries = data.get(MBF_HEADER_SIZE..).unwrap_or_default();
    let presets: Vec<Preset> = entries
        .chunks_exact(MBF_ENTRY_SIZE)
        .take(MBF_PRESET_COUNT)
        .map(|entry| Preset::from_bytes(entry.get(..PRESET_SIZE).unwrap_or(entry)))
        .collect();

    if presets.len() < MBF_PRESET_COUNT {
        warn!(
            entries = presets.len(),
            expected = MBF_PRESET_COUNT,
            "MBF backup is truncated"
        );
    }
    Ok(MbfBackup { header, presets })
}

pub fn export_mbf(header: &MbfHeader, presets: &[Preset], path: &Path) -> FormatResult<()> {
    let file = encode_mbf(header, presets)?;
    debug!(path = %path.display(), presets = presets.len(), "exporting .mbf");
    write_file(path, &file)
}

pub fn import_mbf(path: &Path) -> FormatResult<MbfBackup> {
    let data = read_file(path)?;
    debug!(path = %path.display(), len = data.len(), "importing .mbf");
    decode_mbf(&data)
}
