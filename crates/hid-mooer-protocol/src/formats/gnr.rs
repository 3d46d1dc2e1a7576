//! `.gnr` impulse-response file header.
//!
//! ```text
//! 0   magic "mooerge\0"
//! 8   info block length, u32 LE
//! 12  info block
//! ..  IR payload
//! ```

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use super::read_file;
use crate::error::{FormatError, FormatResult};

pub const GNR_MAGIC: [u8; 8] = *b"mooerge\0";
pub const GNR_HEADER_SIZE: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GnrHeader {
    /// Magic without the trailing NUL.
    pub magic: String,
    pub info_size: u32,
    /// Info block, clamped to the bytes actually present.
    pub info: Vec<u8>,
    /// Where the IR payload starts (`12 + info_size`).
    pub data_offset: usize,
}

impl GnrHeader {
    /// `true` when the file ends before the declared info block does.
    pub fn is_truncated(&self, file_len: usize) -> bool {
        self.data_offset > file_len
    }
}

pub fn parse_gnr_header(data: &[u8]) -> FormatResult<GnrHeader> {
    let (Some(magic), Some(&[s0, s1, s2, s3])) = (data.get(..8), data.get(8..GNR_HEADER_SIZE))
    else {
        return Err(FormatError::TooSmall {
            format: "GNR",
            actual: data.len(),
            required: GNR_HEADER_SIZE,
        });
    };
    if magic != GNR_MAGIC {
        return Err(FormatError::InvalidMagic {
            format: "GNR",
            expected: GNR_MAGIC.to_vec(),
            actual: magic.to_vec(),
        });
    }

    let info_size = u32::from_le_bytes([s0, s1, s2, s3]);
    let data_offset = usize::try_from(info_size)
        .unwrap_or(usize::MAX)
        .saturating_add(GNR_HEADER_SIZE);
    let info = data
        .get(GNR_HEADER_SIZE..data_offset.min(data.len()))
        .unwrap_or_default()
        .to_vec();
    if data_offset > data.len() {
        warn!(info_size, len = data.len(), "GNR info block runs past end of file");
    }

    Ok(GnrHeader {
        magic: "mooerge".to_string(),
        info_size,
        info,
        data_offset,
    })
}

/// IR samples following the info block (empty when the file stops early).
pub fn ir_payload(data: &[u8]) -> FormatResult<&[u8]> {
    let header = parse_gnr_header(data)?;
    Ok(data.get(header.data_offset..).unwrap_or_default())
}

/// Load an IR for upload: `.gnr` files are stripped to their payload, any
/// other file (e.g. WAV) is passed through unchanged.
pub fn load_ir_file(path: &Path) -> FormatResult<Vec<u8>> {
    let data = read_file(path)?;
    let is_gnr = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gnr"));
    debug!(path = %path.display(), len = data.len(), is_gnr, "loading IR file");
    if is_gnr {
        Ok(ir_payload(&data)?.to_vec())
    } else {
        Ok(data)
    }
}
