//! Error types.
//!
//! Decoding a report never fails with an error: a malformed or corrupted
//! report is ordinary transport noise and yields `None`. The enums here cover
//! the cases a caller has to fix before anything is sent: out-of-range
//! arguments, wrong payload sizes and unusable files.

use std::path::PathBuf;

use thiserror::Error;

use crate::effects::ModuleKind;

/// Builder and domain validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{field} out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Invalid {what} size: expected {expected} bytes, got {actual}")]
    InvalidPayloadSize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Payload too large: {actual} bytes (max {max})")]
    PayloadTooLarge { max: usize, actual: usize },

    #[error("Unknown module '{0}' (expected one of fx, od, amp, cab, ns, eq, mod, delay, reverb)")]
    UnknownModule(String),

    #[error("Unknown parameter '{param}' for module {module}")]
    UnknownParameter { module: ModuleKind, param: String },

    #[error("Parameter '{param}' of module {module} is 16-bit and can only be changed by storing the preset")]
    WideParameter { module: ModuleKind, param: String },

    #[error("Unknown command: {0:#04X}")]
    UnknownCommand(u8),

    #[error("Effect order has {actual} entries (max {max})")]
    EffectOrderTooLong { max: usize, actual: usize },
}

/// Convenience result alias for builder and model operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Check a value destined for a single wire byte.
pub(crate) fn check_u8(field: &'static str, value: i64, max: u8) -> ProtocolResult<u8> {
    match u8::try_from(value) {
        Ok(byte) if byte <= max => Ok(byte),
        _ => Err(ProtocolError::OutOfRange {
            field,
            value,
            min: 0,
            max: i64::from(max),
        }),
    }
}

/// Check a value destined for a 16-bit little-endian field.
pub(crate) fn check_u16(field: &'static str, value: i64) -> ProtocolResult<u16> {
    u16::try_from(value).map_err(|_overflow| ProtocolError::OutOfRange {
        field,
        value,
        min: 0,
        max: i64::from(u16::MAX),
    })
}

/// Preset file container failures.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{format} data too small: {actual} bytes (need at least {required})")]
    TooSmall {
        format: &'static str,
        actual: usize,
        required: usize,
    },

    #[error("Invalid {format} magic: expected {expected:02X?}, got {actual:02X?}")]
    InvalidMagic {
        format: &'static str,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("Too many presets for a backup: {count} (max {max})")]
    TooManyPresets { count: usize, max: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FormatError {
    /// `true` when the bytes are not this container format at all, as opposed
    /// to a truncated or unreadable file of the right format.
    pub fn is_wrong_format(&self) -> bool {
        matches!(self, Self::InvalidMagic { .. })
    }
}

/// Convenience result alias for file container operations.
pub type FormatResult<T> = Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_display() {
        let err = ProtocolError::OutOfRange {
            field: "slot",
            value: 200,
            min: 0,
            max: 199,
        };
        assert_eq!(err.to_string(), "slot out of range: 200 (allowed 0..=199)");
    }

    #[test]
    fn test_check_u8_bounds() {
        assert_eq!(check_u8("volume", 100, 100), Ok(100));
        assert_eq!(check_u8("volume", 0, 100), Ok(0));
        assert!(matches!(
            check_u8("volume", 101, 100),
            Err(ProtocolError::OutOfRange { value: 101, .. })
        ));
        assert!(matches!(
            check_u8("volume", -1, 100),
            Err(ProtocolError::OutOfRange { value: -1, .. })
        ));
    }

    #[test]
    fn test_unknown_command_display() {
        assert_eq!(
            ProtocolError::UnknownCommand(0x7F).to_string(),
            "Unknown command: 0x7F"
        );
    }

    #[test]
    fn test_wrong_format_classification() {
        let magic = FormatError::InvalidMagic {
            format: "GNR",
            expected: b"mooerge\0".to_vec(),
            actual: vec![0; 8],
        };
        let short = FormatError::TooSmall {
            format: "GNR",
            actual: 4,
            required: 12,
        };
        assert!(magic.is_wrong_format());
        assert!(!short.is_wrong_format());
    }
}
