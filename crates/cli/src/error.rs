//! Error types for mooerctl

use std::path::PathBuf;

use mooer_hid_protocol::{FormatError, ProtocolError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Backup slot {0} is empty")]
    EmptySlot(usize),

    #[error("Reports do not form a valid frame: {0}")]
    MalformedFrame(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedFrame(_) => 2,
            Self::InvalidArgument(_) | Self::EmptySlot(_) => 3,
            Self::Io { .. } => 4,
        }
    }
}

/// Map an error to the process exit code: 2 for unusable files, 3 for bad
/// arguments or values, 4 for I/O failures, 1 for anything else.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<CliError>() {
            return err.exit_code();
        }
        if let Some(err) = cause.downcast_ref::<FormatError>() {
            return match err {
                FormatError::Io { .. } => 4,
                _ => 2,
            };
        }
        if cause.downcast_ref::<ProtocolError>().is_some() {
            return 3;
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return 4;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let format = anyhow::Error::from(FormatError::TooSmall {
            format: "MO",
            actual: 3,
            required: 1024,
        });
        assert_eq!(exit_code(&format), 2);

        let io = anyhow::Error::from(FormatError::Io {
            path: PathBuf::from("missing.mo"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(exit_code(&io), 4);

        let range = anyhow::Error::from(ProtocolError::UnknownModule("wah".into()));
        assert_eq!(exit_code(&range), 3);

        let cli = anyhow::Error::from(CliError::EmptySlot(4));
        assert_eq!(exit_code(&cli), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }

    #[test]
    fn test_exit_code_through_context() {
        let err = anyhow::Error::from(ProtocolError::UnknownCommand(0x11))
            .context("while encoding frame");
        assert_eq!(exit_code(&err), 3);
    }
}
