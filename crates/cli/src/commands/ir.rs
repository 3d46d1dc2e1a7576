//! IR file commands

use std::path::Path;

use anyhow::Result;
use mooer_hid_protocol::parse_gnr_header;

use crate::commands::IrCommands;
use crate::error::CliError;
use crate::output;

pub fn execute(cmd: &IrCommands, json: bool) -> Result<()> {
    match cmd {
        IrCommands::Info { path } => ir_info(path, json),
    }
}

fn ir_info(path: &Path, json: bool) -> Result<()> {
    let data = std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_gnr = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gnr"));
    if !is_gnr {
        output::print_ir_info(None, data.len(), data.len(), json);
        return Ok(());
    }

    let header = parse_gnr_header(&data)?;
    let payload_len = data.len().saturating_sub(header.data_offset);
    output::print_ir_info(Some(&header), data.len(), payload_len, json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mooer_hid_protocol::FormatError;
    use tempfile::TempDir;

    #[test]
    fn test_gnr_with_bad_magic_is_format_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("bad.gnr");
        std::fs::write(&path, [0u8; 32])?;

        let err = ir_info(&path, true).err().ok_or("expected an error")?;
        let format = err.downcast_ref::<FormatError>().ok_or("not a format error")?;
        assert!(format.is_wrong_format());
        Ok(())
    }
}
