//! Backup (.mbf) commands

use std::path::{Path, PathBuf};

use anyhow::Result;
use mooer_hid_protocol::{MbfHeader, Preset, export_mbf, export_mo, import_mbf, import_mo};
use serde_json::json;
use tracing::{debug, info};

use crate::commands::BackupCommands;
use crate::error::CliError;
use crate::output;

pub fn execute(cmd: &BackupCommands, json: bool) -> Result<()> {
    match cmd {
        BackupCommands::List { path } => list_backup(path, json),
        BackupCommands::Extract {
            path,
            out_dir,
            slot,
        } => extract_backup(path, out_dir, *slot, json),
        BackupCommands::Pack {
            output,
            presets,
            manufacturer,
            model,
        } => pack_backup(
            output,
            presets,
            manufacturer.as_deref(),
            model.as_deref(),
            json,
        ),
    }
}

fn list_backup(path: &Path, json: bool) -> Result<()> {
    let backup = import_mbf(path)?;
    output::print_backup(&backup, json);
    Ok(())
}

/// File name used for an extracted slot.
pub fn slot_file_name(slot: usize) -> String {
    format!("{slot:03}.mo")
}

fn extract_backup(path: &Path, out_dir: &Path, slot: Option<usize>, json: bool) -> Result<()> {
    let backup = import_mbf(path)?;

    let selected: Vec<(usize, &Preset)> = match slot {
        Some(slot) => {
            let preset = backup
                .presets
                .get(slot)
                .filter(|preset| !preset.is_empty())
                .ok_or(CliError::EmptySlot(slot))?;
            vec![(slot, preset)]
        }
        None => backup.populated().collect(),
    };

    std::fs::create_dir_all(out_dir).map_err(|source| CliError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(selected.len());
    for (slot, preset) in selected {
        let target = out_dir.join(slot_file_name(slot));
        export_mo(preset, &target)?;
        debug!(slot, path = %target.display(), "extracted preset");
        written.push(target);
    }
    info!(count = written.len(), "extracted presets");

    if json {
        let output = json!({ "success": true, "files": written });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        output::print_success(
            &format!("Extracted {} presets to {}", written.len(), out_dir.display()),
            false,
        );
    }
    Ok(())
}

fn pack_backup(
    output: &Path,
    files: &[PathBuf],
    manufacturer: Option<&str>,
    model: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut header = MbfHeader::default();
    if let Some(manufacturer) = manufacturer {
        header.manufacturer = manufacturer.to_string();
    }
    if let Some(model) = model {
        header.model_name = model.to_string();
    }

    let presets = files
        .iter()
        .map(|file| import_mo(file))
        .collect::<Result<Vec<_>, _>>()?;
    export_mbf(&header, &presets, output)?;
    info!(path = %output.display(), presets = presets.len(), "packed backup");

    output::print_success(
        &format!("Packed {} presets into {}", presets.len(), output.display()),
        json,
    );
    Ok(())
}
