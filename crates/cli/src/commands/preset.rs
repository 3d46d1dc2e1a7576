//! Preset file commands

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use mooer_hid_protocol::{ModuleKind, ParamWidth, Preset, PresetUpdate, export_mo, import_mo};
use serde_json::json;
use tracing::{debug, info};

use crate::commands::PresetCommands;
use crate::error::CliError;
use crate::output;

pub fn execute(cmd: &PresetCommands, json: bool) -> Result<()> {
    match cmd {
        PresetCommands::Show { path } => show_preset(path, json),
        PresetCommands::New {
            path,
            name,
            params,
            force,
        } => new_preset(path, name.as_deref(), params, *force, json),
        PresetCommands::Set {
            path,
            name,
            params,
            output,
        } => set_preset(path, name.as_deref(), params, output.as_deref(), json),
        PresetCommands::Params { module } => list_params(module.as_deref(), json),
    }
}

/// Parse `module.param=value`.
pub fn parse_assignment(text: &str) -> Result<(ModuleKind, String, i64)> {
    let invalid = || CliError::InvalidArgument(format!("expected MODULE.PARAM=VALUE, got '{text}'"));
    let (target, value) = text.split_once('=').ok_or_else(invalid)?;
    let (module, param) = target.split_once('.').ok_or_else(invalid)?;
    let module: ModuleKind = module.parse()?;
    let value: i64 = value.trim().parse().map_err(|err| {
        CliError::InvalidArgument(format!("value for {module}.{param}: {err}"))
    })?;
    Ok((module, param.trim().to_string(), value))
}

fn build_update(name: Option<&str>, params: &[String]) -> Result<PresetUpdate> {
    let mut update = PresetUpdate::default();
    if let Some(name) = name {
        update = update.name(name);
    }
    for assignment in params {
        let (module, param, value) = parse_assignment(assignment)?;
        update = update.param(module, param, value);
    }
    Ok(update)
}

fn show_preset(path: &Path, json: bool) -> Result<()> {
    let preset = import_mo(path)?;
    debug!(path = %path.display(), name = %preset, "loaded preset");
    output::print_preset(&preset, json);
    Ok(())
}

fn new_preset(
    path: &Path,
    name: Option<&str>,
    params: &[String],
    force: bool,
    json: bool,
) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ))
        .into());
    }

    let mut preset = Preset::default();
    build_update(name, params)?.apply(&mut preset)?;
    export_mo(&preset, path)?;
    info!(path = %path.display(), "created preset");

    output::print_success(&format!("Created preset {} at {}", preset, path.display()), json);
    Ok(())
}

fn set_preset(
    path: &Path,
    name: Option<&str>,
    params: &[String],
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let update = build_update(name, params)?;
    let mut preset = import_mo(path)?;
    update.apply(&mut preset)?;

    let target = output.unwrap_or(path);
    export_mo(&preset, target)?;
    info!(
        path = %target.display(),
        changes = update.params.len(),
        "updated preset"
    );

    output::print_success(
        &format!("Updated preset {} in {}", preset, target.display()),
        json,
    );
    Ok(())
}

fn list_params(module: Option<&str>, json: bool) -> Result<()> {
    let kinds = match module {
        Some(name) => vec![name.parse::<ModuleKind>()?],
        None => ModuleKind::ALL.to_vec(),
    };

    if json {
        let modules: Vec<_> = kinds
            .iter()
            .map(|kind| {
                let params: Vec<_> = kind
                    .params()
                    .iter()
                    .map(|spec| {
                        json!({
                            "name": spec.name,
                            "offset": spec.offset,
                            "max": spec.max_value(),
                        })
                    })
                    .collect();
                json!({
                    "module": kind.name(),
                    "offset": kind.offset(),
                    "size": kind.size(),
                    "params": params,
                })
            })
            .collect();
        let output = json!({ "success": true, "modules": modules });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for kind in kinds {
        println!(
            "{} (offset {:#05x}, {} bytes)",
            kind.name().bold(),
            kind.offset(),
            kind.size()
        );
        for spec in kind.params() {
            let width = match spec.width {
                ParamWidth::U8 => "u8",
                ParamWidth::U16Le => "u16 le",
            };
            println!("  {:<12} +{:<3} {}", spec.name, spec.offset, width);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_parse_assignment() -> TestResult {
        let (module, param, value) = parse_assignment("delay.time_ms=420")?;
        assert_eq!(module, ModuleKind::Delay);
        assert_eq!(param, "time_ms");
        assert_eq!(value, 420);

        let (module, _, _) = parse_assignment("MOD.rate = 3")?;
        assert_eq!(module, ModuleKind::Mod);
        Ok(())
    }

    #[test]
    fn test_parse_assignment_rejects_malformed() {
        assert!(parse_assignment("amp.gain").is_err());
        assert!(parse_assignment("gain=3").is_err());
        assert!(parse_assignment("wah.level=3").is_err());
        assert!(parse_assignment("amp.gain=loud").is_err());
    }

    #[test]
    fn test_build_update() -> TestResult {
        let update = build_update(Some("Crunch"), &["od.gain=10".to_string()])?;
        assert_eq!(update.name.as_deref(), Some("Crunch"));
        assert_eq!(update.params, vec![(ModuleKind::Od, "gain".to_string(), 10)]);
        Ok(())
    }
}
