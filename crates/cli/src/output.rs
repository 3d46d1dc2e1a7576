//! Output formatting for CLI responses

use anyhow::Error;
use colored::Colorize;
use mooer_hid_protocol::{
    Frame, GnrHeader, HidReport, MbfBackup, ModuleKind, ParamWidth, Preset, Response,
};
use serde::Serialize;
use serde_json::json;

/// Print a `{"success": true, <key>: value}` document.
fn print_json<T: Serialize + ?Sized>(key: &str, value: &T) {
    let mut output = json!({ "success": true });
    if let Some(map) = output.as_object_mut() {
        map.insert(key.to_string(), json!(value));
    }
    match serde_json::to_string_pretty(&output) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format {key} as JSON: {e}"),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error, exit_code: u8) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "exit_code": exit_code,
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_success(message: &str, json: bool) {
    if json {
        print_json("message", message);
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

fn module_line(preset: &Preset, kind: ModuleKind) -> String {
    let mut fields = Vec::new();
    for spec in kind.params() {
        if matches!(spec.name, "header" | "enabled") {
            continue;
        }
        if let Ok(value) = preset.param(kind, spec.name) {
            match spec.width {
                ParamWidth::U8 => fields.push(format!("{}={value}", spec.name)),
                ParamWidth::U16Le => fields.push(format!("{}={value}ms", spec.name)),
            }
        }
    }
    fields.join(" ")
}

/// Print a preset with every module's parameters.
pub fn print_preset(preset: &Preset, json: bool) {
    if json {
        print_json("preset", preset);
        return;
    }

    println!("{} {}", "Preset:".bold(), preset.to_string().cyan());
    let chain: Vec<&str> = preset.effect_chain().into_iter().map(ModuleKind::name).collect();
    println!("  Chain: {}", chain.join(" > "));

    let enabled = preset.enabled_modules();
    for kind in ModuleKind::ALL {
        let state = if enabled.contains(&kind) {
            "on ".green()
        } else {
            "off".dimmed()
        };
        println!("  {:<6} [{}] {}", kind.name(), state, module_line(preset, kind));
    }
}

/// Print the header and populated slots of a backup.
pub fn print_backup(backup: &MbfBackup, json: bool) {
    if json {
        let presets: Vec<_> = backup
            .populated()
            .map(|(slot, preset)| json!({ "slot": slot, "name": preset.name }))
            .collect();
        print_json(
            "backup",
            &json!({
                "manufacturer": backup.header.manufacturer,
                "model_name": backup.header.model_name,
                "version": backup.header.version,
                "slots": backup.presets.len(),
                "presets": presets,
            }),
        );
        return;
    }

    println!(
        "{} {} {} (version {:?})",
        "Backup:".bold(),
        backup.header.manufacturer,
        backup.header.model_name,
        backup.header.version
    );
    let mut count = 0usize;
    for (slot, preset) in backup.populated() {
        println!("  {slot:>3}  {preset}");
        count = count.saturating_add(1);
    }
    if count == 0 {
        println!("{}", "No presets in backup".yellow());
    } else {
        println!("  {count} of {} slots in use", backup.presets.len());
    }
}

/// Print `.gnr` header details, or the size of a raw IR file.
pub fn print_ir_info(header: Option<&GnrHeader>, file_len: usize, payload_len: usize, json: bool) {
    if json {
        print_json(
            "ir",
            &json!({
                "file_size": file_len,
                "payload_size": payload_len,
                "gnr": header,
                "truncated": header.is_some_and(|h| h.is_truncated(file_len)),
            }),
        );
        return;
    }

    match header {
        Some(header) => {
            println!("{} {}", "GNR container:".bold(), header.magic);
            println!("  Info block: {} bytes", header.info_size);
            println!("  Payload: {payload_len} bytes at offset {}", header.data_offset);
            if header.is_truncated(file_len) {
                println!("  {}", "Info block runs past end of file".yellow());
            }
        }
        None => println!("{} {payload_len} bytes (sent as-is)", "Raw IR:".bold()),
    }
}

/// Meaningful bytes of a report: the length prefix and the data it counts.
fn report_bytes(report: &HidReport) -> &[u8] {
    let len = report.first().map_or(0, |&len| usize::from(len));
    report.get(..=len).unwrap_or(report)
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_reports(reports: &[HidReport], json: bool) {
    let lines: Vec<String> = reports.iter().map(|r| hex(report_bytes(r))).collect();
    if json {
        print_json("reports", &lines);
    } else {
        for line in lines {
            println!("{line}");
        }
    }
}

pub fn print_frame(frame: &Frame, response: &Response, json: bool) {
    if json {
        print_json("response", response);
        return;
    }
    println!("{} {}", "Frame:".bold(), frame);
    match response {
        Response::Identify(id) => {
            println!("  Identify: firmware {} device {}", id.firmware, id.device_name);
        }
        Response::Preset(preset) => {
            println!("  Preset slot {}: {}", preset.slot, preset.preset());
        }
        Response::ActivePatch(active) => println!("  Active patch: {}", active.slot),
        Response::Volume(volume) => println!("  Volume: {}", volume.volume),
        Response::System(system) => println!("  System settings: {}", system.settings()),
        Response::Raw(_) => {}
    }
}
