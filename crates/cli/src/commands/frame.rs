//! Report encode/decode for working with USB captures

use anyhow::Result;
use mooer_hid_protocol::{
    Command, HID_REPORT_SIZE, HidReport, build_chunked_frames, parse_chunked_frames,
    parse_response,
};
use tracing::{debug, warn};

use crate::commands::FrameCommands;
use crate::error::CliError;
use crate::output;

pub fn execute(cmd: &FrameCommands, json: bool) -> Result<()> {
    match cmd {
        FrameCommands::Encode { command, payload } => encode(command, payload, json),
        FrameCommands::Decode { reports } => decode(reports, json),
    }
}

/// Parse a command given as a catalog name (`volume`, `ACTIVE_PATCH`,
/// `active-patch`) or as a byte (`0xA2`, `162`).
pub fn parse_command(text: &str) -> Result<u8, CliError> {
    let text = text.trim();
    let invalid = || CliError::InvalidArgument(format!("unknown command '{text}'"));

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|_overflow| invalid());
    }
    if text.chars().all(|c| c.is_ascii_digit()) && !text.is_empty() {
        return text.parse::<u8>().map_err(|_overflow| invalid());
    }

    let wanted = text.replace('-', "_");
    Command::ALL
        .into_iter()
        .find(|command| command.name().eq_ignore_ascii_case(&wanted))
        .map(Command::as_u8)
        .ok_or_else(invalid)
}

/// Parse hex bytes. Whitespace, `:` and `,` separators are ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, CliError> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::InvalidArgument(format!(
            "odd number of hex digits in '{text}'"
        )));
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::InvalidArgument(format!("invalid hex in '{text}'")))
        })
        .collect()
}

fn encode(command: &str, payload: &str, json: bool) -> Result<()> {
    let command = parse_command(command)?;
    if Command::try_from(command).is_err() {
        warn!(command, "command is not in the catalog; encoding anyway");
    }
    let payload = parse_hex(payload)?;
    let reports = build_chunked_frames(command, &payload)?;
    debug!(command, bytes = payload.len(), reports = reports.len(), "encoded");
    output::print_reports(&reports, json);
    Ok(())
}

fn decode(inputs: &[String], json: bool) -> Result<()> {
    let mut reports: Vec<HidReport> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let bytes = parse_hex(input)?;
        if bytes.len() > HID_REPORT_SIZE {
            return Err(CliError::InvalidArgument(format!(
                "report has {} bytes (max {HID_REPORT_SIZE})",
                bytes.len()
            ))
            .into());
        }
        let mut report = [0u8; HID_REPORT_SIZE];
        for (dst, src) in report.iter_mut().zip(bytes) {
            *dst = src;
        }
        reports.push(report);
    }

    let frame = parse_chunked_frames(&reports).ok_or_else(|| {
        CliError::MalformedFrame("bad length, preamble, size or checksum".to_string())
    })?;
    let response = parse_response(frame.clone());
    output::print_frame(&frame, &response, json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_parse_command_forms() -> TestResult {
        assert_eq!(parse_command("volume")?, 0xA2);
        assert_eq!(parse_command("ACTIVE_PATCH")?, 0xA6);
        assert_eq!(parse_command("active-patch")?, 0xA6);
        assert_eq!(parse_command("0xe1")?, 0xE1);
        assert_eq!(parse_command("16")?, 0x10);
        assert!(parse_command("warp").is_err());
        assert!(parse_command("0x100").is_err());
        assert!(parse_command("256").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_hex() -> TestResult {
        assert_eq!(parse_hex("07 aa:55,01")?, vec![0x07, 0xAA, 0x55, 0x01]);
        assert_eq!(parse_hex("")?, Vec::<u8>::new());
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
        Ok(())
    }
}
