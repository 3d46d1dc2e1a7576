//! Typed views of device responses.
//!
//! [`parse_response`] looks the frame's command up in a static table of
//! parsers. Unknown commands, and payloads a parser cannot use, come back as
//! [`Response::Raw`] so that nothing a device sends is lost.

use serde::Serialize;

use crate::commands::Command;
use crate::frame::Frame;
use crate::preset::{PRESET_SIZE, Preset};
use crate::system::SystemSettings;

/// Payload length of a complete identify response.
pub const IDENTIFY_PAYLOAD_LEN: usize = 16;

const FIRMWARE_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifyResponse {
    /// Dotted firmware version, e.g. `1.5.0`, or `unknown`.
    pub firmware: String,
    pub device_name: String,
    pub raw: Vec<u8>,
}

/// Preset read: slot byte followed by the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetResponse {
    pub slot: u8,
    pub data: Vec<u8>,
}

impl PresetResponse {
    pub fn preset(&self) -> Preset {
        Preset::from_bytes(&self.data)
    }

    /// The record truncated or zero-padded to exactly [`PRESET_SIZE`] bytes,
    /// ready for a store command.
    pub fn preset_bytes(&self) -> [u8; PRESET_SIZE] {
        let mut out = [0u8; PRESET_SIZE];
        for (dst, src) in out.iter_mut().zip(&self.data) {
            *dst = *src;
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivePatchResponse {
    pub slot: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeResponse {
    pub volume: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemResponse {
    pub data: Vec<u8>,
}

impl SystemResponse {
    pub fn settings(&self) -> SystemSettings {
        SystemSettings::from_bytes(&self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Identify(IdentifyResponse),
    Preset(PresetResponse),
    ActivePatch(ActivePatchResponse),
    Volume(VolumeResponse),
    System(SystemResponse),
    /// No parser for this command, or the parser rejected the payload.
    Raw(Frame),
}

impl Response {
    pub fn command(&self) -> u8 {
        match self {
            Self::Identify(_) => Command::Identify.as_u8(),
            Self::Preset(_) => Command::Preset.as_u8(),
            Self::ActivePatch(_) => Command::ActivePatch.as_u8(),
            Self::Volume(_) => Command::Volume.as_u8(),
            Self::System(_) => Command::System.as_u8(),
            Self::Raw(frame) => frame.command,
        }
    }
}

fn is(frame: &Frame, command: Command) -> bool {
    frame.command == command.as_u8()
}

/// Five firmware digit bytes and an 11-byte NUL-terminated name. Short
/// payloads still produce a response, with both fields `unknown`.
pub fn parse_identify(frame: &Frame) -> Option<IdentifyResponse> {
    if !is(frame, Command::Identify) {
        return None;
    }
    let payload = &frame.payload;
    let (Some(firmware), Some(name)) = (
        payload.get(..FIRMWARE_LEN),
        payload.get(FIRMWARE_LEN..IDENTIFY_PAYLOAD_LEN),
    ) else {
        return Some(IdentifyResponse {
            firmware: "unknown".to_string(),
            device_name: "unknown".to_string(),
            raw: payload.clone(),
        });
    };

    let digits: Vec<String> = firmware
        .iter()
        .filter(|&&b| b != 0)
        .map(u8::to_string)
        .collect();
    let firmware = if digits.is_empty() {
        "unknown".to_string()
    } else {
        digits.join(".")
    };
    let device_name = name
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii() { char::from(b) } else { '\u{FFFD}' })
        .collect();

    Some(IdentifyResponse {
        firmware,
        device_name,
        raw: payload.clone(),
    })
}

pub fn parse_preset_response(frame: &Frame) -> Option<PresetResponse> {
    if !is(frame, Command::Preset) {
        return None;
    }
    let (&slot, data) = frame.payload.split_first()?;
    Some(PresetResponse {
        slot,
        data: data.to_vec(),
    })
}

pub fn parse_active_patch(frame: &Frame) -> Option<ActivePatchResponse> {
    if !is(frame, Command::ActivePatch) {
        return None;
    }
    Some(ActivePatchResponse {
        slot: *frame.payload.first()?,
    })
}

pub fn parse_volume(frame: &Frame) -> Option<VolumeResponse> {
    if !is(frame, Command::Volume) {
        return None;
    }
    Some(VolumeResponse {
        volume: *frame.payload.first()?,
    })
}

pub fn parse_system(frame: &Frame) -> Option<SystemResponse> {
    if !is(frame, Command::System) {
        return None;
    }
    Some(SystemResponse {
        data: frame.payload.clone(),
    })
}

type Parser = fn(&Frame) -> Option<Response>;

static PARSERS: [(Command, Parser); 5] = [
    (Command::Identify, |f| parse_identify(f).map(Response::Identify)),
    (Command::Preset, |f| parse_preset_response(f).map(Response::Preset)),
    (Command::ActivePatch, |f| parse_active_patch(f).map(Response::ActivePatch)),
    (Command::Volume, |f| parse_volume(f).map(Response::Volume)),
    (Command::System, |f| parse_system(f).map(Response::System)),
];

/// Dispatch a frame to its typed parser. Never fails.
pub fn parse_response(frame: Frame) -> Response {
    PARSERS
        .iter()
        .find(|(command, _)| is(&frame, *command))
        .and_then(|(_, parser)| parser(&frame))
        .unwrap_or(Response::Raw(frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identify_payload() -> Vec<u8> {
        let mut payload = vec![1, 5, 0, 0, 0];
        payload.extend_from_slice(b"GE150 Pro\0\0");
        payload
    }

    #[test]
    fn test_identify() {
        let frame = Frame::new(0x10, identify_payload());
        let response = parse_identify(&frame);
        assert_eq!(
            response.as_ref().map(|r| (r.firmware.as_str(), r.device_name.as_str())),
            Some(("1.5", "GE150 Pro"))
        );
    }

    #[test]
    fn test_identify_zero_firmware() {
        let mut payload = identify_payload();
        payload[..5].fill(0);
        let response = parse_identify(&Frame::new(0x10, payload));
        assert_eq!(response.map(|r| r.firmware), Some("unknown".to_string()));
    }

    #[test]
    fn test_identify_short_payload_degrades() {
        let response = parse_identify(&Frame::new(0x10, vec![1, 2, 3]));
        assert_eq!(
            response,
            Some(IdentifyResponse {
                firmware: "unknown".to_string(),
                device_name: "unknown".to_string(),
                raw: vec![1, 2, 3],
            })
        );
    }

    #[test]
    fn test_preset_response() -> Result<(), Box<dyn std::error::Error>> {
        let mut payload = vec![42];
        payload.extend_from_slice(&Preset::default().to_bytes());
        let Response::Preset(preset) = parse_response(Frame::new(0x83, payload)) else {
            return Err("expected preset response".into());
        };
        assert_eq!(preset.slot, 42);
        assert_eq!(preset.data.len(), PRESET_SIZE);
        assert_eq!(preset.preset(), Preset::default());
        Ok(())
    }

    #[test]
    fn test_preset_bytes_pad_and_truncate() {
        let short = PresetResponse {
            slot: 0,
            data: vec![9; 10],
        };
        let bytes = short.preset_bytes();
        assert_eq!(&bytes[..10], &[9; 10]);
        assert!(bytes[10..].iter().all(|&b| b == 0));

        let long = PresetResponse {
            slot: 0,
            data: vec![7; 600],
        };
        assert!(long.preset_bytes().iter().all(|&b| b == 7));
    }

    #[test]
    fn test_simple_responses() {
        assert_eq!(
            parse_response(Frame::new(0xA6, vec![17])),
            Response::ActivePatch(ActivePatchResponse { slot: 17 })
        );
        assert_eq!(
            parse_response(Frame::new(0xA2, vec![50])),
            Response::Volume(VolumeResponse { volume: 50 })
        );
        assert_eq!(
            parse_response(Frame::new(0xA1, vec![1, 2])),
            Response::System(SystemResponse { data: vec![1, 2] })
        );
    }

    #[test]
    fn test_fallback_to_raw() {
        let unknown = Frame::new(0x7F, vec![1]);
        assert_eq!(parse_response(unknown.clone()), Response::Raw(unknown));

        let unparsed = Frame::new(0x93, vec![3, 4]);
        assert_eq!(parse_response(unparsed.clone()), Response::Raw(unparsed));

        let empty_volume = Frame::new(0xA2, Vec::new());
        assert_eq!(parse_response(empty_volume.clone()), Response::Raw(empty_volume));
    }

    #[test]
    fn test_parsers_check_command() {
        assert_eq!(parse_volume(&Frame::new(0xA6, vec![1])), None);
        assert_eq!(parse_system(&Frame::new(0x10, Vec::new())), None);
        assert_eq!(parse_response(Frame::new(0xA2, vec![5])).command(), 0xA2);
    }
}
