//! Command catalog and request builders.
//!
//! Each command byte names one logical operation and is shared by the
//! request and the device's response. Builders validate their arguments and
//! return [`ProtocolError`] before any bytes exist, so an invalid request can
//! never reach the wire.

use std::fmt;

use serde::Serialize;

use crate::effects::{ENABLED_PARAM_INDEX, ModuleKind, ParamWidth};
use crate::error::{ProtocolError, ProtocolResult, check_u8};
use crate::frame::{HidReport, build_chunked_frames, build_fixed_frame, build_frame};
use crate::preset::{EFFECT_ORDER_LEN, PRESET_SIZE};

/// Highest preset slot.
pub const MAX_SLOT: u8 = 199;

/// Number of preset slots.
pub const SLOT_COUNT: usize = MAX_SLOT as usize + 1;

/// Highest master volume.
pub const MAX_VOLUME: u8 = 100;

/// Highest cabinet IR slot.
pub const MAX_IR_SLOT: u8 = 9;

/// Command group identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Command {
    Identify = 0x10,
    Menu = 0x82,
    Preset = 0x83,
    PedalAssignAlt = 0x84,
    CabModels = 0x85,
    FootSwitch = 0x89,
    Fx = 0x90,
    DsOd = 0x91,
    Amp = 0x93,
    Cab = 0x94,
    NsGate = 0x95,
    Eq = 0x96,
    Mod = 0x97,
    Delay = 0x98,
    Reverb = 0x99,
    System = 0xA1,
    Volume = 0xA2,
    PedalAssignment = 0xA3,
    PatchAlternate = 0xA4,
    PatchSetting = 0xA5,
    ActivePatch = 0xA6,
    StorePatch = 0xA8,
    ActivePatchSetting = 0xA9,
    CabinetUpload = 0xE1,
    AmpUpload = 0xE2,
    AmpModels = 0xE3,
}

impl Command {
    pub const ALL: [Command; 26] = [
        Self::Identify,
        Self::Menu,
        Self::Preset,
        Self::PedalAssignAlt,
        Self::CabModels,
        Self::FootSwitch,
        Self::Fx,
        Self::DsOd,
        Self::Amp,
        Self::Cab,
        Self::NsGate,
        Self::Eq,
        Self::Mod,
        Self::Delay,
        Self::Reverb,
        Self::System,
        Self::Volume,
        Self::PedalAssignment,
        Self::PatchAlternate,
        Self::PatchSetting,
        Self::ActivePatch,
        Self::StorePatch,
        Self::ActivePatchSetting,
        Self::CabinetUpload,
        Self::AmpUpload,
        Self::AmpModels,
    ];

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Identify => "IDENTIFY",
            Self::Menu => "MENU",
            Self::Preset => "PRESET",
            Self::PedalAssignAlt => "PEDAL_ASSIGN_ALT",
            Self::CabModels => "CAB_MODELS",
            Self::FootSwitch => "FOOT_SWITCH",
            Self::Fx => "FX",
            Self::DsOd => "DS_OD",
            Self::Amp => "AMP",
            Self::Cab => "CAB",
            Self::NsGate => "NS_GATE",
            Self::Eq => "EQ",
            Self::Mod => "MOD",
            Self::Delay => "DELAY",
            Self::Reverb => "REVERB",
            Self::System => "SYSTEM",
            Self::Volume => "VOLUME",
            Self::PedalAssignment => "PEDAL_ASSIGNMENT",
            Self::PatchAlternate => "PATCH_ALTERNATE",
            Self::PatchSetting => "PATCH_SETTING",
            Self::ActivePatch => "ACTIVE_PATCH",
            Self::StorePatch => "STORE_PATCH",
            Self::ActivePatchSetting => "ACTIVE_PATCH_SETTING",
            Self::CabinetUpload => "CABINET_UPLOAD",
            Self::AmpUpload => "AMP_UPLOAD",
            Self::AmpModels => "AMP_MODELS",
        }
    }

    /// Module whose parameters this command sets, if any.
    pub fn module(self) -> Option<ModuleKind> {
        ModuleKind::ALL
            .into_iter()
            .find(|kind| kind.command() == self)
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_u8() == value)
            .ok_or(ProtocolError::UnknownCommand(value))
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.as_u8()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04X})", self.name(), self.as_u8())
    }
}

pub(crate) fn check_slot(slot: i64) -> ProtocolResult<u8> {
    check_u8("slot", slot, MAX_SLOT)
}

/// Single report for `command` with an arbitrary payload.
pub fn build_command(command: Command, payload: &[u8]) -> ProtocolResult<HidReport> {
    build_frame(command.as_u8(), payload)
}

/// Handshake request.
pub fn build_identify() -> HidReport {
    build_fixed_frame(Command::Identify.as_u8(), [])
}

/// Switch the active preset.
pub fn build_select_preset(slot: i64) -> ProtocolResult<HidReport> {
    Ok(build_fixed_frame(Command::ActivePatch.as_u8(), [check_slot(slot)?]))
}

/// Request the preset stored in `slot`.
pub fn build_read_preset(slot: i64) -> ProtocolResult<HidReport> {
    Ok(build_fixed_frame(Command::Preset.as_u8(), [check_slot(slot)?]))
}

/// Write a full 512-byte preset record to `slot`. The message spans several
/// reports, which must be sent in order.
pub fn build_store_preset(slot: i64, preset: &[u8]) -> ProtocolResult<Vec<HidReport>> {
    let slot = check_slot(slot)?;
    if preset.len() != PRESET_SIZE {
        return Err(ProtocolError::InvalidPayloadSize {
            what: "preset",
            expected: PRESET_SIZE,
            actual: preset.len(),
        });
    }
    let mut payload = Vec::with_capacity(PRESET_SIZE + 1);
    payload.push(slot);
    payload.extend_from_slice(preset);
    build_chunked_frames(Command::StorePatch.as_u8(), &payload)
}

/// Set one byte of a module record live. `param_index` is the byte offset
/// within the record.
pub fn build_effect_param(
    module: ModuleKind,
    param_index: i64,
    value: i64,
) -> ProtocolResult<HidReport> {
    let max_index = u8::try_from(module.size().saturating_sub(1)).unwrap_or(u8::MAX);
    let index = check_u8("param_index", param_index, max_index)?;
    let value = check_u8("value", value, u8::MAX)?;
    Ok(build_fixed_frame(module.command().as_u8(), [index, value]))
}

/// Enable or bypass a module.
pub fn build_toggle_effect(module: ModuleKind, enabled: bool) -> HidReport {
    build_fixed_frame(
        module.command().as_u8(),
        [ENABLED_PARAM_INDEX, u8::from(enabled)],
    )
}

/// Set a parameter by name through the module's parameter table.
///
/// Sixteen-bit parameters do not fit the one-byte live command and yield
/// [`ProtocolError::WideParameter`]; store the whole preset instead.
pub fn build_set_param(module: ModuleKind, param: &str, value: i64) -> ProtocolResult<HidReport> {
    let spec = module.param(param)?;
    if spec.width != ParamWidth::U8 {
        return Err(ProtocolError::WideParameter {
            module,
            param: param.to_string(),
        });
    }
    let offset = i64::try_from(spec.offset).unwrap_or(i64::MAX);
    build_effect_param(module, offset, value)
}

pub fn build_set_volume(volume: i64) -> ProtocolResult<HidReport> {
    let volume = check_u8("volume", volume, MAX_VOLUME)?;
    Ok(build_fixed_frame(Command::Volume.as_u8(), [volume]))
}

pub fn build_get_volume() -> HidReport {
    build_fixed_frame(Command::Volume.as_u8(), [])
}

pub fn build_get_system_settings() -> HidReport {
    build_fixed_frame(Command::System.as_u8(), [])
}

/// Change the system setting at byte `index`.
pub fn build_set_system_setting(index: i64, value: i64) -> ProtocolResult<HidReport> {
    let index = check_u8("setting_index", index, u8::MAX)?;
    let value = check_u8("value", value, u8::MAX)?;
    Ok(build_fixed_frame(Command::System.as_u8(), [index, value]))
}

/// Reorder the active preset's signal chain. Unused positions are zero.
pub fn build_set_effect_order(order: &[ModuleKind]) -> ProtocolResult<HidReport> {
    if order.len() > EFFECT_ORDER_LEN {
        return Err(ProtocolError::EffectOrderTooLong {
            max: EFFECT_ORDER_LEN,
            actual: order.len(),
        });
    }
    let mut payload = [0u8; EFFECT_ORDER_LEN];
    for (dst, kind) in payload.iter_mut().zip(order) {
        *dst = kind.index();
    }
    Ok(build_fixed_frame(Command::PatchSetting.as_u8(), payload))
}

/// Upload an impulse response into cabinet slot `ir_slot` (0-9).
pub fn build_cabinet_upload(ir_slot: i64, data: &[u8]) -> ProtocolResult<Vec<HidReport>> {
    let ir_slot = check_u8("ir_slot", ir_slot, MAX_IR_SLOT)?;
    let mut payload = Vec::with_capacity(data.len().saturating_add(1));
    payload.push(ir_slot);
    payload.extend_from_slice(data);
    build_chunked_frames(Command::CabinetUpload.as_u8(), &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc16;
    use crate::frame::{parse_chunked_frames, parse_frame};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_command_values() -> TestResult {
        assert_eq!(Command::Identify.as_u8(), 0x10);
        assert_eq!(Command::StorePatch.as_u8(), 0xA8);
        assert_eq!(Command::try_from(0x99)?, Command::Reverb);
        assert_eq!(u8::from(Command::AmpModels), 0xE3);
        assert_eq!(Command::try_from(0x92), Err(ProtocolError::UnknownCommand(0x92)));
        Ok(())
    }

    #[test]
    fn test_command_catalog_is_unique() -> TestResult {
        for command in Command::ALL {
            assert_eq!(Command::try_from(command.as_u8())?, command);
        }
        Ok(())
    }

    #[test]
    fn test_command_module() {
        assert_eq!(Command::Delay.module(), Some(ModuleKind::Delay));
        assert_eq!(Command::Volume.module(), None);
        assert_eq!(Command::ActivePatch.to_string(), "ACTIVE_PATCH (0xA6)");
    }

    #[test]
    fn test_select_preset_bytes() -> TestResult {
        let report = build_select_preset(2)?;
        let crc = crc16(&[0xA6, 0x02]).to_le_bytes();
        assert_eq!(
            &report[..9],
            &[0x08, 0xAA, 0x55, 0x02, 0x00, 0xA6, 0x02, crc[0], crc[1]]
        );
        assert!(report[9..].iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_identify_has_empty_payload() {
        let frame = parse_frame(&build_identify());
        assert_eq!(frame.map(|f| (f.command, f.payload.len())), Some((0x10, 0)));
    }

    #[test]
    fn test_slot_bounds() {
        assert!(build_read_preset(0).is_ok());
        assert!(build_read_preset(199).is_ok());
        for slot in [200, -1, 1000] {
            assert!(matches!(
                build_select_preset(slot),
                Err(ProtocolError::OutOfRange { field: "slot", max: 199, .. })
            ));
            assert!(matches!(
                build_read_preset(slot),
                Err(ProtocolError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_volume_bounds() -> TestResult {
        let frame = parse_frame(&build_set_volume(100)?).ok_or("no frame")?;
        assert_eq!(frame.payload, vec![100]);
        for volume in [101, -1] {
            assert!(matches!(
                build_set_volume(volume),
                Err(ProtocolError::OutOfRange { field: "volume", max: 100, .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn test_store_preset_is_chunked() -> TestResult {
        let record = [0x5Au8; PRESET_SIZE];
        let reports = build_store_preset(7, &record)?;
        assert!(reports.len() > 1);
        let frame = parse_chunked_frames(&reports).ok_or("no frame")?;
        assert_eq!(frame.command, 0xA8);
        assert_eq!(frame.payload.len(), PRESET_SIZE + 1);
        assert_eq!(frame.payload[0], 7);
        Ok(())
    }

    #[test]
    fn test_store_preset_rejects_wrong_size() {
        assert!(matches!(
            build_store_preset(0, &[0u8; 100]),
            Err(ProtocolError::InvalidPayloadSize {
                expected: 512,
                actual: 100,
                ..
            })
        ));
        assert!(matches!(
            build_store_preset(200, &[0u8; PRESET_SIZE]),
            Err(ProtocolError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_effect_param() -> TestResult {
        let frame = parse_frame(&build_effect_param(ModuleKind::Amp, 3, 128)?).ok_or("no frame")?;
        assert_eq!(frame.command, 0x93);
        assert_eq!(frame.payload, vec![3, 128]);

        assert!(matches!(
            build_effect_param(ModuleKind::Amp, 3, 256),
            Err(ProtocolError::OutOfRange { field: "value", .. })
        ));
        assert!(matches!(
            build_effect_param(ModuleKind::Od, 11, 0),
            Err(ProtocolError::OutOfRange { field: "param_index", max: 10, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_module_name() {
        assert!(matches!(
            "flanger".parse::<ModuleKind>(),
            Err(ProtocolError::UnknownModule(_))
        ));
    }

    #[test]
    fn test_toggle_effect() -> TestResult {
        let on = parse_frame(&build_toggle_effect(ModuleKind::Reverb, true)).ok_or("no frame")?;
        let off = parse_frame(&build_toggle_effect(ModuleKind::Fx, false)).ok_or("no frame")?;
        assert_eq!((on.command, on.payload), (0x99, vec![1, 1]));
        assert_eq!((off.command, off.payload), (0x90, vec![1, 0]));
        Ok(())
    }

    #[test]
    fn test_set_param_by_name() -> TestResult {
        let frame = parse_frame(&build_set_param(ModuleKind::Delay, "feedback", 40)?)
            .ok_or("no frame")?;
        assert_eq!(frame.payload, vec![4, 40]);
        let eq = parse_frame(&build_set_param(ModuleKind::Eq, "band_12", 9)?).ok_or("no frame")?;
        assert_eq!(eq.payload, vec![14, 9]);
        assert!(matches!(
            build_set_param(ModuleKind::Delay, "time_ms", 500),
            Err(ProtocolError::WideParameter { .. })
        ));
        assert!(matches!(
            build_set_param(ModuleKind::Ns, "ratio", 1),
            Err(ProtocolError::UnknownParameter { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_system_setting() -> TestResult {
        let frame = parse_frame(&build_set_system_setting(4, 1)?).ok_or("no frame")?;
        assert_eq!((frame.command, frame.payload), (0xA1, vec![4, 1]));
        assert!(build_set_system_setting(256, 0).is_err());
        let read = parse_frame(&build_get_system_settings()).ok_or("no frame")?;
        assert!(read.payload.is_empty());
        Ok(())
    }

    #[test]
    fn test_effect_order() -> TestResult {
        let order = [ModuleKind::Ns, ModuleKind::Amp, ModuleKind::Reverb];
        let frame = parse_frame(&build_set_effect_order(&order)?).ok_or("no frame")?;
        assert_eq!(frame.command, 0xA5);
        assert_eq!(frame.payload, vec![4, 2, 8, 0, 0, 0, 0, 0, 0, 0]);
        let too_long = [ModuleKind::Fx; 11];
        assert!(matches!(
            build_set_effect_order(&too_long),
            Err(ProtocolError::EffectOrderTooLong { actual: 11, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_cabinet_upload() -> TestResult {
        let ir = vec![0x11u8; 300];
        let reports = build_cabinet_upload(9, &ir)?;
        let frame = parse_chunked_frames(&reports).ok_or("no frame")?;
        assert_eq!(frame.command, 0xE1);
        assert_eq!(frame.payload[0], 9);
        assert_eq!(&frame.payload[1..], ir.as_slice());
        assert!(build_cabinet_upload(10, &ir).is_err());
        Ok(())
    }
}
