//! The 512-byte preset record.
//!
//! ```text
//! 0x00  effect order     10 bytes
//! 0x0A  data size         2 bytes, big-endian (bytes following this field)
//! 0x0C  name             14 bytes, ASCII, NUL-padded
//! 0x1A  fx               13
//! 0x27  od               11
//! 0x32  amp              17
//! 0x43  cab              13
//! 0x50  ns               11
//! 0x5B  eq               23
//! 0x72  mod              15
//! 0x81  delay            17
//! 0x92  reverb           13
//! 0x9F  zero fill up to 0x200
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::{
    AmpModule, CabModule, DelayModule, EffectModule, EqModule, FxModule, ModulationModule, Module,
    ModuleKind, NoiseGateModule, OverdriveModule, ReverbModule,
};
use crate::error::ProtocolResult;
use crate::formats::{ascii_field, field_text};

/// Serialized preset length.
pub const PRESET_SIZE: usize = 0x200;

pub const EFFECT_ORDER_OFFSET: usize = 0x00;
pub const EFFECT_ORDER_LEN: usize = 10;
pub const SIZE_FIELD_OFFSET: usize = 0x0A;
pub const NAME_OFFSET: usize = 0x0C;
pub const NAME_LEN: usize = 14;

/// Value of the big-endian size field: everything after the field itself.
pub const DATA_SIZE: u16 = (PRESET_SIZE - SIZE_FIELD_OFFSET - 2) as u16;

const FX_OFFSET: usize = 0x1A;
const OD_OFFSET: usize = 0x27;
const AMP_OFFSET: usize = 0x32;
const CAB_OFFSET: usize = 0x43;
const NS_OFFSET: usize = 0x50;
const EQ_OFFSET: usize = 0x5B;
const MOD_OFFSET: usize = 0x72;
const DELAY_OFFSET: usize = 0x81;
const REVERB_OFFSET: usize = 0x92;

// Modules are packed back to back starting right after the name.
const _: () = {
    assert!(FX_OFFSET == NAME_OFFSET + NAME_LEN);
    assert!(OD_OFFSET == FX_OFFSET + FxModule::SIZE);
    assert!(AMP_OFFSET == OD_OFFSET + OverdriveModule::SIZE);
    assert!(CAB_OFFSET == AMP_OFFSET + AmpModule::SIZE);
    assert!(NS_OFFSET == CAB_OFFSET + CabModule::SIZE);
    assert!(EQ_OFFSET == NS_OFFSET + NoiseGateModule::SIZE);
    assert!(MOD_OFFSET == EQ_OFFSET + EqModule::SIZE);
    assert!(DELAY_OFFSET == MOD_OFFSET + ModulationModule::SIZE);
    assert!(REVERB_OFFSET == DELAY_OFFSET + DelayModule::SIZE);
    assert!(REVERB_OFFSET + ReverbModule::SIZE <= PRESET_SIZE);
};

/// Byte offset of a module record within the preset.
pub(crate) const fn module_offset(kind: ModuleKind) -> usize {
    match kind {
        ModuleKind::Fx => FX_OFFSET,
        ModuleKind::Od => OD_OFFSET,
        ModuleKind::Amp => AMP_OFFSET,
        ModuleKind::Cab => CAB_OFFSET,
        ModuleKind::Ns => NS_OFFSET,
        ModuleKind::Eq => EQ_OFFSET,
        ModuleKind::Mod => MOD_OFFSET,
        ModuleKind::Delay => DELAY_OFFSET,
        ModuleKind::Reverb => REVERB_OFFSET,
    }
}

/// One complete device patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    /// Signal-chain order as module indices (see [`ModuleKind::index`]).
    pub effect_order: [u8; EFFECT_ORDER_LEN],
    pub fx: FxModule,
    pub od: OverdriveModule,
    pub amp: AmpModule,
    pub cab: CabModule,
    pub ns: NoiseGateModule,
    pub eq: EqModule,
    #[serde(rename = "mod")]
    pub modulation: ModulationModule,
    pub delay: DelayModule,
    pub reverb: ReverbModule,
}

impl Default for Preset {
    /// Blank preset with the identity effect order.
    fn default() -> Self {
        Self {
            name: String::new(),
            effect_order: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
            fx: FxModule::default(),
            od: OverdriveModule::default(),
            amp: AmpModule::default(),
            cab: CabModule::default(),
            ns: NoiseGateModule::default(),
            eq: EqModule::default(),
            modulation: ModulationModule::default(),
            delay: DelayModule::default(),
            reverb: ReverbModule::default(),
        }
    }
}

fn write_at(buf: &mut [u8], offset: usize, bytes: &[u8]) {
    for (dst, src) in buf.iter_mut().skip(offset).zip(bytes) {
        *dst = *src;
    }
}

fn tail(data: &[u8], offset: usize) -> &[u8] {
    data.get(offset..).unwrap_or_default()
}

/// ASCII-encode a name into the fixed field. Non-ASCII characters become
/// `?`, anything past [`NAME_LEN`] bytes is dropped.
pub fn encode_name(name: &str) -> [u8; NAME_LEN] {
    ascii_field(name)
}

/// Decode a name field up to the first NUL. Non-ASCII bytes decode to
/// U+FFFD.
pub fn decode_name(field: &[u8]) -> String {
    field_text(field.get(..NAME_LEN).unwrap_or(field))
}

impl Preset {
    /// Serialize to the fixed 512-byte record.
    pub fn to_bytes(&self) -> [u8; PRESET_SIZE] {
        let mut buf = [0u8; PRESET_SIZE];
        write_at(&mut buf, EFFECT_ORDER_OFFSET, &self.effect_order);
        write_at(&mut buf, SIZE_FIELD_OFFSET, &DATA_SIZE.to_be_bytes());
        write_at(&mut buf, NAME_OFFSET, &encode_name(&self.name));
        for kind in ModuleKind::ALL {
            write_at(&mut buf, module_offset(kind), &self.module(kind).to_bytes());
        }
        buf
    }

    /// Deserialize a record. Input shorter than [`PRESET_SIZE`] reads as if
    /// zero-padded; bytes past it are ignored.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut effect_order = [0u8; EFFECT_ORDER_LEN];
        for (dst, src) in effect_order.iter_mut().zip(tail(data, EFFECT_ORDER_OFFSET)) {
            *dst = *src;
        }
        let module = |kind: ModuleKind| tail(data, module_offset(kind));
        Self {
            name: decode_name(tail(data, NAME_OFFSET)),
            effect_order,
            fx: FxModule::from_bytes(module(ModuleKind::Fx)),
            od: OverdriveModule::from_bytes(module(ModuleKind::Od)),
            amp: AmpModule::from_bytes(module(ModuleKind::Amp)),
            cab: CabModule::from_bytes(module(ModuleKind::Cab)),
            ns: NoiseGateModule::from_bytes(module(ModuleKind::Ns)),
            eq: EqModule::from_bytes(module(ModuleKind::Eq)),
            modulation: ModulationModule::from_bytes(module(ModuleKind::Mod)),
            delay: DelayModule::from_bytes(module(ModuleKind::Delay)),
            reverb: ReverbModule::from_bytes(module(ModuleKind::Reverb)),
        }
    }

    /// Copy of one module record as a [`Module`] variant.
    pub fn module(&self, kind: ModuleKind) -> Module {
        match kind {
            ModuleKind::Fx => Module::Fx(self.fx.clone()),
            ModuleKind::Od => Module::Od(self.od.clone()),
            ModuleKind::Amp => Module::Amp(self.amp.clone()),
            ModuleKind::Cab => Module::Cab(self.cab.clone()),
            ModuleKind::Ns => Module::Ns(self.ns.clone()),
            ModuleKind::Eq => Module::Eq(self.eq.clone()),
            ModuleKind::Mod => Module::Mod(self.modulation.clone()),
            ModuleKind::Delay => Module::Delay(self.delay.clone()),
            ModuleKind::Reverb => Module::Reverb(self.reverb.clone()),
        }
    }

    /// Replace the module record matching the variant.
    pub fn set_module(&mut self, module: Module) {
        match module {
            Module::Fx(m) => self.fx = m,
            Module::Od(m) => self.od = m,
            Module::Amp(m) => self.amp = m,
            Module::Cab(m) => self.cab = m,
            Module::Ns(m) => self.ns = m,
            Module::Eq(m) => self.eq = m,
            Module::Mod(m) => self.modulation = m,
            Module::Delay(m) => self.delay = m,
            Module::Reverb(m) => self.reverb = m,
        }
    }

    pub fn param(&self, kind: ModuleKind, name: &str) -> ProtocolResult<u16> {
        self.module(kind).param(name)
    }

    /// Set one parameter in place. The preset is left untouched on error.
    pub fn set_param(&mut self, kind: ModuleKind, name: &str, value: i64) -> ProtocolResult<()> {
        let mut module = self.module(kind);
        module.set_param(name, value)?;
        self.set_module(module);
        Ok(())
    }

    /// Effect order decoded to module kinds, skipping unknown indices.
    pub fn effect_chain(&self) -> Vec<ModuleKind> {
        self.effect_order
            .iter()
            .filter_map(|&index| ModuleKind::from_index(index))
            .collect()
    }

    /// `true` for an unused slot: no name and every module record zeroed.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && ModuleKind::ALL
                .iter()
                .all(|&kind| self.module(kind).to_bytes().iter().all(|&b| b == 0))
    }

    pub fn enabled_modules(&self) -> Vec<ModuleKind> {
        ModuleKind::ALL
            .into_iter()
            .filter(|&kind| self.module(kind).common().enabled)
            .collect()
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "(unnamed)")
        } else {
            write!(f, "{}", self.name)
        }
    }
}
