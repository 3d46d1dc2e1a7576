//! Effect module records.
//!
//! A preset embeds nine fixed-size module records. Every record starts with
//! the same three bytes (`header`, `enabled`, `type`), continues with its
//! own parameter bytes and ends in reserved padding:
//!
//! | Module | Size | Parameters |
//! |--------|------|------------|
//! | fx     | 13   | q, position, peak, level |
//! | od     | 11   | volume, tone, gain |
//! | amp    | 17   | gain, bass, mid, treble, presence, master |
//! | cab    | 13   | mic, center, distance, tube |
//! | ns     | 11   | attack, release, threshold |
//! | eq     | 23   | 6 bands + 6 extra bands |
//! | mod    | 15   | rate, level, depth, param4, param5 |
//! | delay  | 17   | level, feedback, time_ms (u16 LE), subdivision, param5, param6 |
//! | reverb | 13   | pre_delay, level, decay, tone |
//!
//! Decoding never fails: a short buffer reads as if zero-padded to the
//! record size. Reserved bytes are kept so that a read-modify-write cycle
//! does not clobber device data, but they are not part of the serde view.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::error::{ProtocolError, ProtocolResult, check_u8, check_u16};

/// Length of the common record header.
pub const MODULE_HEADER_SIZE: usize = 3;

/// Byte offset of the `enabled` flag in every record.
pub const ENABLED_PARAM_INDEX: u8 = 1;

/// Copy `data` into a zeroed array, truncating or padding as needed.
pub(crate) fn padded<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    for (dst, src) in out.iter_mut().zip(data) {
        *dst = *src;
    }
    out
}

/// The nine module kinds, in preset order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Fx,
    Od,
    Amp,
    Cab,
    Ns,
    Eq,
    Mod,
    Delay,
    Reverb,
}

impl ModuleKind {
    /// All kinds in preset order.
    pub const ALL: [ModuleKind; 9] = [
        Self::Fx,
        Self::Od,
        Self::Amp,
        Self::Cab,
        Self::Ns,
        Self::Eq,
        Self::Mod,
        Self::Delay,
        Self::Reverb,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Fx => "fx",
            Self::Od => "od",
            Self::Amp => "amp",
            Self::Cab => "cab",
            Self::Ns => "ns",
            Self::Eq => "eq",
            Self::Mod => "mod",
            Self::Delay => "delay",
            Self::Reverb => "reverb",
        }
    }

    /// Index used in the preset's effect-order bytes.
    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Serialized record length.
    pub const fn size(self) -> usize {
        match self {
            Self::Fx => FxModule::SIZE,
            Self::Od => OverdriveModule::SIZE,
            Self::Amp => AmpModule::SIZE,
            Self::Cab => CabModule::SIZE,
            Self::Ns => NoiseGateModule::SIZE,
            Self::Eq => EqModule::SIZE,
            Self::Mod => ModulationModule::SIZE,
            Self::Delay => DelayModule::SIZE,
            Self::Reverb => ReverbModule::SIZE,
        }
    }

    /// Byte offset of the record within a preset.
    pub const fn offset(self) -> usize {
        crate::preset::module_offset(self)
    }

    /// Command used to set one of this module's parameters live.
    pub const fn command(self) -> Command {
        match self {
            Self::Fx => Command::Fx,
            Self::Od => Command::DsOd,
            Self::Amp => Command::Amp,
            Self::Cab => Command::Cab,
            Self::Ns => Command::NsGate,
            Self::Eq => Command::Eq,
            Self::Mod => Command::Mod,
            Self::Delay => Command::Delay,
            Self::Reverb => Command::Reverb,
        }
    }

    /// Ordered parameter table (name → byte offset within the record).
    pub const fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::Fx => FX_PARAMS,
            Self::Od => OD_PARAMS,
            Self::Amp => AMP_PARAMS,
            Self::Cab => CAB_PARAMS,
            Self::Ns => NS_PARAMS,
            Self::Eq => EQ_PARAMS,
            Self::Mod => MOD_PARAMS,
            Self::Delay => DELAY_PARAMS,
            Self::Reverb => REVERB_PARAMS,
        }
    }

    /// Look up a parameter by name. Legacy aliases resolve to their
    /// canonical entry.
    pub fn param(self, name: &str) -> ProtocolResult<&'static ParamSpec> {
        let canonical = PARAM_ALIASES
            .iter()
            .find(|(kind, alias, _)| *kind == self && *alias == name)
            .map_or(name, |(_, _, canonical)| *canonical);
        self.params()
            .iter()
            .find(|spec| spec.name == canonical)
            .ok_or_else(|| ProtocolError::UnknownParameter {
                module: self,
                param: name.to_string(),
            })
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModuleKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| ProtocolError::UnknownModule(s.to_string()))
    }
}

/// Storage width of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamWidth {
    U8,
    /// Two bytes, low byte first.
    U16Le,
}

/// One entry of a module's parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: ParamWidth,
}

impl ParamSpec {
    const fn u8(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            offset,
            width: ParamWidth::U8,
        }
    }

    const fn u16_le(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            offset,
            width: ParamWidth::U16Le,
        }
    }

    /// Largest value the parameter can hold.
    pub const fn max_value(&self) -> u16 {
        match self.width {
            ParamWidth::U8 => u8::MAX as u16,
            ParamWidth::U16Le => u16::MAX,
        }
    }

    /// Read the parameter from a serialized record.
    pub fn read(&self, record: &[u8]) -> u16 {
        let byte = |offset: usize| record.get(offset).copied().unwrap_or(0);
        match self.width {
            ParamWidth::U8 => u16::from(byte(self.offset)),
            ParamWidth::U16Le => {
                u16::from_le_bytes([byte(self.offset), byte(self.offset.saturating_add(1))])
            }
        }
    }

    /// Write `value` into a serialized record after range-checking it.
    pub fn write(&self, record: &mut [u8], value: i64) -> ProtocolResult<()> {
        let bytes: Vec<u8> = match self.width {
            ParamWidth::U8 => vec![check_u8(self.name, value, u8::MAX)?],
            ParamWidth::U16Le => check_u16(self.name, value)?.to_le_bytes().to_vec(),
        };
        for (dst, src) in record.iter_mut().skip(self.offset).zip(bytes) {
            *dst = src;
        }
        Ok(())
    }
}

const FX_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("q", 3),
    ParamSpec::u8("position", 4),
    ParamSpec::u8("peak", 5),
    ParamSpec::u8("level", 6),
];

const OD_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("volume", 3),
    ParamSpec::u8("tone", 4),
    ParamSpec::u8("gain", 5),
];

/// Older parameter names still accepted on input: (module, alias, canonical).
const PARAM_ALIASES: &[(ModuleKind, &str, &str)] = &[(ModuleKind::Amp, "amp_gain", "gain")];

const AMP_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("gain", 3),
    ParamSpec::u8("bass", 4),
    ParamSpec::u8("mid", 5),
    ParamSpec::u8("treble", 6),
    ParamSpec::u8("presence", 7),
    ParamSpec::u8("master", 8),
];

const CAB_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("mic", 3),
    ParamSpec::u8("center", 4),
    ParamSpec::u8("distance", 5),
    ParamSpec::u8("tube", 6),
];

const NS_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("attack", 3),
    ParamSpec::u8("release", 4),
    ParamSpec::u8("threshold", 5),
];

const EQ_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("band_1", 3),
    ParamSpec::u8("band_2", 4),
    ParamSpec::u8("band_3", 5),
    ParamSpec::u8("band_4", 6),
    ParamSpec::u8("band_5", 7),
    ParamSpec::u8("band_6", 8),
    ParamSpec::u8("band_7", 9),
    ParamSpec::u8("band_8", 10),
    ParamSpec::u8("band_9", 11),
    ParamSpec::u8("band_10", 12),
    ParamSpec::u8("band_11", 13),
    ParamSpec::u8("band_12", 14),
];

const MOD_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("rate", 3),
    ParamSpec::u8("level", 4),
    ParamSpec::u8("depth", 5),
    ParamSpec::u8("param4", 6),
    ParamSpec::u8("param5", 7),
];

const DELAY_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("level", 3),
    ParamSpec::u8("feedback", 4),
    ParamSpec::u16_le("time_ms", 5),
    ParamSpec::u8("subdivision", 7),
    ParamSpec::u8("param5", 8),
    ParamSpec::u8("param6", 9),
];

const REVERB_PARAMS: &[ParamSpec] = &[
    ParamSpec::u8("header", 0),
    ParamSpec::u8("enabled", 1),
    ParamSpec::u8("type", 2),
    ParamSpec::u8("pre_delay", 3),
    ParamSpec::u8("level", 4),
    ParamSpec::u8("decay", 5),
    ParamSpec::u8("tone", 6),
];

/// The three bytes every module record starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleHeader {
    pub header: u8,
    pub enabled: bool,
    /// Effect model selector within the module.
    #[serde(rename = "type")]
    pub effect_type: u8,
}

impl ModuleHeader {
    pub fn to_bytes(&self) -> [u8; MODULE_HEADER_SIZE] {
        [self.header, u8::from(self.enabled), self.effect_type]
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let [header, enabled, effect_type] = padded::<MODULE_HEADER_SIZE>(data);
        Self {
            header,
            enabled: enabled != 0,
            effect_type,
        }
    }
}

/// Fixed-size codec shared by all module records.
pub trait EffectModule: Sized + Clone + Default {
    const KIND: ModuleKind;
    const SIZE: usize;

    fn common(&self) -> &ModuleHeader;

    fn common_mut(&mut self) -> &mut ModuleHeader;

    /// Serialize to exactly [`Self::SIZE`] bytes.
    fn to_bytes(&self) -> Vec<u8>;

    /// Deserialize, treating a short buffer as zero-padded.
    fn from_bytes(data: &[u8]) -> Self;

    fn size(&self) -> usize {
        Self::SIZE
    }

    fn is_enabled(&self) -> bool {
        self.common().enabled
    }
}

/// Declares a record whose parameters are all single bytes.
macro_rules! byte_module {
    (
        $(#[$meta:meta])*
        $name:ident: $kind:ident, size = $size:literal, reserved = $reserved:literal,
        [$($field:ident),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(flatten)]
            pub common: ModuleHeader,
            $(pub $field: u8,)+
            #[serde(skip)]
            pub reserved: [u8; $reserved],
        }

        const _: () = assert!(
            MODULE_HEADER_SIZE + [$(stringify!($field)),+].len() + $reserved == $size
        );

        impl EffectModule for $name {
            const KIND: ModuleKind = ModuleKind::$kind;
            const SIZE: usize = $size;

            fn common(&self) -> &ModuleHeader {
                &self.common
            }

            fn common_mut(&mut self) -> &mut ModuleHeader {
                &mut self.common
            }

            fn to_bytes(&self) -> Vec<u8> {
                let mut out = Vec::with_capacity(Self::SIZE);
                out.extend_from_slice(&self.common.to_bytes());
                $(out.push(self.$field);)+
                out.extend_from_slice(&self.reserved);
                out
            }

            fn from_bytes(data: &[u8]) -> Self {
                let raw = padded::<$size>(data);
                let common = ModuleHeader::from_bytes(&raw);
                let mut rest = raw.into_iter().skip(MODULE_HEADER_SIZE);
                $(let $field = rest.next().unwrap_or(0);)+
                let mut reserved = [0u8; $reserved];
                for (dst, src) in reserved.iter_mut().zip(rest) {
                    *dst = src;
                }
                Self {
                    common,
                    $($field,)+
                    reserved,
                }
            }
        }
    };
}

byte_module! {
    /// FX / compressor slot.
    FxModule: Fx, size = 13, reserved = 6, [q, position, peak, level]
}

byte_module! {
    /// Distortion / overdrive slot.
    OverdriveModule: Od, size = 11, reserved = 5, [volume, tone, gain]
}

byte_module! {
    /// Amp model.
    AmpModule: Amp, size = 17, reserved = 8, [gain, bass, mid, treble, presence, master]
}

byte_module! {
    /// Cabinet simulation.
    CabModule: Cab, size = 13, reserved = 6, [mic, center, distance, tube]
}

byte_module! {
    NoiseGateModule: Ns, size = 11, reserved = 5, [attack, release, threshold]
}

byte_module! {
    ModulationModule: Mod, size = 15, reserved = 7, [rate, level, depth, param4, param5]
}

byte_module! {
    ReverbModule: Reverb, size = 13, reserved = 6, [pre_delay, level, decay, tone]
}

/// Number of bands in each EQ group.
pub const EQ_GROUP_LEN: usize = 6;

/// Equalizer: twelve band levels in two groups of six.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqModule {
    #[serde(flatten)]
    pub common: ModuleHeader,
    pub bands: [u8; EQ_GROUP_LEN],
    pub bands_extra: [u8; EQ_GROUP_LEN],
    #[serde(skip)]
    pub reserved: [u8; 8],
}

impl EqModule {
    /// All twelve bands in wire order.
    pub fn all_bands(&self) -> [u8; 2 * EQ_GROUP_LEN] {
        let mut out = [0u8; 2 * EQ_GROUP_LEN];
        for (dst, src) in out
            .iter_mut()
            .zip(self.bands.iter().chain(self.bands_extra.iter()))
        {
            *dst = *src;
        }
        out
    }
}

impl EffectModule for EqModule {
    const KIND: ModuleKind = ModuleKind::Eq;
    const SIZE: usize = 23;

    fn common(&self) -> &ModuleHeader {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ModuleHeader {
        &mut self.common
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.common.to_bytes());
        out.extend_from_slice(&self.bands);
        out.extend_from_slice(&self.bands_extra);
        out.extend_from_slice(&self.reserved);
        out
    }

    fn from_bytes(data: &[u8]) -> Self {
        let raw = padded::<23>(data);
        let (head, rest) = raw.split_at(MODULE_HEADER_SIZE);
        let (bands, rest) = rest.split_at(EQ_GROUP_LEN);
        let (bands_extra, reserved) = rest.split_at(EQ_GROUP_LEN);
        Self {
            common: ModuleHeader::from_bytes(head),
            bands: padded(bands),
            bands_extra: padded(bands_extra),
            reserved: padded(reserved),
        }
    }
}

/// Delay, with a 16-bit little-endian delay time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayModule {
    #[serde(flatten)]
    pub common: ModuleHeader,
    pub level: u8,
    pub feedback: u8,
    pub time_ms: u16,
    pub subdivision: u8,
    pub param5: u8,
    pub param6: u8,
    #[serde(skip)]
    pub reserved: [u8; 7],
}

impl EffectModule for DelayModule {
    const KIND: ModuleKind = ModuleKind::Delay;
    const SIZE: usize = 17;

    fn common(&self) -> &ModuleHeader {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ModuleHeader {
        &mut self.common
    }

    fn to_bytes(&self) -> Vec<u8> {
        let [time_lo, time_hi] = self.time_ms.to_le_bytes();
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.common.to_bytes());
        out.extend_from_slice(&[
            self.level,
            self.feedback,
            time_lo,
            time_hi,
            self.subdivision,
            self.param5,
            self.param6,
        ]);
        out.extend_from_slice(&self.reserved);
        out
    }

    fn from_bytes(data: &[u8]) -> Self {
        let raw = padded::<17>(data);
        let (head, rest) = raw.split_at(MODULE_HEADER_SIZE);
        let (params, reserved) = rest.split_at(7);
        let [level, feedback, time_lo, time_hi, subdivision, param5, param6] = padded::<7>(params);
        Self {
            common: ModuleHeader::from_bytes(head),
            level,
            feedback,
            time_ms: u16::from(time_lo) | (u16::from(time_hi) << 8),
            subdivision,
            param5,
            param6,
            reserved: padded(reserved),
        }
    }
}

/// Any one of the nine module records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "module", rename_all = "lowercase")]
pub enum Module {
    Fx(FxModule),
    Od(OverdriveModule),
    Amp(AmpModule),
    Cab(CabModule),
    Ns(NoiseGateModule),
    Eq(EqModule),
    Mod(ModulationModule),
    Delay(DelayModule),
    Reverb(ReverbModule),
}

impl Module {
    /// Decode a record of the given kind (short input is zero-padded).
    pub fn from_bytes(kind: ModuleKind, data: &[u8]) -> Self {
        match kind {
            ModuleKind::Fx => Self::Fx(FxModule::from_bytes(data)),
            ModuleKind::Od => Self::Od(OverdriveModule::from_bytes(data)),
            ModuleKind::Amp => Self::Amp(AmpModule::from_bytes(data)),
            ModuleKind::Cab => Self::Cab(CabModule::from_bytes(data)),
            ModuleKind::Ns => Self::Ns(NoiseGateModule::from_bytes(data)),
            ModuleKind::Eq => Self::Eq(EqModule::from_bytes(data)),
            ModuleKind::Mod => Self::Mod(ModulationModule::from_bytes(data)),
            ModuleKind::Delay => Self::Delay(DelayModule::from_bytes(data)),
            ModuleKind::Reverb => Self::Reverb(ReverbModule::from_bytes(data)),
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::Fx(_) => ModuleKind::Fx,
            Self::Od(_) => ModuleKind::Od,
            Self::Amp(_) => ModuleKind::Amp,
            Self::Cab(_) => ModuleKind::Cab,
            Self::Ns(_) => ModuleKind::Ns,
            Self::Eq(_) => ModuleKind::Eq,
            Self::Mod(_) => ModuleKind::Mod,
            Self::Delay(_) => ModuleKind::Delay,
            Self::Reverb(_) => ModuleKind::Reverb,
        }
    }

    pub fn size(&self) -> usize {
        self.kind().size()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Fx(m) => m.to_bytes(),
            Self::Od(m) => m.to_bytes(),
            Self::Amp(m) => m.to_bytes(),
            Self::Cab(m) => m.to_bytes(),
            Self::Ns(m) => m.to_bytes(),
            Self::Eq(m) => m.to_bytes(),
            Self::Mod(m) => m.to_bytes(),
            Self::Delay(m) => m.to_bytes(),
            Self::Reverb(m) => m.to_bytes(),
        }
    }

    pub fn common(&self) -> &ModuleHeader {
        match self {
            Self::Fx(m) => &m.common,
            Self::Od(m) => &m.common,
            Self::Amp(m) => &m.common,
            Self::Cab(m) => &m.common,
            Self::Ns(m) => &m.common,
            Self::Eq(m) => &m.common,
            Self::Mod(m) => &m.common,
            Self::Delay(m) => &m.common,
            Self::Reverb(m) => &m.common,
        }
    }

    /// Read a parameter by name through the module's parameter table.
    pub fn param(&self, name: &str) -> ProtocolResult<u16> {
        let spec = self.kind().param(name)?;
        Ok(spec.read(&self.to_bytes()))
    }

    /// Set a parameter by name, validating the value against its width.
    pub fn set_param(&mut self, name: &str, value: i64) -> ProtocolResult<()> {
        let kind = self.kind();
        let spec = kind.param(name)?;
        let mut record = self.to_bytes();
        spec.write(&mut record, value)?;
        *self = Self::from_bytes(kind, &record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_record_sizes() {
        let sizes: Vec<usize> = ModuleKind::ALL.iter().map(|k| k.size()).collect();
        assert_eq!(sizes, vec![13, 11, 17, 13, 11, 23, 15, 17, 13]);
        for kind in ModuleKind::ALL {
            assert_eq!(Module::from_bytes(kind, &[]).to_bytes().len(), kind.size());
        }
    }

    #[test]
    fn test_module_names_roundtrip() -> TestResult {
        for kind in ModuleKind::ALL {
            assert_eq!(kind.name().parse::<ModuleKind>()?, kind);
            assert_eq!(ModuleKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(" AMP ".parse::<ModuleKind>()?, ModuleKind::Amp);
        assert!(matches!(
            "chorus".parse::<ModuleKind>(),
            Err(ProtocolError::UnknownModule(name)) if name == "chorus"
        ));
        assert_eq!(ModuleKind::from_index(9), None);
        Ok(())
    }

    #[test]
    fn test_module_commands() {
        assert_eq!(ModuleKind::Fx.command() as u8, 0x90);
        assert_eq!(ModuleKind::Od.command() as u8, 0x91);
        assert_eq!(ModuleKind::Amp.command() as u8, 0x93);
        assert_eq!(ModuleKind::Reverb.command() as u8, 0x99);
    }

    #[test]
    fn test_param_tables_fit_records() {
        for kind in ModuleKind::ALL {
            let params = kind.params();
            assert_eq!(params[0].name, "header");
            assert_eq!(params[1].offset, usize::from(ENABLED_PARAM_INDEX));
            for spec in params {
                let width = match spec.width {
                    ParamWidth::U8 => 1,
                    ParamWidth::U16Le => 2,
                };
                assert!(spec.offset + width <= kind.size(), "{kind}.{}", spec.name);
            }
        }
    }

    #[test]
    fn test_param_alias() -> TestResult {
        let spec = ModuleKind::Amp.param("amp_gain")?;
        assert_eq!(spec.name, "gain");
        assert_eq!(spec.offset, 3);

        let mut amp = Module::from_bytes(ModuleKind::Amp, &[]);
        amp.set_param("amp_gain", 140)?;
        assert_eq!(amp.param("gain")?, 140);

        assert!(matches!(
            ModuleKind::Od.param("amp_gain"),
            Err(ProtocolError::UnknownParameter { module: ModuleKind::Od, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_header_decoding() {
        let header = ModuleHeader::from_bytes(&[0x11, 0x02, 0x07]);
        assert_eq!(header.header, 0x11);
        assert!(header.enabled);
        assert_eq!(header.effect_type, 0x07);
        assert_eq!(header.to_bytes(), [0x11, 0x01, 0x07]);
    }

    #[test]
    fn test_amp_layout() {
        let amp = AmpModule {
            common: ModuleHeader {
                header: 1,
                enabled: true,
                effect_type: 5,
            },
            gain: 128,
            bass: 10,
            mid: 20,
            treble: 30,
            presence: 40,
            master: 50,
            reserved: [0; 8],
        };
        let bytes = amp.to_bytes();
        assert_eq!(&bytes[..9], &[1, 1, 5, 128, 10, 20, 30, 40, 50]);
        assert_eq!(AmpModule::from_bytes(&bytes), amp);
    }

    #[test]
    fn test_short_buffer_is_zero_padded() {
        let od = OverdriveModule::from_bytes(&[0, 1, 3, 99]);
        assert!(od.common.enabled);
        assert_eq!(od.common.effect_type, 3);
        assert_eq!(od.volume, 99);
        assert_eq!(od.tone, 0);
        assert_eq!(od.gain, 0);
    }

    #[test]
    fn test_delay_time_split() {
        let delay = DelayModule {
            time_ms: 0x1234,
            ..Default::default()
        };
        let bytes = delay.to_bytes();
        assert_eq!(bytes[5], 0x34);
        assert_eq!(bytes[6], 0x12);
        assert_eq!(DelayModule::from_bytes(&bytes).time_ms, 0x1234);

        let max = DelayModule {
            time_ms: u16::MAX,
            ..Default::default()
        };
        assert_eq!(DelayModule::from_bytes(&max.to_bytes()).time_ms, u16::MAX);
    }

    #[test]
    fn test_eq_groups() {
        let eq = EqModule {
            bands: [1, 2, 3, 4, 5, 6],
            bands_extra: [7, 8, 9, 10, 11, 12],
            ..Default::default()
        };
        let bytes = eq.to_bytes();
        assert_eq!(&bytes[3..15], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(eq.all_bands(), [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(EqModule::from_bytes(&bytes), eq);
    }

    #[test]
    fn test_reserved_bytes_survive() {
        let mut raw = [0u8; 13];
        raw[12] = 0xEE;
        let fx = FxModule::from_bytes(&raw);
        assert_eq!(fx.reserved[5], 0xEE);
        assert_eq!(fx.to_bytes(), raw.to_vec());
    }

    #[test]
    fn test_param_by_name() -> TestResult {
        let mut module = Module::from_bytes(ModuleKind::Delay, &[]);
        module.set_param("time_ms", 1500)?;
        module.set_param("feedback", 77)?;
        module.set_param("enabled", 1)?;
        assert_eq!(module.param("time_ms")?, 1500);
        let Module::Delay(delay) = &module else {
            return Err("expected delay".into());
        };
        assert_eq!(delay.time_ms, 1500);
        assert_eq!(delay.feedback, 77);
        assert!(delay.common.enabled);
        Ok(())
    }

    #[test]
    fn test_param_validation() {
        let mut module = Module::from_bytes(ModuleKind::Amp, &[]);
        assert!(matches!(
            module.set_param("gain", 256),
            Err(ProtocolError::OutOfRange { field: "gain", .. })
        ));
        assert!(matches!(
            module.set_param("gain", -1),
            Err(ProtocolError::OutOfRange { .. })
        ));
        assert!(matches!(
            module.set_param("warmth", 1),
            Err(ProtocolError::UnknownParameter { module: ModuleKind::Amp, .. })
        ));
        let mut delay = Module::from_bytes(ModuleKind::Delay, &[]);
        assert!(matches!(
            delay.set_param("time_ms", 65_536),
            Err(ProtocolError::OutOfRange { max: 65_535, .. })
        ));
    }

    #[test]
    fn test_eq_band_params_address_both_groups() -> TestResult {
        let mut module = Module::from_bytes(ModuleKind::Eq, &[]);
        module.set_param("band_1", 10)?;
        module.set_param("band_12", 20)?;
        let Module::Eq(eq) = &module else {
            return Err("expected eq".into());
        };
        assert_eq!(eq.bands[0], 10);
        assert_eq!(eq.bands_extra[5], 20);
        Ok(())
    }

    #[test]
    fn test_serde_view_uses_type_key() -> TestResult {
        let cab = CabModule {
            common: ModuleHeader {
                header: 0,
                enabled: true,
                effect_type: 4,
            },
            mic: 1,
            ..Default::default()
        };
        let value = serde_json::to_value(&cab)?;
        assert_eq!(value["type"], 4);
        assert_eq!(value["enabled"], true);
        assert_eq!(value["mic"], 1);
        assert!(value.get("reserved").is_none());
        Ok(())
    }
}
