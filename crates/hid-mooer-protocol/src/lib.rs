//! Mooer GE150 USB HID protocol: report framing, command builders, response
//! parsing, the 512-byte preset codec and the `.mo` / `.mbf` / `.gnr` file
//! containers.
//!
//! Everything except [`session`] is I/O-free: pure functions over byte
//! buffers that can be tested and fuzzed without hardware. The session layer
//! talks to a device only through the [`HidTransport`] trait; enable the
//! `hidapi` feature for an implementation on `hidapi::HidDevice`.

#![deny(static_mut_refs)]

pub mod commands;
pub mod crc;
pub mod effects;
pub mod error;
pub mod formats;
pub mod frame;
pub mod ids;
pub mod preset;
pub mod response;
pub mod session;
pub mod system;

pub use commands::{
    Command, MAX_IR_SLOT, MAX_SLOT, MAX_VOLUME, SLOT_COUNT, build_cabinet_upload, build_command,
    build_effect_param, build_get_system_settings, build_get_volume, build_identify,
    build_read_preset, build_select_preset, build_set_effect_order, build_set_param,
    build_set_system_setting, build_set_volume, build_store_preset, build_toggle_effect,
};
pub use crc::crc16;
pub use effects::{
    AmpModule, CabModule, DelayModule, EffectModule, EqModule, FxModule, ModulationModule, Module,
    ModuleHeader, ModuleKind, NoiseGateModule, OverdriveModule, ParamSpec, ParamWidth,
    ReverbModule,
};
pub use error::{FormatError, FormatResult, ProtocolError, ProtocolResult};
pub use formats::gnr::{GnrHeader, ir_payload, load_ir_file, parse_gnr_header};
pub use formats::mbf::{MbfBackup, MbfHeader, decode_mbf, encode_mbf, export_mbf, import_mbf};
pub use formats::mo::{decode_mo, encode_mo, export_mo, import_mo};
pub use frame::{
    AssemblyStatus, ChunkAssembler, Frame, HID_REPORT_SIZE, HidReport, MAX_SINGLE_PAYLOAD,
    build_chunked_frames, build_frame, parse_chunked_frames, parse_frame,
};
pub use ids::{GE150_PRODUCT_ID, MOOER_VENDOR_ID, is_control_interface, is_ge150};
pub use preset::{PRESET_SIZE, Preset};
pub use response::{
    ActivePatchResponse, IdentifyResponse, PresetResponse, Response, SystemResponse,
    VolumeResponse, parse_response,
};
pub use session::{
    HidTransport, PresetSummary, PresetUpdate, Session, SessionConfig, SessionError, SessionResult,
    TransportError,
};
#[cfg(feature = "hidapi")]
pub use session::open_ge150;
pub use system::SystemSettings;
