//! Request/response driver over an abstract HID transport.
//!
//! [`Session`] is the explicit context object for talking to one device: it
//! owns the transport, the timing configuration and a cache of presets read
//! or written during the session. Exactly one request is in flight at a
//! time; the session writes the request reports in order and then reads
//! reports until one complete response frame has been reassembled.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::commands::{
    Command, build_cabinet_upload, build_get_system_settings, build_get_volume, build_identify,
    build_read_preset, build_select_preset, build_set_effect_order, build_set_param,
    build_set_system_setting, build_set_volume, build_store_preset, build_toggle_effect,
    check_slot,
};
use crate::effects::ModuleKind;
use crate::error::{FormatError, ProtocolError};
use crate::formats::gnr::load_ir_file;
use crate::formats::mbf::MBF_PRESET_COUNT;
use crate::frame::{AssemblyStatus, ChunkAssembler, Frame, HidReport};
use crate::ids::DEFAULT_READ_TIMEOUT_MS;
use crate::preset::{NAME_LEN, Preset};
use crate::response::{
    IdentifyResponse, PresetResponse, parse_active_patch, parse_identify, parse_preset_response,
    parse_system, parse_volume,
};
use crate::system::SystemSettings;

pub const ENV_READ_TIMEOUT_MS: &str = "MOOER_READ_TIMEOUT_MS";
pub const ENV_INTER_REPORT_DELAY_MS: &str = "MOOER_INTER_REPORT_DELAY_MS";
pub const ENV_MAX_RESPONSE_REPORTS: &str = "MOOER_MAX_RESPONSE_REPORTS";

const DEFAULT_INTER_REPORT_DELAY_MS: u64 = 10;
const DEFAULT_MAX_RESPONSE_REPORTS: usize = 16;

/// Transport-level failure. A read timeout is not an error; see
/// [`HidTransport::read_report`].
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device disconnected")]
    Disconnected,

    #[error("No GE150 control interface found")]
    NotFound,

    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("HID backend error: {0}")]
    Backend(String),
}

/// Raw 64-byte report I/O against one opened device.
pub trait HidTransport {
    /// Send one report.
    fn write_report(&mut self, report: &HidReport) -> Result<(), TransportError>;

    /// Wait up to `timeout` for one report. `Ok(None)` means nothing arrived.
    fn read_report(&mut self, timeout: Duration) -> Result<Option<HidReport>, TransportError>;
}

impl<T: HidTransport + ?Sized> HidTransport for &mut T {
    fn write_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
        (**self).write_report(report)
    }

    fn read_report(&mut self, timeout: Duration) -> Result<Option<HidReport>, TransportError> {
        (**self).read_report(timeout)
    }
}

#[cfg(feature = "hidapi")]
impl HidTransport for hidapi::HidDevice {
    fn write_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
        let written = self
            .write(report)
            .map_err(|err| TransportError::Backend(err.to_string()))?;
        if written < report.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: report.len(),
            });
        }
        Ok(())
    }

    fn read_report(&mut self, timeout: Duration) -> Result<Option<HidReport>, TransportError> {
        let mut report = [0u8; crate::frame::HID_REPORT_SIZE];
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let read = self
            .read_timeout(&mut report, timeout_ms)
            .map_err(|err| TransportError::Backend(err.to_string()))?;
        Ok((read > 0).then_some(report))
    }
}

/// Open the control interface of the first attached GE150.
#[cfg(feature = "hidapi")]
pub fn open_ge150(api: &hidapi::HidApi) -> Result<hidapi::HidDevice, TransportError> {
    let info = api
        .device_list()
        .find(|info| {
            crate::ids::is_control_interface(
                info.vendor_id(),
                info.product_id(),
                info.interface_number(),
            )
        })
        .ok_or(TransportError::NotFound)?;
    debug!(path = ?info.path(), "opening control interface");
    info.open_device(api)
        .map_err(|err| TransportError::Backend(err.to_string()))
}

/// Session timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Timeout for each report read.
    pub read_timeout_ms: u64,
    /// Pause between the reports of a chunked request.
    pub inter_report_delay_ms: u64,
    /// Reports read before giving up on a response.
    pub max_response_reports: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: u64::from(DEFAULT_READ_TIMEOUT_MS),
            inter_report_delay_ms: DEFAULT_INTER_REPORT_DELAY_MS,
            max_response_reports: DEFAULT_MAX_RESPONSE_REPORTS,
        }
    }
}

fn env_override<V: std::str::FromStr>(name: &str, current: V) -> V {
    let Ok(raw) = std::env::var(name) else {
        return current;
    };
    match raw.trim().parse::<V>() {
        Ok(value) => value,
        Err(_parse) => {
            warn!(variable = name, value = %raw, "ignoring unparsable environment override");
            current
        }
    }
}

impl SessionConfig {
    /// Defaults, overridden by `MOOER_READ_TIMEOUT_MS`,
    /// `MOOER_INTER_REPORT_DELAY_MS` and `MOOER_MAX_RESPONSE_REPORTS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            read_timeout_ms: env_override(ENV_READ_TIMEOUT_MS, defaults.read_timeout_ms),
            inter_report_delay_ms: env_override(
                ENV_INTER_REPORT_DELAY_MS,
                defaults.inter_report_delay_ms,
            ),
            max_response_reports: env_override(
                ENV_MAX_RESPONSE_REPORTS,
                defaults.max_response_reports,
            ),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn inter_report_delay(&self) -> Duration {
        Duration::from_millis(self.inter_report_delay_ms)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("No response to {command}")]
    NoResponse { command: Command },

    #[error("Expected a {expected} response, got command {actual:#04X}")]
    UnexpectedResponse { expected: Command, actual: u8 },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Changes merged over an existing preset by [`Session::update_preset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetUpdate {
    pub name: Option<String>,
    /// `(module, parameter, value)` triples, applied in order.
    pub params: Vec<(ModuleKind, String, i64)>,
}

impl PresetUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn param(mut self, module: ModuleKind, param: impl Into<String>, value: i64) -> Self {
        self.params.push((module, param.into(), value));
        self
    }

    /// Apply to `preset`. On error the preset may be partially updated.
    pub fn apply(&self, preset: &mut Preset) -> Result<(), ProtocolError> {
        if let Some(name) = &self.name {
            preset.name = name.chars().take(NAME_LEN).collect();
        }
        for (module, param, value) in &self.params {
            preset.set_param(*module, param, *value)?;
        }
        Ok(())
    }
}

/// Slot overview returned by [`Session::list_presets`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetSummary {
    pub slot: u8,
    pub name: String,
    pub empty: bool,
}

/// One device conversation.
#[derive(Debug)]
pub struct Session<T: HidTransport> {
    transport: T,
    config: SessionConfig,
    cache: BTreeMap<u8, Preset>,
    active_slot: Option<u8>,
}

impl<T: HidTransport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            cache: BTreeMap::new(),
            active_slot: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Slot last selected through this session.
    pub fn active_slot(&self) -> Option<u8> {
        self.active_slot
    }

    pub fn cached_preset(&self, slot: u8) -> Option<&Preset> {
        self.cache.get(&slot)
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }

    fn send(&mut self, reports: &[HidReport]) -> SessionResult<()> {
        let delay = self.config.inter_report_delay();
        for (i, report) in reports.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                std::thread::sleep(delay);
            }
            trace!(index = i, len = report.first().copied(), "writing report");
            self.transport.write_report(report)?;
        }
        Ok(())
    }

    /// Read reports until one complete frame is assembled. Invalid data is
    /// dropped and reassembly starts over with the next report.
    fn receive(&mut self) -> SessionResult<Option<Frame>> {
        let timeout = self.config.read_timeout();
        let mut assembler = ChunkAssembler::new();
        for _ in 0..self.config.max_response_reports {
            let Some(report) = self.transport.read_report(timeout)? else {
                debug!("read timed out");
                return Ok(None);
            };
            match assembler.push(&report) {
                AssemblyStatus::Complete(frame) => {
                    debug!(%frame, reports = assembler.reports_consumed(), "response");
                    return Ok(Some(frame));
                }
                AssemblyStatus::NeedMore => {}
                AssemblyStatus::Invalid => {
                    debug!("discarding invalid response data");
                    assembler.reset();
                }
            }
        }
        warn!(
            max = self.config.max_response_reports,
            "no complete response within report limit"
        );
        Ok(None)
    }

    /// Send a single-report request and wait for the response frame.
    pub fn request(&mut self, report: HidReport) -> SessionResult<Option<Frame>> {
        self.request_chunked(&[report])
    }

    /// Send a multi-report request, in order, and wait for the response.
    pub fn request_chunked(&mut self, reports: &[HidReport]) -> SessionResult<Option<Frame>> {
        debug!(reports = reports.len(), "sending request");
        self.send(reports)?;
        self.receive()
    }

    fn expect_response(&mut self, command: Command, reports: &[HidReport]) -> SessionResult<Frame> {
        let frame = self
            .request_chunked(reports)?
            .ok_or(SessionError::NoResponse { command })?;
        if frame.command != command.as_u8() {
            warn!(expected = %command, actual = frame.command, "unexpected response");
            return Err(SessionError::UnexpectedResponse {
                expected: command,
                actual: frame.command,
            });
        }
        Ok(frame)
    }

    pub fn identify(&mut self) -> SessionResult<IdentifyResponse> {
        let frame = self.expect_response(Command::Identify, &[build_identify()])?;
        parse_identify(&frame).ok_or(SessionError::NoResponse {
            command: Command::Identify,
        })
    }

    fn read_preset_response(&mut self, slot: i64) -> SessionResult<PresetResponse> {
        let frame = self.expect_response(Command::Preset, &[build_read_preset(slot)?])?;
        parse_preset_response(&frame).ok_or(SessionError::NoResponse {
            command: Command::Preset,
        })
    }

    /// Read a preset from the device and cache it.
    pub fn read_preset(&mut self, slot: i64) -> SessionResult<Preset> {
        let slot = check_slot(slot)?;
        let preset = self.read_preset_response(i64::from(slot))?.preset();
        self.cache.insert(slot, preset.clone());
        Ok(preset)
    }

    fn store_bytes(&mut self, slot: u8, record: &[u8]) -> SessionResult<()> {
        let reports = build_store_preset(i64::from(slot), record)?;
        // The device may or may not acknowledge a store.
        if self.request_chunked(&reports)?.is_none() {
            debug!(slot, "store not acknowledged");
        }
        Ok(())
    }

    /// Write a preset to `slot` and cache it.
    pub fn store_preset(&mut self, slot: i64, preset: &Preset) -> SessionResult<()> {
        let slot = check_slot(slot)?;
        self.store_bytes(slot, &preset.to_bytes())?;
        self.cache.insert(slot, preset.clone());
        Ok(())
    }

    /// Merge `update` over the slot's current preset (cached, else read
    /// from the device, else blank) and store the result.
    pub fn update_preset(&mut self, slot: i64, update: &PresetUpdate) -> SessionResult<Preset> {
        let slot = check_slot(slot)?;
        let mut preset = match self.cache.get(&slot) {
            Some(cached) => cached.clone(),
            None => match self.read_preset(i64::from(slot)) {
                Ok(preset) => preset,
                Err(SessionError::NoResponse { .. }) => Preset::default(),
                Err(err) => return Err(err),
            },
        };
        update.apply(&mut preset)?;
        self.store_preset(i64::from(slot), &preset)?;
        Ok(preset)
    }

    /// Switch the active preset. Returns the slot the device reports, or
    /// the requested slot if it does not answer.
    pub fn select_preset(&mut self, slot: i64) -> SessionResult<u8> {
        let requested = check_slot(slot)?;
        let active = self
            .request(build_select_preset(slot)?)?
            .and_then(|frame| parse_active_patch(&frame))
            .map_or(requested, |response| response.slot);
        self.active_slot = Some(active);
        Ok(active)
    }

    pub fn get_volume(&mut self) -> SessionResult<u8> {
        let frame = self.expect_response(Command::Volume, &[build_get_volume()])?;
        parse_volume(&frame)
            .map(|response| response.volume)
            .ok_or(SessionError::NoResponse {
                command: Command::Volume,
            })
    }

    pub fn set_volume(&mut self, volume: i64) -> SessionResult<()> {
        self.send(&[build_set_volume(volume)?])
    }

    pub fn system_settings(&mut self) -> SessionResult<SystemSettings> {
        let frame = self.expect_response(Command::System, &[build_get_system_settings()])?;
        parse_system(&frame)
            .map(|response| response.settings())
            .ok_or(SessionError::NoResponse {
                command: Command::System,
            })
    }

    pub fn set_system_setting(&mut self, index: i64, value: i64) -> SessionResult<()> {
        self.send(&[build_set_system_setting(index, value)?])
    }

    /// Change one parameter of the active preset live. The cached copy of
    /// the active slot, if any, is kept in step. Live edits are not
    /// acknowledged, so nothing is read back.
    pub fn set_effect_param(
        &mut self,
        module: ModuleKind,
        param: &str,
        value: i64,
    ) -> SessionResult<()> {
        self.send(&[build_set_param(module, param, value)?])?;
        if let Some(slot) = self.active_slot
            && let Some(preset) = self.cache.get_mut(&slot)
        {
            preset.set_param(module, param, value)?;
        }
        Ok(())
    }

    pub fn toggle_effect(&mut self, module: ModuleKind, enabled: bool) -> SessionResult<()> {
        self.send(&[build_toggle_effect(module, enabled)])?;
        if let Some(slot) = self.active_slot
            && let Some(preset) = self.cache.get_mut(&slot)
        {
            preset.set_param(module, "enabled", i64::from(enabled))?;
        }
        Ok(())
    }

    pub fn set_effect_order(&mut self, order: &[ModuleKind]) -> SessionResult<()> {
        self.send(&[build_set_effect_order(order)?])
    }

    /// Copy the raw record of `from` into `to`.
    pub fn copy_preset(&mut self, from: i64, to: i64) -> SessionResult<()> {
        let to = check_slot(to)?;
        let source = self.read_preset_response(from)?;
        let record = source.preset_bytes();
        self.store_bytes(to, &record)?;
        self.cache.insert(to, Preset::from_bytes(&record));
        Ok(())
    }

    /// Exchange the records of two slots.
    pub fn swap_presets(&mut self, slot_a: i64, slot_b: i64) -> SessionResult<()> {
        let a = check_slot(slot_a)?;
        let b = check_slot(slot_b)?;
        let record_a = self.read_preset_response(slot_a)?.preset_bytes();
        let record_b = self.read_preset_response(slot_b)?.preset_bytes();
        self.store_bytes(b, &record_a)?;
        self.store_bytes(a, &record_b)?;
        self.cache.insert(b, Preset::from_bytes(&record_a));
        self.cache.insert(a, Preset::from_bytes(&record_b));
        Ok(())
    }

    /// Read every backup slot. Slots that do not answer come back blank.
    pub fn backup_presets(&mut self) -> SessionResult<Vec<Preset>> {
        let mut presets = Vec::with_capacity(MBF_PRESET_COUNT);
        for slot in 0..MBF_PRESET_COUNT {
            let slot = i64::try_from(slot).unwrap_or(i64::MAX);
            match self.read_preset(slot) {
                Ok(preset) => presets.push(preset),
                Err(SessionError::NoResponse { .. }) => {
                    warn!(slot, "no response while backing up; using a blank preset");
                    presets.push(Preset::default());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(presets)
    }

    /// Read slots `start..=end` (either order) and summarize each. Slots
    /// that do not answer are reported empty.
    pub fn list_presets(&mut self, start: i64, end: i64) -> SessionResult<Vec<PresetSummary>> {
        let (start, end) = (check_slot(start)?, check_slot(end)?);
        let (first, last) = (start.min(end), start.max(end));
        let count = usize::from(last.saturating_sub(first)).saturating_add(1);
        let mut summaries = Vec::with_capacity(count);
        for slot in first..=last {
            let summary = match self.read_preset(i64::from(slot)) {
                Ok(preset) => PresetSummary {
                    slot,
                    empty: preset.is_empty(),
                    name: preset.name,
                },
                Err(SessionError::NoResponse { .. }) => {
                    debug!(slot, "no response while listing");
                    PresetSummary {
                        slot,
                        name: String::new(),
                        empty: true,
                    }
                }
                Err(err) => return Err(err),
            };
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// Write `presets` to slots `0..presets.len()`. Without `overwrite`,
    /// slots that already hold a preset on the device are left alone.
    /// Returns the number of slots written.
    pub fn restore_presets(&mut self, presets: &[Preset], overwrite: bool) -> SessionResult<usize> {
        let mut restored = 0usize;
        for (slot, preset) in presets.iter().enumerate() {
            let slot = i64::try_from(slot).unwrap_or(i64::MAX);
            if !overwrite {
                let occupied = match self.read_preset(slot) {
                    Ok(existing) => !existing.is_empty(),
                    Err(SessionError::NoResponse { .. }) => false,
                    Err(err) => return Err(err),
                };
                if occupied {
                    debug!(slot, "slot occupied; skipping");
                    continue;
                }
            }
            self.store_preset(slot, preset)?;
            restored = restored.saturating_add(1);
        }
        Ok(restored)
    }

    /// Upload IR data (already stripped of any `.gnr` header) to a cabinet
    /// slot.
    pub fn upload_ir(&mut self, ir_slot: i64, data: &[u8]) -> SessionResult<()> {
        let reports = build_cabinet_upload(ir_slot, data)?;
        debug!(ir_slot, bytes = data.len(), reports = reports.len(), "uploading IR");
        self.request_chunked(&reports)?;
        Ok(())
    }

    /// Load an IR file (see [`load_ir_file`]) and upload it.
    pub fn upload_ir_file(&mut self, ir_slot: i64, path: &Path) -> SessionResult<usize> {
        let data = load_ir_file(path)?;
        self.upload_ir(ir_slot, &data)?;
        Ok(data.len())
    }
}
