//! 64-byte HID report framing.
//!
//! ```text
//! +-----+---------+---------+---------+-------------+----------+---------+
//! | len | AA 55   | size    | command | payload     | checksum | padding |
//! | 1 B | 2 bytes | u16 LE  | 1 byte  | size - 1 B  | u16 LE   | to 64 B |
//! +-----+---------+---------+---------+-------------+----------+---------+
//! ```
//!
//! `len` counts the meaningful bytes after itself, `size` counts the command
//! byte plus payload, and the checksum covers exactly those `size` bytes.
//!
//! A message whose encoding does not fit the 63 data bytes of one report is
//! cut into consecutive chunks. Every chunk report is `[chunk_len] ++ chunk`
//! zero-padded to 64 bytes, and the receiver concatenates the chunks in
//! arrival order. There are no sequence numbers: a dropped or reordered chunk
//! surfaces as a preamble or checksum mismatch.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::crc::crc16;
use crate::error::{ProtocolError, ProtocolResult};

/// Message preamble.
pub const PREAMBLE: [u8; 2] = [0xAA, 0x55];

/// Size of every HID report on the wire.
pub const HID_REPORT_SIZE: usize = 64;

/// Bytes available after the one-byte length prefix of a report.
pub const REPORT_DATA_SIZE: usize = HID_REPORT_SIZE - 1;

/// Preamble, size field, command byte and checksum.
pub const FRAME_OVERHEAD: usize = 7;

/// Largest payload that still fits a single report.
pub const MAX_SINGLE_PAYLOAD: usize = REPORT_DATA_SIZE - FRAME_OVERHEAD;

/// Largest payload the 16-bit size field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize - 1;

/// Shortest report [`parse_frame`] will look at.
pub const MIN_REPORT_LEN: usize = 8;

const SIZE_OFFSET: usize = 2;
const BODY_OFFSET: usize = 4;

/// One raw HID report.
pub type HidReport = [u8; HID_REPORT_SIZE];

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub command: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(command: u8, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(command={:#04X}, payload=", self.command)?;
        if self.payload.is_empty() {
            return f.write_str("(empty))");
        }
        for (i, byte) in self.payload.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        f.write_str(")")
    }
}

/// Encode `preamble | size | command | payload | checksum` without any
/// report prefix or padding.
pub fn encode_message(command: u8, payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge {
            max: MAX_PAYLOAD,
            actual: payload.len(),
        });
    }

    let size = u16::try_from(payload.len().saturating_add(1)).map_err(|_overflow| {
        ProtocolError::PayloadTooLarge {
            max: MAX_PAYLOAD,
            actual: payload.len(),
        }
    })?;
    Ok(assemble(command, payload, size))
}

fn assemble(command: u8, payload: &[u8], size: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len().saturating_add(1));
    body.push(command);
    body.extend_from_slice(payload);

    let mut message = Vec::with_capacity(body.len().saturating_add(6));
    message.extend_from_slice(&PREAMBLE);
    message.extend_from_slice(&size.to_le_bytes());
    message.extend_from_slice(&body);
    message.extend_from_slice(&crc16(&body).to_le_bytes());
    message
}

/// Place `data` after a one-byte length prefix and zero-pad to 64 bytes.
fn to_report(data: &[u8]) -> HidReport {
    let mut report = [0u8; HID_REPORT_SIZE];
    report[0] = u8::try_from(data.len()).unwrap_or(u8::MAX);
    for (dst, src) in report.iter_mut().skip(1).zip(data) {
        *dst = *src;
    }
    report
}

/// Build a single report carrying one complete message.
///
/// Payloads longer than [`MAX_SINGLE_PAYLOAD`] need
/// [`build_chunked_frames`] and are rejected here.
pub fn build_frame(command: u8, payload: &[u8]) -> ProtocolResult<HidReport> {
    if payload.len() > MAX_SINGLE_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge {
            max: MAX_SINGLE_PAYLOAD,
            actual: payload.len(),
        });
    }
    let message = encode_message(command, payload)?;
    Ok(to_report(&message))
}

/// Build a single report for a payload whose size is known to fit at
/// compile time. Used by the fixed-shape command builders.
pub fn build_fixed_frame<const N: usize>(command: u8, payload: [u8; N]) -> HidReport {
    const { assert!(N <= MAX_SINGLE_PAYLOAD) };
    let size = u16::try_from(N + 1).unwrap_or(u16::MAX);
    to_report(&assemble(command, &payload, size))
}

/// Build the report sequence for a message of any size.
///
/// Messages that fit one report produce exactly the output of
/// [`build_frame`]. Larger messages are cut into 63-byte chunks; order is
/// significant.
pub fn build_chunked_frames(command: u8, payload: &[u8]) -> ProtocolResult<Vec<HidReport>> {
    let message = encode_message(command, payload)?;
    if message.len() <= REPORT_DATA_SIZE {
        return Ok(vec![to_report(&message)]);
    }
    Ok(message.chunks(REPORT_DATA_SIZE).map(to_report).collect())
}

/// The meaningful bytes of one report, as declared by its first byte.
///
/// A declared length longer than the report is clamped to what is there.
pub fn report_chunk(report: &[u8]) -> &[u8] {
    let Some((&declared, rest)) = report.split_first() else {
        return &[];
    };
    rest.get(..usize::from(declared)).unwrap_or(rest)
}

fn read_body_size(message: &[u8]) -> Option<usize> {
    match message.get(SIZE_OFFSET..BODY_OFFSET)? {
        [lo, hi] => Some(usize::from(u16::from_le_bytes([*lo, *hi]))),
        _ => None,
    }
}

/// Validate and decode an unprefixed message (preamble first).
fn parse_message(message: &[u8]) -> Option<Frame> {
    if message.get(..SIZE_OFFSET) != Some(PREAMBLE.as_slice()) {
        trace!("frame rejected: bad preamble");
        return None;
    }

    let body_size = read_body_size(message)?;
    if body_size < 1 {
        trace!("frame rejected: empty body");
        return None;
    }

    let body_end = BODY_OFFSET.checked_add(body_size)?;
    let Some(body) = message.get(BODY_OFFSET..body_end) else {
        trace!(body_size, available = message.len(), "frame rejected: truncated body");
        return None;
    };
    let expected = match message.get(body_end..body_end.checked_add(2)?) {
        Some([lo, hi]) => u16::from_le_bytes([*lo, *hi]),
        _ => {
            trace!("frame rejected: missing checksum");
            return None;
        }
    };

    let actual = crc16(body);
    if actual != expected {
        trace!(expected, actual, "frame rejected: checksum mismatch");
        return None;
    }

    let (&command, payload) = body.split_first()?;
    Some(Frame::new(command, payload.to_vec()))
}

/// Decode a single report.
///
/// Returns `None` for anything that is not a complete, checksum-valid
/// message. That is expected noise on the interrupt pipe, not an error.
pub fn parse_frame(report: &[u8]) -> Option<Frame> {
    if report.len() < MIN_REPORT_LEN {
        trace!(len = report.len(), "frame rejected: short report");
        return None;
    }
    let declared = usize::from(*report.first()?);
    if declared < FRAME_OVERHEAD {
        trace!(declared, "frame rejected: declared length too small");
        return None;
    }
    parse_message(report.get(1..)?)
}

/// Reassemble a chunked message from its reports, in emission order, and
/// decode it with the same checks as [`parse_frame`].
pub fn parse_chunked_frames<R: AsRef<[u8]>>(reports: &[R]) -> Option<Frame> {
    let assembled: Vec<u8> = reports
        .iter()
        .flat_map(|report| report_chunk(report.as_ref()).iter().copied())
        .collect();
    if assembled.len() < FRAME_OVERHEAD {
        trace!(len = assembled.len(), "chunked frame rejected: too short");
        return None;
    }
    parse_message(&assembled)
}

/// Progress of a [`ChunkAssembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyStatus {
    /// The declared message is not complete yet.
    NeedMore,
    /// The message is complete and valid.
    Complete(Frame),
    /// The accumulated bytes can never form a valid message.
    Invalid,
}

/// Incremental reassembly for responses read one report at a time.
///
/// Unlike [`parse_chunked_frames`] the caller does not need to know the
/// report count up front: the size field tells the assembler when to stop.
#[derive(Debug, Default, Clone)]
pub struct ChunkAssembler {
    buffer: Vec<u8>,
    reports: usize,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next report.
    pub fn push(&mut self, report: &[u8]) -> AssemblyStatus {
        self.buffer.extend_from_slice(report_chunk(report));
        self.reports = self.reports.saturating_add(1);

        if let Some(lead) = self.buffer.get(..SIZE_OFFSET)
            && lead != PREAMBLE.as_slice()
        {
            return AssemblyStatus::Invalid;
        }
        let Some(body_size) = read_body_size(&self.buffer) else {
            return AssemblyStatus::NeedMore;
        };
        if body_size == 0 {
            return AssemblyStatus::Invalid;
        }
        let total = BODY_OFFSET.saturating_add(body_size).saturating_add(2);
        if self.buffer.len() < total {
            return AssemblyStatus::NeedMore;
        }
        match parse_message(&self.buffer) {
            Some(frame) => AssemblyStatus::Complete(frame),
            None => AssemblyStatus::Invalid,
        }
    }

    /// Number of reports consumed since the last reset.
    pub fn reports_consumed(&self) -> usize {
        self.reports
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.reports = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_select_preset_layout() -> TestResult {
        let report = build_frame(0xA6, &[0x02])?;
        assert_eq!(report.len(), HID_REPORT_SIZE);
        assert_eq!(
            &report[..9],
            &[0x08, 0xAA, 0x55, 0x02, 0x00, 0xA6, 0x02, 0x65, 0x68]
        );
        assert!(report[9..].iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_roundtrip_empty_payload() -> TestResult {
        let report = build_frame(0x10, &[])?;
        assert_eq!(report[0], 7);
        assert_eq!(parse_frame(&report), Some(Frame::new(0x10, Vec::new())));
        Ok(())
    }

    #[test]
    fn test_largest_single_payload() -> TestResult {
        let payload: Vec<u8> = (0..MAX_SINGLE_PAYLOAD as u8).collect();
        let report = build_frame(0x83, &payload)?;
        assert_eq!(report[0] as usize, REPORT_DATA_SIZE);
        assert_eq!(parse_frame(&report), Some(Frame::new(0x83, payload)));
        Ok(())
    }

    #[test]
    fn test_oversized_single_payload_rejected() {
        let payload = [0u8; MAX_SINGLE_PAYLOAD + 1];
        assert!(matches!(
            build_frame(0x83, &payload),
            Err(ProtocolError::PayloadTooLarge { max: 56, actual: 57 })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_preamble() {
        let mut bad = [0u8; HID_REPORT_SIZE];
        bad[0] = 8;
        bad[1] = 0xBB;
        bad[2] = 0x55;
        assert_eq!(parse_frame(&bad), None);
    }

    #[test]
    fn test_parse_rejects_bad_checksum() -> TestResult {
        let mut report = build_frame(0xA6, &[0x02])?;
        report[7] = 0;
        report[8] = 0;
        assert_eq!(parse_frame(&report), None);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_short_report_and_small_length() -> TestResult {
        let report = build_frame(0xA6, &[0x02])?;
        assert_eq!(parse_frame(&report[..7]), None);

        let mut low = report;
        low[0] = 6;
        assert_eq!(parse_frame(&low), None);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_zero_body_size() {
        let mut report = [0u8; HID_REPORT_SIZE];
        report[..5].copy_from_slice(&[0x07, 0xAA, 0x55, 0x00, 0x00]);
        assert_eq!(parse_frame(&report), None);
    }

    #[test]
    fn test_parse_rejects_body_size_past_report_end() {
        let mut report = [0u8; HID_REPORT_SIZE];
        report[..5].copy_from_slice(&[0x3F, 0xAA, 0x55, 0xFF, 0x00]);
        assert_eq!(parse_frame(&report), None);
    }

    #[test]
    fn test_chunked_small_message_matches_single() -> TestResult {
        let single = build_frame(0xA6, &[0x02])?;
        let chunked = build_chunked_frames(0xA6, &[0x02])?;
        assert_eq!(chunked, vec![single]);
        Ok(())
    }

    #[test]
    fn test_chunked_large_message() -> TestResult {
        let payload: Vec<u8> = (0..200u8).collect();
        let reports = build_chunked_frames(0x83, &payload)?;
        // 207 message bytes -> 63 + 63 + 63 + 18
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0][0], 63);
        assert_eq!(reports[3][0], 18);
        assert!(reports[3][19..].iter().all(|&b| b == 0));
        assert_eq!(
            parse_chunked_frames(&reports),
            Some(Frame::new(0x83, payload))
        );
        Ok(())
    }

    #[test]
    fn test_chunked_reordered_is_rejected() -> TestResult {
        let payload: Vec<u8> = (0..200u8).collect();
        let mut reports = build_chunked_frames(0x83, &payload)?;
        reports.swap(1, 2);
        assert_eq!(parse_chunked_frames(&reports), None);
        Ok(())
    }

    #[test]
    fn test_chunked_dropped_chunk_is_rejected() -> TestResult {
        let payload: Vec<u8> = (0..200u8).collect();
        let mut reports = build_chunked_frames(0x83, &payload)?;
        reports.remove(1);
        assert_eq!(parse_chunked_frames(&reports), None);
        Ok(())
    }

    #[test]
    fn test_parse_chunked_empty() {
        let reports: Vec<HidReport> = Vec::new();
        assert_eq!(parse_chunked_frames(&reports), None);
    }

    #[test]
    fn test_assembler_stops_at_declared_size() -> TestResult {
        let payload: Vec<u8> = (0..=255u8).cycle().take(513).collect();
        let reports = build_chunked_frames(0x83, &payload)?;
        let mut assembler = ChunkAssembler::new();
        let mut outcome = AssemblyStatus::NeedMore;
        for report in &reports {
            outcome = assembler.push(report);
            if outcome != AssemblyStatus::NeedMore {
                break;
            }
        }
        assert_eq!(outcome, AssemblyStatus::Complete(Frame::new(0x83, payload)));
        assert_eq!(assembler.reports_consumed(), reports.len());
        Ok(())
    }

    #[test]
    fn test_assembler_single_report() -> TestResult {
        let report = build_frame(0xA2, &[50])?;
        let mut assembler = ChunkAssembler::new();
        assert_eq!(
            assembler.push(&report),
            AssemblyStatus::Complete(Frame::new(0xA2, vec![50]))
        );
        Ok(())
    }

    #[test]
    fn test_assembler_rejects_garbage_early() {
        let mut report = [0u8; HID_REPORT_SIZE];
        report[..3].copy_from_slice(&[0x02, 0x12, 0x34]);
        let mut assembler = ChunkAssembler::new();
        assert_eq!(assembler.push(&report), AssemblyStatus::Invalid);
        assembler.reset();
        assert!(assembler.is_empty());
        assert_eq!(assembler.reports_consumed(), 0);
    }

    #[test]
    fn test_report_chunk_clamps_declared_length() {
        let report = [10u8, 1, 2, 3];
        assert_eq!(report_chunk(&report), &[1, 2, 3]);
        assert_eq!(report_chunk(&[]), &[] as &[u8]);
    }

    #[test]
    fn test_frame_display() {
        let frame = Frame::new(0xA6, vec![0x02]);
        assert_eq!(frame.to_string(), "Frame(command=0xA6, payload=02)");
        assert_eq!(
            Frame::new(0x10, Vec::new()).to_string(),
            "Frame(command=0x10, payload=(empty))"
        );
    }
}
