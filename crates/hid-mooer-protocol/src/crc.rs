//! 16-bit frame checksum.
//!
//! The device and its desktop editor protect every frame with a CRC-16 using
//! the CCITT polynomial (`0x1021`, MSB-first lookup table), a zero register
//! and an inverted result. This is the catalogued CRC-16/GSM variant. The
//! inversion is why the checksum of an empty body is `0xFFFF`.
//!
//! Reference vectors captured from device traffic:
//!
//! | Input        | Checksum |
//! |--------------|----------|
//! | *(empty)*    | `0xFFFF` |
//! | `A6 02`      | `0x6865` |

/// Generator polynomial (CCITT).
pub const CRC16_POLY: u16 = 0x1021;

/// Lookup table for [`CRC16_POLY`], one entry per leading byte.
pub static CRC16_TABLE: [u16; 256] = build_table();

#[expect(
    clippy::indexing_slicing,
    reason = "const construction; the loop index never reaches 256"
)]
const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the frame checksum over `data` (command byte followed by payload).
pub fn crc16(data: &[u8]) -> u16 {
    let crc = data.iter().fold(0u16, |crc, &byte| {
        let index = usize::from((crc >> 8) as u8 ^ byte);
        (crc << 8) ^ CRC16_TABLE.get(index).copied().unwrap_or(0)
    });
    !crc
}

/// Checksum as the two little-endian trailer bytes written after the body.
pub fn crc16_le_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}
