//! CRC16 per EN 13757 for wM-Bus payloads
//!
//! Polynomial 0x3D65, zero initial value, most significant bit first,
//! final complement. Telegrams store the result little endian.

/// Generator polynomial from EN 13757-4
pub const CRC16_EN13757_POLY: u16 = 0x3D65;

/// Computes the EN 13757 CRC16 over `data`.
pub fn crc16_en13757(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ CRC16_EN13757_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc ^ 0xFFFF
}

/// Reads a little endian CRC16 as stored on the wire.
pub fn crc16_from_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}
