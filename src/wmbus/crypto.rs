//! AES-128-CTR decryption of the telegram payload
//!
//! The extended link layer encrypts everything after the header. The
//! counter block is assembled from header fields in wire order, so the
//! receiver needs nothing beyond the frame itself and the meter key:
//!
//! ```text
//! byte  0..4   device address (LE, as on the wire)
//! byte  4..6   manufacturer id (LE, as on the wire)
//! byte  6      version
//! byte  7      device type
//! byte  8      access counter
//! byte  9..16  zero filler
//! ```
//!
//! Decryption cannot fail by itself in counter mode, so validity is
//! judged from the plaintext: byte 2 must be a known frame-type marker
//! and the leading CRC16 must match the rest of the payload.

use core::fmt;

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use log::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{
    AES_BLOCK_LEN, AES_KEY_LEN, TPL_CI_COMPACT_FRAME, TPL_CI_FULL_FRAME, WMBUS_HEADER_LEN,
    WMBUS_LINK_CRC_LEN, WMBUS_MIN_CIPHERTEXT_LEN,
};
use crate::error::{DecodeError, MeterError};
use crate::util::hex::{decode_hex, format_hex_compact};
use crate::wmbus::crc::crc16_en13757;
use crate::wmbus::frame::{FrameHeader, WMBusFrame};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// A 128-bit meter key, zeroized when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AesKey {
    key: [u8; AES_KEY_LEN],
}

impl AesKey {
    /// Creates a key from exactly 16 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let key: [u8; AES_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| DecodeError::InvalidKeyLength {
                    expected: AES_KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self { key })
    }

    /// Creates a key from 32 hex characters, as printed on the meter
    /// configuration sheet.
    pub fn from_hex(hex_str: &str) -> Result<Self, MeterError> {
        let bytes = decode_hex(hex_str)?;
        Ok(Self::from_bytes(&bytes)?)
    }

    pub fn as_bytes(&self) -> &[u8; AES_KEY_LEN] {
        &self.key
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keep key material out of logs
        f.write_str("AesKey(****)")
    }
}

/// A validated plaintext payload: CRC, frame-type marker and records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedPayload {
    bytes: Vec<u8>,
}

impl DecryptedPayload {
    /// Whole plaintext, starting with the 2-byte payload CRC.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// CRC16 the meter computed over marker and records.
    pub fn payload_crc(&self) -> u16 {
        u16::from_le_bytes([self.bytes[0], self.bytes[1]])
    }

    /// Frame-type marker, 0x79 compact or 0x78 full.
    pub fn tpl_ci(&self) -> u8 {
        self.bytes[2]
    }

    /// Record bytes after the marker.
    pub fn records(&self) -> &[u8] {
        &self.bytes[3..]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Builds the CTR counter block for a frame from its header fields.
pub fn build_ctr_block(header: &FrameHeader) -> [u8; AES_BLOCK_LEN] {
    let mut block = [0u8; AES_BLOCK_LEN];
    block[0..4].copy_from_slice(&header.device_address.to_le_bytes());
    block[4..6].copy_from_slice(&header.manufacturer_id.to_le_bytes());
    block[6] = header.version;
    block[7] = header.device_type;
    block[8] = header.access_counter;
    // bytes 9..16 stay zero
    block
}

/// Applies the AES-CTR keystream for `header` to a buffer.
///
/// Counter mode is symmetric, so this both encrypts plaintext and
/// decrypts ciphertext. Exposed for building test telegrams.
pub fn apply_keystream(header: &FrameHeader, key: &AesKey, data: &[u8]) -> Vec<u8> {
    let block = build_ctr_block(header);
    let mut buf = data.to_vec();
    let mut cipher = Aes128Ctr::new(key.as_bytes().into(), &block.into());
    cipher.apply_keystream(&mut buf);
    buf
}

/// Decrypts the payload of a parsed frame and validates the plaintext.
///
/// A wrong key turns the plaintext into noise. That surfaces as
/// [`DecodeError::AuthenticationFailed`] when the frame-type marker is
/// not recognized, or as [`DecodeError::PayloadCrcMismatch`] in the
/// rare case the marker byte survives by chance.
pub fn decrypt_payload(frame: &WMBusFrame, key: &AesKey) -> Result<DecryptedPayload, DecodeError> {
    let ciphertext = frame.ciphertext();
    if ciphertext.len() < WMBUS_MIN_CIPHERTEXT_LEN {
        return Err(DecodeError::FrameTooShort {
            needed: WMBUS_HEADER_LEN + WMBUS_MIN_CIPHERTEXT_LEN + WMBUS_LINK_CRC_LEN,
            actual: frame.total_len(),
        });
    }

    let block = build_ctr_block(frame.header());
    debug!("CTR block: {}", format_hex_compact(&block));

    let mut buf = ciphertext.to_vec();
    let mut cipher = Aes128Ctr::new(key.as_bytes().into(), &block.into());
    cipher.apply_keystream(&mut buf);

    let marker = buf[2];
    if !matches!(marker, TPL_CI_FULL_FRAME | TPL_CI_COMPACT_FRAME) {
        warn!("frame-type marker 0x{marker:02x} not recognized, likely a wrong key");
        return Err(DecodeError::AuthenticationFailed { marker });
    }

    let received = u16::from_le_bytes([buf[0], buf[1]]);
    let computed = crc16_en13757(&buf[2..]);
    if received != computed {
        return Err(DecodeError::PayloadCrcMismatch { received, computed });
    }

    debug!("decrypted {} payload bytes, marker 0x{marker:02x}", buf.len());
    Ok(DecryptedPayload { bytes: buf })
}
