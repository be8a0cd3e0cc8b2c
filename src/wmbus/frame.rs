//! wM-Bus frame parsing for C1 meter broadcasts
//!
//! An OmniPower telegram is a type A frame with an extended link layer
//! (CI 0x8D) in front of an AES-CTR encrypted payload:
//!
//! ```text
//! L | C | M (2, LE) | A (4, LE) | version | device type |
//! CI | CC | ACC | SN (4, LE) | ciphertext ... | CRC (2, LE)
//! ```
//!
//! The L field counts every byte after itself except the trailing CRC,
//! so a complete frame holds `L + 3` bytes. Receivers with a USB
//! dongle in between see a recomputed trailing CRC, so it is carried
//! but never validated here.

use log::debug;

use crate::constants::{
    WMBUS_CONTROL_SND_NR, WMBUS_HEADER_LEN, WMBUS_LENGTH_OVERHEAD, WMBUS_LINK_CRC_LEN,
    WMBUS_MIN_FRAME_LEN,
};
use crate::error::DecodeError;
use crate::wmbus::crc::crc16_en13757;
use crate::wmbus::manufacturer::id_to_manufacturer;

/// Fixed 17-byte header of a C1 telegram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// L field: frame length minus itself and the trailing CRC
    pub length: u8,
    /// C field, 0x44 for an unsolicited broadcast
    pub control: u8,
    /// FLAG manufacturer id from the M field
    pub manufacturer_id: u16,
    /// Device address (serial number) from the A field
    pub device_address: u32,
    /// Device generation
    pub version: u8,
    /// Device type, 0x02 for electricity
    pub device_type: u8,
    /// CI field, 0x8D for the encrypted extended link layer
    pub ci_field: u8,
    /// Communication control field
    pub comm_control: u8,
    /// Access counter, increments per transmission
    pub access_counter: u8,
    /// Session number word of the extended link layer
    pub session_number: u32,
}

impl FrameHeader {
    /// 3-letter vendor code decoded from the manufacturer id.
    pub fn manufacturer_code(&self) -> String {
        id_to_manufacturer(self.manufacturer_id)
    }

    /// Encryption method subfield of SN (bits 31 to 29), 1 for AES-CTR.
    pub fn sn_encryption_mode(&self) -> u8 {
        (self.session_number >> 29) as u8 & 0x07
    }

    /// Time subfield of SN (bits 28 to 4).
    pub fn sn_time(&self) -> u32 {
        (self.session_number >> 4) & 0x01FF_FFFF
    }

    /// Session counter subfield of SN (bits 3 to 0).
    pub fn sn_session(&self) -> u8 {
        (self.session_number & 0x0F) as u8
    }
}

/// A parsed telegram: header, undecrypted payload and the carried CRC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WMBusFrame {
    header: FrameHeader,
    ciphertext: Vec<u8>,
    link_crc: u16,
}

impl WMBusFrame {
    /// Parses raw frame bytes as delivered by a capture tool.
    ///
    /// Validates the overall geometry (minimum length and the L field)
    /// and splits the frame into header, ciphertext and trailing CRC.
    /// The ciphertext stays encrypted; see
    /// [`decrypt_payload`](crate::wmbus::crypto::decrypt_payload).
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < WMBUS_MIN_FRAME_LEN {
            return Err(DecodeError::FrameTooShort {
                needed: WMBUS_MIN_FRAME_LEN,
                actual: bytes.len(),
            });
        }

        let declared = bytes[0] as usize + WMBUS_LENGTH_OVERHEAD;
        if declared != bytes.len() {
            return Err(DecodeError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }

        let control = bytes[1];
        if control != WMBUS_CONTROL_SND_NR {
            debug!("unexpected C field 0x{control:02x}, continuing");
        }

        let header = FrameHeader {
            length: bytes[0],
            control,
            manufacturer_id: u16::from_le_bytes([bytes[2], bytes[3]]),
            device_address: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            version: bytes[8],
            device_type: bytes[9],
            ci_field: bytes[10],
            comm_control: bytes[11],
            access_counter: bytes[12],
            session_number: u32::from_le_bytes([bytes[13], bytes[14], bytes[15], bytes[16]]),
        };

        let crc_at = bytes.len() - WMBUS_LINK_CRC_LEN;
        Ok(WMBusFrame {
            header,
            ciphertext: bytes[WMBUS_HEADER_LEN..crc_at].to_vec(),
            link_crc: u16::from_le_bytes([bytes[crc_at], bytes[crc_at + 1]]),
        })
    }

    /// Assembles the on-air byte form of a frame.
    ///
    /// The L field is recomputed from the ciphertext length, and the
    /// trailing CRC is filled with the EN 13757 CRC over the preceding
    /// bytes. Receivers treat that CRC as opaque.
    pub fn build(header: &FrameHeader, ciphertext: &[u8]) -> Vec<u8> {
        let total = WMBUS_HEADER_LEN + ciphertext.len() + WMBUS_LINK_CRC_LEN;
        let mut bytes = Vec::with_capacity(total);

        bytes.push((total - WMBUS_LENGTH_OVERHEAD) as u8);
        bytes.push(header.control);
        bytes.extend_from_slice(&header.manufacturer_id.to_le_bytes());
        bytes.extend_from_slice(&header.device_address.to_le_bytes());
        bytes.push(header.version);
        bytes.push(header.device_type);
        bytes.push(header.ci_field);
        bytes.push(header.comm_control);
        bytes.push(header.access_counter);
        bytes.extend_from_slice(&header.session_number.to_le_bytes());
        bytes.extend_from_slice(ciphertext);

        let crc = crc16_en13757(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn link_crc(&self) -> u16 {
        self.link_crc
    }

    /// Total frame size in bytes, including L and the trailing CRC.
    pub fn total_len(&self) -> usize {
        WMBUS_HEADER_LEN + self.ciphertext.len() + WMBUS_LINK_CRC_LEN
    }
}

/// Identity filter matched against frame headers before any decryption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub manufacturer_id: u16,
    pub device_type: u8,
}

impl DeviceFilter {
    pub const fn new(manufacturer_id: u16, device_type: u8) -> Self {
        Self {
            manufacturer_id,
            device_type,
        }
    }

    /// Filter for Kamstrup electricity meters.
    pub const fn omnipower() -> Self {
        Self::new(
            crate::constants::KAMSTRUP_MANUFACTURER_ID,
            crate::constants::DEVICE_TYPE_ELECTRICITY,
        )
    }

    pub fn matches(&self, header: &FrameHeader) -> bool {
        header.manufacturer_id == self.manufacturer_id && header.device_type == self.device_type
    }

    /// Peeks at the M and device type fields of raw frame bytes.
    ///
    /// Never fails: garbage or truncated input simply does not match.
    pub fn matches_bytes(&self, bytes: &[u8]) -> bool {
        if bytes.len() < 10 {
            return false;
        }
        let manufacturer_id = u16::from_le_bytes([bytes[2], bytes[3]]);
        manufacturer_id == self.manufacturer_id && bytes[9] == self.device_type
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self::omnipower()
    }
}
