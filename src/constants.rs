//! Wireless M-Bus Protocol Constants
//!
//! This module defines constants used for wireless M-Bus (EN 13757-4)
//! telegrams and the EN 13757-3 data record layer.

/// DIF (Data Information Field) mask for the data width class
pub const MBUS_DATA_RECORD_DIF_MASK_DATA: u8 = 0x0F;

/// DIF extension bit (a DIFE byte follows)
pub const MBUS_DIB_DIF_EXTENSION_BIT: u8 = 0x80;

/// DIF idle filler
pub const MBUS_DIB_DIF_IDLE_FILLER: u8 = 0x2F;

/// DIF manufacturer specific
pub const MBUS_DIB_DIF_MANUFACTURER_SPECIFIC: u8 = 0x0F;

/// DIF more records follow
pub const MBUS_DIB_DIF_MORE_RECORDS_FOLLOW: u8 = 0x1F;

/// VIF without extension
pub const MBUS_DIB_VIF_WITHOUT_EXTENSION: u8 = 0x7F;

/// VIF extension bit (a VIFE byte follows)
pub const MBUS_DIB_VIF_EXTENSION_BIT: u8 = 0x80;

/// Primary VIF reserved for manufacturer specific codings
pub const MBUS_VIF_MANUFACTURER_SPECIFIC: u8 = 0x7F;

/// Combinable VIFE code for accumulation of backward flow
pub const MBUS_VIFE_BACKWARD_FLOW: u8 = 0x3C;

/// Upper bound on a DIFE/VIFE extension chain per EN 13757-3
pub const MBUS_MAX_EXTENSION_BYTES: usize = 10;

// ----------------------------------------------------------------------------
// wM-Bus link layer constants
// ----------------------------------------------------------------------------

/// C field of an unsolicited meter broadcast (SND-NR)
pub const WMBUS_CONTROL_SND_NR: u8 = 0x44;

/// CI field announcing an extended link layer with an AES-CTR payload
pub const WMBUS_CI_ELL_ENCRYPTED: u8 = 0x8D;

/// Fixed header length in bytes: L, C, M, A, version, device type,
/// CI, CC, ACC and SN
pub const WMBUS_HEADER_LEN: usize = 17;

/// Trailing link layer CRC length in bytes
pub const WMBUS_LINK_CRC_LEN: usize = 2;

/// Frame bytes the L field does not count (L itself plus the trailing CRC)
pub const WMBUS_LENGTH_OVERHEAD: usize = 3;

/// Smallest parseable frame: full header plus the trailing CRC
pub const WMBUS_MIN_FRAME_LEN: usize = WMBUS_HEADER_LEN + WMBUS_LINK_CRC_LEN;

/// Smallest ciphertext that carries the payload CRC and the frame-type marker
pub const WMBUS_MIN_CIPHERTEXT_LEN: usize = 3;

// ----------------------------------------------------------------------------
// Transport layer constants
// ----------------------------------------------------------------------------

/// TPL CI of a full frame with self-describing records
pub const TPL_CI_FULL_FRAME: u8 = 0x78;

/// TPL CI of a compact frame with a fixed register bank
pub const TPL_CI_COMPACT_FRAME: u8 = 0x79;

/// AES-128 key length in bytes
pub const AES_KEY_LEN: usize = 16;

/// AES block and counter block length in bytes
pub const AES_BLOCK_LEN: usize = 16;

// ----------------------------------------------------------------------------
// Device identity constants
// ----------------------------------------------------------------------------

/// FLAG manufacturer id of Kamstrup A/S ("KAM")
pub const KAMSTRUP_MANUFACTURER_ID: u16 = 0x2C2D;

/// wM-Bus device type of an electricity meter
pub const DEVICE_TYPE_ELECTRICITY: u8 = 0x02;
