//! Error types for telegram decoding
//!
//! `DecodeError` covers everything that can go wrong between raw frame
//! bytes and a finished measurement. The failure modes that strike
//! mid-payload carry the partially decoded measurement so callers can
//! still inspect the value blocks collected before the fault.

use thiserror::Error;

use crate::meter::measurement::MeterMeasurement;

/// Errors raised while decoding a single telegram
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Manufacturer or device type in the header does not match the
    /// configured meter
    #[error("telegram is not from the configured device")]
    NotMyDevice,

    /// Frame ends before the fixed header and trailing CRC fit
    #[error("frame too short: got {actual} bytes, need at least {needed}")]
    FrameTooShort { needed: usize, actual: usize },

    /// L field disagrees with the number of bytes actually present
    #[error("length field mismatch: L implies {declared} bytes, frame has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// AES key material has the wrong size
    #[error("invalid AES key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// First plaintext byte after the payload CRC is not a known
    /// frame-type marker, which indicates a wrong key or corrupted
    /// ciphertext
    #[error("decryption check failed: frame-type marker 0x{marker:02x} is not recognized")]
    AuthenticationFailed { marker: u8 },

    /// Plaintext CRC does not match the CRC computed over the decrypted
    /// payload
    #[error("payload CRC mismatch: received 0x{received:04x}, computed 0x{computed:04x}")]
    PayloadCrcMismatch { received: u16, computed: u16 },

    /// A record declared more data bytes than the payload still holds
    #[error("truncated payload: record needs {needed} more bytes, {remaining} remain")]
    TruncatedPayload {
        needed: usize,
        remaining: usize,
        /// Measurement with the blocks decoded before the fault
        partial: Box<MeterMeasurement>,
    },

    /// Payload structure outside what the meter is known to emit
    #[error("unexpected payload format: {reason}")]
    UnexpectedFormat {
        reason: String,
        /// Measurement with the blocks decoded before the fault
        partial: Box<MeterMeasurement>,
    },
}

impl DecodeError {
    /// Partially decoded measurement attached to payload-level faults,
    /// if any
    pub fn partial_measurement(&self) -> Option<&MeterMeasurement> {
        match self {
            DecodeError::TruncatedPayload { partial, .. } => Some(partial),
            DecodeError::UnexpectedFormat { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Top level error for the library and the command line tool
#[derive(Error, Debug)]
pub enum MeterError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("hex error: {0}")]
    Hex(#[from] crate::util::hex::HexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
