//! # Hex Encoding/Decoding Utilities
//!
//! Hex conversions used for telegram input and log output. Telegrams
//! arrive from capture tools as hex strings, so decoding is the first
//! step of every command line run.
//!
//! ## Usage
//!
//! ```rust
//! use omnipower_rs::util::hex::{decode_hex, encode_hex};
//!
//! let bytes = decode_hex("27 44 2d 2c").unwrap();
//! assert_eq!(bytes, [0x27, 0x44, 0x2d, 0x2c]);
//! assert_eq!(encode_hex(&bytes), "27442d2c");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to a lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Encode bytes to an uppercase hex string
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters.
/// Whitespace is automatically stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    if hex_str.is_empty() {
        return Err(HexError::EmptyString);
    }

    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes as "27 44 2d 2c" with spaces between bytes
///
/// Used for byte dumps in debug logs.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
