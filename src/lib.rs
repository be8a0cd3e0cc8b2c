//! # omnipower-rs
//!
//! Decoder for encrypted wireless M-Bus telegrams from Kamstrup
//! OmniPower electricity meters.
//!
//! The meter broadcasts C1 telegrams a few times per minute. Each one
//! carries an AES-128-CTR encrypted payload with cumulative energy and
//! instantaneous power registers, in both flow directions. This crate
//! takes the raw frame bytes plus the meter key and produces typed
//! measurements.
//!
//! ## Features
//!
//! - wM-Bus frame parsing with length and identity checks
//! - AES-128-CTR payload decryption with plaintext validation
//! - EN 13757 CRC16 verification of the decrypted payload
//! - Compact and full frame record decoding, including per phase
//!   markers and backward flow registers
//! - JSON measurement log for downstream consumers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use omnipower_rs::{AesKey, OmniPower};
//!
//! fn main() -> Result<(), omnipower_rs::MeterError> {
//!     let key = AesKey::from_hex("00112233445566778899AABBCCDDEEFF")?;
//!     let meter = OmniPower::with_key(key);
//!
//!     let frame = omnipower_rs::util::hex::decode_hex("27442d2c...")?;
//!     let measurement = meter.process_telegram(&frame, chrono::Utc::now())?;
//!     println!("{}", serde_json::to_string(&measurement)?);
//!     Ok(())
//! }
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod meter;
pub mod payload;
pub mod util;
pub mod wmbus;

// Core types
pub use error::{DecodeError, MeterError};
pub use meter::log::{MeasurementLog, MeasurementSink};
pub use meter::measurement::MeterMeasurement;
pub use meter::omnipower::OmniPower;
pub use payload::record::{RecordWalk, ValueBlock};
pub use payload::vif::{QuantityKind, Unit};
pub use wmbus::crypto::{AesKey, DecryptedPayload};
pub use wmbus::frame::{DeviceFilter, FrameHeader, WMBusFrame};

// Logging helpers
pub use logging::{init_logger, log_debug, log_error, log_info, log_warn};

use chrono::Utc;

/// Decodes one telegram given as hex strings.
///
/// Convenience wrapper over [`OmniPower::process_telegram`] with the
/// factory device identity and the capture time taken as now.
///
/// # Arguments
/// * `telegram_hex` - Complete frame bytes as a hex string
/// * `key_hex` - 16-byte AES key as 32 hex characters
///
/// # Returns
/// The decoded measurement, or the first error along the pipeline.
pub fn decode_hex_telegram(
    telegram_hex: &str,
    key_hex: &str,
) -> Result<MeterMeasurement, MeterError> {
    let frame = util::hex::decode_hex(telegram_hex)?;
    let key = AesKey::from_hex(key_hex)?;
    let meter = OmniPower::with_key(key);
    Ok(meter.process_telegram(&frame, Utc::now())?)
}
