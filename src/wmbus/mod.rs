//! Wireless M-Bus layer: frame geometry, CRC, identity and decryption
//!
//! Everything up to but not including record decoding. The entry point
//! is [`frame::WMBusFrame::parse`], followed by
//! [`crypto::decrypt_payload`] once the frame is known to belong to a
//! configured device.

pub mod crc;
pub mod crypto;
pub mod frame;
pub mod manufacturer;

pub use crc::crc16_en13757;
pub use crypto::{decrypt_payload, AesKey, DecryptedPayload};
pub use frame::{DeviceFilter, FrameHeader, WMBusFrame};
pub use manufacturer::{get_manufacturer_name, id_to_manufacturer, manufacturer_to_id};
