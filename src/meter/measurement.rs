//! Measurement produced from one telegram

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::payload::record::ValueBlock;
use crate::payload::vif::QuantityKind;

/// Timestamp layout used in serialized measurements, UTC with a
/// trailing Z and whole second precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Decoded content of one telegram plus capture metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterMeasurement {
    /// Device address from the frame header
    pub device_address: u32,
    /// 3-letter vendor code from the frame header
    pub manufacturer: String,
    /// wM-Bus device type from the frame header
    pub device_type: u8,
    /// When the telegram was captured, not when the meter sampled
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Value blocks in payload order
    pub blocks: Vec<ValueBlock>,
    /// False when any record had to be skipped or the decode aborted
    pub complete: bool,
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
}

impl MeterMeasurement {
    /// Starts an empty, complete measurement for a device.
    pub fn new(
        device_address: u32,
        manufacturer: String,
        device_type: u8,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            device_address,
            manufacturer,
            device_type,
            timestamp,
            blocks: Vec::new(),
            complete: true,
        }
    }

    /// Device address formatted the way it is printed on the meter.
    pub fn address_hex(&self) -> String {
        format!("{:08X}", self.device_address)
    }

    /// First block of the given kind, if the telegram carried one.
    pub fn block(&self, kind: QuantityKind) -> Option<&ValueBlock> {
        self.blocks.iter().find(|b| b.kind == kind)
    }
}
