//! Append-only measurement log
//!
//! Decoded measurements are collected in capture order and dumped as a
//! JSON array. The [`MeasurementSink`] trait is the seam for feeding
//! measurements somewhere else, a message queue or a database, without
//! touching the decode path.

use crate::meter::measurement::MeterMeasurement;

/// Receiver for decoded measurements
pub trait MeasurementSink {
    fn append(&mut self, measurement: MeterMeasurement);
}

/// In-memory log of measurements in capture order
#[derive(Debug, Default, Clone)]
pub struct MeasurementLog {
    entries: Vec<MeterMeasurement>,
}

impl MeasurementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[MeterMeasurement] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MeterMeasurement> {
        self.entries.iter()
    }

    /// Serializes all entries as one JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    /// Same as [`to_json`](Self::to_json) with indentation, for files
    /// meant to be read by people.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}

impl MeasurementSink for MeasurementLog {
    fn append(&mut self, measurement: MeterMeasurement) {
        self.entries.push(measurement);
    }
}
