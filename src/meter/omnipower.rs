//! Kamstrup OmniPower device profile
//!
//! Binds a device identity filter and a meter key to the decode
//! pipeline: identify, parse, decrypt, walk the records. One profile
//! instance handles every telegram of one meter installation.

use chrono::{DateTime, Utc};

use crate::error::DecodeError;
use crate::logging::{log_debug, log_warn};
use crate::meter::measurement::MeterMeasurement;
use crate::payload::record::RecordErrorKind;
use crate::wmbus::crypto::{decrypt_payload, AesKey, DecryptedPayload};
use crate::wmbus::frame::{DeviceFilter, FrameHeader, WMBusFrame};

/// A configured OmniPower meter
#[derive(Debug, Clone)]
pub struct OmniPower {
    name: String,
    filter: DeviceFilter,
    key: AesKey,
}

impl OmniPower {
    pub fn new(name: impl Into<String>, filter: DeviceFilter, key: AesKey) -> Self {
        Self {
            name: name.into(),
            filter,
            key,
        }
    }

    /// Profile for the single phase OmniPower with its factory
    /// identity.
    pub fn with_key(key: AesKey) -> Self {
        Self::new(
            "Kamstrup OmniPower one-phase",
            DeviceFilter::omnipower(),
            key,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> DeviceFilter {
        self.filter
    }

    /// Cheap check whether raw frame bytes belong to this meter.
    ///
    /// Looks only at the manufacturer and device type fields, so it is
    /// safe to call on any byte salad coming off the radio.
    pub fn identify(&self, frame_bytes: &[u8]) -> bool {
        self.filter.matches_bytes(frame_bytes)
    }

    /// Runs the full pipeline on one captured telegram.
    pub fn process_telegram(
        &self,
        frame_bytes: &[u8],
        captured_at: DateTime<Utc>,
    ) -> Result<MeterMeasurement, DecodeError> {
        if !self.identify(frame_bytes) {
            log_debug(&format!("{}: telegram from another device", self.name));
            return Err(DecodeError::NotMyDevice);
        }

        let frame = WMBusFrame::parse(frame_bytes)?;
        let header = frame.header();
        log_debug(&format!(
            "{}: frame from {:08X}, ACC {}, SN mode {} time {} session {}",
            self.name,
            header.device_address,
            header.access_counter,
            header.sn_encryption_mode(),
            header.sn_time(),
            header.sn_session()
        ));

        let payload = decrypt_payload(&frame, &self.key)?;
        self.decode_payload(header, &payload, captured_at)
    }

    /// Turns a validated plaintext payload into a measurement.
    ///
    /// Split out from [`process_telegram`](Self::process_telegram) so
    /// payloads decrypted elsewhere can still be decoded.
    pub fn decode_payload(
        &self,
        header: &FrameHeader,
        payload: &DecryptedPayload,
        captured_at: DateTime<Utc>,
    ) -> Result<MeterMeasurement, DecodeError> {
        let mut measurement = MeterMeasurement::new(
            header.device_address,
            header.manufacturer_code(),
            header.device_type,
            captured_at,
        );

        match crate::payload::decode_blocks(payload.as_bytes()) {
            Ok(walk) => {
                if walk.partial {
                    log_warn(&format!(
                        "{}: some records were skipped, measurement is incomplete",
                        self.name
                    ));
                }
                measurement.blocks = walk.blocks;
                measurement.complete = !walk.partial;
                Ok(measurement)
            }
            Err(err) => {
                measurement.blocks = err.blocks;
                measurement.complete = false;
                let partial = Box::new(measurement);
                Err(match err.kind {
                    RecordErrorKind::Truncated { needed, remaining } => {
                        DecodeError::TruncatedPayload {
                            needed,
                            remaining,
                            partial,
                        }
                    }
                    RecordErrorKind::Unexpected { reason } => {
                        DecodeError::UnexpectedFormat { reason, partial }
                    }
                })
            }
        }
    }
}
