//! Meter profiles and decoded measurements

pub mod log;
pub mod measurement;
pub mod omnipower;

pub use log::{MeasurementLog, MeasurementSink};
pub use measurement::MeterMeasurement;
pub use omnipower::OmniPower;
