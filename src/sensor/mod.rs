//! Sensor implementations.
//!
//! Real hardware backends plug in through [`crate::capability::SensorSession`];
//! the synthetic sensor here drives the full pipeline without a device.

pub mod synthetic;

pub use synthetic::{SensorFaults, SensorMonitor, SyntheticSensor};
