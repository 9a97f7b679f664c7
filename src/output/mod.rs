//! Output formatters for property changes.
//!
//! The binary's host turns every property change into one line of output.
//! Currently only InfluxDB line protocol is supported.

pub mod influxdb;

use crate::entity::DeviceEntity;
use crate::property::Property;
use std::time::SystemTime;

/// Formats a single property change into an output record.
pub trait OutputFormatter: Send + Sync {
    /// Format the current value of `property` on `device`, observed at `timestamp`.
    ///
    /// Returns `None` if the property has no cached value yet.
    fn format(
        &self,
        device: &DeviceEntity,
        property: &Property,
        timestamp: SystemTime,
    ) -> Option<String>;
}
