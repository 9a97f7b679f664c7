//! `tempodisk-listener` library.
//!
//! Discovers Blue Maestro Tempo Disk sensors from their Bluetooth LE
//! broadcasts and keeps one [`DeviceEntity`] per sensor whose four
//! properties (temperature, humidity, dew point, battery) follow the latest
//! advertisement.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing, logging setup
//! and process exit codes. The pipeline itself lives in
//! [`crate::discovery`], driven through the [`RadioStack`] and [`Host`]
//! traits so it can be tested without a radio.

pub mod alias;
pub mod app;
pub mod discovery;
pub mod entity;
pub mod filter;
pub mod host;
pub mod output;
pub mod payload;
pub mod peripheral_id;
pub mod property;
pub mod radio;
pub mod reading;
pub mod registry;
pub mod scanner;
pub mod throttle;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use alias::{Alias, AliasMap, parse_alias};
pub use discovery::{DeviceMetadata, DiscoveryError, DiscoveryLoop, PacketOutcome};
pub use entity::DeviceEntity;
pub use filter::Rejection;
pub use host::Host;
pub use output::OutputFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use peripheral_id::PeripheralId;
pub use property::{Property, PropertyName, PropertySchema};
pub use radio::{BroadcastPacket, RadioEvent, RadioStack, RadioState, ScanRequest};
pub use reading::SensorReading;
pub use registry::DeviceRegistry;
pub use scanner::{Backend, RadioConnection, ScanError};
pub use throttle::{Throttle, parse_duration};
