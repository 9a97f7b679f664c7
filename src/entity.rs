//! In-memory representation of one Tempo Disk.

use crate::peripheral_id::PeripheralId;
use crate::property::{Property, PropertyName};
use crate::reading::SensorReading;

/// Prefix of the entity id exposed to the host.
pub const ENTITY_ID_PREFIX: &str = "BlueMaestroTempoDisk";

/// Semantic device type exposed to the host.
pub const DEVICE_TYPE: &str = "TemperatureSensor";

/// One physical sensor: identity, display metadata and its four properties.
///
/// The identity is fixed at creation. Every accepted broadcast overwrites the
/// cached property values; nothing is accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEntity {
    id: PeripheralId,
    name: String,
    description: String,
    /// Indexed in [`PropertyName::ALL`] order
    properties: [Property; 4],
}

impl DeviceEntity {
    /// Create a device with all four properties declared and no values cached.
    pub fn create(
        id: PeripheralId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            properties: PropertyName::ALL.map(Property::new),
        }
    }

    pub fn id(&self) -> PeripheralId {
        self.id
    }

    /// Id the host registers the device under, e.g. `BlueMaestroTempoDisk-aabbccddeeff`.
    pub fn entity_id(&self) -> String {
        format!("{ENTITY_ID_PREFIX}-{}", self.id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn property(&self, name: PropertyName) -> &Property {
        &self.properties[name as usize]
    }

    /// Properties in notification order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Overwrite every cached value with `reading`.
    ///
    /// Returns the properties whose value was written, in notification order.
    /// A new reading always writes all four, even when a value is unchanged.
    pub fn update(&mut self, reading: &SensorReading) -> [PropertyName; 4] {
        for name in PropertyName::ALL {
            let value = match name {
                PropertyName::Temperature => reading.temperature,
                PropertyName::Humidity => reading.humidity,
                PropertyName::DewPoint => reading.dew_point,
                PropertyName::Battery => f64::from(reading.battery),
            };
            self.properties[name as usize].set_cached_value(value);
        }
        PropertyName::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_ID, sample_reading};

    fn entity() -> DeviceEntity {
        DeviceEntity::create(TEST_ID, "Tempo Disk", "Blue Maestro Tempo Disk sensor")
    }

    #[test]
    fn test_create_declares_properties_without_values() {
        let device = entity();
        assert_eq!(device.id(), TEST_ID);
        assert_eq!(device.name(), "Tempo Disk");
        assert_eq!(device.description(), "Blue Maestro Tempo Disk sensor");

        let names: Vec<PropertyName> = device.properties().iter().map(Property::name).collect();
        assert_eq!(names, PropertyName::ALL);
        assert!(device.properties().iter().all(|p| p.value().is_none()));
    }

    #[test]
    fn test_entity_id() {
        assert_eq!(entity().entity_id(), "BlueMaestroTempoDisk-aabbccddeeff");
    }

    #[test]
    fn test_property_lookup_by_name() {
        let device = entity();
        for name in PropertyName::ALL {
            assert_eq!(device.property(name).name(), name);
        }
    }

    #[test]
    fn test_update_writes_all_values() {
        let mut device = entity();
        let changed = device.update(&sample_reading());

        assert_eq!(changed, PropertyName::ALL);
        assert_eq!(device.property(PropertyName::Temperature).value(), Some(21.5));
        assert_eq!(device.property(PropertyName::Humidity).value(), Some(45.0));
        assert_eq!(device.property(PropertyName::DewPoint).value(), Some(9.3));
        assert_eq!(device.property(PropertyName::Battery).value(), Some(87.0));
    }

    #[test]
    fn test_second_update_overwrites_first() {
        let mut device = entity();
        device.update(&sample_reading());
        device.update(&SensorReading {
            temperature: -3.4,
            humidity: 80.1,
            dew_point: -6.0,
            battery: 12,
        });

        assert_eq!(device.property(PropertyName::Temperature).value(), Some(-3.4));
        assert_eq!(device.property(PropertyName::Humidity).value(), Some(80.1));
        assert_eq!(device.property(PropertyName::DewPoint).value(), Some(-6.0));
        assert_eq!(device.property(PropertyName::Battery).value(), Some(12.0));
    }

    #[test]
    fn test_identical_update_still_reports_all() {
        let mut device = entity();
        device.update(&sample_reading());
        assert_eq!(device.update(&sample_reading()), PropertyName::ALL);
    }
}
