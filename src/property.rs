//! Typed, bounded, read-only properties exposed to the host.

use std::fmt;

/// The four properties every Tempo Disk exposes, in notification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyName {
    Temperature,
    Humidity,
    DewPoint,
    Battery,
}

impl PropertyName {
    /// All properties in the fixed order changes are reported in.
    pub const ALL: [PropertyName; 4] = [
        PropertyName::Temperature,
        PropertyName::Humidity,
        PropertyName::DewPoint,
        PropertyName::Battery,
    ];

    /// Name the host knows the property by.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PropertyName::Temperature => "temperature",
            PropertyName::Humidity => "humidity",
            PropertyName::DewPoint => "dewPoint",
            PropertyName::Battery => "battery",
        }
    }

    /// Declared schema of this property.
    pub const fn schema(&self) -> PropertySchema {
        match self {
            PropertyName::Temperature => PropertySchema {
                name: *self,
                semantic_type: Some("TemperatureProperty"),
                description: "The ambient temperature",
                minimum: -127.9,
                maximum: 127.9,
                step: 0.1,
                unit: "degree celsius",
            },
            PropertyName::Humidity => PropertySchema {
                name: *self,
                semantic_type: None,
                description: "The relative humidity",
                minimum: 0.0,
                maximum: 100.0,
                step: 0.1,
                unit: "%",
            },
            PropertyName::DewPoint => PropertySchema {
                name: *self,
                semantic_type: None,
                description: "The dew point",
                minimum: -127.9,
                maximum: 127.9,
                step: 0.1,
                unit: "degree celsius",
            },
            PropertyName::Battery => PropertySchema {
                name: *self,
                semantic_type: None,
                description: "The battery level",
                minimum: 0.0,
                maximum: 100.0,
                step: 1.0,
                unit: "percent",
            },
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property declaration handed to the host when a device is added.
///
/// Every property is a read-only number. The bounds are informational: the
/// cached value is whatever the sensor broadcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySchema {
    pub name: PropertyName,
    /// Semantic annotation understood by the host, if any
    pub semantic_type: Option<&'static str>,
    pub description: &'static str,
    pub minimum: f64,
    pub maximum: f64,
    /// Values are multiples of this step
    pub step: f64,
    pub unit: &'static str,
}

impl PropertySchema {
    pub const VALUE_TYPE: &'static str = "number";
    pub const READ_ONLY: bool = true;

    /// Whether values are whole numbers.
    pub fn is_integer(&self) -> bool {
        self.step.fract() == 0.0
    }

    /// Whether `value` lies inside the declared bounds.
    pub fn contains(&self, value: f64) -> bool {
        (self.minimum..=self.maximum).contains(&value)
    }
}

/// A declared property together with its last known value.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    schema: PropertySchema,
    value: Option<f64>,
}

impl Property {
    /// Declare `name` with no cached value.
    pub fn new(name: PropertyName) -> Self {
        Self {
            schema: name.schema(),
            value: None,
        }
    }

    pub fn name(&self) -> PropertyName {
        self.schema.name
    }

    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    /// Last value written, `None` until the first reading arrives.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Overwrite the cached value.
    pub fn set_cached_value(&mut self, value: f64) {
        self.value = Some(value);
    }
}
