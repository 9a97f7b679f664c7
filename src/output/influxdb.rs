//! InfluxDB line protocol output formatter.

use crate::entity::DeviceEntity;
use crate::output::OutputFormatter;
use crate::property::Property;
use std::fmt;
use std::time::SystemTime;

/// Field value in InfluxDB line protocol
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// Escape commas, equals signs and spaces in tag values.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One line of InfluxDB line protocol with a single field.
#[derive(Debug)]
pub struct DataPoint<'a> {
    pub measurement: &'a str,
    pub tags: [(&'a str, String); 2],
    pub field: (&'a str, FieldValue),
    pub timestamp: Option<SystemTime>,
}

impl fmt::Display for DataPoint<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        for (key, value) in &self.tags {
            write!(fmt, ",{key}={}", escape_tag(value))?;
        }
        write!(fmt, " {}={}", self.field.0, self.field.1)?;
        if let Some(time) = self.timestamp {
            // pre-epoch clocks are written as 0
            let nanos = time
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            write!(fmt, " {nanos}")?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol formatter.
///
/// Each property change becomes one line, tagged with the entity id and the
/// device's display name:
///
/// ```text
/// tempodisk,id=BlueMaestroTempoDisk-aabbccddeeff,name=Cellar temperature=21.5 1700000000000000000
/// ```
///
/// Integer properties (battery) are written as integer fields.
pub struct InfluxDbFormatter {
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn field_value(property: &Property) -> Option<FieldValue> {
        let value = property.value()?;
        Some(if property.schema().is_integer() {
            FieldValue::Integer(value as i64)
        } else {
            FieldValue::Float(value)
        })
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(
        &self,
        device: &DeviceEntity,
        property: &Property,
        timestamp: SystemTime,
    ) -> Option<String> {
        let point = DataPoint {
            measurement: &self.measurement_name,
            tags: [("id", device.entity_id()), ("name", device.name().to_string())],
            field: (property.name().as_str(), Self::field_value(property)?),
            timestamp: Some(timestamp),
        };
        Some(point.to_string())
    }
}
