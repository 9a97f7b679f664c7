//! Tempo Disk sensor reading.

/// One decoded broadcast from a Tempo Disk.
///
/// All four values always come from the same advertisement:
/// - Temperature in Celsius, 0.1 resolution
/// - Relative humidity in percent, 0.1 resolution
/// - Dew point in Celsius, 0.1 resolution
/// - Battery level in percent
///
/// Values are carried as broadcast; nothing is clamped to the declared
/// property bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    pub dew_point: f64,
    pub battery: u8,
}
