//! Tempo Disk manufacturer-data layout.
//!
//! The advertisement carries a fixed 41 byte manufacturer-data field. The
//! first two bytes are the company id (little-endian, as everywhere in BLE);
//! the sensor fields that follow are big-endian.
//!
//! | Offset | Width | Encoding | Field                 |
//! |--------|-------|----------|-----------------------|
//! | 0      | 2     | u16 LE   | vendor/model code     |
//! | 3      | 1     | u8       | battery percent       |
//! | 8      | 2     | i16 BE   | temperature ×10       |
//! | 10     | 2     | i16 BE   | relative humidity ×10 |
//! | 12     | 2     | i16 BE   | dew point ×10         |

use crate::reading::SensorReading;

/// Blue Maestro company id, found in the first two bytes of manufacturer data.
pub const VENDOR_CODE: u16 = 0x0133;

/// Exact manufacturer-data length of the supported payload version.
pub const PAYLOAD_LEN: usize = 41;

/// A manufacturer-data buffer of the one length the decoder understands.
pub type Payload = [u8; PAYLOAD_LEN];

const BATTERY_OFFSET: usize = 3;
const TEMPERATURE_OFFSET: usize = 8;
const HUMIDITY_OFFSET: usize = 10;
const DEW_POINT_OFFSET: usize = 12;

/// Fields are broadcast in tenths.
const SCALE: f64 = 10.0;

#[inline]
fn read_tenths(data: &Payload, offset: usize) -> f64 {
    f64::from(i16::from_be_bytes([data[offset], data[offset + 1]])) / SCALE
}

#[inline]
fn write_tenths(data: &mut Payload, offset: usize, value: f64) {
    let raw = (value * SCALE).round() as i16;
    data[offset..offset + 2].copy_from_slice(&raw.to_be_bytes());
}

/// Decode a payload that passed [`crate::filter::check`].
///
/// The length is guaranteed by the type, so decoding cannot fail. Values
/// outside the declared property bounds are returned unmodified.
pub fn decode(data: &Payload) -> SensorReading {
    SensorReading {
        temperature: read_tenths(data, TEMPERATURE_OFFSET),
        humidity: read_tenths(data, HUMIDITY_OFFSET),
        dew_point: read_tenths(data, DEW_POINT_OFFSET),
        battery: data[BATTERY_OFFSET],
    }
}

/// Build the manufacturer data a Tempo Disk would broadcast for `reading`.
///
/// Bytes the decoder does not look at are left zero.
pub fn encode(reading: &SensorReading) -> Payload {
    let mut data = [0u8; PAYLOAD_LEN];
    data[..2].copy_from_slice(&VENDOR_CODE.to_le_bytes());
    data[BATTERY_OFFSET] = reading.battery;
    write_tenths(&mut data, TEMPERATURE_OFFSET, reading.temperature);
    write_tenths(&mut data, HUMIDITY_OFFSET, reading.humidity);
    write_tenths(&mut data, DEW_POINT_OFFSET, reading.dew_point);
    data
}
