use crate::payload::{PAYLOAD_LEN, Payload};
use crate::peripheral_id::PeripheralId;
use crate::radio::BroadcastPacket;
use crate::reading::SensorReading;

/// A stable peripheral id for unit tests.
pub const TEST_ID: PeripheralId = PeripheralId([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// The reading encoded by [`sample_payload`].
pub fn sample_reading() -> SensorReading {
    SensorReading {
        temperature: 21.5,
        humidity: 45.0,
        dew_point: 9.3,
        battery: 87,
    }
}

/// A hand-assembled Tempo Disk payload: 21.5 °C, 45.0 %, dew point 9.3 °C, 87 %.
pub fn sample_payload() -> Payload {
    let mut data = [0u8; PAYLOAD_LEN];
    data[0] = 0x33; // vendor code 0x0133, little-endian
    data[1] = 0x01;
    data[3] = 87; // battery
    data[8] = 0x00; // temperature 215
    data[9] = 0xD7;
    data[10] = 0x01; // humidity 450
    data[11] = 0xC2;
    data[12] = 0x00; // dew point 93
    data[13] = 0x5D;
    data
}

/// A packet from `id` carrying `data` as manufacturer data.
pub fn packet(id: PeripheralId, data: &[u8]) -> BroadcastPacket {
    BroadcastPacket {
        id,
        manufacturer_data: Some(data.to_vec()),
    }
}
