//! Benchmark for the Tempo Disk discovery pipeline.
//!
//! Drives `DiscoveryLoop::handle_packet` directly with a no-op radio and a
//! counting host, and the full `run_with_io` loop with a fake radio.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::future::Future;
use std::io;
use std::pin::Pin;
use tempodisk_listener::app::{Options, Radio, run_with_io};
use tempodisk_listener::payload::{PAYLOAD_LEN, encode};
use tempodisk_listener::{
    Backend, BroadcastPacket, DeviceEntity, DeviceMetadata, DiscoveryLoop, Host, PeripheralId,
    Property, RadioConnection, RadioEvent, RadioStack, RadioState, ScanError, ScanRequest,
    SensorReading,
};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

const TEST_ID: PeripheralId = PeripheralId([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

fn tempo_disk_packet(id: PeripheralId) -> BroadcastPacket {
    let data = encode(&SensorReading {
        temperature: 21.5,
        humidity: 45.0,
        dew_point: 9.3,
        battery: 87,
    });
    BroadcastPacket {
        id,
        manufacturer_data: Some(data.to_vec()),
    }
}

/// iBeacon-style broadcast that the filter rejects by vendor code.
fn foreign_packet() -> BroadcastPacket {
    let mut data = vec![0u8; 25];
    data[0] = 0x4C;
    BroadcastPacket {
        id: PeripheralId([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]),
        manufacturer_data: Some(data),
    }
}

struct NoopRadio;

impl RadioStack for NoopRadio {
    fn start_scanning(&mut self, _request: &ScanRequest) -> Result<(), ScanError> {
        Ok(())
    }
}

#[derive(Default)]
struct CountingHost {
    notifications: usize,
}

impl Host for CountingHost {
    fn device_added(&mut self, _device: &DeviceEntity) -> io::Result<()> {
        self.notifications += 1;
        Ok(())
    }

    fn property_changed(&mut self, _device: &DeviceEntity, property: &Property) -> io::Result<()> {
        black_box(property.value());
        self.notifications += 1;
        Ok(())
    }
}

/// A fake radio that powers on and then replays packets.
struct FakeRadio {
    packets: Vec<BroadcastPacket>,
}

impl Radio for FakeRadio {
    fn open(
        &self,
        _backend: Backend,
    ) -> Pin<Box<dyn Future<Output = Result<RadioConnection, ScanError>> + Send + '_>> {
        let packets = self.packets.clone();
        Box::pin(async move {
            let (tx, rx) = mpsc::channel(packets.len() + 1);
            tokio::spawn(async move {
                let _ = tx.send(RadioEvent::StateChange(RadioState::PoweredOn)).await;
                for packet in packets {
                    let _ = tx.send(RadioEvent::Discover(packet)).await;
                }
            });
            Ok(RadioConnection {
                stack: Box::new(NoopRadio),
                events: rx,
            })
        })
    }
}

fn default_options() -> Options {
    Options {
        display_name: "Blue Maestro Tempo Disk".to_string(),
        description: "bench".to_string(),
        aliases: vec![],
        poll_interval: None,
        influxdb_measurement: "tempodisk".to_string(),
        verbose: false,
        backend: Backend::default(),
    }
}

/// Filter, decode and update for a known device, and the rejection path.
fn bench_handle_packet(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_packet");
    group.throughput(Throughput::Elements(1));

    let known = tempo_disk_packet(TEST_ID);
    let mut discovery =
        DiscoveryLoop::new(NoopRadio, CountingHost::default(), DeviceMetadata::default());
    discovery.handle_packet(&known).unwrap();
    group.bench_function("known_device", |b| {
        b.iter(|| discovery.handle_packet(black_box(&known)).unwrap())
    });

    let foreign = foreign_packet();
    group.bench_function("foreign_vendor", |b| {
        b.iter(|| discovery.handle_packet(black_box(&foreign)).unwrap())
    });

    let mut short = tempo_disk_packet(TEST_ID);
    if let Some(data) = short.manufacturer_data.as_mut() {
        data.truncate(PAYLOAD_LEN - 1);
    }
    group.bench_function("wrong_length", |b| {
        b.iter(|| discovery.handle_packet(black_box(&short)).unwrap())
    });

    group.finish();
}

/// First sighting of many devices, including registry growth.
fn bench_new_devices(c: &mut Criterion) {
    let mut group = c.benchmark_group("new_devices");

    for count in [1u16, 10, 100] {
        let packets: Vec<BroadcastPacket> = (0..count)
            .map(|i| {
                let [hi, lo] = i.to_be_bytes();
                tempo_disk_packet(PeripheralId([0xAA, 0xBB, 0xCC, 0xDD, hi, lo]))
            })
            .collect();

        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(BenchmarkId::from_parameter(count), &packets, |b, packets| {
            b.iter(|| {
                let mut discovery = DiscoveryLoop::new(
                    NoopRadio,
                    CountingHost::default(),
                    DeviceMetadata::default(),
                );
                for packet in packets {
                    discovery.handle_packet(packet).unwrap();
                }
                black_box(discovery.host().notifications)
            })
        });
    }

    group.finish();
}

/// The full application loop: radio channel -> discovery -> formatter -> writer.
fn bench_app_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("app_pipeline");
    let rt = Runtime::new().unwrap();

    for batch_size in [1usize, 10, 100] {
        let mut packets: Vec<BroadcastPacket> =
            (0..batch_size).map(|_| tempo_disk_packet(TEST_ID)).collect();
        packets.push(foreign_packet());
        let radio = FakeRadio { packets };

        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &radio, |b, radio| {
            b.iter(|| {
                let mut out = Vec::<u8>::with_capacity(512 * batch_size);
                rt.block_on(async {
                    run_with_io(default_options(), radio, &mut out).await.unwrap();
                });
                black_box(out)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_handle_packet, bench_new_devices, bench_app_pipeline);
criterion_main!(benches);
