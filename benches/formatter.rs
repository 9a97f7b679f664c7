//! Benchmark suite for the InfluxDB formatter.
//!
//! Isolates formatting from the discovery loop and async runtime.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::SystemTime;
use tempodisk_listener::{
    DeviceEntity, InfluxDbFormatter, OutputFormatter, PeripheralId, PropertyName, SensorReading,
};

const TEST_ID: PeripheralId = PeripheralId([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

fn device(name: &str) -> DeviceEntity {
    let mut device = DeviceEntity::create(TEST_ID, name, "bench");
    device.update(&SensorReading {
        temperature: 21.5,
        humidity: 45.0,
        dew_point: 9.3,
        battery: 87,
    });
    device
}

/// One line per property type
fn bench_format_property(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_property");
    let formatter = InfluxDbFormatter::new("tempodisk".to_string());
    let device = device("Cellar");

    group.throughput(Throughput::Elements(1));
    for name in [PropertyName::Temperature, PropertyName::Battery] {
        let property = device.property(name);
        group.bench_function(name.as_str(), |b| {
            b.iter(|| {
                formatter.format(black_box(&device), black_box(property), SystemTime::UNIX_EPOCH)
            })
        });
    }

    group.finish();
}

/// Display names that need tag escaping
fn bench_format_escaped_name(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_escaped_name");
    let formatter = InfluxDbFormatter::new("tempodisk".to_string());

    for (label, name) in [("plain", "Cellar"), ("escaped", "Blue Maestro, wine cellar")] {
        let device = device(name);
        group.bench_function(label, |b| {
            b.iter(|| {
                formatter.format(
                    black_box(&device),
                    device.property(PropertyName::Humidity),
                    SystemTime::UNIX_EPOCH,
                )
            })
        });
    }

    group.finish();
}

/// A full update: all four properties of one reading
fn bench_format_reading(c: &mut Criterion) {
    let formatter = InfluxDbFormatter::new("tempodisk".to_string());
    let device = device("Cellar");

    let mut group = c.benchmark_group("format_reading");
    group.throughput(Throughput::Elements(4));
    group.bench_function("all_properties", |b| {
        b.iter(|| {
            device
                .properties()
                .iter()
                .filter_map(|p| formatter.format(&device, p, SystemTime::UNIX_EPOCH))
                .map(|line| line.len())
                .sum::<usize>()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_format_property,
    bench_format_escaped_name,
    bench_format_reading,
);
criterion_main!(benches);
