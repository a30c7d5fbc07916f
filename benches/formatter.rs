//! Benchmarks for the output formatters and alias lookup.
//!
//! Isolates formatting from async runtime overhead.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::SystemTime;
use tpms_listener::{
    AliasMap, BeaconName, DeviceAddress, InfluxDbFormatter, Notification, OutputFormatter, Reading,
    TextFormatter, resolve_name,
};

const TEST_ADDRESS: DeviceAddress = DeviceAddress::random([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);

fn reading() -> Notification {
    Notification::Reading {
        address: TEST_ADDRESS,
        reading: Reading {
            pressure: 220,
            temperature: 25,
        },
    }
}

/// Benchmark each formatter on the notifications it renders
fn bench_formatters(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_notification");
    let influxdb = InfluxDbFormatter::new("tpms".to_string());
    let name = TEST_ADDRESS.to_string();
    let timestamp = SystemTime::UNIX_EPOCH;

    group.throughput(Throughput::Elements(1));

    let r = reading();
    group.bench_function("influxdb_reading", |b| {
        b.iter(|| black_box(influxdb.format(black_box(&r), black_box(&name), timestamp)))
    });
    group.bench_function("text_reading", |b| {
        b.iter(|| black_box(TextFormatter.format(black_box(&r), black_box(&name), timestamp)))
    });

    let found = Notification::BeaconFound {
        name: BeaconName("TPMS-FL".to_string()),
        address: TEST_ADDRESS,
    };
    group.bench_function("text_beacon_found", |b| {
        b.iter(|| black_box(TextFormatter.format(black_box(&found), black_box(&name), timestamp)))
    });

    group.finish();
}

/// Benchmark alias resolution
fn bench_alias_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("alias_resolution");
    group.throughput(Throughput::Elements(1));

    // No aliases - falls back to the address string
    let empty_aliases = AliasMap::new();
    group.bench_function("no_alias", |b| {
        b.iter(|| black_box(resolve_name(black_box(&TEST_ADDRESS), black_box(&empty_aliases))))
    });

    let mut aliases = AliasMap::new();
    aliases.insert(TEST_ADDRESS.bytes, "front-left".to_string());
    group.bench_function("with_alias", |b| {
        b.iter(|| black_box(resolve_name(black_box(&TEST_ADDRESS), black_box(&aliases))))
    });

    group.finish();
}

criterion_group!(benches, bench_formatters, bench_alias_resolution);
criterion_main!(benches);
