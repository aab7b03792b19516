//! Simulation throughput benchmarks. Run with:
//! `cargo bench -p locomotion --features bench`

use std::hint::black_box;

use bevy::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion};

use locomotion::snapshot::{capture_world, from_bytes, to_bytes};
use locomotion::test_harness::TestRange;

const TANK_FIELDS: &[(&str, &str)] = &[
    ("Surfaces", "GROUND"),
    ("Appearance", "TREADS"),
    ("Speed", "30"),
    ("TurnRate", "90"),
    ("Acceleration", "300"),
    ("Braking", "300"),
];

/// A populated battlefield: `count` tanks in a grid, all ordered across the
/// map so every steering and physics path stays busy.
fn populated_range(count: usize) -> TestRange {
    let mut range = TestRange::new().with_seed(7);
    range.register_template("BenchTank", TANK_FIELDS);
    let side = (count as f32).sqrt().ceil() as usize;
    for i in 0..count {
        let x = 100.0 + (i % side) as f32 * 12.0;
        let y = 100.0 + (i / side) as f32 * 12.0;
        let unit = range.spawn_unit("BenchTank", Vec3::new(x, y, 0.0));
        range.order_move(unit, Vec3::new(1200.0 - x, 1200.0 - y, 0.0));
    }
    range
}

fn bench_simulation_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_tick");
    for count in [64, 256] {
        let mut range = populated_range(count);
        group.bench_function(format!("{count}_units"), |b| {
            b.iter(|| range.tick(1));
        });
    }
    group.finish();
}

fn bench_snapshot_roundtrip(c: &mut Criterion) {
    let mut range = populated_range(256);
    range.tick(30);
    c.bench_function("snapshot_capture_encode", |b| {
        b.iter(|| black_box(to_bytes(&capture_world(range.app.world_mut()))));
    });

    let bytes = to_bytes(&capture_world(range.app.world_mut()));
    c.bench_function("snapshot_decode", |b| {
        b.iter(|| black_box(from_bytes(black_box(&bytes)).unwrap()));
    });
}

criterion_group!(benches, bench_simulation_tick, bench_snapshot_roundtrip);
criterion_main!(benches);
