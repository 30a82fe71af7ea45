//! Spatial index benchmarks using criterion for historical comparison.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use herd_ecs::{ComponentStore, MemoryWorld, MoveTracker, Point, Tags};
use herd_spatial::{GridIndex, RadialIndex, WorldBounds};

/// Lay `count` entities out on a square lattice with `spacing` between them.
fn lattice(world: &mut MemoryWorld, count: u64, spacing: f64) {
    let side = (count as f64).sqrt().ceil() as u64;
    for i in 0..count {
        let x = (i % side) as f64 * spacing;
        let z = (i / side) as f64 * spacing;
        world.spawn_participant(Point::new(x, 64.0, z));
    }
}

fn octree_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("octree");
    let bounds = WorldBounds::new(Point::new(0.0, 64.0, 0.0), 4096.0).unwrap();

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        let mut world = MemoryWorld::new();
        lattice(&mut world, count, 0.8);

        group.bench_with_input(BenchmarkId::new("rebuild", count), &count, |b, _| {
            let mut index = RadialIndex::with_bounds(bounds).unwrap();
            b.iter(|| {
                index.clear();
                black_box(
                    index
                        .populate(&world, world.entities_with_tags(Tags::PARTICIPANT))
                        .unwrap(),
                );
            });
        });

        group.bench_with_input(BenchmarkId::new("search_all", count), &count, |b, _| {
            let mut index = RadialIndex::with_bounds(bounds).unwrap();
            index
                .populate(&world, world.entities_with_tags(Tags::PARTICIPANT))
                .unwrap();
            let centers: Vec<Point> = index.iter().map(|(_, p)| p).collect();
            let mut out = Vec::new();

            b.iter(|| {
                for &center in &centers {
                    index.radius_search_into(center, 2.0, &mut out);
                    black_box(out.len());
                }
            });
        });
    }

    group.finish();
}

fn grid_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid");

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("reconcile_shift", count), &count, |b, &count| {
            let mut world = MemoryWorld::new();
            lattice(&mut world, count, 0.8);
            let mut grid = GridIndex::new(4.0).unwrap();
            grid.reconcile(world.consume_moved(), &world);

            let entities: Vec<_> = world.entities().collect();
            b.iter(|| {
                for &entity in &entities {
                    if let Some(p) = world.position(entity) {
                        world.set_position(entity, Point::new(p.x + 0.3, p.y, p.z));
                    }
                }
                black_box(grid.reconcile(world.consume_moved(), &world));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, octree_benchmarks, grid_benchmarks);
criterion_main!(benches);
