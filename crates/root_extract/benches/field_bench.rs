//! Field computation and path search benchmarks.
//!
//! - **radius**: sphere growing per voxel, across pool sizes
//! - **comparative**: windowed relative radius
//! - **cost**: intensity + radius combination
//! - **paths**: Dijkstra variants over the same cost field

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;
use root_extract::{
  cost::{compute_comparative_field, compute_cost_field, compute_radius_field, DEFAULT_COMPARATIVE_MASK},
  path::{PathSearch, SearchVariant},
  CostParams, GapParams, PathParams, RadiusParams, VoxelGrid, WorkerPool,
};

// =============================================================================
// Synthetic volumes
// =============================================================================

fn segment_distance(p: Vec3, a: Vec3, b: Vec3) -> f32 {
  let ab = b - a;
  let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
  (p - (a + ab * t)).length()
}

/// Taproot down z with `laterals` side roots, tube radius 2.
fn root_volume(n: usize, laterals: usize) -> Arc<VoxelGrid<f32>> {
  let c = n as f32 / 2.0;
  let top = Vec3::new(c, c, 0.0);
  let bottom = Vec3::new(c, c, n as f32 - 2.0);
  let mut segments = vec![(top, bottom)];
  for i in 0..laterals {
    let z = (i + 1) as f32 * n as f32 / (laterals + 1) as f32;
    let angle = i as f32 * 2.4;
    let tip = Vec3::new(c + angle.cos() * c * 0.8, c + angle.sin() * c * 0.8, z + 4.0);
    segments.push((Vec3::new(c, c, z), tip));
  }
  Arc::new(VoxelGrid::from_fn([n, n, n], |v| {
    let p = Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32);
    let inside = segments.iter().any(|&(a, b)| segment_distance(p, a, b) <= 2.0);
    if inside {
      1.0
    } else {
      0.0
    }
  }))
}

// =============================================================================
// Fields
// =============================================================================

fn bench_radius(c: &mut Criterion) {
  let mut group = c.benchmark_group("radius");
  let volume = root_volume(48, 6);
  group.throughput(Throughput::Elements(volume.len() as u64));

  for threads in [1, 4, 0] {
    let pool = WorkerPool::new(threads);
    group.bench_with_input(BenchmarkId::new("threads", threads), &pool, |b, pool| {
      b.iter(|| black_box(compute_radius_field(&volume, &RadiusParams::DEFAULT, pool).unwrap()))
    });
  }
  group.finish();
}

fn bench_comparative_and_cost(c: &mut Criterion) {
  let volume = root_volume(48, 6);
  let pool = WorkerPool::global();
  let radius = compute_radius_field(&volume, &RadiusParams::DEFAULT, &pool).unwrap();

  c.bench_function("comparative/48", |b| {
    b.iter(|| black_box(compute_comparative_field(&radius, DEFAULT_COMPARATIVE_MASK, &pool)))
  });
  c.bench_function("cost/48", |b| {
    b.iter(|| black_box(compute_cost_field(&volume, &radius, &CostParams::DEFAULT, &pool).unwrap()))
  });
}

// =============================================================================
// Path search
// =============================================================================

fn bench_paths(c: &mut Criterion) {
  let mut group = c.benchmark_group("paths");
  let volume = root_volume(48, 6);
  let pool = WorkerPool::global();
  let radius = compute_radius_field(&volume, &RadiusParams::DEFAULT, &pool).unwrap();
  let cost = compute_cost_field(&volume, &radius, &CostParams::DEFAULT, &pool).unwrap();
  let source = [24, 24, 0];

  let variants = [
    ("plain", SearchVariant::Plain),
    ("direction", SearchVariant::DirectionPenalty(2.0)),
    ("gap", SearchVariant::GapClosing(GapParams::DEFAULT)),
  ];
  for (name, variant) in variants {
    group.bench_function(name, |b| {
      b.iter(|| {
        let mut search = PathSearch::new(&cost, source, PathParams::DEFAULT, variant).unwrap();
        black_box(search.run())
      })
    });
  }
  group.finish();
}

criterion_group!(fields, bench_radius, bench_comparative_and_cost);
criterion_group!(search, bench_paths);
criterion_main!(fields, search);
