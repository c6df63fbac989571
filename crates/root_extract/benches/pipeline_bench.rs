//! End-to-end extraction benchmarks.
//!
//! - **cold**: fresh session, every stage computed
//! - **warm**: cutoff change on a cached session (paths + skeleton only)
//! - **expansion**: windowed iterative extraction, linear vs log
//! - **batch**: independent volumes through `BatchPipeline`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use root_extract::{
  pipeline::ExpansionMode, BatchPipeline, CancelToken, ExpansionParams, ExtractionConfig,
  ExtractionSession, VoxelGrid,
};

fn segment_distance(p: Vec3, a: Vec3, b: Vec3) -> f32 {
  let ab = b - a;
  let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
  (p - (a + ab * t)).length()
}

/// Binary tree of tubes, `depth` levels of forks below a trunk.
fn forked_volume(n: usize, depth: u32) -> Arc<VoxelGrid<f32>> {
  let c = n as f32 / 2.0;
  let mut segments = Vec::new();
  let mut tips = vec![(Vec3::new(c, c, 0.0), c * 0.5)];
  let step = n as f32 / (depth + 1) as f32;
  for _ in 0..=depth {
    let mut next = Vec::new();
    for (start, spread) in tips {
      let end = start + Vec3::new(0.0, 0.0, step);
      segments.push((start, end));
      next.push((end + Vec3::new(-spread, 0.0, 0.0), spread * 0.5));
      next.push((end + Vec3::new(spread, 0.0, 0.0), spread * 0.5));
    }
    tips = next;
  }
  Arc::new(VoxelGrid::from_fn([n, n, n], |v| {
    let p = Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32);
    let inside = segments.iter().any(|&(a, b)| segment_distance(p, a, b) <= 1.8);
    if inside {
      1.0
    } else {
      0.0
    }
  }))
}

fn source(n: usize) -> [i64; 3] {
  [n as i64 / 2, n as i64 / 2, 0]
}

fn bench_cold(c: &mut Criterion) {
  let mut group = c.benchmark_group("cold");
  group.sample_size(10);
  for n in [32, 48] {
    let volume = forked_volume(n, 2);
    group.bench_with_input(BenchmarkId::from_parameter(n), &volume, |b, volume| {
      b.iter(|| {
        let outcome = root_extract::extract(
          Arc::clone(volume),
          source(n),
          &ExtractionConfig::DEFAULT,
          None,
          &CancelToken::new(),
        );
        black_box(outcome.unwrap())
      })
    });
  }
  group.finish();
}

fn bench_warm(c: &mut Criterion) {
  let n = 48;
  let token = CancelToken::new();
  let mut session = ExtractionSession::new(forked_volume(n, 2), source(n), ExtractionConfig::DEFAULT).unwrap();
  session.run(&token).unwrap();

  let mut flip = false;
  c.bench_function("warm/cutoff_change", |b| {
    b.iter(|| {
      flip = !flip;
      let cutoff = if flip { 200.0 } else { 150.0 };
      session
        .set_config(ExtractionConfig::DEFAULT.with_cost_cutoff(cutoff))
        .unwrap();
      black_box(session.run(&token).unwrap())
    })
  });
}

fn bench_expansion(c: &mut Criterion) {
  let mut group = c.benchmark_group("expansion");
  group.sample_size(10);
  let n = 40;
  let volume = forked_volume(n, 2);
  for mode in [ExpansionMode::Linear, ExpansionMode::Log] {
    let params = ExpansionParams::DEFAULT.with_mode(mode);
    group.bench_function(format!("{mode:?}"), |b| {
      b.iter(|| {
        let outcome = root_extract::expand_iteratively(
          Arc::clone(&volume),
          source(n),
          &ExtractionConfig::DEFAULT,
          &params,
          &CancelToken::new(),
        );
        black_box(outcome.unwrap())
      })
    });
  }
  group.finish();
}

fn bench_batch(c: &mut Criterion) {
  let mut group = c.benchmark_group("batch");
  group.sample_size(10);
  let n = 32;
  let volumes: Vec<_> = (1..=4).map(|d| forked_volume(n, d)).collect();
  group.bench_function("4_volumes", |b| {
    b.iter(|| {
      let mut batch = BatchPipeline::new(4);
      for volume in &volumes {
        batch.submit(Arc::clone(volume), source(n), ExtractionConfig::DEFAULT, None);
      }
      black_box(batch.wait_all())
    })
  });
  group.finish();
}

criterion_group!(single, bench_cold, bench_warm, bench_expansion);
criterion_group!(parallel, bench_batch);
criterion_main!(single, parallel);
