//! Timing history for extraction stages.
//!
//! Feature-gated and runtime-toggled so recording costs nothing when off.
//!
//! # Usage
//!
//! ```ignore
//! use root_extract::metrics::{ExtractionMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let (outcome, stats) = session.run_timed(&token)?;
//! metrics.record(&stats);
//! println!("paths: {:.0} us avg", metrics.paths.average());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::pipeline::ExtractionStats;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// True when compiled with `metrics` and the runtime toggle is on.
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Fixed-capacity history, oldest values evicted first.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
  pub fn sum(&self) -> T {
    self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
  }
}

impl RollingWindow<u64> {
  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = *self.buffer.iter().min()?;
    let max = *self.buffer.iter().max()?;
    Some((min, max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128)
  }
}

/// Per-stage timing history of recent extractions, in microseconds.
///
/// Cached stages report zero and are skipped, so each window averages real
/// computations only.
#[derive(Debug, Clone, Default)]
pub struct ExtractionMetrics {
  pub radius: RollingWindow<u64>,
  pub comparative: RollingWindow<u64>,
  pub cost: RollingWindow<u64>,
  pub paths: RollingWindow<u64>,
  pub skeleton: RollingWindow<u64>,
  pub refine: RollingWindow<u64>,
  pub total: RollingWindow<u64>,
  /// Node count of the last recorded graph.
  pub last_node_count: usize,
  /// Extractions recorded since creation.
  pub runs: u64,
}

impl ExtractionMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record one run. No-op unless [`is_enabled`].
  pub fn record(&mut self, stats: &ExtractionStats) {
    if !is_enabled() {
      return;
    }
    let stages = [
      (&mut self.radius, stats.radius_us),
      (&mut self.comparative, stats.comparative_us),
      (&mut self.cost, stats.cost_us),
      (&mut self.paths, stats.paths_us),
      (&mut self.skeleton, stats.skeleton_us),
      (&mut self.refine, stats.refine_us),
    ];
    for (window, us) in stages {
      if us > 0 {
        window.push(us);
      }
    }
    self.total.push(stats.total_us);
    self.last_node_count = stats.node_count;
    self.runs += 1;
  }

  /// Clear the timing windows. `runs` is cumulative and kept.
  pub fn reset(&mut self) {
    for window in [
      &mut self.radius,
      &mut self.comparative,
      &mut self.cost,
      &mut self.paths,
      &mut self.skeleton,
      &mut self.refine,
      &mut self.total,
    ] {
      window.clear();
    }
    self.last_node_count = 0;
  }
}
