//! Async Extraction
//!
//! Non-blocking wrappers around [`extract`](super::process::extract) built on
//! [`WorkerPool::spawn`].
//!
//! # Usage
//!
//! ```ignore
//! let mut job = AsyncExtraction::new(4); // 4 worker threads
//!
//! // Start extracting (non-blocking)
//! job.start(volume, source, config, None);
//!
//! // Poll from the UI loop
//! if let Some(result) = job.poll() {
//!     let outcome = result?;
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::config::ExtractionConfig;
use super::process::{extract, ExtractionOutcome};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::graph::RootGraph;
use crate::grid::VoxelGrid;
use crate::threading::{TaskHandle, WorkerPool};

type Pending = (TaskHandle<Result<ExtractionOutcome>>, CancelToken);

fn spawn_extraction(
  pool: &WorkerPool,
  volume: Arc<VoxelGrid<f32>>,
  source: [i64; 3],
  config: ExtractionConfig,
  old_graph: Option<RootGraph>,
  cancel: CancelToken,
) -> Pending {
  let token = cancel.clone();
  let handle = pool.spawn(move || extract(volume, source, &config, old_graph.as_ref(), &token));
  (handle, cancel)
}

/// A single extraction running in the background.
///
/// Cancelling signals the running task through its token; the task stops at
/// the next phase boundary and its result is discarded.
pub struct AsyncExtraction {
  pool: WorkerPool,
  pending: Option<Pending>,
}

impl AsyncExtraction {
  /// Create with `num_threads` workers (0 = rayon global pool).
  pub fn new(num_threads: usize) -> Self {
    Self::with_pool(WorkerPool::new(num_threads))
  }

  pub fn default_threads() -> Self {
    Self::with_pool(WorkerPool::global())
  }

  /// Share an existing pool.
  pub fn with_pool(pool: WorkerPool) -> Self {
    Self { pool, pending: None }
  }

  pub fn is_busy(&self) -> bool {
    self.pending.is_some()
  }

  /// Start an extraction. Returns `false` if one is already running.
  pub fn start(
    &mut self,
    volume: Arc<VoxelGrid<f32>>,
    source: [i64; 3],
    config: ExtractionConfig,
    old_graph: Option<RootGraph>,
  ) -> bool {
    self.start_with_cancel(volume, source, config, old_graph, CancelToken::new())
  }

  /// Start with a caller-owned token.
  pub fn start_with_cancel(
    &mut self,
    volume: Arc<VoxelGrid<f32>>,
    source: [i64; 3],
    config: ExtractionConfig,
    old_graph: Option<RootGraph>,
    cancel: CancelToken,
  ) -> bool {
    if self.is_busy() {
      return false;
    }
    self.pending = Some(spawn_extraction(
      &self.pool, volume, source, config, old_graph, cancel,
    ));
    true
  }

  /// Non-blocking check. `Some` once the task finished.
  ///
  /// A task whose worker panicked is dropped and reports nothing.
  pub fn poll(&mut self) -> Option<Result<ExtractionOutcome>> {
    let (handle, _) = self.pending.as_mut()?;
    match handle.poll() {
      Some(result) => {
        self.pending = None;
        Some(result)
      }
      None => {
        if handle.is_lost() {
          self.pending = None;
        }
        None
      }
    }
  }

  /// Block until the running task finishes.
  pub fn wait(&mut self) -> Option<Result<ExtractionOutcome>> {
    let (handle, _) = self.pending.take()?;
    handle.wait()
  }

  /// Signal the running task and forget it.
  pub fn cancel(&mut self) {
    if let Some((_, token)) = self.pending.take() {
      token.cancel();
    }
  }

  pub fn num_threads(&self) -> usize {
    self.pool.num_threads()
  }

  pub fn pool(&self) -> &WorkerPool {
    &self.pool
  }
}

impl Default for AsyncExtraction {
  fn default() -> Self {
    Self::default_threads()
  }
}

// =============================================================================
// Batch Pipeline - several volumes concurrently
// =============================================================================

/// Batch identifier for tracking concurrent extractions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BatchId(u64);

impl BatchId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

/// Result of one batch entry.
pub struct BatchResult {
  pub batch_id: BatchId,
  pub outcome: Result<ExtractionOutcome>,
}

/// Runs independent extractions concurrently on a shared pool.
pub struct BatchPipeline {
  pool: WorkerPool,
  pending: Vec<(BatchId, Pending)>,
}

impl BatchPipeline {
  pub fn new(num_threads: usize) -> Self {
    Self::with_pool(WorkerPool::new(num_threads))
  }

  pub fn default_threads() -> Self {
    Self::with_pool(WorkerPool::global())
  }

  pub fn with_pool(pool: WorkerPool) -> Self {
    Self {
      pool,
      pending: Vec::new(),
    }
  }

  /// Submit an extraction (non-blocking).
  pub fn submit(
    &mut self,
    volume: Arc<VoxelGrid<f32>>,
    source: [i64; 3],
    config: ExtractionConfig,
    old_graph: Option<RootGraph>,
  ) -> BatchId {
    let batch_id = BatchId::next();
    let pending = spawn_extraction(&self.pool, volume, source, config, old_graph, CancelToken::new());
    self.pending.push((batch_id, pending));
    batch_id
  }

  /// Collect finished entries (non-blocking).
  pub fn poll(&mut self) -> Vec<BatchResult> {
    let mut completed = Vec::new();
    let mut still_pending = Vec::new();

    for (batch_id, (mut handle, token)) in self.pending.drain(..) {
      if let Some(outcome) = handle.poll() {
        completed.push(BatchResult { batch_id, outcome });
      } else if !handle.is_lost() {
        still_pending.push((batch_id, (handle, token)));
      }
    }

    self.pending = still_pending;
    completed
  }

  /// Block until every pending entry finishes.
  pub fn wait_all(&mut self) -> Vec<BatchResult> {
    self
      .pending
      .drain(..)
      .filter_map(|(batch_id, (handle, _))| {
        handle.wait().map(|outcome| BatchResult { batch_id, outcome })
      })
      .collect()
  }

  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  pub fn is_busy(&self) -> bool {
    !self.pending.is_empty()
  }

  /// Signal every pending entry and forget them.
  pub fn cancel_all(&mut self) {
    for (_, (_, token)) in self.pending.drain(..) {
      token.cancel();
    }
  }

  pub fn num_threads(&self) -> usize {
    self.pool.num_threads()
  }
}

impl Default for BatchPipeline {
  fn default() -> Self {
    Self::default_threads()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::test_utils::rod_volume;

  const ROD_SOURCE: [i64; 3] = [4, 4, 0];

  #[test]
  fn test_async_extraction_idle() {
    let mut job = AsyncExtraction::new(2);
    assert!(!job.is_busy());
    assert!(job.poll().is_none());
    assert!(job.wait().is_none());
  }

  #[test]
  fn test_async_extraction_completes() {
    let mut job = AsyncExtraction::new(2);
    assert!(job.start(rod_volume(), ROD_SOURCE, ExtractionConfig::DEFAULT, None));
    assert!(!job.start(rod_volume(), ROD_SOURCE, ExtractionConfig::DEFAULT, None));

    let mut result = None;
    for _ in 0..10_000 {
      if let Some(r) = job.poll() {
        result = Some(r);
        break;
      }
      std::thread::sleep(std::time::Duration::from_millis(1));
    }

    let outcome = result.unwrap().unwrap();
    assert!(!outcome.is_cancelled());
    assert!(outcome.graph().unwrap().node_count() > 1);
    assert!(!job.is_busy());
  }

  #[test]
  fn test_async_extraction_reports_errors() {
    let mut job = AsyncExtraction::new(1);
    job.start(rod_volume(), [99, 0, 0], ExtractionConfig::DEFAULT, None);
    let err = job.wait().unwrap().unwrap_err();
    assert!(err.is_input_error());
  }

  #[test]
  fn test_cancel_signals_token() {
    let mut job = AsyncExtraction::new(1);
    let token = CancelToken::new();
    job.start_with_cancel(rod_volume(), ROD_SOURCE, ExtractionConfig::DEFAULT, None, token.clone());
    job.cancel();
    assert!(token.is_cancelled());
    assert!(!job.is_busy());
  }

  #[test]
  fn test_batch_pipeline() {
    let mut pipeline = BatchPipeline::new(4);
    let id1 = pipeline.submit(rod_volume(), ROD_SOURCE, ExtractionConfig::DEFAULT, None);
    let id2 = pipeline.submit(rod_volume(), [4, 4, 11], ExtractionConfig::DEFAULT, None);
    assert_eq!(pipeline.pending_count(), 2);

    let mut results = Vec::new();
    for _ in 0..10_000 {
      results.extend(pipeline.poll());
      if results.len() >= 2 {
        break;
      }
      std::thread::sleep(std::time::Duration::from_millis(1));
    }

    assert_eq!(results.len(), 2);
    assert!(results.iter().any(|r| r.batch_id == id1));
    assert!(results.iter().any(|r| r.batch_id == id2));
    assert!(results.iter().all(|r| r.outcome.is_ok()));
    assert!(!pipeline.is_busy());
  }

  #[test]
  fn test_batch_wait_all_and_cancel() {
    let mut pipeline = BatchPipeline::new(2);
    pipeline.submit(rod_volume(), ROD_SOURCE, ExtractionConfig::DEFAULT, None);
    assert_eq!(pipeline.wait_all().len(), 1);

    pipeline.submit(rod_volume(), ROD_SOURCE, ExtractionConfig::DEFAULT, None);
    pipeline.cancel_all();
    assert_eq!(pipeline.pending_count(), 0);
  }
}
