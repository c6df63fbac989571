//! Bounded worker pool built on rayon.
//!
//! Per-voxel field computation runs inside [`WorkerPool::install`], so every
//! `par_iter` in the closure is limited to the pool's thread count. Whole
//! extractions run as tasks through [`WorkerPool::spawn`], and their results
//! come back over a crossbeam channel.
//!
//! # Usage
//!
//! ```ignore
//! let pool = WorkerPool::new(4);
//!
//! // Data-parallel work bounded to 4 threads
//! let marks = pool.install(|| mask_volume_by_graph(&volume, &graph, facs, 1, 1.0));
//!
//! // Fire-and-forget work, polled later
//! let mut handle = pool.spawn(move || session.run(&token));
//! if let Some(outcome) = handle.poll() {
//!     // Use outcome
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};

/// Unique identifier for a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

/// Rayon pool with an explicit thread bound.
///
/// `num_threads == 0` uses rayon's global pool. Clones share the same
/// underlying pool.
#[derive(Clone, Debug, Default)]
pub struct WorkerPool {
  pool: Option<Arc<rayon::ThreadPool>>,
}

impl WorkerPool {
  /// Create a pool with `num_threads` workers (0 = rayon global pool).
  ///
  /// Falls back to the global pool if the OS refuses to spawn threads.
  pub fn new(num_threads: usize) -> Self {
    if num_threads == 0 {
      return Self::global();
    }
    match rayon::ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|i| format!("root-extract-{i}"))
      .build()
    {
      Ok(pool) => Self {
        pool: Some(Arc::new(pool)),
      },
      Err(_err) => {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "falling back to global rayon pool");
        Self::global()
      }
    }
  }

  /// Use rayon's global pool.
  pub fn global() -> Self {
    Self { pool: None }
  }

  /// Run `op` inside the pool so nested parallel iterators use its threads.
  pub fn install<R, F>(&self, op: F) -> R
  where
    F: FnOnce() -> R + Send,
    R: Send,
  {
    match &self.pool {
      Some(pool) => pool.install(op),
      None => op(),
    }
  }

  /// Spawn a task on the pool (non-blocking).
  pub fn spawn<F, T>(&self, work: F) -> TaskHandle<T>
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let id = TaskId::next();
    let (tx, rx) = crossbeam_channel::bounded(1);
    let job = move || {
      // Receiver may be gone if the caller dropped the handle.
      let _ = tx.send(work());
    };
    match &self.pool {
      Some(pool) => pool.spawn(job),
      None => rayon::spawn(job),
    }
    TaskHandle {
      id,
      rx,
      lost: false,
    }
  }

  /// Number of worker threads available to `install` and `spawn`.
  pub fn num_threads(&self) -> usize {
    match &self.pool {
      Some(pool) => pool.current_num_threads(),
      None => rayon::current_num_threads(),
    }
  }
}

/// Receiving end of a spawned task.
pub struct TaskHandle<T> {
  id: TaskId,
  rx: Receiver<T>,
  lost: bool,
}

impl<T> TaskHandle<T> {
  pub fn id(&self) -> TaskId {
    self.id
  }

  /// Non-blocking check for the result.
  ///
  /// Returns `None` while running, and forever after the result has been
  /// taken or the worker panicked (see [`TaskHandle::is_lost`]).
  pub fn poll(&mut self) -> Option<T> {
    match self.rx.try_recv() {
      Ok(value) => Some(value),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        self.lost = true;
        None
      }
    }
  }

  /// Block until the task finishes. `None` if the worker panicked.
  pub fn wait(self) -> Option<T> {
    self.rx.recv().ok()
  }

  /// True once the worker dropped its sender without producing a value.
  pub fn is_lost(&self) -> bool {
    self.lost
  }
}
