//! Memoized extraction stages for one volume.
//!
//! ```text
//!            ┌────────┐
//! volume ───►│ Radius ├───────┬──────────────────┐
//!            └───┬────┘       │                  │
//!                ▼            ▼                  │
//!        ┌─────────────┐  ┌──────┐               │
//!        │ Comparative │  │ Cost │◄── old graph  │
//!        └──────┬──────┘  └──┬───┘   (extension) │
//!               │            ▼                   │
//!               │        ┌───────┐               │
//!               │        │ Paths │◄── source     │
//!               │        └───┬───┘               │
//!               ▼            ▼                   ▼
//!             ┌──────────────────────────────────────┐
//!             │               Skeleton               │◄── old graph
//!             └──────────────────────────────────────┘
//! ```
//!
//! Changing an input invalidates the stage that reads it and every stage
//! downstream of it. Releasing a stage only drops its buffer: the stage is
//! recomputed on demand with the same result, so downstream stays valid.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use web_time::Instant;

use super::config::ExtractionConfig;
use crate::cancel::CancelToken;
use crate::cost::{
  compute_comparative_field, compute_cost_field, compute_radius_field, ComparativeField, CostField,
  RadiusField,
};
use crate::error::{ExtractError, Result};
use crate::graph::{Node, RootGraph};
use crate::grid::{Coord, VoxelGrid};
use crate::path::{GapMap, PathOutcome, PathSearch, PathTree};
use crate::refine::mask_volume_by_graph;
use crate::skeleton::{extract_skeleton, SkeletonInput, SkeletonOutput};
use crate::threading::WorkerPool;

// =============================================================================
// SessionId
// =============================================================================

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque session identifier, unique within the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SessionId(u64);

impl SessionId {
  fn next() -> Self {
    Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

// =============================================================================
// Stage
// =============================================================================

/// A memoized step of the extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
  Radius,
  Comparative,
  Cost,
  Paths,
  Skeleton,
}

impl Stage {
  /// All stages in dependency order.
  pub const ALL: [Stage; 5] = [
    Stage::Radius,
    Stage::Comparative,
    Stage::Cost,
    Stage::Paths,
    Stage::Skeleton,
  ];

  /// Direct upstream stages.
  pub const fn dependencies(self) -> &'static [Stage] {
    match self {
      Stage::Radius => &[],
      Stage::Comparative => &[Stage::Radius],
      Stage::Cost => &[Stage::Radius],
      Stage::Paths => &[Stage::Cost],
      Stage::Skeleton => &[Stage::Radius, Stage::Comparative, Stage::Paths],
    }
  }

  /// True if `other` is upstream of `self`, directly or transitively.
  pub fn depends_on(self, other: Stage) -> bool {
    self
      .dependencies()
      .iter()
      .any(|&d| d == other || d.depends_on(other))
  }

  #[inline]
  const fn slot(self) -> usize {
    self as usize
  }
}

// =============================================================================
// ExtractionSession
// =============================================================================

/// Inputs of one extraction plus the cached output of every stage.
///
/// # Example
///
/// ```ignore
/// let mut session = ExtractionSession::new(volume, [64, 64, 0], config)?;
/// let outcome = session.run(&CancelToken::new())?;
///
/// // Tweak the search and rerun: radius, comparative and cost are reused.
/// session.set_config(config.with_cost_cutoff(500.0))?;
/// session.release(Stage::Radius);
/// let outcome = session.run(&CancelToken::new())?;
/// ```
pub struct ExtractionSession {
  id: SessionId,
  volume: Arc<VoxelGrid<f32>>,
  source: Coord,
  config: ExtractionConfig,
  old_graph: Option<RootGraph>,
  pool: WorkerPool,

  radius: Option<Arc<RadiusField>>,
  comparative: Option<Arc<ComparativeField>>,
  cost: Option<Arc<CostField>>,
  paths: Option<Arc<PathTree>>,
  gaps: Option<Arc<GapMap>>,
  skeleton: Option<Arc<SkeletonOutput>>,

  runs: [u32; 5],
  run_micros: [u64; 5],
  cancelled_at: Option<Stage>,
}

impl ExtractionSession {
  pub fn new(volume: Arc<VoxelGrid<f32>>, source: [i64; 3], config: ExtractionConfig) -> Result<Self> {
    config.validate()?;
    if volume.is_empty() {
      return Err(ExtractError::DegenerateVolume {
        reason: "volume has no voxels",
      });
    }
    let source = volume.require_coord(source)?;
    Ok(Self {
      id: SessionId::next(),
      pool: WorkerPool::new(config.threads),
      volume,
      source,
      config,
      old_graph: None,
      radius: None,
      comparative: None,
      cost: None,
      paths: None,
      gaps: None,
      skeleton: None,
      runs: [0; 5],
      run_micros: [0; 5],
      cancelled_at: None,
    })
  }

  /// Grow onto (or seed from) `graph`.
  pub fn with_old_graph(mut self, graph: RootGraph) -> Self {
    self.set_old_graph(Some(graph));
    self
  }

  // ===========================================================================
  // Inputs
  // ===========================================================================

  pub fn id(&self) -> SessionId {
    self.id
  }

  pub fn volume(&self) -> &Arc<VoxelGrid<f32>> {
    &self.volume
  }

  pub fn source(&self) -> Coord {
    self.source
  }

  pub fn config(&self) -> &ExtractionConfig {
    &self.config
  }

  pub fn old_graph(&self) -> Option<&RootGraph> {
    self.old_graph.as_ref()
  }

  pub fn pool(&self) -> &WorkerPool {
    &self.pool
  }

  /// Replace the configuration, invalidating only the stages whose
  /// parameters changed.
  pub fn set_config(&mut self, config: ExtractionConfig) -> Result<()> {
    config.validate()?;
    let old = std::mem::replace(&mut self.config, config);
    if old.threads != config.threads {
      self.pool = WorkerPool::new(config.threads);
    }
    if old.radius != config.radius {
      self.invalidate(Stage::Radius);
    }
    if old.comparative_mask != config.comparative_mask {
      self.invalidate(Stage::Comparative);
    }
    let masking_changed = self.old_graph.is_some()
      && old.skeleton.seed_from_old_leaves != config.skeleton.seed_from_old_leaves;
    if old.cost != config.cost || masking_changed {
      self.invalidate(Stage::Cost);
    }
    if old.path != config.path
      || old.gap != config.gap
      || old.direction_penalty != config.direction_penalty
    {
      self.invalidate(Stage::Paths);
    }
    if old.skeleton != config.skeleton {
      self.invalidate(Stage::Skeleton);
    }
    Ok(())
  }

  pub fn set_source(&mut self, source: [i64; 3]) -> Result<()> {
    let source = self.volume.require_coord(source)?;
    if source != self.source {
      self.source = source;
      self.invalidate(Stage::Paths);
    }
    Ok(())
  }

  pub fn set_old_graph(&mut self, graph: Option<RootGraph>) {
    let masked_before = self.masks_cost();
    self.old_graph = graph;
    if masked_before || self.masks_cost() {
      self.invalidate(Stage::Cost);
    } else {
      self.invalidate(Stage::Skeleton);
    }
  }

  /// The cost field is zeroed under the old graph when growing onto it.
  fn masks_cost(&self) -> bool {
    self.old_graph.is_some() && !self.config.skeleton.seed_from_old_leaves
  }

  // ===========================================================================
  // Cache control
  // ===========================================================================

  /// Drop `stage` and everything downstream of it.
  pub fn invalidate(&mut self, stage: Stage) {
    for s in Stage::ALL {
      if s == stage || s.depends_on(stage) {
        self.drop_stage(s);
      }
    }
  }

  /// Drop the buffer of `stage` only. Downstream results stay cached.
  pub fn release(&mut self, stage: Stage) {
    self.drop_stage(stage);
  }

  /// Drop every cached buffer.
  pub fn reset_arena(&mut self) {
    for s in Stage::ALL {
      self.drop_stage(s);
    }
  }

  fn drop_stage(&mut self, stage: Stage) {
    match stage {
      Stage::Radius => self.radius = None,
      Stage::Comparative => self.comparative = None,
      Stage::Cost => self.cost = None,
      Stage::Paths => {
        self.paths = None;
        self.gaps = None;
      }
      Stage::Skeleton => self.skeleton = None,
    }
  }

  pub fn is_cached(&self, stage: Stage) -> bool {
    match stage {
      Stage::Radius => self.radius.is_some(),
      Stage::Comparative => self.comparative.is_some(),
      Stage::Cost => self.cost.is_some(),
      Stage::Paths => self.paths.is_some(),
      Stage::Skeleton => self.skeleton.is_some(),
    }
  }

  /// How many times `stage` has been computed in this session.
  pub fn stage_runs(&self, stage: Stage) -> u32 {
    self.runs[stage.slot()]
  }

  /// Bytes held by cached buffers.
  pub fn memory_footprint(&self) -> usize {
    let grids = [&self.radius, &self.comparative, &self.cost]
      .into_iter()
      .flatten()
      .map(|g| g.byte_size())
      .sum::<usize>();
    let paths = self.paths.as_ref().map_or(0, |t| t.byte_size());
    let gaps = self.gaps.as_ref().map_or(0, |g| g.byte_size());
    let skeleton = self.skeleton.as_ref().map_or(0, |s| {
      s.coverage.byte_size() + s.graph.node_count() * std::mem::size_of::<Node>()
    });
    grids + paths + gaps + skeleton
  }

  // ===========================================================================
  // Cached outputs
  // ===========================================================================

  pub fn radius_field(&self) -> Option<&RadiusField> {
    self.radius.as_deref()
  }

  pub fn comparative_field(&self) -> Option<&ComparativeField> {
    self.comparative.as_deref()
  }

  pub fn cost_field(&self) -> Option<&CostField> {
    self.cost.as_deref()
  }

  pub fn path_tree(&self) -> Option<&PathTree> {
    self.paths.as_deref()
  }

  /// Present after a gap-closing search.
  pub fn gap_map(&self) -> Option<&GapMap> {
    self.gaps.as_deref()
  }

  pub fn skeleton(&self) -> Option<&SkeletonOutput> {
    self.skeleton.as_deref()
  }

  pub(crate) fn shared_fields(
    &self,
  ) -> Option<(Arc<RadiusField>, Arc<ComparativeField>, Arc<CostField>)> {
    Some((
      Arc::clone(self.radius.as_ref()?),
      Arc::clone(self.comparative.as_ref()?),
      Arc::clone(self.cost.as_ref()?),
    ))
  }

  // ===========================================================================
  // Evaluation
  // ===========================================================================

  /// Make `stage` available, computing it and any missing upstream stage.
  ///
  /// Returns `Ok(false)` when `cancel` fired before or right after a stage
  /// was computed; [`cancelled_at`](Self::cancelled_at) names that stage.
  pub fn ensure(&mut self, stage: Stage, cancel: &CancelToken) -> Result<bool> {
    self.cancelled_at = None;
    Ok(match stage {
      Stage::Radius => self.radius_stage(cancel)?.is_some(),
      Stage::Comparative => self.comparative_stage(cancel)?.is_some(),
      Stage::Cost => self.cost_stage(cancel)?.is_some(),
      Stage::Paths => self.paths_stage(cancel)?.is_some(),
      Stage::Skeleton => self.skeleton_stage(cancel)?.is_some(),
    })
  }

  /// Stage at which the last [`ensure`](Self::ensure) observed cancellation.
  pub fn cancelled_at(&self) -> Option<Stage> {
    self.cancelled_at
  }

  /// Reset the per-run timing counters.
  pub(crate) fn begin_run(&mut self) {
    self.run_micros = [0; 5];
  }

  /// Compute time per stage since [`begin_run`](Self::begin_run), in
  /// [`Stage::ALL`] order. Cache hits count as zero.
  pub(crate) fn run_micros(&self) -> [u64; 5] {
    self.run_micros
  }

  #[inline]
  fn hit(&self, _stage: Stage) {
    #[cfg(feature = "tracing")]
    tracing::debug!(session = self.id.raw(), stage = ?_stage, "stage cache hit");
  }

  fn begin(&mut self, stage: Stage, cancel: &CancelToken) -> bool {
    if cancel.is_cancelled() {
      self.cancelled_at = Some(stage);
      return false;
    }
    true
  }

  fn finish(&mut self, stage: Stage, started: Instant, cancel: &CancelToken) -> bool {
    self.runs[stage.slot()] += 1;
    self.run_micros[stage.slot()] += started.elapsed().as_micros() as u64;
    self.begin(stage, cancel)
  }

  fn radius_stage(&mut self, cancel: &CancelToken) -> Result<Option<Arc<RadiusField>>> {
    if let Some(field) = &self.radius {
      let field = Arc::clone(field);
      self.hit(Stage::Radius);
      return Ok(Some(field));
    }
    if !self.begin(Stage::Radius, cancel) {
      return Ok(None);
    }
    let started = Instant::now();
    let field = Arc::new(compute_radius_field(&self.volume, &self.config.radius, &self.pool)?);
    self.radius = Some(Arc::clone(&field));
    Ok(self.finish(Stage::Radius, started, cancel).then_some(field))
  }

  fn comparative_stage(&mut self, cancel: &CancelToken) -> Result<Option<Arc<ComparativeField>>> {
    if let Some(field) = &self.comparative {
      let field = Arc::clone(field);
      self.hit(Stage::Comparative);
      return Ok(Some(field));
    }
    let Some(radius) = self.radius_stage(cancel)? else {
      return Ok(None);
    };
    if !self.begin(Stage::Comparative, cancel) {
      return Ok(None);
    }
    let started = Instant::now();
    let field = Arc::new(compute_comparative_field(
      &radius,
      self.config.comparative_mask,
      &self.pool,
    ));
    self.comparative = Some(Arc::clone(&field));
    Ok(self.finish(Stage::Comparative, started, cancel).then_some(field))
  }

  fn cost_stage(&mut self, cancel: &CancelToken) -> Result<Option<Arc<CostField>>> {
    if let Some(field) = &self.cost {
      let field = Arc::clone(field);
      self.hit(Stage::Cost);
      return Ok(Some(field));
    }
    let Some(radius) = self.radius_stage(cancel)? else {
      return Ok(None);
    };
    if !self.begin(Stage::Cost, cancel) {
      return Ok(None);
    }
    let started = Instant::now();
    let mut field = compute_cost_field(&self.volume, &radius, &self.config.cost, &self.pool)?;
    if self.masks_cost() {
      if let Some(old) = &self.old_graph {
        zero_cost_under_graph(&mut field, &self.volume, old, &self.pool);
      }
    }
    let field = Arc::new(field);
    self.cost = Some(Arc::clone(&field));
    Ok(self.finish(Stage::Cost, started, cancel).then_some(field))
  }

  fn paths_stage(&mut self, cancel: &CancelToken) -> Result<Option<Arc<PathTree>>> {
    if let Some(tree) = &self.paths {
      let tree = Arc::clone(tree);
      self.hit(Stage::Paths);
      return Ok(Some(tree));
    }
    let Some(cost) = self.cost_stage(cancel)? else {
      return Ok(None);
    };
    if !self.begin(Stage::Paths, cancel) {
      return Ok(None);
    }
    let started = Instant::now();
    let s = self.source;
    let mut search = PathSearch::new(
      &cost,
      [s[0] as i64, s[1] as i64, s[2] as i64],
      self.config.path,
      self.config.search_variant(),
    )?
    .with_cancel(cancel.clone());
    let PathOutcome::Completed { tree, gaps } = search.run() else {
      self.cancelled_at = Some(Stage::Paths);
      return Ok(None);
    };
    let tree = Arc::new(tree);
    self.paths = Some(Arc::clone(&tree));
    self.gaps = gaps.map(Arc::new);
    Ok(self.finish(Stage::Paths, started, cancel).then_some(tree))
  }

  fn skeleton_stage(&mut self, cancel: &CancelToken) -> Result<Option<Arc<SkeletonOutput>>> {
    if let Some(out) = &self.skeleton {
      let out = Arc::clone(out);
      self.hit(Stage::Skeleton);
      return Ok(Some(out));
    }
    let Some(radius) = self.radius_stage(cancel)? else {
      return Ok(None);
    };
    let Some(comparative) = self.comparative_stage(cancel)? else {
      return Ok(None);
    };
    let Some(tree) = self.paths_stage(cancel)? else {
      return Ok(None);
    };
    if !self.begin(Stage::Skeleton, cancel) {
      return Ok(None);
    }
    let started = Instant::now();
    let input = SkeletonInput {
      comparative: &comparative,
      radius: &radius,
      tree: &tree,
      source: self.source,
    };
    let params = &self.config.skeleton;
    let old = self.old_graph.as_ref();
    let out = Arc::new(self.pool.install(|| extract_skeleton(&input, params, old))?);
    self.skeleton = Some(Arc::clone(&out));
    Ok(self.finish(Stage::Skeleton, started, cancel).then_some(out))
  }
}

/// Zero `cost` under the filled rasterization of `graph`, restricted to
/// voxels where `volume` is positive.
pub(crate) fn zero_cost_under_graph(
  cost: &mut CostField,
  volume: &VoxelGrid<f32>,
  graph: &RootGraph,
  pool: &WorkerPool,
) {
  let empty = VoxelGrid::filled_like(cost, 0u8);
  let marks = pool.install(|| mask_volume_by_graph(&empty, graph, volume.dim_facs(), 1, 1.0));
  for ((c, &m), &v) in cost
    .as_mut_slice()
    .iter_mut()
    .zip(marks.as_slice())
    .zip(volume.as_slice())
  {
    if m == 1 && v > 0.0 {
      *c = 0.0;
    }
  }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
