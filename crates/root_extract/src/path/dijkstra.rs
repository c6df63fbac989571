//! Single-source Dijkstra over the voxel grid.
//!
//! # Variants
//!
//! ```text
//! Plain              w(a→b) = (c(a) + c(b)) / 2 * |offset * dim_facs|
//! DirectionPenalty   w(a→b) *= penalty   if step · incoming(a) < 0
//! GapClosing         gap voxels cost c / GAP_COST_SCALE for up to
//!                    gap_length consecutive voxels
//! ```
//!
//! The frontier is a binary min-heap with lazy deletion: improved voxels are
//! pushed again and stale entries are skipped on pop. Each voxel keeps its
//! best arrival (primary) and the best arrival from a different neighbor
//! (secondary).
//!
//! # State Machine
//!
//! ```text
//! Idle ──run()──► Running ──┬──► Completed
//!                           └──► Cancelled   (token observed between pops)
//! ```

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use glam::Vec3;

use super::config::{GapParams, PathParams};
use super::neighborhood::{Connectivity, PredCode, CANONICAL_OFFSETS};
use super::tree::{PathRecord, PathTree};
use crate::cancel::CancelToken;
use crate::cost::{CostField, GAP_COST_SCALE};
use crate::error::{ExtractError, Result};
use crate::grid::{Coord, VoxelGrid};

/// Bridge id per voxel, `-1` outside closed gaps.
pub type GapMap = VoxelGrid<i32>;

/// Heap pops between cancellation checks.
const CANCEL_POLL_INTERVAL: usize = 1 << 16;

/// Run marker for a gap voxel entered after the bridge budget ran out.
const BEYOND: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SearchVariant {
  Plain,
  DirectionPenalty(f32),
  GapClosing(GapParams),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
  Idle,
  Running,
  Completed,
  Cancelled,
}

#[derive(Debug)]
pub enum PathOutcome {
  Completed {
    tree: PathTree,
    /// Present for [`SearchVariant::GapClosing`].
    gaps: Option<GapMap>,
  },
  Cancelled,
}

/// A configured search over one cost field.
///
/// Every run allocates its own buffers, so several searches over the same
/// field can run on different threads.
pub struct PathSearch<'a> {
  cost: &'a CostField,
  source: Coord,
  params: PathParams,
  variant: SearchVariant,
  cancel: Option<CancelToken>,
  state: SearchState,
}

impl<'a> PathSearch<'a> {
  pub fn new(
    cost: &'a CostField,
    source: [i64; 3],
    params: PathParams,
    variant: SearchVariant,
  ) -> Result<Self> {
    params.validate()?;
    match variant {
      SearchVariant::Plain => {}
      SearchVariant::DirectionPenalty(penalty) => {
        if !(penalty > 0.0 && penalty.is_finite()) {
          return Err(ExtractError::config(
            "direction_penalty",
            "must be finite and positive",
          ));
        }
      }
      SearchVariant::GapClosing(gap) => gap.validate()?,
    }
    if cost.is_empty() {
      return Err(ExtractError::DegenerateVolume {
        reason: "cost field has no voxels",
      });
    }
    let source = cost.require_coord(source)?;
    Ok(Self {
      cost,
      source,
      params,
      variant,
      cancel: None,
      state: SearchState::Idle,
    })
  }

  /// Observe `token` while running.
  pub fn with_cancel(mut self, token: CancelToken) -> Self {
    self.cancel = Some(token);
    self
  }

  pub fn state(&self) -> SearchState {
    self.state
  }

  pub fn source(&self) -> Coord {
    self.source
  }

  /// Run the search from scratch.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "path::search"))]
  pub fn run(&mut self) -> PathOutcome {
    self.state = SearchState::Running;
    let mut frontier = Frontier::new(self.cost, self.source, &self.params, self.variant);
    if !frontier.expand(self.cancel.as_ref()) {
      #[cfg(feature = "tracing")]
      tracing::debug!(source = ?self.source, "path search cancelled");
      self.state = SearchState::Cancelled;
      return PathOutcome::Cancelled;
    }
    self.state = SearchState::Completed;
    let (tree, gaps) = frontier.finish();
    PathOutcome::Completed { tree, gaps }
  }
}

// =============================================================================
// Entry points
// =============================================================================

/// Plain shortest-path forest from `source`.
pub fn shortest_path(cost: &CostField, source: [i64; 3], params: &PathParams) -> Result<PathTree> {
  let search = PathSearch::new(cost, source, *params, SearchVariant::Plain)?;
  Ok(run_to_completion(&search).0)
}

/// Shortest-path forest that penalizes steps turning back against the
/// incoming direction.
pub fn shortest_path_with_direction_penalty(
  cost: &CostField,
  source: [i64; 3],
  params: &PathParams,
  dir_penalty: f32,
) -> Result<PathTree> {
  let search = PathSearch::new(
    cost,
    source,
    *params,
    SearchVariant::DirectionPenalty(dir_penalty),
  )?;
  Ok(run_to_completion(&search).0)
}

/// Shortest-path forest that bridges short runs of gap voxels.
pub fn shortest_path_with_gap_closing(
  cost: &CostField,
  source: [i64; 3],
  params: &PathParams,
  gap: &GapParams,
) -> Result<(PathTree, GapMap)> {
  let search = PathSearch::new(cost, source, *params, SearchVariant::GapClosing(*gap))?;
  let (tree, gaps) = run_to_completion(&search);
  let gaps = gaps.unwrap_or_else(|| VoxelGrid::filled_like(cost, -1));
  Ok((tree, gaps))
}

fn run_to_completion(search: &PathSearch<'_>) -> (PathTree, Option<GapMap>) {
  let mut frontier = Frontier::new(search.cost, search.source, &search.params, search.variant);
  frontier.expand(None);
  frontier.finish()
}

/// Optimal voxel route between two points.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
  /// `from` first, `to` last.
  pub voxels: Vec<Coord>,
  pub cost: f32,
}

/// Plain search restricted to the bounding box of `from` and `to` grown by
/// `margin` voxels. `None` when `to` is unreachable inside the box.
pub fn shortest_route(
  cost: &CostField,
  from: Coord,
  to: Coord,
  margin: usize,
  connectivity: Connectivity,
) -> Option<Route> {
  shortest_route_scaled(cost, from, to, margin, connectivity, cost.dim_facs())
}

/// [`shortest_route`] with step lengths scaled by `dim_facs` instead of the
/// grid's own factors.
pub fn shortest_route_scaled(
  cost: &CostField,
  from: Coord,
  to: Coord,
  margin: usize,
  connectivity: Connectivity,
  dim_facs: Vec3,
) -> Option<Route> {
  if !cost.contains(from) || !cost.contains(to) {
    return None;
  }
  let dims = cost.dims();
  let mut lo = [0usize; 3];
  let mut sub_dims = [0usize; 3];
  for a in 0..3 {
    lo[a] = from[a].min(to[a]).saturating_sub(margin);
    let hi = (from[a].max(to[a]) + margin).min(dims[a] - 1);
    sub_dims[a] = hi - lo[a] + 1;
  }
  let local = |c: Coord| [c[0] - lo[0], c[1] - lo[1], c[2] - lo[2]];
  let sub = VoxelGrid::from_fn(sub_dims, |c| cost[[c[0] + lo[0], c[1] + lo[1], c[2] + lo[2]]])
    .with_dim_facs(dim_facs);

  let params = PathParams::DEFAULT
    .with_connectivity(connectivity)
    .with_cost_cutoff(f32::MAX);
  let mut frontier = Frontier::new(&sub, local(from), &params, SearchVariant::Plain);
  frontier.expand(None);
  let (tree, _) = frontier.finish();

  let target = local(to);
  if !tree.is_reached(target) {
    return None;
  }
  let mut voxels: Vec<Coord> = tree
    .chain(target)
    .into_iter()
    .map(|c| [c[0] + lo[0], c[1] + lo[1], c[2] + lo[2]])
    .collect();
  voxels.reverse();
  Some(Route {
    voxels,
    cost: tree.cost(target),
  })
}

// =============================================================================
// Frontier
// =============================================================================

/// Total order over `f32` for the heap.
#[derive(Clone, Copy, Debug, PartialEq)]
struct OrdF32(f32);

impl Eq for OrdF32 {}

impl PartialOrd for OrdF32 {
  #[inline]
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for OrdF32 {
  #[inline]
  fn cmp(&self, other: &Self) -> Ordering {
    self.0.total_cmp(&other.0)
  }
}

struct GapState {
  /// Voxels at or above this cost are gap voxels.
  threshold: f32,
  max_run: u32,
  /// Consecutive bridged gap voxels ending at each primary arrival.
  run: Vec<u32>,
  labels: GapMap,
  next_label: i32,
}

impl GapState {
  fn new(cost: &CostField, gap: &GapParams) -> Self {
    let (min, max) = cost
      .as_slice()
      .iter()
      .filter(|v| v.is_finite())
      .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
      });
    let threshold = if max > min {
      min + (1.0 - gap.gap_fraction) * (max - min)
    } else {
      f32::INFINITY
    };
    Self {
      threshold,
      max_run: gap.gap_length,
      run: vec![0; cost.len()],
      labels: VoxelGrid::filled_like(cost, -1),
      next_label: 0,
    }
  }

  #[inline]
  fn is_bridged(&self, i: usize) -> bool {
    let r = self.run[i];
    r >= 1 && r <= self.max_run
  }

  /// Charged cost and run length for entering a voxel of `raw` cost from a
  /// voxel whose run is `from_run`.
  #[inline]
  fn charge(&self, raw: f32, from_run: u32) -> (f32, u32) {
    if raw < self.threshold {
      (raw, 0)
    } else if from_run < self.max_run {
      (raw / GAP_COST_SCALE, from_run + 1)
    } else {
      (raw, BEYOND)
    }
  }
}

struct Frontier<'a> {
  cost: &'a CostField,
  source: Coord,
  cutoff: f32,
  connectivity: Connectivity,
  step_len: [f32; 26],
  dir_penalty: Option<f32>,
  primary: VoxelGrid<PathRecord>,
  secondary: VoxelGrid<PathRecord>,
  settled: Vec<bool>,
  heap: BinaryHeap<Reverse<(OrdF32, usize)>>,
  gap: Option<GapState>,
}

impl<'a> Frontier<'a> {
  fn new(cost: &'a CostField, source: Coord, params: &PathParams, variant: SearchVariant) -> Self {
    let cutoff = params.cost_cutoff;
    let mut step_len = [0.0_f32; 26];
    for (len, &offset) in step_len.iter_mut().zip(CANONICAL_OFFSETS.iter()) {
      *len = cost.scaled_length(offset);
    }
    let (dir_penalty, gap) = match variant {
      SearchVariant::Plain => (None, None),
      SearchVariant::DirectionPenalty(p) => (Some(p), None),
      SearchVariant::GapClosing(g) => (None, Some(GapState::new(cost, &g))),
    };

    let mut primary = VoxelGrid::filled_like(cost, PathRecord::unreached(cutoff));
    let mut secondary = primary.clone();
    primary[source] = PathRecord::SOURCE;
    secondary[source] = PathRecord::SOURCE;

    let mut heap = BinaryHeap::new();
    heap.push(Reverse((OrdF32(0.0), cost.index_of(source))));

    Self {
      cost,
      source,
      cutoff,
      connectivity: params.connectivity,
      step_len,
      dir_penalty,
      primary,
      secondary,
      settled: vec![false; cost.len()],
      heap,
      gap,
    }
  }

  /// Settle voxels until the heap drains. `false` if cancelled.
  fn expand(&mut self, cancel: Option<&CancelToken>) -> bool {
    let mut pops = 0usize;
    while let Some(Reverse((OrdF32(dist), i))) = self.heap.pop() {
      pops += 1;
      if pops % CANCEL_POLL_INTERVAL == 0 && cancel.is_some_and(CancelToken::is_cancelled) {
        return false;
      }
      if self.settled[i] || dist > self.primary.as_slice()[i].cost {
        continue;
      }
      self.settled[i] = true;
      if self.gap.is_some() {
        self.label_gap(i);
      }
      self.relax(i, dist);
    }
    true
  }

  fn relax(&mut self, i: usize, dist: f32) {
    let cost = self.cost;
    let c = cost.coord_of(i);
    let costs = cost.as_slice();
    let from = self.primary.as_slice()[i];
    let from_run = self.gap.as_ref().map_or(0, |g| g.run[i]);
    let cost_a = match &self.gap {
      Some(g) if g.is_bridged(i) => costs[i] / GAP_COST_SCALE,
      _ => costs[i],
    };

    for &k in self.connectivity.codes() {
      let k = k as usize;
      let step = CANONICAL_OFFSETS[k];
      let Some(n) = cost.offset(c, step) else {
        continue;
      };
      let j = cost.index_of(n);
      if self.settled[j] {
        continue;
      }
      let (cost_b, run_b) = match &self.gap {
        Some(g) => g.charge(costs[j], from_run),
        None => (costs[j], 0),
      };
      let mut weight = (cost_a + cost_b) * 0.5 * self.step_len[k];
      if let Some(penalty) = self.dir_penalty {
        if turns_back(from.pred, step) {
          weight *= penalty;
        }
      }
      let candidate = dist + weight;
      // Also drops NaN.
      if !(candidate <= self.cutoff) {
        continue;
      }
      let code = PredCode::from_index(25 - k as u8).unwrap_or(PredCode::INVALID);
      self.offer(j, candidate, code, run_b);
    }
  }

  fn offer(&mut self, j: usize, cost: f32, code: PredCode, run: u32) {
    let incoming = PathRecord { cost, pred: code };
    let current = self.primary.as_slice()[j];
    if better(incoming, current) {
      if current.pred.is_reached() && current.pred != code {
        self.secondary.as_mut_slice()[j] = current;
      }
      self.primary.as_mut_slice()[j] = incoming;
      if let Some(g) = self.gap.as_mut() {
        g.run[j] = run;
      }
      self.heap.push(Reverse((OrdF32(cost), j)));
    } else if code != current.pred && better(incoming, self.secondary.as_slice()[j]) {
      self.secondary.as_mut_slice()[j] = incoming;
    }
  }

  /// Label the bridged run that ends just before the settled voxel `i`.
  fn label_gap(&mut self, i: usize) {
    let Some(gap) = self.gap.as_mut() else {
      return;
    };
    if gap.run[i] != 0 {
      return;
    }
    let mut run = Vec::new();
    let mut cur = self.cost.coord_of(i);
    let mut existing = None;
    loop {
      let Some(offset) = self.primary[cur].pred.offset() else {
        break;
      };
      let Some(prev) = self.cost.offset(cur, offset) else {
        break;
      };
      let p = self.cost.index_of(prev);
      if !gap.is_bridged(p) {
        break;
      }
      let label = gap.labels.as_slice()[p];
      if label >= 0 {
        existing = Some(label);
        break;
      }
      run.push(p);
      cur = prev;
    }
    if run.is_empty() {
      return;
    }
    let label = existing.unwrap_or_else(|| {
      let id = gap.next_label;
      gap.next_label += 1;
      id
    });
    for p in run {
      gap.labels.as_mut_slice()[p] = label;
    }
  }

  fn finish(self) -> (PathTree, Option<GapMap>) {
    let tree = PathTree::new(
      self.primary,
      self.secondary,
      self.source,
      self.cutoff,
      self.connectivity,
    );
    (tree, self.gap.map(|g| g.labels))
  }
}

/// Lower cost wins, equal cost falls back to the lower canonical index.
#[inline]
fn better(a: PathRecord, b: PathRecord) -> bool {
  a.cost < b.cost || (a.cost == b.cost && a.pred < b.pred)
}

/// True when `step` has a negative dot product with the direction the voxel
/// was entered from.
#[inline]
fn turns_back(pred: PredCode, step: [i32; 3]) -> bool {
  match pred.offset() {
    // Incoming direction is the negated predecessor offset.
    Some(back) => back[0] * step[0] + back[1] * step[1] + back[2] * step[2] > 0,
    None => false,
  }
}

#[cfg(test)]
#[path = "dijkstra_test.rs"]
mod dijkstra_test;
