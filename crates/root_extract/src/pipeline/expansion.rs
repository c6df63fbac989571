//! Iterative extraction inside a growing window around the source.
//!
//! Each iteration searches only inside an axis-aligned window centered on
//! the source, then grows the graph of the previous iteration. Voxels already
//! covered by the graph cost nothing in the next search, so new chains start
//! from the existing graph instead of from the source.
//!
//! ```text
//!   iteration:   1        2          3            last
//!              ┌───┐   ┌─────┐   ┌───────┐   ┌───────────┐
//!              │ s │   │  s  │   │   s   │   │     s     │ (whole grid)
//!              └───┘   └─────┘   └───────┘   └───────────┘
//! ```
//!
//! Window growth is linear or logarithmic (small steps first, large last).

use std::sync::Arc;

use super::config::ExtractionConfig;
use super::process::{Extraction, ExtractionOutcome, Phase};
use super::refinement::{refine_graph, RefineFields};
use super::session::{zero_cost_under_graph, ExtractionSession, Stage};
use crate::cancel::CancelToken;
use crate::cost::{ComparativeField, CostField};
use crate::error::{ExtractError, Result};
use crate::graph::RootGraph;
use crate::grid::{Coord, VoxelGrid};
use crate::path::{PathOutcome, PathSearch};
use crate::skeleton::{extract_skeleton, SkeletonInput, SkeletonStats};

/// How the window grows between iterations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExpansionMode {
  /// Equal steps.
  #[default]
  Linear,
  /// Each step doubles the previous one.
  Log,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionParams {
  /// Number of iterations; the last one covers the whole grid.
  pub iterations: usize,
  pub mode: ExpansionMode,
}

impl ExpansionParams {
  pub const DEFAULT: Self = Self {
    iterations: 4,
    mode: ExpansionMode::Linear,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  pub fn with_iterations(mut self, iterations: usize) -> Self {
    self.iterations = iterations;
    self
  }

  pub fn with_mode(mut self, mode: ExpansionMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.iterations == 0 {
      return Err(ExtractError::config("iterations", "must be >= 1"));
    }
    Ok(())
  }
}

impl Default for ExpansionParams {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Half-extent per axis of the window used at `step` (1-based).
///
/// `None` means the whole grid. Along each axis the window has to grow to
/// the distance from the source to the farther grid face.
pub fn window_half_extents(
  dims: [usize; 3],
  source: Coord,
  step: usize,
  params: &ExpansionParams,
) -> Option<[usize; 3]> {
  let iterations = params.iterations;
  if step >= iterations {
    return None;
  }
  let fraction = match params.mode {
    ExpansionMode::Linear => step as f64 / iterations as f64,
    // sum over k < step of 1 / 2^(iterations - k - 1)
    ExpansionMode::Log => (0..step)
      .map(|k| 0.5f64.powi((iterations - k - 1) as i32))
      .sum(),
  };
  Some(std::array::from_fn(|a| {
    let need = source[a].max(dims[a].saturating_sub(1 + source[a]));
    ((need as f64 * fraction).floor() as usize).min(need)
  }))
}

/// Set `cost` to infinity outside the inclusive window around `source`.
fn mask_outside_window(cost: &mut CostField, source: Coord, half: [usize; 3]) {
  let dims = cost.dims();
  let slice = cost.as_mut_slice();
  for (i, v) in slice.iter_mut().enumerate() {
    let c = [i / (dims[1] * dims[2]), (i / dims[2]) % dims[1], i % dims[2]];
    let outside = (0..3).any(|a| c[a].abs_diff(source[a]) > half[a]);
    if outside {
      *v = f32::INFINITY;
    }
  }
}

/// Extract a graph by growing it over `params.iterations` windowed searches.
///
/// Field stages run once. The path search and skeleton run per iteration,
/// and refinement runs once on the final graph.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "pipeline::expand"))]
pub fn expand_iteratively(
  volume: Arc<VoxelGrid<f32>>,
  source: [i64; 3],
  config: &ExtractionConfig,
  params: &ExpansionParams,
  cancel: &CancelToken,
) -> Result<ExtractionOutcome> {
  params.validate()?;
  let mut session = ExtractionSession::new(volume, source, *config)?;
  let ready = session.ensure(Stage::Comparative, cancel)? && session.ensure(Stage::Cost, cancel)?;
  let fields = session.shared_fields();
  let (radius, comparative, cost) = match fields {
    Some(fields) if ready => fields,
    _ => {
      return Ok(ExtractionOutcome::Cancelled {
        phase: session.cancelled_at().map_or(Phase::Cost, Phase::from),
        partial: None,
      })
    }
  };

  let volume = Arc::clone(session.volume());
  let src = session.source();
  let pool = session.pool().clone();
  let skeleton_params = config.skeleton.with_seed_from_old_leaves(false);
  let mut graph: Option<RootGraph> = None;
  let mut skeleton_stats = SkeletonStats::default();

  for step in 1..=params.iterations {
    let mut step_cost = (*cost).clone();
    if let Some(g) = &graph {
      zero_cost_under_graph(&mut step_cost, &volume, g, &pool);
    }
    let half = window_half_extents(step_cost.dims(), src, step, params);
    if let Some(half) = half {
      mask_outside_window(&mut step_cost, src, half);
    }

    let mut search = PathSearch::new(&step_cost, source, config.path, config.search_variant())?
      .with_cancel(cancel.clone());
    let PathOutcome::Completed { tree, .. } = search.run() else {
      return Ok(ExtractionOutcome::Cancelled {
        phase: Phase::PathSearch,
        partial: graph,
      });
    };

    let step_comparative = reached_only(&comparative, |c| tree.is_reached(c));
    let input = SkeletonInput {
      comparative: &step_comparative,
      radius: &radius,
      tree: &tree,
      source: src,
    };
    let out = pool.install(|| extract_skeleton(&input, &skeleton_params, graph.as_ref()))?;
    skeleton_stats += out.stats;

    #[cfg(feature = "tracing")]
    tracing::debug!(step, ?half, nodes = out.graph.node_count(), "expansion step");

    graph = Some(out.graph);
    if cancel.is_cancelled() {
      return Ok(ExtractionOutcome::Cancelled {
        phase: Phase::Skeleton,
        partial: graph,
      });
    }
  }

  let Some(mut graph) = graph else {
    return Err(ExtractError::config("iterations", "must be >= 1"));
  };
  let fields = config.refine.rebuild.map(|_| RefineFields {
    radius: &radius,
    cost: &cost,
    pool: &pool,
  });
  let progress = refine_graph(&mut graph, &config.refine, volume.dim_facs(), fields, cancel)?;
  if let Some(phase) = progress.cancelled_after {
    return Ok(ExtractionOutcome::Cancelled {
      phase,
      partial: Some(graph),
    });
  }
  Ok(ExtractionOutcome::Completed(Extraction {
    graph,
    skeleton: skeleton_stats,
    refine: progress.report,
  }))
}

/// Copy of `field` with unreached voxels zeroed.
fn reached_only(field: &ComparativeField, reached: impl Fn(Coord) -> bool) -> ComparativeField {
  let mut out = field.clone();
  for (i, v) in out.as_mut_slice().iter_mut().enumerate() {
    if !reached(field.coord_of(i)) {
      *v = 0.0;
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::test_utils::{y_volume, Y_SOURCE};

  const DIMS: [usize; 3] = [17, 17, 17];

  #[test]
  fn test_linear_windows() {
    let params = ExpansionParams::DEFAULT;
    let halves: Vec<_> = (1..=4)
      .map(|s| window_half_extents(DIMS, [0, 0, 0], s, &params).map(|h| h[0]))
      .collect();
    assert_eq!(halves, vec![Some(4), Some(8), Some(12), None]);
  }

  #[test]
  fn test_log_windows() {
    let params = ExpansionParams::DEFAULT.with_mode(ExpansionMode::Log);
    let halves: Vec<_> = (1..=4)
      .map(|s| window_half_extents(DIMS, [16, 16, 16], s, &params).map(|h| h[2]))
      .collect();
    assert_eq!(halves, vec![Some(2), Some(6), Some(14), None]);
  }

  #[test]
  fn test_window_follows_farther_face() {
    let params = ExpansionParams::DEFAULT.with_iterations(2);
    let half = window_half_extents([9, 21, 5], [2, 20, 2], 1, &params).unwrap();
    assert_eq!(half, [3, 10, 1]);
    assert_eq!(window_half_extents([9, 21, 5], [2, 20, 2], 2, &params), None);
  }

  #[test]
  fn test_mask_outside_window() {
    let mut cost = VoxelGrid::filled([5, 5, 5], 1.0f32);
    mask_outside_window(&mut cost, [2, 2, 2], [1, 1, 1]);
    assert_eq!(cost[[1, 3, 2]], 1.0);
    assert_eq!(cost[[0, 2, 2]], f32::INFINITY);
    assert_eq!(cost.as_slice().iter().filter(|v| v.is_finite()).count(), 27);
  }

  #[test]
  fn test_zero_iterations_rejected() {
    let params = ExpansionParams::DEFAULT.with_iterations(0);
    let err = expand_iteratively(
      y_volume(),
      Y_SOURCE,
      &ExtractionConfig::DEFAULT,
      &params,
      &CancelToken::new(),
    )
    .unwrap_err();
    assert!(err.is_config_error());
  }

  #[test]
  fn test_expansion_grows_connected_graph() {
    let outcome = expand_iteratively(
      y_volume(),
      Y_SOURCE,
      &ExtractionConfig::DEFAULT,
      &ExpansionParams::DEFAULT,
      &CancelToken::new(),
    )
    .unwrap();
    let g = outcome.into_graph().unwrap();
    assert!(g.is_well_formed());
    assert!(g.node_count() > 10);
    assert_eq!(g[g.root()].position, glam::Vec3::new(8.0, 4.0, 0.0));
  }

  #[test]
  fn test_single_iteration_matches_one_shot_extraction() {
    let config = ExtractionConfig::DEFAULT;
    let params = ExpansionParams::DEFAULT.with_iterations(1);
    let token = CancelToken::new();
    let expanded = expand_iteratively(y_volume(), Y_SOURCE, &config, &params, &token)
      .unwrap()
      .into_graph()
      .unwrap();
    let direct = super::super::process::extract(y_volume(), Y_SOURCE, &config, None, &token)
      .unwrap()
      .into_graph()
      .unwrap();
    assert_eq!(expanded.node_count(), direct.node_count());
  }

  #[test]
  fn test_cancelled_expansion() {
    let token = CancelToken::new();
    token.cancel();
    let outcome = expand_iteratively(
      y_volume(),
      Y_SOURCE,
      &ExtractionConfig::DEFAULT,
      &ExpansionParams::DEFAULT,
      &token,
    )
    .unwrap();
    assert!(matches!(
      outcome,
      ExtractionOutcome::Cancelled {
        phase: Phase::Radius,
        partial: None
      }
    ));
  }
}
