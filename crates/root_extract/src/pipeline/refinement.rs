//! Ordered refinement of a freshly built skeleton.

use glam::Vec3;

use super::process::Phase;
use crate::cancel::CancelToken;
use crate::cost::{CostField, RadiusField};
use crate::error::Result;
use crate::graph::RootGraph;
use crate::refine::{
  evaluate_root_id, interpolate_graph, prune_short_branches, prune_thin_branches, rebuild_graph,
  repair_preds, repair_radius, repair_tips, RebuildStats, RefineParams,
};
use crate::threading::WorkerPool;

/// Fields and worker pool needed by the optional rebuild step.
#[derive(Clone, Copy, Debug)]
pub struct RefineFields<'a> {
  pub radius: &'a RadiusField,
  pub cost: &'a CostField,
  pub pool: &'a WorkerPool,
}

/// What each refinement step changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefineReport {
  pub repaired_preds: usize,
  pub repaired_radii: usize,
  pub repaired_tips: usize,
  pub rebuild: Option<RebuildStats>,
  pub pruned_short: usize,
  pub pruned_thin: usize,
  /// Number of branch ids after renumbering.
  pub branch_count: u32,
  /// Nodes dropped by interpolation.
  pub interpolated_away: usize,
}

/// Report plus the step after which cancellation was observed, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefineProgress {
  pub report: RefineReport,
  pub cancelled_after: Option<Phase>,
}

/// Run the refinement steps enabled in `params`, checking `cancel` after
/// each one. The rebuild step runs only when `fields` is given.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "pipeline::refine"))]
pub fn refine_graph(
  graph: &mut RootGraph,
  params: &RefineParams,
  dim_mults: Vec3,
  fields: Option<RefineFields<'_>>,
  cancel: &CancelToken,
) -> Result<RefineProgress> {
  params.validate()?;
  let mut report = RefineReport::default();
  let stop = |report: RefineReport, phase: Phase| {
    cancel.is_cancelled().then_some(RefineProgress {
      report,
      cancelled_after: Some(phase),
    })
  };

  if params.repair {
    report.repaired_preds = repair_preds(graph);
    report.repaired_radii = repair_radius(graph);
    report.repaired_tips = repair_tips(graph);
    if let Some(p) = stop(report, Phase::Repair) {
      return Ok(p);
    }
  }

  if let (Some(rebuild), Some(fields)) = (&params.rebuild, fields) {
    report.rebuild = Some(rebuild_graph(
      graph,
      fields.radius,
      fields.cost,
      dim_mults,
      rebuild,
      fields.pool,
    )?);
    if let Some(p) = stop(report, Phase::Rebuild) {
      return Ok(p);
    }
  }

  if params.min_branch_length > 0.0 {
    report.pruned_short = prune_short_branches(graph, params.min_branch_length, dim_mults);
    if let Some(p) = stop(report, Phase::PruneShort) {
      return Ok(p);
    }
  }

  if params.min_branch_radius > 0.0 {
    report.pruned_thin = prune_thin_branches(graph, params.min_branch_radius, dim_mults);
    if let Some(p) = stop(report, Phase::PruneThin) {
      return Ok(p);
    }
  }

  report.branch_count = evaluate_root_id(graph);

  if params.interpolate {
    if let Some(p) = stop(report, Phase::BranchIds) {
      return Ok(p);
    }
    let before = graph.node_count();
    *graph = interpolate_graph(graph, params.interpolation_max_diff);
    report.interpolated_away = before - graph.node_count();
  }

  #[cfg(feature = "tracing")]
  tracing::debug!(?report, nodes = graph.node_count(), "refinement finished");
  Ok(RefineProgress {
    report,
    cancelled_after: None,
  })
}
