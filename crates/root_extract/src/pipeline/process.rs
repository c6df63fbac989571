//! Extraction orchestrator.
//!
//! Runs the memoized stages of an [`ExtractionSession`] and then the ordered
//! refinement, checking the cancel token after every phase:
//!
//! ```text
//! Radius ─► Comparative ─► Cost ─► PathSearch ─► Skeleton ─► refinement
//!                            ▲                                   │
//!                            └─ cancel checks at each arrow ─────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let token = CancelToken::new();
//! match extract(volume, [64, 64, 0], &config, None, &token)? {
//!     ExtractionOutcome::Completed(done) => save_graph(&done.graph, path)?,
//!     ExtractionOutcome::Cancelled { phase, .. } => tracing::info!(?phase, "extraction stopped"),
//! }
//! ```

use std::sync::Arc;

use web_time::Instant;

use super::config::ExtractionConfig;
use super::refinement::{refine_graph, RefineFields, RefineReport};
use super::session::{ExtractionSession, Stage};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::graph::RootGraph;
use crate::grid::VoxelGrid;
use crate::skeleton::SkeletonStats;

/// Step of an extraction, used to report where a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
  Radius,
  Comparative,
  Cost,
  PathSearch,
  Skeleton,
  Repair,
  Rebuild,
  PruneShort,
  PruneThin,
  BranchIds,
  Interpolate,
}

impl From<Stage> for Phase {
  fn from(stage: Stage) -> Self {
    match stage {
      Stage::Radius => Phase::Radius,
      Stage::Comparative => Phase::Comparative,
      Stage::Cost => Phase::Cost,
      Stage::Paths => Phase::PathSearch,
      Stage::Skeleton => Phase::Skeleton,
    }
  }
}

/// A finished extraction.
#[derive(Clone, Debug)]
pub struct Extraction {
  pub graph: RootGraph,
  pub skeleton: SkeletonStats,
  pub refine: RefineReport,
}

#[derive(Clone, Debug)]
pub enum ExtractionOutcome {
  Completed(Extraction),
  /// `phase` was running or had just finished when cancellation was seen.
  /// `partial` is the graph as of the last finished step, if one exists.
  Cancelled {
    phase: Phase,
    partial: Option<RootGraph>,
  },
}

impl ExtractionOutcome {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, Self::Cancelled { .. })
  }

  /// Final graph, or the partial one of a cancelled run.
  pub fn graph(&self) -> Option<&RootGraph> {
    match self {
      Self::Completed(done) => Some(&done.graph),
      Self::Cancelled { partial, .. } => partial.as_ref(),
    }
  }

  pub fn into_graph(self) -> Option<RootGraph> {
    match self {
      Self::Completed(done) => Some(done.graph),
      Self::Cancelled { partial, .. } => partial,
    }
  }
}

/// Timing of one extraction. Stages served from cache count as zero.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractionStats {
  pub radius_us: u64,
  pub comparative_us: u64,
  pub cost_us: u64,
  pub paths_us: u64,
  pub skeleton_us: u64,
  pub refine_us: u64,
  /// Total wall time in microseconds.
  pub total_us: u64,
  /// Nodes in the returned graph (final or partial).
  pub node_count: usize,
}

impl ExtractionStats {
  fn record_stages(&mut self, micros: [u64; 5]) {
    let [radius, comparative, cost, paths, skeleton] = micros;
    self.radius_us = radius;
    self.comparative_us = comparative;
    self.cost_us = cost;
    self.paths_us = paths;
    self.skeleton_us = skeleton;
  }
}

/// Extract a root graph from `volume`, starting at `source`.
///
/// With `old_graph` the new graph grows onto a copy of it (or is seeded from
/// its leaves, per `config.skeleton.seed_from_old_leaves`).
pub fn extract(
  volume: Arc<VoxelGrid<f32>>,
  source: [i64; 3],
  config: &ExtractionConfig,
  old_graph: Option<&RootGraph>,
  cancel: &CancelToken,
) -> Result<ExtractionOutcome> {
  Ok(extract_timed(volume, source, config, old_graph, cancel)?.0)
}

/// Same as [`extract`] but also returns timing stats.
pub fn extract_timed(
  volume: Arc<VoxelGrid<f32>>,
  source: [i64; 3],
  config: &ExtractionConfig,
  old_graph: Option<&RootGraph>,
  cancel: &CancelToken,
) -> Result<(ExtractionOutcome, ExtractionStats)> {
  let mut session = ExtractionSession::new(volume, source, *config)?;
  if let Some(old) = old_graph {
    session.set_old_graph(Some(old.clone()));
  }
  session.run_timed(cancel)
}

impl ExtractionSession {
  /// Run every stage not already cached, then refine a copy of the skeleton.
  pub fn run(&mut self, cancel: &CancelToken) -> Result<ExtractionOutcome> {
    Ok(self.run_timed(cancel)?.0)
  }

  pub fn run_timed(&mut self, cancel: &CancelToken) -> Result<(ExtractionOutcome, ExtractionStats)> {
    let start = Instant::now();
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("extract", session = self.id().raw()).entered();

    self.begin_run();
    let mut stats = ExtractionStats::default();
    let outcome = self.run_phases(cancel, &mut stats)?;
    stats.record_stages(self.run_micros());
    stats.node_count = outcome.graph().map_or(0, RootGraph::node_count);
    stats.total_us = start.elapsed().as_micros() as u64;
    Ok((outcome, stats))
  }

  fn run_phases(&mut self, cancel: &CancelToken, stats: &mut ExtractionStats) -> Result<ExtractionOutcome> {
    let refine = self.config().refine;
    let mut ready = self.ensure(Stage::Skeleton, cancel)?;
    if ready && refine.rebuild.is_some() {
      ready = self.ensure(Stage::Radius, cancel)? && self.ensure(Stage::Cost, cancel)?;
    }
    if !ready || cancel.is_cancelled() {
      let phase = self.cancelled_at().map_or(Phase::Skeleton, Phase::from);
      #[cfg(feature = "tracing")]
      tracing::debug!(?phase, "extraction cancelled");
      return Ok(ExtractionOutcome::Cancelled {
        phase,
        partial: self.skeleton().map(|s| s.graph.clone()),
      });
    }

    let Some(skeleton) = self.skeleton() else {
      return Ok(ExtractionOutcome::Cancelled {
        phase: Phase::Skeleton,
        partial: None,
      });
    };
    let mut graph = skeleton.graph.clone();
    let skeleton_stats = skeleton.stats;

    let refine_start = Instant::now();
    let fields = match (self.radius_field(), self.cost_field()) {
      (Some(radius), Some(cost)) if refine.rebuild.is_some() => Some(RefineFields {
        radius,
        cost,
        pool: self.pool(),
      }),
      _ => None,
    };
    let progress = refine_graph(&mut graph, &refine, self.volume().dim_facs(), fields, cancel)?;
    stats.refine_us = refine_start.elapsed().as_micros() as u64;

    if let Some(phase) = progress.cancelled_after {
      #[cfg(feature = "tracing")]
      tracing::debug!(?phase, "extraction cancelled during refinement");
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
}

#[cfg(test)]
#[path = "process_test.rs"]
mod process_test;
