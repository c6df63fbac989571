//! Tree construction from predecessor chains.
//!
//! ```text
//!   quench points (best first)
//!        │ covered? ── yes ──► skip
//!        ▼
//!   walk primary preds ──► first owned voxel (or the source)
//!        │
//!        ▼
//!   attach chain under the owner, new branch id
//!        │
//!        ▼
//!   per new node: coverage ball ceil(r * dilation), ownership ball ceil(r)
//! ```
//!
//! Ownership is overwritten by later nodes, so a chain joins the most
//! recently placed node near the voxel where it meets the tree.

use glam::Vec3;

use super::config::SkeletonParams;
use super::cut::CutPlane;
use super::quench::{self, QuenchPoint};
use crate::cost::{ComparativeField, RadiusField, SphereShells};
use crate::error::{ExtractError, Result};
use crate::graph::{Node, NodeId, RootGraph};
use crate::grid::{Coord, VoxelGrid};
use crate::path::PathTree;

/// Fields and search result the skeleton is built from. All grids share one
/// shape.
#[derive(Clone, Copy, Debug)]
pub struct SkeletonInput<'a> {
  pub comparative: &'a ComparativeField,
  pub radius: &'a RadiusField,
  pub tree: &'a PathTree,
  pub source: Coord,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkeletonStats {
  pub quench_points: usize,
  /// Chains attached to the tree.
  pub traces: usize,
  /// Chains that left the kept region or ran into an unreached voxel.
  pub discarded: usize,
  /// Quench points already covered when their turn came.
  pub skipped_covered: usize,
  pub nodes_added: usize,
}

impl std::ops::AddAssign for SkeletonStats {
  fn add_assign(&mut self, other: Self) {
    self.quench_points += other.quench_points;
    self.traces += other.traces;
    self.discarded += other.discarded;
    self.skipped_covered += other.skipped_covered;
    self.nodes_added += other.nodes_added;
  }
}

#[derive(Clone, Debug)]
pub struct SkeletonOutput {
  pub graph: RootGraph,
  /// `1` wherever a coverage ball was stamped.
  pub coverage: VoxelGrid<u8>,
  pub stats: SkeletonStats,
}

/// Build a root graph from the primary predecessor chains of `input.tree`.
///
/// With `old_graph` and without `seed_from_old_leaves`, the old graph is
/// copied and new chains are grown onto it. With `seed_from_old_leaves`, a
/// fresh graph is traced from the old graph's leaves.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "skeleton::extract"))]
pub fn extract_skeleton(
  input: &SkeletonInput<'_>,
  params: &SkeletonParams,
  old_graph: Option<&RootGraph>,
) -> Result<SkeletonOutput> {
  params.validate()?;
  validate_input(input, params)?;
  let seed_graph = match (params.seed_from_old_leaves, old_graph) {
    (true, None) => return Err(ExtractError::MissingOldGraph),
    (true, Some(old)) => Some(old),
    (false, _) => None,
  };
  let extend = old_graph.filter(|_| seed_graph.is_none());

  let mut builder = Builder::new(input, params, extend);
  if let Some(old) = extend {
    builder.stamp_existing(old);
  }

  let points = match seed_graph {
    Some(old) => {
      quench::from_old_leaves(old, input.radius, input.tree, &builder.coverage, params)
    }
    None => quench::from_comparative(input.comparative, input.tree, input.source, params),
  };
  builder.stats.quench_points = points.len();

  for qp in points {
    builder.consume(qp)?;
  }
  Ok(builder.finish())
}

fn validate_input(input: &SkeletonInput<'_>, params: &SkeletonParams) -> Result<()> {
  input.radius.require_same_shape(input.comparative)?;
  let dims = input.radius.dims();
  if input.tree.dims() != dims {
    return Err(ExtractError::SizeMismatch {
      expected: input.radius.len(),
      actual: input.tree.dims().iter().product(),
    });
  }
  let s = input.source;
  input
    .radius
    .require_coord([s[0] as i64, s[1] as i64, s[2] as i64])?;
  if params.cut_plane.is_some_and(|p| !p.keeps(s, dims)) {
    return Err(ExtractError::SourceInCutRegion { coord: s });
  }
  Ok(())
}

struct Builder<'a> {
  input: &'a SkeletonInput<'a>,
  dims: [usize; 3],
  cut: Option<CutPlane>,
  dilation: f32,
  shells: SphereShells,
  graph: RootGraph,
  coverage: VoxelGrid<u8>,
  owner: VoxelGrid<Option<NodeId>>,
  next_branch: u32,
  stats: SkeletonStats,
}

impl<'a> Builder<'a> {
  fn new(
    input: &'a SkeletonInput<'a>,
    params: &SkeletonParams,
    old: Option<&RootGraph>,
  ) -> Self {
    let dims = input.radius.dims();
    let old_max = old.map_or(0.0, RootGraph::max_radius);
    let max_ball = (input.radius.max_value().max(old_max) * params.dilation).ceil() as usize + 1;
    let shells = SphereShells::new(max_ball, input.radius.dim_facs());

    let mut coverage = VoxelGrid::filled_like(input.radius, 0u8);
    let mut owner = VoxelGrid::filled_like(input.radius, None);
    let (graph, next_branch) = match old {
      Some(old) => (old.clone(), old.max_branch_id() + 1),
      None => {
        let s = input.source;
        let graph = RootGraph::new(Node::new(coord_pos(s), input.radius[s], 0));
        coverage[s] = 1;
        owner[s] = Some(graph.root());
        (graph, 1)
      }
    };

    Self {
      input,
      dims,
      cut: params.cut_plane,
      dilation: params.dilation,
      shells,
      graph,
      coverage,
      owner,
      next_branch,
      stats: SkeletonStats::default(),
    }
  }

  /// Rasterize the copied graph: coverage `ceil(r * dilation)`, ownership
  /// `ceil(r / 2 * dilation)`.
  fn stamp_existing(&mut self, old: &RootGraph) {
    let stamps: Vec<(NodeId, Coord, f32)> = old
      .preorder()
      .into_iter()
      .filter_map(|id| {
        let p = old[id].position.round();
        let c = self
          .coverage
          .checked_coord([p.x as i64, p.y as i64, p.z as i64])?;
        Some((id, c, old[id].radius.max(0.0)))
      })
      .collect();
    for (id, c, r) in stamps {
      let cover = (r * self.dilation).ceil() as usize;
      let own = (r / 2.0 * self.dilation).ceil() as usize;
      self.stamp(id, c, cover, own);
    }
  }

  fn consume(&mut self, qp: QuenchPoint) -> Result<()> {
    if self.coverage[qp.coord] != 0 {
      self.stats.skipped_covered += 1;
      return Ok(());
    }
    let Some((anchor, chain)) = self.walk(qp.coord) else {
      self.stats.discarded += 1;
      #[cfg(feature = "tracing")]
      tracing::debug!(qp = ?qp.coord, "trace discarded");
      return Ok(());
    };

    let branch = self.next_branch;
    self.next_branch += 1;
    let mut parent = anchor;
    for &c in chain.iter().rev() {
      let r = self.input.radius[c].max(0.0);
      parent = self
        .graph
        .add_child(parent, Node::new(coord_pos(c), r, branch))?;
      self.stamp(parent, c, (r * self.dilation).ceil() as usize, r.ceil() as usize);
    }
    self.stats.traces += 1;
    self.stats.nodes_added += chain.len();
    Ok(())
  }

  /// Voxels from `start` up to (excluding) the first owned voxel, with that
  /// voxel's owner. `None` when the chain leaves the kept region, hits an
  /// unreached voxel, or adds nothing.
  fn walk(&self, start: Coord) -> Option<(NodeId, Vec<Coord>)> {
    let tree = self.input.tree;
    let mut chain = Vec::new();
    let mut cur = start;
    let anchor = loop {
      if let Some(id) = self.owner[cur] {
        break id;
      }
      if cur == self.input.source {
        break self.graph.root();
      }
      if self.cut.is_some_and(|p| !p.keeps(cur, self.dims)) || chain.len() >= self.coverage.len() {
        return None;
      }
      chain.push(cur);
      cur = tree.predecessor(cur)?;
    };
    (!chain.is_empty()).then_some((anchor, chain))
  }

  fn stamp(&mut self, id: NodeId, center: Coord, cover: usize, own: usize) {
    for o in self.shells.ball(cover) {
      if let Some(c) = self.coverage.offset(center, o) {
        self.coverage[c] = 1;
      }
    }
    for o in self.shells.ball(own) {
      if let Some(c) = self.owner.offset(center, o) {
        self.owner[c] = Some(id);
      }
    }
  }

  fn finish(self) -> SkeletonOutput {
    SkeletonOutput {
      graph: self.graph,
      coverage: self.coverage,
      stats: self.stats,
    }
  }
}

#[inline]
fn coord_pos(c: Coord) -> Vec3 {
  Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32)
}

#[cfg(test)]
#[path = "build_test.rs"]
mod build_test;
