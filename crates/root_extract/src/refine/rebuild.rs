//! Local rerouting of edges that cut through expensive voxels.
//!
//! Each edge is compared against the optimal route between its endpoint
//! voxels, searched inside the edge's bounding box grown by a margin:
//!
//! ```text
//!   p ·········· c        straight line through high cost
//!   │            ▲
//!   └─ ─ ─ ─ ─ ─ ┘        optimal route, spliced in as new nodes
//! ```
//!
//! Searches are independent and run in parallel on the given pool; splicing
//! is sequential.

use glam::Vec3;
use rayon::prelude::*;

use super::config::RebuildParams;
use crate::cost::{CostField, RadiusField};
use crate::error::Result;
use crate::graph::{Node, NodeId, RootGraph};
use crate::grid::Coord;
use crate::path::shortest_route_scaled;
use crate::threading::WorkerPool;

/// Largest spacing, in voxels, between samples along a straight edge.
const LINE_SAMPLE_SPACING: f32 = 0.5;

/// Counts reported by [`rebuild_graph`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebuildStats {
  /// Edges whose endpoints fall in distinct grid voxels.
  pub edges_checked: usize,
  pub edges_rebuilt: usize,
  pub nodes_added: usize,
}

/// Replace every edge whose straight-line cost exceeds the local optimum by
/// `params.max_cost_ratio` with the optimal voxel route. New nodes take their
/// radius from `radius` and the branch id of the edge's child.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::rebuild_graph"))]
pub fn rebuild_graph(
  graph: &mut RootGraph,
  radius: &RadiusField,
  cost: &CostField,
  dim_mults: Vec3,
  params: &RebuildParams,
  pool: &WorkerPool,
) -> Result<RebuildStats> {
  params.validate()?;
  radius.require_same_shape(cost)?;

  let edges: Vec<(NodeId, NodeId, Coord, Coord)> = graph
    .edges()
    .into_iter()
    .filter_map(|(p, c)| {
      let from = cost.checked_coord(voxel_of(graph[p].position))?;
      let to = cost.checked_coord(voxel_of(graph[c].position))?;
      (from != to).then_some((p, c, from, to))
    })
    .collect();

  let reroutes: Vec<(NodeId, NodeId, Vec<Coord>)> = pool.install(|| {
    edges
      .par_iter()
      .filter_map(|&(p, c, from, to)| {
        let line = line_cost(cost, &line_voxels(from, to), dim_mults);
        let route = shortest_route_scaled(cost, from, to, params.margin, params.connectivity, dim_mults)?;
        if route.voxels.len() <= 2 || line <= route.cost * params.max_cost_ratio {
          return None;
        }
        let interior = route.voxels[1..route.voxels.len() - 1].to_vec();
        Some((p, c, interior))
      })
      .collect()
  });

  let mut stats = RebuildStats {
    edges_checked: edges.len(),
    ..RebuildStats::default()
  };
  for (p, c, interior) in reroutes {
    let branch_id = graph[c].branch_id;
    let nodes = interior.iter().map(|&v| {
      Node::new(
        Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32),
        radius[v],
        branch_id,
      )
    });
    stats.nodes_added += graph.splice_between(p, c, nodes)?;
    stats.edges_rebuilt += 1;
  }

  #[cfg(feature = "tracing")]
  tracing::debug!(
    checked = stats.edges_checked,
    rebuilt = stats.edges_rebuilt,
    added = stats.nodes_added,
    "rebuild finished"
  );
  Ok(stats)
}

#[inline]
fn voxel_of(p: Vec3) -> [i64; 3] {
  let r = p.round();
  [r.x as i64, r.y as i64, r.z as i64]
}

/// Voxels hit by the segment `from`-`to`, consecutive duplicates removed.
fn line_voxels(from: Coord, to: Coord) -> Vec<Coord> {
  let a = Vec3::new(from[0] as f32, from[1] as f32, from[2] as f32);
  let b = Vec3::new(to[0] as f32, to[1] as f32, to[2] as f32);
  let steps = ((b - a).length() / LINE_SAMPLE_SPACING).ceil().max(1.0) as usize;

  let mut out: Vec<Coord> = Vec::with_capacity(steps + 1);
  for i in 0..=steps {
    let p = a.lerp(b, i as f32 / steps as f32).round();
    let v = [p.x as usize, p.y as usize, p.z as usize];
    if out.last() != Some(&v) {
      out.push(v);
    }
  }
  out
}

/// Path cost of `voxels` with the same edge weight as the path search.
fn line_cost(cost: &CostField, voxels: &[Coord], dim_mults: Vec3) -> f32 {
  voxels
    .windows(2)
    .map(|w| {
      let step = Vec3::new(
        w[1][0] as f32 - w[0][0] as f32,
        w[1][1] as f32 - w[0][1] as f32,
        w[1][2] as f32 - w[0][2] as f32,
      );
      (cost[w[0]] + cost[w[1]]) * 0.5 * (step * dim_mults).length()
    })
    .sum()
}
