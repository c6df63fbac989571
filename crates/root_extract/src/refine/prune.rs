//! Leaf-run pruning to a fixpoint.
//!
//! A leaf run is the chain from a leaf up to, but excluding, the first
//! ancestor that branches or is the root:
//!
//! ```text
//! root ── a ── J ─┬─ b ── c ── leaf1     run(leaf1) = [leaf1, c, b]
//!                 └─ leaf2               run(leaf2) = [leaf2]
//! ```
//!
//! Removing a run can turn its junction into the inner node of a longer run,
//! so passes repeat until none removes anything.

use glam::Vec3;

use crate::graph::{NodeId, RootGraph};

/// Chain hanging below a junction, leaf first.
#[derive(Clone, Debug)]
struct LeafRun {
  nodes: Vec<NodeId>,
  junction: NodeId,
}

impl LeafRun {
  #[inline]
  fn top(&self) -> NodeId {
    self.nodes[self.nodes.len() - 1]
  }

  /// Segments from the leaf up to and including the junction.
  fn segments<'g>(&'g self, graph: &'g RootGraph) -> impl Iterator<Item = (NodeId, NodeId)> + 'g {
    self
      .nodes
      .iter()
      .copied()
      .zip(self.nodes.iter().skip(1).copied().chain(std::iter::once(self.junction)))
      .filter(move |(a, b)| graph.contains(*a) && graph.contains(*b))
  }

  fn length(&self, graph: &RootGraph, dim_mults: Vec3) -> f32 {
    self
      .segments(graph)
      .map(|(a, b)| ((graph[b].position - graph[a].position) * dim_mults).length())
      .sum()
  }

  /// Length-weighted mean of segment midpoint radii. Falls back to the plain
  /// mean of the run's radii when the run has no length.
  fn mean_radius(&self, graph: &RootGraph, dim_mults: Vec3) -> f32 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (a, b) in self.segments(graph) {
      let (na, nb) = (&graph[a], &graph[b]);
      let d = ((nb.position - na.position) * dim_mults).length();
      weighted += (na.radius + nb.radius) * 0.5 * d;
      total += d;
    }
    if total > 0.0 {
      return weighted / total;
    }
    self.nodes.iter().map(|&id| graph[id].radius).sum::<f32>() / self.nodes.len() as f32
  }
}

fn leaf_runs(graph: &RootGraph) -> Vec<LeafRun> {
  let root = graph.root();
  graph
    .leaves()
    .into_iter()
    .filter(|&leaf| leaf != root)
    .filter_map(|leaf| {
      let mut nodes = vec![leaf];
      let mut cur = leaf;
      loop {
        let parent = graph.parent(cur)?;
        if parent == root || graph.children(parent).len() > 1 {
          return Some(LeafRun { nodes, junction: parent });
        }
        nodes.push(parent);
        cur = parent;
      }
    })
    .collect()
}

/// Remove runs rejected by `keep` until none is. Returns removed nodes.
fn prune_runs(graph: &mut RootGraph, keep: impl Fn(&RootGraph, &LeafRun) -> bool) -> usize {
  let mut removed = 0;
  loop {
    let doomed: Vec<NodeId> = leaf_runs(graph)
      .into_iter()
      .filter(|run| !keep(graph, run))
      .map(|run| run.top())
      .collect();
    if doomed.is_empty() {
      return removed;
    }
    for top in doomed {
      removed += graph.remove_subtree(top);
    }
  }
}

/// Prune leaf runs shorter than `min_len`, lengths scaled by `dim_mults`.
/// The root is never removed. Returns the number of removed nodes.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::prune_short"))]
pub fn prune_short_branches(graph: &mut RootGraph, min_len: f32, dim_mults: Vec3) -> usize {
  prune_runs(graph, |g, run| run.length(g, dim_mults) >= min_len)
}

/// Prune leaf runs whose length-weighted mean radius is below `min_radius`.
/// Returns the number of removed nodes.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::prune_thin"))]
pub fn prune_thin_branches(graph: &mut RootGraph, min_radius: f32, dim_mults: Vec3) -> usize {
  prune_runs(graph, |g, run| run.mean_radius(g, dim_mults) >= min_radius)
}

#[cfg(test)]
#[path = "prune_test.rs"]
mod prune_test;
