//! Local structural and radius repairs.
//!
//! Skeleton tracing can leave a node claimed by two parents, parent links
//! that disagree with child lists, or runs of collapsed radii where chains
//! merged. Each pass fixes its problem in place and reports how many nodes
//! or links it touched.

use crate::graph::{NodeId, RootGraph};

/// Radii at or below this count as collapsed.
pub const THIN_RADIUS: f32 = 1.5;

/// Smallest radius a leaf is left with.
pub const MIN_TIP_RADIUS: f32 = 0.5;

/// Rebuild parent links from the child lists.
///
/// Child lists are authoritative. A node listed more than once (under one or
/// several parents) stays with the first parent reached from the root; the
/// other links are dropped. Nodes no longer reachable are freed. Returns the
/// number of repaired links plus freed nodes.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::repair_preds"))]
pub fn repair_preds(graph: &mut RootGraph) -> usize {
  let live = graph.ids();
  let slots = live.iter().map(|id| id.index() + 1).max().unwrap_or(0);
  let mut seen = vec![false; slots];
  let mut fixes = 0;

  let root = graph.root();
  if graph.parent(root).is_some() {
    graph.set_parent_unchecked(root, None);
    fixes += 1;
  }
  seen[root.index()] = true;

  let mut stack = vec![root];
  while let Some(id) = stack.pop() {
    let listed: Vec<NodeId> = graph.children(id).to_vec();
    let mut kept = Vec::with_capacity(listed.len());
    for c in listed.iter().copied() {
      if graph.contains(c) && !std::mem::replace(&mut seen[c.index()], true) {
        kept.push(c);
      }
    }
    if kept.len() != listed.len() {
      fixes += listed.len() - kept.len();
      graph.set_children_unchecked(id, &kept);
    }
    for &c in &kept {
      if graph.parent(c) != Some(id) {
        graph.set_parent_unchecked(c, Some(id));
        fixes += 1;
      }
    }
    stack.extend(kept.into_iter().rev());
  }

  for id in live {
    if !seen[id.index()] && graph.take(id).is_some() {
      fixes += 1;
    }
  }
  fixes
}

/// Re-interpolate collapsed radii along first-child chains.
///
/// A run of consecutive non-leaf nodes with `radius <= THIN_RADIUS` is
/// replaced by a linear ramp from the radius above the run (its parent, or
/// the run's own first radius at the root) to the radius of the node that
/// ends it. Leaves are left to [`repair_tips`]. Returns the number of
/// changed nodes.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::repair_radius"))]
pub fn repair_radius(graph: &mut RootGraph) -> usize {
  let order = graph.preorder();
  let total = order.len();
  let slots = order.iter().map(|id| id.index() + 1).max().unwrap_or(0);
  let mut done = vec![false; slots];
  let mut changed = 0;

  for id in order {
    if done[id.index()] || !is_thin_link(graph, id) {
      continue;
    }
    let mut run = vec![id];
    let mut cur = graph.children(id)[0];
    while is_thin_link(graph, cur) && !done[cur.index()] && run.len() < total {
      run.push(cur);
      cur = graph.children(cur)[0];
    }
    let start = graph.parent(id).map_or(graph[id].radius, |p| graph[p].radius);
    let end = graph[cur].radius;
    let steps = (run.len() + 1) as f32;
    for (i, &node) in run.iter().enumerate() {
      done[node.index()] = true;
      let ramp = start + (end - start) * (i + 1) as f32 / steps;
      if graph[node].radius != ramp {
        graph[node].radius = ramp;
        changed += 1;
      }
    }
  }
  changed
}

#[inline]
fn is_thin_link(graph: &RootGraph, id: NodeId) -> bool {
  graph
    .get(id)
    .is_some_and(|n| !n.is_leaf() && n.radius <= THIN_RADIUS)
}

/// Raise every leaf radius to at least `max(parent radius, MIN_TIP_RADIUS)`.
/// Returns the number of changed leaves.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::repair_tips"))]
pub fn repair_tips(graph: &mut RootGraph) -> usize {
  let mut changed = 0;
  for leaf in graph.leaves() {
    let floor = graph
      .parent(leaf)
      .map_or(MIN_TIP_RADIUS, |p| graph[p].radius.max(MIN_TIP_RADIUS));
    let node = &mut graph[leaf];
    if node.radius < floor {
      node.radius = floor;
      changed += 1;
    }
  }
  changed
}

#[cfg(test)]
#[path = "repair_test.rs"]
mod repair_test;
