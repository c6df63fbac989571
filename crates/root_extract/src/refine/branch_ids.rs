//! Branch id assignment by first-child continuation.
//!
//! ```text
//! root(0) ── a(0) ─┬─ b(0) ─┬─ d(0)
//!                  │        └─ e(1)
//!                  └─ c(2)
//! ```

use crate::graph::RootGraph;

/// Renumber branch ids in preorder. The root and its first-child chain get
/// 0; every further child starts the next id. Returns the number of ids.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::evaluate_root_id"))]
pub fn evaluate_root_id(graph: &mut RootGraph) -> u32 {
  let root = graph.root();
  graph[root].branch_id = 0;
  let mut next = 1;

  for id in graph.preorder() {
    let Some(parent) = graph.parent(id) else {
      continue;
    };
    graph[id].branch_id = if graph.children(parent).first() == Some(&id) {
      graph[parent].branch_id
    } else {
      let fresh = next;
      next += 1;
      fresh
    };
  }
  next
}
