//! Shortest-path forest over the cost field.
//!
//! One search settles every voxel reachable from the source within the cost
//! cutoff and records, per voxel, the cheapest arrival and the cheapest
//! arrival from a different neighbor. The skeleton builder later walks the
//! primary predecessor chains back to the source.
//!
//! # Module Structure
//!
//! - [`neighborhood`]: canonical offsets, [`Connectivity`], [`PredCode`]
//! - [`config`]: [`PathParams`], [`GapParams`]
//! - [`tree`]: [`PathTree`] result with chain walking
//! - [`dijkstra`]: [`PathSearch`] and the three search variants

pub mod config;
pub mod dijkstra;
pub mod neighborhood;
pub mod tree;

// Re-exports
pub use config::{GapParams, PathParams};
pub use dijkstra::{
  shortest_path, shortest_path_with_direction_penalty, shortest_path_with_gap_closing,
  shortest_route, shortest_route_scaled, GapMap, PathOutcome, PathSearch, Route, SearchState, SearchVariant,
};
pub use neighborhood::{Connectivity, PredCode, CANONICAL_OFFSETS};
pub use tree::{PathRecord, PathTree};
