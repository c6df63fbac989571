//! Graph refinement passes.
//!
//! Every pass works on a single `&mut RootGraph` and reports what it changed.
//! The extraction pipeline runs them in this order:
//!
//! ```text
//! repair_preds → repair_radius → repair_tips → [rebuild_graph]
//!   → prune_short_branches → prune_thin_branches → evaluate_root_id
//!   → [interpolate_graph]
//! ```
//!
//! # Module Structure
//!
//! - [`config`]: [`RefineParams`], [`RebuildParams`]
//! - [`repair`]: predecessor, radius and tip repairs
//! - [`prune`]: short and thin leaf-run pruning
//! - [`branch_ids`]: [`evaluate_root_id`]
//! - [`interpolate`]: Douglas-Peucker simplification
//! - [`rebuild`]: local rerouting of expensive edges
//! - [`mask`]: filled rasterization of a graph into a volume

pub mod branch_ids;
pub mod config;
pub mod interpolate;
pub mod mask;
pub mod prune;
pub mod rebuild;
pub mod repair;

// Re-exports
pub use branch_ids::evaluate_root_id;
pub use config::{RebuildParams, RefineParams};
pub use interpolate::interpolate_graph;
pub use mask::mask_volume_by_graph;
pub use prune::{prune_short_branches, prune_thin_branches};
pub use rebuild::{rebuild_graph, RebuildStats};
pub use repair::{repair_preds, repair_radius, repair_tips, MIN_TIP_RADIUS, THIN_RADIUS};
