//! Per-voxel scalar fields feeding the path search.
//!
//! ```text
//! ┌────────┐     ┌────────┐     ┌─────────────┐
//! │ Volume ├──┬─►│ Radius ├──┬─►│ Comparative │ ──► quench points
//! └────────┘  │  └────────┘  │  └─────────────┘
//!             │              │  ┌──────┐
//!             └──────────────┴─►│ Cost │ ──► path search
//!                               └──────┘
//! ```
//!
//! All three fields share the volume's dims and `dim_facs`. Radius and
//! comparative fields are computed per voxel in parallel on a
//! [`WorkerPool`](crate::threading::WorkerPool).

pub mod comparative;
pub mod config;
pub mod field;
pub mod radius;
pub mod sphere;

use crate::grid::VoxelGrid;

/// Local thickness in voxels, `[0, max_sphere_radius]`.
pub type RadiusField = VoxelGrid<f32>;

/// Relative radius score in `[0, 1]`; `1` marks a local maximum.
pub type ComparativeField = VoxelGrid<f32>;

/// Traversal cost, `>= 0`, lower is better.
pub type CostField = VoxelGrid<f32>;

// Re-exports
pub use comparative::compute_comparative_field;
pub use config::{CostParams, RadiusParams, DEFAULT_COMPARATIVE_MASK};
pub use field::{compute_cost_field, gap_threshold, GAP_COST_SCALE};
pub use radius::compute_radius_field;
pub use sphere::SphereShells;
