//! Skeleton construction: from a shortest-path forest to a root graph.
//!
//! Quench points (comparative maxima, farthest first) are traced back along
//! their primary predecessor chains until the chain meets voxels already
//! owned by the tree. Each traced chain becomes a new branch.
//!
//! # Module Structure
//!
//! - [`config`]: [`SkeletonParams`]
//! - [`cut`]: [`CutPlane`] restricting where quench points may lie
//! - [`quench`]: quench point detection and ordering
//! - [`build`]: [`extract_skeleton`]

pub mod build;
pub mod config;
pub mod cut;
pub mod quench;

// Re-exports
pub use build::{extract_skeleton, SkeletonInput, SkeletonOutput, SkeletonStats};
pub use config::SkeletonParams;
pub use cut::{Axis, CutPlane, CutSide};
pub use quench::QuenchPoint;
