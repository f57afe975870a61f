//! `egomap-geometry` – rigid-body algebra for the spatial context engine.
//!
//! Every camera pose that enters the engine is an SE(3) homogeneous matrix.
//! This crate owns the validity check for those matrices and the handful of
//! group operations the rest of the workspace needs.
//!
//! # Modules
//!
//! - [`transform`] – [`RigidPose`][transform::RigidPose]: a validated 4×4
//!   rigid transform, plus the free functions [`is_valid`][transform::is_valid],
//!   [`inverse`][transform::inverse], [`relative_pose`][transform::relative_pose]
//!   and [`displacement`][transform::displacement] over raw matrices.

pub mod transform;

pub use transform::{
    DEFAULT_TOLERANCE, PoseRows, RigidPose, displacement, inverse, is_valid, planar_distance,
    relative_pose,
};
