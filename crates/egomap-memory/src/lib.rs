//! `egomap-memory` – The pose ledger.
//!
//! Remembers where the camera was for every observed frame and which of
//! those frames the policy has marked as important.
//!
//! # Modules
//!
//! - [`pose_store`] – [`PoseStore`][pose_store::PoseStore]: an append-only
//!   arena of [`Frame`][pose_store::Frame]s indexed by
//!   [`FrameId`][egomap_types::FrameId], plus the mutable keyframe membership
//!   set and planar proximity queries over it.
//! - [`rooms`] – [`RoomIndex`][rooms::RoomIndex]: greedy clustering of
//!   keyframes into rooms, unvisited-room queries and a coverage summary.

pub mod pose_store;
pub mod rooms;

pub use pose_store::{Frame, PoseStore};
pub use rooms::{DEFAULT_ROOM_THRESHOLD, RoomId, RoomIndex, SpatialCoverage};
