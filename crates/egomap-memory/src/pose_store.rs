//! Pose Store.
//!
//! Authoritative ledger of camera poses. Every call to
//! [`PoseStore::add_frame`] appends one immutable [`Frame`] whose id is its
//! index in the arena, so ids are dense, strictly increasing and never
//! reused. Keyframe membership is kept separately as a set of ids and can be
//! granted and revoked any number of times without touching the ledger.
//!
//! # Membership policy
//!
//! | call                              | id never created   | known, not a keyframe | known keyframe |
//! |-----------------------------------|--------------------|-----------------------|----------------|
//! | [`promote_to_keyframe`]           | `UnknownFrame`     | becomes keyframe      | no change      |
//! | [`remove_keyframe`]               | `UnknownFrame`     | no-op                 | membership cleared |
//!
//! [`promote_to_keyframe`]: PoseStore::promote_to_keyframe
//! [`remove_keyframe`]: PoseStore::remove_keyframe
//!
//! # Example
//!
//! ```rust
//! use egomap_geometry::RigidPose;
//! use egomap_memory::PoseStore;
//!
//! let mut store = PoseStore::new();
//! let first = store.add_frame(&RigidPose::identity()).unwrap();
//! let second = store.add_frame(&RigidPose::from_translation(1.0, 0.0, 0.0)).unwrap();
//!
//! store.promote_to_keyframe(first).unwrap();
//! assert_eq!(store.keyframes().len(), 1);
//! assert_eq!(store.current_pose().unwrap().translation().x, 1.0);
//! assert!(second > first);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use egomap_geometry::{RigidPose, planar_distance};
use egomap_types::{FrameId, SpatialError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::rooms::{RoomId, RoomIndex};

// ─────────────────────────────────────────────────────────────────────────────
// Frame
// ─────────────────────────────────────────────────────────────────────────────

/// A single observation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Ledger-assigned identifier.
    pub id: FrameId,
    /// Camera pose in the fixed world frame at capture time.
    pub world_pose: RigidPose,
    /// Logical sequence position (number of frames recorded before this one).
    pub created_at: u64,
    /// Wall-clock time at which the frame was recorded.
    pub captured_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// PoseStore
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only frame ledger with a mutable keyframe subset.
///
/// One store is created per spatial-context lifetime; it owns the id counter,
/// so two stores never share ids or state.
#[derive(Debug)]
pub struct PoseStore {
    session_id: Uuid,
    frames: Vec<Frame>,
    keyframes: BTreeSet<FrameId>,
    rooms: RoomIndex,
}

impl Default for PoseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseStore {
    /// Create an empty store with a fresh session id.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            frames: Vec::new(),
            keyframes: BTreeSet::new(),
            rooms: RoomIndex::default(),
        }
    }

    /// Create an empty store that clusters keyframes into rooms of
    /// `threshold` metres instead of the default.
    pub fn with_room_threshold(threshold: f64) -> Result<Self, SpatialError> {
        Ok(Self {
            rooms: RoomIndex::new(threshold)?,
            ..Self::new()
        })
    }

    /// Identifier of this store, attached to every log event it emits.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Record a frame whose pose is already expressed in the world frame.
    pub fn add_frame(&mut self, pose: &RigidPose) -> Result<FrameId, SpatialError> {
        self.add_frame_with_base(pose, &RigidPose::identity())
    }

    /// Record a frame observed at `local_pose` relative to `base_pose`.
    ///
    /// The stored world pose is `base_pose · local_pose`, re-validated after
    /// composition. A rejected pose consumes no id.
    pub fn add_frame_with_base(
        &mut self,
        local_pose: &RigidPose,
        base_pose: &RigidPose,
    ) -> Result<FrameId, SpatialError> {
        let world_pose = base_pose.compose(local_pose)?;
        let sequence = self.frames.len() as u64;
        let id = FrameId(sequence);
        self.frames.push(Frame {
            id,
            world_pose,
            created_at: sequence,
            captured_at: Utc::now(),
        });
        debug!(session = %self.session_id, frame = %id, "frame recorded");
        Ok(id)
    }

    /// Mark `frame_id` as a keyframe.
    pub fn promote_to_keyframe(&mut self, frame_id: FrameId) -> Result<(), SpatialError> {
        self.ensure_known(frame_id)?;
        if self.keyframes.insert(frame_id) {
            let pose = self.frames[frame_id.0 as usize].world_pose;
            let room = self.rooms.assign(frame_id, &pose);
            info!(session = %self.session_id, frame = %frame_id, room = %room, "keyframe promoted");
        }
        Ok(())
    }

    /// Clear keyframe membership of `frame_id`.
    ///
    /// Removing a known frame that is not currently a keyframe is a no-op.
    pub fn remove_keyframe(&mut self, frame_id: FrameId) -> Result<(), SpatialError> {
        self.ensure_known(frame_id)?;
        if self.keyframes.remove(&frame_id) {
            self.rooms.unassign(frame_id);
            info!(session = %self.session_id, frame = %frame_id, "keyframe removed");
        } else {
            debug!(session = %self.session_id, frame = %frame_id, "remove_keyframe on non-keyframe ignored");
        }
        Ok(())
    }

    /// World pose of the most recently added frame.
    pub fn current_pose(&self) -> Result<RigidPose, SpatialError> {
        self.frames
            .last()
            .map(|f| f.world_pose)
            .ok_or(SpatialError::EmptyStore)
    }

    /// Snapshot of the active keyframes and their world poses, by ascending
    /// id. Later mutation of the store does not affect the returned map.
    pub fn keyframes(&self) -> BTreeMap<FrameId, RigidPose> {
        self.keyframes
            .iter()
            .map(|id| (*id, self.frames[id.0 as usize].world_pose))
            .collect()
    }

    /// Look up a frame by id.
    pub fn frame(&self, frame_id: FrameId) -> Option<&Frame> {
        usize::try_from(frame_id.0).ok().and_then(|i| self.frames.get(i))
    }

    /// All recorded frames in capture order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// World poses of every recorded frame in capture order.
    pub fn trajectory(&self) -> Vec<RigidPose> {
        self.frames.iter().map(|f| f.world_pose).collect()
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` when no frame has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `true` when `frame_id` is currently a keyframe.
    pub fn is_keyframe(&self, frame_id: FrameId) -> bool {
        self.keyframes.contains(&frame_id)
    }

    /// Number of active keyframes.
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// Keyframes whose world position lies within `radius` metres of `pose`
    /// on the ground (x, y) plane, by ascending id.
    pub fn keyframes_near(&self, pose: &RigidPose, radius: f64) -> Vec<FrameId> {
        let origin = pose.translation();
        self.keyframes
            .iter()
            .copied()
            .filter(|id| {
                let delta = self.frames[id.0 as usize].world_pose.translation() - origin;
                planar_distance(&delta) <= radius
            })
            .collect()
    }

    /// `true` when at least one keyframe was captured within `radius` metres
    /// of `pose`.
    pub fn has_keyframe_near(&self, pose: &RigidPose, radius: f64) -> bool {
        !self.keyframes_near(pose, radius).is_empty()
    }

    /// Room clustering of the active keyframes.
    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    /// Rooms that hold no keyframe, counting the room around `current` even
    /// if the robot has only just entered it.
    pub fn unvisited_rooms(&mut self, current: &RigidPose) -> Vec<RoomId> {
        self.rooms.unvisited_rooms(current)
    }

    fn ensure_known(&self, frame_id: FrameId) -> Result<(), SpatialError> {
        match self.frame(frame_id) {
            Some(_) => Ok(()),
            None => Err(SpatialError::UnknownFrame(frame_id)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use egomap_geometry::transform::PoseRows;

    fn at(x: f64, y: f64) -> RigidPose {
        RigidPose::from_translation(x, y, 0.0)
    }

    #[test]
    fn ids_are_sequential_from_zero() {
        let mut store = PoseStore::new();
        for expected in 0..5 {
            assert_eq!(store.add_frame(&at(expected as f64, 0.0)).unwrap(), FrameId(expected));
        }
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn ids_never_reused_after_keyframe_removal() {
        let mut store = PoseStore::new();
        let a = store.add_frame(&at(0.0, 0.0)).unwrap();
        store.promote_to_keyframe(a).unwrap();
        store.remove_keyframe(a).unwrap();
        let b = store.add_frame(&at(1.0, 0.0)).unwrap();
        store.remove_keyframe(b).unwrap();
        let c = store.add_frame(&at(2.0, 0.0)).unwrap();
        assert!(a < b && b < c);
        assert_eq!(store.frames().map(|f| f.id).collect::<Vec<_>>(), vec![a, b, c]);
    }

    #[test]
    fn world_pose_composes_base_and_local() {
        let mut store = PoseStore::new();
        let id = store
            .add_frame_with_base(&at(0.5, 0.0), &at(1.0, 2.0))
            .unwrap();
        let pose = store.frame(id).unwrap().world_pose;
        assert!((pose.translation().x - 1.5).abs() < 1e-12);
        assert!((pose.translation().y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn current_pose_on_empty_store_fails() {
        let store = PoseStore::new();
        assert_eq!(store.current_pose(), Err(SpatialError::EmptyStore));
        assert!(store.is_empty());
    }

    #[test]
    fn current_pose_tracks_latest_frame() {
        let mut store = PoseStore::new();
        store.add_frame(&at(1.0, 0.0)).unwrap();
        store.add_frame(&at(4.0, 0.0)).unwrap();
        assert_eq!(store.current_pose().unwrap().translation().x, 4.0);
    }

    #[test]
    fn promote_unknown_frame_fails() {
        let mut store = PoseStore::new();
        store.add_frame(&at(0.0, 0.0)).unwrap();
        assert_eq!(
            store.promote_to_keyframe(FrameId(7)),
            Err(SpatialError::UnknownFrame(FrameId(7)))
        );
    }

    #[test]
    fn remove_unknown_frame_fails() {
        let mut store = PoseStore::new();
        assert_eq!(
            store.remove_keyframe(FrameId(0)),
            Err(SpatialError::UnknownFrame(FrameId(0)))
        );
    }

    #[test]
    fn remove_non_keyframe_is_noop() {
        let mut store = PoseStore::new();
        let id = store.add_frame(&at(0.0, 0.0)).unwrap();
        assert!(store.remove_keyframe(id).is_ok());
        assert!(!store.is_keyframe(id));
        assert_eq!(store.keyframe_count(), 0);
    }

    #[test]
    fn promote_and_demote_repeatedly() {
        let mut store = PoseStore::new();
        let id = store.add_frame(&at(0.0, 0.0)).unwrap();
        for _ in 0..3 {
            store.promote_to_keyframe(id).unwrap();
            store.promote_to_keyframe(id).unwrap();
            assert_eq!(store.keyframe_count(), 1);
            store.remove_keyframe(id).unwrap();
            assert_eq!(store.keyframe_count(), 0);
        }
    }

    #[test]
    fn keyframes_snapshot_is_independent() {
        let mut store = PoseStore::new();
        let a = store.add_frame(&at(0.0, 0.0)).unwrap();
        let b = store.add_frame(&at(1.0, 0.0)).unwrap();
        store.promote_to_keyframe(b).unwrap();
        store.promote_to_keyframe(a).unwrap();

        let snapshot = store.keyframes();
        store.remove_keyframe(a).unwrap();

        assert_eq!(snapshot.keys().copied().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(store.keyframes().len(), 1);
    }

    #[test]
    fn rejected_composition_consumes_no_id() {
        let mut store = PoseStore::new();
        // Shear just inside tolerance on its own; doubled by composition it
        // falls outside, so the world pose is rejected.
        let sheared: PoseRows = [
            [1.0, 7e-7, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let pose = RigidPose::from_rows(sheared).unwrap();
        let err = store.add_frame_with_base(&pose, &pose).unwrap_err();
        assert!(matches!(err, SpatialError::InvalidTransform(_)));
        assert!(store.is_empty());
        assert_eq!(store.add_frame(&pose).unwrap(), FrameId(0));
    }

    #[test]
    fn keyframes_near_filters_by_planar_radius() {
        let mut store = PoseStore::new();
        let near = store.add_frame(&at(0.5, 0.5)).unwrap();
        let far = store.add_frame(&at(5.0, 0.0)).unwrap();
        let high = store.add_frame(&RigidPose::from_translation(0.2, 0.0, 9.0)).unwrap();
        let not_key = store.add_frame(&at(0.1, 0.0)).unwrap();
        for id in [near, far, high] {
            store.promote_to_keyframe(id).unwrap();
        }

        let query = at(0.0, 0.0);
        assert_eq!(store.keyframes_near(&query, 1.0), vec![near, high]);
        assert!(!store.keyframes_near(&query, 1.0).contains(&not_key));
        assert!(store.has_keyframe_near(&at(5.2, 0.0), 0.5));
        assert!(!store.has_keyframe_near(&at(10.0, 10.0), 1.0));
    }

    #[test]
    fn promoted_keyframes_are_grouped_into_rooms() {
        let mut store = PoseStore::new();
        let kitchen = store.add_frame(&at(0.0, 0.0)).unwrap();
        let sink = store.add_frame(&at(1.0, 1.0)).unwrap();
        let hall = store.add_frame(&at(6.0, 0.0)).unwrap();
        for id in [kitchen, sink, hall] {
            store.promote_to_keyframe(id).unwrap();
        }
        store.promote_to_keyframe(sink).unwrap();

        let rooms = store.rooms();
        assert_eq!(rooms.keyframes_in_room(RoomId(0)), vec![kitchen, sink]);
        assert_eq!(rooms.keyframes_in_room(RoomId(1)), vec![hall]);
        assert_eq!(rooms.coverage().num_keyframes, store.keyframe_count());

        store.remove_keyframe(hall).unwrap();
        assert_eq!(store.unvisited_rooms(&at(0.5, 0.0)), vec![RoomId(1)]);
        assert_eq!(store.rooms().coverage().num_rooms, 1);
    }

    #[test]
    fn room_threshold_is_configurable() {
        assert!(PoseStore::with_room_threshold(-1.0).is_err());

        let mut store = PoseStore::with_room_threshold(10.0).unwrap();
        for x in [0.0, 6.0] {
            let id = store.add_frame(&at(x, 0.0)).unwrap();
            store.promote_to_keyframe(id).unwrap();
        }
        assert_eq!(store.rooms().room_count(), 1);
        assert!(store.unvisited_rooms(&at(3.0, 0.0)).is_empty());
    }

    #[test]
    fn empty_store_has_zero_coverage() {
        let mut store = PoseStore::new();
        store.add_frame(&at(0.0, 0.0)).unwrap();
        let coverage = store.rooms().coverage();
        assert_eq!((coverage.num_keyframes, coverage.num_rooms), (0, 0));
        assert_eq!(coverage.avg_keyframes_per_room, 0.0);
        assert_eq!(store.rooms().to_string(), "No keyframes stored.");
    }

    #[test]
    fn trajectory_lists_all_frames_in_order() {
        let mut store = PoseStore::new();
        store.add_frame(&at(1.0, 0.0)).unwrap();
        store.add_frame(&at(2.0, 0.0)).unwrap();
        let xs: Vec<f64> = store.trajectory().iter().map(|p| p.translation().x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn frame_serializes_with_pose_rows() {
        let mut store = PoseStore::new();
        let id = store.add_frame(&at(3.0, 0.0)).unwrap();
        let json = serde_json::to_value(store.frame(id).unwrap()).unwrap();
        assert_eq!(json["id"], 0);
        assert_eq!(json["world_pose"][0][3], 3.0);
    }
}
