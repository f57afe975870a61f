//! Room index.
//!
//! Groups keyframes into "rooms" by greedy distance clustering on the ground
//! plane. A position joins the first room (in creation order) whose center
//! lies strictly closer than `threshold`; otherwise it founds a new room
//! centered on itself. Centers never move, so a room id stays meaningful for
//! the whole session.
//!
//! Rooms can also be founded by a bare pose query
//! ([`RoomIndex::unvisited_rooms`]), which is how a room with no keyframes
//! comes to exist.
//!
//! # Example
//!
//! ```rust
//! use egomap_geometry::RigidPose;
//! use egomap_memory::{RoomId, RoomIndex};
//! use egomap_types::FrameId;
//!
//! let mut rooms = RoomIndex::new(2.0).unwrap();
//! rooms.assign(FrameId(0), &RigidPose::from_translation(0.0, 0.0, 0.0));
//! rooms.assign(FrameId(1), &RigidPose::from_translation(0.5, 0.5, 0.0));
//! rooms.assign(FrameId(2), &RigidPose::from_translation(5.0, 0.0, 0.0));
//!
//! assert_eq!(rooms.keyframes_in_room(RoomId(0)), vec![FrameId(0), FrameId(1)]);
//! assert_eq!(rooms.coverage().num_rooms, 2);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use egomap_geometry::RigidPose;
use egomap_types::{FrameId, SpatialError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default clustering distance in metres.
pub const DEFAULT_ROOM_THRESHOLD: f64 = 2.0;

/// Identifier of a room, assigned in creation order from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keyframe coverage summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialCoverage {
    pub num_keyframes: usize,
    /// Rooms holding at least one keyframe.
    pub num_rooms: usize,
    pub avg_keyframes_per_room: f64,
}

#[derive(Debug, Clone)]
pub struct RoomIndex {
    threshold: f64,
    centers: Vec<[f64; 2]>,
    members: BTreeMap<FrameId, RoomId>,
}

impl Default for RoomIndex {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_ROOM_THRESHOLD,
            centers: Vec::new(),
            members: BTreeMap::new(),
        }
    }
}

impl RoomIndex {
    /// Fails with [`SpatialError::InvalidConfig`] unless `threshold` is a
    /// positive finite distance.
    pub fn new(threshold: f64) -> Result<Self, SpatialError> {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(SpatialError::InvalidConfig(format!(
                "room threshold must be positive, got {threshold}"
            )));
        }
        Ok(Self {
            threshold,
            ..Self::default()
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of rooms created so far, visited or not.
    pub fn room_count(&self) -> usize {
        self.centers.len()
    }

    /// Ground-plane center of `room`.
    pub fn center(&self, room: RoomId) -> Option<[f64; 2]> {
        self.centers.get(room.0 as usize).copied()
    }

    /// Room containing `pose`, without creating one.
    pub fn find_room(&self, pose: &RigidPose) -> Option<RoomId> {
        let [x, y] = ground(pose);
        self.centers
            .iter()
            .position(|[cx, cy]| (x - cx).hypot(y - cy) < self.threshold)
            .map(|i| RoomId(i as u32))
    }

    /// Room containing `pose`, founding a new one centered on it if needed.
    pub fn room_of(&mut self, pose: &RigidPose) -> RoomId {
        if let Some(room) = self.find_room(pose) {
            return room;
        }
        let room = RoomId(self.centers.len() as u32);
        let center = ground(pose);
        self.centers.push(center);
        debug!(room = %room, x = center[0], y = center[1], "room created");
        room
    }

    /// Place keyframe `frame_id` captured at `pose` into its room.
    pub fn assign(&mut self, frame_id: FrameId, pose: &RigidPose) -> RoomId {
        let room = self.room_of(pose);
        self.members.insert(frame_id, room);
        room
    }

    /// Drop `frame_id` from its room. The room itself is kept.
    pub fn unassign(&mut self, frame_id: FrameId) -> Option<RoomId> {
        self.members.remove(&frame_id)
    }

    pub fn room_of_keyframe(&self, frame_id: FrameId) -> Option<RoomId> {
        self.members.get(&frame_id).copied()
    }

    /// Keyframes in `room`, by ascending id.
    pub fn keyframes_in_room(&self, room: RoomId) -> Vec<FrameId> {
        self.members
            .iter()
            .filter(|(_, r)| **r == room)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Rooms without any keyframe, by ascending id.
    ///
    /// The room of `current` is founded first if it does not exist yet, so a
    /// robot standing somewhere new always sees that spot as unvisited.
    pub fn unvisited_rooms(&mut self, current: &RigidPose) -> Vec<RoomId> {
        self.room_of(current);
        let visited: BTreeSet<RoomId> = self.members.values().copied().collect();
        (0..self.centers.len() as u32)
            .map(RoomId)
            .filter(|room| !visited.contains(room))
            .collect()
    }

    pub fn coverage(&self) -> SpatialCoverage {
        let mut per_room: BTreeMap<RoomId, usize> = BTreeMap::new();
        for room in self.members.values() {
            *per_room.entry(*room).or_default() += 1;
        }
        let num_keyframes = self.members.len();
        let num_rooms = per_room.len();
        let avg_keyframes_per_room = if num_rooms == 0 {
            0.0
        } else {
            num_keyframes as f64 / num_rooms as f64
        };
        SpatialCoverage {
            num_keyframes,
            num_rooms,
            avg_keyframes_per_room,
        }
    }
}

/// Plain-text summary, one line per room that holds keyframes.
impl fmt::Display for RoomIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.members.is_empty() {
            return write!(f, "No keyframes stored.");
        }
        write!(
            f,
            "Spatial memory: {} keyframes across {} rooms",
            self.members.len(),
            self.centers.len()
        )?;
        for (i, [cx, cy]) in self.centers.iter().enumerate() {
            let count = self.keyframes_in_room(RoomId(i as u32)).len();
            if count > 0 {
                write!(f, "\n  Room {i} (center: {cx:.1}, {cy:.1}): {count} keyframes")?;
            }
        }
        Ok(())
    }
}

fn ground(pose: &RigidPose) -> [f64; 2] {
    let t = pose.translation();
    [t.x, t.y]
}
