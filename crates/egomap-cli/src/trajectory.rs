//! Trajectory files.
//!
//! A trajectory is a JSON document listing camera poses in capture order:
//!
//! ```json
//! {
//!   "base_pose": [[1,0,0,0],[0,1,0,0],[0,0,1,0.3],[0,0,0,1]],
//!   "frames": [
//!     { "pose": [[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]], "keyframe": true },
//!     { "pose": { "translation": [1,0,0], "quaternion": [0,0,0,1] } }
//!   ]
//! }
//! ```
//!
//! Poses are either four rows of a homogeneous matrix or a translation plus
//! a scalar-last quaternion. When `base_pose` is present every frame pose is
//! relative to it.

use std::path::Path;

use egomap_geometry::{PoseRows, RigidPose};
use egomap_runtime::SpatialContext;
use egomap_types::{FrameId, SpatialError};
use nalgebra::Vector3;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PoseSpec {
    Rows(PoseRows),
    TranslationQuaternion {
        translation: [f64; 3],
        quaternion: [f64; 4],
    },
}

impl PoseSpec {
    pub fn to_pose(&self) -> Result<RigidPose, SpatialError> {
        match self {
            PoseSpec::Rows(rows) => RigidPose::from_rows(*rows),
            PoseSpec::TranslationQuaternion {
                translation,
                quaternion,
            } => RigidPose::from_translation_quaternion(
                Vector3::from_column_slice(translation),
                *quaternion,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameSpec {
    pub pose: PoseSpec,
    #[serde(default)]
    pub keyframe: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trajectory {
    #[serde(default)]
    pub base_pose: Option<PoseSpec>,
    pub frames: Vec<FrameSpec>,
}

impl Trajectory {
    pub fn parse(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse trajectory: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read trajectory at {}: {}", path.display(), e))?;
        Self::parse(&raw)
    }

    /// Feed every frame into `ctx` in order, promoting the ones flagged as
    /// keyframes. Returns the ids assigned to the frames.
    pub fn replay(&self, ctx: &mut SpatialContext) -> Result<Vec<FrameId>, SpatialError> {
        let base = self.base_pose.as_ref().map(PoseSpec::to_pose).transpose()?;
        let mut ids = Vec::with_capacity(self.frames.len());
        for frame in &self.frames {
            let pose = frame.pose.to_pose()?;
            let id = match &base {
                Some(base) => ctx.add_frame_with_base(&pose, base)?,
                None => ctx.add_frame(&pose)?,
            };
            if frame.keyframe {
                ctx.promote_to_keyframe(id)?;
            }
            ids.push(id);
        }
        Ok(ids)
    }
}
