//! Localization contract.
//!
//! A [`Localizer`] turns sensor observations into world-frame poses, but may
//! need several observations before it can say anything. That state is
//! [`PoseEstimate::NotReady`]; callers skip the cycle instead of recording a
//! placeholder pose.
//!
//! [`AnchoredLocalizer`] adapts any raw [`OdometrySource`] (which reports
//! camera poses in its own arbitrary frame) into a [`Localizer`]:
//!
//! - it withholds estimates for the first `min_init_frames` updates while the
//!   odometry settles,
//! - it maps every raw pose into the world as `camera_to_world · raw`,
//! - it keeps the raw history so the whole world trajectory can be queried.

use egomap_geometry::RigidPose;
use egomap_types::SpatialError;
use tracing::{debug, info};

/// Default number of updates an odometry backend needs before its poses are
/// trusted.
pub const DEFAULT_MIN_INIT_FRAMES: usize = 5;

/// Result of one localization update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseEstimate {
    /// World-frame camera pose.
    Ready(RigidPose),
    /// The localizer is still warming up or lost track.
    NotReady,
}

impl PoseEstimate {
    pub fn pose(&self) -> Option<&RigidPose> {
        match self {
            PoseEstimate::Ready(pose) => Some(pose),
            PoseEstimate::NotReady => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PoseEstimate::Ready(_))
    }
}

/// Anything that estimates the camera pose in the world frame.
pub trait Localizer {
    /// Sensor input consumed per update (an RGB frame, an IMU packet, ...).
    type Observation;

    /// Feed one observation and return the current estimate.
    fn update(&mut self, observation: &Self::Observation) -> Result<PoseEstimate, SpatialError>;

    /// Forget all accumulated state and start warming up again.
    fn reset(&mut self);
}

/// A raw visual/inertial odometry backend.
///
/// Poses are returned in the backend's own frame and are not required to be
/// meaningful until the backend has seen a few observations.
pub trait OdometrySource {
    type Observation;

    /// Consume one observation and return the latest camera pose, if the
    /// backend has one.
    fn track(&mut self, observation: &Self::Observation) -> Option<RigidPose>;

    fn reset(&mut self);
}

/// Wraps an [`OdometrySource`] with warm-up and world anchoring.
#[derive(Debug)]
pub struct AnchoredLocalizer<S> {
    source: S,
    camera_to_world: RigidPose,
    min_init_frames: usize,
    frames_seen: usize,
    initialized: bool,
    raw_history: Vec<RigidPose>,
}

impl<S: OdometrySource> AnchoredLocalizer<S> {
    /// Wrap `source`. `camera_to_world` defaults to identity when `None`.
    pub fn new(source: S, camera_to_world: Option<RigidPose>) -> Self {
        Self {
            source,
            camera_to_world: camera_to_world.unwrap_or_default(),
            min_init_frames: DEFAULT_MIN_INIT_FRAMES,
            frames_seen: 0,
            initialized: false,
            raw_history: Vec::new(),
        }
    }

    pub fn with_min_init_frames(mut self, min_init_frames: usize) -> Self {
        self.min_init_frames = min_init_frames;
        self
    }

    pub fn camera_to_world(&self) -> &RigidPose {
        &self.camera_to_world
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Every pose the backend has reported, mapped into the world frame.
    ///
    /// `None` until the warm-up is over.
    pub fn trajectory(&self) -> Option<Result<Vec<RigidPose>, SpatialError>> {
        if !self.initialized {
            return None;
        }
        Some(
            self.raw_history
                .iter()
                .map(|raw| self.camera_to_world.compose(raw))
                .collect(),
        )
    }
}

impl<S: OdometrySource> Localizer for AnchoredLocalizer<S> {
    type Observation = S::Observation;

    fn update(&mut self, observation: &Self::Observation) -> Result<PoseEstimate, SpatialError> {
        let raw = self.source.track(observation);
        self.frames_seen += 1;
        if let Some(pose) = raw {
            self.raw_history.push(pose);
        }

        if !self.initialized {
            if self.frames_seen < self.min_init_frames {
                debug!(
                    seen = self.frames_seen,
                    needed = self.min_init_frames,
                    "odometry warming up"
                );
                return Ok(PoseEstimate::NotReady);
            }
            self.initialized = true;
            info!(frames = self.frames_seen, "odometry initialized");
        }

        match raw {
            Some(pose) => Ok(PoseEstimate::Ready(self.camera_to_world.compose(&pose)?)),
            None => Ok(PoseEstimate::NotReady),
        }
    }

    fn reset(&mut self) {
        self.source.reset();
        self.frames_seen = 0;
        self.initialized = false;
        self.raw_history.clear();
        info!("localizer reset");
    }
}
