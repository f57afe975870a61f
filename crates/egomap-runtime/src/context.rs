//! Spatial Context facade.
//!
//! [`SpatialContext`] owns one [`PoseStore`], one [`MapRenderer`] and one
//! [`Watermarker`] for the lifetime of an episode. All state lives in the
//! instance: ids, keyframe membership and configuration are never shared
//! between contexts.
//!
//! # Example
//!
//! ```rust
//! use egomap_geometry::RigidPose;
//! use egomap_runtime::{SpatialContext, SpatialContextConfig};
//!
//! let mut ctx = SpatialContext::new(SpatialContextConfig::default()).unwrap();
//!
//! let start = ctx.add_frame(&RigidPose::identity()).unwrap();
//! let here = ctx.add_frame(&RigidPose::from_translation(1.0, 0.0, 0.0)).unwrap();
//! ctx.promote_to_keyframe(start).unwrap();
//! ctx.promote_to_keyframe(here).unwrap();
//!
//! let map = ctx.generate_map().unwrap();
//! assert_eq!(map.colors.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use egomap_geometry::RigidPose;
use egomap_memory::{PoseStore, RoomId, SpatialCoverage};
use egomap_render::{
    ColorAssignment, MapConfig, MapLayout, MapRenderer, RenderedMap, WatermarkConfig, Watermarker,
};
use egomap_types::{FrameId, SpatialError};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::localization::PoseEstimate;

/// A context guarded for use from several threads.
///
/// Every mutating call (`add_frame`, `promote_to_keyframe`,
/// `remove_keyframe`) must go through the lock; holding the guard across
/// `generate_map` gives the renderer a consistent snapshot.
pub type SharedSpatialContext = Arc<Mutex<SpatialContext>>;

/// Configuration of a [`SpatialContext`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialContextConfig {
    pub map: MapConfig,
    pub watermark: WatermarkConfig,
}

/// Pose ledger, map renderer and watermarker behind one owner.
#[derive(Debug)]
pub struct SpatialContext {
    store: PoseStore,
    renderer: MapRenderer,
    watermarker: Watermarker,
}

impl SpatialContext {
    /// Create a context with an empty ledger.
    ///
    /// Fails with [`SpatialError::InvalidConfig`] if either the map or the
    /// watermark configuration is rejected.
    pub fn new(config: SpatialContextConfig) -> Result<Self, SpatialError> {
        Ok(Self {
            store: PoseStore::new(),
            renderer: MapRenderer::new(config.map)?,
            watermarker: Watermarker::new(config.watermark)?,
        })
    }

    /// Wrap this context for shared use.
    pub fn into_shared(self) -> SharedSpatialContext {
        Arc::new(Mutex::new(self))
    }

    /// Read access to the underlying ledger.
    pub fn store(&self) -> &PoseStore {
        &self.store
    }

    pub fn map_config(&self) -> &MapConfig {
        self.renderer.config()
    }

    // ── Ledger ───────────────────────────────────────────────────────────────

    /// Record a frame whose pose is already in the world frame.
    pub fn add_frame(&mut self, pose: &RigidPose) -> Result<FrameId, SpatialError> {
        self.store.add_frame(pose)
    }

    /// Record a frame at `local_pose` relative to `base_pose`.
    pub fn add_frame_with_base(
        &mut self,
        local_pose: &RigidPose,
        base_pose: &RigidPose,
    ) -> Result<FrameId, SpatialError> {
        self.store.add_frame_with_base(local_pose, base_pose)
    }

    /// Record the pose of a localizer estimate.
    ///
    /// Returns `Ok(None)` without touching the ledger when the localizer is
    /// not ready; the caller should skip the rest of this cycle.
    pub fn observe(&mut self, estimate: PoseEstimate) -> Result<Option<FrameId>, SpatialError> {
        match estimate {
            PoseEstimate::Ready(pose) => self.store.add_frame(&pose).map(Some),
            PoseEstimate::NotReady => {
                debug!(session = %self.store.session_id(), "localizer not ready; cycle skipped");
                Ok(None)
            }
        }
    }

    pub fn promote_to_keyframe(&mut self, frame_id: FrameId) -> Result<(), SpatialError> {
        self.store.promote_to_keyframe(frame_id)
    }

    pub fn remove_keyframe(&mut self, frame_id: FrameId) -> Result<(), SpatialError> {
        self.store.remove_keyframe(frame_id)
    }

    pub fn current_pose(&self) -> Result<RigidPose, SpatialError> {
        self.store.current_pose()
    }

    pub fn keyframes(&self) -> BTreeMap<FrameId, RigidPose> {
        self.store.keyframes()
    }

    /// Keyframe count per room of the current session.
    pub fn coverage(&self) -> SpatialCoverage {
        self.store.rooms().coverage()
    }

    /// Rooms without keyframes, including the room the latest frame is in.
    pub fn unvisited_rooms(&mut self) -> Result<Vec<RoomId>, SpatialError> {
        let current = self.store.current_pose()?;
        Ok(self.store.unvisited_rooms(&current))
    }

    // ── Rendering ────────────────────────────────────────────────────────────

    /// Render the egocentric map for the latest frame.
    ///
    /// Fails only with [`SpatialError::EmptyStore`] when no frame has been
    /// recorded yet.
    pub fn generate_map(&self) -> Result<RenderedMap, SpatialError> {
        let span = info_span!("generate_map", session = %self.store.session_id());
        let _enter = span.enter();
        let current = self.store.current_pose()?;
        Ok(self.renderer.generate_map(&current, &self.store.keyframes()))
    }

    /// Stamp keyframe images with the colors of a previously rendered map.
    pub fn watermark(
        &self,
        images: &[(FrameId, RgbImage)],
        colors: &ColorAssignment,
    ) -> Result<Vec<RgbImage>, SpatialError> {
        self.watermarker.watermark(images, colors)
    }

    /// JSON Schema of [`MapLayout`], for agents that consume the layout as
    /// structured data next to the raster.
    pub fn layout_schema() -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(schemars::schema_for!(MapLayout))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn ctx() -> SpatialContext {
        SpatialContext::new(SpatialContextConfig::default()).unwrap()
    }

    fn boxes_disjoint(a: [i32; 2], b: [i32; 2], r: i32) -> bool {
        (a[0] - b[0]).abs() > 2 * r || (a[1] - b[1]).abs() > 2 * r
    }

    #[test]
    fn generate_map_on_empty_context_fails() {
        let ctx = ctx();
        assert!(matches!(ctx.generate_map(), Err(SpatialError::EmptyStore)));
        assert_eq!(ctx.current_pose(), Err(SpatialError::EmptyStore));
    }

    #[test]
    fn invalid_watermark_config_is_rejected() {
        let config = SpatialContextConfig {
            watermark: WatermarkConfig {
                size: 2,
                ..WatermarkConfig::default()
            },
            ..SpatialContextConfig::default()
        };
        assert!(matches!(
            SpatialContext::new(config),
            Err(SpatialError::InvalidConfig(_))
        ));
    }

    #[test]
    fn two_frame_scenario() {
        let mut ctx = ctx();
        let a = ctx.add_frame(&RigidPose::identity()).unwrap();
        let b = ctx.add_frame(&RigidPose::from_translation(1.0, 0.0, 0.0)).unwrap();
        assert_eq!((a, b), (FrameId(0), FrameId(1)));
        ctx.promote_to_keyframe(a).unwrap();
        ctx.promote_to_keyframe(b).unwrap();

        let map = ctx.generate_map().unwrap();
        let cfg = ctx.map_config();
        let first = map.layout.marker(a).unwrap();
        let second = map.layout.marker(b).unwrap();

        assert_eq!((first.rank, second.rank), (1, 2));
        assert_eq!(first.relative_position, [-1.0, 0.0]);
        // d_max = 1 m, so the start frame sits one usable radius to the left.
        let center = cfg.center();
        assert_eq!(first.pixel, [center - cfg.usable_radius() as i32, center]);
        assert_eq!(second.pixel, [center, center]);
        assert!(boxes_disjoint(first.pixel, second.pixel, cfg.marker_radius as i32));
        assert_ne!(
            map.colors.lookup(a).unwrap().color,
            map.colors.lookup(b).unwrap().color
        );
    }

    #[test]
    fn promotion_and_removal_reflected_in_next_map() {
        let mut ctx = ctx();
        let id = ctx.add_frame(&RigidPose::from_translation(0.0, 3.0, 0.0)).unwrap();
        ctx.add_frame(&RigidPose::identity()).unwrap();

        ctx.promote_to_keyframe(id).unwrap();
        assert!(ctx.generate_map().unwrap().colors.contains(id));

        ctx.remove_keyframe(id).unwrap();
        assert!(!ctx.generate_map().unwrap().colors.contains(id));
    }

    #[test]
    fn observe_skips_not_ready_cycles() {
        let mut ctx = ctx();
        assert_eq!(ctx.observe(PoseEstimate::NotReady).unwrap(), None);
        assert!(ctx.store().is_empty());

        let id = ctx
            .observe(PoseEstimate::Ready(RigidPose::from_translation(2.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(id, Some(FrameId(0)));
        assert_eq!(ctx.current_pose().unwrap().translation().x, 2.0);
    }

    #[test]
    fn walking_into_a_new_room_reports_it_unvisited() {
        let mut ctx = ctx();
        assert_eq!(ctx.unvisited_rooms(), Err(SpatialError::EmptyStore));

        let start = ctx.add_frame(&RigidPose::identity()).unwrap();
        ctx.promote_to_keyframe(start).unwrap();
        assert!(ctx.unvisited_rooms().unwrap().is_empty());

        ctx.add_frame(&RigidPose::from_translation(8.0, 0.0, 0.0)).unwrap();
        assert_eq!(ctx.unvisited_rooms().unwrap(), vec![RoomId(1)]);
        assert_eq!(ctx.coverage().num_rooms, 1);
    }

    #[test]
    fn watermark_uses_map_colors() {
        let mut ctx = ctx();
        let id = ctx.add_frame(&RigidPose::identity()).unwrap();
        ctx.promote_to_keyframe(id).unwrap();
        let map = ctx.generate_map().unwrap();

        let image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
        let out = ctx.watermark(&[(id, image)], &map.colors).unwrap();
        let expected = map.colors.lookup(id).unwrap().color;
        assert_eq!(*out[0].get_pixel(7, 7), Rgb(expected));

        let stranger = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        assert_eq!(
            ctx.watermark(&[(FrameId(99), stranger)], &map.colors).unwrap_err(),
            SpatialError::UnknownColor(FrameId(99))
        );
    }

    #[test]
    fn shared_context_serializes_mutation() {
        let shared = ctx().into_shared();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let mut guard = shared.lock().unwrap();
                    guard
                        .add_frame(&RigidPose::from_translation(f64::from(i), 0.0, 0.0))
                        .unwrap()
                })
            })
            .collect();
        let mut ids: Vec<FrameId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, (0..4).map(FrameId).collect::<Vec<_>>());
    }

    #[test]
    fn layout_schema_describes_markers() {
        let schema = SpatialContext::layout_schema().unwrap();
        assert!(schema.is_object());
        assert_eq!(schema["title"], "MapLayout");
        let text = schema.to_string();
        assert!(text.contains("markers"));
        assert!(text.contains("outliers"));
    }
}
