//! In-process simulated scene for headless tests and the demo binary.
//!
//! [`SimScene`] holds a flat list of tagged axis-aligned boxes and answers
//! [`SpatialQuery`] casts with an exact ray/slab intersection, so the full
//! wayfinder stack can run in CI without a physical sensor rig.
//!
//! # Example
//!
//! ```rust
//! use wayfinder_spatial::sim::SimScene;
//! use wayfinder_spatial::ports::SpatialQuery;
//! use wayfinder_types::{CategoryMask, Vec3};
//!
//! let scene = SimScene::new()
//!     .with_floor(0.0)
//!     .with_wall_x(5.0, 20.0, 4.0);
//!
//! let hit = scene
//!     .cast(Vec3::new(0.0, 1.6, 0.0), Vec3::RIGHT, 10.0, CategoryMask::ALL)
//!     .unwrap()
//!     .expect("wall 5 m to the right");
//! assert!((hit.distance - 5.0).abs() < 1e-4);
//! ```

use wayfinder_types::{BodyState, CategoryMask, Hit, ProbeRequest, Vec3, WayError};

use crate::ports::{BatchCaster, SceneHints, SpatialQuery};

/// Half-thickness used for the slab-shaped convenience surfaces
/// (floor, ceiling, walls).
const SLAB_THICKNESS: f32 = 0.05;

/// Extent of the convenience floor/ceiling slabs along x and z.
const SLAB_EXTENT: f32 = 50.0;

// ────────────────────────────────────────────────────────────────────────────
// Scene objects
// ────────────────────────────────────────────────────────────────────────────

/// One axis-aligned box in the simulated scene.
#[derive(Debug, Clone)]
struct SimObject {
    min: Vec3,
    max: Vec3,
    tag: Option<String>,
    mask: CategoryMask,
    body: Option<BodyState>,
}

impl SimObject {
    /// Ray/slab intersection. Returns the entry distance and the outward
    /// normal of the entry face, or `None` when the ray misses, starts
    /// inside the box, or only hits beyond `max_distance`.
    fn intersect(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
        let mins = [self.min.x, self.min.y, self.min.z];
        let maxs = [self.max.x, self.max.y, self.max.z];
        let origins = [origin.x, origin.y, origin.z];
        let dirs = [dir.x, dir.y, dir.z];

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_axis = 0usize;
        let mut enter_sign = 1.0f32;

        for axis in 0..3 {
            if dirs[axis].abs() < 1e-9 {
                // Parallel to this slab: must already be within it.
                if origins[axis] < mins[axis] || origins[axis] > maxs[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dirs[axis];
            let mut t1 = (mins[axis] - origins[axis]) * inv;
            let mut t2 = (maxs[axis] - origins[axis]) * inv;
            let mut sign = -1.0;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                sign = 1.0;
            }
            if t1 > t_enter {
                t_enter = t1;
                enter_axis = axis;
                enter_sign = sign;
            }
            t_exit = t_exit.min(t2);
        }

        if t_enter > t_exit || t_enter <= 0.0 || t_enter > max_distance {
            return None;
        }

        let mut normal = Vec3::ZERO;
        match enter_axis {
            0 => normal.x = enter_sign,
            1 => normal.y = enter_sign,
            _ => normal.z = enter_sign,
        }
        Some((t_enter, normal))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimScene
// ────────────────────────────────────────────────────────────────────────────

/// A simulated environment built from tagged axis-aligned boxes.
///
/// Construct with [`SimScene::new`] and chain the `with_*` methods to add
/// surfaces, then hand the scene to the executor behind an `Arc`.
#[derive(Debug, Default, Clone)]
pub struct SimScene {
    objects: Vec<SimObject>,
}

impl SimScene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a large horizontal floor slab at height `y`, tagged `"floor"`.
    pub fn with_floor(self, y: f32) -> Self {
        self.with_tagged_box(
            Vec3::new(-SLAB_EXTENT, y - SLAB_THICKNESS, -SLAB_EXTENT),
            Vec3::new(SLAB_EXTENT, y, SLAB_EXTENT),
            "floor",
        )
    }

    /// Add a large horizontal ceiling slab at height `y`, tagged `"ceiling"`.
    pub fn with_ceiling(self, y: f32) -> Self {
        self.with_tagged_box(
            Vec3::new(-SLAB_EXTENT, y, -SLAB_EXTENT),
            Vec3::new(SLAB_EXTENT, y + SLAB_THICKNESS, SLAB_EXTENT),
            "ceiling",
        )
    }

    /// Add a vertical wall slab perpendicular to the x axis at `x`,
    /// `extent` metres long and `height` metres tall, tagged `"wall"`.
    pub fn with_wall_x(self, x: f32, extent: f32, height: f32) -> Self {
        self.with_tagged_box(
            Vec3::new(x, 0.0, -extent * 0.5),
            Vec3::new(x + SLAB_THICKNESS, height, extent * 0.5),
            "wall",
        )
    }

    /// Add a vertical wall slab perpendicular to the z axis at `z`.
    pub fn with_wall_z(self, z: f32, extent: f32, height: f32) -> Self {
        self.with_tagged_box(
            Vec3::new(-extent * 0.5, 0.0, z),
            Vec3::new(extent * 0.5, height, z + SLAB_THICKNESS),
            "wall",
        )
    }

    /// Add a static tagged box.
    pub fn with_tagged_box(mut self, min: Vec3, max: Vec3, tag: &str) -> Self {
        self.objects.push(SimObject {
            min: Vec3::new(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
            max: Vec3::new(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
            tag: Some(tag.to_string()),
            mask: CategoryMask::STATIC,
            body: None,
        });
        self
    }

    /// Add a movable box with the given mass, tagged `"movable"`.
    pub fn with_movable_box(mut self, min: Vec3, max: Vec3, mass: f32) -> Self {
        self.objects.push(SimObject {
            min,
            max,
            tag: Some("movable".to_string()),
            mask: CategoryMask::DYNAMIC,
            body: Some(BodyState { fixed: false, mass }),
        });
        self
    }

    /// Number of objects in the scene.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the scene holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl SpatialQuery for SimScene {
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CategoryMask,
    ) -> Result<Option<Hit>, WayError> {
        let dir = direction.normalized();
        if dir == Vec3::ZERO {
            return Err(WayError::Query("zero-length probe direction".to_string()));
        }

        let mut nearest: Option<(f32, Vec3, &SimObject)> = None;
        for obj in &self.objects {
            if !obj.mask.intersects(mask) {
                continue;
            }
            if let Some((t, normal)) = obj.intersect(origin, dir, max_distance) {
                if nearest.as_ref().is_none_or(|(best, _, _)| t < *best) {
                    nearest = Some((t, normal, obj));
                }
            }
        }

        Ok(nearest.map(|(t, normal, obj)| Hit {
            point: origin + dir * t,
            normal,
            distance: t,
            tag: obj.tag.clone(),
            body: obj.body,
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Batch adapter and fixed hints
// ────────────────────────────────────────────────────────────────────────────

/// A [`BatchCaster`] that services a batch by iterating a [`SimScene`].
///
/// Stands in for the accelerated device path in tests and the demo; result
/// values are identical to the CPU path by construction.
#[derive(Debug, Clone)]
pub struct SimBatchCaster {
    scene: SimScene,
}

impl SimBatchCaster {
    pub fn new(scene: SimScene) -> Self {
        Self { scene }
    }
}

impl BatchCaster for SimBatchCaster {
    fn cast_batch(&self, requests: &[ProbeRequest]) -> Result<Vec<Option<Hit>>, WayError> {
        requests
            .iter()
            .map(|r| self.scene.cast(r.origin, r.direction, r.max_distance, r.mask))
            .collect()
    }
}

/// A [`SceneHints`] implementation that always reports its analysis complete
/// and returns a fixed set of directions. Test/demo stand-in for the real
/// scene-understanding collaborator.
#[derive(Debug, Clone, Default)]
pub struct FixedHints {
    directions: Vec<Vec3>,
}

impl FixedHints {
    pub fn new(directions: Vec<Vec3>) -> Self {
        Self { directions }
    }
}

impl SceneHints for FixedHints {
    fn analysis_complete(&self) -> bool {
        true
    }

    fn suggested_directions(&self, _origin: Vec3, _forward: Vec3) -> Vec<Vec3> {
        self.directions.clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn eye() -> Vec3 {
        Vec3::new(0.0, 1.6, 0.0)
    }

    #[test]
    fn empty_scene_returns_no_hit() {
        let scene = SimScene::new();
        let hit = scene.cast(eye(), Vec3::RIGHT, 10.0, CategoryMask::ALL).unwrap();
        assert!(hit.is_none());
    }

    #[test]
    fn wall_hit_distance_and_normal() {
        let scene = SimScene::new().with_wall_x(4.0, 20.0, 3.0);
        let hit = scene
            .cast(eye(), Vec3::RIGHT, 10.0, CategoryMask::ALL)
            .unwrap()
            .expect("wall must be hit");
        assert!((hit.distance - 4.0).abs() < 1e-4);
        // Entry face faces back toward the ray origin.
        assert!((hit.normal.x + 1.0).abs() < 1e-6);
        assert_eq!(hit.tag.as_deref(), Some("wall"));
    }

    #[test]
    fn floor_hit_has_up_normal() {
        let scene = SimScene::new().with_floor(0.0);
        let down = Vec3::new(0.0, -1.0, 0.0);
        let hit = scene
            .cast(eye(), down, 10.0, CategoryMask::ALL)
            .unwrap()
            .expect("floor must be hit");
        assert!((hit.normal.y - 1.0).abs() < 1e-6);
        assert!((hit.distance - 1.6).abs() < 1e-4);
    }

    #[test]
    fn nearest_of_two_walls_wins() {
        let scene = SimScene::new()
            .with_wall_x(8.0, 20.0, 3.0)
            .with_wall_x(3.0, 20.0, 3.0);
        let hit = scene
            .cast(eye(), Vec3::RIGHT, 20.0, CategoryMask::ALL)
            .unwrap()
            .expect("must hit the nearer wall");
        assert!((hit.distance - 3.0).abs() < 1e-4);
    }

    #[test]
    fn max_distance_cuts_off_far_hits() {
        let scene = SimScene::new().with_wall_x(6.0, 20.0, 3.0);
        let hit = scene.cast(eye(), Vec3::RIGHT, 5.0, CategoryMask::ALL).unwrap();
        assert!(hit.is_none());
    }

    #[test]
    fn category_mask_filters_objects() {
        let scene = SimScene::new().with_movable_box(
            Vec3::new(2.0, 0.0, -0.5),
            Vec3::new(3.0, 2.0, 0.5),
            5.0,
        );
        // STATIC-only cast must not see the movable box.
        let miss = scene.cast(eye(), Vec3::RIGHT, 10.0, CategoryMask::STATIC).unwrap();
        assert!(miss.is_none());
        let hit = scene.cast(eye(), Vec3::RIGHT, 10.0, CategoryMask::ALL).unwrap();
        assert!(hit.is_some());
    }

    #[test]
    fn movable_box_carries_body_state() {
        let scene = SimScene::new().with_movable_box(
            Vec3::new(2.0, 0.0, -0.5),
            Vec3::new(3.0, 2.0, 0.5),
            5.0,
        );
        let hit = scene
            .cast(eye(), Vec3::RIGHT, 10.0, CategoryMask::ALL)
            .unwrap()
            .expect("movable box must be hit");
        let body = hit.body.expect("body state present");
        assert!(!body.fixed);
        assert!((body.mass - 5.0).abs() < 1e-6);
    }

    #[test]
    fn zero_direction_is_a_query_error() {
        let scene = SimScene::new().with_floor(0.0);
        let result = scene.cast(eye(), Vec3::ZERO, 10.0, CategoryMask::ALL);
        assert!(matches!(result, Err(WayError::Query(_))));
    }

    #[test]
    fn batch_caster_matches_sequential_casts() {
        let scene = SimScene::new().with_wall_x(4.0, 20.0, 3.0).with_floor(0.0);
        let batch = SimBatchCaster::new(scene.clone());

        let requests: Vec<ProbeRequest> = [Vec3::RIGHT, Vec3::new(0.0, -1.0, 0.0), Vec3::UP]
            .iter()
            .map(|&d| ProbeRequest {
                origin: eye(),
                direction: d,
                max_distance: 10.0,
                mask: CategoryMask::ALL,
                priority: 1.0,
            })
            .collect();

        let batched = batch.cast_batch(&requests).unwrap();
        for (req, slot) in requests.iter().zip(&batched) {
            let direct = scene
                .cast(req.origin, req.direction, req.max_distance, req.mask)
                .unwrap();
            assert_eq!(&direct, slot);
        }
    }

    #[test]
    fn fixed_hints_report_complete() {
        let hints = FixedHints::new(vec![Vec3::RIGHT]);
        assert!(hints.analysis_complete());
        assert_eq!(hints.suggested_directions(Vec3::ZERO, Vec3::UP).len(), 1);
    }
}
