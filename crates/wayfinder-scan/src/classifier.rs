//! Hit classification.
//!
//! Maps a raw probe [`Hit`] to a [`SurfaceCategory`] from the surface normal,
//! the hit object's rigid-body state, and the height difference relative to
//! the observer. Pure and deterministic: the same inputs always yield the
//! same category, regardless of which execution strategy produced the hit.

use wayfinder_types::{Hit, SurfaceCategory, Vec3};

/// Upward normal component above which a surface is a floor.
pub const FLOOR_NORMAL_THRESHOLD: f32 = 0.8;
/// Upward normal component below which a surface is a ceiling.
pub const CEILING_NORMAL_THRESHOLD: f32 = -0.8;
/// Band of |dot(normal, up)| inside which a surface is a wall.
pub const WALL_NORMAL_BAND: f32 = 0.3;
/// Bodies lighter than this are treated as movable even when kinematic.
pub const MOVABLE_MASS_THRESHOLD: f32 = 10.0;
/// Height difference above which an ambiguous surface counts as overhead.
pub const OVERHEAD_HEIGHT: f32 = 0.5;
/// Height difference below which an ambiguous surface counts as ground-level.
pub const GROUND_HEIGHT: f32 = -0.5;

/// Classify a probe hit as seen from `observer`.
///
/// Dynamic-body detection deliberately wins over orientation: a light or
/// free-moving object is [`SurfaceCategory::Dynamic`] no matter which way
/// its surface faces.
pub fn classify(hit: &Hit, observer: Vec3) -> SurfaceCategory {
    if let Some(body) = hit.body {
        if !body.fixed || body.mass < MOVABLE_MASS_THRESHOLD {
            return SurfaceCategory::Dynamic;
        }
    }

    let up_dot = hit.normal.dot(Vec3::UP);
    if up_dot > FLOOR_NORMAL_THRESHOLD {
        return SurfaceCategory::Floor;
    }
    if up_dot < CEILING_NORMAL_THRESHOLD {
        return SurfaceCategory::Ceiling;
    }
    if up_dot.abs() < WALL_NORMAL_BAND {
        return SurfaceCategory::Wall;
    }

    let height_diff = hit.point.y - observer.y;
    if height_diff > OVERHEAD_HEIGHT {
        SurfaceCategory::Overhead
    } else if height_diff < GROUND_HEIGHT {
        SurfaceCategory::GroundLevel
    } else {
        // Near-horizontal slanted surface at body height: ambiguous, bucket
        // with dynamic obstacles.
        SurfaceCategory::Dynamic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_types::BodyState;

    fn hit(normal: Vec3, point_y: f32, body: Option<BodyState>) -> Hit {
        Hit {
            point: Vec3::new(0.0, point_y, 2.0),
            normal,
            distance: 2.0,
            tag: None,
            body,
        }
    }

    fn observer() -> Vec3 {
        Vec3::new(0.0, 1.6, 0.0)
    }

    #[test]
    fn up_normal_fixed_body_is_floor() {
        let h = hit(Vec3::UP, 0.0, None);
        assert_eq!(classify(&h, observer()), SurfaceCategory::Floor);
    }

    #[test]
    fn down_normal_is_ceiling() {
        let h = hit(Vec3::new(0.0, -1.0, 0.0), 3.0, None);
        assert_eq!(classify(&h, observer()), SurfaceCategory::Ceiling);
    }

    #[test]
    fn horizontal_normal_is_wall() {
        let h = hit(Vec3::new(1.0, 0.0, 0.0), 1.5, None);
        assert_eq!(classify(&h, observer()), SurfaceCategory::Wall);
    }

    #[test]
    fn movable_body_wins_over_floor_normal() {
        let h = hit(Vec3::UP, 0.0, Some(BodyState { fixed: false, mass: 50.0 }));
        assert_eq!(classify(&h, observer()), SurfaceCategory::Dynamic);
    }

    #[test]
    fn light_kinematic_body_is_dynamic() {
        let h = hit(Vec3::new(1.0, 0.0, 0.0), 1.5, Some(BodyState { fixed: true, mass: 2.0 }));
        assert_eq!(classify(&h, observer()), SurfaceCategory::Dynamic);
    }

    #[test]
    fn heavy_fixed_body_classified_by_normal() {
        let h = hit(Vec3::new(1.0, 0.0, 0.0), 1.5, Some(BodyState { fixed: true, mass: 100.0 }));
        assert_eq!(classify(&h, observer()), SurfaceCategory::Wall);
    }

    #[test]
    fn slanted_surface_above_head_is_overhead() {
        // 45° slant: up_dot ≈ 0.707, between the wall band and the floor
        // threshold, so height decides.
        let slant = Vec3::new(0.707, 0.707, 0.0);
        let h = hit(slant, 2.5, None);
        assert_eq!(classify(&h, observer()), SurfaceCategory::Overhead);
    }

    #[test]
    fn slanted_surface_below_waist_is_ground_level() {
        let slant = Vec3::new(0.707, 0.707, 0.0);
        let h = hit(slant, 0.5, None);
        assert_eq!(classify(&h, observer()), SurfaceCategory::GroundLevel);
    }

    #[test]
    fn ambiguous_slant_at_body_height_falls_back_to_dynamic() {
        let slant = Vec3::new(0.707, 0.707, 0.0);
        let h = hit(slant, 1.6, None);
        assert_eq!(classify(&h, observer()), SurfaceCategory::Dynamic);
    }

    #[test]
    fn classification_is_deterministic() {
        let h = hit(Vec3::new(0.0, 0.2, 0.98), 1.5, None);
        let first = classify(&h, observer());
        for _ in 0..10 {
            assert_eq!(classify(&h, observer()), first);
        }
    }
}
