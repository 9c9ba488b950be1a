//! Collaborator ports consumed by the sensing core.
//!
//! The core never talks to a physical sensor or scene-reconstruction engine
//! directly; it only sees these three narrow traits. Production wiring
//! implements them against the real subsystem, tests and the demo use the
//! simulated scene in [`sim`][crate::sim].

use wayfinder_types::{CategoryMask, Hit, ProbeRequest, Vec3, WayError};

/// The spatial query port: "cast a ray, return the nearest hit, if any".
///
/// Absence of a hit is a normal outcome, not an error. An `Err` from a
/// single cast is contained by the caller (treated as "no hit") and never
/// aborts a scan cycle.
pub trait SpatialQuery: Send + Sync {
    /// Cast a ray from `origin` along the unit vector `direction`, up to
    /// `max_distance`, filtered by `mask`.
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CategoryMask,
    ) -> Result<Option<Hit>, WayError>;
}

/// Optional scene-understanding collaborator supplying "points of interest"
/// probe directions (openings, corners, walkable-surface samples).
///
/// The core degrades gracefully when no collaborator is wired: no hints,
/// identical sampler behavior otherwise.
pub trait SceneHints: Send + Sync {
    /// True once the collaborator's scene analysis has completed. Hints are
    /// only consumed after this returns `true`.
    fn analysis_complete(&self) -> bool;

    /// Suggested probe directions from `origin`, given the current gaze
    /// `forward`. Directions need not be normalized; the sampler takes care
    /// of that.
    fn suggested_directions(&self, origin: Vec3, forward: Vec3) -> Vec<Vec3>;
}

/// Accelerated data-parallel batch executor (a device compute path).
///
/// One dispatch handles at most the configured batch cap; larger request
/// lists are chunked by the caller. An `Err` makes the executor fall back
/// to the CPU-sharded path for the rest of that cycle.
pub trait BatchCaster: Send + Sync {
    /// Execute a batch of probes, returning one slot per request in order.
    fn cast_batch(&self, requests: &[ProbeRequest]) -> Result<Vec<Option<Hit>>, WayError>;
}

/// A hints collaborator that is never ready. Default when scene
/// understanding is absent.
#[derive(Debug, Default)]
pub struct NullHints;

impl SceneHints for NullHints {
    fn analysis_complete(&self) -> bool {
        false
    }

    fn suggested_directions(&self, _origin: Vec3, _forward: Vec3) -> Vec<Vec3> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockQuery;

    impl SpatialQuery for MockQuery {
        fn cast(
            &self,
            origin: Vec3,
            direction: Vec3,
            max_distance: f32,
            _mask: CategoryMask,
        ) -> Result<Option<Hit>, WayError> {
            // A flat wall 2 m ahead on +z, regardless of direction.
            if direction.z <= 0.0 || max_distance < 2.0 {
                return Ok(None);
            }
            Ok(Some(Hit {
                point: origin + direction * 2.0,
                normal: Vec3::new(0.0, 0.0, -1.0),
                distance: 2.0,
                tag: Some("mock_wall".to_string()),
                body: None,
            }))
        }
    }

    #[test]
    fn mock_query_hits_forward() {
        let q = MockQuery;
        let hit = q
            .cast(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 10.0, CategoryMask::ALL)
            .unwrap()
            .expect("forward ray must hit");
        assert!((hit.distance - 2.0).abs() < 1e-6);
        assert_eq!(hit.tag.as_deref(), Some("mock_wall"));
    }

    #[test]
    fn mock_query_misses_backward() {
        let q = MockQuery;
        let hit = q
            .cast(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 10.0, CategoryMask::ALL)
            .unwrap();
        assert!(hit.is_none());
    }

    #[test]
    fn null_hints_never_complete() {
        let hints = NullHints;
        assert!(!hints.analysis_complete());
        assert!(hints.suggested_directions(Vec3::ZERO, Vec3::UP).is_empty());
    }
}
