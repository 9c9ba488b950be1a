//! Marker lifecycle: placement filters, importance scoring, eviction.
//!
//! [`MarkerField`] owns the live working set of placed markers. Placement is
//! gated by a suppress set, a height window, and a minimum inter-marker
//! spacing; every surviving candidate gets an importance score that later
//! decides which markers are destroyed when the set overflows. All lifecycle
//! transitions are announced to a [`MarkerSink`] as fire-and-forget events.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;
use wayfinder_types::{
    Hit, Marker, MarkerEvent, MarkerId, MarkerSink, NullSink, SurfaceCategory, Vec3,
};

/// Markers are only placed within this height window around the observer.
const HEIGHT_WINDOW: f32 = 1.0;
/// Importance multiplier for wall markers.
const WALL_MULTIPLIER: f32 = 1.2;
/// The live set may exceed the target by this factor before eviction bites.
const OVERFLOW_FACTOR: f32 = 1.5;
/// Dynamic markers are dropped after this many seconds without re-detection.
const DYNAMIC_TTL_SECS: f32 = 5.0;
/// Importance weight of the distance factor.
const DISTANCE_WEIGHT: f32 = 0.5;
/// Importance weight of the gaze-alignment factor.
const ALIGNMENT_WEIGHT: f32 = 0.3;
/// Importance weight of the height factor.
const HEIGHT_WEIGHT: f32 = 0.2;

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Per-cycle observer context captured once when a cycle reaches the
/// classification phase.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext {
    /// Head position at cycle start.
    pub observer: Vec3,
    /// Gaze direction at cycle start (unit length).
    pub forward: Vec3,
    /// Valid predicted travel direction, when one exists.
    pub predicted: Option<Vec3>,
    /// Maximum probe depth, used to normalize the distance factor.
    pub max_depth: f32,
}

/// Owner of the live marker working set.
///
/// Only this type creates and destroys markers; collaborators observe the
/// lifecycle through the sink.
pub struct MarkerField {
    target_count: usize,
    min_spacing: f32,
    suppress: HashSet<SurfaceCategory>,
    markers: Vec<Marker>,
    sink: Arc<dyn MarkerSink>,
}

impl MarkerField {
    /// Create a field with the default suppress set (floors and ceilings are
    /// not marked) and a no-op sink.
    pub fn new(target_count: usize, min_spacing: f32) -> Self {
        Self {
            target_count,
            min_spacing,
            suppress: HashSet::from([SurfaceCategory::Floor, SurfaceCategory::Ceiling]),
            markers: Vec::new(),
            sink: Arc::new(NullSink),
        }
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn MarkerSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the suppressed-category set.
    pub fn with_suppressed(mut self, suppress: HashSet<SurfaceCategory>) -> Self {
        self.suppress = suppress;
        self
    }

    /// Try to place a marker for a classified hit.
    ///
    /// Returns `true` when a marker was created. All filters must pass:
    /// category not suppressed, height difference inside the window, no live
    /// marker of any category within the minimum spacing, and a non-negative
    /// importance score.
    pub fn place(&mut self, ctx: &PlacementContext, hit: &Hit, category: SurfaceCategory) -> bool {
        if self.suppress.contains(&category) {
            return false;
        }

        let height_diff = hit.point.y - ctx.observer.y;
        if height_diff.abs() >= HEIGHT_WINDOW {
            return false;
        }

        if self
            .markers
            .iter()
            .any(|m| m.position.distance(hit.point) < self.min_spacing)
        {
            return false;
        }

        let importance = importance_score(ctx, hit.point, hit.distance, category);
        if importance < 0.0 {
            return false;
        }

        let marker = Marker {
            id: MarkerId::new(),
            position: hit.point,
            category,
            importance,
            created_at: Utc::now(),
        };
        debug!(id = ?marker.id, ?category, importance, "marker placed");
        self.sink.emit(MarkerEvent::Placed(marker.clone()));
        self.markers.push(marker);
        true
    }

    /// Destroy the lowest-importance markers beyond the overflow cutoff
    /// (`⌊1.5 × target⌋`). Idempotent: a second call with no intervening
    /// placement removes nothing.
    pub fn evict_overflow(&mut self) {
        let cutoff = (self.target_count as f32 * OVERFLOW_FACTOR) as usize;
        if self.markers.len() <= cutoff {
            return;
        }
        self.markers.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for marker in self.markers.drain(cutoff..) {
            debug!(id = ?marker.id, importance = marker.importance, "marker evicted");
            self.sink.emit(MarkerEvent::Removed(marker.id));
        }
    }

    /// Drop dynamic markers that have outlived their tracking window.
    ///
    /// Dynamic obstacles move; a stale marker is worse than none.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) {
        let ttl = TimeDelta::milliseconds((DYNAMIC_TTL_SECS * 1000.0) as i64);
        let sink = Arc::clone(&self.sink);
        self.markers.retain(|m| {
            let expired = m.category == SurfaceCategory::Dynamic && now - m.created_at > ttl;
            if expired {
                sink.emit(MarkerEvent::Removed(m.id));
            }
            !expired
        });
    }

    /// Destroy every live marker. The only operation besides eviction and
    /// expiry allowed to shrink the set, and the only one that empties it.
    pub fn clear_all(&mut self) {
        self.markers.clear();
        self.sink.emit(MarkerEvent::Cleared);
    }

    /// Number of live markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// True when no markers are placed.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// The live working set, in no particular order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

/// Importance score for a candidate marker.
///
/// `(distance·0.5 + alignment·0.3·pathAlignment + height·0.2) × categoryMultiplier`
/// where nearer, more gaze-centred, eye-level surfaces score higher, walls
/// get a 1.2× boost, and surfaces along the predicted travel path get up to
/// a further 1.5× on the alignment term.
pub fn importance_score(
    ctx: &PlacementContext,
    position: Vec3,
    distance: f32,
    category: SurfaceCategory,
) -> f32 {
    let distance_factor = 1.0 - clamp01(distance / ctx.max_depth);

    let dir_to_hit = (position - ctx.observer).normalized();
    let alignment_factor = (ctx.forward.dot(dir_to_hit) + 1.0) / 2.0;

    let path_alignment_factor = match ctx.predicted {
        Some(predicted) => {
            let along = clamp01((predicted.normalized().dot(dir_to_hit) + 1.0) / 2.0);
            1.0 + 0.5 * along
        }
        None => 1.0,
    };

    let height_diff = (position.y - ctx.observer.y).abs();
    let height_factor = 1.0 - clamp01(height_diff / HEIGHT_WINDOW);

    let multiplier = if category == SurfaceCategory::Wall { WALL_MULTIPLIER } else { 1.0 };

    (distance_factor * DISTANCE_WEIGHT
        + alignment_factor * ALIGNMENT_WEIGHT * path_alignment_factor
        + height_factor * HEIGHT_WEIGHT)
        * multiplier
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records every event for assertions.
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<MarkerEvent>>,
    }

    impl MarkerSink for RecordingSink {
        fn emit(&self, event: MarkerEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn ctx() -> PlacementContext {
        PlacementContext {
            observer: Vec3::new(0.0, 1.6, 0.0),
            forward: Vec3::new(0.0, 0.0, 1.0),
            predicted: None,
            max_depth: 10.0,
        }
    }

    fn wall_hit(x: f32, z: f32) -> Hit {
        let point = Vec3::new(x, 1.5, z);
        Hit {
            point,
            normal: Vec3::new(-1.0, 0.0, 0.0),
            distance: point.distance(ctx().observer),
            tag: Some("wall".to_string()),
            body: None,
        }
    }

    #[test]
    fn place_accepts_a_plain_wall_hit() {
        let mut field = MarkerField::new(20, 0.3);
        assert!(field.place(&ctx(), &wall_hit(0.0, 3.0), SurfaceCategory::Wall));
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn suppressed_categories_are_rejected() {
        let mut field = MarkerField::new(20, 0.3);
        let mut hit = wall_hit(0.0, 3.0);
        hit.point.y = 1.4;
        assert!(!field.place(&ctx(), &hit, SurfaceCategory::Floor));
        assert!(!field.place(&ctx(), &hit, SurfaceCategory::Ceiling));
        assert!(field.is_empty());
    }

    #[test]
    fn hits_outside_height_window_are_rejected() {
        let mut field = MarkerField::new(20, 0.3);
        let mut hit = wall_hit(0.0, 3.0);
        hit.point.y = 3.0; // 1.4 m above the observer's eyes
        assert!(!field.place(&ctx(), &hit, SurfaceCategory::Wall));
    }

    #[test]
    fn spacing_filter_rejects_close_pairs() {
        let mut field = MarkerField::new(20, 0.5);
        assert!(field.place(&ctx(), &wall_hit(0.0, 3.0), SurfaceCategory::Wall));
        // 0.2 m away from the first marker.
        assert!(!field.place(&ctx(), &wall_hit(0.2, 3.0), SurfaceCategory::Wall));
        // 1.0 m away is fine.
        assert!(field.place(&ctx(), &wall_hit(1.0, 3.0), SurfaceCategory::Wall));
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn spacing_invariant_holds_across_the_working_set() {
        let mut field = MarkerField::new(50, 0.3);
        let context = ctx();
        for i in 0..40 {
            let hit = wall_hit((i as f32) * 0.17, 3.0);
            field.place(&context, &hit, SurfaceCategory::Wall);
        }
        let markers = field.markers();
        for (i, a) in markers.iter().enumerate() {
            for b in &markers[i + 1..] {
                assert!(
                    a.position.distance(b.position) >= 0.3 - 1e-5,
                    "markers too close: {:?} / {:?}",
                    a.position,
                    b.position
                );
            }
        }
    }

    #[test]
    fn eviction_caps_the_set_and_keeps_the_most_important() {
        let mut field = MarkerField::new(4, 0.1); // cutoff = 6
        let context = ctx();
        // Increasing distance → decreasing importance.
        for i in 0..10 {
            let hit = wall_hit(0.0, 1.0 + i as f32 * 0.5);
            assert!(field.place(&context, &hit, SurfaceCategory::Wall));
        }
        assert_eq!(field.len(), 10);
        field.evict_overflow();
        assert_eq!(field.len(), 6);
        // Survivors are the nearest (highest-importance) hits.
        let max_z = field
            .markers()
            .iter()
            .map(|m| m.position.z)
            .fold(f32::MIN, f32::max);
        assert!(max_z < 1.0 + 6.0 * 0.5);
    }

    #[test]
    fn evict_overflow_is_idempotent() {
        let mut field = MarkerField::new(2, 0.1); // cutoff = 3
        let context = ctx();
        for i in 0..8 {
            field.place(&context, &wall_hit(0.0, 1.0 + i as f32 * 0.5), SurfaceCategory::Wall);
        }
        field.evict_overflow();
        let after_first = field.len();
        field.evict_overflow();
        assert_eq!(field.len(), after_first);
    }

    #[test]
    fn clear_all_empties_the_set_and_emits_cleared() {
        let sink = Arc::new(RecordingSink::default());
        let mut field = MarkerField::new(20, 0.3).with_sink(sink.clone());
        field.place(&ctx(), &wall_hit(0.0, 3.0), SurfaceCategory::Wall);
        field.clear_all();
        assert!(field.is_empty());
        let events = sink.events.lock().unwrap();
        assert!(matches!(events.last(), Some(MarkerEvent::Cleared)));
    }

    #[test]
    fn sink_sees_placed_and_removed_events() {
        let sink = Arc::new(RecordingSink::default());
        let mut field = MarkerField::new(1, 0.1).with_sink(sink.clone()); // cutoff = 1
        let context = ctx();
        field.place(&context, &wall_hit(0.0, 2.0), SurfaceCategory::Wall);
        field.place(&context, &wall_hit(0.0, 4.0), SurfaceCategory::Wall);
        field.evict_overflow();

        let events = sink.events.lock().unwrap();
        let placed = events.iter().filter(|e| matches!(e, MarkerEvent::Placed(_))).count();
        let removed = events.iter().filter(|e| matches!(e, MarkerEvent::Removed(_))).count();
        assert_eq!(placed, 2);
        assert_eq!(removed, 1);
    }

    #[test]
    fn dynamic_markers_expire_after_ttl() {
        let mut field = MarkerField::new(20, 0.1);
        let context = ctx();
        let mut hit = wall_hit(0.0, 2.0);
        hit.body = None;
        assert!(field.place(&context, &hit, SurfaceCategory::Dynamic));
        assert!(field.place(&context, &wall_hit(2.0, 3.0), SurfaceCategory::Wall));

        // Well past the 5 s tracking window.
        let later = Utc::now() + TimeDelta::seconds(10);
        field.prune_expired(later);

        assert_eq!(field.len(), 1);
        assert_eq!(field.markers()[0].category, SurfaceCategory::Wall);
    }

    #[test]
    fn prune_leaves_fresh_dynamic_markers_alone() {
        let mut field = MarkerField::new(20, 0.1);
        field.place(&ctx(), &wall_hit(0.0, 2.0), SurfaceCategory::Dynamic);
        field.prune_expired(Utc::now());
        assert_eq!(field.len(), 1);
    }

    // ── importance scoring ──────────────────────────────────────────────────

    #[test]
    fn nearer_hits_score_higher() {
        let context = ctx();
        let near = importance_score(&context, Vec3::new(0.0, 1.5, 2.0), 2.0, SurfaceCategory::Dynamic);
        let far = importance_score(&context, Vec3::new(0.0, 1.5, 8.0), 8.0, SurfaceCategory::Dynamic);
        assert!(near > far);
    }

    #[test]
    fn walls_get_the_category_boost() {
        let context = ctx();
        let pos = Vec3::new(0.0, 1.5, 3.0);
        let wall = importance_score(&context, pos, 3.0, SurfaceCategory::Wall);
        let other = importance_score(&context, pos, 3.0, SurfaceCategory::Dynamic);
        assert!((wall / other - WALL_MULTIPLIER).abs() < 1e-5);
    }

    #[test]
    fn hits_along_the_predicted_path_score_higher() {
        let mut context = ctx();
        let pos = Vec3::new(0.0, 1.5, 3.0); // straight ahead
        let without = importance_score(&context, pos, 3.0, SurfaceCategory::Dynamic);
        context.predicted = Some(Vec3::new(0.0, 0.0, 1.0));
        let with = importance_score(&context, pos, 3.0, SurfaceCategory::Dynamic);
        assert!(with > without);
    }

    #[test]
    fn centre_of_gaze_scores_higher_than_periphery() {
        let context = ctx();
        let ahead = importance_score(&context, Vec3::new(0.0, 1.6, 3.0), 3.0, SurfaceCategory::Dynamic);
        let side = importance_score(&context, Vec3::new(3.0, 1.6, 0.0), 3.0, SurfaceCategory::Dynamic);
        assert!(ahead > side);
    }
}
