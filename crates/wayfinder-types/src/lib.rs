//! `wayfinder-types` – shared value types for the wayfinder stack.
//!
//! Everything that crosses a crate boundary lives here: probe requests and
//! hits, surface categories, markers and their lifecycle events, scan-cycle
//! states, and the global [`WayError`] taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod vec3;

pub use vec3::Vec3;

// ────────────────────────────────────────────────────────────────────────────
// Probes
// ────────────────────────────────────────────────────────────────────────────

/// Bitmask selecting which scene-object categories a probe may hit.
///
/// The meaning of individual bits is owned by the spatial-query collaborator;
/// the core only carries the mask through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMask(pub u32);

impl CategoryMask {
    /// Match every category.
    pub const ALL: CategoryMask = CategoryMask(u32::MAX);
    /// Static world geometry (walls, floors, furniture).
    pub const STATIC: CategoryMask = CategoryMask(0b01);
    /// Movable bodies.
    pub const DYNAMIC: CategoryMask = CategoryMask(0b10);

    /// True when the two masks share at least one bit.
    pub fn intersects(self, other: CategoryMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for CategoryMask {
    fn default() -> Self {
        CategoryMask::ALL
    }
}

/// A single directed spatial query, created fresh each scan cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeRequest {
    /// Ray origin (usually the head position).
    pub origin: Vec3,
    /// Unit-length ray direction.
    pub direction: Vec3,
    /// Maximum probe distance in metres.
    pub max_distance: f32,
    /// Category filter forwarded to the spatial-query collaborator.
    pub mask: CategoryMask,
    /// Servicing priority; hint rays carry a higher weight than cone rays.
    pub priority: f32,
}

/// Rigid-body state reported for a hit object, used by the classifier to
/// detect movable obstacles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    /// `false` when the body is free to move (non-kinematic).
    pub fixed: bool,
    /// Body mass in kilograms.
    pub mass: f32,
}

/// A successful probe result.
///
/// Both execution strategies (CPU and accelerated batch) return this same
/// plain value type, so downstream classification never depends on which
/// path produced the hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// World-space hit point.
    pub point: Vec3,
    /// Surface normal at the hit point (unit length).
    pub normal: Vec3,
    /// Distance from the probe origin to the hit point.
    pub distance: f32,
    /// Optional surface tag supplied by the scene (e.g. `"floor"`).
    pub tag: Option<String>,
    /// Rigid-body state when the hit object has one.
    pub body: Option<BodyState>,
}

/// A request paired with its hit; ephemeral, consumed within the same cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub request: ProbeRequest,
    pub hit: Hit,
}

// ────────────────────────────────────────────────────────────────────────────
// Surfaces and markers
// ────────────────────────────────────────────────────────────────────────────

/// Semantic category assigned to a classified probe hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceCategory {
    /// Near-vertical surface.
    Wall,
    /// Upward-facing surface at or below eye level.
    Floor,
    /// Downward-facing surface overhead.
    Ceiling,
    /// Slanted surface above head height.
    Overhead,
    /// Slanted surface below waist height.
    GroundLevel,
    /// Movable body, or the fallback for ambiguous near-horizontal surfaces.
    Dynamic,
}

/// Stable identifier for a placed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    /// Mint a fresh random identifier.
    pub fn new() -> Self {
        MarkerId(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A persistent indicator placed at a classified surface/obstacle location.
///
/// Owned exclusively by the marker lifecycle manager; consumers only ever
/// see clones carried by [`MarkerEvent`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub position: Vec3,
    pub category: SurfaceCategory,
    /// Scalar ranking used to decide which markers survive eviction.
    pub importance: f32,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle events emitted toward rendering/audio collaborators.
///
/// Emission is fire-and-forget: the core never awaits a consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarkerEvent {
    /// A marker passed all placement filters and was created.
    Placed(Marker),
    /// A marker was destroyed by eviction or expiry.
    Removed(MarkerId),
    /// The whole working set was cleared (mode off, or explicit clear).
    Cleared,
    /// A presentation-style toggle changed; markers themselves are untouched.
    StyleChanged { proximity: bool, spotlight: bool },
}

/// Consumer of marker lifecycle events.
///
/// Implementations must be cheap and non-blocking; the scan cycle calls
/// [`MarkerSink::emit`] inline on its owning task.
pub trait MarkerSink: Send + Sync {
    fn emit(&self, event: MarkerEvent);
}

/// A sink that discards every event. Default when no collaborator is wired.
#[derive(Debug, Default)]
pub struct NullSink;

impl MarkerSink for NullSink {
    fn emit(&self, _event: MarkerEvent) {}
}

// ────────────────────────────────────────────────────────────────────────────
// Motion and scheduling
// ────────────────────────────────────────────────────────────────────────────

/// A head-position sample retained by the path predictor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub position: Vec3,
    /// Monotonic timestamp in seconds.
    pub timestamp: f64,
}

/// Head pose fed into the scheduler each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub position: Vec3,
    /// Unit-length gaze direction.
    pub forward: Vec3,
}

/// Lifecycle of one scan cycle. Exactly one cycle is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanCycleState {
    Idle,
    Sampling,
    Probing,
    Classifying,
    Done,
    Cancelled,
}

/// Mutually exclusive refresh-trigger strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Re-scan after the head has travelled a configured distance.
    Distance,
    /// Re-scan on an adaptive time interval.
    Time,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Global error type for the wayfinder stack.
///
/// Per-probe and per-collaborator failures are contained locally; only
/// [`WayError::Config`] is fatal (the scheduler refuses to start).
#[derive(Error, Debug)]
pub enum WayError {
    #[error("invalid configuration: {parameter} = {value} (expected {expected})")]
    Config {
        parameter: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("spatial query failed: {0}")]
    Query(String),

    #[error("accelerated batch path unavailable: {0}")]
    BatchUnavailable(String),

    #[error("marker bus send error: {0}")]
    Channel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mask_intersects() {
        assert!(CategoryMask::ALL.intersects(CategoryMask::STATIC));
        assert!(!CategoryMask::STATIC.intersects(CategoryMask::DYNAMIC));
    }

    #[test]
    fn marker_event_serialization_roundtrip() {
        let marker = Marker {
            id: MarkerId::new(),
            position: Vec3::new(1.0, 0.0, 2.0),
            category: SurfaceCategory::Wall,
            importance: 0.8,
            created_at: Utc::now(),
        };
        let event = MarkerEvent::Placed(marker.clone());
        let json = serde_json::to_string(&event).unwrap();
        let back: MarkerEvent = serde_json::from_str(&json).unwrap();
        match back {
            MarkerEvent::Placed(m) => assert_eq!(m.id, marker.id),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn style_changed_roundtrip() {
        let event = MarkerEvent::StyleChanged { proximity: true, spotlight: false };
        let json = serde_json::to_string(&event).unwrap();
        let back: MarkerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn config_error_display_names_parameter() {
        let err = WayError::Config {
            parameter: "cone_half_angle_deg",
            value: "95".to_string(),
            expected: "a value in (0, 90)",
        };
        assert!(err.to_string().contains("cone_half_angle_deg"));
        assert!(err.to_string().contains("(0, 90)"));
    }

    #[test]
    fn null_sink_discards_events() {
        let sink = NullSink;
        sink.emit(MarkerEvent::Cleared);
    }
}
