//! Validated scan configuration.
//!
//! Every numeric knob of the sensing core lives in [`ScanConfig`]. The struct
//! deserializes from TOML with per-field defaults, and [`ScanConfig::validate`]
//! checks every documented range before the scheduler is allowed to start:
//! an out-of-range value is a fatal startup error, never a runtime fault.

use serde::{Deserialize, Serialize};
use wayfinder_types::{TriggerMode, WayError};

/// Full configuration of the sensing-and-scheduling core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Probe cone half-angle in degrees. Valid range: (0, 90) exclusive.
    #[serde(default = "default_cone_half_angle_deg")]
    pub cone_half_angle_deg: f32,

    /// Cone rays generated per scan cycle (hints come on top). [1, 256].
    #[serde(default = "default_probe_batch")]
    pub probe_batch: usize,

    /// Maximum probe distance in metres. (0, 100].
    #[serde(default = "default_max_depth")]
    pub max_depth: f32,

    /// Nominal marker count; eviction caps the set at 1.5× this. [1, 200].
    #[serde(default = "default_target_marker_count")]
    pub target_marker_count: usize,

    /// Minimum distance between any two live markers, in metres. (0, 5].
    #[serde(default = "default_min_marker_spacing")]
    pub min_marker_spacing: f32,

    /// Refresh-trigger strategy.
    #[serde(default = "default_trigger")]
    pub trigger: TriggerMode,

    /// Distance-trigger threshold in metres. (0, 50].
    #[serde(default = "default_refresh_distance")]
    pub refresh_distance: f32,

    /// Base time-trigger interval in seconds. (0, 120].
    #[serde(default = "default_base_refresh_interval")]
    pub base_refresh_interval: f32,

    /// Lower bound of the adaptive interval in seconds.
    /// (0, base_refresh_interval].
    #[serde(default = "default_interval_floor")]
    pub interval_floor: f32,

    /// Head speed (m/s) above which the adaptive interval shortens. > 0.
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: f32,

    /// Head rotation rate (deg/s) above which the adaptive interval
    /// shortens. (0, 180).
    #[serde(default = "default_rotation_threshold_deg")]
    pub rotation_threshold_deg: f32,

    /// Fraction of each batch biased toward the predicted direction. [0, 1].
    #[serde(default = "default_prediction_fraction")]
    pub prediction_fraction: f32,

    /// Blend weight pulling biased rays from forward toward the predicted
    /// direction. [0, 1].
    #[serde(default = "default_prediction_blend")]
    pub prediction_blend: f32,

    /// Head-position samples retained by the path predictor. [3, 64].
    #[serde(default = "default_predictor_samples")]
    pub predictor_samples: usize,

    /// Worker count for the CPU-sharded probe path. [1, 8].
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Maximum requests per accelerated batch dispatch. [1, 1024].
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,
}

fn default_cone_half_angle_deg() -> f32 {
    30.0
}
fn default_probe_batch() -> usize {
    32
}
fn default_max_depth() -> f32 {
    10.0
}
fn default_target_marker_count() -> usize {
    20
}
fn default_min_marker_spacing() -> f32 {
    0.5
}
fn default_trigger() -> TriggerMode {
    TriggerMode::Distance
}
fn default_refresh_distance() -> f32 {
    2.0
}
fn default_base_refresh_interval() -> f32 {
    3.0
}
fn default_interval_floor() -> f32 {
    0.5
}
fn default_movement_threshold() -> f32 {
    0.3
}
fn default_rotation_threshold_deg() -> f32 {
    30.0
}
fn default_prediction_fraction() -> f32 {
    0.25
}
fn default_prediction_blend() -> f32 {
    0.7
}
fn default_predictor_samples() -> usize {
    10
}
fn default_parallelism() -> usize {
    4
}
fn default_batch_cap() -> usize {
    64
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cone_half_angle_deg: default_cone_half_angle_deg(),
            probe_batch: default_probe_batch(),
            max_depth: default_max_depth(),
            target_marker_count: default_target_marker_count(),
            min_marker_spacing: default_min_marker_spacing(),
            trigger: default_trigger(),
            refresh_distance: default_refresh_distance(),
            base_refresh_interval: default_base_refresh_interval(),
            interval_floor: default_interval_floor(),
            movement_threshold: default_movement_threshold(),
            rotation_threshold_deg: default_rotation_threshold_deg(),
            prediction_fraction: default_prediction_fraction(),
            prediction_blend: default_prediction_blend(),
            predictor_samples: default_predictor_samples(),
            parallelism: default_parallelism(),
            batch_cap: default_batch_cap(),
        }
    }
}

impl ScanConfig {
    /// Check every parameter against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::Config`] naming the first offending parameter.
    /// The scheduler refuses to start on any configuration error.
    pub fn validate(&self) -> Result<(), WayError> {
        fn fail(
            parameter: &'static str,
            value: impl std::fmt::Display,
            expected: &'static str,
        ) -> Result<(), WayError> {
            Err(WayError::Config { parameter, value: value.to_string(), expected })
        }

        if self.cone_half_angle_deg <= 0.0 || self.cone_half_angle_deg >= 90.0 {
            return fail("cone_half_angle_deg", self.cone_half_angle_deg, "a value in (0, 90)");
        }
        if self.probe_batch == 0 || self.probe_batch > 256 {
            return fail("probe_batch", self.probe_batch, "a value in [1, 256]");
        }
        if self.max_depth <= 0.0 || self.max_depth > 100.0 {
            return fail("max_depth", self.max_depth, "a value in (0, 100]");
        }
        if self.target_marker_count == 0 || self.target_marker_count > 200 {
            return fail("target_marker_count", self.target_marker_count, "a value in [1, 200]");
        }
        if self.min_marker_spacing <= 0.0 || self.min_marker_spacing > 5.0 {
            return fail("min_marker_spacing", self.min_marker_spacing, "a value in (0, 5]");
        }
        if self.refresh_distance <= 0.0 || self.refresh_distance > 50.0 {
            return fail("refresh_distance", self.refresh_distance, "a value in (0, 50]");
        }
        if self.base_refresh_interval <= 0.0 || self.base_refresh_interval > 120.0 {
            return fail(
                "base_refresh_interval",
                self.base_refresh_interval,
                "a value in (0, 120]",
            );
        }
        if self.interval_floor <= 0.0 || self.interval_floor > self.base_refresh_interval {
            return fail(
                "interval_floor",
                self.interval_floor,
                "a value in (0, base_refresh_interval]",
            );
        }
        if self.movement_threshold <= 0.0 {
            return fail("movement_threshold", self.movement_threshold, "a positive value");
        }
        if self.rotation_threshold_deg <= 0.0 || self.rotation_threshold_deg >= 180.0 {
            return fail(
                "rotation_threshold_deg",
                self.rotation_threshold_deg,
                "a value in (0, 180)",
            );
        }
        if !(0.0..=1.0).contains(&self.prediction_fraction) {
            return fail("prediction_fraction", self.prediction_fraction, "a value in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.prediction_blend) {
            return fail("prediction_blend", self.prediction_blend, "a value in [0, 1]");
        }
        if self.predictor_samples < 3 || self.predictor_samples > 64 {
            return fail("predictor_samples", self.predictor_samples, "a value in [3, 64]");
        }
        if self.parallelism == 0 || self.parallelism > 8 {
            return fail("parallelism", self.parallelism, "a value in [1, 8]");
        }
        if self.batch_cap == 0 || self.batch_cap > 1024 {
            return fail("batch_cap", self.batch_cap, "a value in [1, 1024]");
        }
        Ok(())
    }

    /// Cone half-angle in radians.
    pub fn cone_half_angle(&self) -> f32 {
        self.cone_half_angle_deg.to_radians()
    }
}
