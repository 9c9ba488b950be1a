//! Travel-direction prediction from recent head positions.
//!
//! [`PathPredictor`] keeps a fixed-length ring of head-position samples and
//! derives a smoothed predicted-motion direction: per-segment unit directions
//! are averaged with later segments weighted more heavily, then blended into
//! the previous prediction with a fixed exponential-smoothing factor. The
//! result is stable against frame-to-frame jitter while still following
//! sustained turns.

use std::collections::VecDeque;

use wayfinder_types::{MotionSample, Vec3};

/// Fewest samples required before a prediction is computed.
const MIN_SAMPLES: usize = 3;
/// Weighted-average magnitudes below this are treated as noise.
const NOISE_THRESHOLD: f32 = 0.01;
/// Exponential smoothing factor blending a fresh estimate into the previous
/// prediction.
const SMOOTHING: f32 = 0.3;

/// Smoothed predicted-motion estimator over a ring of recent positions.
#[derive(Debug)]
pub struct PathPredictor {
    samples: VecDeque<MotionSample>,
    capacity: usize,
    predicted: Vec3,
}

impl PathPredictor {
    /// Create a predictor retaining the last `capacity` samples
    /// (clamped to at least [`MIN_SAMPLES`]).
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(MIN_SAMPLES)),
            capacity: capacity.max(MIN_SAMPLES),
            predicted: Vec3::ZERO,
        }
    }

    /// Record a head position; drops the oldest sample when the ring is full
    /// and refreshes the prediction once enough samples exist.
    pub fn observe(&mut self, position: Vec3, timestamp: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(MotionSample { position, timestamp });

        if self.samples.len() < MIN_SAMPLES {
            return;
        }

        let count = self.samples.len();
        let mut weighted = Vec3::ZERO;
        for (i, pair) in self.samples.iter().zip(self.samples.iter().skip(1)).enumerate() {
            let segment = (pair.1.position - pair.0.position).normalized();
            // Later segments weigh more: segment i (1-indexed) gets i / count.
            let weight = (i + 1) as f32 / count as f32;
            weighted = weighted + segment * weight;
        }

        if weighted.length() > NOISE_THRESHOLD {
            let fresh = weighted.normalized();
            self.predicted = self.predicted.lerp(fresh, SMOOTHING);
        }
    }

    /// The current smoothed prediction. May be [`Vec3::ZERO`] (or shorter
    /// than the noise threshold) when no sustained motion has been seen.
    pub fn predicted_direction(&self) -> Vec3 {
        self.predicted
    }

    /// The prediction, but only when it is strong enough to use for
    /// sampling bias and importance scoring.
    pub fn valid_prediction(&self) -> Option<Vec3> {
        (self.predicted.length() > NOISE_THRESHOLD).then_some(self.predicted)
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples have been observed yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all samples and the current prediction.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.predicted = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(predictor: &mut PathPredictor, positions: &[Vec3]) {
        for (i, &p) in positions.iter().enumerate() {
            predictor.observe(p, i as f64 * 0.5);
        }
    }

    #[test]
    fn too_few_samples_yield_no_prediction() {
        let mut p = PathPredictor::new(10);
        walk(&mut p, &[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]);
        assert!(p.valid_prediction().is_none());
    }

    #[test]
    fn straight_walk_predicts_travel_direction() {
        let mut p = PathPredictor::new(10);
        walk(
            &mut p,
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
            ],
        );
        let dir = p.predicted_direction().normalized();
        assert!((dir.x - 1.0).abs() < 1e-4, "expected +x, got {dir:?}");
        assert!(dir.y.abs() < 1e-4);
        assert!(dir.z.abs() < 1e-4);
        assert!(p.valid_prediction().is_some());
    }

    #[test]
    fn prediction_converges_under_sustained_motion() {
        let mut p = PathPredictor::new(10);
        let positions: Vec<Vec3> = (0..10).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        walk(&mut p, &positions);
        // Repeated smoothing toward +x drives the magnitude toward 1.
        assert!(p.predicted_direction().length() > 0.7);
    }

    #[test]
    fn stationary_jitter_leaves_prediction_unchanged() {
        let mut p = PathPredictor::new(10);
        walk(
            &mut p,
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
            ],
        );
        let before = p.predicted_direction();
        // Back-and-forth jitter: segment directions cancel out.
        walk(
            &mut p,
            &[
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.001, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.001, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.001, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
            ],
        );
        // Prediction may decay but must not flip away from +x.
        assert!(p.predicted_direction().normalized().dot(before.normalized()) > 0.9);
    }

    #[test]
    fn ring_drops_oldest_sample_when_full() {
        let mut p = PathPredictor::new(4);
        let positions: Vec<Vec3> = (0..9).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        walk(&mut p, &positions);
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn capacity_is_clamped_to_minimum() {
        let p = PathPredictor::new(1);
        assert_eq!(p.capacity, MIN_SAMPLES);
    }

    #[test]
    fn sustained_turn_swings_the_prediction() {
        let mut p = PathPredictor::new(10);
        // Walk east, then keep walking north for a while.
        let mut positions: Vec<Vec3> = (0..5).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        for i in 1..12 {
            positions.push(Vec3::new(4.0, 0.0, i as f32));
        }
        walk(&mut p, &positions);
        let dir = p.predicted_direction().normalized();
        assert!(dir.z > 0.8, "prediction should follow the turn, got {dir:?}");
    }

    #[test]
    fn clear_resets_samples_and_prediction() {
        let mut p = PathPredictor::new(10);
        walk(
            &mut p,
            &[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
        );
        p.clear();
        assert!(p.is_empty());
        assert_eq!(p.predicted_direction(), Vec3::ZERO);
    }
}
