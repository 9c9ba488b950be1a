//! Probe-direction generation.
//!
//! Each scan cycle the [`DirectionSampler`] produces a batch of unit-vector
//! probe directions inside a forward cone. A configurable fraction of the
//! batch is biased toward the predicted travel direction so the system looks
//! where the user is about to walk, and optional "point of interest" hint
//! directions from the scene-understanding collaborator are appended with a
//! higher servicing priority.
//!
//! Sampling uses the uniform-on-cap method: pick a random axis perpendicular
//! to the central direction, then rotate by a random azimuth and a polar
//! angle drawn uniformly in `[0, deviation]`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wayfinder_types::{CategoryMask, ProbeRequest, Vec3};

/// Priority weight of an ordinary cone ray.
pub const BASE_PRIORITY: f32 = 1.0;
/// Priority weight of a scene-understanding hint ray.
pub const HINT_PRIORITY: f32 = 2.0;

/// A predicted-direction vector shorter than this is treated as "no
/// prediction" and the whole batch falls back to uniform cone sampling.
const PREDICTION_EPSILON: f32 = 0.01;

/// Per-cycle sampling parameters, derived from the validated configuration.
#[derive(Debug, Clone, Copy)]
pub struct SamplerParams {
    /// Cone half-angle in radians. Validated upstream to lie in (0, π/2).
    pub cone_half_angle: f32,
    /// Maximum probe distance.
    pub max_distance: f32,
    /// Category filter stamped onto every request.
    pub mask: CategoryMask,
    /// Number of cone rays to generate (hints come on top).
    pub batch_size: usize,
    /// Fraction of the batch biased toward the predicted direction.
    pub prediction_fraction: f32,
    /// Blend weight when interpolating forward toward the prediction.
    pub prediction_blend: f32,
}

/// Generates probe-direction batches. Holds its own RNG so cycles are
/// reproducible under a fixed seed.
#[derive(Debug)]
pub struct DirectionSampler {
    rng: StdRng,
}

impl DirectionSampler {
    /// Entropy-seeded sampler for production use.
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Deterministic sampler for tests.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Produce `batch_size` cone rays plus one ray per hint direction.
    ///
    /// When `predicted` is absent or near zero the prediction-biased share
    /// degrades to uniform cone sampling; hint rays are normalized and
    /// appended with [`HINT_PRIORITY`].
    pub fn generate(
        &mut self,
        origin: Vec3,
        forward: Vec3,
        predicted: Option<Vec3>,
        hints: &[Vec3],
        params: &SamplerParams,
    ) -> Vec<ProbeRequest> {
        let forward = forward.normalized();
        let mut requests = Vec::with_capacity(params.batch_size + hints.len());

        // Prediction bias: blend forward toward the travel direction, then
        // allow at most half the cone of random deviation around the result.
        let biased_centre = predicted
            .filter(|p| p.length() > PREDICTION_EPSILON)
            .map(|p| forward.lerp(p.normalized(), params.prediction_blend).normalized());
        let biased_count = match biased_centre {
            Some(_) => {
                (params.batch_size as f32 * params.prediction_fraction.clamp(0.0, 1.0)) as usize
            }
            None => 0,
        };

        for i in 0..params.batch_size {
            let direction = match biased_centre {
                Some(centre) if i < biased_count => {
                    self.random_cone_direction(centre, params.cone_half_angle * 0.5)
                }
                _ => self.random_cone_direction(forward, params.cone_half_angle),
            };

            requests.push(ProbeRequest {
                origin,
                direction,
                max_distance: params.max_distance,
                mask: params.mask,
                priority: BASE_PRIORITY,
            });
        }

        for hint in hints {
            let direction = hint.normalized();
            if direction == Vec3::ZERO {
                continue;
            }
            requests.push(ProbeRequest {
                origin,
                direction,
                max_distance: params.max_distance,
                mask: params.mask,
                priority: HINT_PRIORITY,
            });
        }

        requests
    }

    /// A unit vector at most `max_angle` radians away from `axis`,
    /// uniform in polar angle over `[0, max_angle]`.
    fn random_cone_direction(&mut self, axis: Vec3, max_angle: f32) -> Vec3 {
        let mut seed_dir = self.random_unit_vector();
        if seed_dir.dot(axis).abs() > 0.99 {
            // Nearly parallel; fall back to a world axis for the cross product.
            seed_dir = axis.cross(Vec3::UP);
            if seed_dir.length() < 0.01 {
                seed_dir = axis.cross(Vec3::RIGHT);
            }
        }
        let perp = axis.cross(seed_dir).normalized();
        let perp2 = axis.cross(perp).normalized();

        let polar = self.rng.gen_range(0.0..=max_angle.max(0.0));
        let azimuth = self.rng.gen_range(0.0..std::f32::consts::TAU);

        (axis * polar.cos()
            + perp * (polar.sin() * azimuth.cos())
            + perp2 * (polar.sin() * azimuth.sin()))
        .normalized()
    }

    /// Uniformly distributed point on the unit sphere.
    fn random_unit_vector(&mut self) -> Vec3 {
        let u: f32 = self.rng.gen_range(-1.0..=1.0);
        let azimuth = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let r = (1.0 - u * u).max(0.0).sqrt();
        Vec3::new(r * azimuth.cos(), u, r * azimuth.sin())
    }
}

impl Default for DirectionSampler {
    fn default() -> Self {
        Self::new()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
