//! `wayfinder-scan` – the perception math of the sensing core.
//!
//! Turns a head pose and a stream of probe hits into a bounded, prioritized
//! working set of obstacle markers.
//!
//! # Modules
//!
//! - [`sampler`] – [`DirectionSampler`][sampler::DirectionSampler]: generates
//!   unit-vector probe batches inside a forward cone, biased toward the
//!   predicted travel direction and enriched with scene-understanding hints.
//! - [`classifier`] – [`classify`][classifier::classify]: maps a raw hit to a
//!   [`SurfaceCategory`][wayfinder_types::SurfaceCategory] from its normal,
//!   rigid-body state, and height relative to the observer.
//! - [`predictor`] – [`PathPredictor`][predictor::PathPredictor]: smoothed
//!   travel-direction estimate over a ring of recent head positions.
//! - [`markers`] – [`MarkerField`][markers::MarkerField]: placement filters,
//!   importance scoring, overflow eviction, and dynamic-marker expiry.

pub mod classifier;
pub mod markers;
pub mod predictor;
pub mod sampler;

pub use classifier::classify;
pub use markers::{MarkerField, PlacementContext, importance_score};
pub use predictor::PathPredictor;
pub use sampler::{DirectionSampler, SamplerParams};
