//! `wayfinder-spatial` – collaborator ports and the simulated scene.
//!
//! The sensing core consumes its external collaborators through the narrow
//! traits in [`ports`]; nothing in the core depends on a concrete sensor or
//! scene-reconstruction engine.
//!
//! # Modules
//!
//! - [`ports`] – [`SpatialQuery`][ports::SpatialQuery],
//!   [`SceneHints`][ports::SceneHints], and
//!   [`BatchCaster`][ports::BatchCaster] trait seams.
//! - [`sim`] – [`SimScene`][sim::SimScene]: an in-process environment of
//!   tagged axis-aligned boxes for headless tests, CI, and the demo binary.

pub mod ports;
pub mod sim;

pub use ports::{BatchCaster, NullHints, SceneHints, SpatialQuery};
pub use sim::{FixedHints, SimBatchCaster, SimScene};
