//! `wayfinder-runtime` – scan-cycle execution and scheduling.
//!
//! The orchestration layer of the sensing core: it owns the working parts
//! from `wayfinder-scan`, drives them against the collaborator ports from
//! `wayfinder-spatial`, and keeps the interactive loop free of blocking
//! probe work.
//!
//! # Modules
//!
//! - [`config`] – [`ScanConfig`][config::ScanConfig]: every numeric knob of
//!   the core, range-validated before the scheduler may start.
//! - [`executor`] – [`ProbeExecutor`][executor::ProbeExecutor]: sequential,
//!   CPU-sharded, and accelerated-batch probe strategies under one
//!   cooperative [`CancelFlag`][executor::CancelFlag].
//! - [`scheduler`] – [`RefreshScheduler`][scheduler::RefreshScheduler]:
//!   the distance/adaptive-time refresh state machine and the mode control
//!   surface (enable/disable/style toggles/single probe).
//! - [`bus`] – [`MarkerBus`][bus::MarkerBus]: broadcast channel carrying
//!   marker lifecycle events to rendering/audio collaborators.

pub mod bus;
pub mod config;
pub mod executor;
pub mod scheduler;

pub use bus::{BroadcastSink, MarkerBus};
pub use config::ScanConfig;
pub use executor::{CancelFlag, ExecOutcome, ProbeExecutor};
pub use scheduler::RefreshScheduler;
