//! [`RefreshScheduler`] – the scan-cycle orchestrator.
//!
//! Owns the direction sampler, probe executor, marker field, and path
//! predictor, and decides frame after frame when to run a new scan cycle:
//!
//! 1. **Trigger** – distance travelled since the last completed cycle, or an
//!    adaptive time interval that shortens while the head is actively moving
//!    or turning.
//! 2. **Sample** – build a probe batch biased by the predicted travel
//!    direction, plus scene-understanding hints when available.
//! 3. **Probe** – hand the batch to the executor on a spawned task so the
//!    interactive loop never blocks on probing.
//! 4. **Classify & place** – once the task rejoins, classify each hit and
//!    feed it to the marker field on the scheduler's own context, then run
//!    overflow eviction.
//!
//! Exactly one cycle is active at a time. Starting a new cycle while a prior
//! one is still probing cancels the prior cycle and waits for the executor's
//! acknowledgment before sampling begins; the prior cycle's partial results
//! are discarded, never merged.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wayfinder_runtime::{RefreshScheduler, ScanConfig};
//! use wayfinder_spatial::SimScene;
//! use wayfinder_types::{HeadPose, Vec3};
//!
//! # async fn demo() -> Result<(), wayfinder_types::WayError> {
//! let scene = Arc::new(SimScene::new().with_floor(0.0).with_wall_x(3.0, 20.0, 3.0));
//! let mut scheduler = RefreshScheduler::new(ScanConfig::default(), scene)?;
//! let pose = HeadPose { position: Vec3::new(0.0, 1.6, 0.0), forward: Vec3::new(0.0, 0.0, 1.0) };
//! scheduler.enable(pose).await;
//! loop {
//!     scheduler.update(pose, 0.016).await;
//! }
//! # }
//! ```

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use wayfinder_scan::{DirectionSampler, MarkerField, PathPredictor, PlacementContext, classify};
use wayfinder_scan::sampler::SamplerParams;
use wayfinder_spatial::{BatchCaster, SceneHints, SpatialQuery};
use wayfinder_types::{
    CategoryMask, HeadPose, Marker, MarkerEvent, MarkerSink, NullSink, ProbeRequest,
    ScanCycleState, TriggerMode, Vec3, WayError,
};

use crate::config::ScanConfig;
use crate::executor::{CancelFlag, ExecOutcome, ProbeExecutor};

/// A probe cycle whose executor task has been spawned but not yet rejoined.
struct InflightCycle {
    cancel: CancelFlag,
    handle: JoinHandle<ExecOutcome>,
    ctx: PlacementContext,
}

/// The refresh state machine. See the module docs for the cycle shape.
pub struct RefreshScheduler {
    config: ScanConfig,
    sampler: DirectionSampler,
    port: Arc<dyn SpatialQuery>,
    executor: Arc<ProbeExecutor>,
    field: MarkerField,
    predictor: PathPredictor,
    hints: Option<Arc<dyn SceneHints>>,
    sink: Arc<dyn MarkerSink>,

    enabled: bool,
    proximity_style: bool,
    spotlight_style: bool,

    state: ScanCycleState,
    inflight: Option<InflightCycle>,
    /// Monotonic time accumulated from `update` deltas, in seconds.
    clock: f64,
    last_pose: Option<HeadPose>,
    /// Head position when the last completed cycle started.
    last_cycle_origin: Option<Vec3>,
    elapsed_since_cycle: f32,
    adaptive_interval: f32,
    cycles_started: u64,
}

impl RefreshScheduler {
    /// Build a scheduler over the given spatial query port.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::Config`] when any parameter is out of range; a
    /// scheduler is never constructed from an invalid configuration.
    pub fn new(config: ScanConfig, port: Arc<dyn SpatialQuery>) -> Result<Self, WayError> {
        config.validate()?;
        let executor = Arc::new(ProbeExecutor::new(
            Arc::clone(&port),
            config.parallelism,
            config.batch_cap,
        ));
        let sink: Arc<dyn MarkerSink> = Arc::new(NullSink);
        Ok(Self {
            field: MarkerField::new(config.target_marker_count, config.min_marker_spacing),
            predictor: PathPredictor::new(config.predictor_samples),
            adaptive_interval: config.base_refresh_interval,
            config,
            sampler: DirectionSampler::new(),
            port,
            executor,
            hints: None,
            sink,
            enabled: false,
            proximity_style: false,
            spotlight_style: false,
            state: ScanCycleState::Idle,
            inflight: None,
            clock: 0.0,
            last_pose: None,
            last_cycle_origin: None,
            elapsed_since_cycle: 0.0,
            cycles_started: 0,
        })
    }

    /// Prefer an accelerated batch caster for probe execution.
    pub fn with_batch_caster(mut self, caster: Arc<dyn BatchCaster>) -> Self {
        self.executor = Arc::new(
            ProbeExecutor::new(
                Arc::clone(&self.port),
                self.config.parallelism,
                self.config.batch_cap,
            )
            .with_batch_caster(caster),
        );
        self
    }

    /// Wire the scene-understanding hints collaborator.
    pub fn with_hints(mut self, hints: Arc<dyn SceneHints>) -> Self {
        self.hints = Some(hints);
        self
    }

    /// Wire the marker event sink (rendering/audio collaborators).
    pub fn with_sink(mut self, sink: Arc<dyn MarkerSink>) -> Self {
        self.field = self.field.with_sink(Arc::clone(&sink));
        self.sink = sink;
        self
    }

    /// Use a deterministic sampler seed (tests and replays).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sampler = DirectionSampler::seeded(seed);
        self
    }

    // ── Mode control surface ─────────────────────────────────────────────

    /// Turn the system on. Runs one immediate synchronous scan cycle before
    /// handing control to the periodic trigger.
    pub async fn enable(&mut self, pose: HeadPose) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.last_pose = Some(pose);
        info!("obstacle scanning enabled");
        self.run_cycle_now(pose).await;
    }

    /// Turn the system off: cancel any in-flight cycle, clear every marker,
    /// and halt triggering.
    pub async fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.cancel_inflight().await;
        self.field.clear_all();
        self.state = ScanCycleState::Idle;
        info!("obstacle scanning disabled; markers cleared");
    }

    /// Toggle the proximity presentation style. While enabled this re-scans
    /// immediately so existing markers are re-announced in the new style.
    pub async fn set_proximity_style(&mut self, proximity: bool) {
        self.proximity_style = proximity;
        self.emit_style();
        if self.enabled
            && let Some(pose) = self.last_pose
        {
            self.run_cycle_now(pose).await;
        }
    }

    /// Toggle the spotlight presentation style. Markers are untouched; only
    /// the style event is emitted.
    pub fn set_spotlight_style(&mut self, spotlight: bool) {
        self.spotlight_style = spotlight;
        self.emit_style();
    }

    /// Probe a single ray straight along the gaze and place a marker if it
    /// hits. Returns whether a marker was created.
    pub async fn single_probe(&mut self, pose: HeadPose) -> bool {
        let request = ProbeRequest {
            origin: pose.position,
            direction: pose.forward.normalized(),
            max_distance: self.config.max_depth,
            mask: CategoryMask::ALL,
            priority: 1.0,
        };
        let outcome = self.executor.run_sequential(&[request], &CancelFlag::new());
        let Some(hits) = outcome.into_hits() else {
            return false;
        };
        let ctx = self.placement_context(pose);
        match hits.first() {
            Some(o) => self.field.place(&ctx, &o.hit, classify(&o.hit, ctx.observer)),
            None => false,
        }
    }

    // ── Frame update ─────────────────────────────────────────────────────

    /// Advance the scheduler by one frame.
    ///
    /// Feeds the path predictor, expires stale dynamic markers, collects a
    /// finished probe task if one has rejoined, evaluates the refresh
    /// trigger, and starts at most one new cycle.
    pub async fn update(&mut self, pose: HeadPose, dt: f32) {
        self.clock += dt as f64;
        let previous = self.last_pose.replace(pose);

        if !self.enabled {
            return;
        }

        self.predictor.observe(pose.position, self.clock);
        self.field.prune_expired(Utc::now());

        // A Done/Cancelled cycle from the previous frame returns to Idle.
        if matches!(self.state, ScanCycleState::Done | ScanCycleState::Cancelled) {
            self.state = ScanCycleState::Idle;
        }

        self.collect_finished_cycle().await;

        self.adaptive_interval = if self.head_active(previous, pose, dt) {
            (self.config.base_refresh_interval * 0.5).max(self.config.interval_floor)
        } else {
            self.config.base_refresh_interval
        };
        self.elapsed_since_cycle += dt;

        if self.trigger_met(pose) {
            self.start_cycle(pose).await;
        }
    }

    /// Start a scan cycle right now, regardless of the trigger condition.
    /// Any cycle still probing is cancelled first.
    pub async fn force_scan(&mut self, pose: HeadPose) {
        self.start_cycle(pose).await;
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// Current scan-cycle state.
    pub fn state(&self) -> ScanCycleState {
        self.state
    }

    /// True while the periodic trigger is live.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The live marker working set.
    pub fn markers(&self) -> &[Marker] {
        self.field.markers()
    }

    /// Number of live markers.
    pub fn marker_count(&self) -> usize {
        self.field.len()
    }

    /// Total scan cycles started since construction.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started
    }

    /// The current adaptive refresh interval in seconds (time trigger).
    pub fn adaptive_interval(&self) -> f32 {
        self.adaptive_interval
    }

    // ── Cycle internals ──────────────────────────────────────────────────

    fn trigger_met(&self, pose: HeadPose) -> bool {
        match self.config.trigger {
            TriggerMode::Distance => self
                .last_cycle_origin
                .is_none_or(|origin| pose.position.distance(origin) > self.config.refresh_distance),
            TriggerMode::Time => self.elapsed_since_cycle >= self.adaptive_interval,
        }
    }

    /// True when the head moved or turned faster than the configured
    /// thresholds over the last frame.
    fn head_active(&self, previous: Option<HeadPose>, pose: HeadPose, dt: f32) -> bool {
        let Some(prev) = previous else {
            return false;
        };
        if dt <= f32::EPSILON {
            return false;
        }
        let speed = prev.position.distance(pose.position) / dt;
        let rotation = prev.forward.angle_between(pose.forward).to_degrees() / dt;
        speed > self.config.movement_threshold || rotation > self.config.rotation_threshold_deg
    }

    /// Sample a batch and spawn its probe task.
    async fn start_cycle(&mut self, pose: HeadPose) {
        self.cancel_inflight().await;

        self.state = ScanCycleState::Sampling;
        self.cycles_started += 1;
        // Re-arm the trigger at cycle start so an in-flight cycle is not
        // re-triggered (and cancelled) every frame at the same spot.
        self.last_cycle_origin = Some(pose.position);
        self.elapsed_since_cycle = 0.0;
        let (requests, ctx) = self.sample_batch(pose);
        debug!(cycle = self.cycles_started, probes = requests.len(), "scan cycle sampled");

        let cancel = CancelFlag::new();
        let flag = cancel.clone();
        let executor = Arc::clone(&self.executor);
        let handle = tokio::spawn(async move { executor.execute(requests, &flag).await });
        self.inflight = Some(InflightCycle { cancel, handle, ctx });
        self.state = ScanCycleState::Probing;
    }

    /// Run one full cycle inline: sample, probe to completion, classify,
    /// place, evict. Used by `enable` and the proximity-style re-scan.
    async fn run_cycle_now(&mut self, pose: HeadPose) {
        self.cancel_inflight().await;

        self.state = ScanCycleState::Sampling;
        self.cycles_started += 1;
        self.last_cycle_origin = Some(pose.position);
        self.elapsed_since_cycle = 0.0;
        let (requests, ctx) = self.sample_batch(pose);

        self.state = ScanCycleState::Probing;
        let outcome = self.executor.execute(requests, &CancelFlag::new()).await;
        self.finish_cycle(ctx, outcome);
    }

    /// Build the probe batch and the placement context for one cycle.
    fn sample_batch(&mut self, pose: HeadPose) -> (Vec<ProbeRequest>, PlacementContext) {
        let hints: Vec<Vec3> = self
            .hints
            .as_ref()
            .filter(|h| h.analysis_complete())
            .map(|h| h.suggested_directions(pose.position, pose.forward))
            .unwrap_or_default();

        let params = SamplerParams {
            cone_half_angle: self.config.cone_half_angle(),
            max_distance: self.config.max_depth,
            mask: CategoryMask::ALL,
            batch_size: self.config.probe_batch,
            prediction_fraction: self.config.prediction_fraction,
            prediction_blend: self.config.prediction_blend,
        };
        let predicted = self.predictor.valid_prediction();
        let requests =
            self.sampler.generate(pose.position, pose.forward, predicted, &hints, &params);
        (requests, self.placement_context(pose))
    }

    fn placement_context(&self, pose: HeadPose) -> PlacementContext {
        PlacementContext {
            observer: pose.position,
            forward: pose.forward.normalized(),
            predicted: self.predictor.valid_prediction(),
            max_depth: self.config.max_depth,
        }
    }

    /// If the in-flight probe task has rejoined, classify and place its
    /// results on this (owning) context.
    async fn collect_finished_cycle(&mut self) {
        let finished = self.inflight.as_ref().is_some_and(|c| c.handle.is_finished());
        if !finished {
            return;
        }
        let cycle = self.inflight.take().expect("checked above");
        match cycle.handle.await {
            Ok(outcome) => self.finish_cycle(cycle.ctx, outcome),
            Err(e) => {
                debug!(error = %e, "probe task failed to rejoin; cycle dropped");
                self.state = ScanCycleState::Cancelled;
            }
        }
    }

    /// Classification and marker mutation; always on the owning context.
    fn finish_cycle(&mut self, ctx: PlacementContext, outcome: ExecOutcome) {
        match outcome {
            ExecOutcome::Complete(hits) => {
                self.state = ScanCycleState::Classifying;
                let mut placed = 0usize;
                for o in &hits {
                    let category = classify(&o.hit, ctx.observer);
                    if self.field.place(&ctx, &o.hit, category) {
                        placed += 1;
                    }
                }
                self.field.evict_overflow();
                debug!(hits = hits.len(), placed, live = self.field.len(), "scan cycle done");
                self.last_cycle_origin = Some(ctx.observer);
                self.elapsed_since_cycle = 0.0;
                self.state = ScanCycleState::Done;
            }
            ExecOutcome::Cancelled => {
                self.state = ScanCycleState::Cancelled;
            }
        }
    }

    /// Cancel the in-flight cycle, wait for the executor's acknowledgment,
    /// and discard its partial results.
    async fn cancel_inflight(&mut self) {
        let Some(cycle) = self.inflight.take() else {
            return;
        };
        cycle.cancel.cancel();
        // Task completion is the synchronization point: after this await the
        // executor has issued its last probe.
        let _ = cycle.handle.await;
        if !cycle.cancel.is_acknowledged() {
            // The task finished without observing the request mid-flight;
            // completion itself acknowledges it.
            cycle.cancel.acknowledge();
        }
        self.state = ScanCycleState::Cancelled;
    }

    fn emit_style(&self) {
        self.sink.emit(MarkerEvent::StyleChanged {
            proximity: self.proximity_style,
            spotlight: self.spotlight_style,
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
