//! Probe execution strategies.
//!
//! [`ProbeExecutor`] runs one scan cycle's worth of [`ProbeRequest`]s against
//! the spatial query port and returns the subset that hit. Three strategies:
//!
//! - **Sequential** – in-order, fully synchronous; the default/fallback.
//! - **Sharded** – requests split into K contiguous shards, one tokio task
//!   each, results merged back in shard order.
//! - **Batched** – chunks of at most the configured cap handed to an
//!   accelerated [`BatchCaster`]; an erroring batch path falls back to the
//!   sharded CPU path for the rest of that cycle.
//!
//! All strategies honor a cooperative [`CancelFlag`], checked per request
//! (sequential) or per shard/chunk (concurrent). Once cancellation is
//! observed no further requests are issued and the cycle's partial results
//! are discarded by the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};
use wayfinder_spatial::{BatchCaster, SpatialQuery};
use wayfinder_types::{Hit, ProbeOutcome, ProbeRequest};

// ────────────────────────────────────────────────────────────────────────────
// Cancellation
// ────────────────────────────────────────────────────────────────────────────

/// Cooperative cancellation token shared between the scheduler and an
/// in-flight probe cycle.
///
/// The scheduler calls [`CancelFlag::cancel`]; the executor calls
/// [`CancelFlag::acknowledge`] when it observes the request and stops
/// issuing probes. The scheduler waits for the acknowledgment before
/// starting a new cycle, so two cycles never probe concurrently.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    requested: Arc<AtomicBool>,
    acknowledged: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the cycle holding this flag.
    pub fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Record that the executor has observed the cancellation and stopped
    /// issuing probes.
    pub fn acknowledge(&self) {
        self.acknowledged.store(true, Ordering::Release);
    }

    /// True once the executor has acknowledged the cancellation.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::Acquire)
    }
}

/// Result of one execution pass. Cancellation is control flow, not an error.
#[derive(Debug)]
pub enum ExecOutcome {
    /// Every request was serviced; hits are in submission order.
    Complete(Vec<ProbeOutcome>),
    /// Cancellation was observed; partial results were discarded.
    Cancelled,
}

impl ExecOutcome {
    /// The collected outcomes, or `None` when the cycle was cancelled.
    pub fn into_hits(self) -> Option<Vec<ProbeOutcome>> {
        match self {
            ExecOutcome::Complete(hits) => Some(hits),
            ExecOutcome::Cancelled => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Executor
// ────────────────────────────────────────────────────────────────────────────

/// Runs probe batches against the spatial query port.
pub struct ProbeExecutor {
    port: Arc<dyn SpatialQuery>,
    caster: Option<Arc<dyn BatchCaster>>,
    parallelism: usize,
    batch_cap: usize,
    /// Latch so repeated batch-path failures are reported once per process,
    /// not once per cycle.
    batch_warned: AtomicBool,
}

impl ProbeExecutor {
    /// Create an executor over the given port.
    ///
    /// `parallelism` is the shard count of the CPU path; `batch_cap` bounds
    /// a single accelerated dispatch. Both are validated upstream.
    pub fn new(port: Arc<dyn SpatialQuery>, parallelism: usize, batch_cap: usize) -> Self {
        Self {
            port,
            caster: None,
            parallelism: parallelism.max(1),
            batch_cap: batch_cap.max(1),
            batch_warned: AtomicBool::new(false),
        }
    }

    /// Attach an accelerated batch caster. When present it becomes the
    /// preferred strategy.
    pub fn with_batch_caster(mut self, caster: Arc<dyn BatchCaster>) -> Self {
        self.caster = Some(caster);
        self
    }

    /// Execute `requests` with the best available strategy.
    pub async fn execute(&self, requests: Vec<ProbeRequest>, cancel: &CancelFlag) -> ExecOutcome {
        if self.caster.is_some() {
            self.run_batched(requests, cancel).await
        } else if self.parallelism > 1 {
            self.run_sharded(requests, cancel).await
        } else {
            self.run_sequential(&requests, cancel)
        }
    }

    /// Sequential strategy: iterate in order, cancellation checked before
    /// every request.
    pub fn run_sequential(&self, requests: &[ProbeRequest], cancel: &CancelFlag) -> ExecOutcome {
        let mut outcomes = Vec::new();
        for request in requests {
            if cancel.is_cancelled() {
                cancel.acknowledge();
                return ExecOutcome::Cancelled;
            }
            if let Some(hit) = cast_contained(self.port.as_ref(), request) {
                outcomes.push(ProbeOutcome { request: *request, hit });
            }
        }
        ExecOutcome::Complete(outcomes)
    }

    /// Sharded strategy: K contiguous shards, one tokio task each,
    /// cancellation checked between requests inside every shard. Shard
    /// results are merged in shard order so downstream classification sees
    /// an order consistent with submission order.
    pub async fn run_sharded(
        &self,
        requests: Vec<ProbeRequest>,
        cancel: &CancelFlag,
    ) -> ExecOutcome {
        if requests.is_empty() {
            return ExecOutcome::Complete(Vec::new());
        }

        let shard_len = requests.len().div_ceil(self.parallelism);
        let mut handles = Vec::new();
        for shard in requests.chunks(shard_len) {
            let shard: Vec<ProbeRequest> = shard.to_vec();
            let port = Arc::clone(&self.port);
            let flag = cancel.clone();
            handles.push(tokio::spawn(async move {
                let mut outcomes = Vec::new();
                for request in &shard {
                    if flag.is_cancelled() {
                        flag.acknowledge();
                        return None;
                    }
                    if let Some(hit) = cast_contained(port.as_ref(), request) {
                        outcomes.push(ProbeOutcome { request: *request, hit });
                    }
                }
                Some(outcomes)
            }));
        }

        let mut merged = Vec::new();
        let mut cancelled = false;
        for handle in handles {
            match handle.await {
                Ok(Some(outcomes)) => merged.extend(outcomes),
                Ok(None) => cancelled = true,
                Err(e) => {
                    warn!(error = %e, "probe shard task failed; its requests count as misses");
                }
            }
        }

        if cancelled { ExecOutcome::Cancelled } else { ExecOutcome::Complete(merged) }
    }

    /// Batched strategy: chunks of at most `batch_cap` requests per
    /// dispatch, cancellation checked between chunks. The first dispatch
    /// error makes the rest of the cycle fall back to the sharded CPU path.
    pub async fn run_batched(
        &self,
        requests: Vec<ProbeRequest>,
        cancel: &CancelFlag,
    ) -> ExecOutcome {
        let Some(caster) = self.caster.as_ref() else {
            return self.run_sharded(requests, cancel).await;
        };

        let mut outcomes = Vec::new();
        let mut cursor = 0usize;
        while cursor < requests.len() {
            if cancel.is_cancelled() {
                cancel.acknowledge();
                return ExecOutcome::Cancelled;
            }
            let end = (cursor + self.batch_cap).min(requests.len());
            let chunk = &requests[cursor..end];
            match caster.cast_batch(chunk) {
                Ok(slots) => {
                    for (request, hit) in chunk.iter().zip(slots) {
                        if let Some(hit) = hit {
                            outcomes.push(ProbeOutcome { request: *request, hit });
                        }
                    }
                    cursor = end;
                }
                Err(e) => {
                    if !self.batch_warned.swap(true, Ordering::Relaxed) {
                        warn!(error = %e, "batch caster failed; falling back to CPU shards");
                    }
                    let rest = requests[cursor..].to_vec();
                    return match self.run_sharded(rest, cancel).await {
                        ExecOutcome::Complete(tail) => {
                            outcomes.extend(tail);
                            ExecOutcome::Complete(outcomes)
                        }
                        ExecOutcome::Cancelled => ExecOutcome::Cancelled,
                    };
                }
            }
        }
        ExecOutcome::Complete(outcomes)
    }
}

/// Cast one probe with local failure containment: an `Err` from the port is
/// logged at debug level and treated as "no hit".
fn cast_contained(port: &dyn SpatialQuery, request: &ProbeRequest) -> Option<Hit> {
    match port.cast(request.origin, request.direction, request.max_distance, request.mask) {
        Ok(hit) => hit,
        Err(e) => {
            debug!(error = %e, "probe query failed; treated as no hit");
            None
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
