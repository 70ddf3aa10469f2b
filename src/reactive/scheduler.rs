//! Batched re-render scheduling.
//!
//! Signal propagation belongs to spark-signals; this module only owns the
//! instance queue. Invalidated instances are queued as [`Job`]s. The queue drains in one
//! flush; anything invalidated while the flush runs (a watcher writing state,
//! say) joins the same flush instead of starting a new one.
//!
//! # Flush points
//!
//! - [`FlushMode::Sync`]: when the outermost write or [`batch`] returns,
//!   never from inside a running effect.
//! - [`FlushMode::Deferred`]: only when the host calls [`flush`].
//!
//! # Cascade bound
//!
//! One job may run at most `max_flush_iterations` times per flush. Past that
//! the job's pending work is dropped and the flush reports
//! [`Error::WatcherCascade`].

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use spark_signals::with_context;
use tracing::{error, trace};

use super::tracking::in_effect;
use crate::config::{flush_mode, max_flush_iterations, FlushMode};
use crate::error::{Error, Result};

// =============================================================================
// Job
// =============================================================================

/// A unit of deferred work (one component instance).
pub(crate) trait Job {
    /// Stable identity used for the per-flush run bound.
    fn job_id(&self) -> u64;

    /// Human-readable name for errors and logs.
    fn label(&self) -> String;

    fn run(self: Rc<Self>) -> Result<()>;

    /// Drop all pending work after a cascade abort.
    fn cancel_pending(&self);
}

// =============================================================================
// Scheduler State
// =============================================================================

thread_local! {
    static QUEUE: RefCell<VecDeque<Weak<dyn Job>>> = const { RefCell::new(VecDeque::new()) };
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        FLUSHING.with(|flushing| flushing.set(false));
    }
}

/// Queue a job. Callers deduplicate (see `InstanceFlags::SCHEDULED`).
pub(crate) fn enqueue(job: Weak<dyn Job>) {
    QUEUE.with(|queue| queue.borrow_mut().push_back(job));
}

fn pop_job() -> Option<Weak<dyn Job>> {
    QUEUE.with(|queue| queue.borrow_mut().pop_front())
}

pub fn is_batching() -> bool {
    spark_signals::is_batching()
}

pub fn is_flushing() -> bool {
    FLUSHING.with(Cell::get)
}

/// Number of queued jobs.
pub fn pending_jobs() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

// =============================================================================
// Batch / Flush
// =============================================================================

/// Run `f` with flushing suspended, then flush once.
///
/// Every invalidation of the same instance inside `f` collapses into one
/// re-render. The flush result (the first render error, if any) is returned.
pub fn batch<R>(f: impl FnOnce() -> R) -> Result<R> {
    let out = spark_signals::batch(f);
    maybe_flush()?;
    Ok(out)
}

/// Flush unless a batch, a flush or an effect run is open, or flushing is
/// deferred.
pub(crate) fn maybe_flush() -> Result<()> {
    if is_batching()
        || is_flushing()
        || in_effect()
        || with_context(|ctx| ctx.is_flushing_sync())
        || flush_mode() == FlushMode::Deferred
    {
        return Ok(());
    }
    flush()
}

/// Drain the queue.
///
/// A nested call (from inside a running job) returns immediately; the outer
/// flush picks up the work. Jobs keep running after one fails: the first error
/// is returned and later ones are logged.
pub fn flush() -> Result<()> {
    if is_flushing() {
        return Ok(());
    }
    FLUSHING.with(|flushing| flushing.set(true));
    let _guard = FlushGuard;

    let limit = max_flush_iterations();
    let mut runs: HashMap<u64, usize> = HashMap::new();
    let mut first_error: Option<Error> = None;

    while let Some(weak) = pop_job() {
        let Some(job) = weak.upgrade() else {
            trace!("skipping dropped job");
            continue;
        };

        let count = runs.entry(job.job_id()).or_insert(0);
        *count += 1;
        let result = if *count > limit {
            job.cancel_pending();
            Err(Error::WatcherCascade {
                element: job.label(),
                limit,
            })
        } else {
            job.run()
        };

        if let Err(err) = result {
            if first_error.is_some() {
                error!(%err, "additional error during flush");
            } else {
                first_error = Some(err);
            }
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Clear all scheduler state (for testing).
pub fn reset_runtime() {
    QUEUE.with(|queue| queue.borrow_mut().clear());
    FLUSHING.with(|flushing| flushing.set(false));
}
