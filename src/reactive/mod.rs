//! Reactivity - state containers, dependency tracking and batched flushing.
//!
//! Built on `spark-signals`: every field is a signal and every tracked
//! evaluation is an effect. On top of that this module keeps the per-instance
//! job queue.
//!
//! ```text
//! ReactiveState::get ──reads────▶ Signal ◀──depends── Tracker (watcher / render)
//! ReactiveState::set ──writes───▶ Signal ──re-runs──▶ Tracker ──enqueues──▶ Job
//!                                                           flush ──▶ Job::run
//! ```
//!
//! All of it is single-threaded: signals, effects and the queue live in
//! thread-locals and `Rc`s.

pub mod scheduler;
pub mod state;
pub mod tracking;

pub use scheduler::{batch, flush, is_batching, is_flushing, pending_jobs, reset_runtime};
pub use state::ReactiveState;
pub use tracking::{is_tracking, untracked};
