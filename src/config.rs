//! Runtime configuration.
//!
//! Settings live in a thread-local, like every other piece of runtime state:
//! rendering is single-threaded, so each thread owns its own runtime.
//!
//! ```ignore
//! use oz_element::config::{set_flush_mode, FlushMode};
//!
//! // Collect writes and flush them from the host loop.
//! set_flush_mode(FlushMode::Deferred);
//! state.set("count", 1)?;
//! oz_element::reactive::flush()?;
//! ```

use std::cell::Cell;

/// When queued re-renders execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// A write outside a batch flushes before returning, so render errors
    /// surface to the writer.
    #[default]
    Sync,
    /// Writes only enqueue; the host calls [`crate::reactive::flush`] at its
    /// tick boundary.
    Deferred,
}

/// Default bound on re-runs of one instance within one flush.
pub const DEFAULT_MAX_FLUSH_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub flush_mode: FlushMode,
    /// How often one instance may be re-run inside a single flush (and how
    /// many watcher/render rounds one run may take) before the flush fails
    /// with [`crate::Error::WatcherCascade`].
    pub max_flush_iterations: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush_mode: FlushMode::Sync,
            max_flush_iterations: DEFAULT_MAX_FLUSH_ITERATIONS,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_max_flush_iterations(mut self, limit: usize) -> Self {
        self.max_flush_iterations = limit.max(1);
        self
    }
}

thread_local! {
    static CONFIG: Cell<RuntimeConfig> = Cell::new(RuntimeConfig::default());
}

/// Current configuration.
pub fn config() -> RuntimeConfig {
    CONFIG.with(Cell::get)
}

pub fn set_config(config: RuntimeConfig) {
    CONFIG.with(|c| c.set(config));
}

pub fn flush_mode() -> FlushMode {
    config().flush_mode
}

pub fn set_flush_mode(flush_mode: FlushMode) {
    set_config(config().with_flush_mode(flush_mode));
}

pub fn max_flush_iterations() -> usize {
    config().max_flush_iterations
}

pub fn set_max_flush_iterations(limit: usize) {
    set_config(config().with_max_flush_iterations(limit));
}

/// Restore defaults (for testing).
pub fn reset_config() {
    set_config(RuntimeConfig::default());
}
