//! Dependency tracking on spark-signals effects.
//!
//! A [`Tracker`] runs one evaluation (a watcher dependency, or a template and
//! style pass) inside a fresh `effect_sync`. The effect's first run is the
//! evaluation itself, so every signal read becomes a dependency. The next
//! change to any of them re-runs the effect, which only calls the tracker's
//! invalidation callback; the owner re-evaluates later through
//! [`Tracker::track`], which disposes the old effect first.
//!
//! Evaluations happen in a [`detached`] context: a tracker created while
//! another effect is running neither becomes its child nor disturbs the
//! dependencies that effect is collecting.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::{effect_sync, with_context, AnyReaction, AnySource};

/// Run `f` without recording any reads.
///
/// Watcher handlers, `created` hooks and state factories run this way.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    spark_signals::untrack(f)
}

/// True while reads are being recorded.
pub fn is_tracking() -> bool {
    spark_signals::is_tracking()
}

/// True while a spark effect body is executing.
pub(crate) fn in_effect() -> bool {
    with_context(|ctx| ctx.get_active_effect().is_some())
}

// =============================================================================
// Detached Context
// =============================================================================

/// Saved reaction context, restored on drop (also when `f` panics).
struct Detached {
    reaction: Option<Weak<dyn AnyReaction>>,
    effect: Option<Weak<dyn AnyReaction>>,
    deps: Vec<Rc<dyn AnySource>>,
    skipped: usize,
    untracking: bool,
}

impl Drop for Detached {
    fn drop(&mut self) {
        let deps = std::mem::take(&mut self.deps);
        let (reaction, effect) = (self.reaction.take(), self.effect.take());
        let (skipped, untracking) = (self.skipped, self.untracking);
        with_context(|ctx| {
            ctx.set_active_reaction(reaction);
            ctx.set_active_effect(effect);
            ctx.swap_new_deps(deps);
            ctx.set_skipped_deps(skipped);
            ctx.set_untracking(untracking);
            // Sources read in between carry a newer read version; bump so the
            // restored reaction still records them.
            ctx.increment_read_version();
        });
    }
}

/// Run `f` as if no reaction were active.
pub(crate) fn detached<R>(f: impl FnOnce() -> R) -> R {
    let _saved = with_context(|ctx| Detached {
        reaction: ctx.set_active_reaction(None),
        effect: ctx.set_active_effect(None),
        deps: ctx.swap_new_deps(Vec::new()),
        skipped: ctx.set_skipped_deps(0),
        untracking: ctx.set_untracking(false),
    });
    f()
}

// =============================================================================
// Tracker
// =============================================================================

type Dispose = Box<dyn FnOnce()>;

/// Re-runnable tracked evaluation with a change callback.
pub(crate) struct Tracker {
    invalidate: Rc<dyn Fn()>,
    dispose: RefCell<Option<Dispose>>,
    runs: Cell<u64>,
}

impl Tracker {
    /// `invalidate` runs once when something read by the latest evaluation
    /// changes.
    pub(crate) fn new(invalidate: impl Fn() + 'static) -> Self {
        Self {
            invalidate: Rc::new(invalidate),
            dispose: RefCell::new(None),
            runs: Cell::new(0),
        }
    }

    /// Evaluate `f` tracked, replacing the dependencies of earlier runs.
    pub(crate) fn track<R: 'static>(&self, f: impl FnOnce() -> R + 'static) -> Option<R> {
        self.stop();
        self.runs.set(self.runs.get() + 1);

        let result: Rc<RefCell<Option<R>>> = Rc::new(RefCell::new(None));
        let out = Rc::clone(&result);
        let pending = Cell::new(Some(f));
        let invalidate = Rc::clone(&self.invalidate);

        let dispose = detached(|| {
            effect_sync(move || match pending.take() {
                Some(f) => *out.borrow_mut() = Some(f()),
                None => invalidate(),
            })
        });
        *self.dispose.borrow_mut() = Some(Box::new(dispose));
        result.take()
    }

    /// Drop the current dependencies. No further invalidation until the next
    /// [`track`](Self::track).
    pub(crate) fn stop(&self) {
        let dispose = self.dispose.borrow_mut().take();
        if let Some(dispose) = dispose {
            dispose();
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.dispose.borrow().is_some()
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("active", &self.is_active())
            .field("runs", &self.runs.get())
            .finish_non_exhaustive()
    }
}
