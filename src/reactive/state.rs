//! Reactive State Container.
//!
//! A [`ReactiveState`] wraps an open record of named fields:
//!
//! - [`get`](ReactiveState::get) reads the field's signal, so the running
//!   effect (if any) depends on it
//! - [`set`](ReactiveState::set) writes the signal and, if the value
//!   differs from the previous one, notifies its readers and flushes (see
//!   [`scheduler`](super::scheduler))
//!
//! Each field is its own `spark_signals::Signal<Value>`. Fields need not be
//! declared: a tracked read of a missing field creates a `Null` placeholder
//! signal for it, which becomes the field on first assignment.
//!
//! # Reference fields
//!
//! Lists and records are tracked by identity. Mutating the inside of a
//! referenced list does not invalidate anything; assign a new list instead.
//!
//! ```ignore
//! let state = ReactiveState::new();
//! state.set("items", Value::list(vec![]))?;
//!
//! // Not observed: same allocation.
//! if let Value::List(items) = state.peek("items") {
//!     items.borrow_mut().push(Value::from(1));
//! }
//!
//! // Observed: new allocation.
//! state.set("items", Value::list(vec![Value::from(1)]))?;
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use spark_signals::{signal, untrack, AnySource, Signal};
use tracing::trace;

use super::scheduler;
use super::tracking::is_tracking;
use crate::error::Result;
use crate::types::{Record, Value};

struct StateInner {
    fields: RefCell<BTreeMap<String, Signal<Value>>>,
    /// Signals of fields read before they were assigned.
    absent: RefCell<BTreeMap<String, Signal<Value>>>,
    /// Bumped whenever a field is added.
    keys: Signal<u64>,
}

impl Default for StateInner {
    fn default() -> Self {
        Self {
            fields: RefCell::new(BTreeMap::new()),
            absent: RefCell::new(BTreeMap::new()),
            keys: signal(0),
        }
    }
}

/// Observable, open record of named fields.
///
/// Cloning yields another handle to the same state.
#[derive(Clone, Default)]
pub struct ReactiveState {
    inner: Rc<StateInner>,
}

impl ReactiveState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing record. Nothing is tracked until it is read.
    pub fn from_record(record: Record) -> Self {
        let state = Self::new();
        state
            .inner
            .fields
            .borrow_mut()
            .extend(record.into_iter().map(|(key, value)| (key, signal(value))));
        state
    }

    /// Signal of `key`, cloned out so no borrow is held while it notifies.
    fn field(&self, key: &str) -> Option<Signal<Value>> {
        self.inner.fields.borrow().get(key).cloned()
    }

    /// Read a field, making the running effect depend on it.
    ///
    /// Missing fields read as [`Value::Null`] and are still tracked, so a
    /// later assignment invalidates the reader.
    pub fn get(&self, key: &str) -> Value {
        if let Some(field) = self.field(key) {
            return field.get();
        }
        if !is_tracking() {
            return Value::Null;
        }
        let placeholder = self
            .inner
            .absent
            .borrow_mut()
            .entry(key.to_owned())
            .or_insert_with(|| signal(Value::Null))
            .clone();
        placeholder.get()
    }

    /// Read a field without tracking.
    pub fn peek(&self, key: &str) -> Value {
        untrack(|| self.get(key))
    }

    /// Tracked presence check.
    ///
    /// Depends on the key set, not on any value.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.keys.get();
        self.inner.fields.borrow().contains_key(key)
    }

    /// Move `key` into the record, reusing its placeholder if a reader made one.
    fn add_field(&self, key: &str) -> Signal<Value> {
        let field = self
            .inner
            .absent
            .borrow_mut()
            .remove(key)
            .unwrap_or_else(|| signal(Value::Null));
        self.inner
            .fields
            .borrow_mut()
            .insert(key.to_owned(), field.clone());
        field
    }

    /// Write a field.
    ///
    /// Writing a value equal (strictly) to the current one is a no-op.
    /// Otherwise dependents are invalidated and, outside a batch in
    /// [`FlushMode::Sync`](crate::config::FlushMode::Sync), re-rendered
    /// before this returns; their errors are returned here.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();

        let changed = match self.field(&key) {
            Some(field) => field.set(value),
            None => {
                self.add_field(&key).set(value);
                self.inner.keys.update(|count| *count += 1);
                true
            }
        };
        if !changed {
            trace!(field = %key, "unchanged write ignored");
            return Ok(());
        }
        trace!(field = %key, "field changed");

        scheduler::maybe_flush()
    }

    /// Compute a new value from the current one (read untracked).
    pub fn update(&self, key: &str, f: impl FnOnce(&Value) -> Value) -> Result<()> {
        let next = f(&self.peek(key));
        self.set(key, next)
    }

    /// Store a field without notifying anyone. Used while constructing.
    pub(crate) fn insert_silent(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let field = self.field(&key).unwrap_or_else(|| self.add_field(&key));
        field.inner().set(value);
    }

    /// Field names, untracked.
    pub fn keys(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Copy of the current record, untracked.
    pub fn snapshot(&self) -> Record {
        let fields: Vec<(String, Signal<Value>)> = self
            .inner
            .fields
            .borrow()
            .iter()
            .map(|(key, field)| (key.clone(), field.clone()))
            .collect();
        untrack(|| {
            fields
                .into_iter()
                .map(|(key, field)| (key, field.get()))
                .collect()
        })
    }

    /// Number of live effects that read `key` in their latest run.
    pub fn subscriber_count(&self, key: &str) -> usize {
        let field = self
            .field(key)
            .or_else(|| self.inner.absent.borrow().get(key).cloned());
        field.map_or(0, |field| {
            let source = field.inner();
            source.cleanup_dead_reactions();
            source.reaction_count()
        })
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ReactiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveState")
            .field("fields", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::reset_config;
    use crate::reactive::scheduler::reset_runtime;
    use crate::reactive::tracking::{untracked, Tracker};
    use std::cell::Cell;

    fn counting_tracker() -> (Tracker, Rc<Cell<usize>>) {
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let tracker = Tracker::new(move || hits_clone.set(hits_clone.get() + 1));
        (tracker, hits)
    }

    fn read(tracker: &Tracker, state: &ReactiveState, key: &'static str) -> Option<Value> {
        let state = state.clone();
        tracker.track(move || state.get(key))
    }

    #[test]
    fn test_get_tracks_and_set_notifies() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::new();
        let (tracker, hits) = counting_tracker();

        read(&tracker, &state, "foo");
        assert_eq!(state.subscriber_count("foo"), 1);

        state.set("foo", "bar").unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(state.peek("foo"), Value::from("bar"));
    }

    #[test]
    fn test_same_value_is_noop() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::from_record(Record::from([("n".to_string(), Value::from(1))]));
        let (tracker, hits) = counting_tracker();
        read(&tracker, &state, "n");

        state.set("n", 1).unwrap();
        assert_eq!(hits.get(), 0);
        assert_eq!(state.subscriber_count("n"), 1);
    }

    #[test]
    fn test_unrelated_field_does_not_notify() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::from_record(Record::from([
            ("a".to_string(), Value::from(0)),
            ("b".to_string(), Value::from(false)),
        ]));
        let (tracker, hits) = counting_tracker();
        read(&tracker, &state, "a");

        state.set("b", true).unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_untracked_reads_do_not_subscribe() {
        let state = ReactiveState::from_record(Record::from([("a".to_string(), Value::from(0))]));
        let tracker = Tracker::new(|| {});
        let reader = state.clone();

        tracker.track(move || untracked(|| reader.get("a")));
        assert_eq!(state.subscriber_count("a"), 0);
    }

    #[test]
    fn test_deep_mutation_is_not_observed() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::new();
        state.set("items", Value::list(vec![])).unwrap();

        let (tracker, hits) = counting_tracker();
        read(&tracker, &state, "items");

        if let Value::List(items) = state.peek("items") {
            items.borrow_mut().push(Value::from(1));
        }
        let same = state.peek("items");
        state.set("items", same).unwrap();
        assert_eq!(hits.get(), 0);

        state.set("items", Value::list(vec![Value::from(1)])).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_update_and_snapshot() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::new();
        state.set("count", 1).unwrap();
        state
            .update("count", |v| Value::from(v.as_int().unwrap_or(0) + 1))
            .unwrap();

        assert_eq!(state.peek("count"), Value::from(2));
        assert_eq!(state.keys(), vec!["count".to_string()]);
        assert_eq!(state.snapshot().get("count"), Some(&Value::from(2)));
    }

    #[test]
    fn test_missing_field_read_is_tracked() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::new();
        let (tracker, hits) = counting_tracker();
        let reader = state.clone();
        tracker.track(move || assert!(!reader.contains("later")));

        state.set("later", "now").unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_missing_field_reader_ignores_other_new_fields() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::new();
        let (tracker, hits) = counting_tracker();
        assert_eq!(read(&tracker, &state, "later"), Some(Value::Null));
        assert_eq!(state.subscriber_count("later"), 1);

        state.set("unrelated", 1).unwrap();
        assert_eq!(hits.get(), 0);

        state.set("later", "now").unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(state.keys(), vec!["later".to_string(), "unrelated".to_string()]);
    }

    #[test]
    fn test_disposed_readers_leave_no_subscribers() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::from_record(Record::from([("rare".to_string(), Value::from(0))]));
        for _ in 0..50 {
            let (tracker, _hits) = counting_tracker();
            read(&tracker, &state, "rare");
            assert_eq!(state.subscriber_count("rare"), 1);
        }
        assert_eq!(state.subscriber_count("rare"), 0);
    }

    #[test]
    fn test_rereading_rarely_written_field_does_not_accumulate() {
        reset_runtime();
        reset_config();

        let state = ReactiveState::from_record(Record::from([
            ("hot".to_string(), Value::from(0)),
            ("rare".to_string(), Value::from(0)),
        ]));
        let tracker = Tracker::new(|| {});
        for n in 1..=100 {
            state.set("hot", n).unwrap();
            let reader = state.clone();
            tracker.track(move || (reader.get("hot"), reader.get("rare")));
        }
        assert_eq!(state.subscriber_count("rare"), 1);
        assert_eq!(state.subscriber_count("hot"), 1);

        tracker.stop();
        assert_eq!(state.subscriber_count("rare"), 0);
    }
}
