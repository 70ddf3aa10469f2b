//! Core types shared by every layer of the runtime.
//!
//! - [`Value`] - Dynamic field value stored in reactive records
//! - [`Record`] - Plain, ordered bag of named values
//! - [`ShadowMode`] - Shadow tree request of a declaration
//! - [`InstanceFlags`] / [`Lifecycle`] - Per-instance lifecycle bookkeeping

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// Record
// =============================================================================

/// Plain record of named fields.
///
/// Ordered so that snapshots and debug output are deterministic.
pub type Record = BTreeMap<String, Value>;

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed field value.
///
/// Equality is *strict*: scalars compare by value, strings by content, and
/// every reference-typed variant ([`Value::List`], [`Value::Record`],
/// [`Value::Shared`]) compares by identity of its allocation. Mutating the
/// interior of a list or record therefore never looks like a change to the
/// field holding it.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent / unset.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Shared, interior-mutable list (tracked by reference only).
    List(Rc<RefCell<Vec<Value>>>),
    /// Shared, interior-mutable record (tracked by reference only).
    Record(Rc<RefCell<Record>>),
    /// Opaque collaborator (e.g. a router), compared by identity.
    Shared(Rc<dyn Any>),
}

impl Value {
    /// Wrap a list in a fresh shared allocation.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Wrap a record in a fresh shared allocation.
    pub fn record(record: Record) -> Self {
        Value::Record(Rc::new(RefCell::new(record)))
    }

    /// Wrap an opaque shared object.
    pub fn shared<T: Any>(value: Rc<T>) -> Self {
        Value::Shared(value)
    }

    /// Downcast a [`Value::Shared`] back to its concrete type.
    pub fn downcast_shared<T: Any>(&self) -> Option<Rc<T>> {
        match self {
            Value::Shared(any) => Rc::clone(any).downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by templates for conditional output.
    ///
    /// `Null`, `false`, `0`, `0.0`, `NaN` and the empty string are falsy;
    /// everything else (including empty lists and records) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Record(_) | Value::Shared(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Shared(a), Value::Shared(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(list) => write!(f, "List({:p})", Rc::as_ptr(list)),
            Value::Record(record) => write!(f, "Record({:p})", Rc::as_ptr(record)),
            Value::Shared(any) => write!(f, "Shared({:p})", Rc::as_ptr(any)),
        }
    }
}

/// Text form used when a value is interpolated into a template or stylesheet.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Shared(_) => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(list) => {
                for (i, item) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Record(_) => f.write_str("[record]"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for Value {
    fn from(value: Rc<str>) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Shadow Mode
// =============================================================================

/// Requested shadow tree for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowMode {
    /// Shadow root reachable from outside via `Document::shadow_root`.
    Open,
    /// Shadow root hidden from outside callers.
    Closed,
}

// =============================================================================
// Instance Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Lifecycle bookkeeping for one component instance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InstanceFlags: u8 {
        const NONE = 0;
        /// Construction finished (state, props, created hook, watchers).
        const CONSTRUCTED = 1 << 0;
        /// First render done and attached to a connected tree.
        const ATTACHED = 1 << 1;
        /// A template/style pass is executing.
        const RENDERING = 1 << 2;
        /// Waiting in (or being processed by) the flush queue.
        const SCHEDULED = 1 << 3;
        /// Removed from the tree. Terminal.
        const DETACHED = 1 << 4;
    }
}

/// Externally visible lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Still inside construction.
    Constructing,
    /// Constructed but never connected to the document.
    Constructed,
    /// Attached, not rendering.
    Idle,
    /// Attached, inside a template/style pass.
    Rendering,
    /// Disconnected; no further renders happen.
    Detached,
}

impl From<InstanceFlags> for Lifecycle {
    fn from(flags: InstanceFlags) -> Self {
        if flags.contains(InstanceFlags::DETACHED) {
            Lifecycle::Detached
        } else if flags.contains(InstanceFlags::RENDERING) {
            Lifecycle::Rendering
        } else if flags.contains(InstanceFlags::ATTACHED) {
            Lifecycle::Idle
        } else if flags.contains(InstanceFlags::CONSTRUCTED) {
            Lifecycle::Constructed
        } else {
            Lifecycle::Constructing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_equality_is_by_value() {
        assert_eq!(Value::from(1), Value::Int(1));
        assert_eq!(Value::from("a"), Value::from(String::from("a")));
        assert_ne!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_reference_equality_is_by_identity() {
        let a = Value::list(vec![Value::from(1)]);
        let b = Value::list(vec![Value::from(1)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        let shared = Rc::new(5u8);
        assert_eq!(Value::shared(shared.clone()), Value::shared(shared));
    }

    #[test]
    fn test_interior_mutation_keeps_identity() {
        let list = Value::list(vec![]);
        let before = list.clone();
        if let Value::List(items) = &list {
            items.borrow_mut().push(Value::from(true));
        }
        assert_eq!(list, before);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::list(vec![]).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::list(vec![Value::from(1), Value::from("b")]).to_string(), "1,b");
    }

    #[test]
    fn test_downcast_shared() {
        let value = Value::shared(Rc::new(String::from("router")));
        assert_eq!(value.downcast_shared::<String>().as_deref().map(String::as_str), Some("router"));
        assert!(value.downcast_shared::<u32>().is_none());
    }

    #[test]
    fn test_lifecycle_from_flags() {
        assert_eq!(Lifecycle::from(InstanceFlags::NONE), Lifecycle::Constructing);
        assert_eq!(Lifecycle::from(InstanceFlags::CONSTRUCTED), Lifecycle::Constructed);
        assert_eq!(
            Lifecycle::from(InstanceFlags::CONSTRUCTED | InstanceFlags::ATTACHED),
            Lifecycle::Idle
        );
        assert_eq!(
            Lifecycle::from(InstanceFlags::ATTACHED | InstanceFlags::RENDERING),
            Lifecycle::Rendering
        );
        assert_eq!(
            Lifecycle::from(InstanceFlags::ATTACHED | InstanceFlags::DETACHED),
            Lifecycle::Detached
        );
    }
}
