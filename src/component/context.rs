//! Component Context - the object handed to every user callback.
//!
//! One context per instance, same identity for the instance's whole life:
//!
//! - `state`: the instance's reactive state
//! - `props`: reactive record fed by prop sync
//! - `injected`: reactive record of collaborators (e.g. the router)

use std::fmt;
use std::rc::{Rc, Weak};

use super::lifecycle::{Element, InstanceInner};
use crate::engine::Document;
use crate::reactive::ReactiveState;
use crate::router::Router;
use crate::types::{Record, Value};

/// Key under which a router is injected.
pub const ROUTER_KEY: &str = "router";

/// Collaborators handed to a new instance.
#[derive(Clone, Debug, Default)]
pub struct Injected(Record);

impl Injected {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router(self, router: Router) -> Self {
        self.with(ROUTER_KEY, router)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub(crate) fn into_record(self) -> Record {
        self.0
    }
}

struct ContextInner {
    state: ReactiveState,
    props: ReactiveState,
    injected: ReactiveState,
    host: Weak<InstanceInner>,
}

/// Per-instance bundle of state, props and injected collaborators.
///
/// Cloning yields another handle to the same context.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    pub(crate) fn new(host: Weak<InstanceInner>, injected: Injected) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                state: ReactiveState::new(),
                props: ReactiveState::new(),
                injected: ReactiveState::from_record(injected.into_record()),
                host,
            }),
        }
    }

    pub fn state(&self) -> &ReactiveState {
        &self.inner.state
    }

    pub fn props(&self) -> &ReactiveState {
        &self.inner.props
    }

    pub fn injected(&self) -> &ReactiveState {
        &self.inner.injected
    }

    /// Injected router (tracked read).
    pub fn router(&self) -> Option<Router> {
        Router::from_value(&self.inner.injected.get(ROUTER_KEY))
    }

    pub(crate) fn peek_router(&self) -> Option<Router> {
        Router::from_value(&self.inner.injected.peek(ROUTER_KEY))
    }

    /// The instance this context belongs to.
    pub fn host(&self) -> Option<Element> {
        self.inner.host.upgrade().map(Element::from_inner)
    }

    pub fn document(&self) -> Option<Document> {
        self.host().and_then(|host| host.document())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.inner.state)
            .field("props", &self.inner.props)
            .finish_non_exhaustive()
    }
}
