//! Router - the collaborator router views consume.
//!
//! URL parsing and matching are out of scope. A router here only holds the
//! currently matched chain of route records:
//!
//! ```text
//! RouteRecord(root)  components=[P]          depth 0
//!   └─ RouteRecord   components=[Q]          depth 1   parent=root
//!        └─ RouteRecord components=[S]       depth 2   parent=..
//!
//! MatchedRoute::from_leaf(depth 2) == [root, depth 1, depth 2]
//! ```
//!
//! The match lives in reactive state, so templates that read
//! [`Router::current_route`] re-render on navigation.

pub mod view;

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::engine::ComponentClass;
use crate::error::Result;
use crate::reactive::ReactiveState;
use crate::types::Value;

const CURRENT_ROUTE: &str = "current";

// =============================================================================
// Route Records
// =============================================================================

struct RouteRecordInner {
    components: Vec<ComponentClass>,
    parent: Option<RouteRecord>,
}

/// One matched route config. Immutable once built.
#[derive(Clone)]
pub struct RouteRecord {
    inner: Rc<RouteRecordInner>,
}

impl RouteRecord {
    pub fn root(components: Vec<ComponentClass>) -> Self {
        Self {
            inner: Rc::new(RouteRecordInner {
                components,
                parent: None,
            }),
        }
    }

    pub fn child(parent: &RouteRecord, components: Vec<ComponentClass>) -> Self {
        Self {
            inner: Rc::new(RouteRecordInner {
                components,
                parent: Some(parent.clone()),
            }),
        }
    }

    pub fn components(&self) -> &[ComponentClass] {
        &self.inner.components
    }

    pub fn parent(&self) -> Option<&RouteRecord> {
        self.inner.parent.as_ref()
    }

    /// Number of parent links up to the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(record) = current {
            depth += 1;
            current = record.parent();
        }
        depth
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRecord")
            .field(
                "components",
                &self.components().iter().map(ComponentClass::name).collect::<Vec<_>>(),
            )
            .field("depth", &self.depth())
            .finish()
    }
}

// =============================================================================
// Matched Route
// =============================================================================

/// Root-first chain of matched records.
#[derive(Clone)]
pub struct MatchedRoute {
    chain: Rc<Vec<RouteRecord>>,
}

impl MatchedRoute {
    /// Follow parent links from `leaf` up to the root.
    pub fn from_leaf(leaf: &RouteRecord) -> Self {
        let mut chain = vec![leaf.clone()];
        let mut current = leaf.parent();
        while let Some(record) = current {
            chain.push(record.clone());
            current = record.parent();
        }
        chain.reverse();
        Self {
            chain: Rc::new(chain),
        }
    }

    /// Chain given root first.
    pub fn from_chain(chain: Vec<RouteRecord>) -> Self {
        Self {
            chain: Rc::new(chain),
        }
    }

    pub fn chain(&self) -> &[RouteRecord] {
        &self.chain
    }

    pub fn leaf(&self) -> Option<&RouteRecord> {
        self.chain.last()
    }

    /// Record for views at nesting depth `depth`.
    pub fn at_depth(&self, depth: usize) -> Option<&RouteRecord> {
        self.chain.get(depth)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.chain, &other.chain)
    }

    fn to_value(&self) -> Value {
        Value::shared(Rc::clone(&self.chain))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value
            .downcast_shared::<Vec<RouteRecord>>()
            .map(|chain| Self { chain })
    }
}

impl fmt::Debug for MatchedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.chain.iter()).finish()
    }
}

// =============================================================================
// Router
// =============================================================================

struct RouterInner {
    state: ReactiveState,
}

/// Identity-compared router handle.
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RouterInner {
                state: ReactiveState::new(),
            }),
        }
    }

    /// Replace the current match. Views depending on it re-render.
    pub fn navigate(&self, matched: Option<MatchedRoute>) -> Result<()> {
        debug!(depth = ?matched.as_ref().map(MatchedRoute::len), "navigate");
        let value = matched.as_ref().map_or(Value::Null, MatchedRoute::to_value);
        self.inner.state.set(CURRENT_ROUTE, value)
    }

    /// Navigate to the chain ending at `leaf`.
    pub fn navigate_to(&self, leaf: &RouteRecord) -> Result<()> {
        self.navigate(Some(MatchedRoute::from_leaf(leaf)))
    }

    /// Current match (tracked read).
    pub fn current_route(&self) -> Option<MatchedRoute> {
        MatchedRoute::from_value(&self.inner.state.get(CURRENT_ROUTE))
    }

    /// Current match, untracked.
    pub fn peek_route(&self) -> Option<MatchedRoute> {
        MatchedRoute::from_value(&self.inner.state.peek(CURRENT_ROUTE))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Recover a router stored in a context record.
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .downcast_shared::<RouterInner>()
            .map(|inner| Self { inner })
    }
}

impl From<Router> for Value {
    fn from(router: Router) -> Self {
        Value::shared(router.inner)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("id", &Rc::as_ptr(&self.inner))
            .field("current", &self.peek_route())
            .finish()
    }
}
