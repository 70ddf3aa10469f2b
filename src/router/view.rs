//! Router View - placeholder that renders the components of one matched depth.
//!
//! # Algorithm
//!
//! 1. `nth`: count the placeholder's ancestors (across shadow boundaries)
//!    that are router views bound to the same router instance.
//! 2. Select `matched.chain[nth]`: the route record for that depth.
//! 3. Construct every component class of that record, injecting the router so
//!    a view nested under them repeats the walk one level deeper.
//! 4. No router, no match, no record at that depth: render nothing.
//!
//! ```text
//! <router-view router=A>        nth=0 ─▶ chain[0] = [P]
//!   <p-page>
//!     <div>                     (skipped: not a view)
//!       <router-view router=B>  other router, not counted
//!       <router-view router=A>  nth=1 ─▶ chain[1] = [Q]
//! ```
//!
//! Every branch renders the same single-slot template, so switching between
//! "nothing" and "components" never changes shape.

use tracing::{error, trace};

use super::{MatchedRoute, RouteRecord, Router};
use crate::component::{Context, Declaration, Element, Injected};
use crate::engine::{ComponentClass, Document, NodeId, Registry};
use crate::error::Result;
use crate::template::{Part, Template};

/// Tag the placeholder is registered under.
pub const ROUTER_VIEW: &str = "router-view";

/// Declaration of the placeholder component.
pub fn declaration() -> Declaration {
    Declaration::router_view(ROUTER_VIEW).template(render)
}

/// The placeholder class of `registry`, registering it on first use.
pub fn router_view_class(registry: &Registry) -> Result<ComponentClass> {
    match registry.get(ROUTER_VIEW) {
        Some(class) if class.is_router_view() => Ok(class),
        _ => registry.register(declaration()),
    }
}

/// New, unconnected placeholder bound to `router`.
pub fn router_view(document: &Document, router: &Router) -> Result<Element> {
    router_view_class(document.registry())?
        .create_with(document, Injected::new().router(router.clone()))
}

/// A placeholder bound to the router of `context`, for use inside a
/// component template. Renders nothing when no router is injected.
pub fn nested_view(context: &Context) -> Part {
    let (Some(router), Some(document)) = (context.router(), context.document()) else {
        return Part::empty();
    };
    match router_view(&document, &router) {
        Ok(view) => Part::from(view),
        Err(err) => {
            error!(%err, "nested router view failed to construct");
            Part::empty()
        }
    }
}

/// Nesting depth of the placeholder on `node` among views of `router`.
///
/// Ancestor routers are read untracked: a view only re-renders when its own
/// router or the current route changes.
pub fn nth_router_view(document: &Document, node: NodeId, router: &Router) -> usize {
    document
        .ancestors(node)
        .into_iter()
        .filter_map(|ancestor| document.component(ancestor))
        .filter(|element| element.is_router_view())
        .filter(|element| element.router().is_some_and(|r| r.ptr_eq(router)))
        .count()
}

/// Record whose components belong to views at depth `nth`.
pub fn select_route(matched: &MatchedRoute, nth: usize) -> Option<RouteRecord> {
    matched.at_depth(nth).cloned()
}

/// Record the view owning `context` should render, if any.
pub fn matched_record(context: &Context) -> Option<(Router, RouteRecord)> {
    let router = context.router()?;
    let matched = router.current_route()?;
    let host = context.host()?;
    let document = host.document()?;

    let nth = nth_router_view(&document, host.node(), &router);
    let record = select_route(&matched, nth);
    trace!(nth, depth = matched.len(), found = record.is_some(), "router view resolved");
    record.map(|record| (router, record))
}

fn render(context: &Context) -> Template {
    let Some((router, record)) = matched_record(context) else {
        return Template::slot(Part::empty());
    };
    let Some(document) = context.document() else {
        return Template::slot(Part::empty());
    };

    let elements: Vec<Element> = record
        .components()
        .iter()
        .filter_map(|class| {
            match class.create_with(&document, Injected::new().router(router.clone())) {
                Ok(element) => Some(element),
                Err(err) => {
                    error!(%err, component = class.name(), "router view child failed to construct");
                    None
                }
            }
        })
        .collect();

    if elements.is_empty() {
        Template::slot(Part::empty())
    } else {
        Template::slot(elements)
    }
}
