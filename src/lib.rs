//! # oz-element
//!
//! Reactive custom-element runtime with nested router views.
//!
//! ## Architecture
//!
//! A component is declared once as a bundle of callbacks and registered under
//! a unique name. Each instance gets a [`Context`] (state, props, injected
//! collaborators) that every callback receives. State fields are
//! `spark-signals` signals, and watchers and render passes are evaluated inside
//! effects, so a write that changes a field re-runs exactly what read it.
//!
//! ```text
//! Declaration ─register─▶ ComponentClass ─create─▶ Element ─connect─▶ first render
//!                                                     │
//!        ReactiveState::set ─▶ watchers ─▶ template/style ─▶ same-shape patch
//! ```
//!
//! Re-renders patch values only. A render that would change the structure of
//! the output is rejected with [`Error::TemplateShape`] or
//! [`Error::StyleShape`] and the previous output stays in place.
//!
//! ## Modules
//!
//! - [`types`] - Core types (Value, Record, ShadowMode, InstanceFlags)
//! - [`reactive`] - Reactive state, dependency tracking, batched flushing
//! - [`template`] - Tagged template and stylesheet results
//! - [`engine`] - Document tree and element registry
//! - [`component`] - Declarations, contexts and the lifecycle controller
//! - [`router`] - Router collaborator and the router-view resolver
//! - [`config`] - Runtime knobs (flush mode, cascade bound)
//!
//! ## Example
//!
//! ```ignore
//! let class = register(
//!     Declaration::new("hello-name")
//!         .props(["name"])
//!         .template(|ctx| html(&["Hello ", "!"], [Part::from(ctx.props().get("name"))])),
//! )?;
//!
//! let document = Document::new();
//! let node = document.create_element("hello-name")?;
//! document.append_child(document.body(), node)?;
//! document.set_attribute(node, "name", "world")?;
//! assert_eq!(document.text_content(node), "Hello world!");
//! ```

pub mod component;
pub mod config;
pub mod engine;
pub mod error;
pub mod reactive;
pub mod router;
pub mod template;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Error, Result};

pub use config::{
    config, flush_mode, max_flush_iterations, reset_config, set_config, set_flush_mode,
    set_max_flush_iterations, FlushMode, RuntimeConfig, DEFAULT_MAX_FLUSH_ITERATIONS,
};

pub use reactive::{
    batch, flush, is_batching, is_flushing, is_tracking, pending_jobs, reset_runtime, untracked,
    ReactiveState,
};

pub use template::{css, html, Part, Shape, Stylesheet, Template};

pub use engine::{
    default_registry, register, reset_registry, validate_name, ComponentClass, Document, NodeId,
    NodeType, Registry, WeakDocument,
};

pub use component::{Context, Declaration, Element, Injected, StateSource, Watcher, ROUTER_KEY};

pub use router::view::{nested_view, nth_router_view, router_view, router_view_class, ROUTER_VIEW};
pub use router::{MatchedRoute, RouteRecord, Router};
