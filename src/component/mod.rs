//! Components - declarations, contexts and live instances.
//!
//! ```text
//! Declaration ──register──▶ ComponentClass ──create──▶ Element
//!                                                        │
//!                                    Context ◀───────────┘
//!                         (state, props, injected)
//! ```

pub mod context;
pub mod declaration;
pub(crate) mod lifecycle;

pub use context::{Context, Injected, ROUTER_KEY};
pub(crate) use declaration::DeclarationKind;
pub use declaration::{
    CreatedFn, Declaration, DependencyFn, HandlerFn, StateFactory, StateSource, StyleFn,
    TemplateFn, Watcher,
};
pub use lifecycle::Element;
