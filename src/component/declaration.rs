//! Component declarations.
//!
//! A [`Declaration`] is the user-authored bundle a class is registered from:
//!
//! ```ignore
//! let counter = Declaration::new("click-counter")
//!     .props(["label"])
//!     .state_literal(Record::from([("count".into(), Value::from(0))]))
//!     .watch(|ctx| ctx.props().get("label"))
//!     .template(|ctx| html(&["", ": ", ""], [
//!         Part::from(ctx.props().get("label")),
//!         Part::from(ctx.state().get("count")),
//!     ]));
//! ```
//!
//! Declarations are immutable once registered.

use std::fmt;
use std::rc::Rc;

use super::context::Context;
use crate::reactive::tracking::untracked;
use crate::template::{Stylesheet, Template};
use crate::types::{Record, ShadowMode, Value};

pub type StateFactory = Rc<dyn Fn(&Context) -> Record>;
pub type TemplateFn = Rc<dyn Fn(&Context) -> Template>;
pub type StyleFn = Rc<dyn Fn(&Context) -> Stylesheet>;
pub type CreatedFn = Rc<dyn Fn(&Context)>;
pub type DependencyFn = Rc<dyn Fn(&Context) -> Value>;
pub type HandlerFn = Rc<dyn Fn(&Context, Value)>;

/// Where an instance's initial state comes from.
#[derive(Clone)]
pub enum StateSource {
    /// Called once per instance with its context.
    Factory(StateFactory),
    /// Copied (shallowly) into every instance.
    Literal(Record),
}

impl StateSource {
    /// Resolve to the record for one instance.
    pub(crate) fn resolve(&self, context: &Context) -> Record {
        match self {
            StateSource::Factory(factory) => untracked(|| factory(context)),
            StateSource::Literal(record) => record.clone(),
        }
    }
}

/// A dependency function with an optional side-effect handler.
#[derive(Clone)]
pub struct Watcher {
    dependency: DependencyFn,
    handler: Option<HandlerFn>,
}

impl Watcher {
    /// Watcher whose evaluation is the side effect.
    pub fn new(dependency: impl Fn(&Context) -> Value + 'static) -> Self {
        Self {
            dependency: Rc::new(dependency),
            handler: None,
        }
    }

    /// Watcher whose handler receives each new dependency value.
    pub fn with_handler(
        dependency: impl Fn(&Context) -> Value + 'static,
        handler: impl Fn(&Context, Value) + 'static,
    ) -> Self {
        Self {
            dependency: Rc::new(dependency),
            handler: Some(Rc::new(handler)),
        }
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Run the dependency. The caller decides whether reads are tracked.
    pub(crate) fn evaluate(&self, context: &Context) -> Value {
        (self.dependency)(context)
    }

    /// Run the handler (if any) with tracking suspended.
    pub(crate) fn handle(&self, context: &Context, value: Value) {
        if let Some(handler) = &self.handler {
            untracked(|| handler(context, value));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclarationKind {
    Component,
    /// Route placeholder, recognised by the depth walk.
    RouterView,
}

/// User-authored component description.
#[derive(Clone)]
pub struct Declaration {
    name: String,
    kind: DeclarationKind,
    state: Option<StateSource>,
    props: Vec<String>,
    watchers: Vec<Watcher>,
    created: Option<CreatedFn>,
    template: Option<TemplateFn>,
    style: Option<StyleFn>,
    shadow_dom: Option<ShadowMode>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Component,
            state: None,
            props: Vec::new(),
            watchers: Vec::new(),
            created: None,
            template: None,
            style: None,
            shadow_dom: None,
        }
    }

    pub(crate) fn router_view(name: impl Into<String>) -> Self {
        Self {
            kind: DeclarationKind::RouterView,
            ..Self::new(name)
        }
    }

    // -------------------------------------------------------------------------
    // Builder
    // -------------------------------------------------------------------------

    pub fn state_fn(mut self, factory: impl Fn(&Context) -> Record + 'static) -> Self {
        self.state = Some(StateSource::Factory(Rc::new(factory)));
        self
    }

    pub fn state_literal(mut self, record: Record) -> Self {
        self.state = Some(StateSource::Literal(record));
        self
    }

    pub fn props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.props = props.into_iter().map(Into::into).collect();
        self
    }

    pub fn watch(mut self, dependency: impl Fn(&Context) -> Value + 'static) -> Self {
        self.watchers.push(Watcher::new(dependency));
        self
    }

    pub fn watch_with(
        mut self,
        dependency: impl Fn(&Context) -> Value + 'static,
        handler: impl Fn(&Context, Value) + 'static,
    ) -> Self {
        self.watchers.push(Watcher::with_handler(dependency, handler));
        self
    }

    pub fn watcher(mut self, watcher: Watcher) -> Self {
        self.watchers.push(watcher);
        self
    }

    /// Runs once per instance, untracked, inside the instance's effect scope.
    /// Effects and `on_scope_dispose` callbacks it registers end when the
    /// instance detaches.
    pub fn created(mut self, hook: impl Fn(&Context) + 'static) -> Self {
        self.created = Some(Rc::new(hook));
        self
    }

    pub fn template(mut self, template: impl Fn(&Context) -> Template + 'static) -> Self {
        self.template = Some(Rc::new(template));
        self
    }

    pub fn style(mut self, style: impl Fn(&Context) -> Stylesheet + 'static) -> Self {
        self.style = Some(Rc::new(style));
        self
    }

    pub fn shadow_dom(mut self, mode: ShadowMode) -> Self {
        self.shadow_dom = Some(mode);
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> DeclarationKind {
        self.kind
    }

    pub fn state_source(&self) -> Option<&StateSource> {
        self.state.as_ref()
    }

    pub fn prop_names(&self) -> &[String] {
        &self.props
    }

    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }

    pub(crate) fn created_hook(&self) -> Option<&CreatedFn> {
        self.created.as_ref()
    }

    pub(crate) fn template_fn(&self) -> Option<&TemplateFn> {
        self.template.as_ref()
    }

    pub(crate) fn style_fn(&self) -> Option<&StyleFn> {
        self.style.as_ref()
    }

    pub fn shadow_mode(&self) -> Option<ShadowMode> {
        self.shadow_dom
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("props", &self.props)
            .field("watchers", &self.watchers.len())
            .field("template", &self.template.is_some())
            .field("style", &self.style.is_some())
            .field("shadow_dom", &self.shadow_dom)
            .finish_non_exhaustive()
    }
}
