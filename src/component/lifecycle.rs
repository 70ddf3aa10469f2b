//! Lifecycle Controller - one component instance from construction to
//! detachment.
//!
//! ```text
//! construct ──▶ Constructed ──connect──▶ Idle ◀──▶ Rendering
//!                    │                     │
//!                    └──────remove─────────┴──▶ Detached (terminal)
//! ```
//!
//! # Construction
//!
//! Inside one batch, outside any running effect: props are initialised, the state source is
//! resolved into the context's state, `created` runs inside the instance's
//! effect scope, and every watcher's dependency is evaluated once (tracked,
//! handler not called).
//!
//! # Re-runs
//!
//! Each watcher and the render pass own a [`Tracker`]. When one of them is
//! invalidated the instance is queued once (`SCHEDULED`); when the queue runs
//! the instance:
//!
//! 1. re-evaluates dirty watchers in declaration order, calling handlers
//!    untracked, until no watcher is dirty
//! 2. re-runs `template` and `style` if the render pass is dirty
//!
//! Writes made by handlers fold into the same run. Both loops are bounded by
//! `max_flush_iterations`.
//!
//! Detaching stops the effect scope, which disposes every tracker and any
//! effect `created` registered.
//!
//! # Shape
//!
//! The first render records the shape of the template and of the stylesheet.
//! A later render with a different shape is rejected before anything is
//! patched, so the last good output stays attached.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::{effect_scope, on_scope_dispose, EffectScope};
use tracing::{debug, debug_span, error, trace, warn};

use super::context::{Context, Injected, ROUTER_KEY};
use crate::config::max_flush_iterations;
use crate::engine::{ComponentClass, Document, NodeId, WeakDocument};
use crate::error::{Error, Result};
use crate::reactive::scheduler::{self, batch, Job};
use crate::reactive::tracking::{detached, untracked, Tracker};
use crate::router::Router;
use crate::template::mount::Mounted;
use crate::template::{Part, Shape, Stylesheet, Template};
use crate::types::{InstanceFlags, Lifecycle, Value};

thread_local! {
    static NEXT_INSTANCE_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_instance_id() -> u64 {
    NEXT_INSTANCE_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

// =============================================================================
// Instance State
// =============================================================================

struct WatcherSlot {
    tracker: Tracker,
    dirty: Cell<bool>,
}

struct StyleOutput {
    shape: Shape,
    text: String,
    node: NodeId,
}

#[derive(Default)]
struct Output {
    template: Option<Mounted>,
    style: Option<StyleOutput>,
}

pub(crate) struct InstanceInner {
    id: u64,
    this: Weak<InstanceInner>,
    class: ComponentClass,
    document: WeakDocument,
    node: NodeId,
    shadow: Option<NodeId>,
    context: Context,
    flags: Cell<InstanceFlags>,
    scope: EffectScope,
    watchers: Vec<WatcherSlot>,
    render_tracker: Tracker,
    render_dirty: Cell<bool>,
    output: RefCell<Option<Output>>,
}

fn watcher_tracker(this: Weak<InstanceInner>, index: usize) -> Tracker {
    Tracker::new(move || {
        if let Some(inner) = this.upgrade() {
            if let Some(slot) = inner.watchers.get(index) {
                slot.dirty.set(true);
            }
            inner.schedule();
        }
    })
}

fn render_tracker(this: Weak<InstanceInner>) -> Tracker {
    Tracker::new(move || {
        if let Some(inner) = this.upgrade() {
            inner.render_dirty.set(true);
            inner.schedule();
        }
    })
}

/// Build and initialise an instance of `class`.
pub(crate) fn construct(
    class: &ComponentClass,
    document: &Document,
    injected: Injected,
) -> Result<Element> {
    let declaration = class.declaration();
    let node = document.create_plain_element(class.name());
    let shadow = declaration
        .shadow_mode()
        .map(|mode| document.attach_shadow(node, mode))
        .transpose()?;

    let watcher_count = declaration.watchers().len();
    let inner = Rc::new_cyclic(|this: &Weak<InstanceInner>| InstanceInner {
        id: next_instance_id(),
        this: this.clone(),
        class: class.clone(),
        document: document.downgrade(),
        node,
        shadow,
        context: Context::new(this.clone(), injected),
        flags: Cell::new(InstanceFlags::NONE),
        scope: effect_scope(true),
        watchers: (0..watcher_count)
            .map(|index| WatcherSlot {
                tracker: watcher_tracker(this.clone(), index),
                dirty: Cell::new(false),
            })
            .collect(),
        render_tracker: render_tracker(this.clone()),
        render_dirty: Cell::new(false),
        output: RefCell::new(None),
    });
    let element = Element { inner };
    document.set_component(node, element.clone())?;

    // No reaction is active in here, so reads made while initialising are
    // not recorded by anyone, and effects flushed when the batch closes do
    // not disturb an enclosing evaluation.
    detached(|| batch(|| element.inner.initialize()))?;
    Ok(element)
}

impl InstanceInner {
    fn name(&self) -> &str {
        self.class.name()
    }

    fn has(&self, flag: InstanceFlags) -> bool {
        self.flags.get().contains(flag)
    }

    fn set_flag(&self, flag: InstanceFlags, on: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, on);
        self.flags.set(flags);
    }

    fn initialize(&self) {
        let declaration = self.class.declaration();
        let context = &self.context;

        for prop in declaration.prop_names() {
            context.props().insert_silent(prop.clone(), Value::Null);
        }
        if let Some(source) = declaration.state_source() {
            for (key, value) in source.resolve(context) {
                context.state().insert_silent(key, value);
            }
        }
        let this = self.this.clone();
        self.scope.run(|| {
            on_scope_dispose(move || {
                if let Some(inner) = this.upgrade() {
                    inner.teardown();
                }
            });
            if let Some(created) = declaration.created_hook() {
                created(context);
            }
        });
        for index in 0..self.watchers.len() {
            self.evaluate_watcher(index, false);
        }

        self.set_flag(InstanceFlags::CONSTRUCTED, true);
        debug!(element = self.name(), id = self.id, "constructed");
    }

    fn evaluate_watcher(&self, index: usize, call_handler: bool) {
        let (Some(slot), Some(watcher)) = (
            self.watchers.get(index),
            self.class.declaration().watchers().get(index),
        ) else {
            return;
        };
        let this = self.this.clone();
        let dependency = watcher.clone();
        let evaluated = slot
            .tracker
            .track(move || this.upgrade().map(|inner| dependency.evaluate(&inner.context)));
        let Some(Some(value)) = evaluated else {
            return;
        };
        if call_handler {
            trace!(element = self.name(), index, ?value, "watcher changed");
            watcher.handle(&self.context, value);
        }
    }

    /// Queue this instance once.
    fn schedule(&self) {
        let flags = self.flags.get();
        if flags.intersects(InstanceFlags::DETACHED | InstanceFlags::SCHEDULED) {
            return;
        }
        self.flags.set(flags | InstanceFlags::SCHEDULED);
        trace!(element = self.name(), id = self.id, "scheduled");
        let job: Weak<dyn Job> = self.this.clone();
        scheduler::enqueue(job);
    }

    /// Re-evaluate dirty watchers once each, in declaration order.
    fn run_dirty_watchers(&self) {
        for (index, slot) in self.watchers.iter().enumerate() {
            if self.has(InstanceFlags::DETACHED) {
                break;
            }
            if slot.dirty.replace(false) {
                self.evaluate_watcher(index, true);
            }
        }
    }

    fn drain(&self) -> Result<()> {
        let limit = max_flush_iterations();
        let mut watcher_rounds = 0;
        let mut render_passes = 0;

        loop {
            if self.has(InstanceFlags::DETACHED) {
                trace!(element = self.name(), "dropping work of detached instance");
                return Ok(());
            }

            if self.watchers.iter().any(|slot| slot.dirty.get()) {
                watcher_rounds += 1;
                self.check_bound(watcher_rounds, limit)?;
                self.run_dirty_watchers();
            } else if self.render_dirty.get() && self.has(InstanceFlags::ATTACHED) {
                render_passes += 1;
                self.check_bound(render_passes, limit)?;
                self.render_pass()?;
            } else {
                return Ok(());
            }
        }
    }

    fn check_bound(&self, rounds: usize, limit: usize) -> Result<()> {
        if rounds <= limit {
            return Ok(());
        }
        self.cancel_pending();
        error!(element = self.name(), limit, "watcher cascade aborted");
        Err(Error::WatcherCascade {
            element: self.name().to_owned(),
            limit,
        })
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn render_pass(&self) -> Result<()> {
        let Some(document) = self.document.upgrade() else {
            return Ok(());
        };
        let span = debug_span!("render", element = self.name(), id = self.id);
        let _enter = span.enter();

        self.render_dirty.set(false);
        self.set_flag(InstanceFlags::RENDERING, true);

        let this = self.this.clone();
        let rendered = self.render_tracker.track(move || {
            this.upgrade().map(|inner| {
                let declaration = inner.class.declaration();
                let template = declaration.template_fn().map(|f| f(&inner.context));
                let style = declaration.style_fn().map(|f| f(&inner.context));
                (template, style)
            })
        });
        let result = match rendered.flatten() {
            Some((template, style)) => untracked(|| self.apply(&document, template, style)),
            None => Ok(()),
        };

        self.set_flag(InstanceFlags::RENDERING, false);
        result
    }

    /// Render target: the shadow root if there is one, else the host.
    fn target(&self) -> NodeId {
        self.shadow.unwrap_or(self.node)
    }

    fn apply(
        &self,
        document: &Document,
        template: Option<Template>,
        style: Option<Stylesheet>,
    ) -> Result<()> {
        let mut slot = self.output.borrow_mut();
        let first = slot.is_none();
        let output = slot.get_or_insert_with(Output::default);
        let previous = output
            .template
            .as_ref()
            .map(Mounted::nodes)
            .unwrap_or_default();

        if first {
            output.template = template.map(|t| Mounted::mount(document, t));
            output.style = style.map(|sheet| {
                let text = sheet.css_text();
                StyleOutput {
                    shape: sheet.shape(),
                    node: document.create_style(&text),
                    text,
                }
            });
            if let (Some(style), None) = (&output.style, self.shadow) {
                document.append_child(document.head(), style.node)?;
            }
            debug!(element = self.name(), "first render attached");
        } else {
            if let Err(err) = self.check_shapes(output, template.as_ref(), style.as_ref()) {
                drop(slot);
                if let Some(template) = &template {
                    self.discard(document, template, &previous);
                }
                return Err(err);
            }
            if let (Some(mounted), Some(template)) = (output.template.as_mut(), template) {
                mounted.patch(document, template)?;
            }
            if let (Some(current), Some(sheet)) = (output.style.as_mut(), style) {
                let text = sheet.css_text();
                if text != current.text {
                    document.set_text(current.node, &text)?;
                    current.text = text;
                }
            }
            debug!(element = self.name(), "re-rendered");
        }

        let shadow_style = output
            .style
            .as_ref()
            .filter(|_| self.shadow.is_some())
            .map(|style| style.node);
        let children = output.template.as_ref().map(Mounted::nodes);
        drop(slot);

        if children.is_none() && shadow_style.is_none() {
            return Ok(());
        }
        let current = children.unwrap_or_default();
        let mut ordered: Vec<NodeId> = shadow_style.into_iter().collect();
        ordered.extend(current.iter().copied());
        document.replace_children(self.target(), &ordered)?;

        // Dropped text nodes and elements nobody re-parented are freed.
        for node in previous.into_iter().filter(|node| !current.contains(node)) {
            if document.parent(node).is_none() && document.contains(node) {
                document.release(node)?;
            }
        }
        Ok(())
    }

    /// Free the child elements a rejected template created. Elements that are
    /// already mounted or parented elsewhere are left alone.
    fn discard(&self, document: &Document, template: &Template, keep: &[NodeId]) {
        let children = template.parts().iter().filter_map(|part| match part {
            Part::Elements(elements) => Some(elements),
            Part::Value(_) => None,
        });
        for element in children.flatten() {
            let node = element.node();
            if keep.contains(&node) || document.parent(node).is_some() || !document.contains(node) {
                continue;
            }
            trace!(element = self.name(), child = element.name(), "releasing rejected child");
            if let Err(err) = document.release(node) {
                trace!(%err, "rejected child already gone");
            }
        }
    }

    fn check_shapes(
        &self,
        output: &Output,
        template: Option<&Template>,
        style: Option<&Stylesheet>,
    ) -> Result<()> {
        if let (Some(mounted), Some(template)) = (&output.template, template) {
            if mounted.shape() != template.shape() {
                warn!(element = self.name(), "template shape changed; render rejected");
                return Err(Error::TemplateShape {
                    element: self.name().to_owned(),
                });
            }
        }
        if let (Some(current), Some(sheet)) = (&output.style, style) {
            if current.shape != sheet.shape() {
                warn!(element = self.name(), "style shape changed; render rejected");
                return Err(Error::StyleShape {
                    element: self.name().to_owned(),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Connection
    // =========================================================================

    fn connected(&self) -> Result<()> {
        if self.has(InstanceFlags::DETACHED) || self.has(InstanceFlags::ATTACHED) {
            return Ok(());
        }
        self.set_flag(InstanceFlags::ATTACHED, true);
        debug!(element = self.name(), id = self.id, "attached");
        self.render_pass()
    }

    fn disconnected(&self) {
        if self.has(InstanceFlags::DETACHED) {
            return;
        }
        self.cancel_pending();
        self.set_flag(InstanceFlags::DETACHED, true);
        self.set_flag(InstanceFlags::RENDERING, false);
        self.scope.stop();
        debug!(element = self.name(), id = self.id, "detached");
    }

    /// Scope cleanup: drop every dependency and the head style.
    fn teardown(&self) {
        for slot in &self.watchers {
            slot.tracker.stop();
        }
        self.render_tracker.stop();

        let head_style = self
            .output
            .borrow()
            .as_ref()
            .and_then(|output| output.style.as_ref())
            .filter(|_| self.shadow.is_none())
            .map(|style| style.node);
        if let (Some(style), Some(document)) = (head_style, self.document.upgrade()) {
            if let Err(err) = document.remove(style).and_then(|()| document.release(style)) {
                trace!(%err, "style node already gone");
            }
        }
    }
}

impl Job for InstanceInner {
    fn job_id(&self) -> u64 {
        self.id
    }

    fn label(&self) -> String {
        self.name().to_owned()
    }

    fn run(self: Rc<Self>) -> Result<()> {
        let result = self.drain();
        self.set_flag(InstanceFlags::SCHEDULED, false);
        result
    }

    fn cancel_pending(&self) {
        for slot in &self.watchers {
            slot.dirty.set(false);
        }
        self.render_dirty.set(false);
        self.set_flag(InstanceFlags::SCHEDULED, false);
    }
}

// =============================================================================
// Element
// =============================================================================

/// Handle to a component instance.
///
/// Cloning yields another handle to the same instance.
#[derive(Clone)]
pub struct Element {
    inner: Rc<InstanceInner>,
}

impl Element {
    pub(crate) fn from_inner(inner: Rc<InstanceInner>) -> Self {
        Self { inner }
    }

    /// Host element node.
    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn class(&self) -> &ComponentClass {
        &self.inner.class
    }

    pub fn document(&self) -> Option<Document> {
        self.inner.document.upgrade()
    }

    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from(self.inner.flags.get())
    }

    pub fn flags(&self) -> InstanceFlags {
        self.inner.flags.get()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.has(InstanceFlags::ATTACHED) && !self.inner.has(InstanceFlags::DETACHED)
    }

    /// Open shadow root, as the document exposes it.
    pub fn shadow_root(&self) -> Option<NodeId> {
        self.document()
            .and_then(|document| document.shadow_root(self.inner.node))
    }

    /// Property assignment; equivalent to setting an observed attribute.
    ///
    /// Names the declaration does not list as props are ignored.
    pub fn set_prop(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        if !self.class().observes(name) {
            debug!(element = self.name(), prop = name, "undeclared prop ignored");
            return Ok(());
        }
        trace!(element = self.name(), prop = name, "prop sync");
        self.inner.context.props().set(name, value)
    }

    /// Tracked read of a prop.
    pub fn prop(&self, name: &str) -> Value {
        self.inner.context.props().get(name)
    }

    /// Inject (or replace) the router.
    pub fn set_router(&self, router: Option<Router>) -> Result<()> {
        self.inner
            .context
            .injected()
            .set(ROUTER_KEY, router.map_or(Value::Null, Value::from))
    }

    /// Injected router, untracked.
    pub fn router(&self) -> Option<Router> {
        self.inner.context.peek_router()
    }

    pub fn is_router_view(&self) -> bool {
        self.inner.class.is_router_view()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn connected(&self) -> Result<()> {
        self.inner.connected()
    }

    pub(crate) fn disconnected(&self) {
        self.inner.disconnected();
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name())
            .field("node", &self.inner.node)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{reset_config, set_flush_mode, set_max_flush_iterations, FlushMode};
    use crate::engine::Registry;
    use crate::reactive::{flush, reset_runtime};
    use crate::template::{css, html};
    use crate::types::{Record, ShadowMode};
    use crate::Declaration;

    fn setup() -> (Document, Registry) {
        reset_runtime();
        reset_config();
        let registry = Registry::new();
        (Document::with_registry(registry.clone()), registry)
    }

    fn mount(document: &Document, class: &ComponentClass) -> Element {
        let element = class.create(document).unwrap();
        document.append_child(document.body(), element.node()).unwrap();
        element
    }

    fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let hits = Rc::new(Cell::new(0));
        (hits.clone(), hits)
    }

    #[test]
    fn test_lifecycle_transitions() {
        let (document, registry) = setup();
        let class = registry
            .register(Declaration::new("x-life").template(|_| Template::text("hi")))
            .unwrap();

        let element = class.create(&document).unwrap();
        assert_eq!(element.lifecycle(), Lifecycle::Constructed);
        assert!(document.children(element.node()).is_empty());

        document.append_child(document.body(), element.node()).unwrap();
        assert_eq!(element.lifecycle(), Lifecycle::Idle);
        assert_eq!(document.text_content(element.node()), "hi");

        document.remove(element.node()).unwrap();
        assert_eq!(element.lifecycle(), Lifecycle::Detached);

        // Terminal: re-inserting does not revive it.
        document.append_child(document.body(), element.node()).unwrap();
        assert_eq!(element.lifecycle(), Lifecycle::Detached);
    }

    #[test]
    fn test_patch_preserves_node_identity() {
        let (document, registry) = setup();
        let class = registry
            .register(
                Declaration::new("x-patch")
                    .template(|ctx| html(&["count: ", ""], [Part::from(ctx.state().get("n"))])),
            )
            .unwrap();
        let element = mount(&document, &class);
        let before = document.children(element.node());

        element.context().state().set("n", 3).unwrap();

        assert_eq!(document.children(element.node()), before);
        assert_eq!(document.text_content(element.node()), "count: 3");
    }

    #[test]
    fn test_invalidations_collapse_in_batch() {
        let (document, registry) = setup();
        let (renders, seen) = counter();
        let class = registry
            .register(Declaration::new("x-batch").template(move |ctx| {
                renders.set(renders.get() + 1);
                html(&["", "/", ""], [Part::from(ctx.state().get("a")), Part::from(ctx.state().get("b"))])
            }))
            .unwrap();
        let element = mount(&document, &class);
        assert_eq!(seen.get(), 1);

        batch(|| {
            element.context().state().set("a", 1).unwrap();
            element.context().state().set("b", 2).unwrap();
        })
        .unwrap();

        assert_eq!(seen.get(), 2);
        assert_eq!(document.text_content(element.node()), "1/2");
    }

    #[test]
    fn test_deferred_mode_renders_on_flush() {
        let (document, registry) = setup();
        set_flush_mode(FlushMode::Deferred);
        let class = registry
            .register(Declaration::new("x-deferred").template(|ctx| Template::slot(ctx.state().get("v"))))
            .unwrap();
        let element = mount(&document, &class);

        element.context().state().set("v", "later").unwrap();
        assert_eq!(document.text_content(element.node()), "");

        flush().unwrap();
        assert_eq!(document.text_content(element.node()), "later");
        reset_config();
    }

    #[test]
    fn test_detach_drops_pending_render() {
        let (document, registry) = setup();
        set_flush_mode(FlushMode::Deferred);
        let (renders, seen) = counter();
        let class = registry
            .register(Declaration::new("x-drop").template(move |ctx| {
                renders.set(renders.get() + 1);
                Template::slot(ctx.state().get("v"))
            }))
            .unwrap();
        let element = mount(&document, &class);

        element.context().state().set("v", 1).unwrap();
        document.remove(element.node()).unwrap();
        assert!(flush().is_ok());
        assert_eq!(seen.get(), 1);
        assert_eq!(element.context().state().subscriber_count("v"), 0);
        reset_config();
    }

    #[test]
    fn test_watcher_writes_fold_into_same_run() {
        let (document, registry) = setup();
        let (renders, seen) = counter();
        let class = registry
            .register(
                Declaration::new("x-derive")
                    .watch_with(
                        |ctx| ctx.state().get("n"),
                        |ctx, n| {
                            let doubled = n.as_int().unwrap_or(0) * 2;
                            ctx.state().set("double", doubled).unwrap();
                        },
                    )
                    .template(move |ctx| {
                        renders.set(renders.get() + 1);
                        Template::slot(ctx.state().get("double"))
                    }),
            )
            .unwrap();
        let element = mount(&document, &class);

        element.context().state().set("n", 4).unwrap();
        assert_eq!(document.text_content(element.node()), "8");
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_watcher_cascade_is_bounded() {
        let (document, registry) = setup();
        set_max_flush_iterations(5);
        let class = registry
            .register(Declaration::new("x-loop").watch_with(
                |ctx| ctx.state().get("n"),
                |ctx, n| {
                    // Nested writes only queue; the outer write reports.
                    let _ = ctx.state().set("n", n.as_int().unwrap_or(0) + 1);
                },
            ))
            .unwrap();
        let element = mount(&document, &class);

        let err = element.context().state().set("n", 1).unwrap_err();
        assert!(matches!(err, Error::WatcherCascade { limit: 5, .. }));
        reset_config();
    }

    #[test]
    fn test_style_shape_error_keeps_output() {
        let (document, registry) = setup();
        let class = registry
            .register(Declaration::new("x-style").style(|ctx| {
                if ctx.state().get("alt").is_truthy() {
                    css(&[".alt {}"], [])
                } else {
                    css(&[".base { color: ", " }"], [ctx.state().get("color")])
                }
            }))
            .unwrap();
        let element = mount(&document, &class);
        let style = *document.children(document.head()).last().unwrap();
        assert_eq!(document.text(style).as_deref(), Some(".base { color:  }"));

        element.context().state().set("color", "red").unwrap();
        assert_eq!(document.text(style).as_deref(), Some(".base { color: red }"));

        let err = element.context().state().set("alt", true).unwrap_err();
        assert!(matches!(err, Error::StyleShape { .. }));
        assert_eq!(document.text(style).as_deref(), Some(".base { color: red }"));
    }

    #[test]
    fn test_head_style_removed_on_detach() {
        let (document, registry) = setup();
        let class = registry
            .register(Declaration::new("x-gone").style(|_| css(&[".gone {}"], [])))
            .unwrap();
        let element = mount(&document, &class);
        assert_eq!(document.children(document.head()).len(), 1);

        document.remove(element.node()).unwrap();
        assert!(document.children(document.head()).is_empty());
    }

    #[test]
    fn test_closed_shadow_renders_into_hidden_root() {
        let (document, registry) = setup();
        let class = registry
            .register(
                Declaration::new("x-closed")
                    .shadow_dom(ShadowMode::Closed)
                    .template(|_| Template::text("secret")),
            )
            .unwrap();
        let element = mount(&document, &class);

        assert!(element.shadow_root().is_none());
        assert_eq!(document.text_content(element.node()), "");
        let texts: Vec<String> = document
            .composed_descendants(element.node())
            .into_iter()
            .filter_map(|node| document.text(node))
            .collect();
        assert_eq!(texts, vec!["secret".to_string()]);
    }

    #[test]
    fn test_literal_state_is_per_instance() {
        let (document, registry) = setup();
        let class = registry
            .register(
                Declaration::new("x-literal")
                    .state_literal(Record::from([("n".to_string(), Value::from(0))])),
            )
            .unwrap();
        let a = class.create(&document).unwrap();
        let b = class.create(&document).unwrap();

        a.context().state().set("n", 1).unwrap();
        assert_eq!(b.context().state().peek("n"), Value::from(0));
    }

    #[test]
    fn test_rejected_render_releases_new_children() {
        let (document, registry) = setup();
        let leaf = registry
            .register(Declaration::new("x-leaf").template(|_| Template::text("leaf")))
            .unwrap();
        let class = registry
            .register(Declaration::new("x-flip").template(move |ctx| {
                let document = ctx.document().unwrap();
                let kids: Vec<Element> = leaf.create(&document).into_iter().collect();
                let n = Part::from(ctx.state().get("n"));
                if ctx.state().get("alt").is_truthy() {
                    html(&["alt[", "] ", ""], [Part::from(kids), n])
                } else {
                    html(&["[", "] ", ""], [Part::from(kids), n])
                }
            }))
            .unwrap();
        let element = mount(&document, &class);
        assert_eq!(document.text_content(element.node()), "[leaf] ");

        let err = element.context().state().set("alt", true).unwrap_err();
        assert!(matches!(err, Error::TemplateShape { .. }));
        let before = document.node_count();

        for n in 0..50 {
            let err = element.context().state().set("n", n).unwrap_err();
            assert!(matches!(err, Error::TemplateShape { .. }));
        }
        assert_eq!(document.node_count(), before);
        assert_eq!(document.text_content(element.node()), "[leaf] ");
    }

    #[test]
    fn test_watchers_run_in_declaration_order() {
        let (document, registry) = setup();
        let log: Rc<RefCell<Vec<String>>> = Rc::default();
        let (first, second, third) = (log.clone(), log.clone(), log.clone());
        let class = registry
            .register(
                Declaration::new("x-order")
                    .watch_with(
                        |ctx| ctx.state().get("n"),
                        move |ctx, n| {
                            first.borrow_mut().push("first".to_string());
                            ctx.state().set("seen", n).unwrap();
                        },
                    )
                    .watch_with(
                        |ctx| ctx.state().get("n"),
                        move |_, _| second.borrow_mut().push("second".to_string()),
                    )
                    .watch_with(
                        |ctx| ctx.state().get("seen"),
                        move |_, seen| {
                            third
                                .borrow_mut()
                                .push(format!("third {}", seen.as_int().unwrap_or(-1)));
                        },
                    ),
            )
            .unwrap();
        let element = mount(&document, &class);
        assert!(log.borrow().is_empty());

        element.context().state().set("n", 1).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second", "third 1"]);
        assert!(!element.flags().contains(InstanceFlags::SCHEDULED));
    }

    #[test]
    fn test_set_prop_ignores_undeclared_names() {
        let (document, registry) = setup();
        let class = registry
            .register(
                Declaration::new("x-props")
                    .props(["label"])
                    .template(|ctx| Template::slot(ctx.props().get("label"))),
            )
            .unwrap();
        let element = mount(&document, &class);

        element.set_prop("label", "ok").unwrap();
        element.set_prop("stray", "nope").unwrap();

        assert_eq!(document.text_content(element.node()), "ok");
        assert_eq!(element.context().props().keys(), vec!["label".to_string()]);
        assert_eq!(element.context().props().peek("stray"), Value::Null);
    }

    #[test]
    fn test_created_effects_end_on_detach() {
        let (document, registry) = setup();
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let class = registry
            .register(Declaration::new("x-scoped").created(move |ctx| {
                let state = ctx.state().clone();
                let counter = counter.clone();
                spark_signals::effect_sync(move || {
                    state.get("tick");
                    counter.set(counter.get() + 1);
                });
            }))
            .unwrap();
        let element = mount(&document, &class);
        assert_eq!(runs.get(), 1);

        element.context().state().set("tick", 1).unwrap();
        assert_eq!(runs.get(), 2);

        document.remove(element.node()).unwrap();
        element.context().state().set("tick", 2).unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(element.context().state().subscriber_count("tick"), 0);
    }

    #[test]
    fn test_rerenders_keep_one_subscription_per_field() {
        let (document, registry) = setup();
        let class = registry
            .register(Declaration::new("x-steady").template(|ctx| {
                html(
                    &["", "/", ""],
                    [Part::from(ctx.state().get("hot")), Part::from(ctx.state().get("rare"))],
                )
            }))
            .unwrap();
        let element = mount(&document, &class);
        let state = element.context().state().clone();

        for n in 0..100 {
            state.set("hot", n).unwrap();
        }
        assert_eq!(document.text_content(element.node()), "99/");
        assert_eq!(state.subscriber_count("hot"), 1);
        assert_eq!(state.subscriber_count("rare"), 1);

        document.remove(element.node()).unwrap();
        assert_eq!(state.subscriber_count("hot"), 0);
        assert_eq!(state.subscriber_count("rare"), 0);
    }
}
