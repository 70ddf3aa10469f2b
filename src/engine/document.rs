//! Document Tree - Arena of nodes hosting component instances.
//!
//! Nodes are NOT objects. They are generation-checked indices into one arena:
//!
//! ```text
//! Index 0: Document     (parent=-,  children=[1, 2])
//! Index 1: <head>       (parent=0,  children=[5])
//! Index 2: <body>       (parent=0,  children=[3])
//! Index 3: <my-element> (parent=2,  shadow=4, component=Element)
//! Index 4: #shadow-root (host=3,    children=[...])
//! Index 5: <style>      (parent=1)
//! ```
//!
//! Freed slots go to a pool and are reused with a bumped generation, so a
//! stale [`NodeId`] is rejected instead of silently addressing a new node.
//!
//! # Connection
//!
//! A node is connected when its composed parent chain (parent, or host for a
//! shadow root) reaches the document root. Inserting a subtree into a
//! connected parent attaches its components in tree order (first render);
//! removing it detaches them. Moving a node between two connected parents
//! changes nothing for its components.
//!
//! Component callbacks never run while the arena is borrowed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use super::registry::{default_registry, Registry};
use crate::component::Element;
use crate::error::{Error, Result};
use crate::reactive::{batch, untracked};
use crate::types::{ShadowMode, Value};

// =============================================================================
// Node Identity
// =============================================================================

/// Handle to a node of one [`Document`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

/// Kind of a node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Style,
    ShadowRoot,
}

enum NodeKind {
    Document,
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
    Style(String),
    ShadowRoot(ShadowMode),
}

impl NodeKind {
    fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Document => NodeType::Document,
            NodeKind::Element { .. } => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Style(_) => NodeType::Style,
            NodeKind::ShadowRoot(_) => NodeType::ShadowRoot,
        }
    }
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow_root: Option<NodeId>,
    /// Set on shadow roots only.
    host: Option<NodeId>,
    component: Option<Element>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            shadow_root: None,
            host: None,
            component: None,
        }
    }

    /// Parent across shadow boundaries.
    fn composed_parent(&self) -> Option<NodeId> {
        self.parent.or(self.host)
    }
}

// =============================================================================
// Arena
// =============================================================================

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(data);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            data: Some(data),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn get(&self, id: NodeId) -> Result<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
            .ok_or(Error::UnknownNode)
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
            .ok_or(Error::UnknownNode)
    }

    fn free(&mut self, id: NodeId) -> Option<NodeData> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(data)
    }

    fn detach_from_parent(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.get_mut(id)?.parent.take() {
            self.get_mut(parent)?.children.retain(|child| *child != id);
        }
        Ok(())
    }
}

// =============================================================================
// Document
// =============================================================================

struct DocumentInner {
    arena: RefCell<Arena>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    registry: Registry,
}

/// A document tree. Cloning yields another handle to the same document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

/// Non-owning handle held by component instances.
#[derive(Clone, Default)]
pub struct WeakDocument(Weak<DocumentInner>);

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.0.upgrade().map(|inner| Document { inner })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Document resolving tags against the thread's default registry.
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(registry: Registry) -> Self {
        let mut arena = Arena::default();
        let root = arena.alloc(NodeData::new(NodeKind::Document));
        let head = arena.alloc(NodeData::new(element_kind("head")));
        let body = arena.alloc(NodeData::new(element_kind("body")));
        for node in [head, body] {
            if let Ok(data) = arena.get_mut(node) {
                data.parent = Some(root);
            }
        }
        if let Ok(data) = arena.get_mut(root) {
            data.children = vec![head, body];
        }

        Self {
            inner: Rc::new(DocumentInner {
                arena: RefCell::new(arena),
                root,
                head,
                body,
                registry,
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    /// Document-level style sink.
    pub fn head(&self) -> NodeId {
        self.inner.head
    }

    pub fn body(&self) -> NodeId {
        self.inner.body
    }

    fn with_node<R>(&self, node: NodeId, f: impl FnOnce(&NodeData) -> R) -> Result<R> {
        self.inner.arena.borrow().get(node).map(f)
    }

    fn with_node_mut<R>(&self, node: NodeId, f: impl FnOnce(&mut NodeData) -> R) -> Result<R> {
        self.inner.arena.borrow_mut().get_mut(node).map(f)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    pub fn create_text(&self, text: &str) -> NodeId {
        self.inner
            .arena
            .borrow_mut()
            .alloc(NodeData::new(NodeKind::Text(text.to_owned())))
    }

    pub(crate) fn create_style(&self, css: &str) -> NodeId {
        self.inner
            .arena
            .borrow_mut()
            .alloc(NodeData::new(NodeKind::Style(css.to_owned())))
    }

    /// Element that is not backed by a component, whatever its tag.
    pub fn create_plain_element(&self, tag: &str) -> NodeId {
        self.inner
            .arena
            .borrow_mut()
            .alloc(NodeData::new(element_kind(tag)))
    }

    /// Create an element. Registered tags construct their component.
    pub fn create_element(&self, tag: &str) -> Result<NodeId> {
        match self.inner.registry.get(tag) {
            Some(class) => Ok(class.create(self)?.node()),
            None => Ok(self.create_plain_element(tag)),
        }
    }

    pub(crate) fn attach_shadow(&self, host: NodeId, mode: ShadowMode) -> Result<NodeId> {
        let mut arena = self.inner.arena.borrow_mut();
        let data = arena.get(host)?;
        if !matches!(data.kind, NodeKind::Element { .. }) {
            return Err(Error::hierarchy("only elements can host a shadow root"));
        }
        if data.shadow_root.is_some() {
            return Err(Error::hierarchy("element already hosts a shadow root"));
        }

        let mut shadow = NodeData::new(NodeKind::ShadowRoot(mode));
        shadow.host = Some(host);
        let shadow = arena.alloc(shadow);
        arena.get_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    pub(crate) fn set_component(&self, node: NodeId, element: Element) -> Result<()> {
        self.with_node_mut(node, |data| data.component = Some(element))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The component instance living on `node`, if any.
    pub fn component(&self, node: NodeId) -> Option<Element> {
        self.with_node(node, |data| data.component.clone())
            .ok()
            .flatten()
    }

    /// Framework-managed marker.
    pub fn is_component(&self, node: NodeId) -> bool {
        self.with_node(node, |data| data.component.is_some())
            .unwrap_or(false)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.arena.borrow().get(node).is_ok()
    }

    pub fn node_type(&self, node: NodeId) -> Option<NodeType> {
        self.with_node(node, |data| data.kind.node_type()).ok()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |data| match &data.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        })
        .ok()
        .flatten()
    }

    /// Data of a text or style node.
    pub fn text(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |data| match &data.kind {
            NodeKind::Text(text) | NodeKind::Style(text) => Some(text.clone()),
            _ => None,
        })
        .ok()
        .flatten()
    }

    pub fn set_text(&self, node: NodeId, text: &str) -> Result<()> {
        self.with_node_mut(node, |data| match &mut data.kind {
            NodeKind::Text(current) | NodeKind::Style(current) => {
                text.clone_into(current);
                Ok(())
            }
            _ => Err(Error::hierarchy("not a text or style node")),
        })?
    }

    /// Concatenated data of all light-tree text descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let arena = self.inner.arena.borrow();
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Ok(data) = arena.get(id) else { continue };
            if let NodeKind::Text(text) = &data.kind {
                out.push_str(text);
            }
            stack.extend(data.children.iter().rev());
        }
        out
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.with_node(node, |data| data.parent).ok().flatten()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.with_node(node, |data| data.children.clone())
            .unwrap_or_default()
    }

    /// Open shadow root of `host`. Closed roots are not reachable from outside.
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        let arena = self.inner.arena.borrow();
        let shadow = arena.get(host).ok()?.shadow_root?;
        match arena.get(shadow).ok()?.kind {
            NodeKind::ShadowRoot(ShadowMode::Open) => Some(shadow),
            _ => None,
        }
    }

    /// Host of a shadow root.
    pub fn host(&self, shadow_root: NodeId) -> Option<NodeId> {
        self.with_node(shadow_root, |data| data.host).ok().flatten()
    }

    /// Ancestors of `node`, nearest first, crossing from shadow roots to
    /// their hosts.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let arena = self.inner.arena.borrow();
        let mut out = Vec::new();
        let mut current = arena.get(node).ok().and_then(NodeData::composed_parent);
        while let Some(id) = current {
            out.push(id);
            current = arena.get(id).ok().and_then(NodeData::composed_parent);
        }
        out
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.inner.root || self.ancestors(node).last() == Some(&self.inner.root)
    }

    /// `node` and everything below it in tree order, shadow trees before
    /// light children.
    pub fn composed_descendants(&self, node: NodeId) -> Vec<NodeId> {
        let arena = self.inner.arena.borrow();
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Ok(data) = arena.get(id) else { continue };
            out.push(id);
            stack.extend(data.children.iter().rev());
            if let Some(shadow) = data.shadow_root {
                stack.push(shadow);
            }
        }
        out
    }

    /// Number of live nodes, including the root, head and body.
    pub fn node_count(&self) -> usize {
        self.inner.arena.borrow().live
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_node(node, |data| match &data.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        })
        .ok()
        .flatten()
    }

    /// Set an attribute. Observed attributes of a component are forwarded to
    /// its props.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.with_node_mut(node, |data| match &mut data.kind {
            NodeKind::Element { attributes, .. } => {
                attributes.insert(name.to_owned(), value.to_owned());
                Ok(())
            }
            _ => Err(Error::hierarchy("attributes live on elements only")),
        })??;
        self.forward_attribute(node, name, Value::from(value))
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<()> {
        let removed = self.with_node_mut(node, |data| match &mut data.kind {
            NodeKind::Element { attributes, .. } => attributes.remove(name).is_some(),
            _ => false,
        })?;
        if removed {
            self.forward_attribute(node, name, Value::Null)?;
        }
        Ok(())
    }

    fn forward_attribute(&self, node: NodeId, name: &str, value: Value) -> Result<()> {
        match self.component(node) {
            Some(element) if element.class().observes(name) => {
                trace!(element = element.name(), attribute = name, "attribute forwarded to prop");
                element.set_prop(name, value)
            }
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Tree Mutation
    // =========================================================================

    fn validate_insert(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let arena = self.inner.arena.borrow();
        match arena.get(parent)?.kind {
            NodeKind::Text(_) | NodeKind::Style(_) => {
                return Err(Error::hierarchy("text nodes cannot have children"));
            }
            _ => {}
        }
        match arena.get(child)?.kind {
            NodeKind::Document | NodeKind::ShadowRoot(_) => {
                return Err(Error::hierarchy("node cannot be inserted"));
            }
            _ => {}
        }
        drop(arena);

        if parent == child || self.ancestors(parent).contains(&child) {
            return Err(Error::hierarchy("insertion would create a cycle"));
        }
        Ok(())
    }

    /// Append `child` to `parent`, moving it from its current parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.validate_insert(parent, child)?;
        let was_connected = self.is_connected(child);
        {
            let mut arena = self.inner.arena.borrow_mut();
            arena.detach_from_parent(child)?;
            arena.get_mut(child)?.parent = Some(parent);
            arena.get_mut(parent)?.children.push(child);
        }
        let now_connected = self.is_connected(parent);
        self.propagate(child, was_connected, now_connected)
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::hierarchy("node is not a child of the given parent"));
        }
        self.remove(child)
    }

    /// Detach `node` from its parent, if it has one.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        if node == self.inner.root {
            return Err(Error::hierarchy("the document root cannot be removed"));
        }
        let was_connected = self.is_connected(node);
        self.inner.arena.borrow_mut().detach_from_parent(node)?;
        self.propagate(node, was_connected, false)
    }

    /// Replace the child list of `parent` with `children`, in order.
    ///
    /// Children present before and after keep their identity and lifecycle.
    pub fn replace_children(&self, parent: NodeId, children: &[NodeId]) -> Result<()> {
        for &child in children {
            self.validate_insert(parent, child)?;
        }
        let parent_connected = self.is_connected(parent);
        let previous = self.children(parent);

        let outgoing: Vec<NodeId> = previous
            .iter()
            .copied()
            .filter(|node| !children.contains(node))
            .collect();
        let incoming: Vec<(NodeId, bool)> = children
            .iter()
            .copied()
            .filter(|node| !previous.contains(node))
            .map(|node| (node, self.is_connected(node)))
            .collect();

        {
            let mut arena = self.inner.arena.borrow_mut();
            for &node in &outgoing {
                arena.get_mut(node)?.parent = None;
            }
            for &(node, _) in &incoming {
                arena.detach_from_parent(node)?;
                arena.get_mut(node)?.parent = Some(parent);
            }
            arena.get_mut(parent)?.children = children.to_vec();
        }

        if parent_connected {
            for node in outgoing {
                self.disconnect_subtree(node);
            }
        }
        let mut first_error = None;
        for (node, was_connected) in incoming {
            if let Err(err) = self.propagate(node, was_connected, parent_connected) {
                record_error(&mut first_error, err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Free a disconnected subtree. Its ids become stale.
    pub fn release(&self, node: NodeId) -> Result<()> {
        if node == self.inner.root || node == self.inner.head || node == self.inner.body {
            return Err(Error::hierarchy("document structure cannot be released"));
        }
        if self.is_connected(node) {
            return Err(Error::hierarchy("cannot release a connected node"));
        }
        self.inner.arena.borrow_mut().detach_from_parent(node)?;

        let nodes = self.composed_descendants(node);
        let freed: Vec<NodeData> = {
            let mut arena = self.inner.arena.borrow_mut();
            nodes.iter().filter_map(|&id| arena.free(id)).collect()
        };
        trace!(?node, count = freed.len(), "released subtree");

        // Components are dropped outside the arena borrow.
        for data in freed {
            if let Some(element) = data.component {
                element.disconnected();
            }
        }
        Ok(())
    }

    // =========================================================================
    // Connection Propagation
    // =========================================================================

    fn propagate(&self, node: NodeId, was_connected: bool, now_connected: bool) -> Result<()> {
        match (was_connected, now_connected) {
            (false, true) => self.connect_subtree(node),
            (true, false) => {
                self.disconnect_subtree(node);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn components_in(&self, node: NodeId) -> Vec<Element> {
        self.composed_descendants(node)
            .into_iter()
            .filter_map(|id| self.component(id))
            .collect()
    }

    fn connect_subtree(&self, node: NodeId) -> Result<()> {
        let components = self.components_in(node);
        if components.is_empty() {
            return Ok(());
        }
        debug!(?node, count = components.len(), "connecting subtree");

        batch(|| {
            untracked(|| {
                let mut first_error = None;
                for element in components {
                    // An earlier render may have dropped this one already.
                    if !self.is_connected(element.node()) {
                        continue;
                    }
                    if let Err(err) = element.connected() {
                        record_error(&mut first_error, err);
                    }
                }
                first_error.map_or(Ok(()), Err)
            })
        })?
    }

    fn disconnect_subtree(&self, node: NodeId) {
        let components = self.components_in(node);
        if !components.is_empty() {
            debug!(?node, count = components.len(), "disconnecting subtree");
        }
        for element in components {
            element.disconnected();
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .finish_non_exhaustive()
    }
}

fn element_kind(tag: &str) -> NodeKind {
    NodeKind::Element {
        tag: tag.to_owned(),
        attributes: BTreeMap::new(),
    }
}

fn record_error(first: &mut Option<Error>, err: Error) {
    if first.is_some() {
        error!(%err, "additional error while connecting");
    } else {
        *first = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Document {
        Document::with_registry(Registry::default())
    }

    #[test]
    fn test_new_document_structure() {
        let doc = document();
        assert_eq!(doc.children(doc.root()), vec![doc.head(), doc.body()]);
        assert!(doc.is_connected(doc.body()));
        assert_eq!(doc.tag_name(doc.head()).as_deref(), Some("head"));
        assert_eq!(doc.node_count(), 3);
    }

    #[test]
    fn test_append_and_connect() {
        let doc = document();
        let div = doc.create_plain_element("div");
        let text = doc.create_text("hi");
        doc.append_child(div, text).unwrap();
        assert!(!doc.is_connected(text));

        doc.append_child(doc.body(), div).unwrap();
        assert!(doc.is_connected(text));
        assert_eq!(doc.text_content(doc.body()), "hi");
        assert_eq!(doc.ancestors(text), vec![div, doc.body(), doc.root()]);
    }

    #[test]
    fn test_append_moves_node() {
        let doc = document();
        let a = doc.create_plain_element("div");
        let b = doc.create_plain_element("div");
        let text = doc.create_text("x");
        doc.append_child(a, text).unwrap();
        doc.append_child(b, text).unwrap();

        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), vec![text]);
        assert_eq!(doc.parent(text), Some(b));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let doc = document();
        let outer = doc.create_plain_element("div");
        let inner = doc.create_plain_element("div");
        doc.append_child(outer, inner).unwrap();

        assert!(matches!(doc.append_child(inner, outer), Err(Error::Hierarchy { .. })));
        assert!(matches!(doc.append_child(outer, outer), Err(Error::Hierarchy { .. })));
    }

    #[test]
    fn test_text_cannot_have_children() {
        let doc = document();
        let text = doc.create_text("a");
        let other = doc.create_text("b");
        assert!(doc.append_child(text, other).is_err());
    }

    #[test]
    fn test_release_bumps_generation() {
        let doc = document();
        let div = doc.create_plain_element("div");
        doc.release(div).unwrap();

        assert!(!doc.contains(div));
        assert!(matches!(doc.set_text(div, "x"), Err(Error::UnknownNode)));

        // Slot is reused, the old id stays stale.
        let reused = doc.create_plain_element("span");
        assert_ne!(reused, div);
        assert!(!doc.contains(div));
        assert_eq!(doc.node_count(), 4);
    }

    #[test]
    fn test_foreign_id_without_live_slot_is_unknown() {
        let big = document();
        let ids: Vec<NodeId> = (0..8).map(|_| big.create_plain_element("div")).collect();
        let small = document();
        let last = ids[ids.len() - 1];

        assert!(!small.contains(last));
        assert!(matches!(small.set_text(last, "x"), Err(Error::UnknownNode)));
    }

    #[test]
    fn test_release_connected_is_rejected() {
        let doc = document();
        let div = doc.create_plain_element("div");
        doc.append_child(doc.body(), div).unwrap();
        assert!(doc.release(div).is_err());

        doc.remove(div).unwrap();
        doc.release(div).unwrap();
    }

    #[test]
    fn test_shadow_roots() {
        let doc = document();
        let open_host = doc.create_plain_element("div");
        let closed_host = doc.create_plain_element("div");
        let open = doc.attach_shadow(open_host, ShadowMode::Open).unwrap();
        doc.attach_shadow(closed_host, ShadowMode::Closed).unwrap();

        assert_eq!(doc.shadow_root(open_host), Some(open));
        assert_eq!(doc.shadow_root(closed_host), None);
        assert_eq!(doc.host(open), Some(open_host));
        assert!(doc.attach_shadow(open_host, ShadowMode::Open).is_err());

        let text = doc.create_text("inside");
        doc.append_child(open, text).unwrap();
        assert_eq!(doc.ancestors(text), vec![open, open_host]);
        assert_eq!(doc.composed_descendants(open_host), vec![open_host, open, text]);
    }

    #[test]
    fn test_replace_children() {
        let doc = document();
        let div = doc.create_plain_element("div");
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        let c = doc.create_text("c");
        doc.replace_children(div, &[a, b]).unwrap();
        doc.replace_children(div, &[b, c]).unwrap();

        assert_eq!(doc.children(div), vec![b, c]);
        assert_eq!(doc.parent(a), None);
        assert_eq!(doc.text_content(div), "bc");
    }

    #[test]
    fn test_attributes_on_plain_elements() {
        let doc = document();
        let div = doc.create_plain_element("div");
        doc.set_attribute(div, "id", "main").unwrap();
        assert_eq!(doc.attribute(div, "id").as_deref(), Some("main"));

        doc.remove_attribute(div, "id").unwrap();
        assert_eq!(doc.attribute(div, "id"), None);

        let text = doc.create_text("t");
        assert!(doc.set_attribute(text, "id", "x").is_err());
    }
}
