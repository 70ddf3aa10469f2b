//! Attaching templates to a host and patching them in place.
//!
//! A mounted template keeps the nodes it created:
//!
//! ```text
//! fragments:  "Hello "   ""        "!"
//! nodes:      Text#1     (none)    Text#4
//! slots:           Text#2 / [Element, Element]
//! ```
//!
//! Static text nodes never change after mounting (a same-shape patch has the
//! same fragments). Slot text nodes are rewritten in place; element slots are
//! swapped. The host's child list is then replaced with [`Mounted::nodes`],
//! which disconnects dropped elements and connects new ones.

use tracing::trace;

use super::{Part, Shape, Template};
use crate::component::Element;
use crate::engine::{Document, NodeId};
use crate::error::Result;
use crate::types::Value;

enum SlotNodes {
    Text { node: NodeId, value: Value },
    Elements(Vec<Element>),
}

impl SlotNodes {
    fn create(document: &Document, part: Part) -> Self {
        match part {
            Part::Value(value) => SlotNodes::Text {
                node: document.create_text(&value.to_string()),
                value,
            },
            Part::Elements(elements) => SlotNodes::Elements(elements),
        }
    }
}

pub(crate) struct Mounted {
    shape: Shape,
    statics: Vec<Option<NodeId>>,
    slots: Vec<SlotNodes>,
}

impl Mounted {
    /// Create the nodes for a first render. Nothing is parented yet.
    pub(crate) fn mount(document: &Document, template: Template) -> Self {
        let (fragments, parts, shape) = template.into_parts();

        let statics = fragments
            .iter()
            .map(|fragment| (!fragment.is_empty()).then(|| document.create_text(fragment)))
            .collect();
        let slots = parts
            .into_iter()
            .map(|part| SlotNodes::create(document, part))
            .collect();

        Self {
            shape,
            statics,
            slots,
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        self.shape
    }

    /// Apply the values of a same-shape template.
    ///
    /// Nodes that drop out of [`nodes`](Self::nodes) stay allocated; the host
    /// releases them once its children have been replaced.
    pub(crate) fn patch(&mut self, document: &Document, template: Template) -> Result<()> {
        debug_assert_eq!(self.shape, template.shape());
        let (_, parts, _) = template.into_parts();

        for (slot, part) in self.slots.iter_mut().zip(parts) {
            match (slot, part) {
                (SlotNodes::Text { node, value }, Part::Value(next)) => {
                    if *value != next {
                        trace!(?value, ?next, "patching text slot");
                        document.set_text(*node, &next.to_string())?;
                        *value = next;
                    }
                }
                (SlotNodes::Elements(current), Part::Elements(next)) => {
                    *current = next;
                }
                (slot, part) => {
                    trace!(?part, "slot changed kind");
                    *slot = SlotNodes::create(document, part);
                }
            }
        }

        Ok(())
    }

    /// All nodes in document order.
    pub(crate) fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        for (i, fixed) in self.statics.iter().enumerate() {
            if let Some(node) = fixed {
                nodes.push(*node);
            }
            match self.slots.get(i) {
                Some(SlotNodes::Text { node, .. }) => nodes.push(*node),
                Some(SlotNodes::Elements(elements)) => {
                    nodes.extend(elements.iter().map(Element::node));
                }
                None => {}
            }
        }
        nodes
    }
}
