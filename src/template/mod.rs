//! Template and stylesheet results.
//!
//! Both are built the way tagged template literals are: a list of static
//! fragments interleaved with interpolated values.
//!
//! ```text
//! html(&["Hello ", "!"], [Part::from(name)])
//!        └──────┬─────┘    └──────┬───────┘
//!        static fragments    one value per hole
//! ```
//!
//! The runtime treats the result as opaque apart from three operations:
//! attach it to a host, compare [`Shape`]s, and patch a same-shape result's
//! values onto an attached one (see [`mount`]).

pub(crate) mod mount;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::warn;

use crate::component::Element;
use crate::types::Value;

// =============================================================================
// Shape
// =============================================================================

/// Structural identity of a result: a hash of its static fragments only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape(u64);

impl Shape {
    fn of(kind: &str, fragments: &[Rc<str>]) -> Self {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        fragments.len().hash(&mut hasher);
        for fragment in fragments {
            fragment.hash(&mut hasher);
        }
        Shape(hasher.finish())
    }
}

/// Pad or trim so that `fragments.len() == values.len() + 1`.
fn normalize<T: Default>(kind: &str, fragments: &[&str], mut values: Vec<T>) -> (Rc<[Rc<str>]>, Vec<T>) {
    let mut owned: Vec<Rc<str>> = fragments.iter().map(|f| Rc::from(*f)).collect();
    if owned.is_empty() {
        owned.push(Rc::from(""));
    }

    let holes = owned.len() - 1;
    if values.len() > holes {
        warn!(kind, holes, values = values.len(), "more values than holes; padding fragments");
        owned.resize(values.len() + 1, Rc::from(""));
    } else if values.len() < holes {
        warn!(kind, holes, values = values.len(), "fewer values than holes; padding values");
        values.resize_with(holes, T::default);
    }

    (owned.into(), values)
}

// =============================================================================
// Template
// =============================================================================

/// One interpolated value of a [`Template`].
#[derive(Clone)]
pub enum Part {
    /// Rendered as a single text node.
    Value(Value),
    /// Inserted as child elements, in order.
    Elements(Vec<Element>),
}

impl Part {
    /// Renders nothing visible (an empty text node).
    pub fn empty() -> Self {
        Part::Value(Value::Null)
    }
}

impl Default for Part {
    fn default() -> Self {
        Part::empty()
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Part::Elements(elements) => f
                .debug_tuple("Elements")
                .field(&elements.iter().map(Element::name).collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl From<Value> for Part {
    fn from(value: Value) -> Self {
        Part::Value(value)
    }
}

impl From<&str> for Part {
    fn from(value: &str) -> Self {
        Part::Value(value.into())
    }
}

impl From<String> for Part {
    fn from(value: String) -> Self {
        Part::Value(value.into())
    }
}

impl From<i64> for Part {
    fn from(value: i64) -> Self {
        Part::Value(value.into())
    }
}

impl From<bool> for Part {
    fn from(value: bool) -> Self {
        Part::Value(value.into())
    }
}

impl From<Element> for Part {
    fn from(element: Element) -> Self {
        Part::Elements(vec![element])
    }
}

impl From<Vec<Element>> for Part {
    fn from(elements: Vec<Element>) -> Self {
        Part::Elements(elements)
    }
}

/// Renderable result of a component's `template`.
#[derive(Clone)]
pub struct Template {
    fragments: Rc<[Rc<str>]>,
    parts: Vec<Part>,
    shape: Shape,
}

impl Template {
    pub fn new(fragments: &[&str], parts: impl IntoIterator<Item = Part>) -> Self {
        let (fragments, parts) = normalize("html", fragments, parts.into_iter().collect());
        let shape = Shape::of("html", &fragments);
        Self {
            fragments,
            parts,
            shape,
        }
    }

    /// Static text only.
    pub fn text(text: &str) -> Self {
        Self::new(&[text], [])
    }

    /// A single hole and nothing else.
    pub fn slot(part: impl Into<Part>) -> Self {
        Self::new(&["", ""], [part.into()])
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn fragments(&self) -> impl Iterator<Item = &str> + '_ {
        self.fragments.iter().map(|f| &**f)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub(crate) fn into_parts(self) -> (Rc<[Rc<str>]>, Vec<Part>, Shape) {
        (self.fragments, self.parts, self.shape)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("fragments", &self.fragments)
            .field("parts", &self.parts)
            .finish()
    }
}

/// Build a [`Template`] from tagged fragments and values.
pub fn html(fragments: &[&str], parts: impl IntoIterator<Item = Part>) -> Template {
    Template::new(fragments, parts)
}

// =============================================================================
// Stylesheet
// =============================================================================

/// Result of a component's `style`.
#[derive(Clone, Debug)]
pub struct Stylesheet {
    fragments: Rc<[Rc<str>]>,
    values: Vec<Value>,
    shape: Shape,
}

impl Stylesheet {
    pub fn new(fragments: &[&str], values: impl IntoIterator<Item = Value>) -> Self {
        let (fragments, values) = normalize("css", fragments, values.into_iter().collect());
        let shape = Shape::of("css", &fragments);
        Self {
            fragments,
            values,
            shape,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Fragments and values interleaved into stylesheet text.
    pub fn css_text(&self) -> String {
        let mut out = String::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            out.push_str(fragment);
            if let Some(value) = self.values.get(i) {
                out.push_str(&value.to_string());
            }
        }
        out
    }
}

/// Build a [`Stylesheet`] from tagged fragments and values.
pub fn css(fragments: &[&str], values: impl IntoIterator<Item = Value>) -> Stylesheet {
    Stylesheet::new(fragments, values)
}
