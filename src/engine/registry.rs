//! Element Registry - Name to component class bindings.
//!
//! - [`Registry`] maps a declared name to a [`ComponentClass`]
//! - names are unique; a duplicate is rejected and the registry is unchanged
//! - a class lists its declaration's props as observed attributes
//!
//! Each thread has a default registry (used by [`Document::new`]) with
//! [`reset_registry`] for tests. Registries can also be created and injected
//! into a [`Document`] directly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::document::Document;
use crate::component::{lifecycle, Declaration, DeclarationKind, Element, Injected};
use crate::error::{Error, Result};

// =============================================================================
// Component Class
// =============================================================================

/// Instantiable class produced by registration.
#[derive(Clone)]
pub struct ComponentClass(Rc<Declaration>);

impl ComponentClass {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Attribute names forwarded into props.
    pub fn observed_attributes(&self) -> &[String] {
        self.0.prop_names()
    }

    pub fn observes(&self, attribute: &str) -> bool {
        self.0.prop_names().iter().any(|prop| prop == attribute)
    }

    pub fn declaration(&self) -> &Declaration {
        &self.0
    }

    pub fn is_router_view(&self) -> bool {
        self.0.kind() == DeclarationKind::RouterView
    }

    /// Construct a new, unconnected instance in `document`.
    pub fn create(&self, document: &Document) -> Result<Element> {
        self.create_with(document, Injected::default())
    }

    /// Construct with collaborators injected into the context.
    pub fn create_with(&self, document: &Document, injected: Injected) -> Result<Element> {
        lifecycle::construct(self, document, injected)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentClass").field(&self.name()).finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Name table. Cloning yields another handle to the same table.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Rc<RefCell<HashMap<String, ComponentClass>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `declaration.name` to a new class.
    pub fn register(&self, declaration: Declaration) -> Result<ComponentClass> {
        validate_name(declaration.name())?;

        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(declaration.name()) {
            return Err(Error::DuplicateName {
                name: declaration.name().to_owned(),
            });
        }

        let class = ComponentClass(Rc::new(declaration));
        debug!(
            name = class.name(),
            observed = ?class.observed_attributes(),
            "registered element"
        );
        entries.insert(class.name().to_owned(), class.clone());
        Ok(class)
    }

    pub fn get(&self, name: &str) -> Option<ComponentClass> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

/// Custom element naming rules.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidName {
            name: name.to_owned(),
            reason,
        })
    };

    let Some(first) = name.chars().next() else {
        return invalid("name is empty");
    };
    if !first.is_ascii_lowercase() {
        return invalid("must start with a lowercase ASCII letter");
    }
    if !name.contains('-') {
        return invalid("must contain a hyphen");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
    {
        return invalid("only lowercase letters, digits, '-', '.' and '_' are allowed");
    }
    Ok(())
}

// =============================================================================
// Default Registry
// =============================================================================

thread_local! {
    static DEFAULT_REGISTRY: Registry = Registry::new();
}

/// Handle to this thread's default registry.
pub fn default_registry() -> Registry {
    DEFAULT_REGISTRY.with(Registry::clone)
}

/// Register into the default registry.
pub fn register(declaration: Declaration) -> Result<ComponentClass> {
    DEFAULT_REGISTRY.with(|registry| registry.register(declaration))
}

/// Clear the default registry (for testing).
pub fn reset_registry() {
    DEFAULT_REGISTRY.with(Registry::clear);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        let class = registry
            .register(Declaration::new("x-foo").props(["foo", "bar"]))
            .unwrap();

        assert_eq!(class.name(), "x-foo");
        assert_eq!(class.observed_attributes(), ["foo", "bar"]);
        assert!(class.observes("bar"));
        assert!(!class.observes("baz"));
        assert!(registry.get("x-foo").is_some_and(|c| c.ptr_eq(&class)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_leaves_registry_unchanged() {
        let registry = Registry::new();
        let first = registry.register(Declaration::new("x-dup")).unwrap();

        let err = registry.register(Declaration::new("x-dup").props(["p"])).unwrap_err();
        assert!(matches!(err, Error::DuplicateName { ref name } if name == "x-dup"));

        let kept = registry.get("x-dup").unwrap();
        assert!(kept.ptr_eq(&first));
        assert!(kept.observed_attributes().is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("my-element").is_ok());
        assert!(validate_name("x-1.2_b").is_ok());

        for bad in ["", "foo", "Foo-bar", "1-foo", "-foo", "foo-Bar", "foo bar-x"] {
            assert!(
                matches!(validate_name(bad), Err(Error::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_default_registry_reset() {
        reset_registry();
        register(Declaration::new("x-default")).unwrap();
        assert!(default_registry().contains("x-default"));
        assert!(register(Declaration::new("x-default")).is_err());

        reset_registry();
        assert!(default_registry().is_empty());
        assert!(register(Declaration::new("x-default")).is_ok());
        reset_registry();
    }

    #[test]
    fn test_registries_are_independent() {
        let a = Registry::new();
        let b = Registry::new();
        a.register(Declaration::new("x-same")).unwrap();
        assert!(b.register(Declaration::new("x-same")).is_ok());
    }
}
