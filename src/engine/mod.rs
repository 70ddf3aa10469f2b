//! Engine - Document tree and element registry.
//!
//! - Document: arena of nodes with parent links and a free-slot pool
//! - Registry: name to component class bindings
//!
//! Component instances live on element nodes. The document owns them; the
//! instances only keep weak handles back to it.

mod document;
mod registry;

pub use document::{Document, NodeId, NodeType, WeakDocument};
pub use registry::{
    default_registry, register, reset_registry, validate_name, ComponentClass, Registry,
};
