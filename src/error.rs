//! Error taxonomy.
//!
//! Every error is local to one registration call or one component instance;
//! none of them leave the registry or unrelated instances in a changed state.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A declaration reused a name that is already registered.
    #[error("element name `{name}` is already registered")]
    DuplicateName { name: String },

    /// A declaration name is not a valid custom element name.
    #[error("invalid element name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// A re-render produced a template with a different structure.
    #[error("template of <{element}> changed shape between renders")]
    TemplateShape { element: String },

    /// A re-render produced a stylesheet with a different structure.
    #[error("style of <{element}> changed shape between renders")]
    StyleShape { element: String },

    /// Watchers kept invalidating each other past the configured bound.
    #[error("watcher cascade in <{element}> exceeded {limit} iterations")]
    WatcherCascade { element: String, limit: usize },

    /// A node id whose slot was released or reused since it was handed out.
    ///
    /// Ids are not tied to a document; an id from another document is only
    /// caught if no live node sits at the same index and generation.
    #[error("unknown node")]
    UnknownNode,

    /// A tree mutation that would break the document structure.
    #[error("hierarchy request error: {reason}")]
    Hierarchy { reason: &'static str },
}

impl Error {
    /// True for the two render-time contract violations.
    #[must_use]
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Self::TemplateShape { .. } | Self::StyleShape { .. })
    }

    pub(crate) fn hierarchy(reason: &'static str) -> Self {
        Self::Hierarchy { reason }
    }
}
