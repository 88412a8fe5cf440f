//! veld-dom - In-memory retained DOM
//!
//! Arena-backed document tree the reconciler mutates. Carries no
//! reconciliation logic of its own: nodes, structural operations, DOM
//! properties vs. attributes, event handler slots, an HTML serializer
//! and a mutation counter for instrumentation.

mod document;
mod node;
mod serialize;

pub use document::{Document, EventHandler};
pub use node::{ElementData, Node, NodeData, PropertyValue, TextData};

/// Node identifier (index into the document arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result type for DOM operations.
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node not found")]
    NotFound,
    #[error("node is not a child of the given parent")]
    NotAChild,
    #[error("operation requires an element node")]
    NotAnElement,
    #[error("operation requires a text node")]
    NotAText,
}
