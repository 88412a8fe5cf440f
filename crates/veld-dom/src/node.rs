//! DOM node representation.
//!
//! Nodes live in the document arena and link to relatives by `NodeId`.
//! Elements keep attributes and DOM properties in separate maps: the
//! serializer reads attributes only, mirroring how real engines treat
//! property writes (`value`, `checked`, ...) as invisible to markup.

use indexmap::IndexMap;

use crate::NodeId;
use crate::document::EventHandler;

/// A single node in the document arena.
#[derive(Debug)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            data,
        }
    }

    /// Node-specific data.
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Check if this is an element.
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is a text node.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Element data, if this is an element.
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Text content, if this is a text node.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(&t.content),
            _ => None,
        }
    }
}

/// Node-specific data.
#[derive(Debug)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element node.
    Element(ElementData),
    /// Text node.
    Text(TextData),
}

/// Element-specific data.
pub struct ElementData {
    /// Tag name.
    pub tag: Box<str>,
    /// Whether the element lives in the SVG namespace.
    pub svg: bool,
    /// Serialized attributes, in insertion order.
    pub attrs: IndexMap<Box<str>, Box<str>>,
    /// DOM properties (direct assignments, not serialized).
    pub props: IndexMap<Box<str>, PropertyValue>,
    /// Raw markup payload set through `dangerously_set_inner_html`.
    pub raw_html: Option<Box<str>>,
    /// Event handler slots, keyed by lower-case event name.
    pub(crate) handlers: IndexMap<Box<str>, EventHandler>,
}

impl ElementData {
    pub(crate) fn new(tag: Box<str>, svg: bool) -> Self {
        Self {
            tag,
            svg,
            attrs: IndexMap::new(),
            props: IndexMap::new(),
            raw_html: None,
            handlers: IndexMap::new(),
        }
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|v| v.as_ref())
    }

    /// Get a DOM property value.
    pub fn prop(&self, name: &str) -> Option<&PropertyValue> {
        self.props.get(name)
    }
}

impl std::fmt::Debug for ElementData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementData")
            .field("tag", &self.tag)
            .field("svg", &self.svg)
            .field("attrs", &self.attrs)
            .field("props", &self.props)
            .field("raw_html", &self.raw_html)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Text node data.
#[derive(Debug)]
pub struct TextData {
    pub content: String,
}

/// A DOM property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Str(Box<str>),
    Num(f64),
}

impl PropertyValue {
    /// String form, if this property holds a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }
}
