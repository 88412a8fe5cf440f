//! Document - arena-based DOM tree and its operations.
//!
//! Every mutating operation bumps a per-document mutation counter so
//! callers can assert "zero additional DOM writes" in tests.

use std::rc::Rc;

use tracing::trace;

use crate::node::{ElementData, Node, NodeData, PropertyValue, TextData};
use crate::{DomError, DomResult, NodeId};

/// Event handler slot stored on an element.
pub type EventHandler = Rc<dyn Fn()>;

/// A document: node arena plus cached structural roots.
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    mutations: u64,
}

impl Document {
    /// Create a new document with the usual html/head/body skeleton.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
            html: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            mutations: 0,
        };
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root, html).expect("fresh arena");
        doc.append_child(html, head).expect("fresh arena");
        doc.append_child(html, body).expect("fresh arena");
        doc.html = html;
        doc.head = head;
        doc.body = body;
        doc.mutations = 0;
        doc
    }

    /// Document root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element.
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// The `<head>` element.
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// Total mutating operations performed so far.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Number of nodes ever allocated in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds only the document node.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // --- node access -----------------------------------------------------

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.nodes.get(id.index()).ok_or(DomError::NotFound)
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DomError::NotFound)
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        self.node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement)
    }

    /// Element data for `id`, if it is an element.
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Tag name for `id`, if it is an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_ref())
    }

    /// Text content for `id`, if it is a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::as_text)
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// First child of `id`.
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child)
    }

    /// Next sibling of `id`.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Child ids of `id`, in document order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.first_child(id);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.next_sibling(child);
        }
        out
    }

    /// Number of children of `id`.
    pub fn child_count(&self, id: NodeId) -> usize {
        let mut n = 0;
        let mut cursor = self.first_child(id);
        while let Some(child) = cursor {
            n += 1;
            cursor = self.next_sibling(child);
        }
        n
    }

    // --- creation --------------------------------------------------------

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Create a detached HTML element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_ns(tag, false)
    }

    /// Create a detached element, optionally in the SVG namespace.
    pub fn create_element_ns(&mut self, tag: &str, svg: bool) -> NodeId {
        self.mutations += 1;
        self.alloc(NodeData::Element(ElementData::new(tag.into(), svg)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.mutations += 1;
        self.alloc(NodeData::Text(TextData {
            content: content.to_string(),
        }))
    }

    // --- structural operations -------------------------------------------

    fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let (parent, prev, next) = {
            let node = self.node(id)?;
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if let Some(prev) = prev {
            self.node_mut(prev)?.next_sibling = next;
        } else if let Some(parent) = parent {
            self.node_mut(parent)?.first_child = next;
        }
        if let Some(next) = next {
            self.node_mut(next)?.prev_sibling = prev;
        } else if let Some(parent) = parent {
            self.node_mut(parent)?.last_child = prev;
        }
        let node = self.node_mut(id)?;
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        Ok(())
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.node(parent)?;
        self.detach(child)?;
        let last = self.node(parent)?.last_child;
        if let Some(last) = last {
            self.node_mut(last)?.next_sibling = Some(child);
        } else {
            self.node_mut(parent)?.first_child = Some(child);
        }
        {
            let node = self.node_mut(child)?;
            node.parent = Some(parent);
            node.prev_sibling = last;
        }
        self.node_mut(parent)?.last_child = Some(child);
        self.mutations += 1;
        trace!(parent = parent.0, child = child.0, "append_child");
        Ok(())
    }

    /// Insert `new_child` before `reference`, or append when `reference`
    /// is `None`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let Some(reference) = reference else {
            return self.append_child(parent, new_child);
        };
        if self.node(reference)?.parent != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.detach(new_child)?;
        let prev = self.node(reference)?.prev_sibling;
        if let Some(prev) = prev {
            self.node_mut(prev)?.next_sibling = Some(new_child);
        } else {
            self.node_mut(parent)?.first_child = Some(new_child);
        }
        {
            let node = self.node_mut(new_child)?;
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = Some(reference);
        }
        self.node_mut(reference)?.prev_sibling = Some(new_child);
        self.mutations += 1;
        trace!(parent = parent.0, child = new_child.0, "insert_before");
        Ok(())
    }

    /// Remove `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.detach(child)?;
        self.mutations += 1;
        trace!(parent = parent.0, child = child.0, "remove_child");
        Ok(())
    }

    /// Replace `old_child` with `new_child` in a single operation.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<()> {
        if self.node(old_child)?.parent != Some(parent) {
            return Err(DomError::NotAChild);
        }
        let next = self.node(old_child)?.next_sibling;
        // Detach counts nothing and the insert counts once, so the
        // whole replace registers as one native operation.
        self.detach(old_child)?;
        if let Some(next) = next {
            self.insert_before(parent, new_child, Some(next))
        } else {
            self.append_child(parent, new_child)
        }
    }

    /// Detach every child of `parent` in one operation. No-op (and no
    /// mutation) when `parent` has no children.
    pub fn remove_all_children(&mut self, parent: NodeId) -> DomResult<()> {
        let children = self.children(parent);
        if children.is_empty() {
            return Ok(());
        }
        for child in children {
            self.detach(child)?;
        }
        self.mutations += 1;
        Ok(())
    }

    /// Strip an element back to a freshly created state: attributes,
    /// properties, raw markup, handlers and children. Used when a pooled
    /// node is brought back into service.
    pub fn reset_element(&mut self, id: NodeId) -> DomResult<()> {
        self.remove_all_children(id)?;
        let el = self.element_mut(id)?;
        el.attrs.clear();
        el.props.clear();
        el.raw_html = None;
        el.handlers.clear();
        self.mutations += 1;
        Ok(())
    }

    // --- text ------------------------------------------------------------

    /// Overwrite the value of a text node.
    pub fn set_text(&mut self, id: NodeId, content: &str) -> DomResult<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(t) => {
                t.content.clear();
                t.content.push_str(content);
                self.mutations += 1;
                Ok(())
            }
            _ => Err(DomError::NotAText),
        }
    }

    /// Replace all children of `parent` with a single text node.
    pub fn set_text_content(&mut self, parent: NodeId, content: &str) -> DomResult<()> {
        self.remove_all_children(parent)?;
        let text = self.create_text(content);
        self.append_child(parent, text)
    }

    /// Update the value of `parent`'s first child, which must be text.
    pub fn update_text_content(&mut self, parent: NodeId, content: &str) -> DomResult<()> {
        let first = self.first_child(parent).ok_or(DomError::NotFound)?;
        self.set_text(first, content)
    }

    // --- attributes and properties ---------------------------------------

    /// Set an attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.element_mut(id)?.attrs.insert(name.into(), value.into());
        self.mutations += 1;
        Ok(())
    }

    /// Remove an attribute. No-op (and no mutation) when absent.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        if self.element_mut(id)?.attrs.shift_remove(name).is_some() {
            self.mutations += 1;
        }
        Ok(())
    }

    /// Assign a DOM property directly.
    pub fn set_property(&mut self, id: NodeId, name: &str, value: PropertyValue) -> DomResult<()> {
        self.element_mut(id)?.props.insert(name.into(), value);
        self.mutations += 1;
        Ok(())
    }

    /// Read a DOM property.
    pub fn property(&self, id: NodeId, name: &str) -> Option<&PropertyValue> {
        self.element(id).and_then(|e| e.prop(name))
    }

    /// Assign the raw markup payload; the serializer emits it verbatim in
    /// place of children.
    pub fn set_raw_html(&mut self, id: NodeId, html: &str) -> DomResult<()> {
        self.element_mut(id)?.raw_html = Some(html.into());
        self.mutations += 1;
        Ok(())
    }

    // --- events ----------------------------------------------------------

    /// Install an event handler slot.
    pub fn set_event_handler(
        &mut self,
        id: NodeId,
        name: &str,
        handler: EventHandler,
    ) -> DomResult<()> {
        self.element_mut(id)?.handlers.insert(name.into(), handler);
        self.mutations += 1;
        Ok(())
    }

    /// Remove an event handler slot.
    pub fn remove_event_handler(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        if self.element_mut(id)?.handlers.shift_remove(name).is_some() {
            self.mutations += 1;
        }
        Ok(())
    }

    /// Look up an installed handler. Returns a clone so the caller can
    /// invoke it without holding a document borrow.
    pub fn event_handler(&self, id: NodeId, name: &str) -> Option<EventHandler> {
        self.element(id).and_then(|e| e.handlers.get(name).cloned())
    }

    /// Names of installed handlers on `id`.
    pub fn event_handler_names(&self, id: NodeId) -> Vec<Box<str>> {
        self.element(id)
            .map(|e| e.handlers.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("mutations", &self.mutations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_children() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        doc.append_child(doc.body(), container).unwrap();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        doc.append_child(container, a).unwrap();
        doc.append_child(container, b).unwrap();

        assert_eq!(doc.children(container), vec![a, b]);
        assert_eq!(doc.parent(a), Some(container));
    }

    #[test]
    fn test_insert_before() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let a = doc.create_element("a");
        let c = doc.create_element("c");
        doc.append_child(container, a).unwrap();
        doc.append_child(container, c).unwrap();

        let b = doc.create_element("b");
        doc.insert_before(container, b, Some(c)).unwrap();
        assert_eq!(doc.children(container), vec![a, b, c]);
    }

    #[test]
    fn test_replace_child_is_single_mutation() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let old = doc.create_element("span");
        doc.append_child(container, old).unwrap();
        let new = doc.create_element("p");

        let before = doc.mutations();
        doc.replace_child(container, new, old).unwrap();
        assert_eq!(doc.mutations() - before, 1);
        assert_eq!(doc.children(container), vec![new]);
        assert_eq!(doc.parent(old), None);
    }

    #[test]
    fn test_remove_all_children() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        for _ in 0..3 {
            let t = doc.create_text("x");
            doc.append_child(container, t).unwrap();
        }
        doc.remove_all_children(container).unwrap();
        assert_eq!(doc.child_count(container), 0);
    }

    #[test]
    fn test_remove_absent_attribute_is_not_a_mutation() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        let before = doc.mutations();
        doc.remove_attribute(el, "id").unwrap();
        assert_eq!(doc.mutations(), before);
    }

    #[test]
    fn test_text_content_roundtrip() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.set_text_content(el, "hello").unwrap();
        assert_eq!(doc.child_count(el), 1);
        doc.update_text_content(el, "world").unwrap();
        let first = doc.first_child(el).unwrap();
        assert_eq!(doc.text(first), Some("world"));
    }
}
