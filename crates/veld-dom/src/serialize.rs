//! HTML serialization of document subtrees.

use crate::node::NodeData;
use crate::{Document, NodeId};

// Per the HTML spec; the reconciler never gives these children.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

impl Document {
    /// Serialize the subtree rooted at `id`, including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id);
        out
    }

    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_children(&mut out, id);
        out
    }

    fn write_children(&self, out: &mut String, id: NodeId) {
        let mut cursor = self.first_child(id);
        while let Some(child) = cursor {
            self.write_node(out, child);
            cursor = self.next_sibling(child);
        }
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        match node.data() {
            NodeData::Document => self.write_children(out, id),
            NodeData::Text(t) => escape_text(out, &t.content),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attr(out, value);
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&el.tag.as_ref()) {
                    return;
                }
                if let Some(raw) = &el.raw_html {
                    out.push_str(raw);
                } else {
                    self.write_children(out, id);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}
