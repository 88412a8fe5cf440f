//! Element recycling pool.
//!
//! Retired element nodes are kept per tag and handed back to the
//! mounter, which strips them before reuse. Only host nodes are
//! pooled; fibers and descriptors are never recycled.

use ahash::AHashMap;
use veld_dom::NodeId;

#[derive(Default)]
pub(crate) struct RecyclePool {
    elements: AHashMap<(Box<str>, bool), Vec<NodeId>>,
}

impl RecyclePool {
    pub fn pop(&mut self, tag: &str, svg: bool) -> Option<NodeId> {
        self.elements.get_mut(&(tag.into(), svg))?.pop()
    }

    pub fn push(&mut self, tag: &str, svg: bool, node: NodeId) {
        self.elements.entry((tag.into(), svg)).or_default().push(node);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.elements.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_dom::Document;

    #[test]
    fn test_pop_matches_tag_and_namespace() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let svg = doc.create_element_ns("svg", true);
        let mut pool = RecyclePool::default();
        pool.push("div", false, div);
        pool.push("svg", true, svg);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.pop("div", true), None);
        assert_eq!(pool.pop("div", false), Some(div));
        assert_eq!(pool.pop("svg", true), Some(svg));
        assert_eq!(pool.len(), 0);
    }
}
