//! Fiber tree: per-position mutable bookkeeping.
//!
//! Each fiber pairs the descriptor last rendered at a position with
//! the host node it produced. Fibers own their children outright; the
//! tree is a plain `Box`/`Vec` structure with no arena or back
//! pointers, so dropping a fiber drops its whole subtree.

use smallvec::SmallVec;
use veld_dom::NodeId;

use crate::component::Instance;
use crate::vnode::{Key, VNode};

/// Positional identity inside a non-keyed list: a dotted path, stored
/// as numeric segments and compared segment-by-segment. `1.0.2` sorts
/// after `1.0` and before `1.1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct PathKey(SmallVec<[u32; 8]>);

impl PathKey {
    /// Position of a root or only child.
    pub fn first() -> Self {
        PathKey(SmallVec::from_slice(&[0]))
    }

    pub fn prefix() -> Self {
        PathKey(SmallVec::new())
    }

    pub fn push(&mut self, seg: u32) {
        self.0.push(seg);
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// The path of a child slot under this prefix. Slots are 1-based,
    /// matching the child's position in its (possibly nested) array.
    pub fn slot(&self, idx: u32) -> Self {
        let mut p = self.0.clone();
        p.push(idx);
        PathKey(p)
    }
}

/// How a fiber is identified within its parent's child list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FiberPos {
    Path(PathKey),
    Keyed(Key),
}

impl FiberPos {
    pub fn path(&self) -> Option<&PathKey> {
        match self {
            FiberPos::Path(p) => Some(p),
            FiberPos::Keyed(_) => None,
        }
    }
}

/// Child list of a fiber.
pub(crate) struct FiberList {
    pub fibers: Vec<Fiber>,
    pub keyed: bool,
    /// Key to index map, rebuilt after each keyed diff.
    pub keys: Option<ahash::AHashMap<Key, usize>>,
}

impl FiberList {
    pub fn new(keyed: bool) -> Self {
        Self { fibers: Vec::new(), keyed, keys: None }
    }

    pub fn rebuild_keys(&mut self) {
        if !self.keyed {
            return;
        }
        let mut map = ahash::AHashMap::with_capacity(self.fibers.len());
        for (i, fiber) in self.fibers.iter().enumerate() {
            if let FiberPos::Keyed(key) = &fiber.pos {
                map.insert(key.clone(), i);
            }
        }
        self.keys = Some(map);
    }
}

pub(crate) enum FiberChildren {
    None,
    One(Box<Fiber>),
    Many(FiberList),
}

/// Mutable state of one tree position.
pub(crate) struct Fiber {
    /// Descriptor currently realized at this position.
    pub input: VNode,
    /// Host node this position produced, if any.
    pub dom: Option<NodeId>,
    pub children: FiberChildren,
    /// Class component instance, when `input` is a class component.
    pub component: Option<Instance>,
    pub pos: FiberPos,
}

impl Fiber {
    pub fn new(input: VNode, pos: FiberPos) -> Self {
        Self {
            input,
            dom: None,
            children: FiberChildren::None,
            component: None,
            pos,
        }
    }
}

/// Location of a component fiber: its root container plus the chain
/// of fiber positions from the root fiber down. Positions survive
/// list splices and keyed moves, so a queued update can find its
/// fiber after the tree has shifted around it.
#[derive(Debug, Clone)]
pub(crate) struct FiberPath {
    pub root: NodeId,
    pub segs: Vec<FiberPos>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_key_ordering() {
        let p = PathKey::prefix();
        let a = p.slot(1);
        let b = p.slot(2);
        let nested = a.slot(3);
        assert!(a < b);
        assert!(a < nested);
        assert!(nested < b);
    }

    #[test]
    fn test_slot_is_nonmutating() {
        let p = PathKey::prefix().slot(1);
        let _ = p.slot(2);
        assert_eq!(p, PathKey::prefix().slot(1));
    }
}
