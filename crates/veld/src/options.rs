//! Runtime options and instrumentation hooks.

use std::rc::Rc;

use crate::vnode::VNode;

/// Hook receiving the descriptor involved in a mount or unmount.
pub type VNodeHook = Rc<dyn Fn(&VNode)>;

/// Global knobs of a [`crate::Runtime`], fixed at construction.
#[derive(Clone, Default)]
pub struct Options {
    /// Retire unmounted element nodes into a pool and reuse them on
    /// later mounts of the same tag.
    pub recycling_enabled: bool,
    /// Track instance-to-node mappings so `find_dom_node` works.
    pub find_dom_node_enabled: bool,
    /// Runs after a component subtree is attached, before its
    /// `did_mount`.
    pub after_mount: Option<VNodeHook>,
    /// Runs before a component's `will_unmount`.
    pub before_unmount: Option<VNodeHook>,
    /// Runs immediately before each class component render.
    pub before_render: Option<Rc<dyn Fn()>>,
    /// Runs immediately after each class component render.
    pub after_render: Option<Rc<dyn Fn()>>,
}
