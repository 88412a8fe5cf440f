//! veld - virtual DOM reconciler
//!
//! Immutable descriptors ([`VNode`]) describe desired output; a fiber
//! tree keeps the per-position state that maps descriptors onto host
//! nodes in a [`veld_dom::Document`]. [`Runtime::render`] mounts,
//! patches or unmounts a container; components carry lifecycle state
//! and batch their updates through a flush queue.
//!
//! ```
//! use veld::{Runtime, VNode};
//!
//! let rt = Runtime::new();
//! let container = rt.create_container("div").unwrap();
//! let view = VNode::element("span").child("hi").build().unwrap();
//! rt.render(Some(view), container).unwrap();
//! assert_eq!(rt.container_html(container), "<span>hi</span>");
//! ```

mod component;
mod error;
mod fiber;
mod mount;
mod normalize;
mod options;
mod patch;
mod pool;
mod props;
mod render;
mod scheduler;
mod unmount;
mod vnode;

pub use component::{Component, ComponentHandle, Updater};
pub use error::{Error, Result};
pub use options::{Options, VNodeHook};
pub use render::Runtime;
pub use vnode::{
    Child, Children, ComponentType, Context, ElementKind, EventHandler, FnComponent, FnHooks,
    Key, Props, Ref, State, StyleValue, VChild, VNode, VNodeBuilder, VNodeKind, Value,
    component_type,
};

pub use veld_dom::{Document, NodeId};
