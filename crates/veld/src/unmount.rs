//! Teardown of fibers and their host nodes.
//!
//! Recursion detaches children logically only; the single host
//! removal happens at the subtree root. Component `will_unmount` runs
//! before the DOM goes away, and refs are cleared with `None`.

use tracing::trace;
use veld_dom::NodeId;

use crate::error::Result;
use crate::fiber::{Fiber, FiberChildren};
use crate::render::Pass;
use crate::vnode::{Ref, VNode, VNodeKind};

/// Unmount a fiber. `parent` of `None` detaches logically, leaving
/// host removal to an ancestor. `can_recycle` lets a detached element
/// still enter the pool (its subtree root was removed wholesale).
pub(crate) fn unmount(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    parent: Option<NodeId>,
    can_recycle: bool,
) -> Result<()> {
    let input = fiber.input.clone();
    match input.kind() {
        VNodeKind::Text(_) => {
            if let (Some(parent), Some(dom)) = (parent, fiber.dom) {
                pass.doc.remove_child(parent, dom)?;
            }
        }
        VNodeKind::Element { tag, kind: _ } => {
            unmount_element(pass, fiber, &input, tag, parent, can_recycle)?;
        }
        VNodeKind::ComponentClass(_) => unmount_class(pass, fiber, &input, parent)?,
        VNodeKind::ComponentFn(_) => unmount_fn(pass, fiber, &input, parent)?,
        VNodeKind::Fragment | VNodeKind::Void => {}
    }
    Ok(())
}

fn unmount_children(pass: &mut Pass<'_>, children: &mut FiberChildren) -> Result<()> {
    match children {
        FiberChildren::None => {}
        FiberChildren::One(child) => unmount(pass, child, None, false)?,
        FiberChildren::Many(list) => {
            for child in &mut list.fibers {
                unmount(pass, child, None, false)?;
            }
        }
    }
    *children = FiberChildren::None;
    Ok(())
}

fn unmount_element(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    input: &VNode,
    tag: &str,
    parent: Option<NodeId>,
    can_recycle: bool,
) -> Result<()> {
    if let Some(Ref::Node(cb)) = input.node_ref() {
        cb(None);
    }
    unmount_children(pass, &mut fiber.children)?;
    let Some(dom) = fiber.dom else { return Ok(()) };
    for event in pass.doc.event_handler_names(dom) {
        pass.doc.remove_event_handler(dom, &event)?;
    }
    if let Some(parent) = parent {
        pass.doc.remove_child(parent, dom)?;
    }
    if pass.options.recycling_enabled && (parent.is_some() || can_recycle) {
        let svg = pass.doc.element(dom).is_some_and(|el| el.svg);
        pass.pool.push(tag, svg, dom);
        trace!(tag, "element retired to pool");
    }
    Ok(())
}

fn unmount_class(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    input: &VNode,
    parent: Option<NodeId>,
) -> Result<()> {
    if let Some(inst) = fiber.component.take() {
        let already = inst.borrow().unmounted;
        if !already {
            if let Some(hook) = &pass.options.before_unmount {
                hook(input);
            }
            let behavior = inst.borrow_mut().behavior.take();
            if let Some(mut behavior) = behavior {
                behavior.component_will_unmount();
                inst.borrow_mut().behavior = Some(behavior);
            }
            if let Some(Ref::Instance(cb)) = input.node_ref() {
                cb(None);
            }
            let mut core = inst.borrow_mut();
            core.unmounted = true;
            drop(core);
            pass.dom_map.remove(&(std::rc::Rc::as_ptr(&inst) as usize));
        }
    }
    unmount_children(pass, &mut fiber.children)?;
    if let (Some(parent), Some(dom)) = (parent, fiber.dom) {
        pass.doc.remove_child(parent, dom)?;
    }
    Ok(())
}

fn unmount_fn(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    input: &VNode,
    parent: Option<NodeId>,
) -> Result<()> {
    if let Some(Ref::Hooks(hooks)) = input.node_ref() {
        if let Some(hook) = &hooks.on_will_unmount {
            hook(fiber.dom);
        }
    }
    unmount_children(pass, &mut fiber.children)?;
    if let (Some(parent), Some(dom)) = (parent, fiber.dom) {
        pass.doc.remove_child(parent, dom)?;
    }
    Ok(())
}

/// Fast path for clearing every child of an element: children are
/// detached logically and the host wipes the list in one operation.
pub(crate) fn remove_all_children(
    pass: &mut Pass<'_>,
    children: &mut FiberChildren,
    dom: NodeId,
) -> Result<()> {
    match children {
        FiberChildren::None => {}
        FiberChildren::One(child) => unmount(pass, child, None, true)?,
        FiberChildren::Many(list) => {
            for child in &mut list.fibers {
                unmount(pass, child, None, true)?;
            }
        }
    }
    *children = FiberChildren::None;
    pass.doc.remove_all_children(dom)?;
    Ok(())
}
