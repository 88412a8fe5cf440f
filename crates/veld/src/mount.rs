//! First realization of descriptors into host nodes and fibers.
//!
//! Subtrees are built detached and attached to their parent last, so
//! a partially mounted tree is never observable. Element refs fire
//! synchronously during mount; component `did_mount` is deferred to
//! the lifecycle queue, which runs after the whole pass commits.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;
use veld_dom::NodeId;

use crate::component::{ComponentHandle, Instance, InstanceCore, Updater};
use crate::error::{Error, Result};
use crate::fiber::{Fiber, FiberChildren, FiberList, FiberPath, FiberPos, PathKey};
use crate::props::{is_controlled, patch_prop, process_form_element};
use crate::render::Pass;
use crate::vnode::{
    Children, ComponentType, Context, ElementKind, FnComponent, Ref, VChild, VNode, VNodeKind,
};

/// Mount `fiber.input` and return the host node it produced, if any.
/// `parent` of `None` mounts detached; the caller attaches.
pub(crate) fn mount(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<Option<NodeId>> {
    pass.path.push(fiber.pos.clone());
    let result = mount_inner(pass, fiber, parent, context, svg);
    pass.path.pop();
    result
}

/// Mount without touching the path stack; used when a fiber is
/// re-mounted in place (replace), where its position is already on
/// the stack.
pub(crate) fn mount_inner(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<Option<NodeId>> {
    let input = fiber.input.clone();
    match input.kind() {
        VNodeKind::Text(content) => mount_text(pass, fiber, content, parent).map(Some),
        VNodeKind::Element { tag, kind } => {
            mount_element(pass, fiber, &input, tag, *kind, parent, context, svg).map(Some)
        }
        VNodeKind::ComponentClass(ty) => {
            mount_class(pass, fiber, &input, ty.clone(), parent, context, svg)
        }
        VNodeKind::ComponentFn(f) => {
            mount_fn(pass, fiber, &input, f.clone(), parent, context, svg)
        }
        VNodeKind::Fragment => Err(Error::InvalidMount("fragment")),
        VNodeKind::Void => Err(Error::InvalidMount("void")),
    }
}

/// Filter a component's render output. `None` and the no-op sentinel
/// mount nothing; a fragment is a usage error.
pub(crate) fn handle_component_input(output: Option<VNode>) -> Result<Option<VNode>> {
    match output {
        None => Ok(None),
        Some(v) if v.is_no_op() => Ok(None),
        Some(v) => match v.kind() {
            VNodeKind::Fragment => Err(Error::ComponentReturnedList),
            _ => Ok(Some(v)),
        },
    }
}

fn mount_text(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    content: &str,
    parent: Option<NodeId>,
) -> Result<NodeId> {
    let dom = pass.doc.create_text(content);
    fiber.dom = Some(dom);
    if let Some(parent) = parent {
        pass.doc.append_child(parent, dom)?;
    }
    Ok(dom)
}

#[allow(clippy::too_many_arguments)]
fn mount_element(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    vnode: &VNode,
    tag: &str,
    kind: ElementKind,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<NodeId> {
    let svg = svg || kind == ElementKind::Svg;
    let dom = match pass
        .options
        .recycling_enabled
        .then(|| pass.pool.pop(tag, svg))
        .flatten()
    {
        Some(recycled) => {
            trace!(tag, "reusing pooled element");
            pass.doc.reset_element(recycled)?;
            recycled
        }
        None => pass.doc.create_element_ns(tag, svg),
    };
    fiber.dom = Some(dom);

    // foreignObject re-enters the html namespace.
    let child_svg = svg && tag != "foreignObject";
    match vnode.children() {
        Children::None => {}
        Children::Text(text) => pass.doc.set_text_content(dom, text)?,
        Children::One(child) => {
            let mut f = Fiber::new(child.clone(), FiberPos::Path(PathKey::first()));
            mount(pass, &mut f, Some(dom), context, child_svg)?;
            fiber.children = FiberChildren::One(Box::new(f));
        }
        Children::Many(items) => {
            mount_list_children(pass, fiber, vnode, items, dom, context, child_svg)?;
        }
    }

    if let Some(props) = vnode.props() {
        let controlled = kind.is_form() && is_controlled(kind, props);
        for (name, value) in props.iter() {
            patch_prop(pass.doc, dom, name, None, value, svg, controlled)?;
        }
        if kind.is_form() {
            process_form_element(pass.doc, dom, kind, props, true, controlled)?;
        }
    }
    if let Some(class) = vnode.class_name() {
        pass.doc.set_attribute(dom, "class", class)?;
    }
    match vnode.node_ref() {
        None => {}
        Some(Ref::Node(cb)) => cb(Some(dom)),
        Some(_) => return Err(Error::InvalidRef("element refs must be node callbacks")),
    }
    if let Some(parent) = parent {
        pass.doc.append_child(parent, dom)?;
    }
    Ok(dom)
}

/// Mount a child list, choosing the keyed or positional regime. The
/// regime sticks to the fiber list; the patcher rebuilds from scratch
/// when a later render flips it.
pub(crate) fn mount_list_children(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    vnode: &VNode,
    items: &[VChild],
    dom: NodeId,
    context: &Context,
    svg: bool,
) -> Result<()> {
    let first_key = items.iter().find_map(|item| match item {
        VChild::Node(node) => Some(node.key().is_some()),
        _ => None,
    });
    let keyed = vnode.keyed_children()
        || (!vnode.non_keyed_children() && first_key == Some(true));
    let mut list = FiberList::new(keyed);
    if keyed {
        for item in items {
            let VChild::Node(node) = item else { continue };
            let Some(key) = node.key().cloned() else {
                return Err(Error::MissingKey);
            };
            let mut f = Fiber::new(node.clone(), FiberPos::Keyed(key));
            mount(pass, &mut f, Some(dom), context, svg)?;
            list.fibers.push(f);
        }
        list.rebuild_keys();
    } else {
        mount_non_keyed(pass, &mut list, items, dom, context, svg)?;
    }
    fiber.children = FiberChildren::Many(list);
    Ok(())
}

/// Positional mount: depth-first over nested arrays with an explicit
/// stack. Slots are 1-based within each array; holes advance the slot
/// without producing a fiber.
fn mount_non_keyed(
    pass: &mut Pass<'_>,
    list: &mut FiberList,
    items: &[VChild],
    dom: NodeId,
    context: &Context,
    svg: bool,
) -> Result<()> {
    struct Frame<'a> {
        items: &'a [VChild],
        idx: usize,
    }
    let mut prefix = PathKey::prefix();
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut cur = Frame { items, idx: 0 };
    loop {
        while cur.idx < cur.items.len() {
            let slot = (cur.idx + 1) as u32;
            let item = &cur.items[cur.idx];
            cur.idx += 1;
            match item {
                VChild::Hole => {}
                VChild::Many(inner) => {
                    prefix.push(slot);
                    stack.push(std::mem::replace(&mut cur, Frame { items: inner, idx: 0 }));
                }
                VChild::Node(node) => {
                    let mut f = Fiber::new(node.clone(), FiberPos::Path(prefix.slot(slot)));
                    mount(pass, &mut f, Some(dom), context, svg)?;
                    list.fibers.push(f);
                }
            }
        }
        match stack.pop() {
            Some(outer) => {
                cur = outer;
                prefix.pop();
            }
            None => break,
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn mount_class(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    vnode: &VNode,
    ty: ComponentType,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<Option<NodeId>> {
    let props = vnode.props_or_empty();
    let mut behavior = (ty.create)(&props, context);
    let state = behavior.initial_state(&props);
    let inst: Instance = Rc::new(RefCell::new(InstanceCore {
        behavior: None,
        props,
        state,
        context: context.clone(),
        child_context: context.clone(),
        pending_state: None,
        // Writes during will_mount accumulate for the first render.
        pending_set_state: true,
        block_render: false,
        block_set_state: false,
        unmounted: false,
        updating: true,
        flush_pending: false,
        flush_callbacks: Vec::new(),
        path: FiberPath { root: pass.root, segs: pass.path.clone() },
        parent_dom: parent,
        svg,
    }));
    fiber.component = Some(inst.clone());
    let weak = Rc::downgrade(&inst);

    let output;
    let child_context;
    {
        let mut core = inst.borrow_mut();
        let hook = {
            let mut cx = Updater::new(&mut core, pass.scheduler, weak.clone());
            behavior.component_will_mount(&mut cx)
        };
        if let Err(e) = hook {
            core.behavior = Some(behavior);
            return Err(e);
        }
        if let Some(pending) = core.pending_state.take() {
            core.state.merge(&pending);
        }
        core.pending_set_state = false;
        if let Some(hook) = &pass.options.before_render {
            hook();
        }
        let rendered = behavior.render(&core.props, &core.state, &core.context);
        if let Some(hook) = &pass.options.after_render {
            hook();
        }
        let rendered = match rendered {
            Ok(r) => r,
            Err(e) => {
                core.behavior = Some(behavior);
                return Err(e);
            }
        };
        child_context =
            match behavior.get_child_context(&core.props, &core.state, &core.context) {
                Some(extra) => {
                    let mut merged = (*core.context).clone();
                    merged.merge(&extra);
                    Rc::new(merged)
                }
                None => core.context.clone(),
            };
        core.child_context = child_context.clone();
        core.behavior = Some(behavior);
        output = rendered;
    }

    let next_input = handle_component_input(output)?;
    let mut dom = None;
    if let Some(input) = next_input {
        let mut child = Fiber::new(input, FiberPos::Path(PathKey::first()));
        dom = mount(pass, &mut child, None, &child_context, svg)?;
        fiber.children = FiberChildren::One(Box::new(child));
    }
    fiber.dom = dom;
    if let (Some(parent), Some(dom)) = (parent, dom) {
        pass.doc.append_child(parent, dom)?;
    }

    if let Some(Ref::Instance(cb)) = vnode.node_ref() {
        cb(Some(ComponentHandle {
            core: weak.clone(),
            runtime: pass.runtime.clone(),
            scheduler: pass.scheduler.clone(),
        }));
    }
    if pass.options.find_dom_node_enabled {
        if let Some(dom) = dom {
            pass.dom_map.insert(Rc::as_ptr(&inst) as usize, dom);
        }
    }

    let after_mount = pass.options.after_mount.clone();
    let mounted = vnode.clone();
    pass.lifecycle.add(Box::new(move |scheduler| {
        let Some(inst) = weak.upgrade() else { return };
        let mut core = inst.borrow_mut();
        if core.unmounted {
            return;
        }
        core.updating = true;
        if let Some(hook) = &after_mount {
            hook(&mounted);
        }
        if let Some(mut behavior) = core.behavior.take() {
            {
                let mut cx = Updater::new(&mut core, scheduler, Rc::downgrade(&inst));
                behavior.component_did_mount(dom, &mut cx);
            }
            core.behavior = Some(behavior);
        }
        core.updating = false;
    }));
    inst.borrow_mut().updating = false;
    Ok(dom)
}

#[allow(clippy::too_many_arguments)]
fn mount_fn(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    vnode: &VNode,
    f: FnComponent,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<Option<NodeId>> {
    let props = vnode.props_or_empty();
    let output = (f.render)(&props, context)?;
    let next_input = handle_component_input(output)?;
    let mut dom = None;
    if let Some(input) = next_input {
        let mut child = Fiber::new(input, FiberPos::Path(PathKey::first()));
        dom = mount(pass, &mut child, None, context, svg)?;
        fiber.children = FiberChildren::One(Box::new(child));
    }
    fiber.dom = dom;
    if let Some(Ref::Hooks(hooks)) = vnode.node_ref() {
        if let Some(hook) = &hooks.on_will_mount {
            hook();
        }
        if hooks.on_did_mount.is_some() {
            let hooks = hooks.clone();
            pass.lifecycle.add(Box::new(move |_| {
                if let Some(hook) = &hooks.on_did_mount {
                    hook(dom);
                }
            }));
        }
    }
    if let (Some(parent), Some(dom)) = (parent, dom) {
        pass.doc.append_child(parent, dom)?;
    }
    Ok(dom)
}
