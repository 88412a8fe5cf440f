//! Reconciliation of mounted fibers against new descriptors.
//!
//! The entry point dispatches on the (old, new) kind pair: same kind
//! patches in place, anything else swaps the subtree with a single
//! host replace. Child lists run one of two regimes: the positional
//! walk for non-keyed lists, identified by dotted path tags, or the
//! keyed diff with head/tail runs and LIS-minimal moves.

use std::cmp::Ordering;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::trace;
use veld_dom::NodeId;

use crate::component::handle_update;
use crate::error::{Error, Result};
use crate::fiber::{Fiber, FiberChildren, FiberList, FiberPos, PathKey};
use crate::mount::{handle_component_input, mount, mount_inner, mount_list_children};
use crate::props::{is_controlled, patch_prop, process_form_element, remove_prop};
use crate::render::Pass;
use crate::unmount::{remove_all_children, unmount};
use crate::vnode::{
    Children, Context, ElementKind, FnComponent, Key, Ref, VChild, VNode, VNodeKind,
};

/// Reconcile `fiber` against `next`. Pointer-identical descriptors
/// return immediately without touching the host.
pub(crate) fn patch(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    next: &VNode,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<()> {
    if VNode::same(&fiber.input, next) {
        return Ok(());
    }
    pass.path.push(fiber.pos.clone());
    let result = patch_inner(pass, fiber, next, parent, context, svg);
    pass.path.pop();
    result
}

fn patch_inner(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    next: &VNode,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<()> {
    let last = fiber.input.clone();
    match (last.kind(), next.kind()) {
        (VNodeKind::Text(a), VNodeKind::Text(b)) => {
            if a != b {
                if let Some(dom) = fiber.dom {
                    pass.doc.set_text(dom, b)?;
                }
            }
            fiber.input = next.clone();
            Ok(())
        }
        (
            VNodeKind::Element { tag: last_tag, .. },
            VNodeKind::Element { tag: next_tag, kind },
        ) => {
            if last_tag != next_tag {
                replace_with_new_node(pass, fiber, next, parent, context, svg)
            } else {
                patch_element(pass, fiber, &last, next, next_tag, *kind, context, svg)?;
                fiber.input = next.clone();
                Ok(())
            }
        }
        (VNodeKind::ComponentClass(last_ty), VNodeKind::ComponentClass(next_ty)) => {
            if last_ty.type_id == next_ty.type_id && last.key() == next.key() {
                patch_class(pass, fiber, next, parent, context, svg)?;
                fiber.input = next.clone();
                Ok(())
            } else {
                replace_with_new_node(pass, fiber, next, parent, context, svg)
            }
        }
        (VNodeKind::ComponentFn(last_f), VNodeKind::ComponentFn(next_f)) => {
            if FnComponent::same(last_f, next_f) && last.key() == next.key() {
                patch_fn(pass, fiber, &last, next, next_f.clone(), parent, context, svg)?;
                fiber.input = next.clone();
                Ok(())
            } else {
                replace_with_new_node(pass, fiber, next, parent, context, svg)
            }
        }
        _ => replace_with_new_node(pass, fiber, next, parent, context, svg),
    }
}

/// Tear the position down and mount `next` in its place. The host
/// sees a single replace, not a remove plus insert.
fn replace_with_new_node(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    next: &VNode,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<()> {
    trace!("replacing subtree in place");
    let old_dom = fiber.dom;
    unmount(pass, fiber, None, false)?;
    fiber.children = FiberChildren::None;
    fiber.component = None;
    fiber.input = next.clone();
    fiber.dom = None;
    let new_dom = mount_inner(pass, fiber, None, context, svg)?;
    let attach = parent.or_else(|| old_dom.and_then(|dom| pass.doc.parent(dom)));
    if let Some(attach) = attach {
        match (old_dom, new_dom) {
            (Some(old), Some(new)) => pass.doc.replace_child(attach, new, old)?,
            (Some(old), None) => {
                if pass.doc.parent(old) == Some(attach) {
                    pass.doc.remove_child(attach, old)?;
                }
            }
            (None, Some(new)) => pass.doc.append_child(attach, new)?,
            (None, None) => {}
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn patch_element(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    last: &VNode,
    next: &VNode,
    tag: &str,
    kind: ElementKind,
    context: &Context,
    svg: bool,
) -> Result<()> {
    let Some(dom) = fiber.dom else { return Ok(()) };
    let svg = svg || kind == ElementKind::Svg;
    let child_svg = svg && tag != "foreignObject";

    if !Children::same(last.children(), next.children()) {
        patch_children(pass, fiber, last, next, dom, context, child_svg)?;
    }

    let last_props = last.props();
    let next_props = next.props();
    let props_same = match (last_props, next_props) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    };
    if !props_same {
        let controlled = next_props
            .is_some_and(|p| kind.is_form() && is_controlled(kind, p));
        if let Some(np) = next_props {
            for (name, value) in np.iter() {
                let last_value = last_props.and_then(|p| p.get(name));
                patch_prop(pass.doc, dom, name, last_value, value, svg, controlled)?;
            }
        }
        if let Some(lp) = last_props {
            for (name, _) in lp.iter() {
                let gone = next_props.is_none_or(|np| np.get(name).is_none());
                if gone {
                    remove_prop(pass.doc, dom, name, kind)?;
                }
            }
        }
        if kind.is_form() {
            if let Some(np) = next_props {
                process_form_element(pass.doc, dom, kind, np, false, controlled)?;
            }
        }
    }

    if last.class_name() != next.class_name() {
        match next.class_name() {
            Some(class) => pass.doc.set_attribute(dom, "class", class)?,
            None => pass.doc.remove_attribute(dom, "class")?,
        }
    }

    // Recycled nodes only re-enter the tree through mount_element,
    // which always fires the ref; here only callback identity changes
    // and removals matter.
    match (last.node_ref(), next.node_ref()) {
        (_, Some(next_ref)) => {
            let changed = last
                .node_ref()
                .is_none_or(|last_ref| !Ref::same(last_ref, next_ref));
            if changed {
                match next_ref {
                    Ref::Node(cb) => cb(Some(dom)),
                    _ => return Err(Error::InvalidRef("element refs must be node callbacks")),
                }
            }
        }
        (Some(Ref::Node(cb)), None) => cb(None),
        _ => {}
    }
    Ok(())
}

fn patch_children(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    last: &VNode,
    next: &VNode,
    dom: NodeId,
    context: &Context,
    svg: bool,
) -> Result<()> {
    match (last.children(), next.children()) {
        (Children::None, Children::None) => {}
        (_, Children::None) => {
            remove_all_children(pass, &mut fiber.children, dom)?;
        }
        (Children::Text(a), Children::Text(b)) => {
            if a != b {
                pass.doc.update_text_content(dom, b)?;
            }
        }
        (Children::None, Children::Text(b)) => {
            pass.doc.set_text_content(dom, b)?;
        }
        (_, Children::Text(b)) => {
            remove_all_children(pass, &mut fiber.children, dom)?;
            pass.doc.set_text_content(dom, b)?;
        }
        (Children::None | Children::Text(_), Children::One(child)) => {
            // A stale text child leaves no fiber; clear it first.
            pass.doc.remove_all_children(dom)?;
            let mut f = Fiber::new(child.clone(), FiberPos::Path(PathKey::first()));
            mount(pass, &mut f, Some(dom), context, svg)?;
            fiber.children = FiberChildren::One(Box::new(f));
        }
        (Children::None | Children::Text(_), Children::Many(items)) => {
            pass.doc.remove_all_children(dom)?;
            mount_list_children(pass, fiber, next, items, dom, context, svg)?;
        }
        (Children::One(_), Children::One(child)) => {
            if let FiberChildren::One(f) = &mut fiber.children {
                patch(pass, f, child, Some(dom), context, svg)?;
            } else {
                remove_all_children(pass, &mut fiber.children, dom)?;
                let mut f = Fiber::new(child.clone(), FiberPos::Path(PathKey::first()));
                mount(pass, &mut f, Some(dom), context, svg)?;
                fiber.children = FiberChildren::One(Box::new(f));
            }
        }
        (Children::Many(_), Children::One(child)) => {
            remove_all_children(pass, &mut fiber.children, dom)?;
            let mut f = Fiber::new(child.clone(), FiberPos::Path(PathKey::first()));
            mount(pass, &mut f, Some(dom), context, svg)?;
            fiber.children = FiberChildren::One(Box::new(f));
        }
        (Children::One(_), Children::Many(items)) => {
            remove_all_children(pass, &mut fiber.children, dom)?;
            mount_list_children(pass, fiber, next, items, dom, context, svg)?;
        }
        (Children::Many(_), Children::Many(items)) => {
            patch_list(pass, fiber, next, items, dom, context, svg)?;
        }
    }
    Ok(())
}

fn patch_list(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    next_vnode: &VNode,
    items: &[VChild],
    dom: NodeId,
    context: &Context,
    svg: bool,
) -> Result<()> {
    let first_key = items.iter().find_map(|item| match item {
        VChild::Node(node) => Some(node.key().is_some()),
        _ => None,
    });
    let next_keyed = next_vnode.keyed_children()
        || (!next_vnode.non_keyed_children() && first_key == Some(true));
    let (cur_keyed, cur_empty) = match &fiber.children {
        FiberChildren::Many(list) => (list.keyed, list.fibers.is_empty()),
        _ => (next_keyed, true),
    };
    if cur_keyed != next_keyed {
        // Regime flip: identities cannot carry over, rebuild.
        remove_all_children(pass, &mut fiber.children, dom)?;
        return mount_list_children(pass, fiber, next_vnode, items, dom, context, svg);
    }
    if items.is_empty() {
        return remove_all_children(pass, &mut fiber.children, dom);
    }
    if cur_empty {
        fiber.children = FiberChildren::None;
        return mount_list_children(pass, fiber, next_vnode, items, dom, context, svg);
    }
    let FiberChildren::Many(list) = &mut fiber.children else {
        return Ok(());
    };
    if next_keyed {
        patch_keyed(pass, list, items, dom, context, svg)
    } else {
        patch_non_keyed(pass, list, items, dom, context, svg)
    }
}

/// Positional diff. New children walk the (possibly nested) list
/// depth-first while a cursor walks the old fibers; path tags decide
/// whether a position matches, vanished, or is new. Old fibers sort
/// in path order, so a tag greater than the cursor's means the old
/// entry is gone.
fn patch_non_keyed(
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
    let mut cursor = 0usize;
    // Old fibers still subject to matching; splices keep it current.
    let mut old_len = list.fibers.len();
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
                    let pos = prefix.slot(slot);
                    loop {
                        if cursor >= old_len {
                            let mut f =
                                Fiber::new(node.clone(), FiberPos::Path(pos.clone()));
                            mount(pass, &mut f, Some(dom), context, svg)?;
                            list.fibers.push(f);
                            break;
                        }
                        let cmp = match list.fibers[cursor].pos.path() {
                            Some(old_pos) => pos.cmp(old_pos),
                            // Foreign entry from another regime: drop.
                            None => Ordering::Greater,
                        };
                        match cmp {
                            Ordering::Equal => {
                                patch(
                                    pass,
                                    &mut list.fibers[cursor],
                                    node,
                                    Some(dom),
                                    context,
                                    svg,
                                )?;
                                cursor += 1;
                                break;
                            }
                            Ordering::Greater => {
                                // Old position vanished; retry the same
                                // child against the next fiber.
                                let mut dead = list.fibers.remove(cursor);
                                unmount(pass, &mut dead, Some(dom), true)?;
                                old_len -= 1;
                            }
                            Ordering::Less => {
                                let mut f =
                                    Fiber::new(node.clone(), FiberPos::Path(pos.clone()));
                                mount(pass, &mut f, None, context, svg)?;
                                let anchor = list.fibers[cursor].dom;
                                if let Some(new_dom) = f.dom {
                                    pass.doc.insert_before(dom, new_dom, anchor)?;
                                }
                                list.fibers.insert(cursor, f);
                                old_len += 1;
                                cursor += 1;
                                break;
                            }
                        }
                    }
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
    if cursor < old_len {
        for mut dead in list.fibers.drain(cursor..old_len) {
            unmount(pass, &mut dead, Some(dom), false)?;
        }
    }
    Ok(())
}

fn key_of(node: &VNode) -> Result<&Key> {
    node.key().ok_or(Error::MissingKey)
}

fn slot_key(slots: &[Option<Fiber>], idx: isize) -> Option<&Key> {
    match &slots.get(idx as usize)?.as_ref()?.pos {
        FiberPos::Keyed(key) => Some(key),
        FiberPos::Path(_) => None,
    }
}

fn slot_dom(slots: &[Option<Fiber>], idx: isize) -> Option<NodeId> {
    slots.get(idx as usize)?.as_ref()?.dom
}

/// Keyed diff: sync matching head and tail runs, handle whole-run
/// moves, then align the middle through a key index, unmount the
/// unmatched, and move the rest with the fewest host operations a
/// longest increasing subsequence allows.
fn patch_keyed(
    pass: &mut Pass<'_>,
    list: &mut FiberList,
    items: &[VChild],
    dom: NodeId,
    context: &Context,
    svg: bool,
) -> Result<()> {
    let nodes: Vec<&VNode> = items
        .iter()
        .filter_map(|item| match item {
            VChild::Node(node) => Some(node),
            _ => None,
        })
        .collect();
    if nodes.is_empty() {
        for mut dead in list.fibers.drain(..) {
            unmount(pass, &mut dead, None, true)?;
        }
        pass.doc.remove_all_children(dom)?;
        list.rebuild_keys();
        return Ok(());
    }
    let keys: Vec<Key> = nodes
        .iter()
        .map(|node| key_of(node).cloned())
        .collect::<Result<_>>()?;

    let a_len = list.fibers.len() as isize;
    let b_len = nodes.len() as isize;
    let mut a: Vec<Option<Fiber>> =
        std::mem::take(&mut list.fibers).into_iter().map(Some).collect();
    let mut b: Vec<Option<Fiber>> = (0..b_len).map(|_| None).collect();
    let mut a_start: isize = 0;
    let mut a_end = a_len - 1;
    let mut b_start: isize = 0;
    let mut b_end = b_len - 1;

    'sync: loop {
        if a_start > a_end || b_start > b_end {
            break;
        }
        // Matching head run.
        while slot_key(&a, a_start) == Some(&keys[b_start as usize]) {
            if let Some(mut f) = a[a_start as usize].take() {
                patch(pass, &mut f, nodes[b_start as usize], Some(dom), context, svg)?;
                b[b_start as usize] = Some(f);
            }
            a_start += 1;
            b_start += 1;
            if a_start > a_end || b_start > b_end {
                break 'sync;
            }
        }
        // Matching tail run.
        while slot_key(&a, a_end) == Some(&keys[b_end as usize]) {
            if let Some(mut f) = a[a_end as usize].take() {
                patch(pass, &mut f, nodes[b_end as usize], Some(dom), context, svg)?;
                b[b_end as usize] = Some(f);
            }
            a_end -= 1;
            b_end -= 1;
            if a_start > a_end || b_start > b_end {
                break 'sync;
            }
        }
        // Old tail is the new head.
        if slot_key(&a, a_end) == Some(&keys[b_start as usize]) {
            if let Some(mut f) = a[a_end as usize].take() {
                patch(pass, &mut f, nodes[b_start as usize], Some(dom), context, svg)?;
                let anchor = slot_dom(&a, a_start);
                if let Some(moved) = f.dom {
                    pass.doc.insert_before(dom, moved, anchor)?;
                }
                b[b_start as usize] = Some(f);
            }
            a_end -= 1;
            b_start += 1;
            continue;
        }
        // Old head is the new tail.
        if slot_key(&a, a_start) == Some(&keys[b_end as usize]) {
            if let Some(mut f) = a[a_start as usize].take() {
                patch(pass, &mut f, nodes[b_end as usize], Some(dom), context, svg)?;
                let anchor = slot_dom(&b, b_end + 1);
                if let Some(moved) = f.dom {
                    pass.doc.insert_before(dom, moved, anchor)?;
                }
                b[b_end as usize] = Some(f);
            }
            a_start += 1;
            b_end -= 1;
            continue;
        }
        break;
    }

    if a_start > a_end {
        // Only mounts remain.
        while b_start <= b_end {
            let i = b_start as usize;
            let mut f = Fiber::new(nodes[i].clone(), FiberPos::Keyed(keys[i].clone()));
            mount(pass, &mut f, None, context, svg)?;
            let anchor = slot_dom(&b, b_end + 1);
            if let Some(new_dom) = f.dom {
                pass.doc.insert_before(dom, new_dom, anchor)?;
            }
            b[i] = Some(f);
            b_start += 1;
        }
    } else if b_start > b_end {
        // Only unmounts remain.
        for i in a_start..=a_end {
            if let Some(mut dead) = a[i as usize].take() {
                unmount(pass, &mut dead, Some(dom), false)?;
            }
        }
    } else {
        let a_left = (a_end - a_start + 1) as usize;
        let b_left = (b_end - b_start + 1) as usize;
        let mut sources: Vec<isize> = vec![-1; b_left];
        let mut moved = false;
        let mut last_index: isize = 0;
        let mut patched = 0usize;

        let mut index: AHashMap<&Key, usize> = AHashMap::with_capacity(b_left);
        for i in b_start..=b_end {
            index.insert(&keys[i as usize], i as usize);
        }
        for i in a_start..=a_end {
            if patched >= b_left {
                break;
            }
            let target = slot_key(&a, i).and_then(|key| index.get(key).copied());
            if let Some(j) = target {
                sources[j - b_start as usize] = i;
                if last_index > j as isize {
                    moved = true;
                } else {
                    last_index = j as isize;
                }
                if let Some(mut f) = a[i as usize].take() {
                    patch(pass, &mut f, nodes[j], Some(dom), context, svg)?;
                    b[j] = Some(f);
                }
                patched += 1;
            }
        }

        if a_len == a_left as isize && patched == 0 {
            // No key survived: clear wholesale and rebuild in order.
            for slot in &mut a {
                if let Some(mut dead) = slot.take() {
                    unmount(pass, &mut dead, None, true)?;
                }
            }
            pass.doc.remove_all_children(dom)?;
            for (i, node) in nodes.iter().enumerate() {
                let mut f = Fiber::new((*node).clone(), FiberPos::Keyed(keys[i].clone()));
                mount(pass, &mut f, Some(dom), context, svg)?;
                b[i] = Some(f);
            }
        } else {
            for i in a_start..=a_end {
                if let Some(mut dead) = a[i as usize].take() {
                    unmount(pass, &mut dead, Some(dom), false)?;
                }
            }
            if moved {
                let seq = longest_increasing(&sources);
                let mut j = seq.len() as isize - 1;
                for i in (0..b_left as isize).rev() {
                    let bi = (b_start + i) as usize;
                    let anchor = slot_dom(&b, b_start + i + 1);
                    if sources[i as usize] == -1 {
                        let mut f =
                            Fiber::new(nodes[bi].clone(), FiberPos::Keyed(keys[bi].clone()));
                        mount(pass, &mut f, None, context, svg)?;
                        if let Some(new_dom) = f.dom {
                            pass.doc.insert_before(dom, new_dom, anchor)?;
                        }
                        b[bi] = Some(f);
                    } else if j < 0 || i != seq[j as usize] as isize {
                        if let Some(moved_dom) = slot_dom(&b, b_start + i) {
                            pass.doc.insert_before(dom, moved_dom, anchor)?;
                        }
                    } else {
                        j -= 1;
                    }
                }
            } else if patched != b_left {
                for i in (0..b_left as isize).rev() {
                    let bi = (b_start + i) as usize;
                    if sources[i as usize] == -1 {
                        let anchor = slot_dom(&b, b_start + i + 1);
                        let mut f =
                            Fiber::new(nodes[bi].clone(), FiberPos::Keyed(keys[bi].clone()));
                        mount(pass, &mut f, None, context, svg)?;
                        if let Some(new_dom) = f.dom {
                            pass.doc.insert_before(dom, new_dom, anchor)?;
                        }
                        b[bi] = Some(f);
                    }
                }
            }
        }
    }

    let mut fibers = Vec::with_capacity(b.len());
    for slot in b {
        if let Some(f) = slot {
            fibers.push(f);
        }
    }
    debug_assert_eq!(fibers.len(), nodes.len());
    list.fibers = fibers;
    list.rebuild_keys();
    Ok(())
}

/// Indices of a longest increasing subsequence of `arr`, skipping -1
/// entries (positions that have no counterpart).
fn longest_increasing(arr: &[isize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<usize> = vec![0; arr.len()];
    for i in 0..arr.len() {
        if arr[i] == -1 {
            continue;
        }
        match tails.last() {
            None => {
                tails.push(i);
                continue;
            }
            Some(&last) if arr[last] < arr[i] => {
                prev[i] = last;
                tails.push(i);
                continue;
            }
            _ => {}
        }
        let mut lo = 0usize;
        let mut hi = tails.len() - 1;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if arr[tails[mid]] < arr[i] {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if arr[i] < arr[tails[lo]] {
            if lo > 0 {
                prev[i] = tails[lo - 1];
            }
            tails[lo] = i;
        }
    }
    let Some(&last) = tails.last() else {
        return Vec::new();
    };
    let mut out = vec![0usize; tails.len()];
    let mut u = last;
    for k in (0..tails.len()).rev() {
        out[k] = u;
        u = prev[u];
    }
    out
}

fn patch_class(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    next: &VNode,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<()> {
    let Some(inst) = fiber.component.clone() else {
        return replace_with_new_node(pass, fiber, next, parent, context, svg);
    };
    if inst.borrow().unmounted {
        // Defunct instance: remount the component fresh in place.
        return replace_with_new_node(pass, fiber, next, parent, context, svg);
    }
    handle_update(
        pass,
        fiber,
        &inst,
        None,
        next.props_or_empty(),
        context.clone(),
        parent,
        false,
        false,
    )
}

#[allow(clippy::too_many_arguments)]
fn patch_fn(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    last: &VNode,
    next: &VNode,
    f: FnComponent,
    parent: Option<NodeId>,
    context: &Context,
    svg: bool,
) -> Result<()> {
    let last_props = last.props_or_empty();
    let next_props = next.props_or_empty();
    let hooks = match next.node_ref() {
        Some(Ref::Hooks(hooks)) => Some(hooks.clone()),
        _ => None,
    };
    if let Some(gate) = hooks.as_ref().and_then(|h| h.on_should_update.as_ref()) {
        if !gate(&last_props, &next_props) {
            return Ok(());
        }
    }
    if let Some(hook) = hooks.as_ref().and_then(|h| h.on_will_update.as_ref()) {
        hook(&last_props, &next_props);
    }
    let output = (f.render)(&next_props, context)?;
    if output.as_ref().is_some_and(VNode::is_no_op) {
        return Ok(());
    }
    let next_input = handle_component_input(output)?;
    match (&mut fiber.children, next_input) {
        (FiberChildren::One(child), Some(input)) => {
            patch(pass, child, &input, parent, context, svg)?;
            fiber.dom = child.dom;
        }
        (FiberChildren::None, Some(input)) => {
            let mut child = Fiber::new(input, FiberPos::Path(PathKey::first()));
            let new_dom = mount(pass, &mut child, None, context, svg)?;
            if let (Some(parent), Some(new_dom)) = (parent, new_dom) {
                pass.doc.append_child(parent, new_dom)?;
            }
            fiber.dom = new_dom;
            fiber.children = FiberChildren::One(Box::new(child));
        }
        (FiberChildren::One(_), None) => {
            if let FiberChildren::One(mut child) =
                std::mem::replace(&mut fiber.children, FiberChildren::None)
            {
                let removal =
                    parent.or_else(|| child.dom.and_then(|d| pass.doc.parent(d)));
                unmount(pass, &mut child, removal, false)?;
            }
            fiber.dom = None;
        }
        _ => {}
    }
    if let Some(hook) = hooks.as_ref().and_then(|h| h.on_did_update.as_ref()) {
        hook(&last_props, &next_props);
    }
    Ok(())
}
