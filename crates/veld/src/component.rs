//! Class component instances and the update pipeline.
//!
//! An instance is split in two: the user's `Component` behavior and
//! the runtime bookkeeping (`InstanceCore`). The behavior box is taken
//! out of the core while hooks run, so a hook holding an [`Updater`]
//! can never alias the instance it belongs to.
//!
//! The update pipeline runs in a fixed order: pre-props hook (render
//! blocked, its state writes captured as pending), pending merge,
//! `should_component_update` gate, `component_will_update` (state
//! writes forbidden), commit, render, child patch, `did_update`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;
use veld_dom::NodeId;

use crate::error::{Error, Result};
use crate::fiber::{Fiber, FiberChildren, FiberPath, FiberPos, PathKey};
use crate::mount::{handle_component_input, mount};
use crate::patch::patch;
use crate::render::{Pass, RuntimeInner, fiber_at};
use crate::scheduler::{DeferredUpdate, LifecycleQueue, Scheduler};
use crate::unmount::unmount;
use crate::vnode::{Context, Props, State, VNode};

/// A stateful component. Pre-render hooks are fallible; an `Err`
/// aborts the pass before any tree mutation from this component.
pub trait Component: 'static {
    fn render(&mut self, props: &Props, state: &State, context: &Context) -> Result<Option<VNode>>;

    /// State to start from; runs once before `component_will_mount`.
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new()
    }

    /// Props filled in when a descriptor omits them.
    fn default_props() -> Option<Props>
    where
        Self: Sized,
    {
        None
    }

    fn component_will_mount(&mut self, _cx: &mut Updater<'_>) -> Result<()> {
        Ok(())
    }

    /// Runs after the subtree is attached, from the deferred
    /// lifecycle queue.
    fn component_did_mount(&mut self, _dom: Option<NodeId>, _cx: &mut Updater<'_>) {}

    fn component_will_receive_props(
        &mut self,
        _next_props: &Props,
        _next_context: &Context,
        _cx: &mut Updater<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn should_component_update(
        &mut self,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
    ) -> bool {
        true
    }

    fn component_will_update(
        &mut self,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
    ) -> Result<()> {
        Ok(())
    }

    fn component_did_update(
        &mut self,
        _prev_props: &Props,
        _prev_state: &State,
        _cx: &mut Updater<'_>,
    ) {
    }

    fn component_will_unmount(&mut self) {}

    /// Extra context merged over the inherited one for descendants.
    fn get_child_context(
        &mut self,
        _props: &Props,
        _state: &State,
        _context: &Context,
    ) -> Option<Props> {
        None
    }
}

/// Runtime bookkeeping of one mounted class component.
pub(crate) struct InstanceCore {
    /// Taken out while a hook runs.
    pub behavior: Option<Box<dyn Component>>,
    pub props: Rc<Props>,
    pub state: State,
    pub context: Context,
    pub child_context: Context,
    pub pending_state: Option<State>,
    pub pending_set_state: bool,
    /// Set while the pre-props hook runs; state writes fold directly
    /// instead of scheduling.
    pub block_render: bool,
    /// Set while `component_will_update` runs; state writes error.
    pub block_set_state: bool,
    pub unmounted: bool,
    pub updating: bool,
    /// Already sitting in the flush queue.
    pub flush_pending: bool,
    pub flush_callbacks: Vec<Box<dyn FnOnce()>>,
    /// Where this component's fiber lives; resolved at flush time.
    pub path: FiberPath,
    pub parent_dom: Option<NodeId>,
    pub svg: bool,
}

pub(crate) type Instance = Rc<RefCell<InstanceCore>>;

/// State access handed to lifecycle hooks. Writes respect the phase
/// the hook runs in: scheduled during a pass, folded when the phase
/// blocks rendering, rejected where state writes are forbidden.
pub struct Updater<'a> {
    core: &'a mut InstanceCore,
    scheduler: &'a Scheduler,
    me: Weak<RefCell<InstanceCore>>,
}

impl<'a> Updater<'a> {
    pub(crate) fn new(
        core: &'a mut InstanceCore,
        scheduler: &'a Scheduler,
        me: Weak<RefCell<InstanceCore>>,
    ) -> Self {
        Self { core, scheduler, me }
    }

    pub fn props(&self) -> &Props {
        &self.core.props
    }

    pub fn state(&self) -> &State {
        &self.core.state
    }

    pub fn context(&self) -> &Context {
        &self.core.context
    }

    pub fn set_state(&mut self, partial: State) -> Result<()> {
        self.queue_state_changes(partial, None)
    }

    pub fn set_state_with(
        &mut self,
        partial: State,
        callback: impl FnOnce() + 'static,
    ) -> Result<()> {
        self.queue_state_changes(partial, Some(Box::new(callback)))
    }

    fn queue_state_changes(
        &mut self,
        partial: State,
        callback: Option<Box<dyn FnOnce()>>,
    ) -> Result<()> {
        if self.core.block_set_state {
            return Err(Error::SetStateBlocked);
        }
        match &mut self.core.pending_state {
            Some(pending) => pending.merge(&partial),
            None => self.core.pending_state = Some(partial),
        }
        if self.core.block_render {
            // The surrounding phase reads `state` directly, so fold
            // the write in for it to pick up.
            if let Some(pending) = self.core.pending_state.take() {
                self.core.state.merge(&pending);
            }
            if let Some(cb) = callback {
                self.core.flush_callbacks.push(cb);
                if !self.core.flush_pending {
                    self.core.flush_pending = true;
                    self.scheduler.enqueue(self.me.clone());
                }
            }
            return Ok(());
        }
        if self.core.pending_set_state {
            // A render consuming the pending map is already on the
            // way; the merge above rides along with it. Committed
            // state stays untouched until then.
            if let Some(cb) = callback {
                self.core.flush_callbacks.push(cb);
                if !self.core.flush_pending {
                    self.core.flush_pending = true;
                    self.scheduler.enqueue(self.me.clone());
                }
            }
            return Ok(());
        }
        self.core.pending_set_state = true;
        // Hooks only run inside a pass, so schedule for the flush.
        if !self.core.flush_pending {
            self.core.flush_pending = true;
            self.scheduler.enqueue(self.me.clone());
        }
        if let Some(cb) = callback {
            self.core.flush_callbacks.push(cb);
        }
        Ok(())
    }
}

/// External handle to a mounted component, delivered through
/// [`crate::Ref::Instance`]. All operations are no-ops once the
/// component has unmounted.
#[derive(Clone)]
pub struct ComponentHandle {
    pub(crate) core: Weak<RefCell<InstanceCore>>,
    pub(crate) runtime: Weak<RefCell<RuntimeInner>>,
    pub(crate) scheduler: Rc<Scheduler>,
}

impl ComponentHandle {
    pub fn set_state(&self, partial: State) -> Result<()> {
        self.update(Some(partial), false, None)
    }

    pub fn set_state_with(&self, partial: State, callback: impl FnOnce() + 'static) -> Result<()> {
        self.update(Some(partial), false, Some(Box::new(callback)))
    }

    /// Re-render bypassing `should_component_update`. No-op while an
    /// update for this component is already in progress.
    pub fn force_update(&self) -> Result<()> {
        self.update(None, true, None)
    }

    pub fn state(&self) -> Option<State> {
        self.core.upgrade().map(|core| core.borrow().state.clone())
    }

    pub fn is_mounted(&self) -> bool {
        self.core.upgrade().is_some_and(|core| !core.borrow().unmounted)
    }

    fn update(
        &self,
        partial: Option<State>,
        force: bool,
        callback: Option<Box<dyn FnOnce()>>,
    ) -> Result<()> {
        let Some(inst) = self.core.upgrade() else {
            return Ok(());
        };
        {
            let Ok(mut core) = inst.try_borrow_mut() else {
                // One of this instance's own hooks holds the cell
                // right now. A forced update collapses into the pass
                // already in flight; state writes are parked with the
                // scheduler and folded in at the next flush.
                if partial.is_some() || callback.is_some() {
                    self.scheduler.defer(DeferredUpdate {
                        inst: self.core.clone(),
                        partial,
                        callback,
                    });
                }
                return Ok(());
            };
            if core.unmounted {
                return Ok(());
            }
            if force && core.updating {
                return Ok(());
            }
            if let Some(partial) = partial {
                if core.block_set_state {
                    return Err(Error::SetStateBlocked);
                }
                match &mut core.pending_state {
                    Some(pending) => pending.merge(&partial),
                    None => core.pending_state = Some(partial),
                }
                if core.pending_set_state || core.block_render {
                    // Already accumulating; the merge above rides
                    // along with the update that is on the way.
                    if let Some(cb) = callback {
                        core.flush_callbacks.push(cb);
                        if !core.flush_pending {
                            core.flush_pending = true;
                            self.scheduler.enqueue(Rc::downgrade(&inst));
                        }
                    }
                    return Ok(());
                }
                core.pending_set_state = true;
            }
            if self.scheduler.is_rendering() {
                if !core.flush_pending {
                    core.flush_pending = true;
                    self.scheduler.enqueue(Rc::downgrade(&inst));
                }
                if let Some(cb) = callback {
                    core.flush_callbacks.push(cb);
                }
                return Ok(());
            }
        }
        // Outside a pass: apply right away, then drain anything the
        // update itself scheduled.
        let Some(runtime) = self.runtime.upgrade() else {
            return Ok(());
        };
        let guard = self.scheduler.begin();
        apply_state(&runtime, &self.scheduler, &inst, force)?;
        flush_queue(&runtime, &self.scheduler)?;
        drop(guard);
        if let Some(cb) = callback {
            cb();
        }
        Ok(())
    }
}

enum Phase {
    NoOp,
    Rendered(Option<VNode>),
}

/// Run the full update pipeline for one component fiber.
#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_update(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    inst: &Instance,
    next_state: Option<State>,
    next_props: Rc<Props>,
    context: Context,
    parent: Option<NodeId>,
    force: bool,
    from_set_state: bool,
) -> Result<()> {
    let weak = Rc::downgrade(inst);
    let prev_props;
    let prev_state;
    let child_context;
    let svg;
    let phase = {
        let mut core = inst.borrow_mut();
        if core.unmounted {
            return Ok(());
        }
        prev_props = core.props.clone();
        prev_state = core.state.clone();
        svg = core.svg;
        if parent.is_some() {
            core.parent_dom = parent;
        }
        let Some(mut behavior) = core.behavior.take() else {
            return Ok(());
        };
        let result = render_phase(
            &mut core,
            behavior.as_mut(),
            pass.scheduler,
            &weak,
            next_state,
            next_props,
            context,
            force,
            from_set_state,
            pass.options.before_render.clone(),
            pass.options.after_render.clone(),
        );
        core.behavior = Some(behavior);
        child_context = core.child_context.clone();
        result?
    };
    let output = match phase {
        Phase::NoOp => return Ok(()),
        Phase::Rendered(output) => output,
    };
    if output.as_ref().is_some_and(VNode::is_no_op) {
        return Ok(());
    }
    trace!("component re-rendered");
    let attach = parent.or_else(|| inst.borrow().parent_dom);
    let next_input = handle_component_input(output)?;
    // Marked until did_update has run, so a forced re-entry from any
    // code this update triggers collapses into it.
    inst.borrow_mut().updating = true;
    let synced = sync_rendered_output(pass, fiber, next_input, attach, &child_context, svg);
    if let Err(e) = synced {
        inst.borrow_mut().updating = false;
        return Err(e);
    }
    if pass.options.find_dom_node_enabled {
        let key = Rc::as_ptr(inst) as usize;
        match fiber.dom {
            Some(dom) => {
                pass.dom_map.insert(key, dom);
            }
            None => {
                pass.dom_map.remove(&key);
            }
        }
    }
    if from_set_state {
        // Newly mounted descendants see their did_mount before our
        // did_update.
        pass.lifecycle.run(pass.scheduler);
    }
    {
        let mut core = inst.borrow_mut();
        if let Some(mut behavior) = core.behavior.take() {
            {
                let mut cx = Updater::new(&mut core, pass.scheduler, weak);
                behavior.component_did_update(&prev_props, &prev_state, &mut cx);
            }
            core.behavior = Some(behavior);
        }
    }
    inst.borrow_mut().updating = false;
    Ok(())
}

/// Reconcile a component's rendered output against its child fiber.
fn sync_rendered_output(
    pass: &mut Pass<'_>,
    fiber: &mut Fiber,
    next_input: Option<VNode>,
    attach: Option<NodeId>,
    child_context: &Context,
    svg: bool,
) -> Result<()> {
    match (&mut fiber.children, next_input) {
        (FiberChildren::One(child), Some(input)) => {
            patch(pass, child, &input, attach, child_context, svg)?;
            fiber.dom = child.dom;
        }
        (FiberChildren::None, Some(input)) => {
            let mut child = Fiber::new(input, FiberPos::Path(PathKey::first()));
            let dom = mount(pass, &mut child, None, child_context, svg)?;
            if let (Some(parent), Some(dom)) = (attach, dom) {
                pass.doc.append_child(parent, dom)?;
            }
            fiber.dom = dom;
            fiber.children = FiberChildren::One(Box::new(child));
        }
        (FiberChildren::One(_), None) => {
            // Rendering nothing tears the previous output down.
            if let FiberChildren::One(mut child) =
                std::mem::replace(&mut fiber.children, FiberChildren::None)
            {
                unmount(pass, &mut child, attach, false)?;
            }
            fiber.dom = None;
        }
        _ => {}
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn render_phase(
    core: &mut InstanceCore,
    behavior: &mut dyn Component,
    scheduler: &Scheduler,
    me: &Weak<RefCell<InstanceCore>>,
    next_state: Option<State>,
    next_props: Rc<Props>,
    context: Context,
    force: bool,
    from_set_state: bool,
    before_render: Option<Rc<dyn Fn()>>,
    after_render: Option<Rc<dyn Fn()>>,
) -> Result<Phase> {
    // The empty sentinel carries no identity, so it always updates.
    let props_changed =
        !Rc::ptr_eq(&core.props, &next_props) || Props::is_empty_sentinel(&next_props);
    if !props_changed && next_state.is_none() && !force {
        return Ok(Phase::NoOp);
    }
    if props_changed && !from_set_state {
        core.block_render = true;
        let before = core.state.clone();
        let hook = {
            let mut cx = Updater::new(&mut *core, scheduler, me.clone());
            behavior.component_will_receive_props(&next_props, &context, &mut cx)
        };
        core.block_render = false;
        hook?;
        if core.state != before {
            // Fold the hook's state writes into this same update.
            core.pending_state = Some(std::mem::replace(&mut core.state, before));
            core.pending_set_state = true;
        }
    }
    let mut use_state = next_state.unwrap_or_else(|| core.state.clone());
    if core.pending_set_state {
        if let Some(pending) = core.pending_state.take() {
            use_state.merge(&pending);
        }
        core.pending_set_state = false;
    }
    if !force
        && !behavior.should_component_update(&next_props, &use_state, &context)
    {
        // Skipped renders still commit, so the next diff starts from
        // current values.
        core.props = next_props;
        core.state = use_state;
        core.context = context;
        return Ok(Phase::NoOp);
    }
    core.block_set_state = true;
    let hook = behavior.component_will_update(&next_props, &use_state, &context);
    core.block_set_state = false;
    hook?;
    core.props = next_props;
    core.state = use_state;
    core.context = context;
    if let Some(hook) = &before_render {
        hook();
    }
    let output = behavior.render(&core.props, &core.state, &core.context);
    if let Some(hook) = &after_render {
        hook();
    }
    let output = output?;
    core.child_context = match behavior.get_child_context(&core.props, &core.state, &core.context)
    {
        Some(extra) => {
            let mut merged = (*core.context).clone();
            merged.merge(&extra);
            Rc::new(merged)
        }
        None => core.context.clone(),
    };
    Ok(Phase::Rendered(output))
}

/// Apply pending state to a queued component: resolve its fiber by
/// path and run the pipeline. Silently drops updates whose fiber is
/// gone or whose component unmounted in the meantime.
pub(crate) fn apply_state(
    inner: &Rc<RefCell<RuntimeInner>>,
    scheduler: &Rc<Scheduler>,
    inst: &Instance,
    force: bool,
) -> Result<()> {
    {
        let core = inst.borrow();
        if core.unmounted {
            return Ok(());
        }
        if !force && core.block_render {
            drop(core);
            let mut core = inst.borrow_mut();
            core.pending_set_state = false;
            if let Some(pending) = core.pending_state.take() {
                core.state.merge(&pending);
            }
            return Ok(());
        }
    }
    let (next_state, next_props, context, path) = {
        let mut core = inst.borrow_mut();
        core.pending_set_state = false;
        let mut next = core.state.clone();
        if let Some(pending) = core.pending_state.take() {
            next.merge(&pending);
        }
        (next, core.props.clone(), core.context.clone(), core.path.clone())
    };
    let mut lifecycle = LifecycleQueue::new();
    {
        let mut guard = inner.borrow_mut();
        let RuntimeInner { doc, roots, options, pool, dom_map } = &mut *guard;
        let Some(fiber) = fiber_at(roots, &path) else {
            trace!("dropping state update for a relocated fiber");
            return Ok(());
        };
        let parent = fiber.dom.and_then(|dom| doc.parent(dom));
        let mut pass = Pass {
            doc,
            scheduler,
            lifecycle: &mut lifecycle,
            options,
            pool,
            dom_map,
            runtime: Rc::downgrade(inner),
            path: path.segs.clone(),
            root: path.root,
        };
        handle_update(
            &mut pass,
            fiber,
            inst,
            Some(next_state),
            next_props,
            context,
            parent,
            force,
            true,
        )?;
    }
    lifecycle.run(scheduler);
    Ok(())
}

/// Drain the flush queue. Entries appended while flushing are
/// processed in the same drain; each component is applied at most once
/// per enqueue thanks to its `flush_pending` flag.
pub(crate) fn flush_queue(
    inner: &Rc<RefCell<RuntimeInner>>,
    scheduler: &Rc<Scheduler>,
) -> Result<()> {
    let mut idx = 0;
    let result = loop {
        admit_deferred(scheduler);
        let Some(weak) = scheduler.queued(idx) else {
            break Ok(());
        };
        idx += 1;
        let Some(inst) = weak.upgrade() else {
            continue;
        };
        inst.borrow_mut().flush_pending = false;
        if let Err(e) = apply_state(inner, scheduler, &inst, false) {
            break Err(e);
        }
        let callbacks = std::mem::take(&mut inst.borrow_mut().flush_callbacks);
        for cb in callbacks {
            cb();
        }
    };
    scheduler.clear_queue();
    result
}

/// Fold parked mid-hook writes into their instances and queue the
/// owners. By the time a flush runs, the hooks that held the cells
/// have all returned.
fn admit_deferred(scheduler: &Scheduler) {
    for update in scheduler.take_deferred() {
        let Some(inst) = update.inst.upgrade() else {
            continue;
        };
        let mut core = inst.borrow_mut();
        if core.unmounted {
            continue;
        }
        if let Some(partial) = update.partial {
            match &mut core.pending_state {
                Some(pending) => pending.merge(&partial),
                None => core.pending_state = Some(partial),
            }
            core.pending_set_state = true;
        }
        if let Some(cb) = update.callback {
            core.flush_callbacks.push(cb);
        }
        if !core.flush_pending {
            core.flush_pending = true;
            scheduler.enqueue(Rc::downgrade(&inst));
        }
    }
}
