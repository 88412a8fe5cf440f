//! Update scheduling.
//!
//! A single flag marks "a render pass is in progress". State changes
//! raised while it is set join a deduplicated flush queue and are
//! applied after the pass commits; changes raised outside a pass apply
//! immediately. The flag is restored through a drop guard so an error
//! inside a pass cannot leave it stuck.

use std::cell::{Cell, RefCell};
use std::rc::Weak;

use crate::component::InstanceCore;
use crate::vnode::State;

/// A state change raised through a [`crate::ComponentHandle`] while
/// the target instance was mid-hook (its cell already borrowed).
/// Parked here and folded into the instance at the next flush.
pub(crate) struct DeferredUpdate {
    pub inst: Weak<RefCell<InstanceCore>>,
    pub partial: Option<State>,
    pub callback: Option<Box<dyn FnOnce()>>,
}

pub(crate) struct Scheduler {
    rendering: Cell<bool>,
    queue: RefCell<Vec<Weak<RefCell<InstanceCore>>>>,
    deferred: RefCell<Vec<DeferredUpdate>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            rendering: Cell::new(false),
            queue: RefCell::new(Vec::new()),
            deferred: RefCell::new(Vec::new()),
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering.get()
    }

    /// Mark a pass in progress; the previous flag value is restored
    /// when the guard drops, so nested passes compose.
    pub fn begin(&self) -> RenderGuard<'_> {
        let prev = self.rendering.replace(true);
        RenderGuard { scheduler: self, prev }
    }

    pub fn enqueue(&self, instance: Weak<RefCell<InstanceCore>>) {
        self.queue.borrow_mut().push(instance);
    }

    /// Entry at `idx`, if the queue has grown that far. The flush walk
    /// indexes rather than drains so entries appended mid-flush are
    /// still processed.
    pub fn queued(&self, idx: usize) -> Option<Weak<RefCell<InstanceCore>>> {
        self.queue.borrow().get(idx).cloned()
    }

    pub fn clear_queue(&self) {
        self.queue.borrow_mut().clear();
    }

    pub fn defer(&self, update: DeferredUpdate) {
        self.deferred.borrow_mut().push(update);
    }

    pub fn take_deferred(&self) -> Vec<DeferredUpdate> {
        std::mem::take(&mut *self.deferred.borrow_mut())
    }
}

pub(crate) struct RenderGuard<'a> {
    scheduler: &'a Scheduler,
    prev: bool,
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.rendering.set(self.prev);
    }
}

/// Deferred work queued during a pass and run once the tree has
/// committed: component `did_mount` hooks and mount instrumentation.
/// A fresh queue is created per pass.
pub(crate) struct LifecycleQueue {
    listeners: Vec<Box<dyn FnOnce(&Scheduler)>>,
}

impl LifecycleQueue {
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn add(&mut self, listener: Box<dyn FnOnce(&Scheduler)>) {
        self.listeners.push(listener);
    }

    /// Run listeners in registration order, including any added while
    /// running.
    pub fn run(&mut self, scheduler: &Scheduler) {
        while !self.listeners.is_empty() {
            let listener = self.listeners.remove(0);
            listener(scheduler);
        }
    }
}
