//! Root rendering and the runtime.
//!
//! A `Runtime` owns the host document, one root fiber per container,
//! the scheduler and the recycling pool. `render` is idempotent:
//! rendering the same descriptor into the same container twice leaves
//! the host untouched the second time.

use std::cell::{Ref as CellRef, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::debug;
use veld_dom::{Document, NodeId};

use crate::component::{ComponentHandle, flush_queue};
use crate::error::{Error, Result};
use crate::fiber::{Fiber, FiberChildren, FiberPath, FiberPos, PathKey};
use crate::mount::mount;
use crate::options::Options;
use crate::patch::patch;
use crate::pool::RecyclePool;
use crate::scheduler::{LifecycleQueue, Scheduler};
use crate::unmount::unmount;
use crate::vnode::{Props, VNode};

/// Mutable state shared by every pass of one runtime.
pub(crate) struct RuntimeInner {
    pub doc: Document,
    /// Root fiber per container node.
    pub roots: HashMap<NodeId, Fiber>,
    pub options: Options,
    pub pool: RecyclePool,
    /// Instance pointer to host node, kept when `find_dom_node` is
    /// enabled.
    pub dom_map: AHashMap<usize, NodeId>,
}

/// Everything one mount/patch/unmount pass threads through the tree.
pub(crate) struct Pass<'a> {
    pub doc: &'a mut Document,
    pub scheduler: &'a Rc<Scheduler>,
    pub lifecycle: &'a mut LifecycleQueue,
    pub options: &'a Options,
    pub pool: &'a mut RecyclePool,
    pub dom_map: &'a mut AHashMap<usize, NodeId>,
    pub runtime: Weak<RefCell<RuntimeInner>>,
    /// Fiber positions from the root down to the current fiber.
    pub path: Vec<FiberPos>,
    pub root: NodeId,
}

/// Resolve a component fiber by its recorded path. Fails (returns
/// `None`) when the tree no longer has that position.
pub(crate) fn fiber_at<'a>(
    roots: &'a mut HashMap<NodeId, Fiber>,
    path: &FiberPath,
) -> Option<&'a mut Fiber> {
    let mut segs = path.segs.iter();
    let first = segs.next()?;
    let mut cur = roots.get_mut(&path.root)?;
    if cur.pos != *first {
        return None;
    }
    for seg in segs {
        cur = match &mut cur.children {
            FiberChildren::None => return None,
            FiberChildren::One(child) => {
                if child.pos != *seg {
                    return None;
                }
                child
            }
            FiberChildren::Many(list) => {
                list.fibers.iter_mut().find(|f| f.pos == *seg)?
            }
        };
    }
    Some(cur)
}

/// The reconciler runtime: host document plus per-container fiber
/// roots.
pub struct Runtime {
    inner: Rc<RefCell<RuntimeInner>>,
    scheduler: Rc<Scheduler>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RuntimeInner {
                doc: Document::new(),
                roots: HashMap::new(),
                options,
                pool: RecyclePool::default(),
                dom_map: AHashMap::new(),
            })),
            scheduler: Rc::new(Scheduler::new()),
        }
    }

    /// Read access to the host document.
    pub fn document(&self) -> CellRef<'_, Document> {
        CellRef::map(self.inner.borrow(), |inner| &inner.doc)
    }

    /// Write access to the host document, for setting up containers.
    pub fn document_mut(&self) -> RefMut<'_, Document> {
        RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.doc)
    }

    /// Create an element under `body` to render into.
    pub fn create_container(&self, tag: &str) -> Result<NodeId> {
        let mut inner = self.inner.borrow_mut();
        let body = inner.doc.body();
        let container = inner.doc.create_element(tag);
        inner.doc.append_child(body, container)?;
        Ok(container)
    }

    /// Render `input` into `container`. `None` unmounts whatever the
    /// container holds. The optional callback runs after the flush.
    pub fn render(&self, input: Option<VNode>, container: NodeId) -> Result<()> {
        self.render_with(input, container, None::<fn()>)
    }

    pub fn render_with(
        &self,
        input: Option<VNode>,
        container: NodeId,
        callback: Option<impl FnOnce()>,
    ) -> Result<()> {
        {
            let inner = self.inner.borrow();
            if container == inner.doc.root() || container == inner.doc.body() {
                return Err(Error::RenderIntoRoot);
            }
            // Unmounting a container that holds nothing is a no-op.
            if input.is_none() && !inner.roots.contains_key(&container) {
                drop(inner);
                if let Some(cb) = callback {
                    cb();
                }
                return Ok(());
            }
        }
        let guard = self.scheduler.begin();
        let mut lifecycle = LifecycleQueue::new();
        {
            let mut inner = self.inner.borrow_mut();
            let runtime = Rc::downgrade(&self.inner);
            let RuntimeInner { doc, roots, options, pool, dom_map } = &mut *inner;
            let context = Props::empty();
            match roots.entry(container) {
                std::collections::hash_map::Entry::Vacant(entry) => {
                    let Some(input) = input else {
                        return Ok(());
                    };
                    debug!(container = container.index(), "mounting root");
                    let mut fiber = Fiber::new(input, FiberPos::Path(PathKey::first()));
                    let mut pass = Pass {
                        doc,
                        scheduler: &self.scheduler,
                        lifecycle: &mut lifecycle,
                        options,
                        pool,
                        dom_map,
                        runtime,
                        path: Vec::new(),
                        root: container,
                    };
                    mount(&mut pass, &mut fiber, Some(container), &context, false)?;
                    entry.insert(fiber);
                }
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    let mut pass = Pass {
                        doc,
                        scheduler: &self.scheduler,
                        lifecycle: &mut lifecycle,
                        options,
                        pool,
                        dom_map,
                        runtime,
                        path: Vec::new(),
                        root: container,
                    };
                    match input {
                        Some(next) => {
                            patch(
                                &mut pass,
                                entry.get_mut(),
                                &next,
                                Some(container),
                                &context,
                                false,
                            )?;
                        }
                        None => {
                            debug!(container = container.index(), "unmounting root");
                            let mut fiber = entry.remove();
                            unmount(&mut pass, &mut fiber, Some(container), false)?;
                        }
                    }
                }
            }
        }
        lifecycle.run(&self.scheduler);
        if let Some(cb) = callback {
            cb();
        }
        flush_queue(&self.inner, &self.scheduler)?;
        drop(guard);
        Ok(())
    }

    /// Invoke the handler registered for `event` on `node`, then flush
    /// any state changes it raised. Returns whether a handler ran.
    pub fn dispatch_event(&self, node: NodeId, event: &str) -> Result<bool> {
        let handler = self.inner.borrow().doc.event_handler(node, event);
        let Some(handler) = handler else {
            return Ok(false);
        };
        let guard = self.scheduler.begin();
        handler();
        flush_queue(&self.inner, &self.scheduler)?;
        drop(guard);
        Ok(true)
    }

    /// Host node currently rendered by a component, when tracking is
    /// enabled in [`Options`].
    pub fn find_dom_node(&self, handle: &ComponentHandle) -> Option<NodeId> {
        if !self.inner.borrow().options.find_dom_node_enabled {
            return None;
        }
        let inst = handle.core.upgrade()?;
        let key = Rc::as_ptr(&inst) as usize;
        self.inner.borrow().dom_map.get(&key).copied()
    }

    /// Serialized markup of a container's contents; test and debug
    /// aid.
    pub fn container_html(&self, container: NodeId) -> String {
        self.inner.borrow().doc.inner_html(container)
    }
}
